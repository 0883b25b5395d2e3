//! Stopping policies deciding when a tree node stays a leaf.

use std::fmt;
use std::sync::Arc;

/// What a stopping policy sees about a node.
///
/// A node is checked twice: before candidate splits are drawn
/// (`split_gain` is `None`) and after the winning split is known.
#[derive(Debug, Clone, Copy)]
pub struct StopContext<'a> {
    /// Depth of the node; the root is at depth 0.
    pub depth: usize,
    /// Number of training instances at the node.
    pub n_samples: usize,
    /// Per-class instance counts at the node.
    pub class_counts: &'a [usize],
    /// Impurity of the node under the tree's criterion.
    pub impurity: f64,
    /// Gain of the winning split, once one has been chosen.
    pub split_gain: Option<f64>,
}

impl StopContext<'_> {
    /// Number of classes with at least one instance at the node.
    #[must_use]
    pub fn distinct_classes(&self) -> usize {
        self.class_counts.iter().filter(|&&c| c > 0).count()
    }
}

/// Decides whether a node stops growing.
pub trait StoppingPolicy: Send + Sync + fmt::Debug {
    /// Return true if the node must stay a leaf.
    fn should_stop(&self, ctx: &StopContext<'_>) -> bool;
}

/// Stop once at most one label is left.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pure;

impl StoppingPolicy for Pure {
    fn should_stop(&self, ctx: &StopContext<'_>) -> bool {
        ctx.distinct_classes() <= 1
    }
}

/// Stop when the winning split separates nothing (gain of zero or less).
///
/// Never stops a node before a split has been scored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureSplit;

impl StoppingPolicy for PureSplit {
    fn should_stop(&self, ctx: &StopContext<'_>) -> bool {
        ctx.split_gain.is_some_and(|gain| gain <= 0.0)
    }
}

/// Stop nodes holding fewer than `min` instances.
#[derive(Debug, Clone, Copy)]
pub struct MinSize(pub usize);

impl StoppingPolicy for MinSize {
    fn should_stop(&self, ctx: &StopContext<'_>) -> bool {
        ctx.n_samples < self.0
    }
}

/// Stop nodes at depth `max` or deeper.
#[derive(Debug, Clone, Copy)]
pub struct MaxDepth(pub usize);

impl StoppingPolicy for MaxDepth {
    fn should_stop(&self, ctx: &StopContext<'_>) -> bool {
        ctx.depth >= self.0
    }
}

/// Stop as soon as any member policy stops.
#[derive(Debug, Clone, Default)]
pub struct AnyOf(pub Vec<Arc<dyn StoppingPolicy>>);

impl AnyOf {
    /// Build a composite from its members.
    #[must_use]
    pub fn new(policies: Vec<Arc<dyn StoppingPolicy>>) -> Self {
        Self(policies)
    }

    /// Add a member policy.
    #[must_use]
    pub fn with(mut self, policy: impl StoppingPolicy + 'static) -> Self {
        self.0.push(Arc::new(policy));
        self
    }
}

impl StoppingPolicy for AnyOf {
    fn should_stop(&self, ctx: &StopContext<'_>) -> bool {
        self.0.iter().any(|p| p.should_stop(ctx))
    }
}
