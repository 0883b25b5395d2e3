use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use proxima_distance::{Param, ParamSpace, SpaceError, TimeSeries, TransformCache};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument, warn};

use crate::{
    ForestError,
    dataset::Dataset,
    node::{Impurity, Node, NodeIndex},
    predict::{ClassDistribution, argmax},
    split::{Candidate, Partition, SplitCriterion, route_query},
    stopping::{Pure, StopContext, StoppingPolicy},
};

/// Configuration for a single proximity tree.
///
/// Construct via [`ProximityTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default                          |
/// |---------------------|----------------------------------|
/// | `n_candidates`      | 5                                |
/// | `stopping`          | [`Pure`]                         |
/// | `criterion`         | `Gini`                           |
/// | `max_depth`         | `None` (unlimited)               |
/// | `max_split_retries` | 10                               |
/// | `space`             | `None` (every measure, scaled to the data) |
/// | `seed`              | 42                               |
/// | `node_limit`        | `None`                           |
/// | `time_limit`        | `None`                           |
/// | `test_time_limit`   | `None`                           |
#[derive(Debug, Clone)]
pub struct ProximityTreeConfig {
    pub(crate) n_candidates: usize,
    pub(crate) stopping: Arc<dyn StoppingPolicy>,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) max_split_retries: usize,
    pub(crate) space: Option<ParamSpace>,
    pub(crate) seed: u64,
    pub(crate) node_limit: Option<usize>,
    pub(crate) time_limit: Option<Duration>,
    pub(crate) test_time_limit: Option<Duration>,
}

impl ProximityTreeConfig {
    /// Create a new config with default values.
    ///
    /// All parameters use the defaults shown in the struct-level documentation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_candidates: 5,
            stopping: Arc::new(Pure),
            criterion: SplitCriterion::Gini,
            max_depth: None,
            max_split_retries: 10,
            space: None,
            seed: 42,
            node_limit: None,
            time_limit: None,
            test_time_limit: None,
        }
    }

    /// Set the number of candidate splits drawn per node.
    #[must_use]
    pub fn with_n_candidates(mut self, n_candidates: usize) -> Self {
        self.n_candidates = n_candidates;
        self
    }

    /// Set the stopping policy.
    #[must_use]
    pub fn with_stopping(mut self, stopping: impl StoppingPolicy + 'static) -> Self {
        self.stopping = Arc::new(stopping);
        self
    }

    /// Set an already shared stopping policy.
    #[must_use]
    pub fn with_shared_stopping(mut self, stopping: Arc<dyn StoppingPolicy>) -> Self {
        self.stopping = stopping;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until the stopping policy halts every branch.
    /// `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set how many rounds of redraws replace candidates with an empty branch.
    #[must_use]
    pub fn with_max_split_retries(mut self, max_split_retries: usize) -> Self {
        self.max_split_retries = max_split_retries;
        self
    }

    /// Override the parameter space candidate measures are drawn from.
    #[must_use]
    pub fn with_space(mut self, space: ParamSpace) -> Self {
        self.space = Some(space);
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Stop growing once the arena holds this many nodes.
    #[must_use]
    pub fn with_node_limit(mut self, node_limit: Option<usize>) -> Self {
        self.node_limit = node_limit;
        self
    }

    /// Stop growing once this much wall-clock time has passed.
    #[must_use]
    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Bound the wall-clock time of each prediction.
    ///
    /// A query still descending when the budget runs out is answered with the
    /// class distribution of the node it has reached.
    #[must_use]
    pub fn with_test_time_limit(mut self, test_time_limit: Option<Duration>) -> Self {
        self.test_time_limit = test_time_limit;
        self
    }

    // --- Getters ---

    /// Return the number of candidate splits per node.
    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.n_candidates
    }

    /// Return the stopping policy.
    #[must_use]
    pub fn stopping(&self) -> &Arc<dyn StoppingPolicy> {
        &self.stopping
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the redraw budget for candidates with empty branches.
    #[must_use]
    pub fn max_split_retries(&self) -> usize {
        self.max_split_retries
    }

    /// Return the parameter space override, if any.
    #[must_use]
    pub fn space(&self) -> Option<&ParamSpace> {
        self.space.as_ref()
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the node-count contract, if any.
    #[must_use]
    pub fn node_limit(&self) -> Option<usize> {
        self.node_limit
    }

    /// Return the wall-clock contract, if any.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Return the per-prediction time budget, if any.
    #[must_use]
    pub fn test_time_limit(&self) -> Option<Duration> {
        self.test_time_limit
    }

    /// Check the settings that do not depend on data.
    pub(crate) fn validate(&self) -> Result<(), ForestError> {
        if self.n_candidates == 0 {
            return Err(ForestError::InvalidCandidateCount {
                n_candidates: self.n_candidates,
            });
        }
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        if let Some(space) = &self.space
            && space.dimensions().is_empty()
        {
            return Err(SpaceError::EmptyDomain {
                param: Param::Measure,
            }
            .into());
        }
        Ok(())
    }

    /// Train a proximity tree on `dataset`.
    ///
    /// Nodes grow breadth-first. When a contract runs out, every node still
    /// waiting in the queue is already a valid leaf, so the returned tree is
    /// usable and reports [`ProximityTree::is_complete`] as false.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                     |
    /// |----------------------------------------|------------------------------------------|
    /// | [`ForestError::InvalidCandidateCount`] | `n_candidates` is zero                   |
    /// | [`ForestError::InvalidMaxDepth`]       | `max_depth` is `Some(0)`                 |
    /// | [`ForestError::Space`]                 | the space is empty or yields bad configs |
    /// | [`ForestError::Distance`]              | a distance computation fails             |
    pub fn fit(&self, dataset: &Dataset) -> Result<ProximityTree, ForestError> {
        let deadline = self.time_limit.map(|limit| Instant::now() + limit);
        self.fit_with(dataset, Arc::new(TransformCache::new()), deadline)
    }

    /// Train with a shared cache and an externally imposed deadline.
    #[instrument(skip_all, fields(n_samples = dataset.len(), seed = self.seed))]
    pub(crate) fn fit_with(
        &self,
        dataset: &Dataset,
        cache: Arc<TransformCache>,
        deadline: Option<Instant>,
    ) -> Result<ProximityTree, ForestError> {
        self.validate()?;

        let deadline = match (deadline, self.time_limit) {
            (Some(outer), Some(limit)) => Some(outer.min(Instant::now() + limit)),
            (outer, limit) => outer.or_else(|| limit.map(|l| Instant::now() + l)),
        };
        let space = match &self.space {
            Some(space) => space.clone(),
            None => ParamSpace::proximity_forest(&dataset.stats()),
        };

        let mut builder = TreeBuilder {
            config: self,
            dataset,
            space: &space,
            cache: &cache,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
            deadline,
        };
        let complete = builder.grow()?;
        let nodes = builder.arena;

        debug!(
            n_nodes = nodes.len(),
            complete,
            "proximity tree built"
        );

        Ok(ProximityTree {
            nodes,
            n_classes: dataset.n_classes(),
            complete,
            test_time_limit: self.test_time_limit,
            cache,
        })
    }
}

impl Default for ProximityTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The winning candidate of a node, with its partition.
struct SplitChoice {
    candidate: Candidate,
    partition: Partition,
    degenerate: bool,
}

/// Mutable state of one tree construction.
struct TreeBuilder<'a> {
    config: &'a ProximityTreeConfig,
    dataset: &'a Dataset,
    space: &'a ParamSpace,
    cache: &'a TransformCache,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
    deadline: Option<Instant>,
}

impl TreeBuilder<'_> {
    /// Grow the arena breadth-first. Returns false if a contract cut growth short.
    fn grow(&mut self) -> Result<bool, ForestError> {
        let indices = self.dataset.all_indices();
        let root = self.push_leaf(&indices);
        let mut queue = VecDeque::from([(root, indices, 0usize)]);

        while let Some((node, indices, depth)) = queue.pop_front() {
            if self.contract_exhausted() {
                debug!(
                    pending = queue.len() + 1,
                    n_nodes = self.arena.len(),
                    "tree contract exhausted"
                );
                return Ok(false);
            }

            let n_samples = indices.len();
            let class_counts = self.dataset.class_counts(&indices);
            let impurity = self.config.criterion.impurity(&class_counts, n_samples);
            let mut ctx = StopContext {
                depth,
                n_samples,
                class_counts: &class_counts,
                impurity: impurity.value(),
                split_gain: None,
            };

            let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
            if depth_reached || ctx.distinct_classes() < 2 || self.config.stopping.should_stop(&ctx) {
                continue;
            }

            let choice = self.choose_split(&indices)?;
            if choice.partition.non_empty_branches() < 2 {
                continue;
            }
            ctx.split_gain = Some(choice.partition.gain);
            if self.config.stopping.should_stop(&ctx) {
                continue;
            }

            let SplitChoice {
                candidate,
                partition,
                degenerate,
            } = choice;
            let parent_distribution = self.dataset.distribution(&indices);
            let mut children = Vec::with_capacity(partition.branches.len());
            for branch in partition.branches {
                if branch.is_empty() {
                    children.push(self.push_empty_leaf(&parent_distribution, impurity));
                } else {
                    let child = self.push_leaf(&branch);
                    children.push(child);
                    queue.push_back((child, branch, depth + 1));
                }
            }

            self.arena[node.index()] = Node::Split {
                measure: candidate.measure,
                exemplars: candidate
                    .exemplars
                    .iter()
                    .map(|&e| self.dataset.series_at(e).clone())
                    .collect(),
                children,
                gain: partition.gain,
                impurity,
                n_samples,
                distribution: parent_distribution,
                degenerate,
            };
        }

        Ok(true)
    }

    fn contract_exhausted(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
            || self
                .config
                .node_limit
                .is_some_and(|limit| self.arena.len() >= limit)
    }

    /// Draw, score and pick a split for the instances at `indices`.
    ///
    /// Candidates are drawn in slot order from the tree RNG and scored in
    /// parallel. Slots whose partition leaves an exemplar without instances
    /// are redrawn for up to `max_split_retries` rounds. The highest gain
    /// wins with ties going to the lowest slot; if every slot still has an
    /// empty branch, the first candidate drawn is kept and marked degenerate.
    fn choose_split(&mut self, indices: &[usize]) -> Result<SplitChoice, ForestError> {
        let by_class = self.dataset.indices_by_class(indices);
        let mut candidates = (0..self.config.n_candidates)
            .map(|_| Candidate::draw(self.space, &by_class, &mut self.rng))
            .collect::<Result<Vec<_>, _>>()?;
        let slots: Vec<usize> = (0..candidates.len()).collect();
        let mut partitions = self.score(&candidates, &slots, indices)?;
        let first = (candidates[0].clone(), partitions[0].clone());

        for round in 0..self.config.max_split_retries {
            let empty: Vec<usize> = slots
                .iter()
                .copied()
                .filter(|&s| partitions[s].has_empty_branch())
                .collect();
            if empty.is_empty() {
                break;
            }
            debug!(round, redraws = empty.len(), "redrawing candidates with empty branches");
            for &s in &empty {
                candidates[s] = Candidate::draw(self.space, &by_class, &mut self.rng)?;
            }
            let rescored = self.score(&candidates, &empty, indices)?;
            for (s, p) in empty.into_iter().zip(rescored) {
                partitions[s] = p;
            }
        }

        let mut best: Option<usize> = None;
        for s in slots {
            if partitions[s].has_empty_branch() {
                continue;
            }
            if best.is_none_or(|b| partitions[s].gain > partitions[b].gain) {
                best = Some(s);
            }
        }

        match best.and_then(|b| candidates.into_iter().zip(partitions).nth(b)) {
            Some((candidate, partition)) => Ok(SplitChoice {
                candidate,
                partition,
                degenerate: false,
            }),
            None => {
                let (candidate, partition) = first;
                warn!(
                    n_samples = indices.len(),
                    measure = %candidate.measure,
                    non_empty = partition.non_empty_branches(),
                    branches = partition.branches.len(),
                    "no candidate split without empty branches, keeping first candidate"
                );
                Ok(SplitChoice {
                    candidate,
                    partition,
                    degenerate: true,
                })
            }
        }
    }

    /// Partition and score the candidates at `slots` in parallel, in slot order.
    fn score(
        &self,
        candidates: &[Candidate],
        slots: &[usize],
        indices: &[usize],
    ) -> Result<Vec<Partition>, ForestError> {
        let (dataset, criterion, cache) = (self.dataset, self.config.criterion, self.cache);
        slots
            .par_iter()
            .map(|&s| candidates[s].partition(dataset, indices, criterion, cache))
            .collect()
    }

    fn push_leaf(&mut self, indices: &[usize]) -> NodeIndex {
        let distribution = self.dataset.distribution(indices);
        let class_counts = self.dataset.class_counts(indices);
        let impurity = self.config.criterion.impurity(&class_counts, indices.len());
        self.push(Node::Leaf {
            prediction: argmax(&distribution),
            distribution,
            impurity,
            n_samples: indices.len(),
        })
    }

    /// A leaf for a branch no training instance reached; it answers with the
    /// parent's distribution.
    fn push_empty_leaf(&mut self, parent_distribution: &[f64], impurity: Impurity) -> NodeIndex {
        self.push(Node::Leaf {
            prediction: argmax(parent_distribution),
            distribution: parent_distribution.to_vec(),
            impurity,
            n_samples: 0,
        })
    }

    fn push(&mut self, node: Node) -> NodeIndex {
        self.arena.push(node);
        NodeIndex::new(self.arena.len() - 1)
    }
}

/// A fitted proximity tree.
///
/// Stored as an arena-based `Vec<Node>` with the root at index 0. The
/// transform cache is rebuilt empty after deserialization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProximityTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_classes: usize,
    pub(crate) complete: bool,
    #[serde(default)]
    pub(crate) test_time_limit: Option<Duration>,
    #[serde(skip)]
    pub(crate) cache: Arc<TransformCache>,
}

impl ProximityTree {
    /// Predict the class label for a single series.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Distance`] when a distance computation fails.
    pub fn predict(&self, series: &TimeSeries) -> Result<usize, ForestError> {
        Ok(self.traverse(series, self.test_deadline())?.0)
    }

    /// Return the class probability distribution of the leaf `series` reaches.
    ///
    /// With a test time limit, a query that runs out of time stops at the
    /// current node and takes that node's training distribution.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Distance`] when a distance computation fails.
    pub fn predict_proba(&self, series: &TimeSeries) -> Result<ClassDistribution, ForestError> {
        self.predict_proba_until(series, self.test_deadline())
    }

    /// [`predict_proba`](Self::predict_proba) against an explicit deadline.
    pub(crate) fn predict_proba_until(
        &self,
        series: &TimeSeries,
        deadline: Option<Instant>,
    ) -> Result<ClassDistribution, ForestError> {
        let (_, distribution) = self.traverse(series, deadline)?;
        Ok(ClassDistribution::new(distribution.to_vec()))
    }

    /// Return the per-prediction time budget, if any.
    #[must_use]
    pub fn test_time_limit(&self) -> Option<Duration> {
        self.test_time_limit
    }

    /// Return the arena of nodes; the root is at index 0.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return false if a contract stopped growth early.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of splits kept as degenerate fallbacks.
    #[must_use]
    pub fn n_degenerate_splits(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Split { degenerate: true, .. }))
            .count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((node_idx, d)) = queue.pop_front() {
            max_depth = max_depth.max(d);
            for child in self.nodes[node_idx].children() {
                queue.push_back((child.index(), d + 1));
            }
        }
        max_depth
    }

    /// Return the cache of transformed exemplars.
    ///
    /// Training fills it; prediction only reads exemplar entries, so its size
    /// does not grow with the number of queries.
    #[must_use]
    pub fn cache(&self) -> &TransformCache {
        &self.cache
    }

    fn test_deadline(&self) -> Option<Instant> {
        self.test_time_limit.map(|limit| Instant::now() + limit)
    }

    /// Descend from the root, taking the branch of the nearest exemplar at
    /// each split, and return the prediction and distribution of the leaf.
    ///
    /// Past `deadline` the descent stops at the current split, which answers
    /// with its own training distribution.
    fn traverse(
        &self,
        series: &TimeSeries,
        deadline: Option<Instant>,
    ) -> Result<(usize, &[f64]), ForestError> {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    prediction,
                    distribution,
                    ..
                } => return Ok((*prediction, distribution)),
                Node::Split {
                    measure,
                    exemplars,
                    children,
                    distribution,
                    ..
                } => {
                    if !distribution.is_empty() && deadline.is_some_and(|d| Instant::now() >= d) {
                        return Ok((argmax(distribution), distribution));
                    }
                    let branch = route_query(measure, &self.cache, series, exemplars)?;
                    idx = children[branch].index();
                }
            }
        }
    }
}
