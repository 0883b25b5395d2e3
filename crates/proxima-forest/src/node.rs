use std::fmt;

use proxima_distance::{MeasureConfig, TimeSeries};

/// Index into a `Vec<Node>` arena, identifying a specific node in a proximity tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Criterion-agnostic impurity value (Gini or Entropy).
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a proximity tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers. A split holds one exemplar per
/// represented class and one child per exemplar, in the same order; a query
/// descends into the child of its nearest exemplar.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Distance measure used to compare queries with the exemplars.
        measure: MeasureConfig,
        /// One exemplar series per branch.
        exemplars: Vec<TimeSeries>,
        /// Child node per exemplar, same order as `exemplars`.
        children: Vec<NodeIndex>,
        /// Impurity gain of the chosen partition.
        gain: f64,
        /// Impurity at this node before splitting.
        impurity: Impurity,
        /// Number of training samples that reached this node.
        n_samples: usize,
        /// Class distribution of the training samples at this node; answers
        /// queries that stop here when a prediction deadline passes.
        #[serde(default)]
        distribution: Vec<f64>,
        /// True when no candidate produced non-empty branches and the first
        /// candidate was kept as a fallback.
        degenerate: bool,
    },
    /// A terminal leaf node.
    Leaf {
        /// Predicted class (argmax of distribution, lowest index on ties).
        prediction: usize,
        /// Normalized class probability distribution.
        distribution: Vec<f64>,
        /// Impurity at this leaf.
        impurity: Impurity,
        /// Number of training samples in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the impurity at this node (before splitting for interior nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return the class distribution of the training samples at this node.
    #[must_use]
    pub fn distribution(&self) -> &[f64] {
        match self {
            Node::Split { distribution, .. } | Node::Leaf { distribution, .. } => distribution,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Return the child indices of a split, or an empty slice for a leaf.
    #[must_use]
    pub fn children(&self) -> &[NodeIndex] {
        match self {
            Node::Split { children, .. } => children,
            Node::Leaf { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Impurity, Node, NodeIndex};
    use proxima_distance::{MeasureConfig, TimeSeries};

    // --- NodeIndex ---

    #[test]
    fn node_index_roundtrip() {
        let ni = NodeIndex::new(42);
        assert_eq!(ni.index(), 42);
    }

    #[test]
    fn node_index_display() {
        let ni = NodeIndex::new(0);
        assert_eq!(format!("{ni}"), "0");
    }

    #[test]
    fn node_index_ordering() {
        let a = NodeIndex::new(10);
        let b = NodeIndex::new(20);
        assert!(a < b);
    }

    // --- Impurity ---

    #[test]
    fn impurity_display() {
        let imp = Impurity::new(0.333333);
        assert_eq!(format!("{imp}"), "0.333333");
    }

    #[test]
    fn impurity_ordering() {
        let a = Impurity::new(0.1);
        let b = Impurity::new(0.5);
        assert!(a < b);
    }

    // --- Node ---

    fn make_leaf() -> Node {
        Node::Leaf {
            prediction: 1,
            distribution: vec![0.2, 0.8],
            impurity: Impurity::new(0.32),
            n_samples: 10,
        }
    }

    fn make_split() -> Node {
        Node::Split {
            measure: MeasureConfig::Dtw { window: 0.1 },
            exemplars: vec![
                TimeSeries::new(vec![0.0, 1.0]).unwrap(),
                TimeSeries::new(vec![1.0, 0.0]).unwrap(),
            ],
            children: vec![NodeIndex::new(1), NodeIndex::new(2)],
            gain: 0.48,
            impurity: Impurity::new(0.48),
            n_samples: 20,
            distribution: vec![0.4, 0.6],
            degenerate: false,
        }
    }

    #[test]
    fn leaf_is_leaf() {
        assert!(make_leaf().is_leaf());
        assert!(make_leaf().children().is_empty());
    }

    #[test]
    fn split_is_not_leaf() {
        let split = make_split();
        assert!(!split.is_leaf());
        assert_eq!(split.children(), &[NodeIndex::new(1), NodeIndex::new(2)]);
    }

    #[test]
    fn n_samples_and_impurity() {
        assert_eq!(make_leaf().n_samples(), 10);
        assert_eq!(make_split().n_samples(), 20);
        assert!((make_leaf().impurity().value() - 0.32).abs() < f64::EPSILON);
    }

    #[test]
    fn both_node_kinds_carry_a_distribution() {
        assert_eq!(make_leaf().distribution(), &[0.2, 0.8]);
        assert_eq!(make_split().distribution(), &[0.4, 0.6]);
    }

    #[test]
    fn split_serializes_measure_and_exemplars() {
        let json = serde_json::to_string(&make_split()).unwrap();
        assert!(json.contains("\"kind\":\"dtw\""));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back.children().len(), 2);
    }
}
