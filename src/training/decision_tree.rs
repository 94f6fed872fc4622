//! CART classification tree
//!
//! Labels are handled as class indices internally; leaves keep the class
//! distribution of their training samples so forests can average
//! probabilities. Nodes are grown depth-first, or best-first (largest impurity
//! decrease first) when `max_leaf_nodes` caps the number of leaves.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with class probabilities
    Leaf {
        proba: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy (base 2)
    Entropy,
}

impl Criterion {
    /// Impurity of a node from its class counts
    pub fn impurity(&self, counts: &[usize], n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        match self {
            Criterion::Gini => 1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>(),
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.log2()
                })
                .sum::<f64>(),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Gini => f.write_str("gini"),
            Criterion::Entropy => f.write_str("entropy"),
        }
    }
}

impl std::str::FromStr for Criterion {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gini" => Ok(Criterion::Gini),
            "entropy" => Ok(Criterion::Entropy),
            other => Err(PipelineError::InvalidParameter {
                name: "criterion".to_string(),
                value: other.to_string(),
                reason: "expected gini or entropy".to_string(),
            }),
        }
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth (a stump has depth 1)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split; `None` considers all
    pub max_features: Option<usize>,
    /// Cap on the number of leaves; enables best-first growth
    pub max_leaf_nodes: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature sampling
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    /// Class labels in index order
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    /// n_t * impurity - n_left * impurity_left - n_right * impurity_right
    weighted_gain: f64,
}

/// Node under construction
enum ArenaNode {
    Leaf {
        counts: Vec<usize>,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
        impurity: f64,
    },
}

/// A leaf that can still be split
struct Pending {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
    impurity: f64,
    split: SplitCandidate,
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            max_leaf_nodes: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set the number of features sampled per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Cap the number of leaves
    pub fn with_max_leaf_nodes(mut self, max_leaf_nodes: usize) -> Self {
        self.max_leaf_nodes = Some(max_leaf_nodes);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let classes = sorted_classes(y);
        let y_idx = encode_classes(y, &classes);
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let samples: Vec<usize> = (0..x.nrows()).collect();
        self.fit_indexed(x, &y_idx, &samples, classes, &mut rng)
    }

    /// Fit on class indices for the rows listed in `samples` (repeats allowed).
    /// `classes` fixes the width of every leaf distribution.
    pub(crate) fn fit_indexed(
        &mut self,
        x: &Array2<f64>,
        y_idx: &[usize],
        samples: &[usize],
        classes: Vec<f64>,
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
        self.validate()?;
        if samples.is_empty() {
            return Err(PipelineError::ValidationError(
                "Cannot fit a tree on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();
        self.classes = classes;
        let mut importances = vec![0.0; self.n_features];

        let arena = self.grow(x, y_idx, samples.to_vec(), rng, &mut importances);
        self.root = Some(Self::assemble(&arena, 0));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(PipelineError::InvalidParameter {
                name: "min_samples_split".to_string(),
                value: self.min_samples_split.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(PipelineError::InvalidParameter {
                name: "min_samples_leaf".to_string(),
                value: self.min_samples_leaf.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(max_leaf_nodes) = self.max_leaf_nodes {
            if max_leaf_nodes < 2 {
                return Err(PipelineError::InvalidParameter {
                    name: "max_leaf_nodes".to_string(),
                    value: max_leaf_nodes.to_string(),
                    reason: "must be at least 2".to_string(),
                });
            }
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::InvalidParameter {
                name: "max_depth".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn grow(
        &self,
        x: &Array2<f64>,
        y_idx: &[usize],
        root_samples: Vec<usize>,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> Vec<ArenaNode> {
        let n_classes = self.classes.len();
        let root_counts = class_counts(y_idx, &root_samples, n_classes);
        let root_n = root_samples.len();

        let mut arena = vec![ArenaNode::Leaf { counts: root_counts.clone(), n_samples: root_n }];
        let mut frontier: Vec<Pending> = Vec::new();
        if let Some(p) = self.pending(x, y_idx, 0, root_samples, &root_counts, 0, rng) {
            frontier.push(p);
        }

        let mut n_leaves = 1;
        loop {
            if self.max_leaf_nodes.is_some_and(|max| n_leaves >= max) {
                break;
            }
            let next = match self.max_leaf_nodes {
                Some(_) => {
                    // Largest weighted impurity decrease first; earliest wins ties
                    let best = frontier.iter().enumerate().fold(
                        None,
                        |best: Option<(usize, f64)>, (i, p)| match best {
                            Some((_, g)) if g >= p.split.weighted_gain => best,
                            _ => Some((i, p.split.weighted_gain)),
                        },
                    );
                    best.map(|(i, _)| frontier.remove(i))
                }
                None => frontier.pop(),
            };
            let Some(pending) = next else { break };

            let split = pending.split;
            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = pending
                .samples
                .iter()
                .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);

            importances[split.feature_idx] += split.weighted_gain;

            let left_counts = class_counts(y_idx, &left_samples, n_classes);
            let right_counts = class_counts(y_idx, &right_samples, n_classes);
            let left = arena.len();
            arena.push(ArenaNode::Leaf { counts: left_counts.clone(), n_samples: left_samples.len() });
            let right = arena.len();
            arena.push(ArenaNode::Leaf { counts: right_counts.clone(), n_samples: right_samples.len() });
            arena[pending.node] = ArenaNode::Split {
                feature_idx: split.feature_idx,
                threshold: split.threshold,
                left,
                right,
                n_samples: pending.samples.len(),
                impurity: pending.impurity,
            };
            n_leaves += 1;

            let depth = pending.depth + 1;
            // Right is pushed first so depth-first growth expands the left child first
            if let Some(p) = self.pending(x, y_idx, right, right_samples, &right_counts, depth, rng) {
                frontier.push(p);
            }
            if let Some(p) = self.pending(x, y_idx, left, left_samples, &left_counts, depth, rng) {
                frontier.push(p);
            }
        }

        arena
    }

    #[allow(clippy::too_many_arguments)]
    fn pending(
        &self,
        x: &Array2<f64>,
        y_idx: &[usize],
        node: usize,
        samples: Vec<usize>,
        counts: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> Option<Pending> {
        let n = samples.len();
        let impurity = self.criterion.impurity(counts, n);
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        let should_stop = n < self.min_samples_split
            || n < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || is_pure;
        if should_stop {
            return None;
        }

        let split = self.find_best_split(x, y_idx, &samples, impurity, rng)?;
        Some(Pending { node, samples, depth, impurity, split })
    }

    /// Draw candidate features in random order, skipping features constant at
    /// this node, until `max_features` usable ones are found; then scan them in parallel.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y_idx: &[usize],
        samples: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = x.ncols();
        let wanted = self.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));

        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(rng);

        let features: Vec<usize> = order
            .into_iter()
            .filter(|&f| {
                let first = x[[samples[0], f]];
                samples.iter().any(|&i| x[[i, f]] != first)
            })
            .take(wanted)
            .collect();

        let n_classes = self.classes.len();
        let parent_weighted = samples.len() as f64 * parent_impurity;

        let results: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| {
                self.scan_feature(x, y_idx, samples, feature_idx, n_classes, parent_weighted)
            })
            .collect();

        // Keep the first feature (in draw order) among equal gains
        results.into_iter().flatten().fold(None, |best, cand| match best {
            Some(b) if b.weighted_gain >= cand.weighted_gain => Some(b),
            _ => Some(cand),
        })
    }

    fn scan_feature(
        &self,
        x: &Array2<f64>,
        y_idx: &[usize],
        samples: &[usize],
        feature_idx: usize,
        n_classes: usize,
        parent_weighted: f64,
    ) -> Option<SplitCandidate> {
        let mut sorted: Vec<(f64, usize)> = samples
            .iter()
            .map(|&i| (x[[i, feature_idx]], y_idx[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let n = sorted.len();
        let mut left = vec![0usize; n_classes];
        let mut right = vec![0usize; n_classes];
        for &(_, c) in &sorted {
            right[c] += 1;
        }

        let mut best: Option<SplitCandidate> = None;
        for pos in 0..n - 1 {
            let (value, class) = sorted[pos];
            left[class] += 1;
            right[class] -= 1;

            let next_value = sorted[pos + 1].0;
            if next_value <= value {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }

            let children = n_left as f64 * self.criterion.impurity(&left, n_left)
                + n_right as f64 * self.criterion.impurity(&right, n_right);
            let gain = parent_weighted - children;

            if best.map_or(true, |b| gain > b.weighted_gain) {
                let mut threshold = (value + next_value) / 2.0;
                // Midpoint can round up to the upper value for adjacent floats
                if threshold >= next_value {
                    threshold = value;
                }
                best = Some(SplitCandidate { feature_idx, threshold, weighted_gain: gain });
            }
        }

        best
    }

    fn assemble(arena: &[ArenaNode], idx: usize) -> TreeNode {
        match &arena[idx] {
            ArenaNode::Leaf { counts, n_samples } => TreeNode::Leaf {
                proba: counts
                    .iter()
                    .map(|&c| if *n_samples > 0 { c as f64 / *n_samples as f64 } else { 0.0 })
                    .collect(),
                n_samples: *n_samples,
            },
            ArenaNode::Split { feature_idx, threshold, left, right, n_samples, impurity } => {
                TreeNode::Split {
                    feature_idx: *feature_idx,
                    threshold: *threshold,
                    left: Box::new(Self::assemble(arena, *left)),
                    right: Box::new(Self::assemble(arena, *right)),
                    n_samples: *n_samples,
                    impurity: *impurity,
                }
            }
        }
    }

    /// Class probabilities, one column per class in `classes()` order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        self.check_width(x)?;

        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((x.nrows(), n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let leaf = Self::leaf_proba(root, row);
            for (j, &p) in leaf.iter().enumerate() {
                proba[[i, j]] = p;
            }
        }
        Ok(proba)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_classes(&proba, &self.classes))
    }

    fn leaf_proba<'a>(node: &'a TreeNode, sample: ArrayView1<'_, f64>) -> &'a [f64] {
        match node {
            TreeNode::Leaf { proba, .. } => proba,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    Self::leaf_proba(left, sample)
                } else {
                    Self::leaf_proba(right, sample)
                }
            }
        }
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Class labels in probability-column order
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Number of split levels on the longest path; a single leaf has depth 0
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

/// Sorted distinct labels
pub(crate) fn sorted_classes(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    classes.dedup();
    classes
}

/// Map each label to its index in `classes`
pub(crate) fn encode_classes(y: &Array1<f64>, classes: &[f64]) -> Vec<usize> {
    y.iter()
        .map(|v| {
            classes
                .iter()
                .position(|c| c == v)
                .unwrap_or(0)
        })
        .collect()
}

/// Label of the most probable class per row; the lowest index wins ties
pub(crate) fn argmax_classes(proba: &Array2<f64>, classes: &[f64]) -> Array1<f64> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (j, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = j;
                }
            }
            classes.get(best).copied().unwrap_or(0.0)
        })
        .collect()
}

fn class_counts(y_idx: &[usize], samples: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in samples {
        counts[y_idx[i]] += 1;
    }
    counts
}
