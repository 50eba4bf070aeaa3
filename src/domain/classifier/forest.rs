//! Random forest ensemble classifier (CART trees, Gini impurity)

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Hyperparameters for the ensemble classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: 300,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Node {
    Leaf {
        distribution: Vec<f32>,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn distribution(&self, features: &[f32]) -> Result<&[f32], DomainError> {
        let mut current = 0;

        // Children always sit after their parent, so a leaf is reached within `nodes.len()` steps
        for _ in 0..self.nodes.len() {
            match self.nodes.get(current) {
                Some(Node::Leaf { distribution }) => return Ok(distribution.as_slice()),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).ok_or_else(|| {
                        DomainError::inference(format!("Tree splits on missing feature {}", feature))
                    })?;
                    current = if *value <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }

        Err(DomainError::inference(format!(
            "Tree walk left the node table at node {}",
            current
        )))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree without nodes".to_string());
        }

        for (position, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} classes, expected {}",
                            position,
                            distribution.len(),
                            n_classes
                        ));
                    }
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on feature {}", position, feature));
                    }
                    let in_order = |child: usize| child > position && child < self.nodes.len();
                    if !in_order(*left) || !in_order(*right) {
                        return Err(format!("node {} has out-of-order children", position));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Shared, read-only inputs for growing one tree
struct GrowContext<'a> {
    samples: &'a [&'a [f32]],
    labels: &'a [usize],
    n_classes: usize,
    max_features: usize,
    params: &'a ForestParams,
}

struct SplitCandidate {
    feature: usize,
    threshold: f32,
    impurity: f32,
}

/// Trained random forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit a forest on `samples` with class indices `labels` in `0..n_classes`
    pub fn fit<R: Rng>(
        samples: &[&[f32]],
        labels: &[usize],
        n_classes: usize,
        params: &ForestParams,
        rng: &mut R,
    ) -> Result<Self, DomainError> {
        if samples.is_empty() {
            return Err(DomainError::training("Cannot fit forest on an empty dataset"));
        }

        if samples.len() != labels.len() {
            return Err(DomainError::training(format!(
                "Sample/label count mismatch: {} vs {}",
                samples.len(),
                labels.len()
            )));
        }

        if let Some(bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(DomainError::training(format!(
                "Label {} outside {} classes",
                bad, n_classes
            )));
        }

        let n_features = samples[0].len();

        if n_features == 0 || samples.iter().any(|s| s.len() != n_features) {
            return Err(DomainError::training("Samples must share a non-zero feature length"));
        }

        let max_features = ((n_features as f32).sqrt().round() as usize).clamp(1, n_features);
        let context = GrowContext {
            samples,
            labels,
            n_classes,
            max_features,
            params,
        };

        let mut trees = Vec::with_capacity(params.trees.max(1));

        for _ in 0..params.trees.max(1) {
            let bootstrap: Vec<usize> = (0..samples.len())
                .map(|_| rng.gen_range(0..samples.len()))
                .collect();

            let mut tree = DecisionTree { nodes: Vec::new() };
            grow(&context, &mut tree, bootstrap, 0, rng);
            trees.push(tree);
        }

        Ok(Self {
            n_classes,
            n_features,
            trees,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Structural check for a forest read back from disk
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.trees.is_empty() || self.n_features == 0 {
            return Err(DomainError::artifact("Forest has no trees or no features"));
        }

        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes).map_err(|reason| {
                DomainError::artifact(format!("Invalid tree {}: {}", index, reason))
            })?;
        }

        Ok(())
    }

    /// Mean class distribution across all trees
    pub fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, DomainError> {
        if features.len() != self.n_features {
            return Err(DomainError::inference(format!(
                "Expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let mut totals = vec![0.0f32; self.n_classes];

        for tree in &self.trees {
            for (total, p) in totals.iter_mut().zip(tree.distribution(features)?) {
                *total += p;
            }
        }

        let count = self.trees.len().max(1) as f32;
        totals.iter_mut().for_each(|t| *t /= count);

        Ok(totals)
    }
}

fn class_counts(context: &GrowContext<'_>, indices: &[usize]) -> Vec<usize> {
    let mut counts = vec![0usize; context.n_classes];

    for &i in indices {
        counts[context.labels[i]] += 1;
    }

    counts
}

fn gini(counts: &[usize], total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }

    let total = total as f32;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f32 / total;
            p * p
        })
        .sum::<f32>()
}

fn push_leaf(tree: &mut DecisionTree, counts: &[usize], total: usize) -> usize {
    let distribution = counts
        .iter()
        .map(|&c| c as f32 / total.max(1) as f32)
        .collect();

    tree.nodes.push(Node::Leaf { distribution });
    tree.nodes.len() - 1
}

fn grow<R: Rng>(
    context: &GrowContext<'_>,
    tree: &mut DecisionTree,
    indices: Vec<usize>,
    depth: usize,
    rng: &mut R,
) -> usize {
    let counts = class_counts(context, &indices);
    let total = indices.len();
    let parent_impurity = gini(&counts, total);

    if depth >= context.params.max_depth
        || total < context.params.min_samples_split.max(2)
        || parent_impurity == 0.0
    {
        return push_leaf(tree, &counts, total);
    }

    let Some(split) = best_split(context, &indices, rng) else {
        return push_leaf(tree, &counts, total);
    };

    if split.impurity >= parent_impurity {
        return push_leaf(tree, &counts, total);
    }

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| context.samples[i][split.feature] <= split.threshold);

    // Reserve the split slot so children can be appended after it
    let slot = tree.nodes.len();
    tree.nodes.push(Node::Leaf {
        distribution: Vec::new(),
    });

    let left_index = grow(context, tree, left, depth + 1, rng);
    let right_index = grow(context, tree, right, depth + 1, rng);

    tree.nodes[slot] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: left_index,
        right: right_index,
    };

    slot
}

fn best_split<R: Rng>(
    context: &GrowContext<'_>,
    indices: &[usize],
    rng: &mut R,
) -> Option<SplitCandidate> {
    let n_features = context.samples[0].len();
    let min_leaf = context.params.min_samples_leaf.max(1);
    let total = indices.len();
    let mut best: Option<SplitCandidate> = None;

    for feature in index::sample(rng, n_features, context.max_features).into_iter() {
        let mut column: Vec<(f32, usize)> = indices
            .iter()
            .map(|&i| (context.samples[i][feature], context.labels[i]))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; context.n_classes];
        let mut right_counts = vec![0usize; context.n_classes];
        for &(_, label) in &column {
            right_counts[label] += 1;
        }

        for position in 1..total {
            let (value, label) = column[position - 1];
            left_counts[label] += 1;
            right_counts[label] -= 1;

            let next_value = column[position].0;
            if value == next_value || position < min_leaf || total - position < min_leaf {
                continue;
            }

            let impurity = (position as f32 * gini(&left_counts, position)
                + (total - position) as f32 * gini(&right_counts, total - position))
                / total as f32;

            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (value + next_value) / 2.0,
                    impurity,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_params() -> ForestParams {
        ForestParams {
            trees: 15,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    fn two_blobs() -> (Vec<Vec<f32>>, Vec<usize>) {
        let mut samples = Vec::new();
        let mut labels = Vec::new();

        for i in 0..10 {
            let jitter = i as f32 * 0.01;
            samples.push(vec![0.1 + jitter, 0.2, 0.1]);
            labels.push(0);
            samples.push(vec![0.9 - jitter, 0.8, 0.9]);
            labels.push(1);
        }

        (samples, labels)
    }

    #[test]
    fn test_fit_separates_two_classes() {
        let (samples, labels) = two_blobs();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let forest = RandomForest::fit(&refs, &labels, 2, &small_params(), &mut rng).unwrap();

        let low = forest.predict_proba(&[0.12, 0.2, 0.1]).unwrap();
        let high = forest.predict_proba(&[0.88, 0.8, 0.9]).unwrap();
        assert!(low[0] > low[1]);
        assert!(high[1] > high[0]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (samples, labels) = two_blobs();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let forest = RandomForest::fit(&refs, &labels, 3, &small_params(), &mut rng).unwrap();
        let proba = forest.predict_proba(&[0.5, 0.5, 0.5]).unwrap();

        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert_eq!(proba[2], 0.0);
    }

    #[test]
    fn test_rejects_label_outside_classes() {
        let samples = [vec![0.0f32, 1.0]];
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let result = RandomForest::fit(&refs, &[4], 2, &small_params(), &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn test_predict_rejects_wrong_feature_length() {
        let (samples, labels) = two_blobs();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let forest = RandomForest::fit(&refs, &labels, 2, &small_params(), &mut rng).unwrap();

        assert!(forest.predict_proba(&[0.1]).is_err());
    }

    #[test]
    fn test_serialization_preserves_predictions() {
        let (samples, labels) = two_blobs();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(11);
        let forest = RandomForest::fit(&refs, &labels, 2, &small_params(), &mut rng).unwrap();

        let json = serde_json::to_string(&forest).unwrap();
        let restored: RandomForest = serde_json::from_str(&json).unwrap();

        let sample = [0.4, 0.5, 0.6];
        let before = forest.predict_proba(&sample).unwrap();
        let after = restored.predict_proba(&sample).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    fn forest_json(nodes: serde_json::Value) -> RandomForest {
        serde_json::from_value(serde_json::json!({
            "n_classes": 2,
            "n_features": 3,
            "trees": [{ "nodes": nodes }]
        }))
        .unwrap()
    }

    #[test]
    fn test_fitted_forest_validates() {
        let (samples, labels) = two_blobs();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let forest = RandomForest::fit(&refs, &labels, 2, &small_params(), &mut rng).unwrap();

        assert!(forest.validate().is_ok());
    }

    #[test]
    fn test_bad_feature_index_is_an_error_not_a_panic() {
        let forest = forest_json(serde_json::json!([
            {"type": "split", "feature": 9, "threshold": 0.5, "left": 1, "right": 2},
            {"type": "leaf", "distribution": [1.0, 0.0]},
            {"type": "leaf", "distribution": [0.0, 1.0]}
        ]));

        assert!(forest.validate().is_err());
        assert!(matches!(
            forest.predict_proba(&[0.1, 0.2, 0.3]),
            Err(DomainError::Inference { .. })
        ));
    }

    #[test]
    fn test_dangling_or_cyclic_children_are_errors() {
        let dangling = forest_json(serde_json::json!([
            {"type": "split", "feature": 0, "threshold": 0.5, "left": 7, "right": 8}
        ]));
        assert!(dangling.validate().is_err());
        assert!(dangling.predict_proba(&[0.1, 0.2, 0.3]).is_err());

        let cyclic = forest_json(serde_json::json!([
            {"type": "split", "feature": 0, "threshold": 0.5, "left": 0, "right": 0}
        ]));
        assert!(cyclic.validate().is_err());
        assert!(cyclic.predict_proba(&[0.1, 0.2, 0.3]).is_err());
    }
}
