//! Gradient-boosted decision trees with binary log-loss.
//!
//! Trees grow leaf-wise to a leaf budget, splitting on exact thresholds with
//! Newton gains. Rows with a NaN feature follow a learned default direction at
//! each split, so missing values need no imputation. Feature and row
//! subsampling are driven by a seeded RNG, making a fit reproducible for a
//! given parameter set.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tinyrand::{Rand, Seeded, StdRand};

use crate::features::{FeatureRow, FEATURE_COUNT};
use crate::model::Predictor;
use crate::probs::sigmoid;

/// L2 stabiliser in leaf weights and gains.
const LAMBDA: f64 = 1e-6;
/// Gradient clamp on the initial class balance.
const PROB_FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtParams {
    pub num_leaves: usize,
    pub learning_rate: f64,
    pub rounds: usize,
    pub feature_fraction: f64,
    pub bagging_fraction: f64,
    pub bagging_freq: usize,
    pub min_leaf_samples: usize,
    pub seed: u64,
}

impl GbdtParams {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.num_leaves < 2 {
            bail!("num_leaves cannot be fewer than 2");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            bail!("learning rate must lie in (0, 1]");
        }
        if self.rounds == 0 {
            bail!("at least one boosting round is required");
        }
        if !(self.feature_fraction > 0.0 && self.feature_fraction <= 1.0) {
            bail!("feature fraction must lie in (0, 1]");
        }
        if !(self.bagging_fraction > 0.0 && self.bagging_fraction <= 1.0) {
            bail!("bagging fraction must lie in (0, 1]");
        }
        if self.min_leaf_samples == 0 {
            bail!("min_leaf_samples cannot be zero");
        }
        Ok(())
    }
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            num_leaves: 31,
            learning_rate: 0.05,
            rounds: 100,
            feature_fraction: 0.9,
            bagging_fraction: 0.8,
            bagging_freq: 5,
            min_leaf_samples: 20,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        default_left: bool,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn eval(&self, row: &FeatureRow) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let value = row[*feature];
                    let go_left = if value.is_nan() { *default_left } else { value <= *threshold };
                    at = if go_left { *left } else { *right };
                }
            }
        }
    }

    fn leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }
}

/// A fitted boosted-tree classifier. Serialisable as the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtModel {
    base_score: f64,
    trees: Vec<Tree>,
}

impl GbdtModel {
    pub fn predict_row(&self, row: &FeatureRow) -> f64 {
        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += tree.eval(row);
        }
        sigmoid(margin)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Split counts per feature column, a cheap importance measure.
    pub fn feature_importance(&self) -> [usize; FEATURE_COUNT] {
        let mut counts = [0usize; FEATURE_COUNT];
        for tree in &self.trees {
            for node in &tree.nodes {
                if let Node::Split { feature, .. } = node {
                    counts[*feature] += 1;
                }
            }
        }
        counts
    }
}

impl Predictor for GbdtModel {
    fn predict_proba(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    default_left: bool,
    gain: f64,
}

struct LeafBuild {
    node: usize,
    rows: Vec<usize>,
    best: Option<SplitCandidate>,
}

struct Booster<'a> {
    rows: &'a [FeatureRow],
    grad: Vec<f64>,
    hess: Vec<f64>,
    min_leaf_samples: usize,
    learning_rate: f64,
}

impl Booster<'_> {
    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let mut sum_g = 0.0;
        let mut sum_h = 0.0;
        for &row in rows {
            sum_g += self.grad[row];
            sum_h += self.hess[row];
        }
        -sum_g / (sum_h + LAMBDA) * self.learning_rate
    }

    fn score(sum_g: f64, sum_h: f64) -> f64 {
        sum_g * sum_g / (sum_h + LAMBDA)
    }

    /// Best split of `rows` over `features`, or `None` when no partition
    /// improves on the parent.
    fn best_split(&self, rows: &[usize], features: &[usize]) -> Option<SplitCandidate> {
        let mut total_g = 0.0;
        let mut total_h = 0.0;
        for &row in rows {
            total_g += self.grad[row];
            total_h += self.hess[row];
        }
        let parent = Self::score(total_g, total_h);

        let mut best: Option<SplitCandidate> = None;
        let mut present: Vec<(f64, usize)> = Vec::with_capacity(rows.len());
        for &feature in features {
            present.clear();
            let mut missing_g = 0.0;
            let mut missing_h = 0.0;
            let mut missing_count = 0usize;
            for &row in rows {
                let value = self.rows[row][feature];
                if value.is_nan() {
                    missing_g += self.grad[row];
                    missing_h += self.hess[row];
                    missing_count += 1;
                } else {
                    present.push((value, row));
                }
            }
            if present.len() < 2 {
                continue;
            }
            present.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_g = 0.0;
            let mut left_h = 0.0;
            for (position, &(value, row)) in present.iter().enumerate() {
                left_g += self.grad[row];
                left_h += self.hess[row];
                let next = match present.get(position + 1) {
                    Some(&(next_value, _)) => next_value,
                    None => break,
                };
                if next == value {
                    continue;
                }
                let threshold = (value + next) / 2.0;
                let left_count = position + 1;
                let right_count = present.len() - left_count;

                // Try the missing rows on either side of the split.
                for &default_left in &[true, false] {
                    let (miss_left_g, miss_left_h, miss_left_n) = if default_left {
                        (missing_g, missing_h, missing_count)
                    } else {
                        (0.0, 0.0, 0)
                    };
                    let candidate_left_n = left_count + miss_left_n;
                    let candidate_right_n =
                        right_count + missing_count - miss_left_n;
                    if candidate_left_n < self.min_leaf_samples
                        || candidate_right_n < self.min_leaf_samples
                    {
                        continue;
                    }
                    let candidate_left_g = left_g + miss_left_g;
                    let candidate_left_h = left_h + miss_left_h;
                    let candidate_right_g = total_g - candidate_left_g;
                    let candidate_right_h = total_h - candidate_left_h;
                    let gain = Self::score(candidate_left_g, candidate_left_h)
                        + Self::score(candidate_right_g, candidate_right_h)
                        - parent;
                    if gain > 0.0
                        && best.as_ref().map(|best| gain > best.gain).unwrap_or(true)
                    {
                        best = Some(SplitCandidate {
                            feature,
                            threshold,
                            default_left,
                            gain,
                        });
                    }
                }
            }
        }
        best
    }

    fn partition(&self, rows: &[usize], candidate: &SplitCandidate) -> (Vec<usize>, Vec<usize>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &row in rows {
            let value = self.rows[row][candidate.feature];
            let go_left = if value.is_nan() {
                candidate.default_left
            } else {
                value <= candidate.threshold
            };
            if go_left {
                left.push(row);
            } else {
                right.push(row);
            }
        }
        (left, right)
    }

    fn grow(&self, bag: &[usize], features: &[usize], num_leaves: usize) -> Tree {
        let mut nodes = vec![Node::Leaf {
            value: self.leaf_value(bag),
        }];
        let mut leaves = vec![LeafBuild {
            node: 0,
            rows: bag.to_vec(),
            best: self.best_split(bag, features),
        }];

        while leaves.len() < num_leaves {
            let expand = leaves
                .iter()
                .enumerate()
                .filter_map(|(index, leaf)| {
                    leaf.best.as_ref().map(|best| (index, best.gain))
                })
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(index, _)| index);
            let Some(index) = expand else {
                break;
            };

            let leaf = leaves.swap_remove(index);
            let candidate = leaf.best.expect("expandable leaf carries a split");
            let (left_rows, right_rows) = self.partition(&leaf.rows, &candidate);

            let left_node = nodes.len();
            let right_node = nodes.len() + 1;
            nodes.push(Node::Leaf {
                value: self.leaf_value(&left_rows),
            });
            nodes.push(Node::Leaf {
                value: self.leaf_value(&right_rows),
            });
            nodes[leaf.node] = Node::Split {
                feature: candidate.feature,
                threshold: candidate.threshold,
                default_left: candidate.default_left,
                left: left_node,
                right: right_node,
            };

            let left_best = self.best_split(&left_rows, features);
            let right_best = self.best_split(&right_rows, features);
            leaves.push(LeafBuild {
                node: left_node,
                rows: left_rows,
                best: left_best,
            });
            leaves.push(LeafBuild {
                node: right_node,
                rows: right_rows,
                best: right_best,
            });
        }

        Tree { nodes }
    }
}

fn next_unit(rng: &mut StdRand) -> f64 {
    rng.next_u64() as f64 / u64::MAX as f64
}

fn sample_features(rng: &mut StdRand, fraction: f64) -> Vec<usize> {
    let mut all: Vec<usize> = (0..FEATURE_COUNT).collect();
    if fraction >= 1.0 {
        return all;
    }
    let take = usize::max(1, (fraction * FEATURE_COUNT as f64).floor() as usize);
    // Partial Fisher-Yates over the feature indices.
    for position in 0..take {
        let remaining = all.len() - position;
        let pick = position + (rng.next_u64() as usize % remaining);
        all.swap(position, pick);
    }
    all.truncate(take);
    all.sort_unstable();
    all
}

fn sample_bag(rng: &mut StdRand, n: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let bag: Vec<usize> = (0..n).filter(|_| next_unit(rng) < fraction).collect();
    if bag.is_empty() {
        (0..n).collect()
    } else {
        bag
    }
}

/// Fits a boosted-tree classifier to binary labels.
pub fn fit(
    params: &GbdtParams,
    rows: &[FeatureRow],
    labels: &[u8],
) -> Result<GbdtModel, anyhow::Error> {
    params.validate()?;
    if rows.is_empty() {
        bail!("cannot fit a model to an empty sample");
    }
    if rows.len() != labels.len() {
        bail!(
            "exactly one label must be provided for each row: {} rows vs {} labels",
            rows.len(),
            labels.len()
        );
    }
    if labels.iter().any(|&label| label > 1) {
        bail!("labels must be binary");
    }

    let n = rows.len();
    let positives = labels.iter().filter(|&&label| label == 1).count();
    let prior = f64::min(
        f64::max(positives as f64 / n as f64, PROB_FLOOR),
        1.0 - PROB_FLOOR,
    );
    let base_score = f64::ln(prior / (1.0 - prior));

    let mut rng = StdRand::seed(params.seed);
    let mut margins = vec![base_score; n];
    let mut trees = Vec::with_capacity(params.rounds);
    let mut bag: Vec<usize> = (0..n).collect();

    let mut booster = Booster {
        rows,
        grad: vec![0.0; n],
        hess: vec![0.0; n],
        min_leaf_samples: params.min_leaf_samples,
        learning_rate: params.learning_rate,
    };

    for round in 0..params.rounds {
        if params.bagging_fraction < 1.0
            && params.bagging_freq > 0
            && round % params.bagging_freq == 0
        {
            bag = sample_bag(&mut rng, n, params.bagging_fraction);
        }
        for row in 0..n {
            let p = sigmoid(margins[row]);
            booster.grad[row] = p - labels[row] as f64;
            booster.hess[row] = p * (1.0 - p);
        }
        let features = sample_features(&mut rng, params.feature_fraction);
        let tree = booster.grow(&bag, &features, params.num_leaves);
        for (row, margin) in margins.iter_mut().enumerate() {
            *margin += tree.eval(&rows[row]);
        }
        trees.push(tree);
    }

    Ok(GbdtModel { base_score, trees })
}
