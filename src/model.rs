//! The classifier surface: a narrow predictor capability and a trainer that
//! builds one from labelled feature rows.
//!
//! The engine only ever depends on [`Predictor`], so the boosted-tree backend
//! in [`gbdt`] can be swapped for a mock in tests or another implementation
//! entirely.

use anyhow::bail;
use strum_macros::{Display, EnumIter, EnumString};
use tinyrand::{Rand, Seeded, StdRand};

use crate::features::FeatureRow;
use crate::model::gbdt::{GbdtModel, GbdtParams};
use crate::probs::SliceExt;

pub mod gbdt;

/// A fitted classifier: feature rows in, `P(top-3)` per row out.
pub trait Predictor {
    fn predict_proba(&self, rows: &[FeatureRow]) -> Vec<f64>;
}

/// Training declines below this many labelled rows.
pub const MIN_TRAINING_ROWS: usize = 100;

/// Parameter presets. `Normal` is the full-strength profile for one-off
/// training; `Lightweight` trades accuracy for fit time and is what the
/// walk-forward backtest retrains with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum TrainerProfile {
    Normal,
    Lightweight,
}

impl TrainerProfile {
    pub fn params(&self) -> GbdtParams {
        match self {
            TrainerProfile::Normal => GbdtParams {
                num_leaves: 31,
                learning_rate: 0.05,
                rounds: 100,
                ..GbdtParams::default()
            },
            TrainerProfile::Lightweight => GbdtParams {
                num_leaves: 15,
                learning_rate: 0.1,
                rounds: 50,
                ..GbdtParams::default()
            },
        }
    }
}

/// Fits a [`GbdtModel`] from feature rows and binary labels (1 for a top-3
/// finish).
#[derive(Debug, Clone, PartialEq)]
pub struct Trainer {
    params: GbdtParams,
}

impl Trainer {
    pub fn new(profile: TrainerProfile) -> Self {
        Self {
            params: profile.params(),
        }
    }

    pub fn with_params(params: GbdtParams) -> Result<Self, anyhow::Error> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    pub fn fit(&self, rows: &[FeatureRow], labels: &[u8]) -> Result<GbdtModel, anyhow::Error> {
        if rows.len() < MIN_TRAINING_ROWS {
            bail!(
                "training declined: {} labelled rows, need at least {MIN_TRAINING_ROWS}",
                rows.len()
            );
        }
        gbdt::fit(&self.params, rows, labels)
    }

    /// Cross-validated fit: scores `folds` held-out splits, then fits the
    /// final model on the full sample.
    pub fn fit_with_cv(
        &self,
        rows: &[FeatureRow],
        labels: &[u8],
        folds: usize,
    ) -> Result<(GbdtModel, CvMetrics), anyhow::Error> {
        if folds < 2 {
            bail!("cross-validation needs at least 2 folds");
        }
        if rows.len() < MIN_TRAINING_ROWS {
            bail!(
                "training declined: {} labelled rows, need at least {MIN_TRAINING_ROWS}",
                rows.len()
            );
        }

        let assignments = stratified_folds(labels, folds, self.params.seed);
        let mut precision_at_1 = Vec::new();
        let mut precision_at_3 = Vec::new();
        let mut auc_roc = Vec::new();
        let mut log_loss = Vec::new();

        for fold in 0..folds {
            let mut train_rows = Vec::new();
            let mut train_labels = Vec::new();
            let mut held_rows = Vec::new();
            let mut held_labels = Vec::new();
            for (index, &assigned) in assignments.iter().enumerate() {
                if assigned == fold {
                    held_rows.push(rows[index]);
                    held_labels.push(labels[index]);
                } else {
                    train_rows.push(rows[index]);
                    train_labels.push(labels[index]);
                }
            }
            if held_rows.is_empty() || train_rows.is_empty() {
                continue;
            }
            let model = gbdt::fit(&self.params, &train_rows, &train_labels)?;
            let probabilities = model.predict_proba(&held_rows);

            if let Some(value) = precision_at_k(&held_labels, &probabilities, 1) {
                precision_at_1.push(value);
            }
            if let Some(value) = precision_at_k(&held_labels, &probabilities, 3) {
                precision_at_3.push(value);
            }
            if let Some(value) = auc(&held_labels, &probabilities) {
                auc_roc.push(value);
            }
            log_loss.push(binary_log_loss(&held_labels, &probabilities));
        }

        let model = gbdt::fit(&self.params, rows, labels)?;
        let metrics = CvMetrics {
            precision_at_1: mean_of(&precision_at_1),
            precision_at_3: mean_of(&precision_at_3),
            auc_roc: mean_of(&auc_roc),
            log_loss: mean_of(&log_loss),
        };
        Ok((model, metrics))
    }
}

/// Mean held-out metrics across the folds; a metric undefined on every fold
/// (e.g. AUC on a single-class fold) is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CvMetrics {
    pub precision_at_1: Option<f64>,
    pub precision_at_3: Option<f64>,
    pub auc_roc: Option<f64>,
    pub log_loss: Option<f64>,
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.mean())
}

/// Round-robin fold assignment per class after a seeded shuffle, keeping the
/// class balance of every fold close to the sample's.
fn stratified_folds(labels: &[u8], folds: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRand::seed(seed);
    let mut assignments = vec![0usize; labels.len()];
    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = (0..labels.len())
            .filter(|&index| labels[index] == class)
            .collect();
        for position in (1..members.len()).rev() {
            let pick = rng.next_u64() as usize % (position + 1);
            members.swap(position, pick);
        }
        for (order, index) in members.into_iter().enumerate() {
            assignments[index] = order % folds;
        }
    }
    assignments
}

/// Fraction of the top-k scored rows that are true positives.
fn precision_at_k(labels: &[u8], probabilities: &[f64], k: usize) -> Option<f64> {
    if labels.is_empty() {
        return None;
    }
    let k = usize::min(k, labels.len());
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
    let positives = order[..k].iter().filter(|&&index| labels[index] == 1).count();
    Some(positives as f64 / k as f64)
}

/// Rank-based AUC (Mann-Whitney); undefined when a class is absent.
fn auc(labels: &[u8], probabilities: &[f64]) -> Option<f64> {
    let positives = labels.iter().filter(|&&label| label == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| probabilities[a].total_cmp(&probabilities[b]));
    let mut rank_sum = 0.0;
    let mut at = 0;
    while at < order.len() {
        let mut end = at + 1;
        while end < order.len()
            && probabilities[order[end]] == probabilities[order[at]]
        {
            end += 1;
        }
        // Tied scores share the mean rank of their block.
        let mean_rank = (at + 1 + end) as f64 / 2.0;
        for &index in &order[at..end] {
            if labels[index] == 1 {
                rank_sum += mean_rank;
            }
        }
        at = end;
    }
    let positives = positives as f64;
    let negatives = negatives as f64;
    Some((rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives))
}

fn binary_log_loss(labels: &[u8], probabilities: &[f64]) -> f64 {
    const EPSILON: f64 = 1e-15;
    let mut total = 0.0;
    for (&label, &probability) in labels.iter().zip(probabilities) {
        let probability = probability.clamp(EPSILON, 1.0 - EPSILON);
        total -= if label == 1 {
            probability.ln()
        } else {
            (1.0 - probability).ln()
        };
    }
    total / labels.len() as f64
}
