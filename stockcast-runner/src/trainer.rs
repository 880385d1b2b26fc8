//! Model trainer and selector.
//!
//! Trains every candidate learner on the training partition, scores it on
//! the holdout with predictions clipped to the stock domain, and keeps the
//! best by R2. Candidates are evaluated in `ModelKind::ALL` order and a later
//! candidate replaces the incumbent only with a strictly higher R2, so ties
//! (and NaN scores) keep the earlier one.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use stockcast_core::dataset::{DatasetError, DatasetSplit, FEATURE_COLUMNS};
use stockcast_core::models::{FeatureMatrix, ModelKind, ModelParams, Regressor, TrainError, TrainedModel};

use crate::metrics::EvaluationMetrics;

#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("training {kind} failed: {source}")]
    Train {
        kind: ModelKind,
        #[source]
        source: TrainError,
    },
}

/// Holdout evaluation of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub kind: ModelKind,
    pub metrics: EvaluationMetrics,
    /// `(feature column, normalized importance)` in column order.
    pub feature_importances: Vec<(String, f64)>,
}

/// Serializable outcome of selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub selected: ModelKind,
    pub metrics: EvaluationMetrics,
    pub candidates: Vec<CandidateReport>,
}

/// The retained model, its holdout metrics, and every candidate's report.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    model: TrainedModel,
    metrics: EvaluationMetrics,
    candidates: Vec<CandidateReport>,
}

impl ModelSelection {
    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn metrics(&self) -> &EvaluationMetrics {
        &self.metrics
    }

    pub fn candidates(&self) -> &[CandidateReport] {
        &self.candidates
    }

    pub fn summary(&self) -> SelectionSummary {
        SelectionSummary {
            selected: self.kind(),
            metrics: self.metrics,
            candidates: self.candidates.clone(),
        }
    }
}

/// Predictions of `model` on every row of `x`, clipped to the stock domain.
pub fn predict_clipped(model: &TrainedModel, x: &FeatureMatrix) -> Vec<f64> {
    x.rows().map(|row| model.predict_clipped(row)).collect()
}

/// Score a fitted model against holdout targets.
pub fn evaluate(model: &TrainedModel, x: &FeatureMatrix, y: &[f64]) -> EvaluationMetrics {
    EvaluationMetrics::compute(y, &predict_clipped(model, x))
}

/// A later candidate wins only on strictly higher R2; ties and NaN keep the incumbent.
fn replaces(candidate_r2: f64, incumbent_r2: f64) -> bool {
    candidate_r2 > incumbent_r2
}

/// Train all candidates and keep the best by holdout R2.
pub fn train_and_select(split: &DatasetSplit, params: &ModelParams) -> Result<ModelSelection, TrainerError> {
    let (x_train, y_train) = split.train_matrix()?;
    let (x_hold, y_hold) = split.holdout_matrix()?;

    let mut best: Option<(TrainedModel, EvaluationMetrics)> = None;
    let mut candidates = Vec::with_capacity(ModelKind::ALL.len());

    for kind in ModelKind::ALL {
        info!(model = %kind, rows = x_train.n_rows(), "training candidate");
        let model = kind
            .train(&x_train, &y_train, params)
            .map_err(|source| TrainerError::Train { kind, source })?;
        let metrics = evaluate(&model, &x_hold, &y_hold);
        info!(
            model = %kind,
            rmse = metrics.rmse,
            mae = metrics.mae,
            mape = metrics.mape,
            r2 = metrics.r2,
            "evaluated candidate"
        );

        let feature_importances: Vec<(String, f64)> = FEATURE_COLUMNS
            .iter()
            .zip(model.feature_importances())
            .map(|(name, w)| (name.to_string(), w))
            .collect();
        debug!(model = %kind, ?feature_importances, "feature importances");
        candidates.push(CandidateReport {
            kind,
            metrics,
            feature_importances,
        });

        let replace = match &best {
            None => true,
            Some((_, incumbent)) => replaces(metrics.r2, incumbent.r2),
        };
        if replace {
            best = Some((model, metrics));
        }
    }

    let (model, metrics) = best.ok_or(TrainerError::Train {
        kind: ModelKind::Forest,
        source: TrainError::EmptyTrainingSet,
    })?;
    info!(selected = %model.kind(), r2 = metrics.r2, "selected model");

    Ok(ModelSelection {
        model,
        metrics,
        candidates,
    })
}
