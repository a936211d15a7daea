use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use ahash::AHasher;
use linfa::prelude::*;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2, Axis, ShapeError};
use serde::Serialize;
use thiserror::Error;

use crate::data::{self, PerformanceData, FEATURE_NAMES};
use crate::database::Outcome;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed dataset row {row}: {source}")]
    MalformedRow {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("dataset has no rows")]
    EmptyDataset,

    #[error("dataset has {rows} training rows, at least {required} are needed")]
    TooFewRows { rows: usize, required: usize },

    #[error("every row in the dataset is a {0}, the classifier needs both outcomes")]
    SingleClass(Outcome),

    #[error("invalid dataset shape: {0}")]
    Shape(#[from] ShapeError),

    #[error("failed to fit {model}: {reason}")]
    Fit { model: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    pub seed: u64,
    pub test_size: f64,
    pub max_iterations: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            seed: 42,
            test_size: 0.2,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelSummary {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub pass_rows: usize,
    pub features: Vec<&'static str>,
    /// R² of the marks regressor on the held-out rows; `None` when the
    /// held-out set is empty or has no variance.
    pub marks_r2: Option<f64>,
    pub classifier_accuracy: f64,
    pub seed: u64,
}

/// The marks regressor and the pass/fail classifier, fitted together.
pub struct TrainedModels {
    regressor: FittedLinearRegression<f64>,
    classifier: FittedLogisticRegression<f64, bool>,
    summary: ModelSummary,
}

impl TrainedModels {
    pub fn predict_marks(&self, features: &Array2<f64>) -> Array1<f64> {
        self.regressor.predict(features)
    }

    pub fn predict_passed(&self, features: &Array2<f64>) -> Array1<bool> {
        self.classifier.predict(features)
    }

    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }
}

/// Fits the regressor on the seeded train split and the classifier on every
/// row.
pub fn train_model(data: &PerformanceData, params: &TrainingParams) -> Result<TrainedModels, TrainingError> {
    let rows = data.nrows();
    if rows == 0 {
        return Err(TrainingError::EmptyDataset);
    }
    let pass_rows = data.pass_count();
    if pass_rows == 0 {
        return Err(TrainingError::SingleClass(Outcome::Fail));
    }
    if pass_rows == rows {
        return Err(TrainingError::SingleClass(Outcome::Pass));
    }

    let (train_idx, test_idx) = data::split_indices(rows, params.test_size, params.seed);
    let required = FEATURE_NAMES.len() + 1;
    if train_idx.len() < required {
        return Err(TrainingError::TooFewRows {
            rows: train_idx.len(),
            required,
        });
    }

    let x_train = data.features.select(Axis(0), &train_idx);
    let y_train = data.marks.select(Axis(0), &train_idx);
    let regressor = LinearRegression::new()
        .fit(&Dataset::new(x_train, y_train))
        .map_err(|err| TrainingError::Fit {
            model: "marks regressor",
            reason: err.to_string(),
        })?;

    let marks_r2 = if test_idx.is_empty() {
        None
    } else {
        let x_test = data.features.select(Axis(0), &test_idx);
        let y_test = data.marks.select(Axis(0), &test_idx);
        let predicted: Array1<f64> = regressor.predict(&x_test);
        predicted.r2(&y_test).ok().filter(|r2| r2.is_finite())
    };

    let classifier = LogisticRegression::default()
        .max_iterations(params.max_iterations)
        .fit(&Dataset::new(data.features.clone(), data.passed.clone()))
        .map_err(|err| TrainingError::Fit {
            model: "pass/fail classifier",
            reason: err.to_string(),
        })?;
    let classifier_accuracy = data::calculate_accuracy(&classifier.predict(&data.features), &data.passed);

    let summary = ModelSummary {
        rows,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
        pass_rows,
        features: FEATURE_NAMES.to_vec(),
        marks_r2,
        classifier_accuracy,
        seed: params.seed,
    };
    tracing::info!(
        rows,
        train_rows = summary.train_rows,
        test_rows = summary.test_rows,
        marks_r2 = ?summary.marks_r2,
        accuracy = classifier_accuracy,
        "trained models"
    );

    Ok(TrainedModels {
        regressor,
        classifier,
        summary,
    })
}

struct CachedModels {
    fingerprint: u64,
    models: Arc<TrainedModels>,
}

/// Trained models keyed on the dataset file's content.
///
/// Every lookup re-reads the dataset; the models are refitted only when its
/// bytes have changed since the last fit.
pub struct ModelCache {
    dataset: PathBuf,
    params: TrainingParams,
    cached: RwLock<Option<CachedModels>>,
}

impl ModelCache {
    pub fn new(dataset: impl Into<PathBuf>, params: TrainingParams) -> Self {
        Self {
            dataset: dataset.into(),
            params,
            cached: RwLock::new(None),
        }
    }

    pub fn dataset(&self) -> &Path {
        &self.dataset
    }

    pub fn get(&self) -> Result<Arc<TrainedModels>, TrainingError> {
        let bytes = fs::read(&self.dataset).map_err(|source| TrainingError::Io {
            path: self.dataset.clone(),
            source,
        })?;
        let fingerprint = fingerprint(&bytes);

        if let Some(cached) = self.cached.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            if cached.fingerprint == fingerprint {
                return Ok(Arc::clone(&cached.models));
            }
        }

        tracing::info!(dataset = %self.dataset.display(), fingerprint, "dataset changed, retraining");
        let data = data::parse_data(&bytes)?;
        let models = Arc::new(train_model(&data, &self.params)?);
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(CachedModels {
            fingerprint,
            models: Arc::clone(&models),
        });
        Ok(models)
    }
}

fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hasher = AHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish()
}
