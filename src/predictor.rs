use ndarray::arr2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::Outcome;
use crate::model::TrainedModels;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudentFeatures {
    pub study_hours: f64,
    pub attendance: f64,
    pub previous_marks: f64,
    pub assignments: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_marks: f64,
    pub result: Outcome,
}

#[derive(Debug, Error, PartialEq)]
#[error("{field} must be between {min} and {max}, got {value}")]
pub struct FeatureError {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

const BOUNDS: [(&str, f64, f64); 4] = [
    ("study_hours", 0.0, 15.0),
    ("attendance", 0.0, 100.0),
    ("previous_marks", 0.0, 100.0),
    ("assignments", 0.0, 10.0),
];

impl StudentFeatures {
    fn as_array(&self) -> [f64; 4] {
        [self.study_hours, self.attendance, self.previous_marks, self.assignments]
    }

    /// Checks the input-form bounds. [`predict`] itself accepts anything.
    pub fn validate(&self) -> Result<(), FeatureError> {
        for (value, (field, min, max)) in self.as_array().into_iter().zip(BOUNDS) {
            // NaN fails the range check too.
            if !(min..=max).contains(&value) {
                return Err(FeatureError { field, value, min, max });
            }
        }
        Ok(())
    }
}

/// Marks come from the regressor, the outcome from the classifier. The two
/// are never reconciled, so a mark above 50 can still come back as a FAIL.
pub fn predict(models: &TrainedModels, features: &StudentFeatures) -> Prediction {
    let input = arr2(&[features.as_array()]);
    let marks = models.predict_marks(&input)[0];
    let passed = models.predict_passed(&input)[0];

    Prediction {
        predicted_marks: round2(marks),
        result: Outcome::from_passed(passed),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
