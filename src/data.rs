use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

use crate::model::TrainingError;

/// Final marks at or above this count as a pass.
pub const PASS_MARK: f64 = 50.0;

pub const FEATURE_NAMES: [&str; 4] = ["study_hours", "attendance", "previous_marks", "assignments"];

#[derive(Debug, Clone, Deserialize)]
pub struct StudentRow {
    pub study_hours: f64,
    pub attendance: f64,
    pub previous_marks: f64,
    pub assignments: f64,
    pub final_marks: f64,
}

/// The training set in matrix form. Row `i` of `features` lines up with
/// `marks[i]` and `passed[i]`.
#[derive(Debug, Clone)]
pub struct PerformanceData {
    pub features: Array2<f64>,
    pub marks: Array1<f64>,
    pub passed: Array1<bool>,
}

impl PerformanceData {
    pub fn nrows(&self) -> usize {
        self.features.nrows()
    }

    pub fn pass_count(&self) -> usize {
        self.passed.iter().filter(|&&passed| passed).count()
    }
}

pub fn load_data(path: &Path) -> Result<PerformanceData, TrainingError> {
    let bytes = fs::read(path).map_err(|source| TrainingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_data(&bytes)
}

/// Parses a dataset by column name, so column order in the file is free.
pub fn parse_data(bytes: &[u8]) -> Result<PerformanceData, TrainingError> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let mut features = Vec::new();
    let mut marks = Vec::new();

    for (index, result) in rdr.deserialize::<StudentRow>().enumerate() {
        let row = result.map_err(|source| TrainingError::MalformedRow {
            row: index + 1,
            source,
        })?;
        features.extend_from_slice(&[row.study_hours, row.attendance, row.previous_marks, row.assignments]);
        marks.push(row.final_marks);
    }

    if marks.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    let num_rows = marks.len();
    let marks = Array1::from_vec(marks);
    let passed = marks.mapv(|mark| mark >= PASS_MARK);
    Ok(PerformanceData {
        features: Array2::from_shape_vec((num_rows, FEATURE_NAMES.len()), features)?,
        marks,
        passed,
    })
}

/// Seeded shuffle-and-split of row indices into `(train, test)`.
///
/// The test side takes `ceil(n * test_size)` rows, clamped to `n`.
pub fn split_indices(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_size).ceil() as usize;
    let train = indices.split_off(n_test.min(n));
    (train, indices)
}

pub fn calculate_accuracy(predictions: &Array1<bool>, targets: &Array1<bool>) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(targets.iter())
        .filter(|(&pred, &actual)| pred == actual)
        .count() as f64
        / targets.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_parse_derives_pass_label() {
        let csv = "study_hours,attendance,previous_marks,assignments,final_marks\n\
                   4,80,60,7,50\n\
                   1,40,30,2,49.99\n";
        let data = parse_data(csv.as_bytes()).unwrap();

        assert_eq!(data.nrows(), 2);
        assert_eq!(data.features.row(0).to_vec(), vec![4.0, 80.0, 60.0, 7.0]);
        assert_eq!(data.passed, array![true, false]);
        assert_eq!(data.pass_count(), 1);
    }

    #[test]
    fn test_parse_uses_header_names() {
        let csv = "final_marks,assignments,previous_marks,attendance,study_hours\n\
                   72,9,65,95,6\n";
        let data = parse_data(csv.as_bytes()).unwrap();

        assert_eq!(data.features.row(0).to_vec(), vec![6.0, 95.0, 65.0, 9.0]);
        assert_eq!(data.marks[0], 72.0);
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let csv = "study_hours,attendance,previous_marks,assignments,final_marks\n";
        assert!(matches!(parse_data(csv.as_bytes()), Err(TrainingError::EmptyDataset)));
    }

    #[test]
    fn test_malformed_row_reports_position() {
        let csv = "study_hours,attendance,previous_marks,assignments,final_marks\n\
                   4,80,60,7,50\n\
                   4,eighty,60,7,50\n";
        match parse_data(csv.as_bytes()) {
            Err(TrainingError::MalformedRow { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn test_split_sizes_follow_ceiling() {
        let (train, test) = split_indices(10, 0.2, 42);
        assert_eq!((train.len(), test.len()), (8, 2));

        let (train, test) = split_indices(11, 0.2, 42);
        assert_eq!((train.len(), test.len()), (8, 3));

        let (train, test) = split_indices(0, 0.2, 42);
        assert!(train.is_empty() && test.is_empty());
    }

    #[test]
    fn test_split_is_a_seeded_partition() {
        let (train, test) = split_indices(50, 0.2, 42);
        let (train_again, test_again) = split_indices(50, 0.2, 42);
        assert_eq!(train, train_again);
        assert_eq!(test, test_again);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_accuracy_calculation() {
        let predictions = array![true, true, false, true];
        let targets = array![true, false, false, true];
        assert_eq!(calculate_accuracy(&predictions, &targets), 0.75);
        let empty = Array1::<bool>::from(Vec::new());
        assert_eq!(calculate_accuracy(&empty, &empty), 0.0);
    }
}
