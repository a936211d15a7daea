use std::path::PathBuf;

use clap::Parser;

use crate::model::TrainingParams;

/// Student result predictor for teachers.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Opts {
    /// Address the HTTP server listens on
    #[arg(long, env = "PREDICTOR_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Teacher accounts table
    #[arg(long, env = "PREDICTOR_TEACHERS_FILE", default_value = "teachers.csv")]
    pub teachers_file: PathBuf,

    /// Prediction history table
    #[arg(long, env = "PREDICTOR_HISTORY_FILE", default_value = "prediction_history.csv")]
    pub history_file: PathBuf,

    /// Training dataset (study_hours, attendance, previous_marks, assignments, final_marks)
    #[arg(long, env = "PREDICTOR_DATASET", default_value = "data/student_performance.csv")]
    pub dataset: PathBuf,

    /// Seed for the train/test shuffle
    #[arg(long, env = "PREDICTOR_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Fraction of rows held out from the marks regressor
    #[arg(long, env = "PREDICTOR_TEST_SIZE", default_value_t = 0.2, value_parser = parse_fraction)]
    pub test_size: f64,

    /// Iteration cap for the logistic solver
    #[arg(long, env = "PREDICTOR_MAX_ITERATIONS", default_value_t = 100)]
    pub max_iterations: u64,
}

impl Opts {
    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            seed: self.seed,
            test_size: self.test_size,
            max_iterations: self.max_iterations,
        }
    }
}

fn parse_fraction(value: &str) -> Result<f64, String> {
    let fraction: f64 = value.parse().map_err(|err| format!("{err}"))?;
    if (0.0..1.0).contains(&fraction) {
        Ok(fraction)
    } else {
        Err(format!("expected a fraction in [0, 1), got {fraction}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Opts::try_parse_from(["teacher_predictor"]).unwrap();
        assert_eq!(opts.bind, "127.0.0.1:8080");
        assert_eq!(opts.teachers_file, PathBuf::from("teachers.csv"));
        assert_eq!(opts.training_params(), TrainingParams::default());
    }

    #[test]
    fn test_overrides() {
        let opts = Opts::try_parse_from([
            "teacher_predictor",
            "--dataset",
            "fixtures/data.csv",
            "--seed",
            "7",
            "--test-size",
            "0.25",
        ])
        .unwrap();
        assert_eq!(opts.dataset, PathBuf::from("fixtures/data.csv"));
        assert_eq!(opts.training_params().seed, 7);
        assert_eq!(opts.training_params().test_size, 0.25);
    }

    #[test]
    fn test_test_size_must_be_a_fraction() {
        assert!(Opts::try_parse_from(["teacher_predictor", "--test-size", "1.5"]).is_err());
        assert!(Opts::try_parse_from(["teacher_predictor", "--test-size", "-0.1"]).is_err());
    }
}
