use serde::{Deserialize, Serialize};

use crate::database::{Outcome, PredictionRecord, DATE_TIME_FORMAT};

/// Per-teacher counters and marks trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_predictions: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub pass_rate: f64,
    pub marks_trend: Vec<f64>,
}

/// One history row as shown to its owner, without the teacher column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub student_name: String,
    pub roll_number: String,
    pub predicted_marks: f64,
    pub result: Outcome,
    pub date_time: String,
}

impl From<&PredictionRecord> for HistoryEntry {
    fn from(record: &PredictionRecord) -> Self {
        Self {
            student_name: record.student_name.clone(),
            roll_number: record.roll_number.clone(),
            predicted_marks: record.predicted_marks,
            result: record.result,
            date_time: record.date_time.format(DATE_TIME_FORMAT).to_string(),
        }
    }
}

pub fn dashboard(records: &[PredictionRecord]) -> Dashboard {
    let total_predictions = records.len();
    let pass_count = records.iter().filter(|record| record.result == Outcome::Pass).count();
    let pass_rate = if total_predictions > 0 {
        pass_count as f64 / total_predictions as f64
    } else {
        0.0
    };

    Dashboard {
        total_predictions,
        pass_count,
        fail_count: total_predictions - pass_count,
        pass_rate,
        marks_trend: records.iter().map(|record| record.predicted_marks).collect(),
    }
}

pub fn history(records: &[PredictionRecord]) -> Vec<HistoryEntry> {
    records.iter().map(HistoryEntry::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(marks: f64, result: Outcome) -> PredictionRecord {
        PredictionRecord {
            teacher_username: "t".to_string(),
            student_name: "s".to_string(),
            roll_number: "1".to_string(),
            predicted_marks: marks,
            result,
            date_time: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap(),
        }
    }

    #[test]
    fn test_dashboard_counts_and_trend() {
        let records = vec![
            record(71.5, Outcome::Pass),
            record(38.0, Outcome::Fail),
            record(52.25, Outcome::Pass),
        ];

        let summary = dashboard(&records);

        assert_eq!(summary.total_predictions, 3);
        assert_eq!(summary.pass_count, 2);
        assert_eq!(summary.fail_count, 1);
        assert!((summary.pass_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.marks_trend, vec![71.5, 38.0, 52.25]);
    }

    #[test]
    fn test_empty_dashboard() {
        let summary = dashboard(&[]);
        assert_eq!(summary.total_predictions, 0);
        assert_eq!(summary.pass_rate, 0.0);
        assert!(summary.marks_trend.is_empty());
    }

    #[test]
    fn test_history_entry_formats_timestamp() {
        let entries = history(&[record(44.4, Outcome::Fail)]);
        assert_eq!(entries[0].date_time, "2024-01-02 03:04:05");
        assert_eq!(entries[0].result, Outcome::Fail);
    }
}
