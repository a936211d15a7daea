use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::predictor::Prediction;
use crate::store::{CsvTable, Record, StoreError};

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherAccount {
    pub username: String,
    pub password: String,
    pub name: String,
    pub subject: String,
    pub email: String,
}

impl Record for TeacherAccount {
    const HEADERS: &'static [&'static str] = &["username", "password", "name", "subject", "email"];
}

/// What a teacher sees about themselves: everything but the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub username: String,
    pub name: String,
    pub subject: String,
    pub email: String,
}

impl From<&TeacherAccount> for TeacherProfile {
    fn from(account: &TeacherAccount) -> Self {
        Self {
            username: account.username.clone(),
            name: account.name.clone(),
            subject: account.subject.clone(),
            email: account.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl Outcome {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub teacher_username: String,
    pub student_name: String,
    pub roll_number: String,
    pub predicted_marks: f64,
    pub result: Outcome,
    #[serde(with = "date_time")]
    pub date_time: NaiveDateTime,
}

impl Record for PredictionRecord {
    const HEADERS: &'static [&'static str] = &[
        "teacher_username",
        "student_name",
        "roll_number",
        "predicted_marks",
        "result",
        "date_time",
    ];
}

impl PredictionRecord {
    pub fn new(
        teacher_username: &str,
        student_name: String,
        roll_number: String,
        prediction: &Prediction,
        date_time: NaiveDateTime,
    ) -> Self {
        Self {
            teacher_username: teacher_username.to_string(),
            student_name,
            roll_number,
            predicted_marks: prediction.predicted_marks,
            result: prediction.result,
            // Stored at second precision, so drop the fraction up front.
            date_time: date_time.with_nanosecond(0).unwrap_or(date_time),
        }
    }
}

mod date_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_TIME_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(DATE_TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// The two flat tables backing the service.
pub struct Database {
    teachers: Mutex<CsvTable<TeacherAccount>>,
    history: Mutex<CsvTable<PredictionRecord>>,
}

impl Database {
    pub fn open(teachers_path: impl AsRef<Path>, history_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let teachers = CsvTable::open(teachers_path.as_ref())?;
        let history = CsvTable::open(history_path.as_ref())?;
        tracing::info!(
            teachers_file = %teachers.path().display(),
            teachers = teachers.len(),
            history_file = %history.path().display(),
            predictions = history.len(),
            "opened record store"
        );
        Ok(Database {
            teachers: Mutex::new(teachers),
            history: Mutex::new(history),
        })
    }

    /// Locks the account table. A poisoned lock is recovered: appends roll
    /// back on failure, so the table is consistent either way.
    pub fn teachers(&self) -> MutexGuard<'_, CsvTable<TeacherAccount>> {
        self.teachers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn history(&self) -> MutexGuard<'_, CsvTable<PredictionRecord>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn save_prediction(&self, record: PredictionRecord) -> Result<(), StoreError> {
        self.history().append(record)
    }

    /// A teacher's predictions, oldest first.
    pub fn predictions_for(&self, username: &str) -> Vec<PredictionRecord> {
        self.history()
            .rows()
            .iter()
            .filter(|record| record.teacher_username == username)
            .cloned()
            .collect()
    }

    pub fn prediction_count(&self) -> usize {
        self.history().len()
    }
}
