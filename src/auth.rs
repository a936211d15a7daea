//! Registration and login against the account table.
//!
//! Credentials are compared as stored, in plaintext.

use thiserror::Error;

use crate::database::TeacherAccount;
use crate::store::{CsvTable, StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0} must not be empty")]
    MissingField(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn register(
    accounts: &mut CsvTable<TeacherAccount>,
    account: TeacherAccount,
) -> Result<TeacherAccount, AuthError> {
    if account.username.is_empty() {
        return Err(AuthError::MissingField("username"));
    }
    if account.password.is_empty() {
        return Err(AuthError::MissingField("password"));
    }
    if accounts.rows().iter().any(|existing| existing.username == account.username) {
        return Err(AuthError::DuplicateUsername);
    }

    accounts.append(account.clone())?;
    Ok(account)
}

pub fn login(
    accounts: &CsvTable<TeacherAccount>,
    username: &str,
    password: &str,
) -> Result<TeacherAccount, AuthError> {
    accounts
        .rows()
        .iter()
        .find(|account| account.username == username && account.password == password)
        .cloned()
        .ok_or(AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn account(username: &str, password: &str) -> TeacherAccount {
        TeacherAccount {
            username: username.to_string(),
            password: password.to_string(),
            name: format!("{} Kamau", username),
            subject: "Mathematics".to_string(),
            email: format!("{}@school.ac.ke", username),
        }
    }

    #[test]
    fn test_register_then_login_returns_stored_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut accounts = CsvTable::open(dir.path().join("teachers.csv")).unwrap();

        register(&mut accounts, account("wanjiru", "s3cret")).unwrap();
        let found = login(&accounts, "wanjiru", "s3cret").unwrap();

        assert_eq!(found, account("wanjiru", "s3cret"));
    }

    #[test]
    fn test_duplicate_username_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teachers.csv");
        let mut accounts = CsvTable::open(&path).unwrap();
        register(&mut accounts, account("wanjiru", "first")).unwrap();
        let on_disk = fs::read_to_string(&path).unwrap();

        let err = register(&mut accounts, account("wanjiru", "second")).unwrap_err();

        assert!(matches!(err, AuthError::DuplicateUsername));
        assert_eq!(err.to_string(), "Username already exists");
        assert_eq!(accounts.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), on_disk);
        assert!(login(&accounts, "wanjiru", "first").is_ok());
    }

    #[test]
    fn test_wrong_password_or_user_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut accounts = CsvTable::open(dir.path().join("teachers.csv")).unwrap();
        register(&mut accounts, account("otieno", "pw")).unwrap();

        assert!(matches!(
            login(&accounts, "otieno", "PW"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&accounts, "Otieno", "pw"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&accounts, "nobody", "pw"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_empty_credentials_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut accounts = CsvTable::open(dir.path().join("teachers.csv")).unwrap();

        let err = register(&mut accounts, account("", "pw")).unwrap_err();
        assert!(matches!(err, AuthError::MissingField("username")));

        let err = register(&mut accounts, account("kip", "")).unwrap_err();
        assert!(matches!(err, AuthError::MissingField("password")));

        assert!(accounts.is_empty());
    }
}
