use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::database::TeacherAccount;

pub const SESSION_COOKIE: &str = "teacher_session";

const TOKEN_LEN: usize = 32;

/// Logged-in teachers keyed by an opaque cookie token.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, TeacherAccount>>,
}

impl SessionStore {
    pub fn start(&self, account: TeacherAccount) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), account);
        token
    }

    pub fn current(&self, token: &str) -> Option<TeacherAccount> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    pub fn end(&self, token: &str) -> Option<TeacherAccount> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
