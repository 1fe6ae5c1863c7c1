//! Operator login
//!
//! The allow-list is handed in from configuration. A [`Session`] can only be
//! obtained from [`Operators::authenticate`], and every scan entry point asks
//! for one, so an unauthenticated operator has no way to trigger a scan.

use crate::error::AuthError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// Username -> password allow-list
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Operators {
    credentials: HashMap<String, String>,
}

impl Operators {
    /// Build an allow-list from (username, password) pairs
    pub fn new<I, U, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            credentials: pairs
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }

    /// Number of operators allowed to log in
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// True when nobody can log in
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Check a username/password pair against the allow-list
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        match self.credentials.get(username) {
            Some(expected) if expected == password => {
                info!(operator = username, "operator logged in");
                Ok(Session {
                    operator: username.to_string(),
                })
            }
            _ => {
                warn!(operator = username, "rejected operator login");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

impl fmt::Debug for Operators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.credentials.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Operators")
            .field("usernames", &names)
            .finish_non_exhaustive()
    }
}

/// Proof of a successful login, held for the operator's connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    operator: String,
}

impl Session {
    /// Logged-in username
    pub fn operator(&self) -> &str {
        &self.operator
    }
}
