//! Credential checking.

use std::collections::{BTreeSet, HashMap};

use sensorwire_core::config::UserConfig;
use tracing::debug;

use crate::error::AuthError;

/// An authenticated subject and the roles it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Login name.
    pub subject: String,
    /// Granted roles.
    pub roles: BTreeSet<String>,
}

impl Principal {
    /// A principal with the given roles.
    pub fn new<I, S>(subject: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject: subject.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the principal holds `role`, ignoring ASCII case.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Decides whether a username and password are valid.
pub trait CredentialProvider: Send + Sync {
    /// Check the credentials.
    ///
    /// Returns `Ok(None)` for a rejected login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] when the backend itself fails.
    fn authenticate(&self, username: &str, password: &str) -> Result<Option<Principal>, AuthError>;
}

/// Users listed in the configuration file.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, (String, Principal)>,
}

impl StaticCredentials {
    /// Build from the `auth.users` config list. Later duplicates win.
    pub fn from_config(users: &[UserConfig]) -> Self {
        let users = users
            .iter()
            .map(|user| {
                (
                    user.username.clone(),
                    (
                        user.password.clone(),
                        Principal::new(user.username.clone(), user.roles.iter().cloned()),
                    ),
                )
            })
            .collect();
        Self { users }
    }

    /// Number of configured users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no user is configured.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialProvider for StaticCredentials {
    fn authenticate(&self, username: &str, password: &str) -> Result<Option<Principal>, AuthError> {
        match self.users.get(username) {
            Some((expected, principal)) if expected == password => Ok(Some(principal.clone())),
            Some(_) => {
                debug!(username, "password mismatch");
                Ok(None)
            }
            None => {
                debug!(username, "unknown user");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("users", &self.users.len())
            .finish()
    }
}
