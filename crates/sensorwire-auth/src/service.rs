//! The authentication boundary used by the notifier.

use std::sync::Arc;

use chrono::Utc;
use sensorwire_core::config::AuthConfig;
use tracing::{debug, error, info, trace, warn};

use crate::janitor::{OpportunisticSweep, SessionJanitor};
use crate::provider::{CredentialProvider, StaticCredentials};
use crate::session::{SessionCache, SessionRecord};

/// Result of one login attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Whether the credentials were accepted and a session opened.
    pub accepted: bool,
    /// Clients whose sessions the pre-login sweep removed.
    pub evicted: Vec<String>,
}

/// Logs clients in and answers role checks against their sessions.
pub struct AuthService {
    sessions: Arc<SessionCache>,
    provider: Arc<dyn CredentialProvider>,
    janitor: Arc<dyn SessionJanitor>,
    allow_anonymous_read: bool,
    read_role: String,
}

impl AuthService {
    /// Assemble a service from its parts.
    pub fn new(
        sessions: Arc<SessionCache>,
        provider: Arc<dyn CredentialProvider>,
        janitor: Arc<dyn SessionJanitor>,
    ) -> Self {
        Self {
            sessions,
            provider,
            janitor,
            allow_anonymous_read: false,
            read_role: AuthConfig::default().read_role,
        }
    }

    /// Static users, opportunistic sweep, and read policy from the `auth`
    /// config section.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            sessions: Arc::new(SessionCache::new()),
            provider: Arc::new(StaticCredentials::from_config(&config.users)),
            janitor: Arc::new(OpportunisticSweep::from_hours(config.session_max_age_hours)),
            allow_anonymous_read: config.allow_anonymous_read,
            read_role: config.read_role.clone(),
        }
    }

    /// The session cache backing this service.
    pub const fn sessions(&self) -> &Arc<SessionCache> {
        &self.sessions
    }

    /// Check a login and open a session for `client_id` when it succeeds.
    ///
    /// Stale sessions are swept first; a failing sweep is logged and does
    /// not affect the login.
    pub fn is_valid_user(&self, client_id: &str, username: &str, password: &str) -> bool {
        self.login(client_id, username, password).accepted
    }

    /// Like [`is_valid_user`](Self::is_valid_user), also reporting which
    /// clients lost their session in the pre-login sweep.
    pub fn login(&self, client_id: &str, username: &str, password: &str) -> LoginOutcome {
        let now = Utc::now();
        let evicted = self
            .janitor
            .before_login(&self.sessions, now)
            .unwrap_or_else(|e| {
                warn!(error = %e, "session cleanup failed, continuing login");
                Vec::new()
            });

        debug!(client_id, username, "login attempt");
        let accepted = match self.provider.authenticate(username, password) {
            Ok(Some(principal)) => {
                self.sessions
                    .put(client_id, SessionRecord::new(client_id, principal, now));
                info!(client_id, username, "client logged in");
                true
            }
            Ok(None) => {
                info!(client_id, username, "login rejected");
                false
            }
            Err(e) => {
                error!(client_id, username, error = %e, "login failed");
                false
            }
        };
        LoginOutcome { accepted, evicted }
    }

    /// Whether the session for `client_id` holds `role`. Refreshes the
    /// session. A client without a session has no roles.
    pub fn user_has_role(&self, client_id: &str, username: &str, role: &str) -> bool {
        let Some(record) = self.sessions.touch(client_id, Utc::now()) else {
            return false;
        };
        let has_role = record.principal.has_role(role);
        trace!(client_id, username, role, has_role, "role check");
        has_role
    }

    /// Whether `client_id` may subscribe.
    pub fn may_read(&self, client_id: &str, username: &str) -> bool {
        self.allow_anonymous_read || self.user_has_role(client_id, username, &self.read_role)
    }

    /// Forget the session for `client_id`.
    pub fn logout(&self, client_id: &str) {
        if self.sessions.remove(client_id).is_some() {
            debug!(client_id, "session closed");
        }
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("sessions", &self.sessions.len())
            .field("allow_anonymous_read", &self.allow_anonymous_read)
            .field("read_role", &self.read_role)
            .finish_non_exhaustive()
    }
}
