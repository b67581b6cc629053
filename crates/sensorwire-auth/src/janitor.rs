//! Session eviction policy, run before each login attempt.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::AuthError;
use crate::session::SessionCache;

/// Hook invoked on the login path to evict stale sessions.
pub trait SessionJanitor: Send + Sync {
    /// Clean `cache` as of `now`. Returns the ids of the clients whose
    /// session was removed, so their subscriptions can be released.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Cleanup`] if the sweep cannot run. The caller
    /// logs it and continues the login.
    fn before_login(
        &self,
        cache: &SessionCache,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, AuthError>;
}

/// Removes sessions idle for longer than `max_age` on every login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpportunisticSweep {
    max_age: Duration,
}

impl OpportunisticSweep {
    /// Default idle limit in hours.
    pub const DEFAULT_MAX_AGE_HOURS: u32 = 24;

    /// Sweep sessions idle longer than `max_age`.
    pub const fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// Sweep sessions idle longer than `hours`.
    pub fn from_hours(hours: u32) -> Self {
        Self::new(Duration::hours(i64::from(hours)))
    }

    /// The idle limit.
    pub const fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl Default for OpportunisticSweep {
    fn default() -> Self {
        Self::from_hours(Self::DEFAULT_MAX_AGE_HOURS)
    }
}

impl SessionJanitor for OpportunisticSweep {
    fn before_login(
        &self,
        cache: &SessionCache,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, AuthError> {
        let cutoff = now
            .checked_sub_signed(self.max_age)
            .ok_or_else(|| AuthError::Cleanup {
                message: format!("cutoff {now} minus {} is out of range", self.max_age),
            })?;
        debug!(size = cache.len(), %cutoff, "sweeping session cache");
        let evicted = cache.evict_idle(cutoff);
        debug!(removed = evicted.len(), size = cache.len(), "session sweep done");
        Ok(evicted)
    }
}

/// Never evicts anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopJanitor;

impl SessionJanitor for NoopJanitor {
    fn before_login(
        &self,
        _cache: &SessionCache,
        _now: DateTime<Utc>,
    ) -> Result<Vec<String>, AuthError> {
        Ok(Vec::new())
    }
}
