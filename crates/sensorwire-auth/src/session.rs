//! Short-lived client sessions.
//!
//! A session is created on a successful login and refreshed on every
//! authorization check. Eviction is driven by the login path through a
//! [`SessionJanitor`](crate::janitor::SessionJanitor); nothing here runs on
//! a timer.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::provider::Principal;

/// What the cache remembers about a logged-in client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Transport-level client identifier.
    pub client_id: String,
    /// Name the client logged in with.
    pub user_name: String,
    /// The authenticated subject.
    pub principal: Principal,
    /// Opaque session token.
    pub token: Uuid,
    /// Last login or authorization check.
    pub last_seen: DateTime<Utc>,
}

impl SessionRecord {
    /// A fresh record for a login that just succeeded.
    pub fn new(client_id: &str, principal: Principal, now: DateTime<Utc>) -> Self {
        Self {
            client_id: client_id.to_owned(),
            user_name: principal.subject.clone(),
            principal,
            token: Uuid::new_v4(),
            last_seen: now,
        }
    }
}

/// Concurrent map from client id to session.
#[derive(Debug, Default)]
pub struct SessionCache {
    sessions: DashMap<String, SessionRecord>,
}

impl SessionCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` under `client_id`, replacing any previous session.
    pub fn put(&self, client_id: &str, record: SessionRecord) {
        self.sessions.insert(client_id.to_owned(), record);
    }

    /// A copy of the session for `client_id`.
    pub fn get(&self, client_id: &str) -> Option<SessionRecord> {
        self.sessions.get(client_id).map(|entry| entry.value().clone())
    }

    /// Refresh `last_seen` and return the updated record.
    pub fn touch(&self, client_id: &str, now: DateTime<Utc>) -> Option<SessionRecord> {
        self.sessions.get_mut(client_id).map(|mut entry| {
            entry.last_seen = now;
            entry.value().clone()
        })
    }

    /// Remove every session last seen before `cutoff`. Returns how many
    /// were removed.
    pub fn sweep(&self, cutoff: DateTime<Utc>) -> usize {
        self.evict_idle(cutoff).len()
    }

    /// Remove every session last seen before `cutoff` and return the
    /// client ids that lost their session.
    pub fn evict_idle(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        let mut evicted = Vec::new();
        self.sessions.retain(|client_id, record| {
            let keep = record.last_seen >= cutoff;
            if !keep {
                evicted.push(client_id.clone());
            }
            keep
        });
        evicted
    }

    /// Drop the session for `client_id`.
    pub fn remove(&self, client_id: &str) -> Option<SessionRecord> {
        self.sessions.remove(client_id).map(|(_, record)| record)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn hours_ago(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::hours(hours)).unwrap()
    }

    fn record(client_id: &str, last_seen: DateTime<Utc>) -> SessionRecord {
        SessionRecord::new(client_id, Principal::new("reader", ["read"]), last_seen)
    }

    #[test]
    fn put_get_remove() {
        let cache = SessionCache::new();
        let now = Utc::now();
        cache.put("c1", record("c1", now));
        assert_eq!(cache.get("c1").unwrap().user_name, "reader");
        assert_eq!(cache.len(), 1);
        assert!(cache.remove("c1").is_some());
        assert!(cache.is_empty());
        assert!(cache.get("c1").is_none());
    }

    #[test]
    fn touch_refreshes_last_seen() {
        let cache = SessionCache::new();
        let then = hours_ago(Utc::now(), 3);
        cache.put("c1", record("c1", then));
        let now = Utc::now();
        assert_eq!(cache.touch("c1", now).unwrap().last_seen, now);
        assert_eq!(cache.get("c1").unwrap().last_seen, now);
        assert!(cache.touch("missing", now).is_none());
    }

    #[test]
    fn sweep_removes_only_stale_sessions() {
        let cache = SessionCache::new();
        let now = Utc::now();
        cache.put("old", record("old", hours_ago(now, 25)));
        cache.put("new", record("new", hours_ago(now, 1)));
        assert_eq!(cache.sweep(hours_ago(now, 24)), 1);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn evict_idle_names_evicted_clients() {
        let cache = SessionCache::new();
        let now = Utc::now();
        cache.put("a", record("a", hours_ago(now, 30)));
        cache.put("b", record("b", hours_ago(now, 26)));
        cache.put("c", record("c", now));
        let mut evicted = cache.evict_idle(hours_ago(now, 24));
        evicted.sort();
        assert_eq!(evicted, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(cache.len(), 1);
    }
}
