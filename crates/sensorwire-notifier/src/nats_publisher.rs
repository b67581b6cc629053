//! NATS delivery of formatted payloads.
//!
//! Each subscription topic maps to one NATS subject under the configured
//! delivery prefix. Topics contain characters NATS treats specially (`.`,
//! `*`, `>`, whitespace), so the topic is escaped into a single subject
//! token: ASCII letters, digits, and `-` pass through, every other byte
//! becomes `_XX` (uppercase hex).

use sensorwire_dispatch::{PublishError, Publisher};
use tracing::trace;

/// Publishes payloads on per-topic NATS subjects.
pub struct NatsPublisher {
    client: async_nats::Client,
    subject_prefix: String,
}

impl NatsPublisher {
    /// Wrap a connected client.
    pub fn new(client: async_nats::Client, subject_prefix: &str) -> Self {
        Self {
            client,
            subject_prefix: subject_prefix.trim_end_matches('.').to_owned(),
        }
    }

    /// The subject payloads for `topic` are published on.
    pub fn subject_for(&self, topic: &str) -> String {
        delivery_subject(&self.subject_prefix, topic)
    }
}

impl Publisher for NatsPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PublishError> {
        let subject = self.subject_for(topic);
        trace!(topic, subject = subject, bytes = payload.len(), "publishing payload");
        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| PublishError {
                topic: topic.to_owned(),
                message: e.to_string(),
            })
    }
}

impl std::fmt::Debug for NatsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsPublisher")
            .field("subject_prefix", &self.subject_prefix)
            .finish_non_exhaustive()
    }
}

/// `<prefix>.<escaped topic>`.
pub fn delivery_subject(prefix: &str, topic: &str) -> String {
    let capacity = prefix.len().saturating_add(topic.len()).saturating_add(1);
    let mut subject = String::with_capacity(capacity);
    subject.push_str(prefix);
    subject.push('.');
    for byte in topic.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            subject.push(char::from(byte));
        } else {
            subject.push_str(&format!("_{byte:02X}"));
        }
    }
    subject
}
