//! Client control messages: login, subscribe, unsubscribe, logout.
//!
//! Clients send JSON requests on the control subject and receive a
//! [`ControlReply`] on the request's reply subject. A successful subscribe
//! reply names the NATS subject the client should listen on.

use std::sync::Arc;

use dashmap::DashMap;
use sensorwire_auth::AuthService;
use sensorwire_core::{QueryParser, Subscription, SubscriptionRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::nats_publisher::delivery_subject;

/// One control request, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Authenticate and open a session.
    Login {
        /// Client identifier chosen by the client.
        client_id: String,
        /// Login name.
        username: String,
        /// Password or token.
        password: String,
    },
    /// Start receiving payloads for a topic.
    Subscribe {
        /// Client identifier.
        client_id: String,
        /// Login name, empty for anonymous clients.
        #[serde(default)]
        username: String,
        /// The topic, e.g. `v1.0/Datastreams(7)/Observations`.
        topic: String,
    },
    /// Stop receiving payloads for a topic.
    Unsubscribe {
        /// Client identifier.
        client_id: String,
        /// The topic as subscribed.
        topic: String,
    },
    /// Drop the session and every subscription of the client.
    Logout {
        /// Client identifier.
        client_id: String,
    },
}

/// Answer to a [`ControlMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlReply {
    /// Whether the request succeeded.
    pub ok: bool,
    /// Delivery subject, on a successful subscribe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Reason, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlReply {
    const fn ok() -> Self {
        Self {
            ok: true,
            subject: None,
            error: None,
        }
    }

    fn refused(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            subject: None,
            error: Some(error.into()),
        }
    }
}

/// Applies control messages to the registry and the session cache.
pub struct ControlHandler {
    registry: Arc<SubscriptionRegistry>,
    auth: Arc<AuthService>,
    parser: Box<dyn QueryParser>,
    topic_prefix: String,
    service_root: String,
    delivery_prefix: String,
    client_topics: DashMap<String, Vec<String>>,
}

impl ControlHandler {
    /// Create a handler.
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        auth: Arc<AuthService>,
        parser: Box<dyn QueryParser>,
        topic_prefix: &str,
        service_root: &str,
        delivery_prefix: &str,
    ) -> Self {
        Self {
            registry,
            auth,
            parser,
            topic_prefix: topic_prefix.to_owned(),
            service_root: service_root.to_owned(),
            delivery_prefix: delivery_prefix.trim_end_matches('.').to_owned(),
            client_topics: DashMap::new(),
        }
    }

    /// Apply one request.
    pub fn handle(&self, message: &ControlMessage) -> ControlReply {
        match message {
            ControlMessage::Login {
                client_id,
                username,
                password,
            } => {
                let outcome = self.auth.login(client_id, username, password);
                for evicted in &outcome.evicted {
                    if !(outcome.accepted && evicted == client_id) {
                        self.release(evicted);
                    }
                }
                if outcome.accepted {
                    ControlReply::ok()
                } else {
                    ControlReply::refused("invalid credentials")
                }
            }
            ControlMessage::Subscribe {
                client_id,
                username,
                topic,
            } => self.subscribe(client_id, username, topic),
            ControlMessage::Unsubscribe { client_id, topic } => self.unsubscribe(client_id, topic),
            ControlMessage::Logout { client_id } => {
                self.logout(client_id);
                ControlReply::ok()
            }
        }
    }

    fn subscribe(&self, client_id: &str, username: &str, topic: &str) -> ControlReply {
        if !self.auth.may_read(client_id, username) {
            info!(client_id, topic, "subscribe refused, client may not read");
            return ControlReply::refused("not authorized to read");
        }
        let subscription = match Subscription::from_topic(
            topic,
            &self.topic_prefix,
            &self.service_root,
            self.parser.as_ref(),
        ) {
            Ok(subscription) => subscription,
            Err(e) => {
                debug!(client_id, topic, error = %e, "subscribe rejected");
                return ControlReply::refused(e.to_string());
            }
        };

        let mut topics = self.client_topics.entry(client_id.to_owned()).or_default();
        if !topics.iter().any(|t| t == topic) {
            self.registry.register(subscription);
            topics.push(topic.to_owned());
            info!(
                client_id,
                topic,
                subscribers = self.registry.subscriber_count(topic),
                "client subscribed"
            );
        }
        ControlReply {
            ok: true,
            subject: Some(delivery_subject(&self.delivery_prefix, topic)),
            error: None,
        }
    }

    fn unsubscribe(&self, client_id: &str, topic: &str) -> ControlReply {
        let removed = self
            .client_topics
            .get_mut(client_id)
            .and_then(|mut topics| {
                let index = topics.iter().position(|t| t == topic)?;
                Some(topics.swap_remove(index))
            })
            .is_some();
        if !removed {
            return ControlReply::refused("not subscribed to this topic");
        }
        self.client_topics
            .remove_if(client_id, |_, topics| topics.is_empty());
        let gone = self.registry.unregister(topic);
        info!(client_id, topic, last_subscriber = gone, "client unsubscribed");
        ControlReply::ok()
    }

    fn logout(&self, client_id: &str) {
        self.release(client_id);
        self.auth.logout(client_id);
    }

    /// Unregister every topic held by `client_id`.
    fn release(&self, client_id: &str) {
        if let Some((_, topics)) = self.client_topics.remove(client_id) {
            for topic in &topics {
                self.registry.unregister(topic);
            }
            debug!(client_id, released = topics.len(), "client subscriptions released");
        }
    }

    /// Parse a raw request payload.
    pub fn decode(payload: &[u8]) -> Result<ControlMessage, serde_json::Error> {
        serde_json::from_slice(payload).inspect_err(|e| {
            warn!(error = %e, "undecodable control message");
        })
    }
}

impl std::fmt::Debug for ControlHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandler")
            .field("topic_prefix", &self.topic_prefix)
            .field("clients", &self.client_topics.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use sensorwire_auth::{Principal, SessionRecord};
    use sensorwire_core::SystemQueryParser;
    use sensorwire_core::config::{AuthConfig, UserConfig};
    use sensorwire_types::EntityType;

    use super::*;

    fn handler(allow_anonymous_read: bool) -> ControlHandler {
        let auth = AuthService::from_config(&AuthConfig {
            allow_anonymous_read,
            users: vec![UserConfig {
                username: "reader".to_owned(),
                password: "r".to_owned(),
                roles: vec!["read".to_owned()],
            }],
            ..AuthConfig::default()
        });
        ControlHandler::new(
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(auth),
            Box::new(SystemQueryParser),
            "v1.0/",
            "http://localhost:8080/sensorwire/v1.0",
            "sensorwire.notify",
        )
    }

    fn login(client_id: &str) -> ControlMessage {
        ControlMessage::Login {
            client_id: client_id.to_owned(),
            username: "reader".to_owned(),
            password: "r".to_owned(),
        }
    }

    fn subscribe(client_id: &str, topic: &str) -> ControlMessage {
        ControlMessage::Subscribe {
            client_id: client_id.to_owned(),
            username: "reader".to_owned(),
            topic: topic.to_owned(),
        }
    }

    #[test]
    fn messages_decode_by_action() {
        let msg = ControlHandler::decode(
            br#"{"action":"subscribe","client_id":"c1","topic":"v1.0/Things"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ControlMessage::Subscribe {
                client_id: "c1".to_owned(),
                username: String::new(),
                topic: "v1.0/Things".to_owned(),
            }
        );
        assert!(ControlHandler::decode(br#"{"action":"dance"}"#).is_err());
    }

    #[test]
    fn subscribe_requires_login() {
        let handler = handler(false);
        let refused = handler.handle(&subscribe("c1", "v1.0/Things"));
        assert!(!refused.ok);

        let login = handler.handle(&ControlMessage::Login {
            client_id: "c1".to_owned(),
            username: "reader".to_owned(),
            password: "r".to_owned(),
        });
        assert!(login.ok);
        let reply = handler.handle(&subscribe("c1", "v1.0/Things"));
        assert!(reply.ok);
        assert_eq!(
            reply.subject.as_deref(),
            Some("sensorwire.notify.v1_2E0_2FThings")
        );
        assert_eq!(handler.registry.for_type(EntityType::Thing).len(), 1);
    }

    #[test]
    fn invalid_topic_is_refused_with_reason() {
        let handler = handler(true);
        let reply = handler.handle(&subscribe("c1", "v1.0/Things?$filter=id eq 1"));
        assert!(!reply.ok);
        assert!(reply.error.unwrap().contains("$filter"));
        assert!(handler.registry.is_empty());
    }

    #[test]
    fn shared_topic_survives_one_unsubscribe() {
        let handler = handler(true);
        assert!(handler.handle(&subscribe("c1", "v1.0/Sensors")).ok);
        assert!(handler.handle(&subscribe("c2", "v1.0/Sensors")).ok);
        // Repeat from the same client does not double count.
        assert!(handler.handle(&subscribe("c2", "v1.0/Sensors")).ok);
        assert_eq!(handler.registry.subscriber_count("v1.0/Sensors"), 2);

        let reply = handler.handle(&ControlMessage::Unsubscribe {
            client_id: "c1".to_owned(),
            topic: "v1.0/Sensors".to_owned(),
        });
        assert!(reply.ok);
        assert_eq!(handler.registry.subscriber_count("v1.0/Sensors"), 1);

        let again = handler.handle(&ControlMessage::Unsubscribe {
            client_id: "c1".to_owned(),
            topic: "v1.0/Sensors".to_owned(),
        });
        assert!(!again.ok);

        handler.handle(&ControlMessage::Logout {
            client_id: "c2".to_owned(),
        });
        assert!(handler.registry.is_empty());
    }

    #[test]
    fn last_unsubscribe_forgets_the_client() {
        let handler = handler(true);
        assert!(handler.handle(&subscribe("c1", "v1.0/Things")).ok);
        assert!(
            handler
                .handle(&ControlMessage::Unsubscribe {
                    client_id: "c1".to_owned(),
                    topic: "v1.0/Things".to_owned(),
                })
                .ok
        );
        assert!(handler.client_topics.get("c1").is_none());
        assert!(handler.client_topics.is_empty());
        assert!(handler.registry.is_empty());
    }

    #[test]
    fn evicted_session_releases_its_subscriptions() {
        let handler = handler(false);
        assert!(handler.handle(&login("c1")).ok);
        assert!(handler.handle(&subscribe("c1", "v1.0/Things")).ok);
        assert!(handler.handle(&login("c2")).ok);
        assert!(handler.handle(&subscribe("c2", "v1.0/Sensors")).ok);

        // c1 goes quiet for two days.
        let long_ago = Utc::now().checked_sub_signed(Duration::hours(48)).unwrap();
        handler.auth.sessions().put(
            "c1",
            SessionRecord::new("c1", Principal::new("reader", ["read"]), long_ago),
        );

        assert!(handler.handle(&login("c3")).ok);
        assert!(handler.client_topics.get("c1").is_none());
        assert_eq!(handler.registry.subscriber_count("v1.0/Things"), 0);
        assert!(handler.registry.for_type(EntityType::Thing).is_empty());
        assert_eq!(handler.registry.subscriber_count("v1.0/Sensors"), 1);
    }

    #[test]
    fn own_stale_session_keeps_topics_on_relogin() {
        let handler = handler(false);
        assert!(handler.handle(&login("c1")).ok);
        assert!(handler.handle(&subscribe("c1", "v1.0/Things")).ok);
        let long_ago = Utc::now().checked_sub_signed(Duration::hours(48)).unwrap();
        handler.auth.sessions().put(
            "c1",
            SessionRecord::new("c1", Principal::new("reader", ["read"]), long_ago),
        );

        assert!(handler.handle(&login("c1")).ok);
        assert_eq!(handler.registry.subscriber_count("v1.0/Things"), 1);
    }
}
