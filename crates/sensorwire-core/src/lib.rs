//! Subscription core for sensorwire.
//!
//! Turns topic strings into subscriptions, keeps the live set of them, and
//! decides which subscriptions a changed entity is delivered to. Also owns
//! the notifier configuration, since every other crate is configured from
//! it.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with defaults and validation
//! - [`topic`] -- Topic path grammar
//! - [`query`] -- System query option parsing
//! - [`filter`] -- Path-derived filters and their evaluator
//! - [`subscription`] -- A single subscription and its payload formatting
//! - [`registry`] -- Concurrent subscription store
//! - [`error`] -- Query, subscription, and filter errors

pub mod config;
pub mod error;
pub mod filter;
pub mod query;
pub mod registry;
pub mod subscription;
pub mod topic;

pub use config::{ConfigError, NotifierConfig};
pub use error::{FilterError, QueryError, SubscriptionError};
pub use filter::{BuiltinEvaluator, Filter, FilterEvaluator};
pub use query::{FilterExpression, OrderBy, Query, QueryParser, SystemQueryParser};
pub use registry::{SubscriptionList, SubscriptionRegistry};
pub use subscription::{Subscription, SubscriptionKind};
pub use topic::{ResourcePath, Topic, parse_topic};
