//! Configuration loading and typed config structures for the notifier.
//!
//! The configuration lives in `sensorwire.yaml`. Every field has a default,
//! so an empty file (or none at all) yields a working local setup. Loading
//! validates the result; a configuration that cannot run is rejected up
//! front rather than failing at the first event.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but cannot be used.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level notifier configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotifierConfig {
    /// Service identity (root URL, API version).
    #[serde(default)]
    pub service: ServiceConfig,

    /// Topic prefix, queue depths, and worker pool sizes.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Client authentication and session settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Infrastructure connection strings and subjects.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NotifierConfig {
    /// Load and validate configuration from a YAML file at the given path.
    ///
    /// `NATS_URL` overrides `infrastructure.nats_url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.service_root_url.trim().is_empty() {
            return Err(invalid("service.service_root_url must not be empty"));
        }
        let sizes = [
            ("dispatch.create_queue_size", self.dispatch.create_queue_size),
            ("dispatch.create_pool_size", self.dispatch.create_pool_size),
            ("dispatch.update_queue_size", self.dispatch.update_queue_size),
            ("dispatch.update_pool_size", self.dispatch.update_pool_size),
        ];
        for (name, value) in sizes {
            if value < 1 {
                return Err(invalid(&format!("{name} must be at least 1, got {value}")));
            }
        }
        if self.infrastructure.event_subject.trim().is_empty() {
            return Err(invalid("infrastructure.event_subject must not be empty"));
        }
        if self.infrastructure.control_subject.trim().is_empty() {
            return Err(invalid("infrastructure.control_subject must not be empty"));
        }
        if self.infrastructure.delivery_subject_prefix.trim().is_empty() {
            return Err(invalid(
                "infrastructure.delivery_subject_prefix must not be empty",
            ));
        }
        if self.auth.session_max_age_hours < 1 {
            return Err(invalid("auth.session_max_age_hours must be at least 1"));
        }
        Ok(())
    }

    /// The effective service root: `<service_root_url>/<api_version>`.
    pub fn service_root(&self) -> String {
        format!(
            "{}/{}",
            self.service.service_root_url.trim_end_matches('/'),
            self.service.api_version
        )
    }

    /// The topic prefix stripped from subscription topics. Defaults to
    /// `<api_version>/`.
    pub fn topic_prefix(&self) -> String {
        self.dispatch
            .topic_prefix
            .clone()
            .unwrap_or_else(|| format!("{}/", self.service.api_version))
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_owned(),
    }
}

/// Service identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Base URL under which the service is reachable.
    #[serde(default = "default_service_root_url")]
    pub service_root_url: String,

    /// API version path segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_root_url: default_service_root_url(),
            api_version: default_api_version(),
        }
    }
}

/// Dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchConfig {
    /// Prefix stripped from topics. `None` means `<api_version>/`.
    #[serde(default)]
    pub topic_prefix: Option<String>,

    /// Capacity of the create-event queue.
    #[serde(default = "default_create_queue_size")]
    pub create_queue_size: usize,

    /// Workers draining the create-event queue.
    #[serde(default = "default_create_pool_size")]
    pub create_pool_size: usize,

    /// Capacity of the update-event queue.
    #[serde(default = "default_update_queue_size")]
    pub update_queue_size: usize,

    /// Workers draining the update-event queue.
    #[serde(default = "default_update_pool_size")]
    pub update_pool_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            topic_prefix: None,
            create_queue_size: default_create_queue_size(),
            create_pool_size: default_create_pool_size(),
            update_queue_size: default_update_queue_size(),
            update_pool_size: default_update_pool_size(),
        }
    }
}

/// Client authentication settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// Whether unauthenticated clients may subscribe.
    #[serde(default)]
    pub allow_anonymous_read: bool,

    /// Role required to subscribe.
    #[serde(default = "default_read_role")]
    pub read_role: String,

    /// Sessions idle longer than this are evicted on the next login.
    #[serde(default = "default_session_max_age_hours")]
    pub session_max_age_hours: u32,

    /// Static user list.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_anonymous_read: false,
            read_role: default_read_role(),
            session_max_age_hours: default_session_max_age_hours(),
            users: Vec::new(),
        }
    }
}

/// One statically configured user.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct UserConfig {
    /// Login name.
    pub username: String,
    /// Password, compared verbatim.
    pub password: String,
    /// Roles granted on login.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl core::fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Infrastructure connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject carrying entity change notices from the storage layer.
    #[serde(default = "default_event_subject")]
    pub event_subject: String,

    /// Subject carrying client login and subscription requests.
    #[serde(default = "default_control_subject")]
    pub control_subject: String,

    /// Subject prefix under which payloads for each topic are published.
    #[serde(default = "default_delivery_subject_prefix")]
    pub delivery_subject_prefix: String,
}

impl InfrastructureConfig {
    /// Override infrastructure URLs with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = val;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            event_subject: default_event_subject(),
            control_subject: default_control_subject(),
            delivery_subject_prefix: default_delivery_subject_prefix(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_service_root_url() -> String {
    "http://localhost:8080/sensorwire".to_owned()
}

fn default_api_version() -> String {
    "v1.0".to_owned()
}

const fn default_create_queue_size() -> usize {
    10
}

const fn default_create_pool_size() -> usize {
    5
}

const fn default_update_queue_size() -> usize {
    10
}

const fn default_update_pool_size() -> usize {
    10
}

fn default_read_role() -> String {
    "read".to_owned()
}

const fn default_session_max_age_hours() -> u32 {
    24
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_event_subject() -> String {
    "sensorwire.entity.changes".to_owned()
}

fn default_control_subject() -> String {
    "sensorwire.client.control".to_owned()
}

fn default_delivery_subject_prefix() -> String {
    "sensorwire.notify".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
