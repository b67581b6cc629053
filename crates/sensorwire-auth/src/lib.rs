//! Client authentication for sensorwire.
//!
//! Clients log in with a username and password checked by a
//! [`CredentialProvider`]. A successful login opens a session in the
//! [`SessionCache`]; later role checks read and refresh it. Stale sessions
//! are removed on the login path by a [`SessionJanitor`].
//!
//! # Modules
//!
//! - [`provider`] -- Principals and credential checking
//! - [`session`] -- Session records and the concurrent cache
//! - [`janitor`] -- Eviction policy hooks
//! - [`service`] -- Login and role checks
//! - [`error`] -- Auth error type

pub mod error;
pub mod janitor;
pub mod provider;
pub mod service;
pub mod session;

pub use error::AuthError;
pub use janitor::{NoopJanitor, OpportunisticSweep, SessionJanitor};
pub use provider::{CredentialProvider, Principal, StaticCredentials};
pub use service::{AuthService, LoginOutcome};
pub use session::{SessionCache, SessionRecord};
