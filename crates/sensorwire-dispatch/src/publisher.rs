//! The outbound side of dispatch.

use std::future::Future;

use crate::error::PublishError;

/// Delivers a formatted payload to subscribers of a topic.
///
/// Called once per matching subscription per event. Implementations must
/// be cheap to share across worker tasks.
pub trait Publisher: Send + Sync + 'static {
    /// Publish `payload` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] when the transport rejects the message.
    /// The dispatcher logs it and carries on with other subscriptions.
    fn publish(
        &self,
        topic: &str,
        payload: String,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}
