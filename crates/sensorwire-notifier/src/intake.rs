//! Inbound entity change notices from the storage layer.
//!
//! A notice is a JSON object naming the event class, the entity type, and
//! the flat row as stored:
//!
//! ```json
//! {"class": "create", "entity_type": "Observation",
//!  "row": {"id": 42, "result_type": 0, "result_string": "3.14", "datastream_id": 7}}
//! ```

use std::future::Future;

use futures::{Stream, StreamExt as _};
use sensorwire_codec::Row;
use sensorwire_dispatch::{ChangeEvent, Dispatcher, EventClass};
use sensorwire_types::EntityType;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::NotifierError;

/// Wire form of one change notice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeNotice {
    /// Create or update.
    pub class: EventClass,
    /// Layout of `row`.
    pub entity_type: EntityType,
    /// The stored row.
    pub row: Row,
}

impl ChangeNotice {
    /// Turn the notice into a dispatchable event.
    pub fn into_event(self) -> ChangeEvent {
        ChangeEvent::row(self.class, self.entity_type, self.row)
    }
}

/// Decode a notice received on `subject`.
pub fn decode_notice(subject: &str, payload: &[u8]) -> Result<ChangeEvent, NotifierError> {
    serde_json::from_slice::<ChangeNotice>(payload)
        .map(ChangeNotice::into_event)
        .map_err(|e| NotifierError::Malformed {
            subject: subject.to_owned(),
            message: e.to_string(),
        })
}

/// Why [`run_intake`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStop {
    /// The notice stream ended.
    StreamClosed,
    /// The shutdown future completed.
    Shutdown,
}

/// Feed decoded notices into `dispatcher` until the stream ends or
/// `shutdown` completes.
///
/// `shutdown` is polled both while waiting for the next notice and while
/// an enqueue waits for queue space, so a full queue cannot hold off an
/// interrupt.
pub async fn run_intake<S, F>(mut notices: S, dispatcher: &Dispatcher, shutdown: F) -> IntakeStop
where
    S: Stream<Item = Result<ChangeEvent, NotifierError>> + Unpin,
    F: Future,
{
    tokio::pin!(shutdown);
    loop {
        let notice = tokio::select! {
            notice = notices.next() => notice,
            _ = &mut shutdown => return IntakeStop::Shutdown,
        };
        let event = match notice {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!(error = %e, "skipping change notice");
                continue;
            }
            None => return IntakeStop::StreamClosed,
        };
        tokio::select! {
            admitted = dispatcher.enqueue(event) => {
                if let Err(e) = admitted {
                    warn!(error = %e, "change notice not dispatched");
                }
            }
            _ = &mut shutdown => {
                info!("shutdown while waiting for queue space");
                return IntakeStop::Shutdown;
            }
        }
    }
}
