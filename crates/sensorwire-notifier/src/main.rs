//! Notifier binary for sensorwire.
//!
//! Wires the subscription registry, the dispatcher, and client
//! authentication to NATS. Storage-layer change notices arrive on the event
//! subject, client requests on the control subject, and payloads leave on
//! per-topic delivery subjects.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `sensorwire.yaml` (or `SENSORWIRE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to NATS
//! 4. Build the registry, auth service, and dispatcher
//! 5. Serve control requests in a background task
//! 6. Feed change notices into the dispatcher until interrupted, even while
//!    waiting for queue space
//! 7. Drain the queues and exit

mod control;
mod error;
mod intake;
mod nats_publisher;

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt as _;
use sensorwire_auth::AuthService;
use sensorwire_core::{BuiltinEvaluator, NotifierConfig, SubscriptionRegistry, SystemQueryParser};
use sensorwire_dispatch::{DispatchSettings, Dispatcher, Pipeline};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::control::ControlHandler;
use crate::error::NotifierError;
use crate::intake::{IntakeStop, decode_notice, run_intake};
use crate::nats_publisher::NatsPublisher;

/// Application entry point for the notifier.
///
/// # Errors
///
/// Returns an error if configuration, NATS, or dispatcher startup fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    let default_level = config.logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();

    info!(
        service_root = %config.service_root(),
        topic_prefix = %config.topic_prefix(),
        "sensorwire-notifier starting"
    );

    // 3. Connect to NATS.
    let nats_url = config.infrastructure.nats_url.as_str();
    info!(nats_url = nats_url, "Connecting to NATS");
    let client = async_nats::connect(nats_url)
        .await
        .map_err(|e| NotifierError::Nats {
            message: format!("failed to connect to {nats_url}: {e}"),
        })?;
    info!("NATS connection established");

    // 4. Registry, auth, dispatcher.
    let registry = Arc::new(SubscriptionRegistry::new());
    let auth = Arc::new(AuthService::from_config(&config.auth));
    let publisher = Arc::new(NatsPublisher::new(
        client.clone(),
        &config.infrastructure.delivery_subject_prefix,
    ));
    let pipeline = Pipeline::new(
        Arc::clone(&registry),
        Arc::new(BuiltinEvaluator),
        publisher,
    );
    let dispatcher = Dispatcher::start(DispatchSettings::from_config(&config.dispatch), pipeline)
        .map_err(NotifierError::from)?;

    // 5. Control requests.
    let handler = ControlHandler::new(
        Arc::clone(&registry),
        auth,
        Box::new(SystemQueryParser),
        &config.topic_prefix(),
        &config.service_root(),
        &config.infrastructure.delivery_subject_prefix,
    );
    let control = subscribe(&client, &config.infrastructure.control_subject).await?;
    tokio::spawn(serve_control(client.clone(), control, handler));

    // 6. Change notices.
    let notices = subscribe(&client, &config.infrastructure.event_subject)
        .await?
        .map(|message| decode_notice(message.subject.as_str(), &message.payload));
    info!(
        event_subject = %config.infrastructure.event_subject,
        control_subject = %config.infrastructure.control_subject,
        "notifier ready"
    );
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
        info!("interrupt received");
    };
    match run_intake(notices, &dispatcher, interrupt).await {
        IntakeStop::StreamClosed => warn!("event subscription closed"),
        IntakeStop::Shutdown => debug!("intake stopped"),
    }

    // 7. Drain.
    dispatcher.shutdown().await;
    if let Err(e) = client.flush().await {
        warn!(error = %e, "failed to flush NATS connection");
    }
    info!(subscriptions = registry.len(), "sensorwire-notifier shutdown complete");
    Ok(())
}

/// Load configuration from `SENSORWIRE_CONFIG` or `sensorwire.yaml`.
///
/// A missing file means defaults.
fn load_config() -> Result<NotifierConfig, NotifierError> {
    let path = std::env::var_os("SENSORWIRE_CONFIG")
        .map_or_else(|| PathBuf::from("sensorwire.yaml"), PathBuf::from);
    if path.exists() {
        Ok(NotifierConfig::from_file(&path)?)
    } else {
        Ok(NotifierConfig::parse("")?)
    }
}

async fn subscribe(
    client: &async_nats::Client,
    subject: &str,
) -> Result<async_nats::Subscriber, NotifierError> {
    debug!(subject = subject, "subscribing");
    client
        .subscribe(subject.to_owned())
        .await
        .map_err(|e| NotifierError::Nats {
            message: format!("failed to subscribe to {subject}: {e}"),
        })
}

/// Answer control requests until the subscription ends.
async fn serve_control(
    client: async_nats::Client,
    mut requests: async_nats::Subscriber,
    handler: ControlHandler,
) {
    while let Some(request) = requests.next().await {
        let reply = match ControlHandler::decode(&request.payload) {
            Ok(message) => handler.handle(&message),
            Err(e) => control::ControlReply {
                ok: false,
                subject: None,
                error: Some(format!("malformed request: {e}")),
            },
        };
        let Some(reply_to) = request.reply else {
            debug!("control request without reply subject");
            continue;
        };
        match serde_json::to_vec(&reply) {
            Ok(body) => {
                if let Err(e) = client.publish(reply_to, body.into()).await {
                    warn!(error = %e, "failed to send control reply");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode control reply"),
        }
    }
    warn!("control subscription closed");
}
