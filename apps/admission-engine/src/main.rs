//! Admission Engine Binary
//!
//! Runs the admission engine against the paper broker, reading buy requests
//! as JSON lines on stdin.
//!
//! # Usage
//!
//! ```bash
//! echo '{"symbol":"AAPL","total_cost":"10000"}' | cargo run --bin admission-engine
//! ```
//!
//! # Environment Variables
//!
//! - `ADMISSION_CONFIG`: Path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: Log filter (default: `logging.level` from the config)

use std::sync::Arc;
use std::time::Duration;

use admission_engine::application::ports::{BrokerPort, NotifierPort};
use admission_engine::application::services::RecoveryDirective;
use admission_engine::application::use_cases::OrderFlowManager;
use admission_engine::config::{AdmissionConfig, DEFAULT_CONFIG_PATH, load_or_default};
use admission_engine::infrastructure::config::Container;
use admission_engine::infrastructure::notify::{ChannelNotifier, Notification, TracingNotifier};
use admission_engine::telemetry::init_tracing;
use anyhow::Context;
use tokio::io::BufReader;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path = std::env::var("ADMISSION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let (config, defaulted) =
        load_or_default(&config_path).with_context(|| format!("loading configuration from {config_path}"))?;

    init_tracing(&config.logging);
    if defaulted {
        tracing::warn!(path = %config_path, "Config file not found, using defaults");
    }
    log_config(&config);

    tracing::info!("Starting Admission Engine");

    let shutdown = CancellationToken::new();
    let (notifier, notifications) = ChannelNotifier::new(config.channels.notifications);
    let notifier_handle = spawn_notification_forwarder(notifications, Arc::new(TracingNotifier), shutdown.clone());
    let notifier: Arc<dyn NotifierPort> = Arc::new(notifier);
    let (container, broker_events) = Container::paper(config, notifier);

    let dispatch_loop = container
        .dispatch_loop(shutdown.clone())
        .context("order dispatch loop already started")?;
    let dispatch_handle = tokio::spawn(dispatch_loop.run());

    let (directive_tx, directive_rx) = mpsc::channel(container.config().channels.directives);
    let bridge = container.event_bridge(broker_events, directive_tx, shutdown.clone());
    let bridge_handle = tokio::spawn(bridge.run());

    let directive_handle = spawn_directive_handler(directive_rx, container.flow(), shutdown.clone());
    let sweeper_handle = container.flow().spawn_expiry_sweeper(shutdown.clone());

    container.broker().publish_account();

    let intake = container.signal_intake(shutdown.clone());
    let intake_handle = tokio::spawn(intake.run(BufReader::new(tokio::io::stdin())));

    tracing::info!("Admission engine ready");

    shutdown_signal().await;
    shutdown.cancel();

    let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        tokio::join!(
            dispatch_handle,
            bridge_handle,
            directive_handle,
            sweeper_handle,
            intake_handle,
            notifier_handle
        )
    })
    .await;

    match joined {
        Ok((dispatch, bridge, _, _, intake, _)) => {
            if let Ok(stats) = dispatch {
                tracing::info!(dispatched = stats.dispatched, vetoed = stats.vetoed, "Dispatch summary");
            }
            if let Ok(stats) = bridge {
                tracing::info!(events = stats.events, resumed = stats.resumed, "Bridge summary");
            }
            if let Ok(stats) = intake {
                tracing::info!(submitted = stats.submitted, rejected = stats.rejected, "Intake summary");
            }
        }
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Background tasks did not stop in time"
        ),
    }

    tracing::info!(
        in_flight = container.gateway().in_flight_count(),
        parked = container.flow().parked_count(),
        "Admission engine stopped"
    );
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &AdmissionConfig) {
    tracing::info!(
        veto_threshold = %config.dispatch.veto_threshold,
        step_down_factor = %config.dispatch.step_down_factor,
        max_step_down_attempts = config.dispatch.max_step_down_attempts,
        fragment_count = config.admission.fragment_count,
        max_parked = config.resume.max_parked,
        queue_capacity = config.queue.capacity,
        "Configuration loaded"
    );
}

/// Act on recovery directives in place of an external principal.
///
/// Step-downs go back through admission at their reduced size and are
/// queued if admitted; abandonments are logged.
fn spawn_directive_handler<B>(
    mut directives: mpsc::Receiver<RecoveryDirective>,
    flow: Arc<OrderFlowManager<B>>,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    B: BrokerPort + 'static,
{
    tokio::spawn(async move {
        loop {
            let directive = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                directive = directives.recv() => match directive {
                    Some(directive) => directive,
                    None => break,
                },
            };
            match directive {
                RecoveryDirective::StepDown { order, attempt } => {
                    tracing::info!(
                        symbol = %order.symbol,
                        quantity = %order.quantity,
                        attempt,
                        "Re-admitting stepped-down order"
                    );
                    if flow.resubmit(&order).is_none() {
                        tracing::warn!(symbol = %order.symbol, transaction_id = %order.transaction_id, "Stepped-down order dropped");
                    }
                }
                RecoveryDirective::Abandoned { symbol, attempts } => {
                    tracing::error!(%symbol, attempts, "Symbol abandoned after margin rejections");
                }
            }
        }
    })
}

/// Deliver queued notifications to `sink` off the dispatch path.
///
/// Drains what is already queued once shutdown is requested.
fn spawn_notification_forwarder(
    mut notifications: mpsc::Receiver<Notification>,
    sink: Arc<dyn NotifierPort>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                notification = notifications.recv() => match notification {
                    Some(notification) => notification.deliver(sink.as_ref()),
                    None => return,
                },
            }
        }
        notifications.close();
        while let Ok(notification) = notifications.try_recv() {
            notification.deliver(sink.as_ref());
        }
    })
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; the process could not
/// otherwise be stopped cleanly.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
