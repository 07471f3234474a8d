//! punchd - the punchclock attendance service
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - Attendance engine
//! - Attendance log sink and IPC notices
//! - IPC server
//! - Expiry sweep timer

mod dispatch;
mod notifier;
mod outbox;

use anyhow::{Context, Result};
use clap::Parser;
use punch_api::{Event, EventPayload};
use punch_config::{Policy, load_config};
use punch_core::AttendanceEngine;
use punch_ipc::{IpcServer, ServerMessage};
use punch_sink::build_sink;
use punch_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use punch_util::default_config_path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::dispatch::Dispatcher;
use crate::notifier::IpcNotifier;
use crate::outbox::Outbox;

/// How long shutdown waits for queued attendance rows to be delivered
const OUTBOX_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// punchd - clock-in/clock-out attendance service
#[derive(Parser, Debug)]
#[command(name = "punchd")]
#[command(about = "Clock-in/clock-out attendance service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/punchclock/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set PUNCH_SOCKET env var)
    #[arg(short, long, env = "PUNCH_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set PUNCH_DATA_DIR env var)
    #[arg(short, long, env = "PUNCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    policy: Policy,
    engine: AttendanceEngine,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let policy = if args.config.exists() {
            load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?
        } else {
            warn!(config_path = %args.config.display(), "Config file not found, using defaults");
            Policy::default()
        };

        info!(
            config_path = %args.config.display(),
            cooldown_secs = policy.attendance.cooldown.as_secs(),
            max_shift_secs = policy.attendance.max_shift.as_secs(),
            sweep_interval_secs = policy.attendance.sweep_interval.as_secs(),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| policy.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("punchd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let engine = AttendanceEngine::new(policy.attendance, store.clone())
            .context("Failed to load attendance state")?;

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start()
            .await
            .with_context(|| format!("Failed to bind socket {:?}", socket_path))?;

        Ok(Self {
            policy,
            engine,
            ipc: Arc::new(ipc),
            store,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc = self.ipc.clone();
        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let sink = build_sink(&self.policy.sink).context("Failed to set up attendance sink")?;
        info!(sink = sink.name(), "Attendance sink ready");

        let (outbox, outbox_handle) = Outbox::spawn(
            sink,
            Arc::new(IpcNotifier::new(ipc.clone())),
            self.policy.attendance.display_offset,
        );

        let dispatcher = Dispatcher::new(Arc::new(Mutex::new(self.engine)), outbox);
        let store = self.store.clone();

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        // First tick fires immediately, closing shifts that expired while down
        let mut sweep_timer = tokio::time::interval(self.policy.attendance.sweep_interval);
        sweep_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                _ = sweep_timer.tick() => {
                    let expired = dispatcher.sweep().await;
                    if expired > 0 {
                        info!(expired, "Expiry sweep closed shifts");
                    } else {
                        debug!("Expiry sweep found nothing to close");
                    }
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&dispatcher, &ipc, &store, msg).await;
                }
            }
        }

        info!("Shutting down punchd");

        ipc.broadcast_event(Event::new(EventPayload::Shutdown));

        // Dropping the last sender lets the outbox drain and finish
        drop(dispatcher);
        Self::drain_outbox(outbox_handle).await;

        if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    async fn drain_outbox(handle: JoinHandle<()>) {
        match tokio::time::timeout(OUTBOX_DRAIN_TIMEOUT, handle).await {
            Ok(Ok(())) => debug!("Outbox flushed"),
            Ok(Err(e)) => warn!(error = %e, "Outbox task failed"),
            Err(_) => warn!("Timed out delivering queued attendance rows"),
        }
    }

    async fn handle_ipc_message(
        dispatcher: &Dispatcher,
        ipc: &Arc<IpcServer>,
        store: &Arc<dyn Store>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let Some(info) = ipc.get_client_info(&client_id).await else {
                    debug!(client_id = %client_id, "Request from departed client");
                    return;
                };

                let response = dispatcher
                    .handle(&client_id, info.role, request.request_id, request.command)
                    .await;

                if let Err(e) = ipc.send_response(&client_id, response).await {
                    debug!(client_id = %client_id, error = %e, "Response not delivered");
                }
            }

            ServerMessage::ClientConnected { client_id, info } => {
                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    role: format!("{:?}", info.role),
                    uid: info.uid,
                }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientDisconnected {
                    client_id: client_id.to_string(),
                }));
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "punchd starting");

    let service = Service::new(&args).await?;
    service.run().await
}
