//! cadenza-daemon: the royalty ledger and distribution daemon.
//!
//! Single OS process running a Tokio async runtime. Collaborator services
//! and operator tooling talk to it via JSON-RPC over a Unix socket.
//!
//! Every service object is constructed once here and passed by reference
//! through [`DaemonState`]; there are no module-level singletons.

mod commands;
mod config;
mod events;
mod rpc;
mod scheduler;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use cadenza_payout::channel::StubGateway;
use cadenza_payout::orchestrator::PayoutOrchestrator;
use cadenza_treasury::distributor::TreasuryDistributor;

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Period distribution service.
    pub distributor: TreasuryDistributor,
    /// Payout orchestration service.
    pub orchestrator: PayoutOrchestrator<StubGateway>,
    /// Token required by elevated RPC methods.
    pub admin_token: String,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cadenza=info".parse()?),
        )
        .init();

    info!("Cadenza daemon starting");

    // 1. Load config; the fund split is validated before anything runs
    let config = DaemonConfig::load()?;
    let distributor = TreasuryDistributor::new(config.fund_split())
        .map_err(|e| anyhow::anyhow!("invalid treasury configuration: {e}"))?;
    let data_dir = config.data_dir();

    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("cadenza.db");
    let conn = cadenza_db::open(&db_path)?;
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    // 3. Admin token for elevated methods
    let admin_token = if config.rpc.admin_token.is_empty() {
        let token = hex::encode(rand::random::<[u8; 16]>());
        info!("Generated admin token: {token}");
        token
    } else {
        config.rpc.admin_token.clone()
    };

    // 4. Event bus and shutdown channel
    let event_bus = EventBus::new(1000);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 5. Build daemon state
    let state = Arc::new(DaemonState {
        db,
        config,
        event_bus,
        distributor,
        orchestrator: PayoutOrchestrator::new(StubGateway),
        admin_token,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 6. Start the scheduler loop
    if state.config.scheduler.enabled {
        let scheduler_state = state.clone();
        tokio::spawn(async move {
            scheduler::scheduler_loop(scheduler_state).await;
        });
    }

    // 7. Start the RPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    state.event_bus.emit(events::Event {
        event_type: "DaemonStarted".to_string(),
        timestamp: scheduler::unix_now(),
        payload: serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    });

    // 8. Run until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Daemon shutting down gracefully");
    let _ = shutdown_tx.send(());
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
