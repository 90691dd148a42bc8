//! Multi-room hold'em chip coordinator server.
//!
//! Boots the snapshot store, reconstitutes persisted rooms into actors, and
//! serves the admission API plus the WebSocket session layer.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use pico_args::Arguments;

use holdem_chips::{Database, PgSnapshotStore, RegistryConfig, RoomRegistry, SnapshotStore};

use hc_server::{api, config::ServerConfig, logging, metrics};

const HELP: &str = "\
Run the hold'em chip coordinator server

USAGE:
  hc_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                    Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                   PostgreSQL connection string
  HC_METRICS_BIND                Prometheus exporter address [default: 127.0.0.1:9090]
  SESSION_HEARTBEAT_SECS         Expected client ping interval [default: 3]
  SESSION_LIVENESS_TIMEOUT_SECS  Silence budget before disconnect [default: 15]
  ROOM_IDLE_TTL_SECS             Idle room lifetime [default: 600]
  ROOM_SWEEP_INTERVAL_SECS       Idle sweep cadence [default: 10]
  AUTO_FOLD_DISCONNECTED         Fold a disconnected player on their turn [default: false]
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // dotenvy does not override variables that are already set.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }
    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("configuration validation failed: {e}"))?;
    tracing::info!("configuration loaded and validated");

    if let Err(e) = metrics::init_metrics(config.metrics_bind) {
        tracing::warn!("failed to initialize metrics: {e}");
    } else {
        tracing::info!(
            "metrics endpoint available at http://{}/metrics",
            config.metrics_bind
        );
    }

    tracing::info!("connecting to database");
    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect to database: {e}"))?;
    db.migrate()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run schema bootstrap: {e}"))?;
    tracing::info!("database connected");

    let store: Arc<dyn SnapshotStore> = Arc::new(PgSnapshotStore::new(db.pool().clone()));
    let registry = Arc::new(RoomRegistry::new(
        store,
        RegistryConfig {
            idle_room_ttl_secs: config.rooms.idle_room_ttl_secs,
            auto_fold_disconnected: config.rooms.auto_fold_disconnected,
        },
    ));

    let now = chrono::Utc::now().timestamp();
    match registry.restore_all(now).await {
        Ok(count) => tracing::info!("restored {count} room(s) from the snapshot store"),
        Err(e) => tracing::error!("failed to restore rooms: {e}"),
    }

    // Background sweep: delete rooms whose players have all gone away.
    let sweep_registry = registry.clone();
    let sweep_interval = config.rooms.sweep_interval_secs;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            let now = chrono::Utc::now().timestamp();
            sweep_registry.sweep_idle(now).await;
            metrics::active_rooms(sweep_registry.active_room_count().await);
        }
    });

    let state = api::AppState {
        registry: registry.clone(),
        session: config.session,
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {e}", config.bind))?;
    tracing::info!("server running at http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    tracing::info!("shutting down");
    registry.shutdown().await;
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
}
