//! Hi/lo equation poker server.
//!
//! Spawns the lobby actor that owns every room and serves the WebSocket
//! endpoint plus the static client.

use std::{net::SocketAddr, path::PathBuf};

use anyhow::Error;
use hilo_poker::LobbyActor;
use hp_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use log::{error, info};
use pico_args::Arguments;

const HELP: &str = "\
Run a hi/lo equation poker server

USAGE:
  hp_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address    [default: env SERVER_BIND or 127.0.0.1:3000]
  --static-dir    PATH     Directory with the web client [default: env STATIC_DIR or public]
  --metrics-bind  IP:PORT  Prometheus exporter address   [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  STARTING_CHIPS           Chips each player sits down with
  EQUATION_WINDOW_SECS     Time allowed to form an equation
  EQUATION_GRACE_SECS      Extra time before silent players are folded
  MAX_PLAYERS_PER_ROOM     Seats per room
  HEARTBEAT_INTERVAL_SECS  Seconds between liveness pings
  RATE_LIMIT_MAX_MESSAGES  Inbound messages allowed per window
  RATE_LIMIT_WINDOW_SECS   Rate limit window
  ROOM_TTL_SECS            Age after which rooms are swept
  ROOM_SWEEP_INTERVAL_SECS How often rooms are swept
  (See .env file for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    static_dir: Option<PathBuf>,
    metrics_bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        static_dir: pargs.opt_value_from_str("--static-dir")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.static_dir, args.metrics_bind)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics exported on http://{addr}/metrics");
    }

    let (actor, lobby) = LobbyActor::new(config.game.clone(), config.room_sweep_interval());
    let lobby_task = tokio::spawn(actor.run());

    let bind = config.bind;
    info!(
        "Serving client files from {}",
        config.static_dir.display()
    );
    let app = api::create_router(AppState::new(lobby, config));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind, e))?;

    info!("Server is running at http://{}. Press Ctrl+C to stop.", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    lobby_task.abort();

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {e}");
        std::future::pending::<()>().await;
    }
}
