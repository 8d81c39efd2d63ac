//! Dropwire Signaling Relay

mod args;

use std::net::SocketAddr;
use std::process;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use args::Args;
use dropwire_relay::constants::MSG_BANNER;
use dropwire_relay::peers::PeerManager;
use dropwire_relay::reaper::spawn_reaper;
use dropwire_relay::rooms::RoomRegistry;
use dropwire_relay::{http, server};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to install log subscriber");
    }

    println!("{}{}", MSG_BANNER, env!("CARGO_PKG_VERSION"));

    let signaling_addr = SocketAddr::new(args.bind, args.port);
    let http_addr = SocketAddr::new(args.bind, args.http_port);

    let signaling_listener = bind_or_exit(signaling_addr).await;
    let http_listener = bind_or_exit(http_addr).await;

    info!(addr = %signaling_addr, "signaling listening");
    info!(addr = %http_addr, "diagnostics listening");

    let rooms = RoomRegistry::new();
    let peers = PeerManager::new();
    let reaper = spawn_reaper(rooms.clone(), args.reap_interval());

    tokio::select! {
        result = server::serve(signaling_listener, rooms.clone(), peers) => {
            if let Err(e) = result {
                error!(error = %e, "signaling listener failed");
            }
        }
        result = http::serve(http_listener, rooms) => {
            if let Err(e) = result {
                error!(error = %e, "diagnostics listener failed");
            }
        }
        _ = setup_shutdown_signal() => {
            info!("shutting down");
        }
    }

    reaper.abort();
}

/// Bind a listener or exit with an error
async fn bind_or_exit(addr: SocketAddr) -> TcpListener {
    match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", addr, e);
            process::exit(1);
        }
    }
}

/// Setup graceful shutdown signal handling (Ctrl+C)
async fn setup_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            error!("failed to install signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            error!("failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
