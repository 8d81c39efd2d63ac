//! Dropwire command-line peer

mod args;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{Level, debug, error};
use tracing_subscriber::FmtSubscriber;

use args::{Args, Command};
use dropwire_common::link::ShareLink;
use dropwire_peer::SessionError;
use dropwire_peer::crypto::SessionKey;
use dropwire_peer::flow::FlowProfile;
use dropwire_peer::session::{CancelHandle, Receiver, SendRequest, Sender, SessionEvent};
use dropwire_peer::signaling::RelayClient;
use dropwire_peer::sink::DirectorySink;
use dropwire_peer::transport::TcpNegotiator;

/// Exit status after a cancelled transfer (as for SIGINT)
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to install log subscriber");
    }

    let result = match args.command {
        Command::Send {
            file,
            relay,
            origin,
            profile,
            bind,
        } => send(&file, &relay, &origin, profile, bind).await,
        Command::Receive {
            link,
            relay,
            output,
            profile,
        } => receive(&link, &relay, output, profile).await,
    };

    match result {
        Ok(()) => {}
        Err(e) if e.is_cancellation() => {
            eprintln!("Cancelled");
            process::exit(EXIT_CANCELLED);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

async fn send(
    file: &Path,
    relay: &str,
    origin: &str,
    profile: FlowProfile,
    bind: Option<std::net::IpAddr>,
) -> Result<(), SessionError> {
    let contents = tokio::fs::read(file).await?;
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(dropwire_common::control::FALLBACK_FILENAME)
        .to_string();

    let mut signaling = RelayClient::connect(relay).await?;
    let local_ip = signaling.local_addr().ip();
    let listen_ip = bind.unwrap_or(local_ip);
    let advertise_ip = if listen_ip.is_unspecified() {
        local_ip
    } else {
        listen_ip
    };
    debug!("Direct connections on {} (advertising {})", listen_ip, advertise_ip);
    let mut negotiator = TcpNegotiator::new(listen_ip, vec![advertise_ip]);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let sender = Sender::new(profile.config()).with_events(events_tx);
    cancel_on_ctrl_c(sender.cancel_handle());
    let printer = tokio::spawn(print_events(events_rx));

    let request = SendRequest {
        file_name,
        contents,
        origin: origin.to_string(),
    };
    let result = sender.run(request, &mut signaling, &mut negotiator).await;
    let _ = printer.await;
    result.map(|_| ())
}

async fn receive(
    link: &str,
    relay: &str,
    output: Option<PathBuf>,
    profile: FlowProfile,
) -> Result<(), SessionError> {
    let link = ShareLink::parse(link)?;
    let key = SessionKey::from_bytes(link.key);
    let mut sink = DirectorySink::new(output.unwrap_or_else(default_output_dir));

    let mut signaling = RelayClient::connect(relay).await?;
    let mut negotiator = TcpNegotiator::new(signaling.local_addr().ip(), Vec::new());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let receiver = Receiver::new(key, profile.config()).with_events(events_tx);
    cancel_on_ctrl_c(receiver.cancel_handle());
    let printer = tokio::spawn(print_events(events_rx));

    let result = receiver
        .run(&link, &mut signaling, &mut negotiator, &mut sink)
        .await;
    let _ = printer.await;
    result.map(|_| ())
}

/// Downloads directory if it exists, else the current directory
fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn cancel_on_ctrl_c(cancel: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            error!("failed to install Ctrl+C handler");
            return;
        }
        cancel.cancel();
    });
}

/// Render session events on the terminal until the session ends
async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::LinkReady(link) => {
                println!("Share this link with the receiver:\n\n  {}\n", link);
            }
            SessionEvent::Progress(progress) => {
                eprint!(
                    "\r{:>5.1}%  {} / {}  {}/s   ",
                    progress.percent,
                    format_size(progress.bytes as f64),
                    format_size(progress.total as f64),
                    format_size(progress.speed)
                );
            }
            SessionEvent::Completed { bytes, path } => {
                eprintln!();
                match path {
                    Some(path) => println!("Saved {} to {}", format_size(bytes as f64), path.display()),
                    None => println!("Sent {}", format_size(bytes as f64)),
                }
            }
            SessionEvent::Failed(_) | SessionEvent::Cancelled => eprintln!(),
            SessionEvent::SenderState(state) => debug!("state: {}", state),
            SessionEvent::ReceiverState(state) => debug!("state: {}", state),
        }
    }
}

/// Human-readable byte count
fn format_size(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", value as u64, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
