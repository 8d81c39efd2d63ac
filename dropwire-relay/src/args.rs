//! Command-line argument parsing

use clap::Parser;
use dropwire_common::{DEFAULT_HTTP_PORT, DEFAULT_PORT, DEFAULT_REAP_INTERVAL};
use std::net::IpAddr;
use std::time::Duration;

/// Dropwire signaling relay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IP address to bind to (IPv4 or IPv6)
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port for WebSocket signaling
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Port for the HTTP diagnostics endpoints
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Seconds between sweeps for empty rooms
    #[arg(long, default_value_t = DEFAULT_REAP_INTERVAL.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub reap_interval: u64,

    /// Enable debug logging (shows connect, join and forward events)
    #[arg(long, default_value = "false")]
    pub debug: bool,
}

impl Args {
    /// Reaper interval as a duration
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["dropwired"]);
        assert_eq!(args.port, DEFAULT_PORT);
        assert_eq!(args.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(args.reap_interval(), DEFAULT_REAP_INTERVAL);
        assert!(!args.debug);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "dropwired",
            "--bind",
            "127.0.0.1",
            "--port",
            "9000",
            "--http-port",
            "9001",
            "--reap-interval",
            "5",
            "--debug",
        ]);
        assert_eq!(args.bind.to_string(), "127.0.0.1");
        assert_eq!(args.port, 9000);
        assert_eq!(args.http_port, 9001);
        assert_eq!(args.reap_interval(), Duration::from_secs(5));
        assert!(args.debug);
    }

    #[test]
    fn test_zero_reap_interval_rejected() {
        assert!(Args::try_parse_from(["dropwired", "--reap-interval", "0"]).is_err());
    }
}
