//! Command-line argument parsing

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dropwire_common::{DEFAULT_ORIGIN, DEFAULT_RELAY_URL};
use dropwire_peer::flow::FlowProfile;

/// Send and receive files over an encrypted direct connection
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt a file and wait for a receiver
    Send {
        /// File to send
        file: PathBuf,

        /// Signaling relay URL
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        relay: String,

        /// Origin used in the share link
        #[arg(long, default_value = DEFAULT_ORIGIN)]
        origin: String,

        /// Chunk size and pacing profile
        #[arg(long, value_enum, default_value_t = FlowProfile::Standard)]
        profile: FlowProfile,

        /// Address to accept the direct connection on (default: the
        /// interface used to reach the relay)
        #[arg(long)]
        bind: Option<IpAddr>,
    },

    /// Download a file from a share link
    Receive {
        /// Share link printed by the sender
        link: String,

        /// Signaling relay URL
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        relay: String,

        /// Directory to save into (default: downloads, then current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chunk size and pacing profile
        #[arg(long, value_enum, default_value_t = FlowProfile::Standard)]
        profile: FlowProfile,
    },
}
