//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Skirmish command-line arguments.
///
/// CLI values override settings loaded from `skirmish.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "skirmish", about = "Skirmish multiplayer session")]
pub struct CliArgs {
    /// Rendezvous host that room codes resolve against.
    #[arg(long)]
    pub rendezvous: Option<String>,

    /// First port of the rendezvous range.
    #[arg(long)]
    pub port_base: Option<u16>,

    /// World broadcast rate in Hz.
    #[arg(long)]
    pub broadcast_rate: Option<u32>,

    /// Follower input rate in Hz.
    #[arg(long)]
    pub input_rate: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref host) = args.rendezvous {
            self.network.rendezvous_host = host.clone();
        }
        if let Some(port) = args.port_base {
            self.network.port_base = port;
        }
        if let Some(rate) = args.broadcast_rate {
            self.network.broadcast_rate_hz = rate;
        }
        if let Some(rate) = args.input_rate {
            self.network.input_rate_hz = rate;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
