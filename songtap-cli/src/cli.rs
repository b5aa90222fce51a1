use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Watches HTTP traffic for playlist responses and saves the media they list
#[derive(Parser, Debug)]
#[command(name = "songtap")]
#[command(version)]
#[command(about = "Passively captures playlist traffic and saves the media it references")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to <config dir>/songtap/config.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture live traffic from a network device
    Listen {
        /// Device to capture on (defaults to the first suitable device)
        #[arg(short, long)]
        device: Option<String>,

        /// BPF capture filter
        #[arg(short, long)]
        filter: Option<String>,

        /// Directory downloaded media is written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Seconds to wait before each download
        #[arg(long)]
        delay: Option<u64>,
    },

    /// Run a saved capture file through the same pipeline
    Replay {
        /// pcap file to read
        file: PathBuf,

        /// BPF filter applied to the file
        #[arg(short, long)]
        filter: Option<String>,

        /// Directory downloaded media is written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Seconds to wait before each download
        #[arg(long)]
        delay: Option<u64>,
    },

    /// List capture devices
    Devices,
}
