use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tivoshare")]
#[command(author, version, about = "Share video directories with TiVo receivers")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the QueryContainer listing of a share or folder
    Query {
        /// Container, e.g. "Movies" or "Movies/Action"
        #[arg(required = true)]
        container: String,

        /// Number of entries (negative pages backwards)
        #[arg(long, allow_hyphen_values = true)]
        item_count: Option<i64>,

        /// Entry the page is positioned after
        #[arg(long)]
        anchor: Option<String>,

        /// Offset applied after the anchor
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        anchor_offset: i64,

        /// Serial of the requesting device
        #[arg(long)]
        tsn: Option<String>,
    },

    /// Print the TVBusQuery details of a single file
    Tvbus {
        /// Container holding the file
        container: String,

        /// File path below the container, e.g. "/Action/x.mp4"
        file: String,

        /// Serial of the requesting device
        #[arg(long)]
        tsn: Option<String>,
    },

    /// Push a file to a device through the TiVo mind service
    Push {
        /// Container holding the file
        container: String,

        /// File path below the container
        file: String,

        /// Target device serial or configured name
        #[arg(long, required = true)]
        tsn: String,
    },

    /// Probe a video file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe every eligible file in a share ahead of listings
    Precache {
        /// Share name
        share: String,
    },

    /// Write the stream a device would receive for a file
    Transcode {
        /// File to transcode
        #[arg(required = true)]
        file: PathBuf,

        /// Serial of the target device
        #[arg(long)]
        tsn: Option<String>,

        /// Output file
        #[arg(short, long, required = true)]
        output: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
