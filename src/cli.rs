use clap::{Parser, Subcommand};

use crate::embedding::EmbeddingBackend;
use crate::models::record::RecordFormat;
use crate::models::report::PipelineMode;

#[derive(Parser)]
#[command(
    name = "comment-drift",
    version,
    about = "Measure how comments drift from the code they describe"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pretty-print JSON output (default: compact)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every record file under a directory and report per-label means
    Analyze {
        /// Directory containing record files
        #[arg(short, long, default_value = ".")]
        dir: String,

        /// Pipeline mode (default: from config, "parallel")
        #[arg(short, long, value_enum)]
        mode: Option<PipelineMode>,

        /// Worker threads for parallel mode (0 = CPU count - 1)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Embedding backend (default: from config)
        #[arg(short, long, value_enum)]
        backend: Option<EmbeddingBackend>,

        /// Print a human-readable summary instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// Parse a single record file and print it as JSON
    Parse {
        /// Path to the record file
        #[arg(short, long)]
        path: String,

        /// Record layout (default: inferred from the file extension)
        #[arg(short, long, value_enum)]
        format: Option<RecordFormat>,
    },

    /// Histogram change sizes of keyed-section records by label
    Changes {
        /// Directory containing record files
        #[arg(short, long, default_value = ".")]
        dir: String,
    },

    /// Generate default configuration file
    Init {
        /// Path to write the configuration file (default: ~/.config/comment-drift/config.toml)
        #[arg(short, long)]
        path: Option<std::path::PathBuf>,
    },
}
