use clap::Subcommand;
use std::path::PathBuf;

pub mod execute;
pub mod fix;
pub mod inspect;

#[derive(Subcommand)]
pub enum Commands {
    /// Reverse triangle winding in a NIF file or every NIF under a directory
    Fix {
        /// NIF file or directory to process
        path: PathBuf,

        /// Output file (single input) or output root (directory input).
        /// Files are rewritten in place when omitted. Files with nothing
        /// to fix are never written, so no output appears for them.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        /// File extension to search for when `path` is a directory
        #[arg(long, default_value = "nif")]
        extension: String,

        /// Print the result as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Suppress progress bar and per-file lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show header, blocks and index streams of a NIF file
    Inspect {
        /// NIF file to inspect
        path: PathBuf,

        /// Print the summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
