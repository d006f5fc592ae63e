//! Command execution implementations

use super::Commands;
use super::{fix, inspect};

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Fix {
                path,
                output,
                dry_run,
                extension,
                json,
                quiet,
            } => fix::execute(
                path,
                output.as_deref(),
                *dry_run,
                extension,
                *json,
                *quiet,
            ),
            Commands::Inspect { path, json } => inspect::execute(path, *json),
        }
    }
}
