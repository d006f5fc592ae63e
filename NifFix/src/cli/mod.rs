//! NifFix CLI - Command-line interface for NIF winding repair

pub mod commands;
pub mod progress;

use clap::Parser;
use commands::Commands;
use tracing::Level;

#[derive(Parser)]
#[command(name = "niffix")]
#[command(version, about = "NifFix: repair inside-out Gamebryo NIF meshes", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Run the NifFix CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    cli.command.execute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_help_mentions_unchanged_files() {
        let cmd = Cli::command();
        let fix = cmd.find_subcommand("fix").unwrap();
        let output = fix
            .get_arguments()
            .find(|arg| arg.get_id() == "output")
            .unwrap();
        let help = output.get_help().unwrap().to_string();
        assert!(help.contains("nothing to fix are never written"));
    }
}
