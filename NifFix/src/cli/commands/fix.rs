//! Fix command
//!
//! Accepts a single file or a directory. Directories are searched
//! recursively and repaired in parallel.

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{GEAR, LOOKING_GLASS, print_done, print_step, simple_bar};
use crate::error::Error;
use crate::fix::{
    BatchFixResult, FileStatus, FixOptions, FixOutcome, OutputTarget, batch_fix,
    discover_nif_files, fix_file,
};

pub fn execute(
    path: &Path,
    output: Option<&Path>,
    dry_run: bool,
    extension: &str,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    if path.is_file() {
        let options = FixOptions {
            output: output.map_or(OutputTarget::InPlace, |o| OutputTarget::File(o.to_path_buf())),
            dry_run,
        };
        fix_single(path, &options, json)
    } else if path.is_dir() {
        let options = FixOptions {
            output: output.map_or(OutputTarget::InPlace, |o| OutputTarget::Mirror {
                source_root: path.to_path_buf(),
                output_root: o.to_path_buf(),
            }),
            dry_run,
        };
        fix_directory(path, &options, extension, json, quiet)
    } else {
        Err(Error::PathNotFound {
            path: path.to_path_buf(),
        }
        .into())
    }
}

fn fix_single(path: &Path, options: &FixOptions, json: bool) -> anyhow::Result<()> {
    let report = fix_file(path, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match report.outcome {
        FixOutcome::Fixed => {
            let verb = if options.dry_run { "Would fix" } else { "Fixed" };
            println!(
                "{verb} {}: {} regions, {} triangles",
                path.display(),
                report.located.len(),
                report.triangles_reversed
            );
            if let Some(written) = &report.written {
                println!("Written to: {}", written.display());
            }
        }
        FixOutcome::SkippedNoIndices => {
            println!("Unchanged {}: no index streams", path.display());
        }
    }
    for skipped in &report.skipped {
        println!(
            "  skipped stream {} of mesh {}: {}",
            skipped.stream, skipped.mesh, skipped.reason
        );
    }
    Ok(())
}

fn fix_directory(
    dir: &Path,
    options: &FixOptions,
    extension: &str,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let show_progress = !json && !quiet;

    if show_progress {
        print_step(1, 2, LOOKING_GLASS, &format!("Scanning {}...", dir.display()));
    }
    let discovery = discover_nif_files(dir, extension);
    let files = discovery.files;

    if files.is_empty() && discovery.failures.is_empty() {
        if json {
            let empty = batch_fix(&[], options, |_, _, _| {});
            println!("{}", serde_json::to_string_pretty(&empty)?);
        } else {
            println!("No .{extension} files found in: {}", dir.display());
        }
        return Ok(());
    }

    let result = if show_progress {
        print_step(2, 2, GEAR, &format!("Fixing {} files...", files.len()));
        let pb = simple_bar(files.len() as u64, "Fixing");
        let result = batch_fix(&files, options, |current, _, file| {
            pb.set_position(current as u64);
            if let Some(name) = file.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
        });
        pb.finish_and_clear();
        result
    } else {
        batch_fix(&files, options, |_, _, _| {})
    }
    .with_failures(discovery.failures);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if !quiet {
            print_results(&result, options.dry_run);
        }
        println!(
            "Done: {} fixed, {} unchanged, {} failed",
            result.fixed_count, result.skipped_count, result.error_count
        );
        if show_progress {
            print_done(started.elapsed());
        }
    }

    if result.has_errors() {
        anyhow::bail!(
            "{} of {} files failed",
            result.error_count,
            result.results.len()
        );
    }
    Ok(())
}

fn print_results(result: &BatchFixResult, dry_run: bool) {
    for file in &result.results {
        match &file.status {
            FileStatus::Fixed {
                regions,
                triangles,
                skipped,
            } => {
                let verb = if dry_run { "would fix" } else { "fixed" };
                print!(
                    "  {verb}      {} ({regions} regions, {triangles} triangles",
                    file.path.display()
                );
                if *skipped > 0 {
                    print!(", {skipped} streams skipped");
                }
                println!(")");
            }
            FileStatus::SkippedNoIndices { .. } => {
                println!("  unchanged  {}", file.path.display());
            }
            FileStatus::Error {
                message,
                unsupported_format,
            } => {
                let label = if *unsupported_format {
                    "unsupported"
                } else {
                    "failed"
                };
                println!("  {label:<10} {}: {message}", file.path.display());
            }
        }
    }
}
