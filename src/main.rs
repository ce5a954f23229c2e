//! Main entry point for the sabs-unpack CLI application.
//!
//! Loads a `.sabs` archive from a local path or HTTP URL, indexes it and
//! lists, shows or extracts its entries.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sabs_unpack::sabs::SCAN_COMPLETE;
use sabs_unpack::{Archive, Cli, Error, HttpReader, SabsExtractor};

/// Application entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .init();

    let archive = if cli.is_http_url() {
        let reader = HttpReader::connect(cli.file.clone())
            .await
            .with_context(|| format!("cannot reach {}", cli.file))?;
        let archive = Archive::fetch(&reader)
            .await
            .with_context(|| format!("cannot download {}", cli.file))?;
        info!("Downloaded {}", format_size(reader.transferred_bytes()));
        archive
    } else {
        Archive::open(Path::new(&cli.file))
            .await
            .with_context(|| format!("cannot read {}", cli.file))?
    };

    let quiet = cli.is_quiet();
    let mut extractor = SabsExtractor::new(archive, |progress| report_progress(progress, quiet))
        .with_context(|| format!("cannot index {}", cli.file))?;
    extractor.set_overwrite(!cli.never_overwrite);

    process_archive(&extractor, &cli).await
}

/// Print scan progress on stderr.
fn report_progress(progress: f64, quiet: bool) {
    if quiet {
        return;
    }
    let mut stderr = std::io::stderr();
    if progress == SCAN_COMPLETE {
        let _ = writeln!(stderr, "\rArchive indexed ");
    } else {
        let _ = write!(stderr, "\r{:0.2}%", progress);
    }
}

/// List, show or extract entries based on CLI options.
async fn process_archive(extractor: &SabsExtractor, cli: &Cli) -> Result<()> {
    if cli.list {
        list_entries(extractor);
        return Ok(());
    }

    if cli.tree {
        print!("{}", extractor.name_tree().render());
        return Ok(());
    }

    if cli.pipe {
        let indices: Vec<usize> = if cli.indices.is_empty() {
            (0..extractor.len()).collect()
        } else {
            cli.indices.clone()
        };
        for index in indices {
            extractor.extract_to_stdout(index).await?;
        }
        return Ok(());
    }

    let root = PathBuf::from(&cli.extract_dir);
    let result = if cli.indices.is_empty() {
        extractor.extract_all(&root).await
    } else {
        extractor.extract_selected(&root, &cli.indices).await
    };
    let report = match result {
        Ok(report) => report,
        Err(Error::Entry {
            index,
            name,
            written,
            source,
        }) => {
            print_written(&written, cli);
            return Err(anyhow::Error::new(*source)
                .context(format!("extraction stopped at entry {index} ({name})")));
        }
        Err(e) => return Err(e.into()),
    };

    print_written(&report.written, cli);
    if !cli.is_quiet() {
        for path in &report.kept {
            eprintln!("Skipping: {} (file exists)", path.display());
        }
    }
    for (index, error) in &report.skipped {
        eprintln!("Skipped entry {}: {}", index, error);
    }

    Ok(())
}

fn print_written(paths: &[PathBuf], cli: &Cli) {
    if !cli.is_quiet() {
        for path in paths {
            println!("  extracting: {}", path.display());
        }
    }
}

/// Print one line per entry: index, offset, length and name.
fn list_entries(extractor: &SabsExtractor) {
    println!("{:>6}  {:>12}  {:>10}  Name", "Index", "Offset", "Length");
    println!("{}", "-".repeat(70));

    let mut total = 0usize;
    for record in extractor.records() {
        let length = extractor
            .entry_range(record.index)
            .map(|r| r.len())
            .unwrap_or_default();
        let name = extractor
            .display_name(record.index)
            .map(|n| n.display_path())
            .unwrap_or_default();
        total += length;
        println!(
            "{:>6}  {:>#12x}  {:>10}  {}",
            record.index, record.offset, length, name
        );
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>6}  {:>12}  {:>10}  {} entries",
        "",
        "",
        format_size(total as u64),
        extractor.len()
    );
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
