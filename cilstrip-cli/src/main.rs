mod app;
mod inputs;
mod report;

use anyhow::Context;
use clap::Parser;
use cilstrip::{BatchSummary, Driver, LogObserver, NullObserver, Observer, ReferencePolicy};
use log::info;

use crate::app::Cli;

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .context("failed to set Ctrl+C handler")?;

    let cli = Cli::parse();

    // Log to stderr unless --json; -v / -vv raise the level; RUST_LOG overrides
    if !cli.json {
        env_logger::Builder::new()
            .filter_module("cilstrip", cli.log_level())
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp_secs()
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    let inputs = inputs::collect(&cli.inputs, cli.recursive, &cli.exclude)?;
    if inputs.is_empty() {
        anyhow::bail!("no assemblies found in the given inputs");
    }

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("failed to create output directory: {}", cli.output.display()))?;

    let policy = if cli.lenient {
        ReferencePolicy::Lenient
    } else {
        ReferencePolicy::Strict
    };
    let driver = cli
        .reference_dirs
        .iter()
        .fold(Driver::new(&cli.output), |driver, dir| driver.with_search_dir(dir))
        .reference_policy(policy)
        .parallel(cli.parallel);

    info!("Stripping {} files into {}", inputs.len(), cli.output.display());

    let observer: &dyn Observer = if cli.json { &NullObserver } else { &LogObserver };
    let outcomes = driver.process(&inputs, observer);
    let summary = BatchSummary::from_outcomes(&outcomes);
    report::print(&outcomes, &summary, cli.json)?;

    if summary.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
