// SPDX-License-Identifier: MIT OR Apache-2.0
//! Motion timeline headless driver
//!
//! Runs timeline commands without an editor front end:
//! - Create and inspect timeline files
//! - Play a timeline against an in-memory host
//! - Export animations and song descriptions
//!
//! Reports are printed to stdout as JSON; logs go to stderr.

mod app;

use app::Cli;
use clap::Parser;
use motion_timeline::EditorConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let cli = Cli::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["motion_timeline=info", "motion_timeline_app=debug"] {
        match directive.parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(e) => eprintln!("Bad log directive {directive:?}: {e}"),
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting motion timeline v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> app::Result<()> {
    let config = EditorConfig::load_or_default(&cli.config)?;
    let report = app::run(cli.command, &config)?;
    println!("{}", app::to_json(&report)?);
    Ok(())
}
