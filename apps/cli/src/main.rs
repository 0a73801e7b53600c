//! cardfeed CLI: keep flashcard notes in sync with their canonical sources.
//!
//! Exports canonical markdown notes to an import TSV, extracts front/back
//! fragments from rendered HTML, and pushes them into existing notes
//! through AnkiConnect.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    match commands::run(cli).await {
        Err(report) if commands::is_usage_failure(&report) => {
            eprintln!("Error: {report}");
            std::process::exit(2);
        }
        other => other,
    }
}
