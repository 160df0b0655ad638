use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use sca_import::cli::{Cli, Commands};
use sca_import::services::fingerprint;
use sca_import::services::ingestion::{Importer, JsonLinesHandler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn importer(cli: &Cli) -> anyhow::Result<Importer> {
    let config = cli.import.to_config()?;
    Ok(Importer::from_config(&config)?)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "sca_import=info".into()))
        .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();

    match &cli.command {
        Commands::Digest { file } => {
            let digest = fingerprint::digest(open(file)?)?;
            writeln!(stdout.lock(), "{digest}")?;
        }
        Commands::Issues { file } => {
            let mut handler = JsonLinesHandler::new(stdout.lock());
            let summary = importer(&cli)?.import(open(file)?, &mut handler)?;
            handler.into_inner().flush()?;
            tracing::info!(
                file = %file.display(),
                total_rows = summary.total_rows,
                by_priority = ?summary.by_priority,
                "Imported report"
            );
        }
        Commands::Rows { file } => {
            let issues = importer(&cli)?.collect(open(file)?)?;
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &issues)?;
            writeln!(out)?;
        }
        Commands::Scan { file } => {
            let info = importer(&cli)?.describe_scan(open(file)?)?;
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &info)?;
            writeln!(out)?;
        }
    }

    Ok(())
}
