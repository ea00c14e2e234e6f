//! 🚀 botlytics-cli: the front door.
//!
//! 🎬 *[narrator voice]* "It all started with a file full of updates..."
//! 📦 Reads newline-delimited Bot API updates from a file (or stdin), normalizes them,
//! batches them, and ships them to the configured collector. Flushes before exiting, so
//! a clean exit means everything that could be delivered was. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use botlytics::RunSummary;
use clap::Parser;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 📡 Ship Telegram bot updates to an analytics collector.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML config file. Without it, config comes from BOTLYTICS_* environment variables.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Newline-delimited update JSON. Reads stdin when omitted or "-".
    input: Option<PathBuf>,
}

async fn open_input(input: Option<&PathBuf>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            let file = tokio::fs::File::open(path).await.with_context(|| {
                format!(
                    "💀 Couldn't open the input file '{}'. Relative paths are relative to where you are, not where you wish you were.",
                    path.display()
                )
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

async fn run(args: Args) -> Result<()> {
    if let Some(config) = &args.config {
        let exists = config.try_exists().with_context(|| {
            format!(
                "💀 Couldn't check whether the config file exists. Was checking here: '{}'",
                config.display()
            )
        })?;
        if !exists {
            anyhow::bail!(
                "💀 Config file '{}' does not exist. Double check the path, or use an absolute one to be absolutely certain.",
                config.display()
            );
        }
    }

    let app_config = botlytics::load_config(args.config.as_deref())
        .context("💀 In botlytics-cli, main, we couldn't load the config. Make sure you didn't forget something obvious, like the endpoint.")?;
    let input = open_input(args.input.as_ref()).await?;

    let summary = botlytics::run(app_config, input).await?;
    info!("✅ done\n{}", summary_table(&summary));
    Ok(())
}

/// 🛋️ Two columns, right-aligned, no borders.
fn summary_table(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let rows: [(&str, u64); 6] = [
        ("lines read", summary.lines),
        ("malformed", summary.malformed),
        ("normalized", summary.normalizer.normalized),
        ("not analytics-worthy", summary.normalizer.dropped),
        ("delivered", summary.dispatcher.delivered),
        ("failed attempts", summary.dispatcher.failed_attempts),
    ];
    for (label, count) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// 🚀 main(): init tracing, parse args, run, and explain any failure one cause at a time.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!("💀 error: {}", err);
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("onnection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }
        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: the collector isn't reachable. Check that it's running and that \
                 the endpoint in your config points at it. ☕"
            );
        }
        std::process::exit(1);
    }
    Ok(())
}
