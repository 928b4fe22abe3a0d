use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use langcard::colours::ColourTable;
use langcard::config::Config;
use langcard::github::{GithubClient, GithubSource};
use langcard::server::{self, DEFAULT_HEADER};
use langcard::svg::{DEFAULT_THEME, SvgRenderer};
use langcard::{Aggregator, Scoring, Service, info};

/// Render your GitHub language breakdown as an SVG badge.
#[derive(Parser)]
#[command(name = "langcard", version)]
struct Cli {
    /// Scoring policy: `raw` (bytes) or `geometric` (bytes × repositories)
    #[arg(long, global = true)]
    scoring: Option<Scoring>,

    /// JSON array of languages to leave out (defaults to the built-in list)
    #[arg(long, global = true)]
    ignored: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the badge over HTTP
    Serve {
        /// Listen address (overrides LANGCARD_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Write the badge to a file
    Render {
        #[arg(long, default_value = DEFAULT_THEME)]
        theme: String,
        #[arg(long, default_value = DEFAULT_HEADER)]
        header: String,
        #[arg(long, short, default_value = "languages.svg")]
        out: PathBuf,
    },
    /// Print the computed breakdown as JSON
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?.with_overrides(cli.scoring, cli.ignored);
    let ignored = config.ignored_languages()?;
    let client = GithubClient::new(config.token.clone())?;

    let service = Service::new(
        GithubSource::new(client, ignored),
        Aggregator::new(config.scoring),
        ColourTable::embedded(),
        SvgRenderer,
    );

    match cli.command {
        Command::Serve { addr } => {
            let addr = addr.unwrap_or(config.addr);
            info!(
                "scoring languages by {}",
                service.aggregator().scoring().as_str()
            );
            server::serve(&addr, Arc::new(service)).await?;
        }
        Command::Render { theme, header, out } => {
            let svg = service
                .badge(&theme, &header)
                .await
                .context("Failed to build badge")?;
            fs::write(&out, svg).with_context(|| format!("Failed to write {}", out.display()))?;
            info!("wrote {}", out.display());
        }
        Command::Stats => {
            let stats = service
                .language_stats()
                .await
                .context("Failed to fetch language stats")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
