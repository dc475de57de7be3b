use anyhow::{Context, Result};
use biketrips::{
    config::Config,
    fetch::{
        self,
        zips::{download_and_materialize, Fetched},
    },
    operators::Operator,
    process, years,
};
use clap::Parser;
use reqwest::Client;
use std::{fs, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "biketrips")]
#[command(about = "Download and normalize bike-share ridership data", long_about = None)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long)]
    config: PathBuf,

    /// Bike system tag (bixi, bsto, cabi, citi); overrides the config file.
    #[arg(long = "bike-sys")]
    bike_sys: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) load config & pick operator ──────────────────────────────
    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let tag = cli
        .bike_sys
        .or_else(|| cfg.bike_sys.clone())
        .context("no bike system selected: pass --bike-sys or set bike_sys in the config")?;
    let operator = Operator::from_tag(&tag)?;
    let years = years::parse_years(cfg.years.as_deref().unwrap_or("-"))?;
    info!(operator = %tag, ?years, "configured");

    fs::create_dir_all(&cfg.data_dir)
        .with_context(|| format!("creating data dir {}", cfg.data_dir.display()))?;

    // ─── 3) discover archive URLs for the requested years ────────────
    let client = Client::new();
    let op_cfg = operator.config();
    let urls = fetch::urls::discover_urls(&client, op_cfg).await?;
    let urls = fetch::urls::filter_by_years(urls, &years);
    info!(count = urls.len(), "url_list: {urls:?}");

    // ─── 4) download + process each URL ──────────────────────────────
    for url in urls {
        let fetched = match download_and_materialize(&client, &url, &cfg.data_dir).await {
            Ok(fetched) => fetched,
            Err(err) => {
                error!("download {url} failed: {err:#}");
                continue;
            }
        };
        let (save_dir, files) = match fetched {
            Fetched::Skipped => continue,
            Fetched::Files { save_dir, files } => (save_dir, files),
        };

        // Processing is CPU + disk bound; run it on the blocking pool.
        let chunk_size = cfg.chunk_size;
        let result = tokio::task::spawn_blocking(move || {
            process::run_url(&files, &save_dir, operator.config(), chunk_size)
        })
        .await
        .context("processing task")?;
        if let Err(err) = result {
            error!("processing {url} failed: {err:#}");
        }
    }

    info!("all done");
    Ok(())
}
