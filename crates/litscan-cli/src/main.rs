//! litscan: term co-occurrence counts and article harvesting against the
//! E-utilities literature search service.
//!
//! ```bash
//! litscan --config litscan.toml counts --name erps
//! litscan --config litscan.toml words
//! litscan --config litscan.toml show N400
//! litscan --config litscan.toml info
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use litscan_common::ScrapeConfig;
use litscan_scrape::counts::Counts;
use litscan_scrape::requester::HttpTransport;
use litscan_scrape::scraper::Scraper;
use litscan_scrape::store::{FileStore, Store, Stored};
use litscan_scrape::summary::ArticleSummary;
use litscan_scrape::terms::{load_exclusions_file, load_terms_file, Dimension};
use litscan_scrape::words::Words;

#[derive(Parser)]
#[command(name = "litscan", version, about, long_about = None)]
struct Cli {
    /// Scrape configuration (.toml, .yaml or .yml)
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count term co-occurrences between the A and B term groups
    Counts {
        /// Name the run is saved under
        #[arg(short, long)]
        name: String,

        /// After the sweep, drop B groups with this many articles or fewer
        #[arg(long)]
        drop_below: Option<u64>,
    },
    /// Harvest articles for every A term group
    Words,
    /// Print a stored counts run or a term group's article summary
    Show {
        name: String,

        /// Words and keywords listed per summary
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print the configured database's build and record count
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("litscan=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ScrapeConfig::from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let store: Arc<dyn Store> = Arc::new(FileStore::from_config(&config.storage));

    match cli.command {
        Commands::Counts { name, drop_below } => run_counts(&config, store, &name, drop_below).await,
        Commands::Words => run_words(&config, store).await,
        Commands::Show { name, top } => show(store.as_ref(), &name, top).await,
        Commands::Info => {
            let info = build_scraper(&config, store)?.db_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}

fn build_scraper(config: &ScrapeConfig, store: Arc<dyn Store>) -> Result<Scraper<HttpTransport>> {
    let transport = HttpTransport::new(&config.requests, &config.eutils.base_url)?;
    Ok(Scraper::new(config, transport, store))
}

async fn run_counts(config: &ScrapeConfig, store: Arc<dyn Store>, name: &str, drop_below: Option<u64>) -> Result<()> {
    let terms = &config.terms;
    let mut counts = Counts::new();

    let a = terms.a.as_ref().context("terms.a must point at a term file")?;
    counts.set_terms(Dimension::A, load_terms_file(a)?)?;
    if let Some(path) = &terms.a_exclusions {
        let n = counts.terms(Dimension::A).len();
        counts.set_exclusions(Dimension::A, load_exclusions_file(path, n)?)?;
    }
    if let Some(b) = &terms.b {
        counts.set_terms(Dimension::B, load_terms_file(b)?)?;
        if let Some(path) = &terms.b_exclusions {
            let n = counts.terms(Dimension::B).len();
            counts.set_exclusions(Dimension::B, load_exclusions_file(path, n)?)?;
        }
    }

    let mut scraper = build_scraper(config, store.clone())?;
    scraper.collect_counts(&mut counts, name).await?;

    if let Some(n) = drop_below {
        counts.drop_below(Dimension::B, n);
        store.save_counts(name, &counts.snapshot()).await?;
    }

    let labels_a = counts.terms(Dimension::A).labels();
    let labels_b = counts.terms(Dimension::B).labels();
    if let Some((i, n)) = counts.most_studied(Dimension::A) {
        info!(label = labels_a[i], articles = n, "Most studied A term");
    }
    for (i, label) in labels_a.iter().enumerate() {
        match counts.top_association(Dimension::A, i) {
            Some((j, pct)) => info!(label, top = labels_b[j], percent = %format!("{:.2}", pct * 100.0), "Top association"),
            None => warn!(label, "No associations"),
        }
    }
    Ok(())
}

async fn run_words(config: &ScrapeConfig, store: Arc<dyn Store>) -> Result<()> {
    let terms = &config.terms;
    let mut words = Words::new();

    let a = terms.a.as_ref().context("terms.a must point at a term file")?;
    words.set_terms(load_terms_file(a)?)?;
    if let Some(path) = &terms.a_exclusions {
        words.set_exclusions(load_exclusions_file(path, words.terms().len())?)?;
    }

    let mut scraper = build_scraper(config, store.clone())?;
    scraper.collect_words(&mut words).await?;

    for result in words.results() {
        let set = store.load_articles(&result.label).await?;
        let summary = ArticleSummary::from_set(&set);
        info!(
            label = %summary.label,
            articles = summary.article_count,
            first_year = ?summary.first_year,
            journal = ?summary.top_journal.as_ref().map(|(j, _)| j),
            author = ?summary.top_author.as_ref().map(|(a, _)| a),
            "Term group summary"
        );
    }
    Ok(())
}

async fn show(store: &dyn Store, name: &str, top: usize) -> Result<()> {
    let json = match store.load(name).await? {
        Stored::Counts(snapshot) => serde_json::to_string_pretty(&snapshot)?,
        Stored::Articles(set) => serde_json::to_string_pretty(&ArticleSummary::with_top_n(&set, top))?,
    };
    println!("{json}");
    Ok(())
}
