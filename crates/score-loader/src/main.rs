//! score-loader: run the scoring pipeline once (or a few times) from the command line.
//!
//! Ingests either the built-in stub feed or a JSON snapshot, refits the model,
//! scores every issuer and writes scores plus attributions to the database.
//!
//! Usage:
//!   cargo run -p score-loader
//!   cargo run -p score-loader -- --snapshot data/issuers.json --db sqlite:credit.db
//!   cargo run -p score-loader -- --dry-run --json

use anyhow::{bail, Context, Result};
use credit_core::DataSource;
use credit_ingest::{JsonSnapshotSource, StubDataSource};
use credit_pipeline::ScoringPipeline;
use credit_store::{CreditDb, CreditStore};
use scoring_engine::{ForestConfig, ScoringEngine};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_DB: &str = "sqlite:credit.db";

#[derive(Debug, PartialEq)]
struct LoaderArgs {
    db_url: String,
    snapshot: Option<PathBuf>,
    dry_run: bool,
    runs: usize,
    trees: usize,
    json: bool,
}

impl LoaderArgs {
    fn parse(args: &[String], default_db: &str) -> Result<Self> {
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .filter(|v| !v.starts_with("--"))
        };

        let runs = match value_of("--runs") {
            Some(v) => v.parse().context("--runs expects a positive integer")?,
            None => 1,
        };
        if runs == 0 {
            bail!("--runs must be at least 1");
        }

        let trees = match value_of("--trees") {
            Some(v) => v.parse().context("--trees expects a positive integer")?,
            None => ForestConfig::default().n_estimators,
        };

        Ok(Self {
            db_url: value_of("--db").cloned().unwrap_or_else(|| default_db.to_string()),
            snapshot: value_of("--snapshot").map(PathBuf::from),
            dry_run: args.iter().any(|a| a == "--dry-run"),
            runs,
            trees,
            json: args.iter().any(|a| a == "--json"),
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  score-loader                       Score the built-in stub issuers");
    eprintln!("  score-loader --snapshot FILE       Score issuers from a JSON snapshot");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db URL        SQLite URL (default: $DB_URL or {})", DEFAULT_DB);
    eprintln!("  --dry-run       Score against an in-memory database, write nothing");
    eprintln!("  --runs N        Number of refresh cycles (default: 1)");
    eprintln!("  --trees N       Forest size (default: 200)");
    eprintln!("  --json          Print each report as JSON");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "score_loader=info,credit_pipeline=info,scoring_engine=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let default_db = std::env::var("DB_URL").unwrap_or_else(|_| DEFAULT_DB.to_string());
    let opts = LoaderArgs::parse(&args, &default_db)?;

    let db_url = if opts.dry_run {
        tracing::info!("Dry run: scoring against an in-memory database");
        "sqlite::memory:".to_string()
    } else {
        opts.db_url.clone()
    };

    let source: Arc<dyn DataSource> = match &opts.snapshot {
        Some(path) => Arc::new(JsonSnapshotSource::new(path)),
        None => Arc::new(StubDataSource::new()),
    };

    let store = CreditStore::new(CreditDb::new(&db_url).await?);
    let engine = ScoringEngine::new(ForestConfig {
        n_estimators: opts.trees,
        ..ForestConfig::default()
    });
    let pipeline = ScoringPipeline::new(source, store.clone(), engine);

    tracing::info!(
        "Scoring {} run(s) from {} into {}",
        opts.runs,
        pipeline.source_name(),
        db_url
    );

    for run in 1..=opts.runs {
        let report = pipeline
            .run_cycle()
            .await
            .with_context(|| format!("refresh cycle {run} failed"))?;

        if opts.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            for scored in &report.scores {
                println!(
                    "run {:>2}  {:<24} score {:>6.1}  (score_id {})",
                    run, scored.issuer, scored.score, scored.score_id
                );
            }
        }
    }

    tracing::info!(
        "Done: {} scores stored across {} issuers",
        store.score_count().await?,
        store.list_issuers().await?.len()
    );

    Ok(())
}
