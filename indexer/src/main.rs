use anyhow::Result;
use catalog_core::source::read_jsonl;
use catalog_core::{Catalog, SourcedRecord};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Ingest scraped store listings and query the catalog index", long_about = None)]
struct Cli {
    /// Catalog database directory
    #[arg(long, global = true, default_value = "./catalog.db")]
    db: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest records from JSON/JSONL files or a directory of them
    Ingest {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
    },
    /// Rank documents by term overlap with a query
    Search {
        #[arg(long)]
        query: String,
        /// Maximum number of hits to print
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Print every document
    List,
    /// Keyword frequency report
    Keywords {
        /// Group by category instead of the global top list
        #[arg(long, default_value_t = false)]
        by_category: bool,
    },
    /// Document and term counts
    Stats,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct IngestSummary {
    ingested: usize,
    rejected: usize,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let catalog = Catalog::open(&cli.db)?;

    match cli.command {
        Commands::Ingest { input } => {
            let summary = ingest_path(&catalog, Path::new(&input))?;
            catalog.flush()?;
            print_json(&summary)
        }
        Commands::Search { query, k } => {
            let hits: Vec<_> = catalog.search_scored(&query)?.into_iter().take(k).collect();
            print_json(&hits)
        }
        Commands::List => print_json(&catalog.list_all()?),
        Commands::Keywords { by_category } => {
            if by_category {
                print_json(&catalog.top_keywords_by_category()?)
            } else {
                print_json(&catalog.top_keywords()?)
            }
        }
        Commands::Stats => print_json(&catalog.stats()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn read_records(file: &Path) -> Result<Vec<SourcedRecord>> {
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        return read_jsonl(file);
    }
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(file)?))?;
    match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Into::into))
            .collect(),
        serde_json::Value::Object(_) => Ok(vec![serde_json::from_value(json)?]),
        _ => Ok(Vec::new()),
    }
}

/// Records the catalog rejects (bad source url) are logged and skipped; storage
/// and parse errors abort the run.
fn ingest_path(catalog: &Catalog, input: &Path) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    for file in input_files(input) {
        for rec in read_records(&file)? {
            match catalog.ingest(&rec.url, rec.record) {
                Ok(_) => summary.ingested += 1,
                Err(err @ catalog_core::CatalogError::InvalidSource(_)) => {
                    tracing::warn!(file = %file.display(), url = %rec.url, %err, "skipping record");
                    summary.rejected += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    tracing::info!(ingested = summary.ingested, rejected = summary.rejected, "ingest complete");
    Ok(summary)
}
