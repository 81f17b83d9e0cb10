use anyhow::Result;
use axum::Router;
use catalog_core::{Catalog, FixtureSource};
use clap::Parser;
use server::{build_app, AppConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Catalog database directory
    #[arg(long, default_value = "./catalog.db")]
    db: String,
    /// JSONL file of pre-extracted listing records served to scrape requests without a body record
    #[arg(long)]
    records: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let catalog = Arc::new(Catalog::open(&args.db)?);
    let source = match &args.records {
        Some(path) => FixtureSource::from_jsonl(path)?,
        None => FixtureSource::new(),
    };
    let stats = catalog.stats();
    tracing::info!(documents = stats.documents, terms = stats.terms, fixtures = source.len(), "catalog opened");

    let app: Router = build_app(Arc::clone(&catalog), source, AppConfig::from_env());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    catalog.flush()?;
    Ok(())
}
