use std::pin::pin;

use anyhow::Result;
use clap::Parser;
use futures_util::StreamExt;
use pubmed_retriever::{ClientConfig, PubMedClient, PubMedQueryRun};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pubmed-query",
    about = "Search PubMed and print article metadata",
    long_about = "Runs one PubMed search, fetches each hit and prints title, date, copyright and abstract"
)]
struct Cli {
    /// Search query
    query: String,

    /// Number of articles to fetch
    #[arg(short = 'k', long, default_value_t = 3)]
    top_k: usize,

    /// Truncate text output to this many characters
    #[arg(long, default_value_t = 2000)]
    max_chars: usize,

    /// Print one JSON record per line instead of text
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// API key for NCBI E-utilities
    #[arg(long, env = "NCBI_API_KEY")]
    api_key: Option<String>,

    /// Email for NCBI requests
    #[arg(long, env = "NCBI_EMAIL")]
    email: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ClientConfig::from_env()
        .with_top_k_results(cli.top_k)
        .with_doc_content_chars_max(cli.max_chars);
    if let Some(api_key) = cli.api_key {
        config = config.with_api_key(api_key);
    }
    if let Some(email) = cli.email {
        config = config.with_email(email);
    }

    let client = PubMedClient::with_config(config);
    info!(query = %cli.query, top_k = cli.top_k, "Starting PubMed query");

    if cli.json {
        let mut articles = pin!(client.lazy_fetch(&cli.query));
        while let Some(article) = articles.next().await {
            println!("{}", serde_json::to_string(&article?)?);
        }
    } else {
        let tool = PubMedQueryRun::new(client);
        println!("{}", tool.call(&cli.query).await);
    }

    Ok(())
}
