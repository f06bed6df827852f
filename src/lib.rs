//! # PubMed Retriever
//!
//! Retrieves biomedical literature metadata from the NCBI E-utilities API and
//! normalizes the loosely-typed EFetch XML into a stable record shape.
//!
//! ## Features
//!
//! - **Two-phase retrieval**: one ESearch call with the history server, then
//!   one EFetch call per identifier, streamed in result order
//! - **Retrying transport**: 429s and network faults are retried with
//!   jittered exponential backoff; other HTTP errors fail immediately
//! - **Resilient parsing**: article and book-chapter documents, plain,
//!   labeled-section and free-form abstracts all map to [`ArticleMetadata`]
//!
//! ## Quick Start
//!
//! ### Streaming results
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use pubmed_retriever::PubMedClient;
//! use std::pin::pin;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PubMedClient::new();
//!     let mut articles = pin!(client.lazy_fetch("crispr off-target effects"));
//!
//!     while let Some(article) = articles.next().await {
//!         let article = article?;
//!         println!("{} ({}): {}", article.uid, article.published, article.title);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Text answer for end users
//!
//! ```no_run
//! use pubmed_retriever::{ClientConfig, PubMedClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = PubMedClient::with_config(ClientConfig::from_env().with_top_k_results(5));
//!
//!     // Never fails; errors come back as "PubMed exception: ..."
//!     println!("{}", client.run("covid-19 long term effects").await);
//! }
//! ```

pub mod config;
pub mod error;
pub mod pubmed;
pub mod retry;
pub mod tool;
pub mod transport;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use error::{PubMedError, Result};
pub use pubmed::{
    ArticleMetadata, Document, DocumentMetadata, DocumentTree, NO_ABSTRACT, NO_RESULTS,
    PubMedClient, SearchResult, extract_metadata, parse_document_tree,
};
pub use retry::RetryConfig;
pub use tool::PubMedQueryRun;
pub use transport::Transport;
