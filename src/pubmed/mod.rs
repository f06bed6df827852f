//! PubMed retrieval: search, per-identifier fetch and metadata extraction
//!
//! - [`client`] drives the two-phase search-then-fetch protocol
//! - [`tree`] folds EFetch XML into a generic document tree
//! - [`parser`] extracts [`ArticleMetadata`] from that tree

pub mod client;
pub mod models;
pub mod parser;
pub(crate) mod responses;
pub mod tree;

// Re-export public types
pub use client::{NO_RESULTS, PubMedClient};
pub use models::{ArticleMetadata, Document, DocumentMetadata, NO_ABSTRACT, SearchResult};
pub use parser::{AbstractShape, extract_metadata, parse_document_tree, parse_metadata_from_xml};
pub use tree::DocumentTree;
