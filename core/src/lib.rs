//! Catalog indexing core: tokenizer, inverted term index, document store,
//! ingestion, term-overlap search and keyword reports over one sled database.

pub mod catalog;
pub mod error;
pub mod index;
pub mod ingest;
pub mod keywords;
pub mod persist;
pub mod search;
pub mod source;
pub mod store;
pub mod tokenizer;

use serde::{Deserialize, Serialize};

pub use catalog::{Catalog, CatalogStats};
pub use error::{CatalogError, Result};
pub use index::TermIndex;
pub use keywords::{CategoryKeywords, KeywordCount};
pub use search::SearchHit;
pub use source::{FixtureSource, RecordSource};
pub use store::DocumentStore;
pub use tokenizer::Tokenizer;

pub type TermId = u64;
pub type DocId = u64;

/// One scraped catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    /// "N/A" when extraction found no description.
    pub description: String,
    pub categories: Vec<String>,
    pub rating: Option<f32>,
    /// Normalized source URL, unique across documents.
    pub url: String,
    pub icon_url: Option<String>,
    /// RFC 3339 timestamp of the last ingestion.
    pub scraped_at: String,
}

/// A vocabulary entry. Terms are append-only: never deleted once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub term: String,
}

/// Output of the page extraction step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "genres")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default, alias = "iconUrl")]
    pub icon_url: Option<String>,
}

/// A raw record paired with the page it was extracted from, as read from JSON/JSONL input.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcedRecord {
    pub url: String,
    #[serde(flatten)]
    pub record: RawRecord,
}
