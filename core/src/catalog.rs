use crate::error::{CatalogError, Result};
use crate::index::TermIndex;
use crate::ingest::{ingest_record, normalize_source_url};
use crate::keywords::{self, CategoryKeywords, KeywordCount};
use crate::persist::{open_db, open_temporary, Trees};
use crate::search::{self, SearchHit};
use crate::source::RecordSource;
use crate::store::DocumentStore;
use crate::tokenizer::Tokenizer;
use crate::{DocId, Document, RawRecord, TermId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use sled::Db;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub documents: usize,
    pub terms: usize,
}

/// Entry point tying the tokenizer, term index and document store to one database.
///
/// Ingestions are serialized through a single writer lock, which also keeps the
/// title-or-url upsert decision race free. Readers share `gate`; a commit takes
/// it exclusively, so a search never sees a half-replaced link set.
pub struct Catalog {
    db: Db,
    trees: Trees,
    tokenizer: Tokenizer,
    index: TermIndex,
    store: DocumentStore,
    writer: Mutex<()>,
    gate: RwLock<()>,
}

impl Catalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(open_db(path)?)
    }

    /// Throwaway database, removed on drop.
    pub fn temporary() -> Result<Self> {
        Self::from_db(open_temporary()?)
    }

    pub fn from_db(db: Db) -> Result<Self> {
        let trees = Trees::open(&db)?;
        Ok(Self {
            index: TermIndex::new(trees.terms.clone(), trees.postings.clone()),
            store: DocumentStore::new(trees.documents.clone(), trees.doc_keys.clone()),
            trees,
            db,
            tokenizer: Tokenizer::default(),
            writer: Mutex::new(()),
            gate: RwLock::new(()),
        })
    }

    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }
    pub fn term_index(&self) -> &TermIndex { &self.index }
    pub fn documents(&self) -> &DocumentStore { &self.store }

    pub fn ingest(&self, source_url: &str, record: RawRecord) -> Result<Document> {
        let _writer = self.writer.lock();
        let _gate = self.gate.write();
        ingest_record(&self.trees, &self.tokenizer, source_url, record)
    }

    /// Validate the URL, pull the record from `source`, then ingest it.
    /// Nothing is written when either step fails.
    pub fn scrape(&self, source_url: &str, source: &dyn RecordSource) -> Result<Document> {
        let url = normalize_source_url(source_url)?;
        let record = source.extract(&url).map_err(|e| match e {
            CatalogError::ExtractionFailure(msg) => CatalogError::ExtractionFailure(msg),
            other => CatalogError::ExtractionFailure(other.to_string()),
        })?;
        self.ingest(&url, record)
    }

    pub fn replace_term_links(&self, id: DocId, term_ids: &BTreeSet<TermId>) -> Result<()> {
        let _writer = self.writer.lock();
        let _gate = self.gate.write();
        self.store.replace_term_links(&self.index, id, term_ids)
    }

    pub fn search(&self, query: &str) -> Result<Vec<Document>> {
        Ok(self.search_scored(query)?.into_iter().map(|hit| hit.document).collect())
    }

    pub fn search_scored(&self, query: &str) -> Result<Vec<SearchHit>> {
        let _gate = self.gate.read();
        search::search(&self.tokenizer, &self.index, &self.store, query)
    }

    pub fn list_all(&self) -> Result<Vec<Document>> {
        let _gate = self.gate.read();
        self.store.list_all()
    }

    pub fn get(&self, id: DocId) -> Result<Document> {
        self.store.get(id)?.ok_or(CatalogError::NotFound(id))
    }

    /// The document's linked terms, sorted.
    pub fn terms_of(&self, id: DocId) -> Result<Vec<String>> {
        let _gate = self.gate.read();
        let mut terms = Vec::new();
        for term_id in self.store.term_ids(id)? {
            if let Some(name) = self.index.term_name(term_id)? {
                terms.push(name);
            }
        }
        terms.sort();
        Ok(terms)
    }

    pub fn top_keywords(&self) -> Result<Vec<KeywordCount>> {
        let _gate = self.gate.read();
        keywords::top_keywords(&self.index, keywords::TOP_KEYWORDS)
    }

    pub fn top_keywords_by_category(&self) -> Result<Vec<CategoryKeywords>> {
        let _gate = self.gate.read();
        keywords::top_keywords_by_category(
            &self.index,
            &self.store,
            keywords::TOP_CATEGORIES,
            keywords::KEYWORDS_PER_CATEGORY,
        )
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats { documents: self.store.len(), terms: self.index.len() }
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
