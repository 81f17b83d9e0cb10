use crate::error::Result;
use crate::index::TermIndex;
use crate::store::DocumentStore;
use crate::tokenizer::Tokenizer;
use crate::{DocId, Document};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: Document,
    /// Distinct query terms linked to the document.
    pub matched_terms: usize,
}

/// Rank documents by how many distinct query terms they are linked to.
///
/// Ties are broken by ascending document id. Empty queries and queries whose
/// terms were never indexed return no hits.
pub fn search(tokenizer: &Tokenizer, index: &TermIndex, store: &DocumentStore, query: &str) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    let terms = index.find_by_terms(tokenizer.tokenize(query))?;
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let mut counts: BTreeMap<DocId, usize> = BTreeMap::new();
    for term in &terms {
        for doc_id in index.linked_documents(term.id)? {
            *counts.entry(doc_id).or_insert(0) += 1;
        }
    }

    // stable sort keeps ascending id order within equal counts
    let mut ranked: Vec<(DocId, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut hits = Vec::with_capacity(ranked.len());
    for (doc_id, matched_terms) in ranked {
        if let Some(document) = store.get(doc_id)? {
            hits.push(SearchHit { document, matched_terms });
        }
    }
    tracing::debug!(query, resolved = terms.len(), hits = hits.len(), "search");
    Ok(hits)
}
