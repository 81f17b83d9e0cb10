use crate::error::Result;
use crate::index::TermIndex;
use crate::store::DocumentStore;
use crate::TermId;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub const TOP_KEYWORDS: usize = 500;
pub const TOP_CATEGORIES: usize = 10;
pub const KEYWORDS_PER_CATEGORY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryKeywords {
    pub category: String,
    pub keywords: Vec<KeywordCount>,
}

/// Count desc, then term asc.
fn rank(list: &mut [KeywordCount]) {
    list.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
}

/// Terms with at least one linked document, by document count.
pub fn top_keywords(index: &TermIndex, limit: usize) -> Result<Vec<KeywordCount>> {
    let vocab = index.vocabulary()?;
    let mut list: Vec<KeywordCount> = index
        .document_frequencies()?
        .into_iter()
        .filter_map(|(id, count)| vocab.get(&id).map(|term| KeywordCount { term: term.clone(), count }))
        .collect();
    rank(&mut list);
    list.truncate(limit);
    Ok(list)
}

/// Per category, the terms most often linked to documents carrying it.
///
/// Categories are ranked by how many distinct terms their documents carry
/// (ties by name), keeping `max_categories` of them with up to
/// `per_category` terms each.
pub fn top_keywords_by_category(
    index: &TermIndex,
    store: &DocumentStore,
    max_categories: usize,
    per_category: usize,
) -> Result<Vec<CategoryKeywords>> {
    let mut per_cat: HashMap<String, HashMap<TermId, usize>> = HashMap::new();
    for row in store.rows()? {
        let categories: BTreeSet<&String> = row.document.categories.iter().collect();
        for category in categories {
            let counts = per_cat.entry(category.clone()).or_default();
            for term_id in &row.term_ids {
                *counts.entry(*term_id).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, HashMap<TermId, usize>)> = per_cat.into_iter().collect();
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max_categories);

    let vocab = index.vocabulary()?;
    Ok(ranked
        .into_iter()
        .map(|(category, counts)| {
            let mut keywords: Vec<KeywordCount> = counts
                .into_iter()
                .filter_map(|(id, count)| vocab.get(&id).map(|term| KeywordCount { term: term.clone(), count }))
                .collect();
            rank(&mut keywords);
            keywords.truncate(per_category);
            CategoryKeywords { category, keywords }
        })
        .collect())
}
