use crate::error::{CatalogError, Result};
use crate::index::TermIndex;
use crate::persist::{Trees, TxResult};
use crate::store::DocumentStore;
use crate::tokenizer::{category_term, Tokenizer};
use crate::{Document, RawRecord};
use lazy_static::lazy_static;
use regex::Regex;
use sled::Transactional;
use std::collections::BTreeSet;
use time::format_description::well_known::Rfc3339;

pub const MISSING: &str = "N/A";

lazy_static! {
    static ref SOURCE_RE: Regex =
        Regex::new(r"^https://play\.google\.com/store/apps/details\?id=[a-zA-Z0-9._-]+(?:&.*)?$")
            .expect("valid regex");
    static ref RATING_RE: Regex = Regex::new(r"\d+(?:\.\d+)?").expect("valid regex");
}

/// Check the store listing URL shape and pin the listing language to English
/// unless the caller already chose one.
pub fn normalize_source_url(url: &str) -> Result<String> {
    let url = url.trim();
    if !SOURCE_RE.is_match(url) {
        return Err(CatalogError::InvalidSource(format!(
            "{url:?} must start with \"https://play.google.com/store/apps/details?id=\" followed by an app id"
        )));
    }
    if url.contains("&hl=") {
        Ok(url.to_string())
    } else {
        Ok(format!("{url}&hl=en"))
    }
}

/// First decimal number in the text, e.g. "Rated 4.4 stars out of five" -> 4.4.
pub fn parse_rating(text: &str) -> Option<f32> {
    RATING_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|r| r.is_finite())
}

/// Document fields after sentinel substitution and cleanup.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub rating: Option<f32>,
    pub url: String,
    pub icon_url: Option<String>,
}

impl NormalizedRecord {
    pub fn from_raw(url: String, raw: RawRecord) -> Self {
        let non_empty = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let icon_url = non_empty(raw.icon_url);
        if icon_url.is_none() {
            tracing::warn!(%url, "icon url missing");
        }
        Self {
            title: non_empty(raw.title).unwrap_or_else(|| MISSING.to_string()),
            description: non_empty(raw.description).unwrap_or_else(|| MISSING.to_string()),
            categories: raw
                .categories
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            rating: raw.rating.as_deref().and_then(parse_rating),
            url,
            icon_url,
        }
    }

    /// Prose fields go through the tokenizer; categories are added as literal terms.
    pub fn terms(&self, tokenizer: &Tokenizer) -> BTreeSet<String> {
        let mut terms: BTreeSet<String> = BTreeSet::new();
        terms.extend(tokenizer.tokenize(&self.title));
        terms.extend(tokenizer.tokenize(&self.description));
        terms.extend(self.categories.iter().filter_map(|c| category_term(c)));
        terms
    }
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Validate, upsert, resolve terms and relink in one transaction over all trees.
///
/// Either every step lands or none does: a failure leaves the previous document
/// attributes and link set untouched. Callers serialize concurrent ingestions.
pub(crate) fn ingest_record(
    trees: &Trees,
    tokenizer: &Tokenizer,
    source_url: &str,
    raw: RawRecord,
) -> Result<Document> {
    let url = normalize_source_url(source_url)?;
    let record = NormalizedRecord::from_raw(url, raw);
    let terms = record.terms(tokenizer);
    let scraped_at = now_rfc3339();

    let (document, created) = (&trees.documents, &trees.doc_keys, &trees.terms, &trees.postings)
        .transaction(|(docs, keys, vocab, postings)| -> TxResult<(Document, bool)> {
            let (document, created) = DocumentStore::upsert_in(docs, keys, &record, &scraped_at)?;
            let mut term_ids = BTreeSet::new();
            for term in &terms {
                term_ids.insert(TermIndex::resolve_or_create_in(vocab, term)?);
            }
            DocumentStore::replace_links_in(docs, postings, document.id, &term_ids)?;
            Ok((document, created))
        })?;

    tracing::info!(
        doc_id = document.id,
        title = %document.title,
        terms = terms.len(),
        created,
        "ingested document"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_pins_language() {
        let url = normalize_source_url("https://play.google.com/store/apps/details?id=com.example.game").unwrap();
        assert_eq!(url, "https://play.google.com/store/apps/details?id=com.example.game&hl=en");
        let kept = normalize_source_url("https://play.google.com/store/apps/details?id=com.x&hl=de").unwrap();
        assert!(kept.ends_with("&hl=de"));
    }

    #[test]
    fn rejects_other_urls() {
        for bad in [
            "",
            "http://play.google.com/store/apps/details?id=com.x",
            "https://example.com/store/apps/details?id=com.x",
            "https://play.google.com/store/apps/details?id=",
            "https://play.google.com/store/apps/details?id=com x",
        ] {
            assert!(matches!(normalize_source_url(bad), Err(CatalogError::InvalidSource(_))), "{bad}");
        }
    }

    #[test]
    fn rating_parsing() {
        assert_eq!(parse_rating("4.5"), Some(4.5));
        assert_eq!(parse_rating("Rated 3.9 stars out of five stars"), Some(3.9));
        assert_eq!(parse_rating("no rating"), None);
    }

    #[test]
    fn sentinels_and_cleanup() {
        let raw = RawRecord {
            title: Some("   ".into()),
            description: None,
            categories: vec![" Action ".into(), "".into()],
            rating: Some("n/a".into()),
            icon_url: Some("".into()),
        };
        let rec = NormalizedRecord::from_raw("u".into(), raw);
        assert_eq!(rec.title, MISSING);
        assert_eq!(rec.description, MISSING);
        assert_eq!(rec.categories, vec!["Action".to_string()]);
        assert_eq!(rec.rating, None);
        assert_eq!(rec.icon_url, None);
    }

    #[test]
    fn categories_bypass_stemming_and_filters() {
        let rec = NormalizedRecord {
            title: "Games".into(),
            description: MISSING.into(),
            categories: vec!["Games".into(), "RPG".into()],
            rating: None,
            url: "u".into(),
            icon_url: None,
        };
        let terms = rec.terms(&Tokenizer::default());
        assert!(terms.contains("games"));
        assert!(terms.contains("game"));
        assert!(terms.contains("rpg"));
    }
}
