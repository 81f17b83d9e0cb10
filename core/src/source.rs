use crate::error::{CatalogError, Result};
use crate::ingest::normalize_source_url;
use crate::{RawRecord, SourcedRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Produces the raw fields of a listing page. The fetch behind it owns its own
/// timeout and retry policy; any failure surfaces as `ExtractionFailure`.
pub trait RecordSource {
    fn extract(&self, url: &str) -> Result<RawRecord>;
}

/// Records prepared ahead of time, keyed by normalized source URL.
#[derive(Debug, Default, Clone)]
pub struct FixtureSource {
    records: HashMap<String, RawRecord>,
}

impl FixtureSource {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, url: &str, record: RawRecord) {
        let key = normalize_source_url(url).unwrap_or_else(|_| url.to_string());
        self.records.insert(key, record);
    }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn from_jsonl<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut source = Self::new();
        for rec in read_jsonl(path)? {
            source.insert(&rec.url, rec.record);
        }
        Ok(source)
    }
}

/// One `{ "url": ..., <RawRecord fields> }` object per line; blank lines skipped.
pub fn read_jsonl<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<SourcedRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

impl RecordSource for FixtureSource {
    fn extract(&self, url: &str) -> Result<RawRecord> {
        self.records
            .get(url)
            .cloned()
            .ok_or_else(|| CatalogError::ExtractionFailure(format!("no record for {url}")))
    }
}
