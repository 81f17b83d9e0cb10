use crate::error::{CatalogError, Result};
use crate::index::TermIndex;
use crate::ingest::NormalizedRecord;
use crate::persist::{
    abort, decode, decode_id, encode, id_key, prefixed, tx, TxResult, TITLE_PREFIX, URL_PREFIX,
};
use crate::{DocId, Document, TermId};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::{IVec, Transactional, Tree};
use std::collections::BTreeSet;
use std::convert::identity;

/// Stored form of a document: its attributes plus the term ids it is linked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DocumentRow {
    pub document: Document,
    pub term_ids: Vec<TermId>,
}

/// Owns the document rows and their title/url uniqueness keys.
#[derive(Clone)]
pub struct DocumentStore {
    documents: Tree,
    doc_keys: Tree,
}

impl DocumentStore {
    pub(crate) fn new(documents: Tree, doc_keys: Tree) -> Self {
        Self { documents, doc_keys }
    }

    /// Match by url first, then by title.
    pub fn find_existing(&self, title: &str, url: &str) -> Result<Option<Document>> {
        match owner_of(title, url, identity, |key| Ok(self.doc_keys.get(key)?))? {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    pub fn get(&self, id: DocId) -> Result<Option<Document>> {
        Ok(self.row(id)?.map(|row| row.document))
    }

    pub(crate) fn row(&self, id: DocId) -> Result<Option<DocumentRow>> {
        match self.documents.get(id_key(id))? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// All rows in id order.
    pub(crate) fn rows(&self) -> Result<Vec<DocumentRow>> {
        self.documents
            .iter()
            .values()
            .map(|raw| decode(&raw?))
            .collect()
    }

    pub fn list_all(&self) -> Result<Vec<Document>> {
        Ok(self.rows()?.into_iter().map(|row| row.document).collect())
    }

    pub fn term_ids(&self, id: DocId) -> Result<Vec<TermId>> {
        self.row(id)?
            .map(|row| row.term_ids)
            .ok_or(CatalogError::NotFound(id))
    }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    /// Insert a new document or overwrite the attributes of the one matching
    /// by url or title. Existing term links are left as they are.
    pub fn upsert(&self, record: &NormalizedRecord, scraped_at: &str) -> Result<Document> {
        let (doc, _) = (&self.documents, &self.doc_keys)
            .transaction(|(docs, keys)| Self::upsert_in(docs, keys, record, scraped_at))?;
        Ok(doc)
    }

    /// Returns the stored document and whether it was newly created.
    pub(crate) fn upsert_in(
        docs: &TransactionalTree,
        keys: &TransactionalTree,
        record: &NormalizedRecord,
        scraped_at: &str,
    ) -> TxResult<(Document, bool)> {
        let owner = owner_of(&record.title, &record.url, ConflictableTransactionError::Abort, |key| {
            Ok(keys.get(key)?)
        })?;
        let matched = match owner {
            Some(id) => match docs.get(id_key(id))? {
                Some(raw) => Some(tx(decode::<DocumentRow>(&raw))?),
                None => None,
            },
            None => None,
        };

        let created = matched.is_none();
        let (id, term_ids, old) = match matched {
            Some(row) => (row.document.id, row.term_ids, Some(row.document)),
            None => (docs.generate_id()?, Vec::new(), None),
        };

        if let Some(old) = &old {
            let old_url = prefixed(URL_PREFIX, old.url.as_bytes());
            if let Some(raw) = keys.get(&old_url)? {
                if tx(decode_id(&raw))? == id {
                    keys.remove(old_url)?;
                }
            }
            Self::update_title_ids(keys, &old.title, |ids| ids.retain(|d| *d != id))?;
        }
        Self::update_title_ids(keys, &record.title, |ids| {
            if let Err(at) = ids.binary_search(&id) {
                ids.insert(at, id);
            }
        })?;
        keys.insert(prefixed(URL_PREFIX, record.url.as_bytes()), &id_key(id)[..])?;

        let document = Document {
            id,
            title: record.title.clone(),
            description: record.description.clone(),
            categories: record.categories.clone(),
            rating: record.rating,
            url: record.url.clone(),
            icon_url: record.icon_url.clone(),
            scraped_at: scraped_at.to_string(),
        };
        let row = DocumentRow { document: document.clone(), term_ids };
        docs.insert(&id_key(id)[..], tx(encode(&row))?)?;
        Ok((document, created))
    }

    /// Edit the ascending id list stored under a title, dropping the key once empty.
    fn update_title_ids(keys: &TransactionalTree, title: &str, edit: impl FnOnce(&mut Vec<DocId>)) -> TxResult<()> {
        let key = prefixed(TITLE_PREFIX, title.as_bytes());
        let mut ids: Vec<DocId> = match keys.get(&key)? {
            Some(raw) => tx(decode(&raw))?,
            None => Vec::new(),
        };
        edit(&mut ids);
        if ids.is_empty() {
            keys.remove(key)?;
        } else {
            keys.insert(key, tx(encode(&ids))?)?;
        }
        Ok(())
    }

    /// Drop every link of the document and link it to exactly `term_ids`,
    /// in one transaction.
    pub fn replace_term_links(&self, index: &TermIndex, id: DocId, term_ids: &BTreeSet<TermId>) -> Result<()> {
        (&self.documents, index.postings_tree())
            .transaction(|(docs, postings)| Self::replace_links_in(docs, postings, id, term_ids))?;
        Ok(())
    }

    pub(crate) fn replace_links_in(
        docs: &TransactionalTree,
        postings: &TransactionalTree,
        id: DocId,
        term_ids: &BTreeSet<TermId>,
    ) -> TxResult<()> {
        let mut row: DocumentRow = match docs.get(id_key(id))? {
            Some(raw) => tx(decode(&raw))?,
            None => return abort(CatalogError::NotFound(id)),
        };
        for old in &row.term_ids {
            TermIndex::unlink_in(postings, *old, id)?;
        }
        for new in term_ids {
            TermIndex::link_in(postings, *new, id)?;
        }
        row.term_ids = term_ids.iter().copied().collect();
        docs.insert(&id_key(id)[..], tx(encode(&row))?)?;
        Ok(())
    }
}

/// The document a title/url pair belongs to: the url owner, else the lowest id
/// carrying the title. Shared by plain reads and transactional upserts.
fn owner_of<E>(
    title: &str,
    url: &str,
    lift: impl Fn(CatalogError) -> E,
    mut get: impl FnMut(Vec<u8>) -> std::result::Result<Option<IVec>, E>,
) -> std::result::Result<Option<DocId>, E> {
    if let Some(raw) = get(prefixed(URL_PREFIX, url.as_bytes()))? {
        return decode_id(&raw).map(Some).map_err(lift);
    }
    match get(prefixed(TITLE_PREFIX, title.as_bytes()))? {
        Some(raw) => decode::<Vec<DocId>>(&raw).map(|ids| ids.first().copied()).map_err(lift),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{open_temporary, Trees};

    fn stores() -> (DocumentStore, TermIndex) {
        let db = open_temporary().unwrap();
        let t = Trees::open(&db).unwrap();
        (DocumentStore::new(t.documents, t.doc_keys), TermIndex::new(t.terms, t.postings))
    }

    fn record(title: &str, url: &str) -> NormalizedRecord {
        NormalizedRecord {
            title: title.into(),
            description: "N/A".into(),
            categories: vec!["Action".into()],
            rating: Some(4.5),
            url: url.into(),
            icon_url: None,
        }
    }

    #[test]
    fn upsert_matches_by_title_or_url() {
        let (store, _) = stores();
        let a = store.upsert(&record("Space Raiders", "u1"), "t0").unwrap();
        let by_url = store.upsert(&record("Space Raiders II", "u1"), "t1").unwrap();
        assert_eq!(a.id, by_url.id);
        assert_eq!(by_url.title, "Space Raiders II");
        let by_title = store.upsert(&record("Space Raiders II", "u2"), "t2").unwrap();
        assert_eq!(a.id, by_title.id);
        assert_eq!(store.len(), 1);
        assert!(store.find_existing("Space Raiders", "u1").unwrap().is_none());
        assert_eq!(store.find_existing("nope", "u2").unwrap().map(|d| d.id), Some(a.id));
    }

    #[test]
    fn shared_title_stays_with_every_holder() {
        let (store, _) = stores();
        let a = store.upsert(&record("Chess", "u1"), "t0").unwrap();
        let b = store.upsert(&record("Chess Pro", "u2"), "t0").unwrap();
        // a takes b's title by url, then leaves it again
        store.upsert(&record("Chess Pro", "u1"), "t1").unwrap();
        store.upsert(&record("Chess Classic", "u1"), "t2").unwrap();
        assert_eq!(store.find_existing("Chess Pro", "u9").unwrap().map(|d| d.id), Some(b.id));
        assert_eq!(store.find_existing("Chess Classic", "u9").unwrap().map(|d| d.id), Some(a.id));
        assert!(store.find_existing("Chess", "u9").unwrap().is_none());
    }

    #[test]
    fn replace_links_leaves_no_stale_postings() {
        let (store, index) = stores();
        let doc = store.upsert(&record("Space Raiders", "u1"), "t0").unwrap();
        let x = index.resolve_or_create("x").unwrap().id;
        let y = index.resolve_or_create("y").unwrap().id;
        let z = index.resolve_or_create("z").unwrap().id;

        store.replace_term_links(&index, doc.id, &[x, y].into_iter().collect()).unwrap();
        store.replace_term_links(&index, doc.id, &[y, z].into_iter().collect()).unwrap();

        assert!(index.linked_documents(x).unwrap().is_empty());
        assert!(index.linked_documents(y).unwrap().contains(&doc.id));
        assert!(index.linked_documents(z).unwrap().contains(&doc.id));
        assert_eq!(store.term_ids(doc.id).unwrap(), vec![y, z]);
    }

    #[test]
    fn replace_links_on_missing_document() {
        let (store, index) = stores();
        let err = store.replace_term_links(&index, 99, &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(99)));
    }
}
