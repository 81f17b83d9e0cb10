use crate::error::Result;
use crate::persist::{
    decode_id, id_key, posting_key, prefixed, split_posting_key, TxResult, IDENT_PREFIX, NAME_PREFIX,
};
use crate::{DocId, Term, TermId};
use sled::transaction::TransactionalTree;
use sled::Tree;
use std::collections::{BTreeSet, HashMap};

/// Term vocabulary and the term <-> document links.
#[derive(Clone)]
pub struct TermIndex {
    terms: Tree,
    postings: Tree,
}

impl TermIndex {
    pub(crate) fn new(terms: Tree, postings: Tree) -> Self {
        Self { terms, postings }
    }

    pub(crate) fn postings_tree(&self) -> &Tree { &self.postings }

    /// Return the term with this normalized string, creating it if unseen.
    ///
    /// Runs as a transaction, so concurrent callers with the same string end up
    /// with the same id.
    pub fn resolve_or_create(&self, term: &str) -> Result<Term> {
        let id = self.terms.transaction(|tx| Self::resolve_or_create_in(tx, term))?;
        Ok(Term { id, term: term.to_string() })
    }

    pub(crate) fn resolve_or_create_in(tx: &TransactionalTree, term: &str) -> TxResult<TermId> {
        let name_key = prefixed(NAME_PREFIX, term.as_bytes());
        if let Some(existing) = tx.get(&name_key)? {
            return crate::persist::tx(decode_id(&existing));
        }
        let id = tx.generate_id()?;
        tx.insert(name_key, &id_key(id)[..])?;
        tx.insert(prefixed(IDENT_PREFIX, &id_key(id)), term.as_bytes())?;
        Ok(id)
    }

    pub fn lookup(&self, term: &str) -> Result<Option<Term>> {
        match self.terms.get(prefixed(NAME_PREFIX, term.as_bytes()))? {
            Some(raw) => Ok(Some(Term { id: decode_id(&raw)?, term: term.to_string() })),
            None => Ok(None),
        }
    }

    /// Resolve the given strings, silently skipping those never indexed.
    /// Result is ordered by term id with no duplicates.
    pub fn find_by_terms<I, S>(&self, terms: I) -> Result<Vec<Term>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut found: Vec<Term> = Vec::new();
        for term in terms {
            if let Some(t) = self.lookup(term.as_ref())? {
                found.push(t);
            }
        }
        found.sort_by_key(|t| t.id);
        found.dedup_by_key(|t| t.id);
        Ok(found)
    }

    pub fn term_name(&self, id: TermId) -> Result<Option<String>> {
        Ok(self
            .terms
            .get(prefixed(IDENT_PREFIX, &id_key(id)))?
            .map(|raw| String::from_utf8_lossy(&raw).into_owned()))
    }

    /// Whole vocabulary, id -> term.
    pub fn vocabulary(&self) -> Result<HashMap<TermId, String>> {
        let mut vocab = HashMap::new();
        for item in self.terms.scan_prefix(IDENT_PREFIX) {
            let (k, v) = item?;
            vocab.insert(decode_id(&k[IDENT_PREFIX.len()..])?, String::from_utf8_lossy(&v).into_owned());
        }
        Ok(vocab)
    }

    pub fn len(&self) -> usize { self.terms.scan_prefix(IDENT_PREFIX).count() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Documents currently linked to the term, ascending.
    pub fn linked_documents(&self, term_id: TermId) -> Result<BTreeSet<DocId>> {
        let mut docs = BTreeSet::new();
        for item in self.postings.scan_prefix(id_key(term_id)) {
            let (k, _) = item?;
            docs.insert(split_posting_key(&k)?.1);
        }
        Ok(docs)
    }

    /// Number of linked documents for every term that has at least one link.
    pub fn document_frequencies(&self) -> Result<HashMap<TermId, usize>> {
        let mut df: HashMap<TermId, usize> = HashMap::new();
        for item in self.postings.iter() {
            let (k, _) = item?;
            *df.entry(split_posting_key(&k)?.0).or_insert(0) += 1;
        }
        Ok(df)
    }

    pub(crate) fn link_in(tx: &TransactionalTree, term_id: TermId, doc_id: DocId) -> TxResult<()> {
        tx.insert(posting_key(term_id, doc_id), Vec::<u8>::new())?;
        Ok(())
    }

    pub(crate) fn unlink_in(tx: &TransactionalTree, term_id: TermId, doc_id: DocId) -> TxResult<()> {
        tx.remove(posting_key(term_id, doc_id))?;
        Ok(())
    }
}
