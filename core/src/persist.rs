use crate::error::{CatalogError, Result};
use crate::{DocId, TermId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use sled::{Db, Tree};
use std::path::Path;

pub type TxResult<T> = ConflictableTransactionResult<T, CatalogError>;

const DOCUMENTS: &str = "documents";
const DOC_KEYS: &str = "doc_keys";
const TERMS: &str = "terms";
const POSTINGS: &str = "postings";

/// `doc_keys`: title -> ascending DocIds of every document with that title
pub const TITLE_PREFIX: &[u8] = b"t:";
/// `doc_keys`: url -> DocId
pub const URL_PREFIX: &[u8] = b"u:";
/// `terms`: normalized term -> TermId
pub const NAME_PREFIX: &[u8] = b"n:";
/// `terms`: TermId -> normalized term
pub const IDENT_PREFIX: &[u8] = b"i:";

/// The four trees backing a catalog.
///
/// `documents` holds one row per document (attributes plus its current term ids),
/// `postings` holds one empty-valued key per term/document link, laid out as
/// `TermId ‖ DocId` big-endian so a prefix scan yields a term's documents in id order.
#[derive(Clone)]
pub struct Trees {
    pub documents: Tree,
    pub doc_keys: Tree,
    pub terms: Tree,
    pub postings: Tree,
}

impl Trees {
    pub fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            documents: db.open_tree(DOCUMENTS)?,
            doc_keys: db.open_tree(DOC_KEYS)?,
            terms: db.open_tree(TERMS)?,
            postings: db.open_tree(POSTINGS)?,
        })
    }
}

pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Db> {
    Ok(sled::open(path)?)
}

pub fn open_temporary() -> Result<Db> {
    Ok(sled::Config::new().temporary(true).open()?)
}

pub fn id_key(id: u64) -> [u8; 8] { id.to_be_bytes() }

pub fn decode_id(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| CatalogError::Corrupt(format!("id of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

pub fn prefixed(prefix: &[u8], rest: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + rest.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(rest);
    key
}

pub fn posting_key(term_id: TermId, doc_id: DocId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&id_key(term_id));
    key.extend_from_slice(&id_key(doc_id));
    key
}

pub fn split_posting_key(key: &[u8]) -> Result<(TermId, DocId)> {
    if key.len() != 16 {
        return Err(CatalogError::Corrupt(format!("posting key of {} bytes", key.len())));
    }
    Ok((decode_id(&key[..8])?, decode_id(&key[8..])?))
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Lift a catalog error out of a transaction closure, aborting it.
pub fn abort<T>(err: CatalogError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

/// `?`-friendly adapter for fallible helpers used inside transaction closures.
pub fn tx<T>(res: Result<T>) -> TxResult<T> {
    res.map_err(ConflictableTransactionError::Abort)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_keys_sort_by_term_then_doc() {
        let a = posting_key(1, 300);
        let b = posting_key(2, 1);
        let c = posting_key(2, 7);
        assert!(a < b && b < c);
        assert_eq!(split_posting_key(&c).unwrap(), (2, 7));
    }

    #[test]
    fn short_keys_are_corrupt() {
        assert!(matches!(decode_id(&[1, 2, 3]), Err(CatalogError::Corrupt(_))));
        assert!(split_posting_key(&[0; 9]).is_err());
    }
}
