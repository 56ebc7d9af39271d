//! Join-key index over one record sequence.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::{DmError, Result};
use crate::record::{Record, key_text};

/// Maps a primary-key value to the record carrying it.
///
/// Built with [`JoinIndex::build`], duplicate key values resolve to the record
/// appearing last in the sequence. Use [`JoinIndex::build_unique`] to reject
/// duplicates instead.
#[derive(Debug)]
pub struct JoinIndex<'a> {
    entries: HashMap<String, (usize, &'a Record)>,
}

impl<'a> JoinIndex<'a> {
    /// Index `records` by `primary_key`, last write wins.
    ///
    /// Every record must carry the key; `dataset` names the sequence in the
    /// `MissingField` error.
    pub fn build(records: &'a [Record], primary_key: &str, dataset: &str) -> Result<Self> {
        let mut entries = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let key = key_text(record.require(primary_key, dataset, i)?);
            entries.insert(key, (i, record));
        }
        Ok(Self { entries })
    }

    /// Index `records` by `primary_key`, failing on the first repeated value.
    pub fn build_unique(records: &'a [Record], primary_key: &str, dataset: &str) -> Result<Self> {
        let mut entries = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let key = key_text(record.require(primary_key, dataset, i)?);
            match entries.entry(key) {
                Entry::Occupied(e) => {
                    let (first, _) = *e.get();
                    return Err(DmError::DuplicateKey {
                        key: e.key().clone(),
                        first,
                        second: i,
                    });
                }
                Entry::Vacant(e) => {
                    e.insert((i, record));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Look up a key given in canonical text form (see [`key_text`]).
    ///
    /// Returns the record and its position in the indexed sequence.
    pub fn get(&self, key: &str) -> Option<(usize, &'a Record)> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
