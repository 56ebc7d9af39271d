//! Single-pass record reshaping: dedupe, column selection and key renaming.

use std::collections::HashMap;

use crate::error::{DmError, Result};
use crate::record::{Record, key_text};

/// Keep one record per `primary_key` value.
///
/// The surviving record is the last one with that key, placed where the key
/// first appeared.
pub fn dedupe(records: Vec<Record>, primary_key: &str) -> Result<Vec<Record>> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut output: Vec<Record> = Vec::new();

    for (i, record) in records.into_iter().enumerate() {
        let key = key_text(record.require(primary_key, "input", i)?);
        match positions.get(&key) {
            Some(&pos) => output[pos] = record,
            None => {
                positions.insert(key, output.len());
                output.push(record);
            }
        }
    }

    Ok(output)
}

/// Keep only `columns`, in the order given. Every record must have them all.
pub fn keep_columns<S: AsRef<str>>(records: &[Record], columns: &[S]) -> Result<Vec<Record>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            columns
                .iter()
                .map(|col| {
                    let col = col.as_ref();
                    let value = record.require(col, "input", i)?.clone();
                    Ok((col.to_string(), value))
                })
                .collect::<Result<Record>>()
        })
        .collect()
}

/// Remove `columns` from every record. Absent columns are ignored.
pub fn drop_columns<S: AsRef<str>>(records: Vec<Record>, columns: &[S]) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut record| {
            for col in columns {
                record.remove(col.as_ref());
            }
            record
        })
        .collect()
}

/// Parse a `src1:dst1,src2:dst2` mapping.
pub fn parse_key_mapping(text: &str) -> Result<Vec<(String, String)>> {
    text.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(':') {
            Some((src, dst)) if !src.trim().is_empty() && !dst.trim().is_empty() => {
                Ok((src.trim().to_string(), dst.trim().to_string()))
            }
            _ => Err(DmError::InvalidArgument(format!(
                "mapping entry '{pair}' is not of the form src:dst"
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .and_then(|pairs| {
            if pairs.is_empty() {
                Err(DmError::InvalidArgument("empty key mapping".to_string()))
            } else {
                Ok(pairs)
            }
        })
}

/// Rename keys in every record, keeping field positions.
///
/// Records lacking a source key are left as they are for that entry.
pub fn rename_keys(records: Vec<Record>, mapping: &[(String, String)]) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut record| {
            for (src, dst) in mapping {
                record.rename(src, dst);
            }
            record
        })
        .collect()
}
