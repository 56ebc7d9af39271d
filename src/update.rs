//! Field-update engines.
//!
//! Two ways of overlaying fields from an "other" dataset onto a base dataset:
//!
//! - [`update_unordered`] matches records by primary key through a
//!   [`JoinIndex`] built from the other dataset.
//! - [`update_ordered`] pairs records by position and requires both datasets
//!   to have the same length.
//!
//! Both take the base sequence by value and return the updated sequence, so
//! the caller's data is never modified behind its back. Which fields are
//! copied is decided up front by a [`ColumnPolicy`].
//!
//! Memory: the base sequence, the other sequence and the index over the
//! other sequence are all held at once, O(n + m) in the two dataset sizes.

use serde_json::Value;

use crate::error::{DmError, Result};
use crate::index::JoinIndex;
use crate::record::{Record, key_text};
use crate::report::WarningSink;

/// Which fields an update copies from the other dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// Copy exactly these fields.
    Explicit(Vec<String>),
    /// Copy every field of the first other record.
    FullOverwrite,
    /// Copy the fields of the first other record that the first base record
    /// does not have.
    AdditiveOnly,
}

impl ColumnPolicy {
    /// Pick a policy from command-line style inputs.
    ///
    /// An explicit column list wins over `overwrite`; with neither the
    /// policy is additive-only.
    pub fn from_flags(columns: Option<Vec<String>>, overwrite: bool) -> Self {
        match columns {
            Some(cols) if !cols.is_empty() => ColumnPolicy::Explicit(cols),
            _ if overwrite => ColumnPolicy::FullOverwrite,
            _ => ColumnPolicy::AdditiveOnly,
        }
    }

    /// Resolve the policy into a concrete field list.
    ///
    /// Sampling looks only at the first record of each sequence and the
    /// result applies to every record. Fields keep the order of the first
    /// other record.
    pub fn resolve(&self, base: &[Record], other: &[Record]) -> Vec<String> {
        match self {
            ColumnPolicy::Explicit(cols) => cols.clone(),
            ColumnPolicy::FullOverwrite => other
                .first()
                .map(|r| r.keys().map(str::to_string).collect())
                .unwrap_or_default(),
            ColumnPolicy::AdditiveOnly => {
                let Some(sample) = other.first() else {
                    return Vec::new();
                };
                sample
                    .keys()
                    .filter(|k| base.first().is_none_or(|b| !b.contains(k)))
                    .map(str::to_string)
                    .collect()
            }
        }
    }
}

/// What to do with a base record whose key has no match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnmatchedPolicy {
    /// Fail with `KeyNotFound`.
    #[default]
    Fail,
    /// Leave the record unchanged and report a warning.
    Skip,
}

/// Options for [`update_unordered`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    pub unmatched: UnmatchedPolicy,
    /// Reject duplicate primary keys in the other dataset instead of letting
    /// the last one win.
    pub unique_keys: bool,
}

/// Update `base` with fields from `other`, matching records by `primary_key`.
///
/// For each base record, in order, the record of `other` with the same key
/// value has each field of `keys` copied over, overwriting or adding it.
/// When `other` repeats a key, its last record with that key is used unless
/// `options.unique_keys` is set.
///
/// Fails with `EmptyInput` when `other` is empty. An empty `base` yields an
/// empty result.
pub fn update_unordered<S: AsRef<str>>(
    base: Vec<Record>,
    other: &[Record],
    primary_key: &str,
    keys: &[S],
    options: &UpdateOptions,
    sink: &dyn WarningSink,
) -> Result<Vec<Record>> {
    if other.is_empty() {
        return Err(DmError::empty("other"));
    }
    if base.is_empty() {
        return Ok(base);
    }

    let index = if options.unique_keys {
        JoinIndex::build_unique(other, primary_key, "other")?
    } else {
        JoinIndex::build(other, primary_key, "other")?
    };

    let mut output = base;
    for (i, record) in output.iter_mut().enumerate() {
        let key = key_text(record.require(primary_key, "base", i)?);
        match index.get(&key) {
            Some((pos, matched)) => copy_fields(record, matched, pos, keys)?,
            None => match options.unmatched {
                UnmatchedPolicy::Fail => return Err(DmError::KeyNotFound { key, index: i }),
                UnmatchedPolicy::Skip => sink.warn(&format!(
                    "key {key} of base record {i} not found in other dataset, left unchanged"
                )),
            },
        }
    }
    Ok(output)
}

/// Update `base` with fields from `other`, pairing records by position.
///
/// Both sequences must have the same length.
pub fn update_ordered<S: AsRef<str>>(
    base: Vec<Record>,
    other: &[Record],
    keys: &[S],
) -> Result<Vec<Record>> {
    if base.len() != other.len() {
        return Err(DmError::LengthMismatch {
            left: base.len(),
            right: other.len(),
        });
    }

    let mut output = base;
    for (i, (record, update)) in output.iter_mut().zip(other).enumerate() {
        copy_fields(record, update, i, keys)?;
    }
    Ok(output)
}

fn copy_fields<S: AsRef<str>>(
    target: &mut Record,
    source: &Record,
    source_index: usize,
    keys: &[S],
) -> Result<()> {
    for key in keys {
        let key = key.as_ref();
        let value: Value = source.require(key, "other", source_index)?.clone();
        target.set(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Silent;
    use proptest::prelude::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn rec(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    fn recs(values: Vec<Value>) -> Vec<Record> {
        values.into_iter().map(rec).collect()
    }

    #[test]
    fn test_unordered_matches_by_key() {
        let base = recs(vec![json!({"id": 1, "a": 10}), json!({"id": 2, "a": 20})]);
        let other = recs(vec![json!({"id": 2, "b": 99}), json!({"id": 1, "b": 77})]);

        let out = update_unordered(base, &other, "id", &["b"], &UpdateOptions::default(), &Silent)
            .unwrap();

        assert_eq!(
            out,
            recs(vec![
                json!({"id": 1, "a": 10, "b": 77}),
                json!({"id": 2, "a": 20, "b": 99}),
            ])
        );
    }

    #[test]
    fn test_unordered_integral_float_key_matches_integer() {
        let base = recs(vec![json!({"id": 1})]);
        let other = recs(vec![json!({"id": 1.0, "b": 2})]);

        let out = update_unordered(base, &other, "id", &["b"], &UpdateOptions::default(), &Silent)
            .unwrap();

        assert_eq!(out, recs(vec![json!({"id": 1, "b": 2})]));
    }

    #[test]
    fn test_unordered_overwrites_existing_field_in_place() {
        let base = recs(vec![json!({"id": 1, "b": "old", "c": true})]);
        let other = recs(vec![json!({"id": 1, "b": "new"})]);

        let out = update_unordered(base, &other, "id", &["b"], &UpdateOptions::default(), &Silent)
            .unwrap();

        assert_eq!(out[0].keys().collect::<Vec<_>>(), vec!["id", "b", "c"]);
        assert_eq!(out[0].get("b"), Some(&json!("new")));
    }

    #[test]
    fn test_unordered_empty_other_fails() {
        let base = recs(vec![json!({"id": 1})]);
        let err = update_unordered(base, &[], "id", &["b"], &UpdateOptions::default(), &Silent)
            .unwrap_err();
        assert!(matches!(err, DmError::EmptyInput { .. }));
    }

    #[test]
    fn test_unordered_empty_base_is_empty_result() {
        let other = recs(vec![json!({"id": 1, "b": 5})]);
        let out = update_unordered(
            Vec::new(),
            &other,
            "id",
            &["b"],
            &UpdateOptions::default(),
            &Silent,
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_unordered_strict_unmatched_fails() {
        let base = recs(vec![json!({"id": 1}), json!({"id": 3})]);
        let other = recs(vec![json!({"id": 1, "b": 5})]);

        let err = update_unordered(base, &other, "id", &["b"], &UpdateOptions::default(), &Silent)
            .unwrap_err();

        match err {
            DmError::KeyNotFound { key, index } => {
                assert_eq!(key, "3");
                assert_eq!(index, 1);
            }
            other => panic!("Expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_unordered_tolerant_unmatched_warns() {
        let base = recs(vec![json!({"id": 1}), json!({"id": 3})]);
        let other = recs(vec![json!({"id": 1, "b": 5})]);
        let warnings = RefCell::new(Vec::new());
        let sink = |m: &str| warnings.borrow_mut().push(m.to_string());
        let options = UpdateOptions {
            unmatched: UnmatchedPolicy::Skip,
            ..Default::default()
        };

        let out = update_unordered(base, &other, "id", &["b"], &options, &sink).unwrap();

        assert_eq!(out, recs(vec![json!({"id": 1, "b": 5}), json!({"id": 3})]));
        let warnings = warnings.into_inner();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("key 3"));
    }

    #[test]
    fn test_unordered_duplicate_other_key_last_wins() {
        let base = recs(vec![json!({"id": 1})]);
        let other = recs(vec![json!({"id": 1, "b": "early"}), json!({"id": 1, "b": "late"})]);

        let out = update_unordered(base, &other, "id", &["b"], &UpdateOptions::default(), &Silent)
            .unwrap();

        assert_eq!(out[0].get("b"), Some(&json!("late")));
    }

    #[test]
    fn test_unordered_unique_keys_rejects_duplicates() {
        let base = recs(vec![json!({"id": 1})]);
        let other = recs(vec![json!({"id": 1, "b": 1}), json!({"id": 1, "b": 2})]);
        let options = UpdateOptions {
            unique_keys: true,
            ..Default::default()
        };

        let err = update_unordered(base, &other, "id", &["b"], &options, &Silent).unwrap_err();
        assert!(matches!(err, DmError::DuplicateKey { .. }));
    }

    #[test]
    fn test_unordered_missing_update_field() {
        let base = recs(vec![json!({"id": 1})]);
        let other = recs(vec![json!({"id": 1, "b": 1})]);

        let err = update_unordered(base, &other, "id", &["c"], &UpdateOptions::default(), &Silent)
            .unwrap_err();

        assert!(matches!(
            err,
            DmError::MissingField { ref dataset, index: 0, ref field } if dataset == "other" && field == "c"
        ));
    }

    #[test]
    fn test_unordered_base_without_key() {
        let base = recs(vec![json!({"id": 1}), json!({"name": "x"})]);
        let other = recs(vec![json!({"id": 1, "b": 1})]);

        let err = update_unordered(base, &other, "id", &["b"], &UpdateOptions::default(), &Silent)
            .unwrap_err();

        assert!(matches!(
            err,
            DmError::MissingField { ref dataset, index: 1, .. } if dataset == "base"
        ));
    }

    #[test]
    fn test_ordered_zips_by_position() {
        let base = recs(vec![json!({"q": "a"}), json!({"q": "b"})]);
        let other = recs(vec![json!({"ans": 1}), json!({"ans": 2})]);

        let out = update_ordered(base, &other, &["ans"]).unwrap();

        assert_eq!(
            out,
            recs(vec![json!({"q": "a", "ans": 1}), json!({"q": "b", "ans": 2})])
        );
    }

    #[test]
    fn test_ordered_length_mismatch() {
        let base = recs(vec![json!({"q": "a"}), json!({"q": "b"})]);
        let other = recs(vec![json!({"ans": 1})]);

        let err = update_ordered(base, &other, &["ans"]).unwrap_err();
        assert!(matches!(err, DmError::LengthMismatch { left: 2, right: 1 }));
    }

    #[test]
    fn test_ordered_missing_field() {
        let base = recs(vec![json!({"q": "a"}), json!({"q": "b"})]);
        let other = recs(vec![json!({"ans": 1}), json!({"other": 2})]);

        let err = update_ordered(base, &other, &["ans"]).unwrap_err();
        assert!(matches!(err, DmError::MissingField { index: 1, .. }));
    }

    #[test]
    fn test_policy_from_flags() {
        assert_eq!(
            ColumnPolicy::from_flags(Some(vec!["x".to_string()]), true),
            ColumnPolicy::Explicit(vec!["x".to_string()])
        );
        assert_eq!(
            ColumnPolicy::from_flags(None, true),
            ColumnPolicy::FullOverwrite
        );
        assert_eq!(
            ColumnPolicy::from_flags(Some(vec![]), false),
            ColumnPolicy::AdditiveOnly
        );
    }

    #[test]
    fn test_policy_resolution_samples_first_records() {
        let base = recs(vec![json!({"id": 1, "a": 1}), json!({"id": 2, "z": 1})]);
        let other = recs(vec![json!({"id": 1, "a": 2, "b": 3}), json!({"id": 2, "c": 4})]);

        assert_eq!(
            ColumnPolicy::FullOverwrite.resolve(&base, &other),
            vec!["id", "a", "b"]
        );
        assert_eq!(ColumnPolicy::AdditiveOnly.resolve(&base, &other), vec!["b"]);
        assert_eq!(
            ColumnPolicy::Explicit(vec!["c".to_string()]).resolve(&base, &other),
            vec!["c"]
        );
    }

    #[test]
    fn test_policy_resolution_with_empty_sequences() {
        let other = recs(vec![json!({"id": 1, "b": 3})]);
        assert_eq!(ColumnPolicy::AdditiveOnly.resolve(&[], &other), vec!["id", "b"]);
        assert!(ColumnPolicy::FullOverwrite.resolve(&other, &[]).is_empty());
    }

    fn keyed_datasets() -> impl Strategy<Value = (Vec<Record>, Vec<Record>)> {
        prop::collection::vec((any::<i32>(), any::<i32>()), 1..20).prop_flat_map(|rows| {
            let base: Vec<Record> = rows
                .iter()
                .enumerate()
                .map(|(i, (a, _))| rec(json!({"id": i, "a": a})))
                .collect();
            let other: Vec<Record> = rows
                .iter()
                .enumerate()
                .map(|(i, (_, b))| rec(json!({"id": i, "b": b})))
                .collect();
            (Just(base), Just(other).prop_shuffle())
        })
    }

    proptest! {
        #[test]
        fn prop_unordered_preserves_base_order((base, other) in keyed_datasets()) {
            let out = update_unordered(
                base.clone(), &other, "id", &["b"], &UpdateOptions::default(), &Silent,
            ).unwrap();

            prop_assert_eq!(out.len(), base.len());
            for (updated, original) in out.iter().zip(&base) {
                prop_assert_eq!(updated.get("id"), original.get("id"));
                prop_assert_eq!(updated.get("a"), original.get("a"));
                let matched = other
                    .iter()
                    .find(|o| o.get("id") == original.get("id"))
                    .unwrap();
                prop_assert_eq!(updated.get("b"), matched.get("b"));
            }
        }

        #[test]
        fn prop_unordered_is_idempotent((base, other) in keyed_datasets()) {
            let options = UpdateOptions::default();
            let once = update_unordered(base, &other, "id", &["b"], &options, &Silent).unwrap();
            let twice = update_unordered(once.clone(), &other, "id", &["b"], &options, &Silent)
                .unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
