//! Field-merge engine.
//!
//! Combines one field across several positionally aligned record sequences
//! into a single field of the first sequence's records.

use std::fmt;
use std::str::FromStr;

use serde_json::{Number, Value};

use crate::error::{DmError, Result};
use crate::record::Record;

/// The source field of each sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKeys {
    /// The same field name in every sequence.
    Single(String),
    /// One field name per sequence, in sequence order.
    PerSequence(Vec<String>),
}

impl SourceKeys {
    fn expand(&self, count: usize) -> Result<Vec<String>> {
        match self {
            SourceKeys::Single(key) => Ok(vec![key.clone(); count]),
            SourceKeys::PerSequence(keys) if keys.len() == count => Ok(keys.clone()),
            SourceKeys::PerSequence(keys) => Err(DmError::InvalidArgument(format!(
                "{} source keys given for {} sequences",
                keys.len(),
                count
            ))),
        }
    }
}

impl From<&str> for SourceKeys {
    fn from(key: &str) -> Self {
        SourceKeys::Single(key.to_string())
    }
}

impl From<String> for SourceKeys {
    fn from(key: String) -> Self {
        SourceKeys::Single(key)
    }
}

impl From<Vec<String>> for SourceKeys {
    fn from(keys: Vec<String>) -> Self {
        SourceKeys::PerSequence(keys)
    }
}

impl From<Vec<&str>> for SourceKeys {
    fn from(keys: Vec<&str>) -> Self {
        SourceKeys::PerSequence(keys.into_iter().map(str::to_string).collect())
    }
}

/// Merge one field across `sequences`.
///
/// At every index the value of each sequence's source field is gathered in
/// sequence order and passed to `merge_fn`. The result is written into a
/// copy of the first sequence's record under `result_key` (default: the
/// first source key). When the result key differs from the first source
/// key, that source field is removed from the merged record.
///
/// All sequences must have the same length; the first adjacent pair that
/// differs is reported.
pub fn merge_fields<F>(
    sequences: &[Vec<Record>],
    src_keys: &SourceKeys,
    mut merge_fn: F,
    result_key: Option<&str>,
) -> Result<Vec<Record>>
where
    F: FnMut(&[Value]) -> Value,
{
    if sequences.is_empty() {
        return Err(DmError::empty("merge"));
    }
    let keys = src_keys.expand(sequences.len())?;

    for (i, pair) in sequences.windows(2).enumerate() {
        if pair[0].len() != pair[1].len() {
            return Err(DmError::SequenceLengthMismatch {
                first: i,
                second: i + 1,
                left: pair[0].len(),
                right: pair[1].len(),
            });
        }
    }

    let first_key = keys[0].as_str();
    let result_key = result_key.unwrap_or(first_key);
    let mut output = Vec::with_capacity(sequences[0].len());
    let mut gathered = Vec::with_capacity(sequences.len());

    for i in 0..sequences[0].len() {
        gathered.clear();
        for (j, (sequence, key)) in sequences.iter().zip(&keys).enumerate() {
            let value = sequence[i]
                .get(key)
                .ok_or_else(|| DmError::missing(&format!("sequence {j}"), i, key))?;
            gathered.push(value.clone());
        }

        let mut merged = sequences[0][i].clone();
        merged.set(result_key, merge_fn(&gathered));
        if result_key != first_key {
            merged.remove(first_key);
        }
        output.push(merged);
    }

    Ok(output)
}

/// Built-in reductions for [`merge_fields`].
///
/// Numeric reducers accept numbers and numeric strings; if any value is
/// neither they produce `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    Min,
    Max,
    /// Concatenate values as text.
    Concat,
    /// Collect values into an array.
    List,
    First,
    Last,
}

impl Reducer {
    pub fn apply(&self, values: &[Value]) -> Value {
        match self {
            Reducer::Sum => sum(values),
            Reducer::Mean => numbers(values)
                .filter(|nums| !nums.is_empty())
                .map(|nums| float(nums.iter().sum::<f64>() / nums.len() as f64))
                .unwrap_or(Value::Null),
            Reducer::Min => numbers(values)
                .and_then(|nums| nums.into_iter().reduce(f64::min))
                .map(float)
                .unwrap_or(Value::Null),
            Reducer::Max => numbers(values)
                .and_then(|nums| nums.into_iter().reduce(f64::max))
                .map(float)
                .unwrap_or(Value::Null),
            Reducer::Concat => Value::String(values.iter().map(text).collect()),
            Reducer::List => Value::Array(values.to_vec()),
            Reducer::First => values.first().cloned().unwrap_or(Value::Null),
            Reducer::Last => values.last().cloned().unwrap_or(Value::Null),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Concat => "concat",
            Reducer::List => "list",
            Reducer::First => "first",
            Reducer::Last => "last",
        }
    }
}

impl FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(Reducer::Sum),
            "mean" | "avg" => Ok(Reducer::Mean),
            "min" => Ok(Reducer::Min),
            "max" => Ok(Reducer::Max),
            "concat" => Ok(Reducer::Concat),
            "list" => Ok(Reducer::List),
            "first" => Ok(Reducer::First),
            "last" => Ok(Reducer::Last),
            other => Err(format!("unknown reducer: {other}")),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer sum when every value is an integer, float sum otherwise.
fn sum(values: &[Value]) -> Value {
    let ints: Option<Vec<i64>> = values.iter().map(Value::as_i64).collect();
    if let Some(ints) = ints
        && let Some(total) = ints.iter().try_fold(0i64, |acc, n| acc.checked_add(*n))
    {
        return Value::from(total);
    }
    numbers(values)
        .map(|nums| float(nums.iter().sum()))
        .unwrap_or(Value::Null)
}

fn numbers(values: &[Value]) -> Option<Vec<f64>> {
    values
        .iter()
        .map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .collect()
}

fn float(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recs(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| Record::try_from(v).unwrap())
            .collect()
    }

    fn three_sequences() -> Vec<Vec<Record>> {
        vec![
            recs(vec![json!({"id": 0, "f0": 1}), json!({"id": 1, "f0": 2})]),
            recs(vec![json!({"f1": 10}), json!({"f1": 20})]),
            recs(vec![json!({"f2": 100}), json!({"f2": 200})]),
        ]
    }

    #[test]
    fn test_sum_across_three_sequences() {
        let keys = SourceKeys::from(vec!["f0", "f1", "f2"]);
        let out = merge_fields(&three_sequences(), &keys, |v| Reducer::Sum.apply(v), Some("total"))
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("total"), Some(&json!(111)));
        assert_eq!(out[1].get("total"), Some(&json!(222)));
        assert!(!out[0].contains("f0"));
        assert_eq!(out[0].get("id"), Some(&json!(0)));
    }

    #[test]
    fn test_result_key_defaults_to_first_source() {
        let seqs = vec![
            recs(vec![json!({"text": "a", "n": 1})]),
            recs(vec![json!({"text": "b"})]),
        ];
        let out = merge_fields(&seqs, &SourceKeys::from("text"), |v| Reducer::Concat.apply(v), None)
            .unwrap();

        assert_eq!(out[0].get("text"), Some(&json!("ab")));
        assert_eq!(out[0].keys().collect::<Vec<_>>(), vec!["text", "n"]);
    }

    #[test]
    fn test_explicit_result_key_equal_to_source_keeps_field() {
        let seqs = vec![recs(vec![json!({"v": 1})]), recs(vec![json!({"v": 2})])];
        let out = merge_fields(&seqs, &"v".into(), |v| Reducer::List.apply(v), Some("v")).unwrap();
        assert_eq!(out[0].get("v"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_length_mismatch_names_pair() {
        let seqs = vec![
            recs(vec![json!({"v": 1})]),
            recs(vec![json!({"v": 2})]),
            recs(vec![json!({"v": 3}), json!({"v": 4})]),
        ];
        let err = merge_fields(&seqs, &"v".into(), |v| Reducer::Sum.apply(v), None).unwrap_err();
        assert!(matches!(
            err,
            DmError::SequenceLengthMismatch {
                first: 1,
                second: 2,
                left: 1,
                right: 2
            }
        ));
    }

    #[test]
    fn test_missing_source_field() {
        let seqs = vec![recs(vec![json!({"v": 1})]), recs(vec![json!({"w": 2})])];
        let err = merge_fields(&seqs, &"v".into(), |v| Reducer::Sum.apply(v), None).unwrap_err();
        assert!(matches!(
            err,
            DmError::MissingField { ref dataset, index: 0, .. } if dataset == "sequence 1"
        ));
    }

    #[test]
    fn test_no_sequences() {
        let err = merge_fields(&[], &"v".into(), |v| Reducer::Sum.apply(v), None).unwrap_err();
        assert!(matches!(err, DmError::EmptyInput { .. }));
    }

    #[test]
    fn test_source_key_count_must_match() {
        let seqs = vec![recs(vec![json!({"v": 1})]), recs(vec![json!({"v": 2})])];
        let keys = SourceKeys::from(vec!["v"]);
        let err = merge_fields(&seqs, &keys, |v| Reducer::Sum.apply(v), None).unwrap_err();
        assert!(matches!(err, DmError::InvalidArgument(_)));
    }

    #[test]
    fn test_reducers() {
        let values = vec![json!(3), json!("1.5"), json!(2)];
        assert_eq!(Reducer::Sum.apply(&values), json!(6.5));
        assert_eq!(Reducer::Sum.apply(&[json!(1), json!(2)]), json!(3));
        assert_eq!(Reducer::Mean.apply(&[json!(1), json!(2)]), json!(1.5));
        assert_eq!(Reducer::Min.apply(&values), json!(1.5));
        assert_eq!(Reducer::Max.apply(&values), json!(3.0));
        assert_eq!(Reducer::Sum.apply(&[json!(1), json!("x")]), Value::Null);
        assert_eq!(Reducer::Concat.apply(&[json!("a"), json!(1), Value::Null]), json!("a1"));
        assert_eq!(Reducer::First.apply(&values), json!(3));
        assert_eq!(Reducer::Last.apply(&values), json!(2));
    }

    #[test]
    fn test_reducer_from_str() {
        assert_eq!("SUM".parse::<Reducer>().unwrap(), Reducer::Sum);
        assert_eq!("avg".parse::<Reducer>().unwrap(), Reducer::Mean);
        assert!("median".parse::<Reducer>().is_err());
    }
}
