//! Multi-field transform engine.
//!
//! Derives one new field per model name from several existing fields. For a
//! model name `m`, each transform parameter `p` is read from the field
//! named `key_fn[p](m)` and the transform's result is written to
//! `dst_key(m)`.
//!
//! ```
//! use dm_rs::{ParamMapping, Record, transform_fields};
//! use serde_json::json;
//!
//! let mut records = vec![
//!     Record::try_from(json!({"gpt_score": 3, "gpt_weight": 2})).unwrap(),
//! ];
//! let params = ParamMapping::new()
//!     .param("score", |m| format!("{m}_score"))
//!     .param("weight", |m| format!("{m}_weight"));
//!
//! transform_fields(&mut records, &["gpt"], &params, |m| format!("{m}_total"), |p| {
//!     json!(p["score"].as_i64().unwrap_or(0) * p["weight"].as_i64().unwrap_or(0))
//! })
//! .unwrap();
//!
//! assert_eq!(records[0].get("gpt_total"), Some(&json!(6)));
//! ```

use serde_json::{Map, Value};

use crate::error::Result;
use crate::record::Record;

/// Maps a model name to a field name.
pub type KeyFn = Box<dyn Fn(&str) -> String>;

/// Named transform parameters and the field each one is read from.
#[derive(Default)]
pub struct ParamMapping {
    params: Vec<(String, KeyFn)>,
}

impl ParamMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter whose value is read from `key_fn(model_name)`.
    pub fn param(
        mut self,
        name: impl Into<String>,
        key_fn: impl Fn(&str) -> String + 'static,
    ) -> Self {
        self.params.push((name.into(), Box::new(key_fn)));
        self
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    fn gather(&self, record: &Record, model: &str, index: usize) -> Result<Map<String, Value>> {
        let mut args = Map::with_capacity(self.params.len());
        for (name, key_fn) in &self.params {
            let field = key_fn(model);
            let value = record.require(&field, "input", index)?.clone();
            args.insert(name.clone(), value);
        }
        Ok(args)
    }
}

/// Apply `transform` to every record for every model name, in place.
///
/// Records are visited in order and model names in the order given. The
/// result for model `m` is stored under `dst_key(m)`; `dst_key` must map
/// distinct model names to distinct fields.
///
/// A missing parameter field fails with `MissingField`. Records visited
/// before the failure keep the fields already written.
pub fn transform_fields<S, D, T>(
    records: &mut [Record],
    model_names: &[S],
    params: &ParamMapping,
    dst_key: D,
    mut transform: T,
) -> Result<()>
where
    S: AsRef<str>,
    D: Fn(&str) -> String,
    T: FnMut(&Map<String, Value>) -> Value,
{
    for (i, record) in records.iter_mut().enumerate() {
        for model in model_names {
            let model = model.as_ref();
            let args = params.gather(record, model, i)?;
            let result = transform(&args);
            record.set(dst_key(model), result);
        }
    }
    Ok(())
}
