//! # dm-rs
//!
//! Record-level data management for JSON Lines datasets.
//!
//! A dataset is an ordered sequence of flat [`Record`]s loaded whole into
//! memory. The library joins and reshapes such sequences:
//!
//! - **Field update**: overlay selected fields of an "other" dataset onto a
//!   base dataset, matched by primary key ([`update_unordered`]) or by
//!   position ([`update_ordered`])
//! - **Field merge**: reduce one field across several aligned datasets
//!   ([`merge_fields`])
//! - **Multi-field transform**: derive per-model fields from several
//!   existing ones ([`transform_fields`])
//! - **Scoring helpers**: Good/Same/Bad comparison verdicts ([`gsb`]) and
//!   JSON extraction from Markdown fences ([`mdjson`])
//! - **Reshaping and conversion**: dedupe, column selection, key renaming,
//!   spreadsheet/CSV/JSON conversion
//!
//! ## Example
//!
//! ```
//! use dm_rs::{Record, Silent, UpdateOptions, update_unordered};
//! use serde_json::json;
//!
//! let base = vec![
//!     Record::try_from(json!({"id": 1, "a": 10})).unwrap(),
//!     Record::try_from(json!({"id": 2, "a": 20})).unwrap(),
//! ];
//! let other = vec![
//!     Record::try_from(json!({"id": 2, "b": 99})).unwrap(),
//!     Record::try_from(json!({"id": 1, "b": 77})).unwrap(),
//! ];
//!
//! let updated = update_unordered(base, &other, "id", &["b"], &UpdateOptions::default(), &Silent)
//!     .unwrap();
//!
//! assert_eq!(updated[0].get("b"), Some(&json!(77)));
//! assert_eq!(updated[1].get("b"), Some(&json!(99)));
//! ```

pub mod convert;
pub mod error;
pub mod gsb;
pub mod index;
pub mod interactive;
pub mod mdjson;
pub mod merge;
pub mod record;
pub mod report;
pub mod reshape;
pub mod store;
pub mod transform;
pub mod update;

pub use convert::{ConvertMode, convert};
pub use error::{DmError, Result};
pub use gsb::{
    Gsb, calc_gsb, calc_gsb_value, gb_accuracy, gsb_accuracy, gsb_matrix, pairwise_gsb,
};
pub use index::JoinIndex;
pub use interactive::{
    Prompter, SessionOptions, SessionSummary, TerminalPrompter, label, pick, render_markdown,
};
pub use mdjson::{extract_last_json_code_block, parse_last_json_code_block, parse_md_json};
pub use merge::{Reducer, SourceKeys, merge_fields};
pub use record::{Record, key_text};
pub use report::{LogSink, Silent, WarningSink};
pub use reshape::{dedupe, drop_columns, keep_columns, parse_key_mapping, rename_keys};
pub use store::{read_json, read_jsonl, write_json, write_jsonl};
pub use transform::{KeyFn, ParamMapping, transform_fields};
pub use update::{ColumnPolicy, UnmatchedPolicy, UpdateOptions, update_ordered, update_unordered};
