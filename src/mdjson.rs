//! JSON payloads wrapped in Markdown code fences.
//!
//! Model outputs often carry their answer as a fenced block:
//!
//! ````text
//! Some prose.
//! ```json
//! {"verdict": "G"}
//! ```
//! ````

use regex::Regex;
use serde_json::Value;

use crate::error::{DmError, Result};

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Parse text that is exactly one ```` ```json ```` fenced block.
///
/// The text must start with ```` ```json ```` and end with ```` ``` ````,
/// with nothing around them.
pub fn parse_md_json(text: &str) -> Result<Value> {
    let body = text
        .strip_prefix(FENCE_OPEN)
        .and_then(|rest| rest.strip_suffix(FENCE_CLOSE))
        .ok_or_else(|| {
            DmError::InvalidArgument(
                "text is not wrapped in a ```json ... ``` fence".to_string(),
            )
        })?;

    serde_json::from_str(body.trim()).map_err(|e| DmError::MalformedRecord {
        line: e.line(),
        message: format!("invalid JSON in fenced block: {e}"),
    })
}

/// Find the last ```` ```json ```` block in `text`, fences included.
pub fn extract_last_json_code_block(text: &str) -> Result<Option<String>> {
    let pattern = Regex::new(r"(?s)```json(.*?)```")
        .map_err(|e| DmError::InvalidArgument(e.to_string()))?;
    Ok(pattern
        .captures_iter(text)
        .last()
        .map(|caps| format!("{FENCE_OPEN}{}{FENCE_CLOSE}", &caps[1])))
}

/// Extract the last fenced block of `text` and parse it.
pub fn parse_last_json_code_block(text: &str) -> Result<Value> {
    let block = extract_last_json_code_block(text)?
        .ok_or_else(|| DmError::InvalidArgument("no ```json block found".to_string()))?;
    parse_md_json(&block)
}
