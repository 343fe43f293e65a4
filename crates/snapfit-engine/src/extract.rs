use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no JSON object found in reply")]
    NotFound,
    #[error("{0}")]
    InvalidJson(String),
}

/// Recovers the JSON object a model embedded in free-form text.
///
/// Candidates are balanced `{...}` spans, scanned left to right with braces
/// inside string literals ignored. The first candidate that parses as JSON
/// wins; a candidate that fails to parse is skipped as a whole.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, ExtractError> {
    let mut first_error = None;
    let mut offset = 0;
    while let Some(relative) = text[offset..].find('{') {
        let start = offset + relative;
        let Some(end) = balanced_end(text, start) else {
            offset = start + 1;
            continue;
        };
        match serde_json::from_str::<Value>(&text[start..=end]) {
            Ok(Value::Object(object)) => return Ok(object),
            Ok(_) => {}
            Err(err) => {
                first_error.get_or_insert_with(|| err.to_string());
            }
        }
        offset = end + 1;
    }
    Err(first_error.map_or(ExtractError::NotFound, ExtractError::InvalidJson))
}

/// Byte index of the `}` closing the object opened at `start`.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, byte) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
