//! Decoding of structured (JSON) model replies.
//!
//! Every structured request in the crate goes through [`decode_or`]: a reply
//! that does not decode into the expected schema is replaced by a fixed
//! fallback value and never reaches the caller as an error.

use serde::de::DeserializeOwned;

/// Decode `raw` as `T`, tolerating a surrounding Markdown code fence.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}

/// Decode `raw` as `T`, or log and return `fallback()`.
pub fn decode_or<T, F>(raw: &str, what: &str, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match decode(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("failed to parse {}, using fallback: {}", what, e);
            fallback()
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
