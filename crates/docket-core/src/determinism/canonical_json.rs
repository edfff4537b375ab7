//! Canonical JSON serialization for deterministic hashing.
//!
//! The encoding follows RFC 8785 (JCS) conventions:
//!
//! 1. Object keys are sorted in lexicographic (byte-order) order
//! 2. No whitespace between tokens
//! 3. Strings use minimal escaping (only required escapes)
//! 4. Integers are emitted in plain decimal; non-integer numbers in
//!    serde_json's shortest round-trip form, which is fixed and
//!    locale-independent
//!
//! Arrays preserve their order. NaN and infinity cannot occur because
//! [`serde_json::Value`] cannot represent them.
//!
//! # Example
//!
//! ```
//! use docket_core::determinism::canonical_json;
//!
//! let value: serde_json::Value = serde_json::from_str(r#"{"z": 1, "a": 2}"#).unwrap();
//! assert_eq!(canonical_json(&value).unwrap(), r#"{"a":2,"z":1}"#);
//! ```

use std::fmt::Write as _;

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Maximum nesting depth to guard against stack overflow on adversarial
/// input.
pub const MAX_DEPTH: usize = 128;

/// Errors that can occur during canonical serialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CanonicalJsonError {
    /// The maximum nesting depth was exceeded.
    #[error("max depth exceeded: value nested deeper than {max_depth} levels")]
    MaxDepthExceeded {
        /// The depth limit that was exceeded.
        max_depth: usize,
    },
}

/// Serializes a JSON value to its canonical form.
///
/// Permuting object key order never changes the output; re-running on the
/// same logical content in a different process or locale never changes the
/// output.
///
/// # Errors
///
/// Returns [`CanonicalJsonError::MaxDepthExceeded`] if the value nests
/// deeper than [`MAX_DEPTH`] levels.
pub fn canonical_json(value: &Value) -> Result<String, CanonicalJsonError> {
    let mut output = String::new();
    emit_value(value, &mut output, 0)?;
    Ok(output)
}

/// Checks whether a JSON string is already in canonical form.
#[must_use]
pub fn is_canonical(input: &str) -> bool {
    serde_json::from_str::<Value>(input)
        .ok()
        .and_then(|v| canonical_json(&v).ok())
        .is_some_and(|canonical| canonical == input)
}

fn emit_value(value: &Value, output: &mut String, depth: usize) -> Result<(), CanonicalJsonError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalJsonError::MaxDepthExceeded {
            max_depth: MAX_DEPTH,
        });
    }

    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => emit_number(n, output),
        Value::String(s) => emit_string(s, output),
        Value::Array(arr) => emit_array(arr, output, depth)?,
        Value::Object(obj) => emit_object(obj, output, depth)?,
    }
    Ok(())
}

/// Emits a number in canonical form.
///
/// Integers are plain decimal. Anything else falls through to
/// [`Number`]'s display impl (ryu shortest round-trip), which depends only
/// on the value, never on the environment.
fn emit_number(n: &Number, output: &mut String) {
    if let Some(i) = n.as_i64() {
        let _ = write!(output, "{i}");
    } else if let Some(u) = n.as_u64() {
        let _ = write!(output, "{u}");
    } else {
        let _ = write!(output, "{n}");
    }
}

/// Emits a string with minimal escaping per RFC 8785 Section 3.2.2.2.
///
/// Only the quotation mark, reverse solidus, and control characters
/// U+0000..=U+001F are escaped; control characters use the short escapes
/// where defined and `\uXXXX` otherwise.
fn emit_string(s: &str, output: &mut String) {
    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\u{0008}' => output.push_str("\\b"),
            '\u{000C}' => output.push_str("\\f"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if ('\u{0000}'..='\u{001F}').contains(&c) => {
                let _ = write!(output, "\\u{:04x}", c as u32);
            },
            c => output.push(c),
        }
    }
    output.push('"');
}

fn emit_array(arr: &[Value], output: &mut String, depth: usize) -> Result<(), CanonicalJsonError> {
    output.push('[');
    for (i, item) in arr.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_value(item, output, depth + 1)?;
    }
    output.push(']');
    Ok(())
}

fn emit_object(
    obj: &Map<String, Value>,
    output: &mut String,
    depth: usize,
) -> Result<(), CanonicalJsonError> {
    let mut sorted_keys: Vec<&String> = obj.keys().collect();
    sorted_keys.sort();

    output.push('{');
    for (i, key) in sorted_keys.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_string(key, output);
        output.push(':');
        emit_value(&obj[*key], output, depth + 1)?;
    }
    output.push('}');
    Ok(())
}
