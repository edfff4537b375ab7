//! SHA-256 hashing for manifests, artifact content, and files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::determinism::{CanonicalJsonError, canonical_json};

/// Top-level keys excluded from manifest hashing.
///
/// These carry hash bookkeeping, not manifest content; including them
/// would make the hash depend on itself.
pub const MANIFEST_META_KEYS: [&str; 3] = ["expected_sha256", "version", "hash_algorithm"];

/// Chunk size for streamed file hashing.
const FILE_CHUNK_SIZE: usize = 4096;

/// Errors that can occur while computing a manifest hash.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HashError {
    /// Canonical serialization failed.
    #[error("canonical serialization failed: {0}")]
    Canonical(#[from] CanonicalJsonError),

    /// The value could not be converted to plain JSON primitives.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A manifest-level operation was applied to a non-object value.
    #[error("expected a JSON object, got {kind}")]
    NotAnObject {
        /// The JSON kind that was encountered instead.
        kind: &'static str,
    },
}

/// Outcome of re-checking a stamped manifest hash. A mismatch is an
/// expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Whether the recomputed hash matches the expected one.
    pub valid: bool,
    /// The hash the manifest claimed.
    pub expected_sha256: String,
    /// The hash recomputed from content.
    pub actual_sha256: String,
}

/// Computes the deterministic SHA-256 hash of manifest data.
///
/// Top-level [`MANIFEST_META_KEYS`] are stripped before hashing; the
/// remainder is canonically serialized (sorted keys, no whitespace, fixed
/// numeric formatting, UTF-8) and hashed. Values must already be plain
/// JSON primitives; callers normalize domain types via serde first.
///
/// Permuting input key order never changes the output.
///
/// # Errors
///
/// Returns an error if canonical serialization fails (nesting deeper than
/// the determinism depth limit).
pub fn compute_manifest_hash(data: &Value) -> Result<String, HashError> {
    let canonical = match data {
        Value::Object(map) => {
            let stripped: serde_json::Map<String, Value> = map
                .iter()
                .filter(|(k, _)| !MANIFEST_META_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            canonical_json(&Value::Object(stripped))?
        },
        other => canonical_json(other)?,
    };

    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

/// Computes the SHA-256 hash of in-memory content as lowercase hex.
#[must_use]
pub fn compute_content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Computes the SHA-256 hash of a file by streaming fixed-size chunks.
///
/// Memory use is bounded regardless of file size.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_file_hash(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; FILE_CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Stamps manifest data with its own hash and hash metadata.
///
/// Any pre-existing `expected_sha256` is discarded before hashing, so
/// stamping is idempotent: re-stamping stamped data yields the same hash.
///
/// # Errors
///
/// Returns [`HashError::NotAnObject`] if `data` is not a JSON object, or
/// a canonicalization error.
pub fn stamp_manifest_hash(data: Value) -> Result<Value, HashError> {
    let Value::Object(mut map) = data else {
        return Err(HashError::NotAnObject {
            kind: json_kind(&data),
        });
    };
    map.remove("expected_sha256");

    let hash = compute_manifest_hash(&Value::Object(map.clone()))?;
    map.insert("expected_sha256".to_string(), Value::String(hash));
    map.insert("version".to_string(), Value::String("v1".to_string()));
    map.insert(
        "hash_algorithm".to_string(),
        Value::String("SHA-256".to_string()),
    );

    Ok(Value::Object(map))
}

/// Recomputes a manifest hash and compares it to an expected value.
///
/// # Errors
///
/// Returns an error only if the hash cannot be computed; a mismatch is
/// reported in the returned [`IntegrityReport`].
pub fn check_manifest_integrity(
    expected_sha256: &str,
    data: &Value,
) -> Result<IntegrityReport, HashError> {
    let actual_sha256 = compute_manifest_hash(data)?;
    Ok(IntegrityReport {
        valid: expected_sha256 == actual_sha256,
        expected_sha256: expected_sha256.to_string(),
        actual_sha256,
    })
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_manifest_hash_is_64_hex() {
        let hash = compute_manifest_hash(&json!({"sprint_id": "s1"})).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn test_manifest_hash_key_order_independent() {
        let a = json!({"sprint_id": "s1", "purpose": "p", "artifacts": [1, 2]});
        let b = json!({"artifacts": [1, 2], "purpose": "p", "sprint_id": "s1"});
        assert_eq!(
            compute_manifest_hash(&a).unwrap(),
            compute_manifest_hash(&b).unwrap()
        );
    }

    #[test]
    fn test_manifest_hash_ignores_meta_keys() {
        let bare = json!({"sprint_id": "s1"});
        let stamped = json!({
            "sprint_id": "s1",
            "expected_sha256": "deadbeef",
            "version": "v1",
            "hash_algorithm": "SHA-256",
        });
        assert_eq!(
            compute_manifest_hash(&bare).unwrap(),
            compute_manifest_hash(&stamped).unwrap()
        );
    }

    #[test]
    fn test_meta_keys_stripped_top_level_only() {
        let a = json!({"sprint_id": "s1", "nested": {"version": "x"}});
        let b = json!({"sprint_id": "s1", "nested": {"version": "y"}});
        assert_ne!(
            compute_manifest_hash(&a).unwrap(),
            compute_manifest_hash(&b).unwrap()
        );
    }

    #[test]
    fn test_single_field_perturbation_changes_hash() {
        let base = json!({"sprint_id": "s1", "purpose": "p", "risk": 0.25});
        let variants = [
            json!({"sprint_id": "s2", "purpose": "p", "risk": 0.25}),
            json!({"sprint_id": "s1", "purpose": "q", "risk": 0.25}),
            json!({"sprint_id": "s1", "purpose": "p", "risk": 0.75}),
        ];
        let base_hash = compute_manifest_hash(&base).unwrap();
        for variant in &variants {
            assert_ne!(base_hash, compute_manifest_hash(variant).unwrap());
        }
    }

    #[test]
    fn test_content_hash_known_vector() {
        // sha256("x=1")
        assert_eq!(
            compute_content_hash(b"x=1"),
            "1f206b11c23e28cc250ded7fc0098d3823a8467a54340f1ac4e535cb8544493f"
        );
    }

    #[test]
    fn test_file_hash_matches_content_hash() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("artifact.txt");
        std::fs::write(&path, b"x=1").unwrap();

        assert_eq!(
            compute_file_hash(&path).unwrap(),
            compute_content_hash(b"x=1")
        );
    }

    #[test]
    fn test_file_hash_large_file_streams() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        // Larger than one chunk, not chunk-aligned
        let content = vec![0xabu8; FILE_CHUNK_SIZE * 3 + 17];
        std::fs::write(&path, &content).unwrap();

        assert_eq!(
            compute_file_hash(&path).unwrap(),
            compute_content_hash(&content)
        );
    }

    #[test]
    fn test_file_hash_missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(compute_file_hash(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_stamp_is_idempotent() {
        let data = json!({"sprint_id": "s1", "purpose": "p"});
        let stamped = stamp_manifest_hash(data).unwrap();
        let restamped = stamp_manifest_hash(stamped.clone()).unwrap();
        assert_eq!(stamped["expected_sha256"], restamped["expected_sha256"]);
        assert_eq!(stamped["hash_algorithm"], json!("SHA-256"));
    }

    #[test]
    fn test_stamp_rejects_non_object() {
        assert!(matches!(
            stamp_manifest_hash(json!([1, 2])),
            Err(HashError::NotAnObject { kind: "array" })
        ));
    }

    #[test]
    fn test_check_integrity() {
        let data = json!({"sprint_id": "s1"});
        let stamped = stamp_manifest_hash(data.clone()).unwrap();
        let expected = stamped["expected_sha256"].as_str().unwrap();

        let report = check_manifest_integrity(expected, &data).unwrap();
        assert!(report.valid);

        let report = check_manifest_integrity(expected, &json!({"sprint_id": "s2"})).unwrap();
        assert!(!report.valid);
        assert_ne!(report.expected_sha256, report.actual_sha256);
    }
}
