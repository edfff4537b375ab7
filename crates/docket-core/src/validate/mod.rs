//! Artifact integrity validation.
//!
//! The validator compares what was actually produced against what was
//! planned. Every outcome — match, mismatch, missing file, I/O failure —
//! is returned as ordinary data: callers branch on
//! [`ArtifactValidation::validation_passed`], and nothing raises past
//! this boundary.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::crypto::{compute_content_hash, compute_file_hash};
use crate::ledger::{LedgerError, LedgerStore, SprintValidation};
use crate::manifest::{Artifact, SprintManifest, ValidationStatus};

/// Result of validating one artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactValidation {
    /// The artifact examined.
    pub artifact_id: String,
    /// The expected hash, when resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sha256: Option<String>,
    /// Whether the expectation was a content hash or a plan fingerprint.
    pub expected_kind: &'static str,
    /// Hash of the content actually found, when computable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_sha256: Option<String>,
    /// Whether the actual hash matched the expected hash.
    pub validation_passed: bool,
    /// Failure description for I/O or computation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtifactValidation {
    /// The ledger status this outcome maps to.
    #[must_use]
    pub fn status(&self) -> ValidationStatus {
        if self.error.is_some() {
            ValidationStatus::Error
        } else if self.validation_passed {
            ValidationStatus::Validated
        } else {
            ValidationStatus::Mismatch
        }
    }
}

/// Validates produced artifact content against expected hashes and
/// records outcomes through the ledger.
pub struct IntegrityValidator {
    workdir: PathBuf,
    ledger: Arc<LedgerStore>,
}

impl IntegrityValidator {
    /// Creates a validator resolving artifact paths under `workdir`.
    #[must_use]
    pub fn new(workdir: impl Into<PathBuf>, ledger: Arc<LedgerStore>) -> Self {
        Self {
            workdir: workdir.into(),
            ledger,
        }
    }

    /// Validates one artifact.
    ///
    /// The actual hash comes from `content` when supplied, otherwise
    /// from streaming the file at the artifact's path under the working
    /// directory. The expected hash is the artifact's assigned
    /// expectation, falling back to its plan fingerprint so every
    /// artifact is verifiable from the moment it is planned.
    ///
    /// Never returns an error: I/O and computation failures are captured
    /// in the result with status `error`.
    #[must_use]
    pub fn validate_artifact(
        &self,
        artifact: &Artifact,
        manifest: &SprintManifest,
        content: Option<&[u8]>,
    ) -> ArtifactValidation {
        let (expected_sha256, expected_kind) = match artifact.resolve_expected() {
            Ok((hash, kind)) => (Some(hash), kind),
            Err(e) => {
                return ArtifactValidation {
                    artifact_id: artifact.artifact_id.clone(),
                    expected_sha256: None,
                    expected_kind: "plan",
                    actual_sha256: None,
                    validation_passed: false,
                    error: Some(format!("expected hash unresolvable: {e}")),
                };
            },
        };

        let actual = match content {
            Some(bytes) => Ok(compute_content_hash(bytes)),
            None => {
                let path = self.workdir.join(&artifact.path);
                compute_file_hash(&path).map_err(|e| format!("{}: {e}", path.display()))
            },
        };

        match actual {
            Ok(actual_sha256) => {
                let validation_passed = Some(&actual_sha256) == expected_sha256.as_ref();
                if validation_passed {
                    debug!(
                        sprint_id = %manifest.sprint_id,
                        artifact_id = %artifact.artifact_id,
                        "artifact content matches expected hash"
                    );
                } else {
                    warn!(
                        sprint_id = %manifest.sprint_id,
                        artifact_id = %artifact.artifact_id,
                        expected = expected_sha256.as_deref().unwrap_or(""),
                        actual = %actual_sha256,
                        kind = expected_kind,
                        "artifact content hash mismatch"
                    );
                }
                ArtifactValidation {
                    artifact_id: artifact.artifact_id.clone(),
                    expected_sha256,
                    expected_kind,
                    actual_sha256: Some(actual_sha256),
                    validation_passed,
                    error: None,
                }
            },
            Err(message) => {
                warn!(
                    sprint_id = %manifest.sprint_id,
                    artifact_id = %artifact.artifact_id,
                    error = %message,
                    "artifact validation failed to read content"
                );
                ArtifactValidation {
                    artifact_id: artifact.artifact_id.clone(),
                    expected_sha256,
                    expected_kind,
                    actual_sha256: None,
                    validation_passed: false,
                    error: Some(message),
                }
            },
        }
    }

    /// Validates one artifact and persists the outcome (actual hash and
    /// status) through the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error only for ledger infrastructure failures; the
    /// validation outcome itself is always in the returned value.
    pub fn validate_and_record(
        &self,
        artifact: &Artifact,
        manifest: &SprintManifest,
        content: Option<&[u8]>,
    ) -> Result<ArtifactValidation, LedgerError> {
        let outcome = self.validate_artifact(artifact, manifest, content);
        self.ledger.update_artifact_hash(
            &manifest.sprint_id,
            &artifact.artifact_id,
            outcome.actual_sha256.as_deref(),
            outcome.status(),
        )?;
        Ok(outcome)
    }

    /// Validates every artifact in a manifest from the working
    /// directory, then computes the sprint aggregate and flips the
    /// parent entry status.
    ///
    /// # Errors
    ///
    /// Returns an error only for ledger infrastructure failures.
    pub fn validate_sprint(
        &self,
        manifest: &SprintManifest,
    ) -> Result<SprintValidation, LedgerError> {
        for artifact in &manifest.artifacts {
            self.validate_and_record(artifact, manifest, None)?;
        }
        self.ledger.validate_sprint_artifacts(&manifest.sprint_id)
    }
}
