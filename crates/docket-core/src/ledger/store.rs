//! `SQLite`-backed ledger storage implementation.
//!
//! The [`LedgerStore`] persists signed manifest entries, per-artifact
//! hash-validation state, and the audit trail. `SQLite` runs in WAL mode
//! for concurrent reads; every logical operation is one short
//! transaction, and no cursor or connection is held open across calls.

// SQLite returns i64 for row IDs and counts, but they're always non-negative.
// Mutex poisoning indicates a panic in another thread, which is unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::missing_panics_doc
)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::DocketConfig;
use crate::crypto::{HashError, Signer, compute_manifest_hash};
use crate::determinism::canonical_json;
use crate::manifest::{SprintManifest, ValidationStatus};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Current schema version recorded in (and signed into) every entry.
pub const SCHEMA_VERSION: &str = "v1";

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest hashing or canonicalization failed.
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// The manifest could not be serialized to a snapshot.
    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// An entry for this `(sprint_id, manifest_hash)` pair already
    /// exists. Recoverable: the plan is already recorded.
    #[error("duplicate ledger entry for sprint {sprint_id} with hash {manifest_hash}")]
    DuplicateEntry {
        /// The sprint that was re-submitted.
        sprint_id: String,
        /// The manifest hash that already exists.
        manifest_hash: String,
    },

    /// No entry exists with the requested id.
    #[error("ledger entry not found: id={id}")]
    EntryNotFound {
        /// The id that was not found.
        id: u64,
    },

    /// No artifact row exists for this sprint and artifact id.
    #[error("artifact not found: sprint={sprint_id} artifact={artifact_id}")]
    ArtifactNotFound {
        /// The sprint the artifact was expected under.
        sprint_id: String,
        /// The artifact id that was not found.
        artifact_id: String,
    },
}

/// Receipt returned on a successful manifest write.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReceipt {
    /// Monotonically increasing entry id.
    pub ledger_id: u64,
    /// The sprint the manifest belongs to.
    pub sprint_id: String,
    /// The 64-hex manifest hash.
    pub manifest_hash: String,
    /// Base64 signature over the entry payload.
    pub signature: String,
    /// Fingerprint of the signing key.
    pub public_key_fingerprint: String,
    /// Entry timestamp, unix-epoch milliseconds.
    pub timestamp_ms: i64,
}

/// Outcome of re-verifying a stored entry. A bad signature is a value,
/// not an error.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    /// Whether the stored signature verifies over the reconstructed
    /// payload.
    pub valid: bool,
    /// The sprint the entry belongs to.
    pub sprint_id: String,
    /// The stored manifest hash.
    pub manifest_hash: String,
    /// The stored entry timestamp.
    pub timestamp_ms: i64,
    /// Failure description when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-artifact line in a sprint validation aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactDetail {
    /// The artifact id.
    pub artifact_id: String,
    /// Classification of this artifact's row.
    pub status: ValidationStatus,
    /// Path recorded for the artifact.
    pub file_path: String,
    /// The expected hash on record.
    pub expected_hash: String,
    /// The actual hash, when one has been recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hash: Option<String>,
}

/// Aggregate validation state for one sprint.
#[derive(Debug, Clone, Serialize)]
pub struct SprintValidation {
    /// The sprint examined.
    pub sprint_id: String,
    /// Total artifact rows.
    pub total: usize,
    /// Rows whose actual hash equals the expected hash.
    pub validated: usize,
    /// Rows whose actual hash differs from the expected hash.
    pub mismatched: usize,
    /// Rows with no actual hash recorded yet.
    pub pending: usize,
    /// Per-artifact breakdown.
    pub details: Vec<ArtifactDetail>,
}

/// Audit-trail operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    /// An entity was created.
    Create,
    /// An entity's tracked state changed.
    Update,
}

impl AuditOperation {
    /// Stable text form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
        }
    }
}

/// One audit-trail record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// CREATE or UPDATE.
    pub operation: String,
    /// Entity kind (`sprint_manifest` or `artifact`).
    pub entity_type: String,
    /// Entity id (`<sprint>` or `<sprint>:<artifact>`).
    pub entity_id: String,
    /// Hash on record before the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    /// Hash on record after the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<String>,
    /// Who performed the operation.
    pub performed_by: String,
    /// When, unix-epoch milliseconds.
    pub performed_at_ms: i64,
}

/// Summary row for entry listings.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    /// Entry id.
    pub id: u64,
    /// Sprint the entry belongs to.
    pub sprint_id: String,
    /// Manifest hash.
    pub manifest_hash: String,
    /// Fingerprint of the key that signed the entry.
    pub signer_fingerprint: String,
    /// Entry timestamp.
    pub created_at_ms: i64,
    /// Operational status (created/validated/hash_mismatch).
    pub status: String,
}

/// Artifact tallies inside a sprint-integrity report.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactTally {
    /// Total artifact rows.
    pub total: u64,
    /// Rows whose actual hash matches.
    pub matched: u64,
    /// Rows whose actual hash differs.
    pub mismatched: u64,
    /// Rows not yet validated.
    pub pending: u64,
}

/// Whole-sprint integrity report.
#[derive(Debug, Clone, Serialize)]
pub struct SprintIntegrity {
    /// False only when the sprint has no ledger entry at all.
    pub valid: bool,
    /// The sprint examined.
    pub sprint_id: String,
    /// Latest manifest hash on record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_hash: Option<String>,
    /// Latest entry status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Artifact tallies.
    pub artifacts: ArtifactTally,
    /// Number of audit records touching this sprint.
    pub audit_entries: u64,
    /// `passed` when no artifact mismatches, else `failed`.
    pub integrity_check: &'static str,
    /// Failure description when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The append-only manifest ledger backed by `SQLite`.
///
/// Entries can only be added, never modified or deleted (the schema
/// enforces this with triggers). Concurrent operations on different
/// sprints are independent; the per-sprint aggregate
/// ([`LedgerStore::validate_sprint_artifacts`]) runs as a single
/// transaction so it never observes a half-updated set of rows.
pub struct LedgerStore {
    conn: Arc<std::sync::Mutex<Connection>>,
    signer: Arc<Signer>,
    #[allow(dead_code)]
    path: Option<PathBuf>,
}

impl LedgerStore {
    /// Opens or creates a ledger at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>, signer: Arc<Signer>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        info!(path = %path.display(), signer = signer.fingerprint(), "opened manifest ledger");

        Ok(Self {
            conn: Arc::new(std::sync::Mutex::new(conn)),
            signer,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory ledger for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory(signer: Arc<Signer>) -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Arc::new(std::sync::Mutex::new(conn)),
            signer,
            path: None,
        })
    }

    /// Opens the ledger described by a [`DocketConfig`], applying its
    /// lock-contention timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn from_config(config: &DocketConfig, signer: Arc<Signer>) -> Result<Self, LedgerError> {
        let store = Self::open(&config.ledger.db_path, signer)?;
        {
            let conn = store.conn.lock().unwrap();
            conn.busy_timeout(Duration::from_millis(u64::from(config.ledger.busy_timeout_ms)))?;
        }
        Ok(store)
    }

    /// Returns the fingerprint of the key this store signs with.
    #[must_use]
    pub fn signer_fingerprint(&self) -> &str {
        self.signer.fingerprint()
    }

    /// Writes a manifest to the ledger.
    ///
    /// Computes the manifest hash, signs the entry payload, and persists
    /// the entry, the per-artifact expectation rows, and one audit record
    /// in a single atomic transaction.
    ///
    /// A manifest whose content changed under the same sprint id hashes
    /// differently and produces a brand-new entry; the old entry is
    /// superseded, never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateEntry`] when this exact
    /// `(sprint_id, manifest_hash)` pair is already recorded — the
    /// idempotency gate for re-submitted, byte-identical plans — or a
    /// database/hash error.
    pub fn write_manifest(
        &self,
        manifest: &SprintManifest,
        created_by: &str,
    ) -> Result<LedgerReceipt, LedgerError> {
        let snapshot = manifest.to_snapshot()?;
        let manifest_hash = compute_manifest_hash(&snapshot)?;
        let timestamp_ms = Utc::now().timestamp_millis();

        let payload = entry_payload(
            &manifest.sprint_id,
            &manifest_hash,
            &snapshot,
            timestamp_ms,
            SCHEMA_VERSION,
        )?;
        let signature = self.signer.sign(payload.as_bytes());
        let snapshot_text = canonical_json(&snapshot).map_err(HashError::from)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO ledger_entries
                 (sprint_id, manifest_hash, manifest_snapshot, signature,
                  signer_fingerprint, schema_version, created_by, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                manifest.sprint_id,
                manifest_hash,
                snapshot_text,
                signature,
                self.signer.fingerprint(),
                SCHEMA_VERSION,
                created_by,
                timestamp_ms,
            ],
        );
        match inserted {
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(LedgerError::DuplicateEntry {
                    sprint_id: manifest.sprint_id.clone(),
                    manifest_hash,
                });
            },
            other => {
                other?;
            },
        }
        let ledger_id = tx.last_insert_rowid() as u64;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO artifact_ledger
                     (sprint_id, artifact_id, expected_hash, expected_kind,
                      status, file_path, created_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (sprint_id, artifact_id) DO UPDATE SET
                     expected_hash = excluded.expected_hash,
                     expected_kind = excluded.expected_kind,
                     status = 'pending',
                     actual_hash = NULL,
                     validated_at_ms = NULL",
            )?;
            for artifact in &manifest.artifacts {
                let (expected_hash, expected_kind) = artifact.resolve_expected()?;
                stmt.execute(params![
                    manifest.sprint_id,
                    artifact.artifact_id,
                    expected_hash,
                    expected_kind,
                    ValidationStatus::Pending.as_str(),
                    artifact.path,
                    timestamp_ms,
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO audit_trail
                 (operation, entity_type, entity_id, new_hash, performed_by, performed_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                AuditOperation::Create.as_str(),
                "sprint_manifest",
                manifest.sprint_id,
                manifest_hash,
                created_by,
                timestamp_ms,
            ],
        )?;

        tx.commit()?;

        info!(
            ledger_id,
            sprint_id = %manifest.sprint_id,
            manifest_hash = %manifest_hash,
            "manifest recorded in ledger"
        );

        Ok(LedgerReceipt {
            ledger_id,
            sprint_id: manifest.sprint_id.clone(),
            manifest_hash,
            signature,
            public_key_fingerprint: self.signer.fingerprint().to_string(),
            timestamp_ms,
        })
    }

    /// Re-verifies a stored entry's signature.
    ///
    /// Reconstructs the exact signed payload from stored columns and
    /// verifies it with the process signer. A failed verification is
    /// reported as `valid: false` — an expected outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EntryNotFound`] if no entry has this id, or
    /// a database error.
    pub fn verify_entry(&self, id: u64) -> Result<VerifyOutcome, LedgerError> {
        let row = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT sprint_id, manifest_hash, manifest_snapshot, signature,
                        created_at_ms, schema_version
                 FROM ledger_entries
                 WHERE id = ?1",
                params![id as i64],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => LedgerError::EntryNotFound { id },
                other => LedgerError::Database(other),
            })?
        };
        let (sprint_id, manifest_hash, snapshot_text, signature, timestamp_ms, schema_version) =
            row;

        let verification = serde_json::from_str::<Value>(&snapshot_text)
            .map_err(|e| format!("stored snapshot unreadable: {e}"))
            .and_then(|snapshot| {
                entry_payload(
                    &sprint_id,
                    &manifest_hash,
                    &snapshot,
                    timestamp_ms,
                    &schema_version,
                )
                .map_err(|e| format!("payload reconstruction failed: {e}"))
            })
            .map(|payload| self.signer.verify(payload.as_bytes(), &signature));

        let (valid, error) = match verification {
            Ok(true) => (true, None),
            Ok(false) => (false, Some("signature verification failed".to_string())),
            Err(message) => (false, Some(message)),
        };

        if !valid {
            error!(
                ledger_id = id,
                sprint_id = %sprint_id,
                error = error.as_deref().unwrap_or(""),
                "ledger entry failed integrity check"
            );
        }

        Ok(VerifyOutcome {
            valid,
            sprint_id,
            manifest_hash,
            timestamp_ms,
            error,
        })
    }

    /// Persists a per-artifact validation outcome and appends an audit
    /// record, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ArtifactNotFound`] if the artifact was
    /// never registered for this sprint, or a database error.
    pub fn update_artifact_hash(
        &self,
        sprint_id: &str,
        artifact_id: &str,
        actual_hash: Option<&str>,
        status: ValidationStatus,
    ) -> Result<(), LedgerError> {
        let timestamp_ms = Utc::now().timestamp_millis();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let previous_hash: Option<String> = tx
            .query_row(
                "SELECT actual_hash FROM artifact_ledger
                 WHERE sprint_id = ?1 AND artifact_id = ?2",
                params![sprint_id, artifact_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => LedgerError::ArtifactNotFound {
                    sprint_id: sprint_id.to_string(),
                    artifact_id: artifact_id.to_string(),
                },
                other => LedgerError::Database(other),
            })?;

        tx.execute(
            "UPDATE artifact_ledger
             SET actual_hash = ?1, status = ?2, validated_at_ms = ?3
             WHERE sprint_id = ?4 AND artifact_id = ?5",
            params![
                actual_hash,
                status.as_str(),
                timestamp_ms,
                sprint_id,
                artifact_id
            ],
        )?;

        tx.execute(
            "INSERT INTO audit_trail
                 (operation, entity_type, entity_id, previous_hash, new_hash,
                  performed_by, performed_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                AuditOperation::Update.as_str(),
                "artifact",
                format!("{sprint_id}:{artifact_id}"),
                previous_hash,
                actual_hash.unwrap_or("error"),
                "system",
                timestamp_ms,
            ],
        )?;

        tx.commit()?;

        debug!(
            sprint_id,
            artifact_id,
            status = status.as_str(),
            "artifact validation recorded"
        );

        Ok(())
    }

    /// Reads and classifies every artifact row for a sprint, flipping the
    /// parent entries' status accordingly.
    ///
    /// Runs as a single transaction so the aggregate never observes a
    /// half-updated set of rows. The resulting entry status
    /// (`validated` iff no mismatches, else `hash_mismatch`) is the
    /// authoritative gate downstream remediation polls.
    ///
    /// # Errors
    ///
    /// Returns a database error if the transaction fails.
    pub fn validate_sprint_artifacts(
        &self,
        sprint_id: &str,
    ) -> Result<SprintValidation, LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let rows: Vec<(String, String, Option<String>, String)> = {
            let mut stmt = tx.prepare(
                "SELECT artifact_id, expected_hash, actual_hash, file_path
                 FROM artifact_ledger
                 WHERE sprint_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map(params![sprint_id], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut validated = 0;
        let mut mismatched = 0;
        let mut pending = 0;
        let mut details = Vec::with_capacity(rows.len());

        for (artifact_id, expected_hash, actual_hash, file_path) in rows {
            let status = match &actual_hash {
                None => {
                    pending += 1;
                    ValidationStatus::Pending
                },
                Some(actual) if *actual == expected_hash => {
                    validated += 1;
                    ValidationStatus::Validated
                },
                Some(_) => {
                    mismatched += 1;
                    ValidationStatus::Mismatch
                },
            };
            details.push(ArtifactDetail {
                artifact_id,
                status,
                file_path,
                expected_hash,
                actual_hash,
            });
        }

        let entry_status = if mismatched == 0 {
            "validated"
        } else {
            "hash_mismatch"
        };
        tx.execute(
            "UPDATE ledger_entries SET status = ?1 WHERE sprint_id = ?2",
            params![entry_status, sprint_id],
        )?;

        tx.commit()?;

        Ok(SprintValidation {
            sprint_id: sprint_id.to_string(),
            total: details.len(),
            validated,
            mismatched,
            pending,
            details,
        })
    }

    /// Returns the audit records touching a sprint (manifest records and
    /// `sprint:artifact`-scoped artifact records), oldest first.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn audit_trail(&self, sprint_id: &str) -> Result<Vec<AuditRecord>, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT operation, entity_type, entity_id, previous_hash, new_hash,
                    performed_by, performed_at_ms
             FROM audit_trail
             WHERE entity_id = ?1 OR entity_id LIKE ?2
             ORDER BY performed_at_ms ASC, id ASC",
        )?;

        let records = stmt
            .query_map(params![sprint_id, format!("{sprint_id}:%")], |row| {
                Ok(AuditRecord {
                    operation: row.get(0)?,
                    entity_type: row.get(1)?,
                    entity_id: row.get(2)?,
                    previous_hash: row.get(3)?,
                    new_hash: row.get(4)?,
                    performed_by: row.get(5)?,
                    performed_at_ms: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Builds a whole-sprint integrity report: latest entry, artifact
    /// tallies, and audit coverage.
    ///
    /// An unknown sprint yields `valid: false` with an error message — a
    /// value, not an `Err`.
    ///
    /// # Errors
    ///
    /// Returns a database error if a query fails.
    pub fn verify_sprint_integrity(&self, sprint_id: &str) -> Result<SprintIntegrity, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let latest: Option<(String, String)> = conn
            .query_row(
                "SELECT manifest_hash, status FROM ledger_entries
                 WHERE sprint_id = ?1
                 ORDER BY id DESC
                 LIMIT 1",
                params![sprint_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((manifest_hash, status)) = latest else {
            return Ok(SprintIntegrity {
                valid: false,
                sprint_id: sprint_id.to_string(),
                manifest_hash: None,
                status: None,
                artifacts: ArtifactTally {
                    total: 0,
                    matched: 0,
                    mismatched: 0,
                    pending: 0,
                },
                audit_entries: 0,
                integrity_check: "failed",
                error: Some("sprint not found".to_string()),
            });
        };

        let (total, matched, mismatched, pending): (i64, i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COUNT(CASE WHEN actual_hash = expected_hash THEN 1 END),
                    COUNT(CASE WHEN actual_hash IS NOT NULL
                               AND actual_hash != expected_hash THEN 1 END),
                    COUNT(CASE WHEN actual_hash IS NULL THEN 1 END)
             FROM artifact_ledger
             WHERE sprint_id = ?1",
            params![sprint_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let audit_entries: i64 = conn.query_row(
            "SELECT COUNT(*) FROM audit_trail
             WHERE entity_id = ?1 OR entity_id LIKE ?2",
            params![sprint_id, format!("{sprint_id}:%")],
            |row| row.get(0),
        )?;

        Ok(SprintIntegrity {
            valid: true,
            sprint_id: sprint_id.to_string(),
            manifest_hash: Some(manifest_hash),
            status: Some(status),
            artifacts: ArtifactTally {
                total: total as u64,
                matched: matched as u64,
                mismatched: mismatched as u64,
                pending: pending as u64,
            },
            audit_entries: audit_entries as u64,
            integrity_check: if mismatched == 0 { "passed" } else { "failed" },
            error: None,
        })
    }

    /// Lists entries, newest first, optionally filtered by sprint.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn list_entries(
        &self,
        sprint_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<EntrySummary>, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(EntrySummary {
                id: row.get::<_, i64>(0)? as u64,
                sprint_id: row.get(1)?,
                manifest_hash: row.get(2)?,
                signer_fingerprint: row.get(3)?,
                created_at_ms: row.get(4)?,
                status: row.get(5)?,
            })
        };

        let entries = if let Some(sprint) = sprint_id {
            let mut stmt = conn.prepare(
                "SELECT id, sprint_id, manifest_hash, signer_fingerprint, created_at_ms, status
                 FROM ledger_entries
                 WHERE sprint_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![sprint, limit, offset], map_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(
                "SELECT id, sprint_id, manifest_hash, signer_fingerprint, created_at_ms, status
                 FROM ledger_entries
                 ORDER BY id DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![limit, offset], map_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Ok(entries)
    }
}

/// Builds the canonical payload that gets signed into (and re-verified
/// from) a ledger entry.
///
/// Every field comes from stored columns, so reconstruction is bit-exact.
fn entry_payload(
    sprint_id: &str,
    manifest_hash: &str,
    snapshot: &Value,
    timestamp_ms: i64,
    schema_version: &str,
) -> Result<String, HashError> {
    let payload = json!({
        "manifest_hash": manifest_hash,
        "manifest_snapshot": snapshot,
        "sprint_id": sprint_id,
        "timestamp_ms": timestamp_ms,
        "version": schema_version,
    });
    Ok(canonical_json(&payload)?)
}
