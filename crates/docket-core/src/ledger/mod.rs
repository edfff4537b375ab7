//! Append-only ledger for signed manifests.
//!
//! The ledger is the system's source of truth for "what was planned":
//! each accepted manifest version becomes one immutable, signed entry,
//! keyed by `(sprint_id, manifest_hash)`. Per-artifact rows track what
//! was actually produced, and an audit trail records every state-changing
//! operation.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docket_core::crypto::Signer;
//! use docket_core::ledger::{LedgerError, LedgerStore};
//! # use docket_core::manifest::SprintManifest;
//!
//! # fn example(manifest: SprintManifest) -> Result<(), LedgerError> {
//! let store = LedgerStore::open("/var/lib/docket/ledger.db", Arc::new(Signer::generate()))?;
//!
//! let receipt = store.write_manifest(&manifest, "planner")?;
//!
//! // Re-submitting the identical plan is rejected, not double-counted.
//! match store.write_manifest(&manifest, "planner") {
//!     Err(LedgerError::DuplicateEntry { .. }) => {},
//!     other => panic!("expected duplicate gate, got {other:?}"),
//! }
//!
//! assert!(store.verify_entry(receipt.ledger_id)?.valid);
//! # Ok(())
//! # }
//! ```

mod store;


pub use store::{
    ArtifactDetail, ArtifactTally, AuditOperation, AuditRecord, EntrySummary, LedgerError,
    LedgerReceipt, LedgerStore, SCHEMA_VERSION, SprintIntegrity, SprintValidation, VerifyOutcome,
};
