//! Core library for the Docket manifest ledger.
//!
//! Docket records what a planning pipeline *intended* to build (a signed
//! manifest of artifacts and their dependencies) and what was *actually*
//! produced (content hashes), so that drift, tampering, and
//! non-determinism are detectable across repeated runs.
//!
//! # Architecture
//!
//! - [`determinism`]: canonical JSON serialization — the byte source for
//!   every hash in the system
//! - [`crypto`]: SHA-256 content/manifest hashing and the per-process
//!   ECDSA P-256 signer
//! - [`manifest`]: the artifact/dependency data model plus graph
//!   algorithms (cycle detection, execution ordering, risk aggregation)
//! - [`ledger`]: append-only `SQLite` storage for signed manifest entries,
//!   per-artifact hash tracking, and the audit trail
//! - [`validate`]: compares produced artifact content against expected
//!   hashes and records outcomes through the ledger
//! - [`config`]: TOML/env configuration, including signing-key sourcing
//!
//! # Error discipline
//!
//! Infrastructure failures (storage, I/O) propagate as `Err` values to the
//! immediate caller. Domain-level outcomes — hash mismatch, bad signature,
//! duplicate write — are ordinary typed values so callers branch on them
//! without exception handling.
//!
//! # Example
//!
//! ```rust,no_run
//! use docket_core::crypto::Signer;
//! use docket_core::ledger::LedgerStore;
//! use docket_core::manifest::SprintManifest;
//! use std::sync::Arc;
//!
//! # fn example(manifest: SprintManifest) -> Result<(), Box<dyn std::error::Error>> {
//! let signer = Arc::new(Signer::generate());
//! let ledger = LedgerStore::open("/var/lib/docket/ledger.db", signer)?;
//!
//! let receipt = ledger.write_manifest(&manifest, "planner")?;
//! let outcome = ledger.verify_entry(receipt.ledger_id)?;
//! assert!(outcome.valid);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod determinism;
pub mod ledger;
pub mod manifest;
pub mod validate;

pub use config::{ConfigError, DocketConfig, LedgerConfig, SigningConfig};
pub use crypto::{KeyError, Signer};
pub use ledger::{LedgerError, LedgerReceipt, LedgerStore, SprintValidation, VerifyOutcome};
pub use manifest::{Artifact, ManifestError, SprintManifest, ValidationStatus};
pub use validate::{ArtifactValidation, IntegrityValidator};
