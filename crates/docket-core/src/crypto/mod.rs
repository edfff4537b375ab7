//! Cryptographic primitives for the manifest ledger.
//!
//! This module provides the two identities the ledger depends on:
//!
//! - **SHA-256 hashing**: deterministic identity for manifests (via
//!   canonical serialization) and artifact content (bytes or streamed
//!   files)
//! - **ECDSA P-256 signatures**: authenticity for ledger entries, with a
//!   short public-key fingerprint for correlating signatures to a signer
//!   in logs and exports
//!
//! # Key lifecycle
//!
//! A [`Signer`] holds exactly one keypair for the process lifetime. Key
//! material comes from explicit PEM configuration (production) or an
//! on-disk development keypair gated behind an explicit flag; see
//! [`load_signing_key`]. Rotation means a new process, never in-place
//! mutation.
//!
//! # Example
//!
//! ```rust
//! use docket_core::crypto::{Signer, compute_content_hash};
//!
//! let signer = Signer::generate();
//! let payload = b"manifest payload";
//!
//! let signature = signer.sign(payload);
//! assert!(signer.verify(payload, &signature));
//! assert!(!signer.verify(b"tampered", &signature));
//!
//! assert_eq!(compute_content_hash(b"x=1").len(), 64);
//! ```

mod hash;
mod keys;
mod sign;

pub use hash::{
    HashError, IntegrityReport, MANIFEST_META_KEYS, compute_content_hash, compute_file_hash,
    compute_manifest_hash, check_manifest_integrity, stamp_manifest_hash,
};
pub use keys::{KeyError, generate_dev_keypair, load_signing_key};
pub use sign::{FINGERPRINT_LEN, Signer};
