//! Manifest data model and dependency-graph algorithms.
//!
//! A [`SprintManifest`] is the declarative plan for one unit of work: an
//! ordered list of [`Artifact`]s plus the dependency graph between them.
//! Manifests are immutable once created — any change produces a logically
//! new manifest with a different hash, never an in-place edit. The only
//! fields that evolve after creation are an artifact's validation status
//! and actual hash, written exclusively by the integrity validator.

mod graph;
mod model;

pub use graph::ManifestReport;
pub use model::{
    Artifact, ArtifactKind, HashExpectation, RiskAssessment, RiskLevel, SprintManifest,
    ValidationStatus,
};

use thiserror::Error;

/// Errors produced by manifest validation and graph algorithms.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ManifestError {
    /// The dependency graph contains a cycle; no execution order exists.
    #[error("cyclic dependency detected: no execution order exists")]
    CyclicDependency,

    /// Two artifacts share an id.
    #[error("duplicate artifact id: {id}")]
    DuplicateArtifactId {
        /// The duplicated artifact id.
        id: String,
    },

    /// An artifact path escapes the working directory.
    #[error("artifact {artifact_id} has unsafe path: {path}")]
    UnsafePath {
        /// The offending artifact.
        artifact_id: String,
        /// The offending path.
        path: String,
    },

    /// The dependency graph references an undeclared artifact.
    #[error("dependency graph references unknown artifact: {id}")]
    UnknownArtifact {
        /// The unknown artifact id.
        id: String,
    },
}
