//! Manifest and artifact types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::crypto::{HashError, compute_manifest_hash};

/// Kind of work product an artifact represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Production code.
    Code,
    /// Test code.
    Test,
    /// Documentation.
    Documentation,
    /// Configuration files.
    Configuration,
    /// Database or schema migration.
    Migration,
    /// Operational script.
    Script,
    /// Deployment descriptor.
    Deployment,
}

/// Qualitative risk banding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Routine change.
    Low,
    /// Needs review attention.
    Medium,
    /// Needs careful review.
    High,
    /// Change to a critical path.
    Critical,
}

/// Risk assessment for an artifact or a whole sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Qualitative band.
    pub level: RiskLevel,
    /// Numeric score in `0.0..=1.0`.
    pub score: f64,
    /// Contributing factors.
    #[serde(default)]
    pub factors: Vec<String>,
    /// Planned mitigation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation_plan: Option<String>,
}

impl RiskAssessment {
    /// Convenience constructor for a factor-less assessment.
    #[must_use]
    pub const fn new(level: RiskLevel, score: f64) -> Self {
        Self {
            level,
            score,
            factors: Vec::new(),
            mitigation_plan: None,
        }
    }
}

/// Validation state of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// No content has been validated yet.
    #[default]
    Pending,
    /// Actual content hash matched the expected hash.
    Validated,
    /// Actual content hash differed from the expected hash.
    Mismatch,
    /// Validation could not complete (I/O or computation failure).
    Error,
}

impl ValidationStatus {
    /// Stable text form used in storage and exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Mismatch => "mismatch",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "validated" => Ok(Self::Validated),
            "mismatch" => Ok(Self::Mismatch),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown validation status: {other}")),
        }
    }
}

/// The expected hash of an artifact, as a versioned two-state value.
///
/// Until real content exists, an artifact's identity is a *plan
/// fingerprint* — a hash over its immutable planning fields. Once content
/// is produced, a *content* hash supersedes it. Keeping the two states
/// explicit avoids false mismatches between plan-time and content-time
/// hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "sha256", rename_all = "snake_case")]
pub enum HashExpectation {
    /// Hash of real artifact content.
    Content(String),
    /// Placeholder fingerprint derived from planning fields.
    Plan(String),
}

impl HashExpectation {
    /// The 64-hex-character SHA-256 value.
    #[must_use]
    pub fn sha256(&self) -> &str {
        match self {
            Self::Content(h) | Self::Plan(h) => h,
        }
    }

    /// Stable text form of the expectation kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Content(_) => "content",
            Self::Plan(_) => "plan",
        }
    }
}

/// One planned work product.
///
/// Owned by its parent [`SprintManifest`]. After creation only the
/// integrity validator writes to it (status and actual hash, through the
/// ledger); the planner never mutates an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique id within the manifest.
    pub artifact_id: String,

    /// Kind of work product.
    #[serde(rename = "type")]
    pub kind: ArtifactKind,

    /// Path relative to the working directory.
    pub path: String,

    /// Business or technical purpose.
    pub purpose: String,

    /// Ids of artifacts this one depends on, in declared order.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Expected functional behavior.
    #[serde(default)]
    pub expected_behavior: String,

    /// Acceptance criteria.
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,

    /// Risk assessment.
    pub risk: RiskAssessment,

    /// Estimated effort in story points; weights risk aggregation.
    #[serde(default)]
    pub estimated_effort: u32,

    /// Priority, 1 (highest) to 5.
    #[serde(default = "default_priority")]
    pub priority: u8,

    /// Expected hash, if one has been assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<HashExpectation>,

    /// Hash of actually produced content, set by validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_sha256: Option<String>,

    /// Validation state.
    #[serde(default)]
    pub status: ValidationStatus,
}

impl Artifact {
    /// Computes the plan fingerprint: a deterministic hash over the
    /// artifact's immutable planning fields.
    ///
    /// Used as the artifact's identity until a real content hash is
    /// assigned, so every artifact is verifiable from the moment it is
    /// planned.
    ///
    /// # Errors
    ///
    /// Returns an error if canonical serialization fails.
    pub fn plan_fingerprint(&self) -> Result<String, HashError> {
        let fields = json!({
            "artifact_id": self.artifact_id,
            "type": self.kind,
            "purpose": self.purpose,
            "expected_behavior": self.expected_behavior,
            "acceptance_criteria": self.acceptance_criteria,
        });
        compute_manifest_hash(&fields)
    }

    /// Resolves the artifact's expected hash and its kind
    /// (`"content"` or `"plan"`).
    ///
    /// The assigned [`HashExpectation`] wins; otherwise the plan
    /// fingerprint is computed on the fly.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan fingerprint cannot be computed.
    pub fn resolve_expected(&self) -> Result<(String, &'static str), HashError> {
        match &self.expected {
            Some(expectation) => Ok((expectation.sha256().to_string(), expectation.kind())),
            None => Ok((self.plan_fingerprint()?, "plan")),
        }
    }
}

const fn default_priority() -> u8 {
    1
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_created_by() -> String {
    "planner".to_string()
}

/// Declarative plan for one unit of work.
///
/// Immutable once created: any change produces a logically new manifest
/// with a different hash. Manifests are never deleted, only superseded by
/// a later ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintManifest {
    /// Sprint identifier.
    pub sprint_id: String,

    /// Business goal of the sprint.
    pub sprint_purpose: String,

    /// Manifest schema version. Excluded from hashing.
    #[serde(default = "default_version")]
    pub version: String,

    /// Ordered artifact list.
    pub artifacts: Vec<Artifact>,

    /// Dependency edges: artifact id → ids it depends on, in declared
    /// order. The authoritative edge set for graph algorithms.
    #[serde(default)]
    pub dependency_graph: BTreeMap<String, Vec<String>>,

    /// Aggregate risk for the sprint.
    pub overall_risk: RiskAssessment,

    /// Creation time, RFC 3339.
    pub created_at: String,

    /// Identity of the planner that created the manifest.
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

impl SprintManifest {
    /// Creates a manifest from a planning request, stamped with the
    /// current time.
    #[must_use]
    pub fn new(
        sprint_id: impl Into<String>,
        sprint_purpose: impl Into<String>,
        artifacts: Vec<Artifact>,
        dependency_graph: BTreeMap<String, Vec<String>>,
        overall_risk: RiskAssessment,
    ) -> Self {
        Self {
            sprint_id: sprint_id.into(),
            sprint_purpose: sprint_purpose.into(),
            version: default_version(),
            artifacts,
            dependency_graph,
            overall_risk,
            created_at: Utc::now().to_rfc3339(),
            created_by: default_created_by(),
        }
    }

    /// Serializes the manifest to plain JSON primitives for hashing and
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_snapshot(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Computes the manifest's deterministic hash.
    ///
    /// Delegates to the canonical hasher, so the designated meta keys are
    /// excluded and key-order permutations cannot change the result.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or canonicalization fails.
    pub fn manifest_hash(&self) -> Result<String, HashError> {
        let snapshot = self.to_snapshot()?;
        compute_manifest_hash(&snapshot)
    }

    /// Looks up an artifact by id.
    #[must_use]
    pub fn artifact(&self, artifact_id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.artifact_id == artifact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(id: &str) -> Artifact {
        Artifact {
            artifact_id: id.to_string(),
            kind: ArtifactKind::Code,
            path: format!("src/{id}.rs"),
            purpose: "test artifact".to_string(),
            dependencies: Vec::new(),
            expected_behavior: "compiles".to_string(),
            acceptance_criteria: vec!["builds cleanly".to_string()],
            risk: RiskAssessment::new(RiskLevel::Low, 0.1),
            estimated_effort: 2,
            priority: 1,
            expected: None,
            actual_sha256: None,
            status: ValidationStatus::Pending,
        }
    }

    fn manifest(ids: &[&str]) -> SprintManifest {
        SprintManifest::new(
            "sprint-1",
            "test sprint",
            ids.iter().map(|id| artifact(id)).collect(),
            BTreeMap::new(),
            RiskAssessment::new(RiskLevel::Low, 0.1),
        )
    }

    #[test]
    fn test_manifest_hash_is_stable() {
        let m = manifest(&["a", "b"]);
        assert_eq!(m.manifest_hash().unwrap(), m.manifest_hash().unwrap());
        assert_eq!(m.manifest_hash().unwrap().len(), 64);
    }

    #[test]
    fn test_manifest_hash_ignores_version_field() {
        let m1 = manifest(&["a"]);
        let mut m2 = m1.clone();
        m2.version = "v2".to_string();
        assert_eq!(m1.manifest_hash().unwrap(), m2.manifest_hash().unwrap());
    }

    #[test]
    fn test_manifest_hash_changes_with_content() {
        let m1 = manifest(&["a"]);
        let mut m2 = m1.clone();
        m2.sprint_purpose = "different purpose".to_string();
        assert_ne!(m1.manifest_hash().unwrap(), m2.manifest_hash().unwrap());
    }

    #[test]
    fn test_snapshot_round_trips() {
        let m = manifest(&["a", "b"]);
        let snapshot = m.to_snapshot().unwrap();
        let back: SprintManifest = serde_json::from_value(snapshot).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn test_plan_fingerprint_deterministic() {
        let a = artifact("a");
        assert_eq!(a.plan_fingerprint().unwrap(), a.plan_fingerprint().unwrap());

        let mut b = artifact("a");
        b.purpose = "different".to_string();
        assert_ne!(a.plan_fingerprint().unwrap(), b.plan_fingerprint().unwrap());
    }

    #[test]
    fn test_plan_fingerprint_ignores_runtime_fields() {
        let a = artifact("a");
        let mut b = artifact("a");
        b.actual_sha256 = Some("0".repeat(64));
        b.status = ValidationStatus::Mismatch;
        b.estimated_effort = 99;
        assert_eq!(a.plan_fingerprint().unwrap(), b.plan_fingerprint().unwrap());
    }

    #[test]
    fn test_resolve_expected_prefers_assigned_hash() {
        let mut a = artifact("a");
        let (fingerprint, kind) = a.resolve_expected().unwrap();
        assert_eq!(kind, "plan");
        assert_eq!(fingerprint, a.plan_fingerprint().unwrap());

        a.expected = Some(HashExpectation::Content("ab".repeat(32)));
        let (hash, kind) = a.resolve_expected().unwrap();
        assert_eq!(kind, "content");
        assert_eq!(hash, "ab".repeat(32));
    }

    #[test]
    fn test_validation_status_text_round_trip() {
        for status in [
            ValidationStatus::Pending,
            ValidationStatus::Validated,
            ValidationStatus::Mismatch,
            ValidationStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<ValidationStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<ValidationStatus>().is_err());
    }

    #[test]
    fn test_artifact_kind_wire_names() {
        let a = artifact("a");
        let value = serde_json::to_value(&a).unwrap();
        assert_eq!(value["type"], serde_json::json!("code"));
    }
}
