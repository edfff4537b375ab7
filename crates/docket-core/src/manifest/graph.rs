//! Dependency-graph algorithms over a manifest.
//!
//! Cycle detection and ordering run on `dependency_graph` edges with an
//! explicit work stack rather than recursion, so pathological graphs
//! cannot overflow the thread stack. Traversal visits artifacts in
//! manifest-declaration order and each dependency list in declared order,
//! so identical manifests always yield identical execution orders.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path};

use serde::Serialize;

use super::model::SprintManifest;
use super::ManifestError;

/// Preflight summary for a manifest, bundled as a plain value so callers
/// branch without exception handling.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestReport {
    /// Structural validation passed (unique ids, safe paths, known graph
    /// references).
    pub schema_valid: bool,
    /// The dependency graph is acyclic.
    pub dependencies_ok: bool,
    /// The manifest hash, when computable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_hash: Option<String>,
    /// Whether the manifest is ready for execution.
    pub execution_ready: bool,
    /// First failure encountered, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

impl SprintManifest {
    /// Validates manifest structure.
    ///
    /// # Errors
    ///
    /// Returns the first defect found: a duplicate artifact id, an
    /// artifact path containing a parent-directory component, or a
    /// dependency-graph reference to an undeclared artifact.
    pub fn validate_structure(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::with_capacity(self.artifacts.len());
        for artifact in &self.artifacts {
            if !seen.insert(artifact.artifact_id.as_str()) {
                return Err(ManifestError::DuplicateArtifactId {
                    id: artifact.artifact_id.clone(),
                });
            }
            let escapes = Path::new(&artifact.path)
                .components()
                .any(|c| matches!(c, Component::ParentDir));
            if escapes {
                return Err(ManifestError::UnsafePath {
                    artifact_id: artifact.artifact_id.clone(),
                    path: artifact.path.clone(),
                });
            }
        }

        for (node, deps) in &self.dependency_graph {
            if !seen.contains(node.as_str()) {
                return Err(ManifestError::UnknownArtifact { id: node.clone() });
            }
            for dep in deps {
                if !seen.contains(dep.as_str()) {
                    return Err(ManifestError::UnknownArtifact { id: dep.clone() });
                }
            }
        }

        for artifact in &self.artifacts {
            for dep in &artifact.dependencies {
                if !seen.contains(dep.as_str()) {
                    return Err(ManifestError::UnknownArtifact { id: dep.clone() });
                }
            }
        }

        Ok(())
    }

    /// Checks the dependency graph for cycles.
    ///
    /// Detects direct self-loops and transitive cycles in O(artifacts +
    /// edges) using an explicit work stack.
    #[must_use]
    pub fn validate_dependencies(&self) -> bool {
        let mut state: HashMap<&str, VisitState> = HashMap::new();

        for artifact in &self.artifacts {
            let root = artifact.artifact_id.as_str();
            if state.contains_key(root) {
                continue;
            }

            // (node, index of next dependency to examine)
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            state.insert(root, VisitState::InProgress);

            while let Some(frame) = stack.last_mut() {
                let (node, next) = (frame.0, frame.1);
                let deps = self.deps_of(node);
                if next < deps.len() {
                    frame.1 += 1;
                    let dep = deps[next].as_str();
                    match state.get(dep) {
                        Some(VisitState::InProgress) => return false,
                        Some(VisitState::Done) => {},
                        None => {
                            state.insert(dep, VisitState::InProgress);
                            stack.push((dep, 0));
                        },
                    }
                } else {
                    state.insert(node, VisitState::Done);
                    stack.pop();
                }
            }
        }

        true
    }

    /// Computes a deterministic execution order, dependencies before
    /// dependents.
    ///
    /// For `{A: [B], B: []}` the order is `[B, A]`. Two runs over an
    /// identical manifest always produce an identical order.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::CyclicDependency`] if the graph has a
    /// cycle; never returns a partial order.
    pub fn execution_order(&self) -> Result<Vec<String>, ManifestError> {
        if !self.validate_dependencies() {
            return Err(ManifestError::CyclicDependency);
        }

        let declared: HashSet<&str> = self
            .artifacts
            .iter()
            .map(|a| a.artifact_id.as_str())
            .collect();
        let mut visited: HashSet<&str> = HashSet::with_capacity(declared.len());
        let mut order: Vec<String> = Vec::with_capacity(self.artifacts.len());

        for artifact in &self.artifacts {
            let root = artifact.artifact_id.as_str();
            if visited.contains(root) {
                continue;
            }
            visited.insert(root);
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, next) = (frame.0, frame.1);
                let deps = self.deps_of(node);
                if next < deps.len() {
                    frame.1 += 1;
                    let dep = deps[next].as_str();
                    if !visited.contains(dep) {
                        visited.insert(dep);
                        stack.push((dep, 0));
                    }
                } else {
                    // All dependencies emitted; emit the node itself.
                    if declared.contains(node) {
                        order.push(node.to_string());
                    }
                    stack.pop();
                }
            }
        }

        Ok(order)
    }

    /// Computes the effort-weighted average of per-artifact risk scores.
    ///
    /// Returns `0.0` when there are no artifacts or total effort is zero.
    #[must_use]
    pub fn risk_score(&self) -> f64 {
        let total_effort: f64 = self
            .artifacts
            .iter()
            .map(|a| f64::from(a.estimated_effort))
            .sum();
        if total_effort == 0.0 {
            return 0.0;
        }

        let weighted: f64 = self
            .artifacts
            .iter()
            .map(|a| a.risk.score * f64::from(a.estimated_effort))
            .sum();
        weighted / total_effort
    }

    /// Runs structural validation, cycle detection, and hashing in one
    /// pass and reports the result as a value.
    #[must_use]
    pub fn preflight(&self) -> ManifestReport {
        let mut error = None;

        let schema_valid = match self.validate_structure() {
            Ok(()) => true,
            Err(e) => {
                error = Some(e.to_string());
                false
            },
        };

        let dependencies_ok = self.validate_dependencies();
        if !dependencies_ok && error.is_none() {
            error = Some(ManifestError::CyclicDependency.to_string());
        }

        let manifest_hash = match self.manifest_hash() {
            Ok(hash) => Some(hash),
            Err(e) => {
                if error.is_none() {
                    error = Some(e.to_string());
                }
                None
            },
        };

        let execution_ready = schema_valid && dependencies_ok && manifest_hash.is_some();

        ManifestReport {
            schema_valid,
            dependencies_ok,
            manifest_hash,
            execution_ready,
            error,
        }
    }

    fn deps_of(&self, node: &str) -> &[String] {
        self.dependency_graph.get(node).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::super::model::{Artifact, ArtifactKind, RiskAssessment, RiskLevel, ValidationStatus};
    use super::*;

    fn artifact(id: &str, effort: u32, risk: f64) -> Artifact {
        Artifact {
            artifact_id: id.to_string(),
            kind: ArtifactKind::Code,
            path: format!("src/{id}.rs"),
            purpose: "test".to_string(),
            dependencies: Vec::new(),
            expected_behavior: String::new(),
            acceptance_criteria: Vec::new(),
            risk: RiskAssessment::new(RiskLevel::Low, risk),
            estimated_effort: effort,
            priority: 1,
            expected: None,
            actual_sha256: None,
            status: ValidationStatus::Pending,
        }
    }

    fn manifest_with_graph(ids: &[&str], edges: &[(&str, &[&str])]) -> SprintManifest {
        let graph: BTreeMap<String, Vec<String>> = edges
            .iter()
            .map(|(n, deps)| {
                (
                    (*n).to_string(),
                    deps.iter().map(|d| (*d).to_string()).collect(),
                )
            })
            .collect();
        SprintManifest::new(
            "sprint-1",
            "test",
            ids.iter().map(|id| artifact(id, 1, 0.1)).collect(),
            graph,
            RiskAssessment::new(RiskLevel::Low, 0.1),
        )
    }

    #[test]
    fn test_two_node_cycle_fails() {
        let m = manifest_with_graph(&["a", "b"], &[("a", &["b"]), ("b", &["a"])]);
        assert!(!m.validate_dependencies());
        assert_eq!(
            m.execution_order().unwrap_err(),
            ManifestError::CyclicDependency
        );
    }

    #[test]
    fn test_self_loop_fails() {
        let m = manifest_with_graph(&["a"], &[("a", &["a"])]);
        assert!(!m.validate_dependencies());
    }

    #[test]
    fn test_transitive_cycle_fails() {
        let m = manifest_with_graph(
            &["a", "b", "c"],
            &[("a", &["b"]), ("b", &["c"]), ("c", &["a"])],
        );
        assert!(!m.validate_dependencies());
    }

    #[test]
    fn test_acyclic_passes_and_orders_dependencies_first() {
        let m = manifest_with_graph(&["a", "b"], &[("a", &["b"]), ("b", &[])]);
        assert!(m.validate_dependencies());
        assert_eq!(m.execution_order().unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_execution_order_is_deterministic() {
        let m = manifest_with_graph(
            &["d", "c", "b", "a"],
            &[("d", &["b", "c"]), ("c", &["a"]), ("b", &["a"])],
        );
        let first = m.execution_order().unwrap();
        for _ in 0..10 {
            assert_eq!(m.execution_order().unwrap(), first);
        }
        // Every artifact appears after all of its dependencies.
        let position: HashMap<&str, usize> = first
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        for (node, deps) in &m.dependency_graph {
            for dep in deps {
                assert!(position[dep.as_str()] < position[node.as_str()]);
            }
        }
    }

    #[test]
    fn test_execution_order_covers_all_artifacts() {
        let m = manifest_with_graph(&["a", "b", "c"], &[("a", &["c"])]);
        let order = m.execution_order().unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_diamond_graph() {
        // d -> b, c ; b -> a ; c -> a
        let m = manifest_with_graph(
            &["a", "b", "c", "d"],
            &[("d", &["b", "c"]), ("b", &["a"]), ("c", &["a"])],
        );
        assert!(m.validate_dependencies());
        assert_eq!(m.execution_order().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_long_chain_does_not_overflow_stack() {
        // 50k-node chain would overflow a recursive traversal.
        let n = 50_000;
        let ids: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
        let mut graph = BTreeMap::new();
        for i in 1..n {
            graph.insert(ids[i].clone(), vec![ids[i - 1].clone()]);
        }
        // Declare dependents first so traversal descends the full chain.
        let manifest = SprintManifest::new(
            "sprint-deep",
            "deep chain",
            ids.iter().rev().map(|id| artifact(id, 1, 0.1)).collect(),
            graph,
            RiskAssessment::new(RiskLevel::Low, 0.1),
        );
        assert!(manifest.validate_dependencies());
        let order = manifest.execution_order().unwrap();
        assert_eq!(order.len(), n);
        assert_eq!(order[0], "n0");
        assert_eq!(order[n - 1], format!("n{}", n - 1));
    }

    #[test]
    fn test_risk_score_weighted_by_effort() {
        let mut m = manifest_with_graph(&[], &[]);
        m.artifacts = vec![artifact("a", 1, 0.2), artifact("b", 3, 0.6)];
        let expected = (0.2 + 0.6 * 3.0) / 4.0;
        assert!((m.risk_score() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_risk_score_zero_guards() {
        let empty = manifest_with_graph(&[], &[]);
        assert_eq!(empty.risk_score(), 0.0);

        let mut zero_effort = manifest_with_graph(&[], &[]);
        zero_effort.artifacts = vec![artifact("a", 0, 0.9)];
        assert_eq!(zero_effort.risk_score(), 0.0);
    }

    #[test]
    fn test_structure_rejects_duplicate_ids() {
        let m = manifest_with_graph(&["a", "a"], &[]);
        assert!(matches!(
            m.validate_structure(),
            Err(ManifestError::DuplicateArtifactId { .. })
        ));
    }

    #[test]
    fn test_structure_rejects_parent_dir_path() {
        let mut m = manifest_with_graph(&["a"], &[]);
        m.artifacts[0].path = "../escape.rs".to_string();
        assert!(matches!(
            m.validate_structure(),
            Err(ManifestError::UnsafePath { .. })
        ));
    }

    #[test]
    fn test_structure_allows_dotted_file_names() {
        let mut m = manifest_with_graph(&["a"], &[]);
        m.artifacts[0].path = "src/data..table.rs".to_string();
        assert!(m.validate_structure().is_ok());
    }

    #[test]
    fn test_structure_rejects_unknown_graph_reference() {
        let m = manifest_with_graph(&["a"], &[("a", &["ghost"])]);
        assert!(matches!(
            m.validate_structure(),
            Err(ManifestError::UnknownArtifact { .. })
        ));
    }

    #[test]
    fn test_preflight_reports() {
        let good = manifest_with_graph(&["a", "b"], &[("a", &["b"])]);
        let report = good.preflight();
        assert!(report.schema_valid);
        assert!(report.dependencies_ok);
        assert!(report.execution_ready);
        assert!(report.error.is_none());
        assert_eq!(report.manifest_hash.unwrap().len(), 64);

        let cyclic = manifest_with_graph(&["a", "b"], &[("a", &["b"]), ("b", &["a"])]);
        let report = cyclic.preflight();
        assert!(report.schema_valid);
        assert!(!report.dependencies_ok);
        assert!(!report.execution_ready);
        assert!(report.error.is_some());
    }
}
