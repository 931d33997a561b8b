//! Solver output types: assignments, diagnostics, and the serialized record.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::Problem;

/// Terminal status of a solve, as surfaced to callers and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Complete,
    Infeasible,
    Cancelled,
    SolverError,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Complete => write!(f, "Complete"),
            SolveStatus::Infeasible => write!(f, "Infeasible"),
            SolveStatus::Cancelled => write!(f, "Cancelled"),
            SolveStatus::SolverError => write!(f, "SolverError"),
        }
    }
}

/// Free-form key/value diagnostics attached to a solution (iteration counts,
/// per-paper means, LP status). Keys are ordered for reproducible output.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(BTreeMap<String, String>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A complete assignment produced by one solver invocation.
///
/// `assignment[p]` lists the reviewers of paper `p` in ascending index order;
/// `alternates[p]` the ranked backups. Indices are 0-based into the problem's
/// label tables.
#[derive(Debug, Clone)]
pub struct Solution {
    pub assignment: Vec<Vec<usize>>,
    pub alternates: Vec<Vec<usize>>,
    /// Total affinity of the assignment (unscaled doubles).
    pub objective: f64,
    /// Fractional marginals from the randomized solver, row-major, for
    /// auditing. `None` for the deterministic solvers.
    pub fractional: Option<Vec<f64>>,
    pub diagnostics: Diagnostics,
}

impl Solution {
    pub fn empty(num_papers: usize) -> Self {
        Self {
            assignment: vec![Vec::new(); num_papers],
            alternates: vec![Vec::new(); num_papers],
            objective: 0.0,
            fractional: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Assignment as (paper, reviewer) index pairs in ascending order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for (paper, reviewers) in self.assignment.iter().enumerate() {
            for &reviewer in reviewers {
                edges.push((paper, reviewer));
            }
        }
        edges
    }
}

/// JSON-serializable output record for the CLI collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    pub status: SolveStatus,
    /// Paper label → assigned reviewer labels (ascending reviewer index).
    pub assignment: BTreeMap<String, Vec<String>>,
    /// Paper label → alternate reviewer labels (descending affinity).
    pub alternates: BTreeMap<String, Vec<String>>,
    pub objective: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fractional_assignment: Option<Vec<Vec<f64>>>,
    pub diagnostics: Diagnostics,
    /// Error detail for non-Complete records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutputRecord {
    /// Record for a completed solve, labels resolved from the problem.
    pub fn complete(problem: &Problem, solution: &Solution) -> Self {
        let mut assignment = BTreeMap::new();
        let mut alternates = BTreeMap::new();
        for paper in 0..problem.num_papers() {
            assignment.insert(
                problem.paper_label(paper).to_string(),
                solution.assignment[paper]
                    .iter()
                    .map(|&r| problem.reviewer_label(r).to_string())
                    .collect(),
            );
            alternates.insert(
                problem.paper_label(paper).to_string(),
                solution.alternates[paper]
                    .iter()
                    .map(|&r| problem.reviewer_label(r).to_string())
                    .collect(),
            );
        }
        let fractional_assignment = solution.fractional.as_ref().map(|x| {
            (0..problem.num_papers())
                .map(|p| {
                    (0..problem.num_reviewers())
                        .map(|r| x[p * problem.num_reviewers() + r])
                        .collect()
                })
                .collect()
        });
        Self {
            status: SolveStatus::Complete,
            assignment,
            alternates,
            objective: solution.objective,
            fractional_assignment,
            diagnostics: solution.diagnostics.clone(),
            error: None,
        }
    }

    /// Record for a failed solve.
    pub fn failed(status: SolveStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            assignment: BTreeMap::new(),
            alternates: BTreeMap::new(),
            objective: 0.0,
            fractional_assignment: None,
            diagnostics: Diagnostics::new(),
            error: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProblemBuilder;

    #[test]
    fn test_status_display_matches_serialization() {
        for status in [
            SolveStatus::Complete,
            SolveStatus::Infeasible,
            SolveStatus::Cancelled,
            SolveStatus::SolverError,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_complete_record_uses_labels() {
        let problem = ProblemBuilder::new(2, 2)
            .with_paper_labels(vec!["A".into(), "B".into()])
            .with_reviewer_labels(vec!["x".into(), "y".into()])
            .add_scores(vec![1.0, 0.1, 0.1, 1.0], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(1, 1)
            .build()
            .unwrap();
        let mut solution = Solution::empty(2);
        solution.assignment[0] = vec![0];
        solution.assignment[1] = vec![1];
        solution.objective = 2.0;

        let record = OutputRecord::complete(&problem, &solution);
        assert_eq!(record.assignment["A"], vec!["x".to_string()]);
        assert_eq!(record.assignment["B"], vec!["y".to_string()]);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"status\":\"Complete\""));
        assert!(!json.contains("fractional_assignment"));
    }

    #[test]
    fn test_failed_record_carries_detail() {
        let record = OutputRecord::failed(SolveStatus::Infeasible, "no flow");
        assert_eq!(record.status, SolveStatus::Infeasible);
        assert_eq!(record.error.as_deref(), Some("no flow"));
    }

    #[test]
    fn test_edges_ascending() {
        let mut solution = Solution::empty(2);
        solution.assignment[0] = vec![1, 2];
        solution.assignment[1] = vec![0];
        assert_eq!(solution.edges(), vec![(0, 1), (0, 2), (1, 0)]);
    }
}
