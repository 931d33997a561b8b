//! Unified solver front-end: pick a solver kind once, solve, and get a
//! verified [`Solution`] back.

use std::str::FromStr;

use revmatch_core::{MatchError, MatchResult, Problem, Solution};

use crate::cancel::CancelToken;
use crate::{alternates, fairflow, fairseq, metrics, minmax, randomized};

/// The four assignment solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Single min-cost flow solve, globally optimal affinity.
    #[default]
    MinMax,
    /// Iterated flow solves raising the worst-off paper.
    FairFlow,
    /// LP marginals plus dependent-rounding sampling.
    Randomized,
    /// Greedy WEF1 picking sequence.
    FairSequence,
}

impl std::fmt::Display for SolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverKind::MinMax => write!(f, "MinMax"),
            SolverKind::FairFlow => write!(f, "FairFlow"),
            SolverKind::Randomized => write!(f, "Randomized"),
            SolverKind::FairSequence => write!(f, "FairSequence"),
        }
    }
}

impl FromStr for SolverKind {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minmax" => Ok(SolverKind::MinMax),
            "fairflow" => Ok(SolverKind::FairFlow),
            "randomized" => Ok(SolverKind::Randomized),
            "fairsequence" => Ok(SolverKind::FairSequence),
            other => Err(MatchError::Validation(format!(
                "unknown solver {other:?} (expected MinMax, FairFlow, Randomized or FairSequence)"
            ))),
        }
    }
}

/// Configured solver entry point.
///
/// ```no_run
/// use revmatch_algo::{AssignmentSolver, SolverKind};
/// use revmatch_core::ProblemBuilder;
///
/// let problem = ProblemBuilder::new(10, 30)
///     .paper_demand(2, 3)
///     .reviewer_load(0, 4)
///     .build()?;
/// let solution = AssignmentSolver::new(SolverKind::FairFlow)
///     .with_alternates(2)
///     .solve(&problem)?;
/// # Ok::<(), revmatch_core::MatchError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssignmentSolver {
    kind: SolverKind,
    num_alternates: usize,
    seed: u64,
    cancel: CancelToken,
}

impl AssignmentSolver {
    pub fn new(kind: SolverKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Number of backup reviewers recorded per paper (default 0).
    pub fn with_alternates(mut self, num_alternates: usize) -> Self {
        self.num_alternates = num_alternates;
        self
    }

    /// Seed for the randomized solver's sampler; ignored by the others.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cancellation probe shared with the caller.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn kind(&self) -> SolverKind {
        self.kind
    }

    /// Run the configured solver and verify the output invariants.
    pub fn solve(&self, problem: &Problem) -> MatchResult<Solution> {
        let mut solution = match self.kind {
            SolverKind::MinMax => minmax::solve(problem, &self.cancel)?,
            SolverKind::FairFlow => fairflow::solve(problem, &self.cancel)?,
            SolverKind::Randomized => randomized::solve(problem, self.seed, &self.cancel)?,
            SolverKind::FairSequence => fairseq::solve(problem, &self.cancel)?,
        };
        solution.alternates = alternates::compute(problem, &solution.assignment, self.num_alternates);
        solution.diagnostics.insert("solver", self.kind);
        let means = metrics::paper_means(problem, &solution.assignment);
        if let Some(min) = means.iter().cloned().reduce(f64::min) {
            solution.diagnostics.insert("min_paper_mean", format!("{min:.6}"));
        }
        solution.diagnostics.insert(
            "paper_means",
            means
                .iter()
                .map(|mean| format!("{mean:.4}"))
                .collect::<Vec<_>>()
                .join(","),
        );
        metrics::verify_solution(problem, &solution, self.num_alternates)?;
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revmatch_core::ProblemBuilder;

    fn problem() -> Problem {
        ProblemBuilder::new(2, 3)
            .add_scores(vec![0.9, 0.5, 0.1, 0.2, 0.8, 0.6], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(0, 1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_solver_kind() {
        assert_eq!("MinMax".parse::<SolverKind>().unwrap(), SolverKind::MinMax);
        assert_eq!(
            "fairsequence".parse::<SolverKind>().unwrap(),
            SolverKind::FairSequence
        );
        assert!("simplex".parse::<SolverKind>().is_err());
    }

    #[test]
    fn test_alternates_attached() {
        let solution = AssignmentSolver::new(SolverKind::MinMax)
            .with_alternates(2)
            .solve(&problem())
            .unwrap();
        assert_eq!(solution.assignment, vec![vec![0], vec![1]]);
        // Paper 0's backups: r1 (0.5) then r2 (0.1).
        assert_eq!(solution.alternates[0], vec![1, 2]);
        assert_eq!(solution.diagnostics.get("solver"), Some("MinMax"));
    }

    #[test]
    fn test_every_kind_solves() {
        for kind in [
            SolverKind::MinMax,
            SolverKind::FairFlow,
            SolverKind::Randomized,
            SolverKind::FairSequence,
        ] {
            let solution = AssignmentSolver::new(kind)
                .with_seed(11)
                .solve(&problem())
                .unwrap();
            assert_eq!(
                solution.assignment.iter().map(Vec::len).sum::<usize>(),
                2,
                "{kind} did not fill both papers"
            );
        }
    }

    #[test]
    fn test_cancelled_solve() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = AssignmentSolver::new(SolverKind::FairFlow)
            .with_cancel(cancel)
            .solve(&problem())
            .unwrap_err();
        assert!(matches!(err, MatchError::Cancelled));
    }
}
