//! MinMax solver: one min-cost flow solve, globally optimal affinity.

use std::collections::BTreeSet;

use revmatch_core::{MatchResult, Problem, Solution};

use crate::cancel::CancelToken;
use crate::flow;
use crate::metrics;

/// Solve with a single min-cost max-flow pass.
///
/// The result saturates every quota minimum (else `Infeasible`), fills
/// maximums as far as capacity allows, and maximizes total affinity over all
/// integral assignments, up to the fixed-point scaling epsilon.
pub fn solve(problem: &Problem, cancel: &CancelToken) -> MatchResult<Solution> {
    problem.check_totals()?;
    let fa = flow::solve_assignment(problem, &BTreeSet::new(), cancel)?;

    let mut solution = Solution::empty(problem.num_papers());
    for (p, r) in fa.edges {
        solution.assignment[p].push(r);
    }
    for reviewers in &mut solution.assignment {
        reviewers.sort_unstable();
    }
    solution.objective = metrics::total_affinity(problem, &solution.assignment);
    solution
        .diagnostics
        .insert("minmax_scaled_affinity", fa.scaled_affinity);
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revmatch_core::{MatchError, PairConstraint, ProblemBuilder};

    #[test]
    fn test_trivial_two_by_two() {
        let problem = ProblemBuilder::new(2, 2)
            .add_scores(vec![1.0, 0.1, 0.1, 1.0], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(1, 1)
            .build()
            .unwrap();
        let solution = solve(&problem, &CancelToken::new()).unwrap();
        assert_eq!(solution.assignment, vec![vec![0], vec![1]]);
        assert!((solution.objective - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_affinities_still_assigned() {
        // Maximums are filled even when every remaining pair is a penalty.
        let problem = ProblemBuilder::new(1, 1)
            .add_scores(vec![-0.5], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(0, 1)
            .build()
            .unwrap();
        let solution = solve(&problem, &CancelToken::new()).unwrap();
        assert_eq!(solution.assignment, vec![vec![0]]);
        assert!((solution.objective + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_locked_pair_in_output() {
        let problem = ProblemBuilder::new(2, 2)
            .add_scores(vec![1.0, 0.1, 0.1, 1.0], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(1, 1)
            .set_constraint(0, 1, PairConstraint::Locked)
            .build()
            .unwrap();
        let solution = solve(&problem, &CancelToken::new()).unwrap();
        assert_eq!(solution.assignment, vec![vec![1], vec![0]]);
        assert!((solution.objective - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_totals_short_circuit() {
        let problem = ProblemBuilder::new(2, 1)
            .paper_demand(1, 1)
            .reviewer_load(0, 1)
            .build()
            .unwrap();
        assert!(matches!(
            solve(&problem, &CancelToken::new()),
            Err(MatchError::Infeasible(_))
        ));
    }

    #[test]
    fn test_deterministic_rerun() {
        let problem = ProblemBuilder::new(3, 4)
            .add_scores(
                vec![0.3, 0.3, 0.7, 0.1, 0.9, 0.2, 0.2, 0.4, 0.5, 0.5, 0.5, 0.5],
                1.0,
            )
            .paper_demand(1, 2)
            .reviewer_load(0, 2)
            .build()
            .unwrap();
        let a = solve(&problem, &CancelToken::new()).unwrap();
        let b = solve(&problem, &CancelToken::new()).unwrap();
        assert_eq!(a.assignment, b.assignment);
        assert_eq!(a.objective, b.objective);
    }
}
