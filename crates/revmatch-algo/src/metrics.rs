//! Assignment invariants and fairness metrics.
//!
//! Every solver runs [`verify_solution`] before returning: quota, load,
//! conflict, lock, uniqueness, and alternates-disjointness are hard
//! invariants, and a violation is an internal solver fault rather than a
//! condition to be papered over.

use revmatch_core::{MatchError, MatchResult, Problem, Solution};

/// Total affinity of an assignment (unscaled).
pub fn total_affinity(problem: &Problem, assignment: &[Vec<usize>]) -> f64 {
    assignment
        .iter()
        .enumerate()
        .map(|(p, reviewers)| reviewers.iter().map(|&r| problem.score(p, r)).sum::<f64>())
        .sum()
}

/// Mean affinity per paper; papers with no reviewers report 0.
pub fn paper_means(problem: &Problem, assignment: &[Vec<usize>]) -> Vec<f64> {
    assignment
        .iter()
        .enumerate()
        .map(|(p, reviewers)| {
            if reviewers.is_empty() {
                0.0
            } else {
                reviewers.iter().map(|&r| problem.score(p, r)).sum::<f64>() / reviewers.len() as f64
            }
        })
        .collect()
}

/// Check the universal output invariants against `problem`.
///
/// `num_alternates` is the configured cap K for the alternates lists.
pub fn verify_solution(
    problem: &Problem,
    solution: &Solution,
    num_alternates: usize,
) -> MatchResult<()> {
    if solution.assignment.len() != problem.num_papers() {
        return Err(MatchError::Solver(format!(
            "assignment covers {} papers, expected {}",
            solution.assignment.len(),
            problem.num_papers()
        )));
    }

    let mut load = vec![0u32; problem.num_reviewers()];
    for (p, reviewers) in solution.assignment.iter().enumerate() {
        let count = reviewers.len() as u32;
        if count < problem.min_reviewers(p) || count > problem.max_reviewers(p) {
            return Err(MatchError::Solver(format!(
                "paper {} assigned {count} reviewers outside [{}, {}]",
                problem.paper_label(p),
                problem.min_reviewers(p),
                problem.max_reviewers(p)
            )));
        }
        for window in reviewers.windows(2) {
            if window[0] >= window[1] {
                return Err(MatchError::Solver(format!(
                    "paper {} has duplicate or unsorted reviewers",
                    problem.paper_label(p)
                )));
            }
        }
        for &r in reviewers {
            if problem.is_conflicted(p, r) {
                return Err(MatchError::Solver(format!(
                    "conflicted pair ({}, {}) assigned",
                    problem.paper_label(p),
                    problem.reviewer_label(r)
                )));
            }
            load[r] += 1;
        }
    }
    for r in 0..problem.num_reviewers() {
        if load[r] < problem.min_papers(r) || load[r] > problem.max_papers(r) {
            return Err(MatchError::Solver(format!(
                "reviewer {} assigned {} papers outside [{}, {}]",
                problem.reviewer_label(r),
                load[r],
                problem.min_papers(r),
                problem.max_papers(r)
            )));
        }
    }
    for (p, r) in problem.locked_pairs() {
        if !solution.assignment[p].contains(&r) {
            return Err(MatchError::Solver(format!(
                "locked pair ({}, {}) missing from assignment",
                problem.paper_label(p),
                problem.reviewer_label(r)
            )));
        }
    }

    for (p, alternates) in solution.alternates.iter().enumerate() {
        if alternates.len() > num_alternates {
            return Err(MatchError::Solver(format!(
                "paper {} has {} alternates, cap is {num_alternates}",
                problem.paper_label(p),
                alternates.len()
            )));
        }
        for &r in alternates {
            if solution.assignment[p].contains(&r) {
                return Err(MatchError::Solver(format!(
                    "alternate {} for paper {} is already assigned",
                    problem.reviewer_label(r),
                    problem.paper_label(p)
                )));
            }
            if problem.is_conflicted(p, r) {
                return Err(MatchError::Solver(format!(
                    "alternate {} for paper {} is conflicted",
                    problem.reviewer_label(r),
                    problem.paper_label(p)
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use revmatch_core::{PairConstraint, ProblemBuilder};

    fn problem() -> Problem {
        ProblemBuilder::new(2, 3)
            .add_scores(vec![0.9, 0.5, 0.1, 0.2, 0.8, 0.6], 1.0)
            .paper_demand(1, 2)
            .reviewer_load(0, 2)
            .set_constraint(0, 2, PairConstraint::Conflicted)
            .build()
            .unwrap()
    }

    #[test]
    fn test_valid_solution_passes() {
        let mut solution = Solution::empty(2);
        solution.assignment[0] = vec![0, 1];
        solution.assignment[1] = vec![1, 2];
        solution.alternates[1] = vec![0];
        assert!(verify_solution(&problem(), &solution, 2).is_ok());
    }

    #[test]
    fn test_quota_violation_detected() {
        let solution = Solution::empty(2);
        let err = verify_solution(&problem(), &solution, 0).unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_conflict_violation_detected() {
        let mut solution = Solution::empty(2);
        solution.assignment[0] = vec![2];
        solution.assignment[1] = vec![1];
        let err = verify_solution(&problem(), &solution, 0).unwrap_err();
        assert!(err.to_string().contains("conflicted pair"));
    }

    #[test]
    fn test_alternate_overlap_detected() {
        let mut solution = Solution::empty(2);
        solution.assignment[0] = vec![0];
        solution.assignment[1] = vec![1];
        solution.alternates[0] = vec![0];
        let err = verify_solution(&problem(), &solution, 2).unwrap_err();
        assert!(err.to_string().contains("already assigned"));
    }

    #[test]
    fn test_paper_means() {
        let problem = problem();
        let means = paper_means(&problem, &[vec![0, 1], vec![]]);
        assert!((means[0] - 0.7).abs() < 1e-12);
        assert_eq!(means[1], 0.0);
    }
}
