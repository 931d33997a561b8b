//! Ranked backup reviewers, computed after the main assignment.

use revmatch_core::Problem;

/// Up to `k` alternates per paper: non-conflicted reviewers not already
/// assigned to the paper, ranked by descending affinity with ties broken by
/// ascending reviewer index. Alternates never consume reviewer capacity.
pub fn compute(problem: &Problem, assignment: &[Vec<usize>], k: usize) -> Vec<Vec<usize>> {
    if k == 0 {
        return vec![Vec::new(); problem.num_papers()];
    }
    (0..problem.num_papers())
        .map(|p| {
            let mut ranked: Vec<usize> = (0..problem.num_reviewers())
                .filter(|&r| !problem.is_conflicted(p, r) && !assignment[p].contains(&r))
                .collect();
            ranked.sort_by(|&a, &b| {
                problem
                    .score(p, b)
                    .partial_cmp(&problem.score(p, a))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
            ranked.truncate(k);
            ranked
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use revmatch_core::{PairConstraint, ProblemBuilder};

    #[test]
    fn test_ranked_and_disjoint() {
        let problem = ProblemBuilder::new(1, 5)
            .add_scores(vec![0.2, 0.9, 0.5, 0.9, 0.1], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(0, 1)
            .set_constraint(0, 4, PairConstraint::Conflicted)
            .build()
            .unwrap();
        let assignment = vec![vec![1]];
        // Descending score with index ties ascending, minus assigned r1 and
        // conflicted r4: r3 (0.9), r2 (0.5), r0 (0.2).
        assert_eq!(compute(&problem, &assignment, 3), vec![vec![3, 2, 0]]);
        assert_eq!(compute(&problem, &assignment, 2), vec![vec![3, 2]]);
        assert_eq!(compute(&problem, &assignment, 0), vec![Vec::<usize>::new()]);
    }
}
