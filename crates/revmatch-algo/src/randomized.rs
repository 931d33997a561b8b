//! Randomized solver: an LP over marginal assignment probabilities followed
//! by dependent rounding.
//!
//! Stage 1 solves the continuous relaxation with per-pair probability caps
//! using Clarabel through the `good_lp` abstraction. Stage 2 samples one
//! integral assignment from the fractional solution by repeatedly finding a
//! cycle or maximal path through the fractional edges, perturbing its edges
//! alternately up/down by the largest steps the unit box allows, and picking
//! the direction with probability proportional to the opposite step. Each
//! round fixes at least one edge, every vertex's final degree lands in
//! {⌊σ⌋, ⌈σ⌉} of its fractional degree σ, and the expected value of every
//! edge equals its LP marginal.
//!
//! The sampler is driven by an explicit 64-bit seed; identical inputs and
//! seed reproduce the identical assignment.

use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution as LpSolution,
    SolverModel, Variable,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use revmatch_core::{MatchError, MatchResult, PairConstraint, Problem, Solution};

use crate::cancel::CancelToken;
use crate::metrics;

/// LP outputs within this distance of 0 or 1 are taken as exact.
const SNAP_EPS: f64 = 1e-6;

/// Rounding arithmetic noise threshold.
const INTEGRAL_EPS: f64 = 1e-7;

fn snap(value: f64, eps: f64) -> f64 {
    if value <= eps {
        0.0
    } else if value >= 1.0 - eps {
        1.0
    } else {
        value
    }
}

pub fn solve(problem: &Problem, seed: u64, cancel: &CancelToken) -> MatchResult<Solution> {
    problem.check_totals()?;
    let papers = problem.num_papers();
    let reviewers = problem.num_reviewers();
    let cells = papers * reviewers;

    // Stage 1: marginal LP.
    let mut vars = variables!();
    let mut x_vars: Vec<Option<Variable>> = Vec::with_capacity(cells);
    for p in 0..papers {
        for r in 0..reviewers {
            let var = match problem.constraint(p, r) {
                PairConstraint::Conflicted => None,
                PairConstraint::Locked => Some(vars.add(variable().min(1.0).max(1.0))),
                PairConstraint::Free => {
                    let cap = problem.probability_limit(p, r).unwrap_or(1.0);
                    if cap <= 0.0 {
                        None
                    } else {
                        Some(vars.add(variable().min(0.0).max(cap)))
                    }
                }
            };
            x_vars.push(var);
        }
    }

    let mut objective = Expression::from(0.0);
    for p in 0..papers {
        for r in 0..reviewers {
            if let Some(var) = x_vars[p * reviewers + r] {
                objective += problem.score(p, r) * var;
            }
        }
    }

    let mut model = vars.maximise(objective).using(clarabel);
    for p in 0..papers {
        let mut row = Expression::from(0.0);
        for r in 0..reviewers {
            if let Some(var) = x_vars[p * reviewers + r] {
                row += var;
            }
        }
        model = model.with(constraint!(row.clone() <= f64::from(problem.max_reviewers(p))));
        model = model.with(constraint!(row >= f64::from(problem.min_reviewers(p))));
    }
    for r in 0..reviewers {
        let mut column = Expression::from(0.0);
        for p in 0..papers {
            if let Some(var) = x_vars[p * reviewers + r] {
                column += var;
            }
        }
        model = model.with(constraint!(column.clone() <= f64::from(problem.max_papers(r))));
        model = model.with(constraint!(column >= f64::from(problem.min_papers(r))));
    }

    let lp = model.solve().map_err(|err| match err {
        ResolutionError::Infeasible => {
            MatchError::Infeasible("marginal probability LP is infeasible".into())
        }
        other => MatchError::Solver(format!("LP solve failed: {other:?}")),
    })?;

    let mut x = vec![0.0f64; cells];
    for (idx, var) in x_vars.iter().enumerate() {
        if let Some(var) = var {
            x[idx] = snap(lp.value(*var).clamp(0.0, 1.0), SNAP_EPS);
        }
    }
    let fractional = x.clone();
    let lp_objective: f64 = (0..cells)
        .map(|idx| problem.score(idx / reviewers, idx % reviewers) * x[idx])
        .sum();

    // Stage 2: dependent rounding.
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rounds = 0usize;
    loop {
        cancel.check()?;
        let frac: Vec<usize> = (0..cells).filter(|&i| x[i] > 0.0 && x[i] < 1.0).collect();
        if frac.is_empty() {
            break;
        }
        rounds += 1;
        if rounds > 4 * cells + 4 {
            return Err(MatchError::Solver(
                "dependent rounding failed to converge".into(),
            ));
        }

        let trail = find_trail(&frac, papers, reviewers);
        let (mut alpha_up, mut alpha_down) = (f64::INFINITY, f64::INFINITY);
        for (k, &idx) in trail.iter().enumerate() {
            if k % 2 == 0 {
                alpha_up = alpha_up.min(1.0 - x[idx]);
                alpha_down = alpha_down.min(x[idx]);
            } else {
                alpha_up = alpha_up.min(x[idx]);
                alpha_down = alpha_down.min(1.0 - x[idx]);
            }
        }
        if !(alpha_up > 0.0 && alpha_down > 0.0) {
            return Err(MatchError::Solver(
                "dependent rounding step degenerated".into(),
            ));
        }
        let step = if rng.gen::<f64>() < alpha_down / (alpha_up + alpha_down) {
            alpha_up
        } else {
            -alpha_down
        };
        for (k, &idx) in trail.iter().enumerate() {
            let signed = if k % 2 == 0 { step } else { -step };
            x[idx] = snap((x[idx] + signed).clamp(0.0, 1.0), INTEGRAL_EPS);
        }
    }

    let mut solution = Solution::empty(papers);
    for p in 0..papers {
        for r in 0..reviewers {
            if x[p * reviewers + r] >= 0.5 {
                solution.assignment[p].push(r);
            }
        }
    }
    solution.objective = metrics::total_affinity(problem, &solution.assignment);
    solution.fractional = Some(fractional);
    solution.diagnostics.insert("lp_status", "optimal");
    solution
        .diagnostics
        .insert("lp_objective", format!("{lp_objective:.6}"));
    solution.diagnostics.insert("rounding_rounds", rounds);

    // The sampler's degree guarantee makes violations a numeric fault, so
    // check here instead of trusting it.
    metrics::verify_solution(problem, &solution, 0)?;
    Ok(solution)
}

/// Find a cycle or maximal path through the fractional edges.
///
/// Walks from a degree-1 vertex when one exists (the walk then ends at
/// another degree-1 vertex, giving a maximal path) and otherwise from the
/// lowest populated vertex (every vertex then has degree ≥ 2 and the walk
/// must close a cycle). Returned edges are consecutive: adjacent entries
/// share a vertex, so alternating ± perturbations cancel at every interior
/// vertex.
fn find_trail(frac: &[usize], papers: usize, reviewers: usize) -> Vec<usize> {
    let num_nodes = papers + reviewers;
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
    for &idx in frac {
        adj[idx / reviewers].push(idx);
        adj[papers + idx % reviewers].push(idx);
    }

    let start = (0..num_nodes)
        .filter(|&n| !adj[n].is_empty())
        .min_by_key(|&n| (adj[n].len() != 1, n))
        .expect("fractional edge set is non-empty");

    let mut trail: Vec<usize> = Vec::new();
    let mut used: Vec<bool> = vec![false; frac.len()];
    let position: std::collections::HashMap<usize, usize> =
        frac.iter().enumerate().map(|(i, &idx)| (idx, i)).collect();
    let mut visited_at: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    let mut current = start;
    visited_at.insert(start, 0);
    loop {
        let Some(&edge) = adj[current].iter().find(|&&e| !used[position[&e]]) else {
            // Dead end: `current` had a single fractional edge, so the trail
            // is a maximal path.
            return trail;
        };
        used[position[&edge]] = true;
        trail.push(edge);
        let paper_node = edge / reviewers;
        let reviewer_node = papers + edge % reviewers;
        let next = if current == paper_node {
            reviewer_node
        } else {
            paper_node
        };
        if let Some(&at) = visited_at.get(&next) {
            return trail[at..].to_vec();
        }
        visited_at.insert(next, trail.len());
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revmatch_core::ProblemBuilder;

    fn capped_square() -> Problem {
        ProblemBuilder::new(2, 2)
            .add_scores(vec![1.0, 1.0, 1.0, 1.0], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(1, 1)
            .with_probability_limits(vec![0.5; 4])
            .build()
            .unwrap()
    }

    #[test]
    fn test_sample_is_perfect_matching() {
        let problem = capped_square();
        for seed in 0..16 {
            let solution = solve(&problem, seed, &CancelToken::new()).unwrap();
            let edges = solution.edges();
            assert_eq!(edges.len(), 2);
            assert_ne!(edges[0].1, edges[1].1);
            assert!((solution.objective - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_sample() {
        let problem = capped_square();
        let a = solve(&problem, 42, &CancelToken::new()).unwrap();
        let b = solve(&problem, 42, &CancelToken::new()).unwrap();
        assert_eq!(a.assignment, b.assignment);
        assert_eq!(a.fractional, b.fractional);
    }

    #[test]
    fn test_fractional_respects_caps() {
        let problem = capped_square();
        let solution = solve(&problem, 7, &CancelToken::new()).unwrap();
        let x = solution.fractional.unwrap();
        for &value in &x {
            assert!(value <= 0.5 + 1e-6, "marginal {value} exceeds cap");
        }
        // Caps force the unique fractional solution x = 0.5 everywhere.
        for &value in &x {
            assert!((value - 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_zero_cap_excludes_pair() {
        let problem = ProblemBuilder::new(2, 2)
            .add_scores(vec![1.0, 0.1, 0.1, 1.0], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(1, 1)
            .with_probability_limits(vec![0.0, 1.0, 1.0, 1.0])
            .build()
            .unwrap();
        for seed in 0..8 {
            let solution = solve(&problem, seed, &CancelToken::new()).unwrap();
            assert_eq!(solution.assignment, vec![vec![1], vec![0]]);
        }
    }

    #[test]
    fn test_infeasible_lp() {
        // Caps of 0.4 cannot sum to the mandatory row total of 1.
        let problem = ProblemBuilder::new(1, 2)
            .add_scores(vec![1.0, 1.0], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(0, 1)
            .with_probability_limits(vec![0.4, 0.4])
            .build()
            .unwrap();
        let err = solve(&problem, 0, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, MatchError::Infeasible(_)));
    }

    #[test]
    fn test_trail_on_cycle() {
        // 2×2 all-fractional grid: the walk must close the 4-cycle.
        let frac = vec![0usize, 1, 2, 3];
        let trail = find_trail(&frac, 2, 2);
        assert_eq!(trail.len(), 4);
    }

    #[test]
    fn test_trail_on_path() {
        // Single fractional edge: maximal path of length 1.
        let frac = vec![2usize];
        let trail = find_trail(&frac, 2, 2);
        assert_eq!(trail, vec![2]);
    }
}
