//! FairFlow solver: iterated min-cost flow re-solves that raise the
//! worst-off paper.
//!
//! Starting from the MinMax assignment, the loop repeatedly picks the
//! unsaturated paper with the lowest mean affinity and tries to forbid its
//! below-mean edges one at a time, re-solving after each removal. A re-solve
//! is accepted only when it stays feasible and strictly improves the
//! (minimum paper mean, total affinity) objective in lexicographic order;
//! otherwise the edge is restored. A paper whose candidates all fail is
//! saturated and never revisited. All comparisons run on integer-scaled
//! affinities via cross-multiplication, which is what makes the objective a
//! strictly increasing integer lexicographic quantity and the loop finite.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use revmatch_core::{MatchError, MatchResult, Problem, Solution};

use crate::cancel::CancelToken;
use crate::flow::{self, scaled_score, FlowAssignment};
use crate::metrics;

/// Compare two means given as (scaled sum, count) fractions.
fn cmp_mean(a: (i64, i64), b: (i64, i64)) -> Ordering {
    debug_assert!(a.1 > 0 && b.1 > 0);
    (a.0 as i128 * b.1 as i128).cmp(&(b.0 as i128 * a.1 as i128))
}

/// Minimum per-paper mean of an assignment, as a (sum, count) fraction.
/// Papers that can never hold a reviewer are ignored; papers that could but
/// hold none count as zero.
fn min_paper_mean(problem: &Problem, fa: &FlowAssignment) -> (i64, i64) {
    let stats = fa.paper_stats(problem.num_papers(), problem);
    let mut min: Option<(i64, i64)> = None;
    for (p, &(sum, count)) in stats.iter().enumerate() {
        if problem.max_reviewers(p) == 0 {
            continue;
        }
        let mean = if count == 0 { (0, 1) } else { (sum, count) };
        let lower = match min {
            None => true,
            Some(cur) => cmp_mean(mean, cur) == Ordering::Less,
        };
        if lower {
            min = Some(mean);
        }
    }
    min.unwrap_or((0, 1))
}

/// Lexicographic acceptance test: does `next` beat `cur`?
fn improves(problem: &Problem, cur: &FlowAssignment, next: &FlowAssignment) -> bool {
    let cur_min = min_paper_mean(problem, cur);
    let next_min = min_paper_mean(problem, next);
    match cmp_mean(next_min, cur_min) {
        Ordering::Greater => true,
        Ordering::Equal => next.scaled_affinity > cur.scaled_affinity,
        Ordering::Less => false,
    }
}

pub fn solve(problem: &Problem, cancel: &CancelToken) -> MatchResult<Solution> {
    problem.check_totals()?;
    let mut forbidden: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut current = flow::solve_assignment(problem, &forbidden, cancel)?;

    let papers = problem.num_papers();
    let mut saturated = vec![false; papers];
    let mut iterations = 0usize;
    let mut resolves = 0usize;
    let mut accepted = 0usize;

    loop {
        cancel.check()?;
        let stats = current.paper_stats(papers, problem);

        // Lowest-mean unsaturated paper, ties to the lowest index.
        let mut target: Option<(usize, (i64, i64))> = None;
        for (p, &(sum, count)) in stats.iter().enumerate() {
            if saturated[p] || problem.max_reviewers(p) == 0 {
                continue;
            }
            let mean = if count == 0 { (0, 1) } else { (sum, count) };
            let lower = match target {
                None => true,
                Some((_, best)) => cmp_mean(mean, best) == Ordering::Less,
            };
            if lower {
                target = Some((p, mean));
            }
        }
        let Some((paper, mean)) = target else { break };
        iterations += 1;

        // Below-mean assigned edges, ascending affinity.
        let mut candidates: Vec<(i64, usize)> = current
            .edges
            .iter()
            .filter(|&&(p, _)| p == paper)
            .map(|&(_, r)| (scaled_score(problem.score(paper, r)), r))
            .filter(|&(scaled, _)| (scaled as i128) * (mean.1 as i128) < mean.0 as i128)
            .collect();
        candidates.sort_unstable();

        let mut improved = false;
        for (_, reviewer) in candidates {
            cancel.check()?;
            if problem.is_locked(paper, reviewer) {
                continue;
            }
            forbidden.insert((paper, reviewer));
            match flow::solve_assignment(problem, &forbidden, cancel) {
                Ok(next) => {
                    resolves += 1;
                    if improves(problem, &current, &next) {
                        current = next;
                        accepted += 1;
                        improved = true;
                        break;
                    }
                    forbidden.remove(&(paper, reviewer));
                }
                Err(MatchError::Infeasible(_)) => {
                    resolves += 1;
                    forbidden.remove(&(paper, reviewer));
                }
                Err(other) => return Err(other),
            }
        }
        if !improved {
            saturated[paper] = true;
        }
    }

    let mut solution = Solution::empty(papers);
    for (p, r) in current.edges {
        solution.assignment[p].push(r);
    }
    for reviewers in &mut solution.assignment {
        reviewers.sort_unstable();
    }
    solution.objective = metrics::total_affinity(problem, &solution.assignment);
    solution.diagnostics.insert("fairflow_iterations", iterations);
    solution.diagnostics.insert("fairflow_resolves", resolves);
    solution.diagnostics.insert("fairflow_accepted", accepted);
    solution.diagnostics.insert(
        "fairflow_saturated_papers",
        saturated.iter().filter(|&&s| s).count(),
    );
    Ok(solution)
}
