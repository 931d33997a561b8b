//! FairSequence solver: greedy priority-based allocation targeting weighted
//! envy-freeness up to one item (WEF1).
//!
//! Papers take turns picking their best remaining reviewer, with the turn
//! going to the paper with the smallest filled fraction of its demand
//! (a weighted picking sequence). Ties go to the paper with the better best
//! available reviewer, then to the lower paper index. A repair pass then
//! covers paper minimums by pulling reviewers from donors with slack,
//! choosing the move that loses the least affinity. Affinity is not globally
//! optimal here; the payoff is the WEF1 fairness guarantee.

use std::cmp::Ordering;

use revmatch_core::{MatchError, MatchResult, Problem, Solution};

use crate::cancel::CancelToken;
use crate::metrics;

/// Filled fraction comparison: `a.0 / a.1` vs `b.0 / b.1` without division.
fn cmp_fill(a: (u64, u64), b: (u64, u64)) -> Ordering {
    (a.0 as u128 * b.1 as u128).cmp(&(b.0 as u128 * a.1 as u128))
}

/// Best eligible reviewer for `paper`: highest affinity, ties to the lowest
/// reviewer index.
fn best_reviewer(
    problem: &Problem,
    paper: usize,
    assigned: &[Vec<bool>],
    load: &[u32],
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for r in 0..problem.num_reviewers() {
        if assigned[paper][r] || problem.is_conflicted(paper, r) || load[r] >= problem.max_papers(r)
        {
            continue;
        }
        let score = problem.score(paper, r);
        let better = match best {
            None => true,
            Some((_, cur)) => score > cur,
        };
        if better {
            best = Some((r, score));
        }
    }
    best
}

pub fn solve(problem: &Problem, cancel: &CancelToken) -> MatchResult<Solution> {
    problem.check_totals()?;
    let papers = problem.num_papers();
    let reviewers = problem.num_reviewers();

    let mut allocation: Vec<Vec<usize>> = vec![Vec::new(); papers];
    let mut assigned = vec![vec![false; reviewers]; papers];
    let mut load = vec![0u32; reviewers];

    // Locked pairs are owed regardless of priority; seed them first.
    for (p, r) in problem.locked_pairs() {
        allocation[p].push(r);
        assigned[p][r] = true;
        load[r] += 1;
    }

    let mut picks = 0usize;
    loop {
        cancel.check()?;

        // Highest-priority paper with remaining demand and an eligible
        // reviewer; priority is the smallest filled fraction of demand.
        let mut turn: Option<(usize, (u64, u64), usize, f64)> = None;
        for p in 0..papers {
            let demand = problem.max_reviewers(p) as u64;
            if demand == 0 || allocation[p].len() as u64 >= demand {
                continue;
            }
            let Some((r, score)) = best_reviewer(problem, p, &assigned, &load) else {
                continue;
            };
            let fill = (allocation[p].len() as u64, demand);
            let wins = match &turn {
                None => true,
                Some((_, best_fill, _, best_score)) => match cmp_fill(fill, *best_fill) {
                    Ordering::Less => true,
                    Ordering::Greater => false,
                    Ordering::Equal => score > *best_score,
                },
            };
            if wins {
                turn = Some((p, fill, r, score));
            }
        }
        let Some((p, _, r, _)) = turn else { break };
        allocation[p].push(r);
        assigned[p][r] = true;
        load[r] += 1;
        picks += 1;
    }

    // Repair pass: papers short of their minimum pull a reviewer from a
    // donor strictly above its own minimum, losing as little affinity as
    // possible.
    let mut repairs = 0usize;
    for p in 0..papers {
        while (allocation[p].len() as u32) < problem.min_reviewers(p) {
            cancel.check()?;
            let mut best_move: Option<(f64, usize, usize)> = None;
            for donor in 0..papers {
                if donor == p || allocation[donor].len() as u32 <= problem.min_reviewers(donor) {
                    continue;
                }
                for &r in &allocation[donor] {
                    if problem.is_locked(donor, r)
                        || assigned[p][r]
                        || problem.is_conflicted(p, r)
                    {
                        continue;
                    }
                    let loss = problem.score(donor, r) - problem.score(p, r);
                    let better = match best_move {
                        None => true,
                        Some((cur, _, _)) => loss < cur,
                    };
                    if better {
                        best_move = Some((loss, donor, r));
                    }
                }
            }
            let Some((_, donor, r)) = best_move else {
                return Err(MatchError::Infeasible(format!(
                    "paper {} cannot reach min_reviewers {} under sequential allocation",
                    problem.paper_label(p),
                    problem.min_reviewers(p)
                )));
            };
            allocation[donor].retain(|&held| held != r);
            assigned[donor][r] = false;
            allocation[p].push(r);
            assigned[p][r] = true;
            repairs += 1;
        }
    }

    // Reviewer minimums have no repair heuristic here; the invariants are
    // hard, so an unmet load minimum is infeasibility for this solver.
    for r in 0..reviewers {
        if load[r] < problem.min_papers(r) {
            return Err(MatchError::Infeasible(format!(
                "reviewer {} holds {} papers, below min_papers {} under sequential allocation",
                problem.reviewer_label(r),
                load[r],
                problem.min_papers(r)
            )));
        }
    }

    let mut solution = Solution::empty(papers);
    solution.assignment = allocation;
    for held in &mut solution.assignment {
        held.sort_unstable();
    }
    solution.objective = metrics::total_affinity(problem, &solution.assignment);
    solution.diagnostics.insert("fairseq_picks", picks);
    solution.diagnostics.insert("fairseq_repairs", repairs);
    Ok(solution)
}
