//! Bipartite min-cost flow: the shared network builder and solver kernel.
//!
//! MinMax and FairFlow both reduce to one construction: a directed network
//! `S → reviewers → papers → T` with integer capacities and integer costs,
//! where pair edges carry `round(−affinity · SCALE)` so that minimizing cost
//! maximizes affinity. Quota minimums use node splitting: each side gets a
//! mandatory leg (capacity = min) carrying a large uniform cost bonus and an
//! optional leg (capacity = max − min) at cost 0, so every min-cost maximum
//! flow saturates the mandatory legs whenever the minimums are satisfiable
//! at all. An unsaturated mandatory leg after the solve is infeasibility.
//!
//! Locked pairs never enter the network: they are pre-committed by shrinking
//! the pair's remaining quota intervals and appended to the output
//! unconditionally. Conflicted and forbidden pairs produce no edge.
//!
//! The kernel is successive shortest paths with Johnson potentials: a
//! Bellman-Ford pass absorbs the negative costs, after which each
//! augmentation is a Dijkstra search on reduced costs. Augmenting along a
//! shortest path never reduces any node's throughput, so saturating flows
//! survive augmentation and checking the mandatory legs once at the end is
//! sound.

use std::collections::BTreeSet;

use revmatch_core::{MatchError, MatchResult, Problem};

use crate::cancel::CancelToken;

/// Fixed-point factor turning real affinities into integer flow costs.
pub const SCALE: f64 = 10_000.0;

/// Edge-insertion stride between cancellation probes.
const CANCEL_STRIDE: usize = 10_000;

const INF: i64 = i64::MAX / 4;

/// Affinity in integer cost units (positive = good).
pub(crate) fn scaled_score(score: f64) -> i64 {
    (score * SCALE).round() as i64
}

#[derive(Debug, Clone)]
struct Edge {
    from: usize,
    to: usize,
    cap: i64,
    cost: i64,
    flow: i64,
}

/// Residual flow network. Edges are stored in forward/backward pairs so the
/// partner of edge `e` is always `e ^ 1`.
#[derive(Debug)]
struct FlowGraph {
    adj: Vec<Vec<usize>>,
    edges: Vec<Edge>,
}

impl FlowGraph {
    fn new(num_nodes: usize) -> Self {
        Self {
            adj: vec![Vec::new(); num_nodes],
            edges: Vec::new(),
        }
    }

    fn num_nodes(&self) -> usize {
        self.adj.len()
    }

    /// Add a forward edge and its zero-capacity residual partner.
    fn add_edge(&mut self, from: usize, to: usize, cap: i64, cost: i64) -> usize {
        let id = self.edges.len();
        self.adj[from].push(id);
        self.edges.push(Edge {
            from,
            to,
            cap,
            cost,
            flow: 0,
        });
        self.adj[to].push(id + 1);
        self.edges.push(Edge {
            from: to,
            to: from,
            cap: 0,
            cost: -cost,
            flow: 0,
        });
        id
    }

    fn residual(&self, e: usize) -> i64 {
        self.edges[e].cap - self.edges[e].flow
    }

    fn flow_of(&self, e: usize) -> i64 {
        self.edges[e].flow
    }

    /// Min-cost flow of maximum value up to `flow_limit`, successive
    /// shortest paths. Returns (total cost, total flow).
    fn solve(&mut self, source: usize, sink: usize, flow_limit: i64) -> (i64, i64) {
        let n = self.num_nodes();

        // Johnson potentials; the zero-initialized Bellman-Ford relaxation
        // absorbs the negative edge costs present before any flow exists.
        let mut pot = vec![0i64; n];
        for _ in 1..n {
            let mut changed = false;
            for edge in &self.edges {
                if edge.cap > edge.flow {
                    let cand = pot[edge.from] + edge.cost;
                    if cand < pot[edge.to] {
                        pot[edge.to] = cand;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let (mut total_cost, mut total_flow) = (0i64, 0i64);
        while total_flow < flow_limit {
            // Dijkstra on reduced costs.
            let mut dist = vec![INF; n];
            let mut parent: Vec<Option<usize>> = vec![None; n];
            let mut heap = std::collections::BinaryHeap::new();
            dist[source] = 0;
            heap.push(std::cmp::Reverse((0i64, source)));
            while let Some(std::cmp::Reverse((d, u))) = heap.pop() {
                if d > dist[u] {
                    continue;
                }
                for &e in &self.adj[u] {
                    let edge = &self.edges[e];
                    if edge.cap <= edge.flow {
                        continue;
                    }
                    let next = d + edge.cost + pot[u] - pot[edge.to];
                    if next < dist[edge.to] {
                        dist[edge.to] = next;
                        parent[edge.to] = Some(e);
                        heap.push(std::cmp::Reverse((next, edge.to)));
                    }
                }
            }
            if dist[sink] >= INF {
                break;
            }
            for v in 0..n {
                if dist[v] < INF {
                    pot[v] += dist[v];
                }
            }

            let mut push = flow_limit - total_flow;
            let mut v = sink;
            while let Some(e) = parent[v] {
                push = push.min(self.residual(e));
                v = self.edges[e].from;
            }
            let mut v = sink;
            while let Some(e) = parent[v] {
                self.edges[e].flow += push;
                self.edges[e ^ 1].flow -= push;
                total_cost += push * self.edges[e].cost;
                v = self.edges[e].from;
            }
            total_flow += push;
        }
        (total_cost, total_flow)
    }
}

/// One solved assignment, locked pairs included.
#[derive(Debug, Clone)]
pub(crate) struct FlowAssignment {
    /// Assigned pairs in ascending (paper, reviewer) order.
    pub edges: Vec<(usize, usize)>,
    /// Total affinity in integer cost units.
    pub scaled_affinity: i64,
}

impl FlowAssignment {
    /// Per-paper (scaled affinity sum, assigned count).
    pub fn paper_stats(&self, num_papers: usize, problem: &Problem) -> Vec<(i64, i64)> {
        let mut stats = vec![(0i64, 0i64); num_papers];
        for &(p, r) in &self.edges {
            stats[p].0 += scaled_score(problem.score(p, r));
            stats[p].1 += 1;
        }
        stats
    }
}

/// Solve the assignment flow for `problem` with `forbidden` pairs removed
/// from the free edge set.
///
/// Errors: `Infeasible` when the quota minimums cannot all be met,
/// `Solver` when affinity magnitudes overflow the integer cost range,
/// `Cancelled` when the probe fires during edge insertion.
pub(crate) fn solve_assignment(
    problem: &Problem,
    forbidden: &BTreeSet<(usize, usize)>,
    cancel: &CancelToken,
) -> MatchResult<FlowAssignment> {
    let papers = problem.num_papers();
    let reviewers = problem.num_reviewers();

    // Lock pre-commit: shrink both ends' intervals, keep the pair aside.
    let locked = problem.locked_pairs();
    let mut min_reviewers: Vec<i64> = (0..papers).map(|p| problem.min_reviewers(p) as i64).collect();
    let mut max_reviewers: Vec<i64> = (0..papers).map(|p| problem.max_reviewers(p) as i64).collect();
    let mut min_papers: Vec<i64> = (0..reviewers).map(|r| problem.min_papers(r) as i64).collect();
    let mut max_papers: Vec<i64> = (0..reviewers).map(|r| problem.max_papers(r) as i64).collect();
    for &(p, r) in &locked {
        max_reviewers[p] -= 1;
        min_reviewers[p] = (min_reviewers[p] - 1).max(0);
        max_papers[r] -= 1;
        min_papers[r] = (min_papers[r] - 1).max(0);
    }

    // Free pair edges, ascending (paper, reviewer) for determinism.
    let mut pair_costs: Vec<(usize, usize, i64)> = Vec::new();
    let mut max_abs_cost: i64 = 0;
    let mut inserted = 0usize;
    for p in 0..papers {
        if max_reviewers[p] == 0 {
            continue;
        }
        for r in 0..reviewers {
            if max_papers[r] == 0
                || problem.is_conflicted(p, r)
                || problem.is_locked(p, r)
                || forbidden.contains(&(p, r))
            {
                continue;
            }
            inserted += 1;
            if inserted % CANCEL_STRIDE == 0 {
                cancel.check()?;
            }
            let raw = -problem.score(p, r) * SCALE;
            if raw.abs() >= 1e15 {
                return Err(MatchError::Solver(format!(
                    "scaled affinity {raw} at (paper {p}, reviewer {r}) exceeds integer cost range"
                )));
            }
            let cost = raw.round() as i64;
            max_abs_cost = max_abs_cost.max(cost.abs());
            pair_costs.push((p, r, cost));
        }
    }

    let flow_limit: i64 = max_reviewers.iter().sum();
    let num_nodes = 2 + reviewers + papers;

    // The mandatory-leg bonus must outweigh any achievable affinity total,
    // and the worst-case path and total costs must stay inside i64.
    let bonus_wide = (pair_costs.len() as i128 + 1) * (max_abs_cost as i128 + 1);
    let worst_path = (num_nodes as i128 + 1) * (bonus_wide + max_abs_cost as i128);
    if worst_path * (flow_limit as i128 + 1) >= INF as i128 {
        return Err(MatchError::Solver(
            "problem too large for integer cost range (scaled costs overflow i64)".into(),
        ));
    }
    let bonus = bonus_wide as i64;

    let source = 0usize;
    let sink = 1usize;
    let reviewer_node = |r: usize| 2 + r;
    let paper_node = |p: usize| 2 + reviewers + p;

    let mut graph = FlowGraph::new(num_nodes);
    let mut mandatory: Vec<usize> = Vec::new();
    for r in 0..reviewers {
        if min_papers[r] > 0 {
            mandatory.push(graph.add_edge(source, reviewer_node(r), min_papers[r], -bonus));
        }
        if max_papers[r] > min_papers[r] {
            graph.add_edge(source, reviewer_node(r), max_papers[r] - min_papers[r], 0);
        }
    }
    for p in 0..papers {
        if min_reviewers[p] > 0 {
            mandatory.push(graph.add_edge(paper_node(p), sink, min_reviewers[p], -bonus));
        }
        if max_reviewers[p] > min_reviewers[p] {
            graph.add_edge(paper_node(p), sink, max_reviewers[p] - min_reviewers[p], 0);
        }
    }
    let mut pair_ids: Vec<(usize, usize, usize)> = Vec::with_capacity(pair_costs.len());
    for &(p, r, cost) in &pair_costs {
        let id = graph.add_edge(reviewer_node(r), paper_node(p), 1, cost);
        pair_ids.push((p, r, id));
    }

    graph.solve(source, sink, flow_limit);

    for &e in &mandatory {
        if graph.residual(e) != 0 {
            return Err(MatchError::Infeasible(
                "quota minimums cannot be satisfied: lower-bound flow is unsaturated".into(),
            ));
        }
    }

    let mut edges = locked;
    for &(p, r, e) in &pair_ids {
        if graph.flow_of(e) == 1 {
            edges.push((p, r));
        }
    }
    edges.sort_unstable();
    let scaled_affinity = edges
        .iter()
        .map(|&(p, r)| scaled_score(problem.score(p, r)))
        .sum();
    Ok(FlowAssignment {
        edges,
        scaled_affinity,
    })
}

/// Feasibility check: aggregate totals plus a flow solve over the
/// hard-constraint graph proving all minimums reachable.
pub fn feasibility_check(problem: &Problem) -> MatchResult<()> {
    problem.check_totals()?;
    let cancel = CancelToken::new();
    solve_assignment(problem, &BTreeSet::new(), &cancel).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use revmatch_core::{PairConstraint, ProblemBuilder};

    fn two_by_two() -> ProblemBuilder {
        ProblemBuilder::new(2, 2)
            .add_scores(vec![1.0, 0.1, 0.1, 1.0], 1.0)
            .paper_demand(1, 1)
            .reviewer_load(1, 1)
    }

    #[test]
    fn test_kernel_min_cost_matching() {
        // 3 workers, 3 jobs, pick the cheapest perfect matching.
        let costs = [[5i64, 3, 2], [1, 4, 8], [7, 6, 9]];
        let mut graph = FlowGraph::new(8);
        for i in 0..3 {
            graph.add_edge(0, 2 + i, 1, 0);
            graph.add_edge(5 + i, 1, 1, 0);
        }
        for (i, row) in costs.iter().enumerate() {
            for (j, &c) in row.iter().enumerate() {
                graph.add_edge(2 + i, 5 + j, 1, c);
            }
        }
        let (cost, flow) = graph.solve(0, 1, 3);
        assert_eq!(flow, 3);
        assert_eq!(cost, 2 + 1 + 6);
    }

    #[test]
    fn test_optimal_diagonal() {
        let problem = two_by_two().build().unwrap();
        let fa = solve_assignment(&problem, &BTreeSet::new(), &CancelToken::new()).unwrap();
        assert_eq!(fa.edges, vec![(0, 0), (1, 1)]);
        assert_eq!(fa.scaled_affinity, 20_000);
    }

    #[test]
    fn test_conflict_forces_swap() {
        let problem = two_by_two()
            .set_constraint(0, 0, PairConstraint::Conflicted)
            .build()
            .unwrap();
        let fa = solve_assignment(&problem, &BTreeSet::new(), &CancelToken::new()).unwrap();
        assert_eq!(fa.edges, vec![(0, 1), (1, 0)]);
        assert_eq!(fa.scaled_affinity, 2_000);
    }

    #[test]
    fn test_lock_overrides_optimum() {
        let problem = two_by_two()
            .set_constraint(0, 1, PairConstraint::Locked)
            .build()
            .unwrap();
        let fa = solve_assignment(&problem, &BTreeSet::new(), &CancelToken::new()).unwrap();
        assert_eq!(fa.edges, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_forbidden_edge_excluded() {
        let problem = two_by_two().build().unwrap();
        let mut forbidden = BTreeSet::new();
        forbidden.insert((0usize, 0usize));
        let fa = solve_assignment(&problem, &forbidden, &CancelToken::new()).unwrap();
        assert_eq!(fa.edges, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_infeasible_minimums() {
        // Two papers demand a reviewer each; the lone reviewer takes one.
        let problem = ProblemBuilder::new(2, 1)
            .paper_demand(1, 1)
            .reviewer_load(0, 1)
            .build()
            .unwrap();
        let err = solve_assignment(&problem, &BTreeSet::new(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, MatchError::Infeasible(_)));
    }

    #[test]
    fn test_minimums_filled_before_affinity() {
        // Reviewer 1 has min_papers 1 but the worse affinity everywhere;
        // the solve must still route a paper through it.
        let problem = ProblemBuilder::new(2, 2)
            .add_scores(vec![0.9, 0.1, 0.8, 0.1], 1.0)
            .paper_demand(1, 1)
            .reviewer_load_for(0, 0, 2)
            .reviewer_load_for(1, 1, 2)
            .build()
            .unwrap();
        let fa = solve_assignment(&problem, &BTreeSet::new(), &CancelToken::new()).unwrap();
        assert!(fa.edges.iter().any(|&(_, r)| r == 1));
        assert_eq!(fa.edges.len(), 2);
    }

    #[test]
    fn test_feasibility_check_passes() {
        let problem = two_by_two().build().unwrap();
        assert!(feasibility_check(&problem).is_ok());
    }

    #[test]
    fn test_cancelled_before_solve() {
        // Probe checks are strided, so drive enough edges through the builder.
        let n = 150;
        let problem = ProblemBuilder::new(n, n)
            .paper_demand(0, 1)
            .reviewer_load(0, 1)
            .build()
            .unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = solve_assignment(&problem, &BTreeSet::new(), &cancel).unwrap_err();
        assert!(matches!(err, MatchError::Cancelled));
    }
}
