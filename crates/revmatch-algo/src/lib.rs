//! # revmatch-algo: Paper-Reviewer Assignment Solvers
//!
//! This crate provides the assignment solvers for revmatch, behind a single
//! contract: a validated [`revmatch_core::Problem`] in, a verified
//! [`revmatch_core::Solution`] out.
//!
//! | Solver | Description | Guarantee |
//! |--------|-------------|-----------|
//! | [`SolverKind::MinMax`] | One min-cost flow solve | Optimal total affinity |
//! | [`SolverKind::FairFlow`] | Iterated flow re-solves | Raises the minimum per-paper mean |
//! | [`SolverKind::Randomized`] | LP marginals + dependent rounding | Marginals bounded by the caps, exact in expectation |
//! | [`SolverKind::FairSequence`] | Greedy picking sequence | Weighted envy-freeness up to one item |
//!
//! ## Architecture
//!
//! All solvers are pure functions of their inputs: single-threaded,
//! synchronous, no shared state, no internal retries. MinMax and FairFlow
//! share the [`flow`] network builder and successive-shortest-paths kernel;
//! FairFlow drives it in a loop. The randomized solver builds its LP with
//! `good_lp` over Clarabel and samples with an explicit 64-bit seed, so the
//! same inputs and seed reproduce the same assignment byte for byte.
//!
//! Long solves cooperate with the caller through a [`CancelToken`] probed
//! between flow iterations, rounding rounds, and sequential picks.
//!
//! ## Example
//!
//! ```no_run
//! use revmatch_algo::{AssignmentSolver, SolverKind};
//! use revmatch_core::ProblemBuilder;
//!
//! let problem = ProblemBuilder::new(2, 4)
//!     .add_scores(vec![0.9, 0.8, 0.2, 0.1, 0.1, 0.2, 0.8, 0.9], 1.0)
//!     .paper_demand(1, 2)
//!     .reviewer_load(0, 1)
//!     .build()?;
//! let solution = AssignmentSolver::new(SolverKind::MinMax)
//!     .with_alternates(1)
//!     .solve(&problem)?;
//! println!("total affinity: {:.2}", solution.objective);
//! # Ok::<(), revmatch_core::MatchError>(())
//! ```

pub mod alternates;
pub mod cancel;
pub mod fairflow;
pub mod fairseq;
pub mod flow;
pub mod metrics;
pub mod minmax;
pub mod randomized;
pub mod solver;

pub use cancel::CancelToken;
pub use flow::{feasibility_check, SCALE};
pub use metrics::{paper_means, total_affinity, verify_solution};
pub use solver::{AssignmentSolver, SolverKind};
