//! # revmatch-core: Assignment Problem Modeling Core
//!
//! Provides the canonical data structures shared by every revmatch solver:
//! the validated [`Problem`], the [`Solution`] and serialized [`OutputRecord`]
//! types, and the unified [`MatchError`].
//!
//! ## Data model
//!
//! A problem is a dense bipartite structure over `num_papers × num_reviewers`:
//!
//! - **Effective scores**: any number of weighted score sources merged into
//!   one affinity matrix (`S(p,r) = sum_i w_i * s_i(p,r)`, missing entries 0).
//! - **Quotas**: a demand interval `[min_reviewers, max_reviewers]` per paper
//!   and a load interval `[min_papers, max_papers]` per reviewer.
//! - **Hard constraints**: per pair, conflicted (-1, never assign),
//!   free (0), or locked (+1, always assign).
//! - **Probability limits**: optional per-pair caps on the marginal
//!   assignment probability, consumed only by the randomized solver.
//!
//! A [`Problem`] is constructed once through [`ProblemBuilder`], validated,
//! then immutable. Solvers own their transient graphs and LP tableaux; the
//! returned [`Solution`] is owned by the caller.
//!
//! ## Invariants
//!
//! Every solver output satisfies the quota, load, conflict, lock, and
//! uniqueness invariants, with alternates disjoint from assigned and
//! conflicted reviewers. Solvers that cannot honor a lock or conflict report
//! [`MatchError::Infeasible`] rather than returning a violating assignment.

pub mod error;
pub mod problem;
pub mod solution;

pub use error::{MatchError, MatchResult};
pub use problem::{PairConstraint, Problem, ProblemBuilder};
pub use solution::{Diagnostics, OutputRecord, Solution, SolveStatus};
