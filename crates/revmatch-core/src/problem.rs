//! Assignment problem model and validator.
//!
//! A [`Problem`] is the canonical, immutable input to every solver: one
//! effective score matrix (merged from any number of weighted sources),
//! demand/load intervals per paper and reviewer, a hard-constraint matrix,
//! and an optional probability-limit matrix for the randomized solver.
//!
//! Construction goes through [`ProblemBuilder`], which rejects malformed
//! input before a solve can begin. Internal math uses 0-based indices; the
//! opaque string labels exist only for output records.

use crate::{MatchError, MatchResult};

/// Hard-constraint code for a (paper, reviewer) pair.
///
/// Encoded as −1/0/+1 in input matrices: −1 forbids the pair, +1 forces it,
/// 0 leaves it to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairConstraint {
    /// Pair must not appear in the assignment.
    Conflicted,
    /// Pair is unconstrained.
    Free,
    /// Pair must appear in the assignment.
    Locked,
}

impl PairConstraint {
    /// Decode a raw constraint code. Anything outside {−1, 0, +1} is an error.
    pub fn from_code(code: i8) -> MatchResult<Self> {
        match code {
            -1 => Ok(PairConstraint::Conflicted),
            0 => Ok(PairConstraint::Free),
            1 => Ok(PairConstraint::Locked),
            other => Err(MatchError::Validation(format!(
                "unknown constraint code {other} (expected -1, 0 or 1)"
            ))),
        }
    }

    /// The raw matrix encoding of this constraint.
    pub fn code(self) -> i8 {
        match self {
            PairConstraint::Conflicted => -1,
            PairConstraint::Free => 0,
            PairConstraint::Locked => 1,
        }
    }
}

/// Canonical assignment problem. Immutable after [`ProblemBuilder::build`].
#[derive(Debug, Clone)]
pub struct Problem {
    paper_labels: Vec<String>,
    reviewer_labels: Vec<String>,
    /// Effective scores, row-major `num_papers × num_reviewers`.
    scores: Vec<f64>,
    /// Constraint codes, row-major, same shape as `scores`.
    constraints: Vec<i8>,
    min_reviewers: Vec<u32>,
    max_reviewers: Vec<u32>,
    min_papers: Vec<u32>,
    max_papers: Vec<u32>,
    /// Marginal probability caps, row-major; present only when the caller
    /// intends to run the randomized solver.
    probability_limits: Option<Vec<f64>>,
}

impl Problem {
    pub fn num_papers(&self) -> usize {
        self.paper_labels.len()
    }

    pub fn num_reviewers(&self) -> usize {
        self.reviewer_labels.len()
    }

    pub fn paper_label(&self, paper: usize) -> &str {
        &self.paper_labels[paper]
    }

    pub fn reviewer_label(&self, reviewer: usize) -> &str {
        &self.reviewer_labels[reviewer]
    }

    /// Effective affinity of assigning `reviewer` to `paper`.
    pub fn score(&self, paper: usize, reviewer: usize) -> f64 {
        self.scores[paper * self.num_reviewers() + reviewer]
    }

    pub fn constraint(&self, paper: usize, reviewer: usize) -> PairConstraint {
        match self.constraints[paper * self.num_reviewers() + reviewer] {
            -1 => PairConstraint::Conflicted,
            1 => PairConstraint::Locked,
            _ => PairConstraint::Free,
        }
    }

    pub fn is_conflicted(&self, paper: usize, reviewer: usize) -> bool {
        self.constraint(paper, reviewer) == PairConstraint::Conflicted
    }

    pub fn is_locked(&self, paper: usize, reviewer: usize) -> bool {
        self.constraint(paper, reviewer) == PairConstraint::Locked
    }

    pub fn min_reviewers(&self, paper: usize) -> u32 {
        self.min_reviewers[paper]
    }

    pub fn max_reviewers(&self, paper: usize) -> u32 {
        self.max_reviewers[paper]
    }

    pub fn min_papers(&self, reviewer: usize) -> u32 {
        self.min_papers[reviewer]
    }

    pub fn max_papers(&self, reviewer: usize) -> u32 {
        self.max_papers[reviewer]
    }

    /// Probability cap for a pair, if limits were supplied.
    pub fn probability_limit(&self, paper: usize, reviewer: usize) -> Option<f64> {
        self.probability_limits
            .as_ref()
            .map(|q| q[paper * self.reviewer_labels.len() + reviewer])
    }

    pub fn has_probability_limits(&self) -> bool {
        self.probability_limits.is_some()
    }

    /// All locked pairs in ascending (paper, reviewer) order.
    pub fn locked_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for paper in 0..self.num_papers() {
            for reviewer in 0..self.num_reviewers() {
                if self.is_locked(paper, reviewer) {
                    pairs.push((paper, reviewer));
                }
            }
        }
        pairs
    }

    /// Aggregate demand/supply sanity checks.
    ///
    /// Necessary (not sufficient) conditions for feasibility; the flow-based
    /// check in the solver crate proves the rest.
    pub fn check_totals(&self) -> MatchResult<()> {
        let total_min_reviewers: u64 = self.min_reviewers.iter().map(|&m| u64::from(m)).sum();
        let total_max_papers: u64 = self.max_papers.iter().map(|&m| u64::from(m)).sum();
        if total_min_reviewers > total_max_papers {
            return Err(MatchError::Infeasible(format!(
                "sum of max_papers ({total_max_papers}) < sum of min_reviewers ({total_min_reviewers})"
            )));
        }
        let total_min_papers: u64 = self.min_papers.iter().map(|&m| u64::from(m)).sum();
        let total_max_reviewers: u64 = self.max_reviewers.iter().map(|&m| u64::from(m)).sum();
        if total_min_papers > total_max_reviewers {
            return Err(MatchError::Infeasible(format!(
                "sum of max_reviewers ({total_max_reviewers}) < sum of min_papers ({total_min_papers})"
            )));
        }
        Ok(())
    }
}

/// Builder for [`Problem`].
///
/// Quotas take a scalar default with per-entity overrides. Score sources
/// accumulate with weights; constraint sources merge, with a pair that is
/// locked in one source and conflicted in another rejected outright.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    num_papers: usize,
    num_reviewers: usize,
    paper_labels: Option<Vec<String>>,
    reviewer_labels: Option<Vec<String>>,
    score_sources: Vec<Vec<f64>>,
    weights: Vec<f64>,
    constraints: Vec<i8>,
    min_reviewers: Vec<u32>,
    max_reviewers: Vec<u32>,
    min_papers: Vec<u32>,
    max_papers: Vec<u32>,
    probability_limits: Option<Vec<f64>>,
}

impl ProblemBuilder {
    /// Start a problem of the given shape. Default quotas are
    /// min 0 / max 1 on both sides until overridden.
    pub fn new(num_papers: usize, num_reviewers: usize) -> Self {
        Self {
            num_papers,
            num_reviewers,
            paper_labels: None,
            reviewer_labels: None,
            score_sources: Vec::new(),
            weights: Vec::new(),
            constraints: vec![0; num_papers * num_reviewers],
            min_reviewers: vec![0; num_papers],
            max_reviewers: vec![1; num_papers],
            min_papers: vec![0; num_reviewers],
            max_papers: vec![1; num_reviewers],
            probability_limits: None,
        }
    }

    pub fn with_paper_labels(mut self, labels: Vec<String>) -> Self {
        self.paper_labels = Some(labels);
        self
    }

    pub fn with_reviewer_labels(mut self, labels: Vec<String>) -> Self {
        self.reviewer_labels = Some(labels);
        self
    }

    /// Add a dense row-major score source with its weight. Weights may be
    /// negative (penalty sources).
    pub fn add_scores(mut self, scores: Vec<f64>, weight: f64) -> Self {
        self.score_sources.push(scores);
        self.weights.push(weight);
        self
    }

    /// Scalar default demand interval applied to every paper.
    pub fn paper_demand(mut self, min: u32, max: u32) -> Self {
        self.min_reviewers = vec![min; self.num_papers];
        self.max_reviewers = vec![max; self.num_papers];
        self
    }

    /// Per-paper demand override.
    pub fn paper_demand_for(mut self, paper: usize, min: u32, max: u32) -> Self {
        if paper < self.num_papers {
            self.min_reviewers[paper] = min;
            self.max_reviewers[paper] = max;
        }
        self
    }

    /// Scalar default load interval applied to every reviewer.
    pub fn reviewer_load(mut self, min: u32, max: u32) -> Self {
        self.min_papers = vec![min; self.num_reviewers];
        self.max_papers = vec![max; self.num_reviewers];
        self
    }

    /// Per-reviewer load override.
    pub fn reviewer_load_for(mut self, reviewer: usize, min: u32, max: u32) -> Self {
        if reviewer < self.num_reviewers {
            self.min_papers[reviewer] = min;
            self.max_papers[reviewer] = max;
        }
        self
    }

    /// Merge a dense row-major constraint source into the builder.
    ///
    /// Free cells defer to the other source; locked+conflicted on the same
    /// pair is an error surfaced at [`ProblemBuilder::build`].
    pub fn add_constraints(mut self, constraints: Vec<i8>) -> Self {
        // Merge conflicts are detected in build() so the builder chain stays
        // infallible; the sentinel i8::MIN marks a contradictory pair.
        for (slot, &code) in self.constraints.iter_mut().zip(constraints.iter()) {
            *slot = match (*slot, code) {
                (cur, 0) => cur,
                (0, new) => new,
                (cur, new) if cur == new => cur,
                _ => i8::MIN,
            };
        }
        self
    }

    pub fn set_constraint(mut self, paper: usize, reviewer: usize, c: PairConstraint) -> Self {
        if paper < self.num_papers && reviewer < self.num_reviewers {
            self.constraints[paper * self.num_reviewers + reviewer] = c.code();
        }
        self
    }

    /// Dense row-major probability caps for the randomized solver.
    pub fn with_probability_limits(mut self, limits: Vec<f64>) -> Self {
        self.probability_limits = Some(limits);
        self
    }

    /// Validate and produce the canonical problem.
    pub fn build(self) -> MatchResult<Problem> {
        let cells = self.num_papers * self.num_reviewers;

        let paper_labels = match self.paper_labels {
            Some(labels) => {
                if labels.len() != self.num_papers {
                    return Err(MatchError::Validation(format!(
                        "paper_labels has {} entries, expected {}",
                        labels.len(),
                        self.num_papers
                    )));
                }
                labels
            }
            None => (0..self.num_papers).map(|p| format!("paper{p}")).collect(),
        };
        let reviewer_labels = match self.reviewer_labels {
            Some(labels) => {
                if labels.len() != self.num_reviewers {
                    return Err(MatchError::Validation(format!(
                        "reviewer_labels has {} entries, expected {}",
                        labels.len(),
                        self.num_reviewers
                    )));
                }
                labels
            }
            None => (0..self.num_reviewers)
                .map(|r| format!("reviewer{r}"))
                .collect(),
        };

        for (i, source) in self.score_sources.iter().enumerate() {
            if source.len() != cells {
                return Err(MatchError::Validation(format!(
                    "score source {i} has {} entries, expected {cells}",
                    source.len()
                )));
            }
            if let Some(bad) = source.iter().find(|v| !v.is_finite()) {
                return Err(MatchError::Validation(format!(
                    "score source {i} contains non-finite value {bad}"
                )));
            }
        }
        if let Some(bad) = self.weights.iter().find(|w| !w.is_finite()) {
            return Err(MatchError::Validation(format!(
                "non-finite score weight {bad}"
            )));
        }

        if self.constraints.len() != cells {
            return Err(MatchError::Validation(format!(
                "constraint matrix has {} entries, expected {cells}",
                self.constraints.len()
            )));
        }
        for (idx, &code) in self.constraints.iter().enumerate() {
            if code == i8::MIN {
                return Err(MatchError::Validation(format!(
                    "pair (paper {}, reviewer {}) is both locked and conflicted",
                    idx / self.num_reviewers,
                    idx % self.num_reviewers
                )));
            }
            PairConstraint::from_code(code)?;
        }

        for paper in 0..self.num_papers {
            if self.min_reviewers[paper] > self.max_reviewers[paper] {
                return Err(MatchError::Validation(format!(
                    "paper {}: min_reviewers {} > max_reviewers {}",
                    paper_labels[paper], self.min_reviewers[paper], self.max_reviewers[paper]
                )));
            }
        }
        for reviewer in 0..self.num_reviewers {
            if self.min_papers[reviewer] > self.max_papers[reviewer] {
                return Err(MatchError::Validation(format!(
                    "reviewer {}: min_papers {} > max_papers {}",
                    reviewer_labels[reviewer], self.min_papers[reviewer], self.max_papers[reviewer]
                )));
            }
        }

        if let Some(limits) = &self.probability_limits {
            if limits.len() != cells {
                return Err(MatchError::Validation(format!(
                    "probability_limits has {} entries, expected {cells}",
                    limits.len()
                )));
            }
            for (idx, &q) in limits.iter().enumerate() {
                if !q.is_finite() || !(0.0..=1.0).contains(&q) {
                    return Err(MatchError::Validation(format!(
                        "probability limit {q} at (paper {}, reviewer {}) outside [0, 1]",
                        idx / self.num_reviewers,
                        idx % self.num_reviewers
                    )));
                }
                if self.constraints[idx] == 1 && q != 1.0 {
                    return Err(MatchError::Validation(format!(
                        "locked pair (paper {}, reviewer {}) has probability limit {q}, must be 1",
                        idx / self.num_reviewers,
                        idx % self.num_reviewers
                    )));
                }
            }
        }

        // Locked pairs must fit inside the entities' intervals.
        let mut locked_per_paper = vec![0u32; self.num_papers];
        let mut locked_per_reviewer = vec![0u32; self.num_reviewers];
        for (idx, &code) in self.constraints.iter().enumerate() {
            if code == 1 {
                locked_per_paper[idx / self.num_reviewers] += 1;
                locked_per_reviewer[idx % self.num_reviewers] += 1;
            }
        }
        for paper in 0..self.num_papers {
            if locked_per_paper[paper] > self.max_reviewers[paper] {
                return Err(MatchError::Validation(format!(
                    "paper {}: {} locked reviewers exceed max_reviewers {}",
                    paper_labels[paper], locked_per_paper[paper], self.max_reviewers[paper]
                )));
            }
        }
        for reviewer in 0..self.num_reviewers {
            if locked_per_reviewer[reviewer] > self.max_papers[reviewer] {
                return Err(MatchError::Validation(format!(
                    "reviewer {}: {} locked papers exceed max_papers {}",
                    reviewer_labels[reviewer], locked_per_reviewer[reviewer], self.max_papers[reviewer]
                )));
            }
        }

        // Merge weighted sources into one effective matrix.
        let mut scores = vec![0.0f64; cells];
        for (source, &weight) in self.score_sources.iter().zip(self.weights.iter()) {
            for (acc, &value) in scores.iter_mut().zip(source.iter()) {
                *acc += weight * value;
            }
        }

        Ok(Problem {
            paper_labels,
            reviewer_labels,
            scores,
            constraints: self.constraints,
            min_reviewers: self.min_reviewers,
            max_reviewers: self.max_reviewers,
            min_papers: self.min_papers,
            max_papers: self.max_papers,
            probability_limits: self.probability_limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(scores: Vec<f64>) -> ProblemBuilder {
        let n = (scores.len() as f64).sqrt() as usize;
        ProblemBuilder::new(n, n)
            .add_scores(scores, 1.0)
            .paper_demand(1, 1)
            .reviewer_load(1, 1)
    }

    #[test]
    fn test_weighted_score_merge() {
        let problem = ProblemBuilder::new(1, 2)
            .add_scores(vec![0.5, 0.2], 2.0)
            .add_scores(vec![0.1, 0.3], -1.0)
            .build()
            .unwrap();
        assert!((problem.score(0, 0) - 0.9).abs() < 1e-12);
        assert!((problem.score(0, 1) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_missing_scores_default_zero() {
        let problem = ProblemBuilder::new(2, 2).build().unwrap();
        assert_eq!(problem.score(1, 1), 0.0);
    }

    #[test]
    fn test_min_above_max_rejected() {
        let err = ProblemBuilder::new(1, 1)
            .paper_demand(2, 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, MatchError::Validation(_)));
    }

    #[test]
    fn test_unknown_constraint_code_rejected() {
        let err = square(vec![1.0, 0.0, 0.0, 1.0])
            .add_constraints(vec![0, 3, 0, 0])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("constraint code"));
    }

    #[test]
    fn test_locked_and_conflicted_rejected() {
        let err = square(vec![1.0, 0.0, 0.0, 1.0])
            .add_constraints(vec![1, 0, 0, 0])
            .add_constraints(vec![-1, 0, 0, 0])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("both locked and conflicted"));
    }

    #[test]
    fn test_locked_probability_limit_must_be_one() {
        let err = square(vec![1.0, 0.0, 0.0, 1.0])
            .set_constraint(0, 1, PairConstraint::Locked)
            .with_probability_limits(vec![1.0, 0.5, 1.0, 1.0])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must be 1"));
    }

    #[test]
    fn test_locked_exceeding_max_rejected() {
        let err = ProblemBuilder::new(1, 2)
            .paper_demand(1, 1)
            .set_constraint(0, 0, PairConstraint::Locked)
            .set_constraint(0, 1, PairConstraint::Locked)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("locked reviewers exceed"));
    }

    #[test]
    fn test_totals_infeasible() {
        // 2 papers needing one reviewer each, one reviewer with room for one.
        let problem = ProblemBuilder::new(2, 1)
            .paper_demand(1, 1)
            .reviewer_load(0, 1)
            .build()
            .unwrap();
        let err = problem.check_totals().unwrap_err();
        assert!(matches!(err, MatchError::Infeasible(_)));
        assert!(err.to_string().contains("sum of max_papers"));
    }

    #[test]
    fn test_locked_pairs_ordering() {
        let problem = square(vec![1.0, 0.0, 0.0, 1.0])
            .set_constraint(1, 0, PairConstraint::Locked)
            .set_constraint(0, 1, PairConstraint::Locked)
            .build()
            .unwrap();
        assert_eq!(problem.locked_pairs(), vec![(0, 1), (1, 0)]);
    }
}
