//! Unified error types for the revmatch ecosystem
//!
//! This module provides a common error type [`MatchError`] that can represent
//! errors from any part of the system. Every failure a solver can report is a
//! tagged value here, never a panic: validation failures happen before a solve
//! begins, infeasibility and solver faults happen inside one, and cancellation
//! is surfaced when the caller's probe fires.

use thiserror::Error;

/// Unified error type for all revmatch operations.
///
/// The four solver-facing kinds map one-to-one onto the CLI exit codes:
/// `Infeasible` → 1, `Solver` → 2, `Validation` → 3 (success is 0).
#[derive(Error, Debug)]
pub enum MatchError {
    /// Malformed input, rejected before any solve begins. Carries the first
    /// offending field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No assignment satisfies the constraints. Carries a human-readable
    /// diagnostic such as "sum of max_papers < sum of min_reviewers".
    #[error("Infeasible: {0}")]
    Infeasible(String),

    /// Internal numeric failure: LP unbounded or ill-posed, integer overflow
    /// in the flow graph, or a rounding-invariant violation. Fatal to the
    /// solve.
    #[error("Solver error: {0}")]
    Solver(String),

    /// The caller-supplied cancellation probe fired. No partial assignment
    /// is emitted.
    #[error("Solve cancelled")]
    Cancelled,

    /// I/O errors (score files, output files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse errors in score/constraint/quota files
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using MatchError.
pub type MatchResult<T> = Result<T, MatchError>;

impl From<String> for MatchError {
    fn from(s: String) -> Self {
        MatchError::Solver(s)
    }
}

impl From<&str> for MatchError {
    fn from(s: &str) -> Self {
        MatchError::Solver(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MatchError::Infeasible("sum of max_papers < sum of min_reviewers".into());
        assert!(err.to_string().contains("Infeasible"));
        assert!(err.to_string().contains("max_papers"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MatchError = io_err.into();
        assert!(matches!(err, MatchError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> MatchResult<()> {
            Err(MatchError::Validation("min > max".into()))
        }

        fn outer() -> MatchResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
