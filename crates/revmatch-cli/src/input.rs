//! Score, constraint, and quota file parsing.
//!
//! All input files are whitespace-separated records, one per line, keyed by
//! the opaque paper/reviewer identifiers. Blank lines and `#` comments are
//! skipped. The union of identifiers seen across every file defines the
//! problem; identifiers are indexed in sorted order so repeated runs build
//! the identical problem.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use revmatch_core::{MatchError, MatchResult, PairConstraint, Problem, ProblemBuilder};

/// A parsed "paper reviewer value" record.
#[derive(Debug, Clone)]
pub struct PairRecord {
    pub paper: String,
    pub reviewer: String,
    pub value: f64,
}

/// Parse a pair-record file.
pub fn parse_pair_file(path: &Path) -> MatchResult<Vec<PairRecord>> {
    let text = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(paper), Some(reviewer), Some(raw)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(MatchError::Parse(format!(
                "{}:{}: expected \"paper reviewer value\"",
                path.display(),
                lineno + 1
            )));
        };
        let value: f64 = raw.parse().map_err(|_| {
            MatchError::Parse(format!(
                "{}:{}: invalid value {raw:?}",
                path.display(),
                lineno + 1
            ))
        })?;
        records.push(PairRecord {
            paper: paper.to_string(),
            reviewer: reviewer.to_string(),
            value,
        });
    }
    Ok(records)
}

/// Parse an "id min max" quota override file.
pub fn parse_quota_file(path: &Path) -> MatchResult<Vec<(String, u32, u32)>> {
    let text = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(id), Some(min), Some(max)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(MatchError::Parse(format!(
                "{}:{}: expected \"id min max\"",
                path.display(),
                lineno + 1
            )));
        };
        let parse = |raw: &str| -> MatchResult<u32> {
            raw.parse().map_err(|_| {
                MatchError::Parse(format!(
                    "{}:{}: invalid quota {raw:?}",
                    path.display(),
                    lineno + 1
                ))
            })
        };
        records.push((id.to_string(), parse(min)?, parse(max)?));
    }
    Ok(records)
}

/// Inputs gathered from the command line, ready to assemble.
#[derive(Debug, Default)]
pub struct ProblemFiles {
    pub score_sources: Vec<Vec<PairRecord>>,
    pub weights: Vec<f64>,
    pub constraints: Vec<PairRecord>,
    pub probability_limits: Option<Vec<PairRecord>>,
    pub paper_quotas: Vec<(String, u32, u32)>,
    pub reviewer_quotas: Vec<(String, u32, u32)>,
    pub default_paper_quota: (u32, u32),
    pub default_reviewer_quota: (u32, u32),
}

impl ProblemFiles {
    /// Assemble the canonical problem from the gathered records.
    pub fn build(self) -> MatchResult<Problem> {
        if !self.weights.is_empty() && self.weights.len() != self.score_sources.len() {
            return Err(MatchError::Validation(format!(
                "{} weights given for {} score files",
                self.weights.len(),
                self.score_sources.len()
            )));
        }

        let mut papers: BTreeSet<&str> = BTreeSet::new();
        let mut reviewers: BTreeSet<&str> = BTreeSet::new();
        for source in &self.score_sources {
            for record in source {
                papers.insert(&record.paper);
                reviewers.insert(&record.reviewer);
            }
        }
        for record in self
            .constraints
            .iter()
            .chain(self.probability_limits.iter().flatten())
        {
            papers.insert(&record.paper);
            reviewers.insert(&record.reviewer);
        }
        for (id, _, _) in &self.paper_quotas {
            papers.insert(id);
        }
        for (id, _, _) in &self.reviewer_quotas {
            reviewers.insert(id);
        }

        let paper_index: BTreeMap<&str, usize> =
            papers.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let reviewer_index: BTreeMap<&str, usize> = reviewers
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        let num_papers = papers.len();
        let num_reviewers = reviewers.len();

        let mut builder = ProblemBuilder::new(num_papers, num_reviewers)
            .with_paper_labels(papers.iter().map(|s| s.to_string()).collect())
            .with_reviewer_labels(reviewers.iter().map(|s| s.to_string()).collect())
            .paper_demand(self.default_paper_quota.0, self.default_paper_quota.1)
            .reviewer_load(self.default_reviewer_quota.0, self.default_reviewer_quota.1);

        for (source_idx, source) in self.score_sources.iter().enumerate() {
            let weight = self.weights.get(source_idx).copied().unwrap_or(1.0);
            let mut dense = vec![0.0f64; num_papers * num_reviewers];
            for record in source {
                let p = paper_index[record.paper.as_str()];
                let r = reviewer_index[record.reviewer.as_str()];
                dense[p * num_reviewers + r] = record.value;
            }
            builder = builder.add_scores(dense, weight);
        }

        for record in &self.constraints {
            let p = paper_index[record.paper.as_str()];
            let r = reviewer_index[record.reviewer.as_str()];
            if record.value != -1.0 && record.value != 1.0 && record.value != 0.0 {
                return Err(MatchError::Validation(format!(
                    "constraint code {} for ({}, {}) is not -1, 0 or 1",
                    record.value, record.paper, record.reviewer
                )));
            }
            let code = match record.value as i8 {
                -1 => PairConstraint::Conflicted,
                1 => PairConstraint::Locked,
                _ => PairConstraint::Free,
            };
            builder = builder.set_constraint(p, r, code);
        }

        if let Some(limits) = &self.probability_limits {
            let mut dense = vec![1.0f64; num_papers * num_reviewers];
            for record in limits {
                let p = paper_index[record.paper.as_str()];
                let r = reviewer_index[record.reviewer.as_str()];
                dense[p * num_reviewers + r] = record.value;
            }
            builder = builder.with_probability_limits(dense);
        }

        for (id, min, max) in &self.paper_quotas {
            builder = builder.paper_demand_for(paper_index[id.as_str()], *min, *max);
        }
        for (id, min, max) in &self.reviewer_quotas {
            builder = builder.reviewer_load_for(reviewer_index[id.as_str()], *min, *max);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_pair_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "scores.txt",
            "# affinity\npaperA rev1 0.9\npaperA rev2 0.1\n\npaperB rev2 0.8\n",
        );
        let records = parse_pair_file(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].paper, "paperA");
        assert_eq!(records[2].value, 0.8);
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "scores.txt", "paperA rev1\n");
        let err = parse_pair_file(&path).unwrap_err();
        assert!(matches!(err, MatchError::Parse(_)));
    }

    #[test]
    fn test_build_indexes_ids_sorted() {
        let files = ProblemFiles {
            score_sources: vec![vec![
                PairRecord {
                    paper: "B".into(),
                    reviewer: "y".into(),
                    value: 1.0,
                },
                PairRecord {
                    paper: "A".into(),
                    reviewer: "x".into(),
                    value: 1.0,
                },
            ]],
            weights: vec![],
            default_paper_quota: (1, 1),
            default_reviewer_quota: (0, 1),
            ..Default::default()
        };
        let problem = files.build().unwrap();
        assert_eq!(problem.paper_label(0), "A");
        assert_eq!(problem.paper_label(1), "B");
        assert_eq!(problem.reviewer_label(0), "x");
        assert!((problem.score(0, 0) - 1.0).abs() < 1e-12);
        assert!((problem.score(1, 1) - 1.0).abs() < 1e-12);
        assert_eq!(problem.score(0, 1), 0.0);
    }

    #[test]
    fn test_build_rejects_weight_mismatch() {
        let files = ProblemFiles {
            score_sources: vec![vec![]],
            weights: vec![1.0, 2.0],
            ..Default::default()
        };
        assert!(matches!(
            files.build(),
            Err(MatchError::Validation(_))
        ));
    }
}
