use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Paper-reviewer assignment solver", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve an assignment problem from score and constraint files
    Solve {
        /// Score file(s): whitespace-separated "paper_id reviewer_id score"
        /// lines; missing pairs default to 0. Repeat for multiple sources.
        #[arg(long, required = true)]
        scores: Vec<PathBuf>,

        /// Weight per score source (defaults to 1.0 each)
        #[arg(long)]
        weights: Vec<f64>,

        /// Constraint file: "paper_id reviewer_id code" with code -1
        /// (conflict) or 1 (lock)
        #[arg(long)]
        constraints: Option<PathBuf>,

        /// Probability limit file: "paper_id reviewer_id limit" with limit
        /// in [0,1]; unlisted pairs default to 1 (randomized solver only)
        #[arg(long)]
        probability_limits: Option<PathBuf>,

        /// Default minimum reviewers per paper
        #[arg(long, default_value_t = 0)]
        min_reviewers: u32,

        /// Default maximum reviewers per paper
        #[arg(long, default_value_t = 3)]
        max_reviewers: u32,

        /// Default minimum papers per reviewer
        #[arg(long, default_value_t = 0)]
        min_papers: u32,

        /// Default maximum papers per reviewer
        #[arg(long, default_value_t = 5)]
        max_papers: u32,

        /// Per-paper quota overrides: "paper_id min max" lines
        #[arg(long)]
        paper_quotas: Option<PathBuf>,

        /// Per-reviewer quota overrides: "reviewer_id min max" lines
        #[arg(long)]
        reviewer_quotas: Option<PathBuf>,

        /// Solver: MinMax, FairFlow, Randomized or FairSequence
        #[arg(long, default_value = "MinMax")]
        solver: String,

        /// Number of alternate reviewers to record per paper
        #[arg(long, default_value_t = 0)]
        alternates: usize,

        /// Sampler seed (randomized solver only)
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Write the JSON output record here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
