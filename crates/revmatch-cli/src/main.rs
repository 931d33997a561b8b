use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use revmatch_algo::{AssignmentSolver, SolverKind};
use revmatch_cli::cli::{Cli, Commands};
use revmatch_cli::input::{parse_pair_file, parse_quota_file, ProblemFiles};
use revmatch_core::{MatchError, OutputRecord, SolveStatus};

/// Exit codes: 0 complete, 1 infeasible, 2 solver error, 3 invalid input.
const EXIT_INFEASIBLE: u8 = 1;
const EXIT_SOLVER_ERROR: u8 = 2;
const EXIT_INVALID_INPUT: u8 = 3;

fn main() -> ExitCode {
    let cli = Cli::parse();
    // stdout carries the JSON output record; logs go to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    match cli.command {
        Commands::Solve {
            scores,
            weights,
            constraints,
            probability_limits,
            min_reviewers,
            max_reviewers,
            min_papers,
            max_papers,
            paper_quotas,
            reviewer_quotas,
            solver,
            alternates,
            seed,
            out,
        } => {
            let kind: SolverKind = match solver.parse() {
                Ok(kind) => kind,
                Err(err) => {
                    error!("{err}");
                    return ExitCode::from(EXIT_INVALID_INPUT);
                }
            };
            let assembled = assemble(
                &scores,
                weights,
                constraints.as_deref(),
                probability_limits.as_deref(),
                (min_reviewers, max_reviewers),
                (min_papers, max_papers),
                paper_quotas.as_deref(),
                reviewer_quotas.as_deref(),
            );
            let problem = match assembled.and_then(ProblemFiles::build) {
                Ok(problem) => problem,
                Err(err) => {
                    error!("invalid input: {err}");
                    return ExitCode::from(EXIT_INVALID_INPUT);
                }
            };
            info!(
                papers = problem.num_papers(),
                reviewers = problem.num_reviewers(),
                solver = %kind,
                "solving"
            );

            let solve = AssignmentSolver::new(kind)
                .with_alternates(alternates)
                .with_seed(seed)
                .solve(&problem);
            let (record, code) = match solve {
                Ok(solution) => {
                    info!(objective = solution.objective, "solve complete");
                    (OutputRecord::complete(&problem, &solution), ExitCode::SUCCESS)
                }
                Err(MatchError::Infeasible(detail)) => {
                    error!("infeasible: {detail}");
                    (
                        OutputRecord::failed(SolveStatus::Infeasible, detail),
                        ExitCode::from(EXIT_INFEASIBLE),
                    )
                }
                Err(MatchError::Cancelled) => (
                    OutputRecord::failed(SolveStatus::Cancelled, "solve cancelled"),
                    ExitCode::from(EXIT_SOLVER_ERROR),
                ),
                Err(MatchError::Validation(detail)) => {
                    error!("invalid input: {detail}");
                    return ExitCode::from(EXIT_INVALID_INPUT);
                }
                Err(err) => {
                    error!("solver failed: {err}");
                    (
                        OutputRecord::failed(SolveStatus::SolverError, err.to_string()),
                        ExitCode::from(EXIT_SOLVER_ERROR),
                    )
                }
            };
            if let Err(err) = emit(&record, out.as_ref()) {
                error!("failed to write output: {err}");
                return ExitCode::from(EXIT_SOLVER_ERROR);
            }
            code
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    scores: &[PathBuf],
    weights: Vec<f64>,
    constraints: Option<&std::path::Path>,
    probability_limits: Option<&std::path::Path>,
    paper_quota: (u32, u32),
    reviewer_quota: (u32, u32),
    paper_quotas: Option<&std::path::Path>,
    reviewer_quotas: Option<&std::path::Path>,
) -> Result<ProblemFiles, MatchError> {
    let mut files = ProblemFiles {
        weights,
        default_paper_quota: paper_quota,
        default_reviewer_quota: reviewer_quota,
        ..Default::default()
    };
    for path in scores {
        files.score_sources.push(parse_pair_file(path)?);
    }
    if let Some(path) = constraints {
        files.constraints = parse_pair_file(path)?;
    }
    if let Some(path) = probability_limits {
        files.probability_limits = Some(parse_pair_file(path)?);
    }
    if let Some(path) = paper_quotas {
        files.paper_quotas = parse_quota_file(path)?;
    }
    if let Some(path) = reviewer_quotas {
        files.reviewer_quotas = parse_quota_file(path)?;
    }
    Ok(files)
}

fn emit(record: &OutputRecord, out: Option<&PathBuf>) -> Result<(), anyhow::Error> {
    let json = serde_json::to_string_pretty(record)?;
    match out {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
