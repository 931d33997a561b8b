//! Command-line front end for the revmatch assignment solvers.

pub mod cli;
pub mod input;
