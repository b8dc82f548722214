//! `amrctl` exports completed StarAMR analysis results from an IRIDA server
//! into Excel workbooks, one sheet per result type.
//!

pub use cli::*;
pub use config::*;
pub use download::*;
pub use output::*;

mod cli;
mod config;
mod download;
mod output;
