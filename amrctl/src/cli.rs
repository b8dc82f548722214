//! Command line surface of the `amrctl` main driver.
//!
//! One invocation is one export: authenticate, enumerate the completed AMR
//! analyses of a project, download their output files and write them out as
//! one aggregate workbook or one workbook per analysis.
//!

use std::path::PathBuf;

use clap::{crate_description, crate_name, crate_version, Parser};

/// CLI options
#[derive(Debug, Parser)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!())]
pub struct Opts {
    /// Project to scan for StarAMR results.
    #[clap(short = 'p', long)]
    pub project: i64,
    /// Name (or name prefix in split mode) of the output workbook.
    #[clap(short = 'o', long, default_value = "out")]
    pub output: String,
    /// IRIDA account username (prompted for when omitted).
    #[clap(short = 'u', long)]
    pub username: Option<String>,
    /// IRIDA account password (prompted for when omitted).
    #[clap(short = 'P', long)]
    pub password: Option<String>,
    /// Path to the configuration file.
    #[clap(short = 'c', long)]
    pub config: PathBuf,
    /// Write one workbook per analysis instead of a single aggregate one.
    #[clap(short = 's', long)]
    pub split: bool,
    /// Keep only analyses created on or after this day (YYYY-MM-DD).
    #[clap(long)]
    pub from_date: Option<String>,
    /// Keep only analyses created on or before this day (YYYY-MM-DD).
    #[clap(long)]
    pub to_date: Option<String>,
    /// Verbose mode.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opts_minimal() {
        let opts = Opts::try_parse_from(["amrctl", "-p", "5", "-c", "config.hcl"]).unwrap();
        assert_eq!(5, opts.project);
        assert_eq!("out", opts.output);
        assert!(!opts.split);
        assert!(opts.from_date.is_none());
    }

    #[test]
    fn test_opts_project_required() {
        let res = Opts::try_parse_from(["amrctl", "-c", "config.hcl"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_opts_full() {
        let opts = Opts::try_parse_from([
            "amrctl",
            "--project",
            "5",
            "--config",
            "config.hcl",
            "--output",
            "report",
            "--split",
            "--from-date",
            "2021-04-08",
            "--to-date",
            "2021-04-09",
            "-vv",
        ])
        .unwrap();
        assert!(opts.split);
        assert_eq!(Some("2021-04-08".to_string()), opts.from_date);
        assert_eq!(2, opts.verbose);
    }
}
