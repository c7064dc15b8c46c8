//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::pipeline::Stage;
use clap::Parser;
use std::path::PathBuf;

/// episynth - living systematic review pipeline
///
/// Retrieves PubMed records on epigenetics in cancer prevention,
/// classifies their abstracts, and builds the master dataset, summary
/// statistics, reference list, and manuscript.
///
/// Examples:
///   episynth
///   episynth --stage fetch --max-results 200 --email me@example.org
///   episynth --from prepare
///   episynth --dry-run
///   episynth --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .episynth.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Generate a default .episynth.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Run a single stage
    #[arg(long, value_name = "STAGE", conflicts_with = "from")]
    pub stage: Option<Stage>,

    /// Resume from this stage through the end of the pipeline
    #[arg(long, value_name = "STAGE")]
    pub from: Option<Stage>,

    /// PubMed search query (overrides the configured query)
    #[arg(long, value_name = "QUERY")]
    pub query: Option<String>,

    /// Maximum number of PubMed records to retrieve
    #[arg(long, value_name = "COUNT")]
    pub max_results: Option<usize>,

    /// Contact email sent with E-utilities requests
    #[arg(long, value_name = "ADDR", env = "EPISYNTH_EMAIL")]
    pub email: Option<String>,

    /// Directory for the extraction file and master dataset
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for summaries, references, and the manuscript
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the stage plan and classifier setup without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_results == Some(0) {
            return Err("Max results must be at least 1".to_string());
        }

        if let Some(ref query) = self.query {
            if query.trim().is_empty() {
                return Err("Query must not be empty".to_string());
            }
        }

        if let Some(ref email) = self.email {
            if !email.is_empty() && !email.contains('@') {
                return Err(format!("Invalid email address: {}", email));
            }
        }

        if let Some(ref path) = self.config {
            if !path.exists() {
                return Err(format!("Config file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Stages selected on the command line.
    pub fn stages(&self) -> Vec<Stage> {
        Stage::plan(self.stage, self.from)
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            init_config: false,
            stage: None,
            from: None,
            query: None,
            max_results: None,
            email: None,
            data_dir: None,
            output_dir: None,
            dry_run: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_stage_flags() {
        let args = Args::try_parse_from(["episynth", "--from", "references", "-v"]).unwrap();
        assert_eq!(args.from, Some(Stage::References));
        assert!(args.verbose);
        assert_eq!(args.stages(), vec![Stage::References, Stage::Manuscript, Stage::Render]);

        let args = Args::try_parse_from(["episynth", "--stage", "analyze"]).unwrap();
        assert_eq!(args.stages(), vec![Stage::Analyze]);
    }

    #[test]
    fn test_stage_and_from_conflict() {
        let result = Args::try_parse_from(["episynth", "--stage", "fetch", "--from", "prepare"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_values() {
        let mut args = make_args();
        assert!(args.validate().is_ok());

        args.max_results = Some(0);
        assert!(args.validate().is_err());

        args.max_results = Some(10);
        args.email = Some("not-an-email".to_string());
        assert!(args.validate().is_err());

        args.email = Some("me@example.org".to_string());
        args.config = Some(PathBuf::from("/nonexistent/.episynth.toml"));
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
