//! Pipeline error types.
//!
//! Stage-level failures that the runner and `main` need to tell apart
//! (exit codes, operator hints). Everything else travels as `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error(
        "Output file is locked or not writable: {} (close it and re-run this stage)",
        .0.display()
    )]
    OutputLocked(PathBuf),

    #[error("Request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("PubMed API error: {0}")]
    Api(String),

    #[error("Invalid classifier rule '{rule}': {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Step `{command}` exited with code {code}")]
    StepFailed { command: String, code: i32 },
}

impl PipelineError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::StepFailed { code, .. } => *code,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_propagates_code() {
        let err = PipelineError::StepFailed {
            command: "pandoc".to_string(),
            code: 43,
        };
        assert_eq!(err.exit_code(), 43);
        assert_eq!(PipelineError::Api("bad".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_output_locked_message() {
        let err = PipelineError::OutputLocked(PathBuf::from("output/manuscript.md"));
        let msg = err.to_string();
        assert!(msg.contains("output/manuscript.md"));
        assert!(msg.contains("re-run"));
    }
}
