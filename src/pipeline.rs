//! Stage runner.
//!
//! Stages run in a fixed order, each reading the complete output file of
//! the stage before it and overwriting its own outputs.

use crate::analysis::{normalize_all, summarize};
use crate::classifier::Classifier;
use crate::config::Config;
use crate::dataset::{read_rows, read_text, write_file, write_rows};
use crate::error::PipelineError;
use crate::models::{ClassifiedRecord, DatasetRow};
use crate::report::{self, ManuscriptInput};
use crate::retriever;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Stage {
    /// Search PubMed, classify, write the extraction file
    Fetch,
    /// Normalize the extraction file into the master dataset
    Prepare,
    /// Compute summary statistics
    Analyze,
    /// Write the formatted reference list
    References,
    /// Write the Markdown manuscript
    Manuscript,
    /// Run the configured external render commands
    Render,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Fetch,
        Stage::Prepare,
        Stage::Analyze,
        Stage::References,
        Stage::Manuscript,
        Stage::Render,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Prepare => "prepare",
            Stage::Analyze => "analyze",
            Stage::References => "references",
            Stage::Manuscript => "manuscript",
            Stage::Render => "render",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Stage::Fetch => "📥",
            Stage::Prepare => "🧹",
            Stage::Analyze => "📊",
            Stage::References => "📚",
            Stage::Manuscript => "📝",
            Stage::Render => "🖨️",
        }
    }

    /// This stage and every stage after it.
    pub fn stages_from(start: Stage) -> Vec<Stage> {
        Stage::ALL.into_iter().filter(|s| *s >= start).collect()
    }

    /// Stages selected by `--stage` / `--from`; all of them when neither is set.
    pub fn plan(only: Option<Stage>, from: Option<Stage>) -> Vec<Stage> {
        match (only, from) {
            (Some(stage), _) => vec![stage],
            (None, Some(start)) => Stage::stages_from(start),
            (None, None) => Stage::ALL.to_vec(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a finished stage produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: Stage,
    /// Rows or lines the stage processed.
    pub records: usize,
    pub outputs: Vec<PathBuf>,
}

/// Runs stages against one immutable configuration.
pub struct Pipeline {
    config: Config,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config, show_progress: bool) -> Self {
        Self {
            config,
            show_progress,
        }
    }

    /// Run `stages` in order. The first failure aborts the rest.
    pub async fn run(&self, stages: &[Stage]) -> Result<Vec<StageOutcome>, PipelineError> {
        let mut outcomes = Vec::with_capacity(stages.len());

        for &stage in stages {
            if self.show_progress {
                println!("\n{} Stage: {}", stage.emoji(), stage);
            }
            info!("Running stage: {}", stage);

            let outcome = self.run_stage(stage).await?;

            if self.show_progress {
                for output in &outcome.outputs {
                    println!("   ✅ {}", output.display());
                }
            }
            info!(
                "Stage {} finished: {} records, {} outputs",
                stage,
                outcome.records,
                outcome.outputs.len()
            );
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn run_stage(&self, stage: Stage) -> Result<StageOutcome, PipelineError> {
        match stage {
            Stage::Fetch => self.fetch().await,
            Stage::Prepare => self.prepare(),
            Stage::Analyze => self.analyze(),
            Stage::References => self.references(),
            Stage::Manuscript => self.manuscript(),
            Stage::Render => self.render(),
        }
    }

    async fn fetch(&self) -> Result<StageOutcome, PipelineError> {
        // Rules compile before any request is made.
        let classifier = Classifier::new(&self.config.classifier)?;
        let records = retriever::retrieve(&self.config.search, self.show_progress).await?;

        let raw_path = self.config.raw_path();
        let raw = serde_json::to_vec_pretty(&records)
            .map_err(|e| PipelineError::Io(std::io::Error::from(e)))?;
        write_file(&raw_path, &raw)?;

        let classified: Vec<ClassifiedRecord> = records
            .into_iter()
            .map(|r| classifier.classify_record(r))
            .collect();
        let rows: Vec<DatasetRow> = classified.iter().map(DatasetRow::from).collect();

        let extracted_path = self.config.extracted_path();
        write_rows(&extracted_path, &rows)?;

        Ok(StageOutcome {
            stage: Stage::Fetch,
            records: rows.len(),
            outputs: vec![extracted_path, raw_path],
        })
    }

    fn prepare(&self) -> Result<StageOutcome, PipelineError> {
        let rows: Vec<DatasetRow> = read_rows(&self.config.extracted_path())?;
        let normalized = normalize_all(&rows, &self.config.normalizer);

        let master_path = self.config.master_path();
        write_rows(&master_path, &normalized)?;

        Ok(StageOutcome {
            stage: Stage::Prepare,
            records: normalized.len(),
            outputs: vec![master_path],
        })
    }

    fn analyze(&self) -> Result<StageOutcome, PipelineError> {
        let rows: Vec<DatasetRow> = read_rows(&self.config.master_path())?;
        let summary = summarize(&rows, &self.config.report);

        let summary_path = self.config.summary_path();
        write_file(&summary_path, report::generate_json_summary(&summary)?.as_bytes())?;

        let table_path = self.config.exposure_table_path();
        write_rows(&table_path, &report::exposure_table(&summary))?;

        Ok(StageOutcome {
            stage: Stage::Analyze,
            records: rows.len(),
            outputs: vec![summary_path, table_path],
        })
    }

    fn references(&self) -> Result<StageOutcome, PipelineError> {
        let rows: Vec<DatasetRow> = read_rows(&self.config.master_path())?;
        let references = report::format_references(&rows, &self.config.report);

        let path = self.config.references_path();
        write_file(&path, report::render_references(&references).as_bytes())?;

        Ok(StageOutcome {
            stage: Stage::References,
            records: references.len(),
            outputs: vec![path],
        })
    }

    fn manuscript(&self) -> Result<StageOutcome, PipelineError> {
        let rows: Vec<DatasetRow> = read_rows(&self.config.master_path())?;
        let references = report::parse_references(&read_text(&self.config.references_path())?);
        let summary = summarize(&rows, &self.config.report);

        let markdown = report::generate_markdown_manuscript(&ManuscriptInput {
            summary: &summary,
            references: &references,
            report: &self.config.report,
            search: &self.config.search,
        });

        let path = self.config.manuscript_path();
        write_file(&path, markdown.as_bytes())?;

        Ok(StageOutcome {
            stage: Stage::Manuscript,
            records: rows.len(),
            outputs: vec![path],
        })
    }

    fn render(&self) -> Result<StageOutcome, PipelineError> {
        let commands = &self.config.pipeline.render_commands;
        if commands.is_empty() {
            info!("No render commands configured");
        }

        let root = &self.config.pipeline.root_dir;
        let mut executed = 0;
        for argv in commands {
            if run_command(argv, root)? {
                executed += 1;
            }
        }

        Ok(StageOutcome {
            stage: Stage::Render,
            records: executed,
            outputs: Vec::new(),
        })
    }
}

/// Run one external command from `root`. Returns `false` when `argv` is empty.
fn run_command(argv: &[String], root: &Path) -> Result<bool, PipelineError> {
    let Some((program, args)) = argv.split_first() else {
        warn!("Skipping empty render command");
        return Ok(false);
    };

    let command = argv.join(" ");
    debug!("Running in {}: {}", root.display(), command);

    let status = Command::new(program).args(args).current_dir(root).status()?;
    if !status.success() {
        return Err(PipelineError::StepFailed {
            command,
            // Killed by a signal: no code to forward.
            code: status.code().unwrap_or(1),
        });
    }

    Ok(true)
}
