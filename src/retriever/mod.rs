//! Literature retrieval from PubMed.
//!
//! This module runs the search, fetches summaries in batches, and fills
//! in abstracts, reporting progress on the terminal.

pub mod pubmed;
pub mod retry;

pub use pubmed::PubMedClient;

use crate::config::SearchConfig;
use crate::error::PipelineError;
use crate::models::Record;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

fn progress_bar(len: usize, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    pb
}

/// Search PubMed and return fully populated records.
///
/// An empty search result is not an error; it yields an empty list.
pub async fn retrieve(
    config: &SearchConfig,
    show_progress: bool,
) -> Result<Vec<Record>, PipelineError> {
    let client = PubMedClient::new(config)?;

    info!("Searching PubMed: {}", config.query);
    let pmids = client.search().await?;
    if pmids.is_empty() {
        return Ok(Vec::new());
    }

    let pb = show_progress.then(|| progress_bar(pmids.len(), "summaries"));
    let mut records = client.fetch_summaries(&pmids, pb.as_ref()).await?;
    if let Some(pb) = pb {
        pb.finish_with_message("summaries fetched");
    }
    info!("Fetched {} summaries", records.len());

    if config.fetch_abstracts {
        let pb = show_progress.then(|| progress_bar(records.len(), "abstracts"));
        client.fetch_abstracts(&mut records, pb.as_ref()).await;
        if let Some(pb) = pb {
            pb.finish_with_message("abstracts fetched");
        }

        let with_abstract = records.iter().filter(|r| !r.abstract_text.is_empty()).count();
        info!("{} of {} records have abstracts", with_abstract, records.len());
    }

    Ok(records)
}
