//! Numbered reference list.

use crate::config::ReportConfig;
use crate::models::{DatasetRow, Record};
use std::collections::HashSet;

/// Format one reference line.
pub fn format_reference(index: usize, row: &DatasetRow, report: &ReportConfig) -> String {
    let year = match row.year.trim() {
        "" => report.fallback_year.as_str(),
        year => year,
    };
    let doi = match row.doi.trim() {
        "" => "N/A",
        doi => doi,
    };

    format!(
        "{}. {} ({}). {}. {}. DOI: {}. PMID: {}.",
        index,
        row.authors.trim(),
        year,
        row.title.trim(),
        Record::journal_or_placeholder(&row.journal),
        doi,
        row.pmid.trim()
    )
}

/// One line per unique PMID, numbered from 1 in order of first appearance.
///
/// Rows with an empty PMID are skipped.
pub fn format_references(rows: &[DatasetRow], report: &ReportConfig) -> Vec<String> {
    let mut seen = HashSet::new();

    rows.iter()
        .filter(|row| {
            let pmid = row.pmid.trim();
            !pmid.is_empty() && seen.insert(pmid.to_string())
        })
        .enumerate()
        .map(|(i, row)| format_reference(i + 1, row, report))
        .collect()
}

/// Render references as file content, one per line.
pub fn render_references(references: &[String]) -> String {
    let mut content = references.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    content
}

/// Parse a references file back into lines, dropping blanks.
pub fn parse_references(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
