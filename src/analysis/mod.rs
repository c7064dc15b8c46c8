//! Analysis modules.
//!
//! Normalization of the extracted table into the master dataset, and the
//! statistics computed over it.

pub mod aggregator;
pub mod normalizer;

pub use aggregator::*;
pub use normalizer::normalize_all;

use crate::config::ReportConfig;
use crate::models::AnalysisSummary;

/// Compute everything the reports need from the master dataset.
pub fn summarize<R: Observation>(rows: &[R], report: &ReportConfig) -> AnalysisSummary {
    AnalysisSummary {
        overview: overview(rows),
        exposure_groups: aggregate(rows, GroupField::ExposureType),
        marker_counts: top_counts(rows, GroupField::EpigeneticMarker, report.top_n),
        cancer_counts: top_counts(rows, GroupField::CancerType, report.top_n),
        design_counts: top_counts(rows, GroupField::StudyDesign, usize::MAX),
        focus: marker_focus(rows, &report.focus_marker),
    }
}
