//! Machine-readable analysis outputs.

use crate::error::PipelineError;
use crate::models::{AnalysisSummary, GroupSummary};
use serde::{Deserialize, Serialize};

/// One row of the exposure summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureTableRow {
    #[serde(rename = "Exposure")]
    pub exposure: String,
    #[serde(rename = "Studies")]
    pub studies: usize,
    #[serde(rename = "MeanEffect")]
    pub mean_effect: String,
    #[serde(rename = "SDEffect")]
    pub sd_effect: String,
    #[serde(rename = "MedianPopulation")]
    pub median_population: u64,
}

impl From<&GroupSummary> for ExposureTableRow {
    fn from(group: &GroupSummary) -> Self {
        Self {
            exposure: super::title_case(&group.category_value),
            studies: group.study_count,
            mean_effect: format!("{:.3}", group.mean_effect),
            sd_effect: format!("{:.3}", group.stddev_effect),
            median_population: group.median_population.max(0.0).trunc() as u64,
        }
    }
}

/// Generate the JSON summary.
pub fn generate_json_summary(summary: &AnalysisSummary) -> Result<String, PipelineError> {
    serde_json::to_string_pretty(summary)
        .map_err(|e| PipelineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Rows of the exposure table, in summary order.
pub fn exposure_table(summary: &AnalysisSummary) -> Vec<ExposureTableRow> {
    summary.exposure_groups.iter().map(ExposureTableRow::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::to_csv;
    use crate::models::DatasetOverview;

    fn create_test_summary() -> AnalysisSummary {
        AnalysisSummary {
            overview: DatasetOverview {
                total_records: 3,
                unique_studies: 3,
                first_year: Some("2020".to_string()),
                last_year: Some("2023".to_string()),
                mean_proportion_positive: Some(0.5),
            },
            exposure_groups: vec![GroupSummary {
                category_value: "behavioural".to_string(),
                study_count: 3,
                mean_effect: 0.4,
                stddev_effect: 0.16329931618554522,
                median_population: 120.5,
            }],
            marker_counts: Vec::new(),
            cancer_counts: Vec::new(),
            design_counts: Vec::new(),
            focus: None,
        }
    }

    #[test]
    fn test_generate_json_summary() {
        let json = generate_json_summary(&create_test_summary()).unwrap();
        assert!(json.contains("\"overview\""));
        assert!(json.contains("\"exposure_groups\""));
        assert!(json.contains("\"behavioural\""));
        assert!(!json.contains("\"focus\""));

        let parsed: AnalysisSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.overview.total_records, 3);
    }

    #[test]
    fn test_exposure_table_csv() {
        let rows = exposure_table(&create_test_summary());
        let csv = String::from_utf8(to_csv(&rows).unwrap()).unwrap();
        assert_eq!(
            csv,
            "Exposure,Studies,MeanEffect,SDEffect,MedianPopulation\nBehavioural,3,0.400,0.163,120\n"
        );
    }
}
