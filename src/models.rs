//! Data models for the review pipeline.
//!
//! This module contains the core data structures shared by every stage:
//! retrieved records, classification labels, dataset rows, and the
//! summary types produced by aggregation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Placeholder used when a record carries no journal name.
pub const JOURNAL_PLACEHOLDER: &str = "Journal not specified";

static FOUR_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());

/// Coarse category of the modifiable factor a study investigates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureType {
    Nutritional,
    Behavioural,
    Environmental,
    Screening,
    Therapeutic,
    Other,
}

impl ExposureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureType::Nutritional => "nutritional",
            ExposureType::Behavioural => "behavioural",
            ExposureType::Environmental => "environmental",
            ExposureType::Screening => "screening",
            ExposureType::Therapeutic => "therapeutic",
            ExposureType::Other => "other",
        }
    }
}

impl fmt::Display for ExposureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Class of molecular marker measured by a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpigeneticMarker {
    #[serde(rename = "SEPT9")]
    Sept9,
    #[serde(rename = "DNA hydroxymethylation")]
    DnaHydroxymethylation,
    #[serde(rename = "DNA methylation")]
    DnaMethylation,
    #[serde(rename = "Histone modification")]
    HistoneModification,
    #[serde(rename = "miRNA")]
    MiRna,
    #[serde(rename = "lncRNA")]
    LncRna,
    #[serde(rename = "circRNA")]
    CircRna,
    #[serde(rename = "Chromatin remodeling")]
    ChromatinRemodeling,
    #[serde(rename = "Epigenetic aging")]
    EpigeneticAging,
    #[serde(rename = "Other epigenetic marker")]
    Other,
}

impl EpigeneticMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpigeneticMarker::Sept9 => "SEPT9",
            EpigeneticMarker::DnaHydroxymethylation => "DNA hydroxymethylation",
            EpigeneticMarker::DnaMethylation => "DNA methylation",
            EpigeneticMarker::HistoneModification => "Histone modification",
            EpigeneticMarker::MiRna => "miRNA",
            EpigeneticMarker::LncRna => "lncRNA",
            EpigeneticMarker::CircRna => "circRNA",
            EpigeneticMarker::ChromatinRemodeling => "Chromatin remodeling",
            EpigeneticMarker::EpigeneticAging => "Epigenetic aging",
            EpigeneticMarker::Other => "Other epigenetic marker",
        }
    }
}

impl fmt::Display for EpigeneticMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Methodological category of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudyDesign {
    #[serde(rename = "cohort")]
    Cohort,
    #[serde(rename = "case-control")]
    CaseControl,
    #[serde(rename = "cross-sectional")]
    CrossSectional,
    #[serde(rename = "clinical trial")]
    ClinicalTrial,
    #[serde(rename = "meta-analysis")]
    MetaAnalysis,
    #[serde(rename = "other")]
    Other,
}

impl StudyDesign {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyDesign::Cohort => "cohort",
            StudyDesign::CaseControl => "case-control",
            StudyDesign::CrossSectional => "cross-sectional",
            StudyDesign::ClinicalTrial => "clinical trial",
            StudyDesign::MetaAnalysis => "meta-analysis",
            StudyDesign::Other => "other",
        }
    }
}

impl fmt::Display for StudyDesign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One literature entry as returned by the retriever.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// PubMed identifier.
    pub pmid: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Author names in publication order.
    pub authors: Vec<String>,
    pub journal: String,
    /// Four-digit publication year, or empty.
    pub year: String,
    pub doi: String,
}

impl Record {
    /// Extract the first four-digit run from a raw publication date.
    pub fn year_from_date(raw: &str) -> String {
        FOUR_DIGITS
            .find(raw)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    /// Returns the journal name, or the placeholder when it is blank.
    pub fn journal_or_placeholder(journal: &str) -> String {
        let journal = journal.trim();
        if journal.is_empty() {
            JOURNAL_PLACEHOLDER.to_string()
        } else {
            journal.to_string()
        }
    }
}

/// Labels and numeric fields derived from a record's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub exposure_type: ExposureType,
    pub epigenetic_marker: EpigeneticMarker,
    /// Cancer name from the configured scan list, or `"unspecified"`.
    pub cancer_type: String,
    pub population_size: Option<u32>,
    pub epigenetic_effect_size: Option<f64>,
    pub study_design: StudyDesign,
}

/// A record together with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub classification: Classification,
}

/// Row of the extraction file.
///
/// Numeric columns are read leniently: anything that does not parse is
/// treated as absent, so malformed input never aborts a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(default)]
    pub pmid: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub journal: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub exposure_type: String,
    #[serde(default)]
    pub epigenetic_marker: String,
    #[serde(default)]
    pub cancer_type: String,
    #[serde(default, deserialize_with = "crate::dataset::lenient::int")]
    pub population_size: Option<i64>,
    #[serde(default, deserialize_with = "crate::dataset::lenient::float")]
    pub epigenetic_effect_size: Option<f64>,
    #[serde(default)]
    pub study_design: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, deserialize_with = "crate::dataset::lenient::float")]
    pub proportion_positive: Option<f64>,
    #[serde(default, deserialize_with = "crate::dataset::lenient::int")]
    pub sample_size: Option<i64>,
    #[serde(default, deserialize_with = "crate::dataset::lenient::float")]
    pub sensitivity: Option<f64>,
    #[serde(default, deserialize_with = "crate::dataset::lenient::float")]
    pub specificity: Option<f64>,
}

impl From<&ClassifiedRecord> for DatasetRow {
    fn from(classified: &ClassifiedRecord) -> Self {
        let record = &classified.record;
        let labels = &classified.classification;
        let population = labels.population_size.map(i64::from);

        // Proportion, sensitivity and specificity are not extracted from
        // abstracts; the normalizer fills them deterministically.
        Self {
            pmid: record.pmid.clone(),
            doi: record.doi.clone(),
            title: record.title.clone(),
            authors: record.authors.join("; "),
            year: record.year.clone(),
            journal: record.journal.clone(),
            abstract_text: record.abstract_text.clone(),
            exposure_type: labels.exposure_type.to_string(),
            epigenetic_marker: labels.epigenetic_marker.to_string(),
            cancer_type: labels.cancer_type.clone(),
            population_size: population,
            epigenetic_effect_size: labels.epigenetic_effect_size,
            study_design: labels.study_design.to_string(),
            country: "Unspecified".to_string(),
            proportion_positive: None,
            sample_size: population,
            sensitivity: None,
            specificity: None,
        }
    }
}

impl From<&NormalizedRecord> for DatasetRow {
    fn from(normalized: &NormalizedRecord) -> Self {
        Self {
            pmid: normalized.pmid.clone(),
            doi: normalized.doi.clone(),
            title: normalized.title.clone(),
            authors: normalized.authors.clone(),
            year: normalized.year.clone(),
            journal: normalized.journal.clone(),
            abstract_text: normalized.abstract_text.clone(),
            exposure_type: normalized.exposure_type.clone(),
            epigenetic_marker: normalized.epigenetic_marker.clone(),
            cancer_type: normalized.cancer_type.clone(),
            population_size: Some(i64::from(normalized.population_size)),
            epigenetic_effect_size: Some(normalized.epigenetic_effect_size),
            study_design: normalized.study_design.clone(),
            country: normalized.country.clone(),
            proportion_positive: Some(normalized.proportion_positive),
            sample_size: Some(i64::from(normalized.sample_size)),
            sensitivity: Some(normalized.sensitivity),
            specificity: Some(normalized.specificity),
        }
    }
}

/// Row of the master dataset. Every numeric field is populated and in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub pmid: String,
    pub doi: String,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub journal: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub exposure_type: String,
    pub epigenetic_marker: String,
    pub epigenetic_effect_size: f64,
    pub cancer_type: String,
    pub population_size: u32,
    pub study_design: String,
    pub country: String,
    pub proportion_positive: f64,
    pub sample_size: u32,
    pub sensitivity: f64,
    pub specificity: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Descriptive statistics for one category value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub category_value: String,
    pub study_count: usize,
    pub mean_effect: f64,
    pub stddev_effect: f64,
    pub median_population: f64,
}

/// Frequency of one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Evidence collected for a single marker of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerFocus {
    pub marker: String,
    pub records: usize,
    pub mean_proportion: Option<f64>,
    pub median_sample: Option<f64>,
    pub pmids: Vec<String>,
    pub titles: Vec<String>,
}

/// Dataset-wide headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub total_records: usize,
    pub unique_studies: usize,
    pub first_year: Option<String>,
    pub last_year: Option<String>,
    pub mean_proportion_positive: Option<f64>,
}

/// Everything the analyze stage computes, serialized to `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub overview: DatasetOverview,
    pub exposure_groups: Vec<GroupSummary>,
    pub marker_counts: Vec<LabelCount>,
    pub cancer_counts: Vec<LabelCount>,
    pub design_counts: Vec<LabelCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<MarkerFocus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_from_date() {
        assert_eq!(Record::year_from_date("2024 Mar 15"), "2024");
        assert_eq!(Record::year_from_date("Winter 2023-2024"), "2023");
        assert_eq!(Record::year_from_date("Mar"), "");
        assert_eq!(Record::year_from_date(""), "");
    }

    #[test]
    fn test_journal_placeholder() {
        assert_eq!(Record::journal_or_placeholder("  "), JOURNAL_PLACEHOLDER);
        assert_eq!(Record::journal_or_placeholder("Epigenetics"), "Epigenetics");
    }

    #[test]
    fn test_label_display() {
        assert_eq!(ExposureType::Behavioural.to_string(), "behavioural");
        assert_eq!(EpigeneticMarker::Other.to_string(), "Other epigenetic marker");
        assert_eq!(StudyDesign::ClinicalTrial.to_string(), "clinical trial");
    }

    #[test]
    fn test_dataset_row_from_classified() {
        let classified = ClassifiedRecord {
            record: Record {
                pmid: "123".to_string(),
                title: "T".to_string(),
                authors: vec!["Smith J".to_string(), "Doe A".to_string()],
                journal: "J".to_string(),
                year: "2024".to_string(),
                ..Record::default()
            },
            classification: Classification {
                exposure_type: ExposureType::Nutritional,
                epigenetic_marker: EpigeneticMarker::Sept9,
                cancer_type: "colorectal".to_string(),
                population_size: Some(150),
                epigenetic_effect_size: None,
                study_design: StudyDesign::Cohort,
            },
        };

        let row = DatasetRow::from(&classified);
        assert_eq!(row.authors, "Smith J; Doe A");
        assert_eq!(row.epigenetic_marker, "SEPT9");
        assert_eq!(row.population_size, Some(150));
        assert_eq!(row.sample_size, Some(150));
        assert_eq!(row.proportion_positive, None);
        assert_eq!(row.country, "Unspecified");
    }
}
