//! Abstract classification.
//!
//! Assigns exposure, marker, cancer, and design labels to a record's text
//! using ordered first-match-wins rule tables, and pulls population and
//! effect sizes out of the abstract. Classification is a pure function of
//! the text and the configured rules.

pub mod extract;
pub mod rules;

pub use rules::{KeywordRule, RuleSet};

use crate::config::ClassifierConfig;
use crate::error::PipelineError;
use crate::models::{
    Classification, ClassifiedRecord, EpigeneticMarker, ExposureType, Record, StudyDesign,
};

/// Label used when no cancer name matches.
pub const UNSPECIFIED_CANCER: &str = "unspecified";

/// Compiled classifier built from a [`ClassifierConfig`].
#[derive(Debug, Clone)]
pub struct Classifier {
    exposure: RuleSet<ExposureType>,
    marker: RuleSet<EpigeneticMarker>,
    cancer: RuleSet<String>,
    design: RuleSet<StudyDesign>,
    min_population: u32,
    max_population: u32,
}

impl Classifier {
    /// Compile the configured rule tables.
    pub fn new(config: &ClassifierConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            exposure: RuleSet::compile(&config.exposure_rules, ExposureType::Other)?,
            marker: RuleSet::compile(&config.marker_rules, EpigeneticMarker::Other)?,
            cancer: RuleSet::from_names(&config.cancer_types, UNSPECIFIED_CANCER.to_string()),
            design: RuleSet::compile(&config.design_rules, StudyDesign::Other)?,
            min_population: config.min_population,
            max_population: config.max_population,
        })
    }

    /// Classify a title and abstract.
    pub fn classify(&self, title: &str, abstract_text: &str) -> Classification {
        let text = format!("{} {}", title, abstract_text).to_lowercase();

        Classification {
            exposure_type: self.exposure.classify(&text),
            epigenetic_marker: self.marker.classify(&text),
            cancer_type: self.cancer.classify(&text),
            population_size: extract::population_size(
                abstract_text,
                self.min_population,
                self.max_population,
            ),
            epigenetic_effect_size: extract::effect_size(abstract_text),
            study_design: self.design.classify(&text),
        }
    }

    /// Classify a retrieved record.
    pub fn classify_record(&self, record: Record) -> ClassifiedRecord {
        let classification = self.classify(&record.title, &record.abstract_text);
        ClassifiedRecord {
            record,
            classification,
        }
    }

    /// Exposure labels in priority order.
    pub fn exposure_priority(&self) -> Vec<ExposureType> {
        self.exposure.labels().copied().collect()
    }
}
