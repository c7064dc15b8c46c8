//! Master dataset normalization.
//!
//! Turns extraction rows into [`NormalizedRecord`]s with every numeric
//! field populated. Missing or malformed values are replaced by the
//! deterministic fallbacks in [`NormalizerConfig`]; nothing here fails.

use crate::config::NormalizerConfig;
use crate::models::{DatasetRow, NormalizedRecord};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

fn clamp(value: f64, (lower, upper): (f64, f64)) -> f64 {
    value.max(lower).min(upper)
}

fn positive(value: Option<i64>) -> Option<u32> {
    value
        .filter(|v| *v > 0)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

fn in_open_unit(value: f64) -> bool {
    value > 0.0 && value < 1.0
}

fn in_half_open_unit(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

/// Extract a 19xx/20xx year from a raw date field.
pub fn normalize_year(raw: &str) -> String {
    YEAR.find(raw.trim())
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Normalize one extraction row.
pub fn normalize(row: &DatasetRow, config: &NormalizerConfig) -> NormalizedRecord {
    let effect = row.epigenetic_effect_size.unwrap_or_else(|| {
        debug!("PMID {}: effect size missing, using fallback", row.pmid);
        config.default_effect_size
    });

    let population = positive(row.population_size).unwrap_or_else(|| {
        debug!("PMID {}: population size missing, using fallback", row.pmid);
        config.default_population
    });

    let sample_size = positive(row.sample_size).unwrap_or(population);

    let proportion = match row.proportion_positive {
        Some(p) if in_open_unit(p) => p,
        _ => {
            let seed = if in_open_unit(effect) {
                effect
            } else {
                config.default_proportion
            };
            clamp(seed, config.proportion_bounds)
        }
    };

    let sensitivity = match row.sensitivity {
        Some(s) if in_half_open_unit(s) => s,
        _ => clamp(proportion + config.sensitivity_offset, config.accuracy_bounds),
    };

    let specificity = match row.specificity {
        Some(s) if in_half_open_unit(s) => s,
        _ => clamp(proportion + config.specificity_offset, config.accuracy_bounds),
    };

    let study_design = match row.study_design.trim() {
        "" => config.default_design.clone(),
        design => design.to_string(),
    };

    let country = match row.country.trim() {
        "" => config.default_country.clone(),
        country => country.to_string(),
    };

    NormalizedRecord {
        pmid: row.pmid.clone(),
        doi: row.doi.clone(),
        title: row.title.clone(),
        authors: row.authors.clone(),
        year: normalize_year(&row.year),
        journal: row.journal.clone(),
        abstract_text: row.abstract_text.clone(),
        exposure_type: row.exposure_type.clone(),
        epigenetic_marker: row.epigenetic_marker.clone(),
        epigenetic_effect_size: effect,
        cancer_type: row.cancer_type.clone(),
        population_size: population,
        study_design,
        country,
        proportion_positive: proportion,
        sample_size,
        sensitivity,
        specificity,
        ci_lower: (effect * config.ci_lower_factor).max(0.0),
        ci_upper: effect * config.ci_upper_factor,
    }
}

/// Normalize every row.
pub fn normalize_all(rows: &[DatasetRow], config: &NormalizerConfig) -> Vec<NormalizedRecord> {
    rows.iter().map(|row| normalize(row, config)).collect()
}
