//! Grouped statistics and label tallies.
//!
//! This module computes per-category descriptive statistics and frequency
//! counts over dataset rows. Results are recomputed from scratch on every
//! call.

use crate::models::{
    DatasetOverview, DatasetRow, GroupSummary, LabelCount, MarkerFocus, NormalizedRecord,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Column a summary is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    ExposureType,
    EpigeneticMarker,
    CancerType,
    StudyDesign,
}

/// Read access to the columns aggregation needs.
///
/// Numeric accessors return `None` when the value is absent or
/// unparseable; such rows are skipped for that statistic.
pub trait Observation {
    fn pmid(&self) -> &str;
    fn title(&self) -> &str;
    fn year(&self) -> &str;
    fn label(&self, field: GroupField) -> &str;
    fn effect_size(&self) -> Option<f64>;
    fn population(&self) -> Option<u32>;
    fn proportion_positive(&self) -> Option<f64>;
    fn sample_size(&self) -> Option<u32>;
}

impl Observation for NormalizedRecord {
    fn pmid(&self) -> &str {
        &self.pmid
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn year(&self) -> &str {
        &self.year
    }

    fn label(&self, field: GroupField) -> &str {
        match field {
            GroupField::ExposureType => &self.exposure_type,
            GroupField::EpigeneticMarker => &self.epigenetic_marker,
            GroupField::CancerType => &self.cancer_type,
            GroupField::StudyDesign => &self.study_design,
        }
    }

    fn effect_size(&self) -> Option<f64> {
        Some(self.epigenetic_effect_size)
    }

    fn population(&self) -> Option<u32> {
        Some(self.population_size)
    }

    fn proportion_positive(&self) -> Option<f64> {
        Some(self.proportion_positive)
    }

    fn sample_size(&self) -> Option<u32> {
        Some(self.sample_size)
    }
}

impl Observation for DatasetRow {
    fn pmid(&self) -> &str {
        &self.pmid
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn year(&self) -> &str {
        &self.year
    }

    fn label(&self, field: GroupField) -> &str {
        match field {
            GroupField::ExposureType => &self.exposure_type,
            GroupField::EpigeneticMarker => &self.epigenetic_marker,
            GroupField::CancerType => &self.cancer_type,
            GroupField::StudyDesign => &self.study_design,
        }
    }

    fn effect_size(&self) -> Option<f64> {
        self.epigenetic_effect_size
    }

    fn population(&self) -> Option<u32> {
        self.population_size.and_then(|v| u32::try_from(v).ok())
    }

    fn proportion_positive(&self) -> Option<f64> {
        self.proportion_positive
    }

    fn sample_size(&self) -> Option<u32> {
        self.sample_size.and_then(|v| u32::try_from(v).ok())
    }
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N).
pub fn population_stddev(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Median; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Group rows by `field` and summarize effect size and population.
///
/// Only rows with a parseable effect size contribute. Output is sorted by
/// mean effect descending; equal means are ordered by label ascending.
pub fn aggregate<R: Observation>(rows: &[R], field: GroupField) -> Vec<GroupSummary> {
    let mut effects: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut populations: HashMap<&str, Vec<f64>> = HashMap::new();

    for row in rows {
        let Some(effect) = row.effect_size() else {
            continue;
        };
        let label = row.label(field);
        effects.entry(label).or_default().push(effect);

        if let Some(population) = row.population() {
            populations
                .entry(label)
                .or_default()
                .push(f64::from(population));
        }
    }

    let mut summaries: Vec<GroupSummary> = effects
        .into_iter()
        .map(|(label, values)| GroupSummary {
            category_value: label.to_string(),
            study_count: values.len(),
            mean_effect: mean(&values).unwrap_or(0.0),
            stddev_effect: population_stddev(&values).unwrap_or(0.0),
            median_population: populations
                .get(label)
                .and_then(|p| median(p))
                .unwrap_or(0.0),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.mean_effect
            .total_cmp(&a.mean_effect)
            .then_with(|| a.category_value.cmp(&b.category_value))
    });

    summaries
}

/// The `n` most frequent labels of `field`, ties in first-encountered order.
pub fn top_counts<R: Observation>(rows: &[R], field: GroupField, n: usize) -> Vec<LabelCount> {
    let mut counts: Vec<LabelCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        let label = row.label(field);
        match index.get(label) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(label, counts.len());
                counts.push(LabelCount {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort keeps first-encountered order among equal counts.
    counts.sort_by_key(|c| std::cmp::Reverse(c.count));
    counts.truncate(n);
    counts
}

/// Evidence for one marker. `None` when no row carries it.
pub fn marker_focus<R: Observation>(rows: &[R], marker: &str) -> Option<MarkerFocus> {
    let wanted = marker.trim().to_uppercase();
    let matching: Vec<&R> = rows
        .iter()
        .filter(|r| r.label(GroupField::EpigeneticMarker).trim().to_uppercase() == wanted)
        .collect();

    if matching.is_empty() {
        return None;
    }

    let proportions: Vec<f64> = matching
        .iter()
        .filter_map(|r| r.proportion_positive())
        .collect();
    let samples: Vec<f64> = matching
        .iter()
        .filter_map(|r| r.sample_size())
        .map(f64::from)
        .collect();

    Some(MarkerFocus {
        marker: marker.to_string(),
        records: matching.len(),
        mean_proportion: mean(&proportions),
        median_sample: median(&samples),
        pmids: matching.iter().map(|r| r.pmid().to_string()).collect(),
        titles: matching.iter().map(|r| r.title().to_string()).collect(),
    })
}

/// Dataset-wide headline numbers.
pub fn overview<R: Observation>(rows: &[R]) -> DatasetOverview {
    let unique: HashSet<&str> = rows.iter().map(|r| r.pmid()).collect();
    let years: BTreeSet<&str> = rows
        .iter()
        .map(|r| r.year())
        .filter(|y| !y.is_empty())
        .collect();
    let proportions: Vec<f64> = rows.iter().filter_map(|r| r.proportion_positive()).collect();

    DatasetOverview {
        total_records: rows.len(),
        unique_studies: unique.len(),
        first_year: years.first().map(|y| y.to_string()),
        last_year: years.last().map(|y| y.to_string()),
        mean_proportion_positive: mean(&proportions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pmid: &str, exposure: &str, effect: Option<f64>, population: Option<i64>) -> DatasetRow {
        DatasetRow {
            pmid: pmid.to_string(),
            exposure_type: exposure.to_string(),
            epigenetic_effect_size: effect,
            population_size: population,
            ..DatasetRow::default()
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_mean_and_population_stddev() {
        let values = [0.2, 0.4, 0.6];
        assert!(approx(mean(&values).unwrap(), 0.4));
        assert!(approx(population_stddev(&values).unwrap(), 0.1633));
        assert_eq!(population_stddev(&[0.7]), Some(0.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_aggregate_group_statistics() {
        let rows = vec![
            row("1", "screening", Some(0.2), Some(100)),
            row("2", "screening", Some(0.4), Some(300)),
            row("3", "screening", Some(0.6), Some(200)),
            row("4", "dietary", Some(0.9), Some(50)),
        ];

        let summary = aggregate(&rows, GroupField::ExposureType);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category_value, "dietary");
        assert_eq!(summary[1].category_value, "screening");
        assert_eq!(summary[1].study_count, 3);
        assert!(approx(summary[1].mean_effect, 0.4));
        assert!(approx(summary[1].stddev_effect, 0.1633));
        assert_eq!(summary[1].median_population, 200.0);
    }

    #[test]
    fn test_rows_without_effect_are_skipped() {
        let rows = vec![
            row("1", "screening", None, Some(100)),
            row("2", "screening", Some(0.5), None),
            row("3", "therapeutic", None, Some(80)),
        ];

        let summary = aggregate(&rows, GroupField::ExposureType);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].category_value, "screening");
        assert_eq!(summary[0].study_count, 1);
        assert_eq!(summary[0].median_population, 0.0);
    }

    #[test]
    fn test_equal_means_break_ties_by_label() {
        let rows = vec![
            row("1", "therapeutic", Some(0.3), Some(10)),
            row("2", "behavioural", Some(0.3), Some(10)),
            row("3", "nutritional", Some(0.3), Some(10)),
        ];

        let labels: Vec<_> = aggregate(&rows, GroupField::ExposureType)
            .into_iter()
            .map(|s| s.category_value)
            .collect();
        assert_eq!(labels, vec!["behavioural", "nutritional", "therapeutic"]);
    }

    #[test]
    fn test_top_counts_ties_first_encountered() {
        let rows = vec![
            row("1", "b", None, None),
            row("2", "a", None, None),
            row("3", "c", None, None),
            row("4", "a", None, None),
            row("5", "c", None, None),
            row("6", "d", None, None),
        ];

        let counts = top_counts(&rows, GroupField::ExposureType, 3);
        let labels: Vec<_> = counts.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "c", "b"]);
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn test_marker_focus() {
        let mut a = row("10", "screening", Some(0.5), Some(100));
        a.epigenetic_marker = "SEPT9".to_string();
        a.title = "Plasma SEPT9".to_string();
        a.proportion_positive = Some(0.6);
        a.sample_size = Some(100);
        let mut b = row("11", "screening", Some(0.5), Some(300));
        b.epigenetic_marker = "sept9".to_string();
        b.proportion_positive = Some(0.8);
        b.sample_size = Some(300);
        let mut c = row("12", "screening", Some(0.5), Some(300));
        c.epigenetic_marker = "miRNA".to_string();

        let focus = marker_focus(&[a, b, c], "SEPT9").unwrap();
        assert_eq!(focus.records, 2);
        assert!(approx(focus.mean_proportion.unwrap(), 0.7));
        assert_eq!(focus.median_sample, Some(200.0));
        assert_eq!(focus.pmids, vec!["10", "11"]);
        assert_eq!(focus.titles[0], "Plasma SEPT9");

        assert!(marker_focus(&[row("1", "x", None, None)], "SEPT9").is_none());
    }

    #[test]
    fn test_overview() {
        let mut a = row("1", "x", None, None);
        a.year = "2021".to_string();
        let mut b = row("1", "x", None, None);
        b.year = "2019".to_string();
        let c = row("2", "x", None, None);

        let o = overview(&[a, b, c]);
        assert_eq!(o.total_records, 3);
        assert_eq!(o.unique_studies, 2);
        assert_eq!(o.first_year.as_deref(), Some("2019"));
        assert_eq!(o.last_year.as_deref(), Some("2021"));
        assert_eq!(o.mean_proportion_positive, None);
    }
}
