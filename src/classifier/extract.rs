//! Numeric extraction from abstract text.

use regex::Regex;
use std::sync::LazyLock;

/// Population size patterns, tried in order.
static POPULATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)n\s*=\s*(\d+)",
        r"(?i)(\d+)\s+patients",
        r"(?i)(\d+)\s+individuals",
        r"(?i)(\d+)\s+participants",
        r"(?i)cohort\s+of\s+(\d+)",
        r"(?i)sample\s+of\s+(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// How a captured number becomes an effect size.
#[derive(Debug, Clone, Copy)]
enum EffectScale {
    Percent,
    Raw,
}

/// Effect size patterns, tried in order; only the first hit is used.
static EFFECT_PATTERNS: LazyLock<Vec<(Regex, EffectScale)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").unwrap(),
            EffectScale::Percent,
        ),
        (
            Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*fold").unwrap(),
            EffectScale::Raw,
        ),
        (
            Regex::new(r"(?i)or\s*=\s*(\d+(?:\.\d+)?)").unwrap(),
            EffectScale::Raw,
        ),
        (
            Regex::new(r"(?i)hr\s*=\s*(\d+(?:\.\d+)?)").unwrap(),
            EffectScale::Raw,
        ),
    ]
});

/// Study population size.
///
/// For each pattern in order, the first occurrence is taken; it is accepted
/// when it lies in `[min, max]`, otherwise the next pattern is tried.
pub fn population_size(text: &str, min: u32, max: u32) -> Option<u32> {
    POPULATION_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(text)?;
        let value: u32 = caps.get(1)?.as_str().parse().ok()?;
        (min..=max).contains(&value).then_some(value)
    })
}

/// Epigenetic effect size.
///
/// Percentages are divided by 100. The first pattern that matches decides,
/// even if its number fails to parse.
pub fn effect_size(text: &str) -> Option<f64> {
    let (caps, scale) = EFFECT_PATTERNS
        .iter()
        .find_map(|(pattern, scale)| pattern.captures(text).map(|c| (c, *scale)))?;

    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    match scale {
        EffectScale::Percent => Some(value / 100.0),
        EffectScale::Raw => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_cohort_of_patients() {
        assert_eq!(
            population_size("a cohort of 150 patients was enrolled", 10, 100_000),
            Some(150)
        );
    }

    #[test]
    fn test_population_n_equals_first() {
        let text = "We enrolled 300 participants (n = 280 analysed).";
        assert_eq!(population_size(text, 10, 100_000), Some(280));
    }

    #[test]
    fn test_population_out_of_range_falls_through() {
        // "5 patients" is below the floor, so the participants pattern decides.
        let text = "5 patients were excluded from 420 participants";
        assert_eq!(population_size(text, 10, 100_000), Some(420));

        let huge = "registry of 2000000 individuals";
        assert_eq!(population_size(huge, 10, 100_000), None);
    }

    #[test]
    fn test_population_bounds_inclusive() {
        assert_eq!(population_size("n=10", 10, 100_000), Some(10));
        assert_eq!(population_size("n=100000", 10, 100_000), Some(100_000));
        assert_eq!(population_size("n=9", 10, 100_000), None);
    }

    #[test]
    fn test_population_empty() {
        assert_eq!(population_size("", 10, 100_000), None);
    }

    #[test]
    fn test_effect_percentage_wins_over_fold() {
        let text = "a 2.5-fold increase and 45% methylation";
        let effect = effect_size(text).unwrap();
        assert!((effect - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_effect_fold_then_ratios() {
        assert_eq!(effect_size("a 3.2 fold change"), Some(3.2));
        assert_eq!(effect_size("risk increased (OR = 1.8)"), Some(1.8));
        assert_eq!(effect_size("survival (HR=0.72)"), Some(0.72));
        assert_eq!(effect_size("OR = 1.5 and HR = 0.9"), Some(1.5));
    }

    #[test]
    fn test_effect_none() {
        assert_eq!(effect_size(""), None);
        assert_eq!(effect_size("no numbers here"), None);
    }
}
