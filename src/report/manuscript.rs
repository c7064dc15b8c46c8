//! Markdown manuscript generation.
//!
//! Every number in the manuscript comes from the [`AnalysisSummary`]; the
//! prose around it is fixed.

use crate::config::{ReportConfig, SearchConfig};
use crate::models::{AnalysisSummary, GroupSummary, LabelCount, MarkerFocus};
use chrono::Utc;

/// Inputs the manuscript is rendered from.
pub struct ManuscriptInput<'a> {
    pub summary: &'a AnalysisSummary,
    pub references: &'a [String],
    pub report: &'a ReportConfig,
    pub search: &'a SearchConfig,
}

/// Generate the complete manuscript.
pub fn generate_markdown_manuscript(input: &ManuscriptInput<'_>) -> String {
    let mut output = String::new();
    let (first_year, last_year) = year_span(input);

    output.push_str(&format!(
        "# {} ({}–{})\n\n",
        input.report.title, first_year, last_year
    ));

    output.push_str(&generate_abstract_section(
        input.summary,
        input.report,
        &first_year,
        &last_year,
    ));
    output.push_str(&generate_introduction_section());
    output.push_str(&generate_methods_section(input.search, input.report));
    output.push_str(&generate_results_section(input.summary, input.report));
    output.push_str(&generate_discussion_section(input.summary));
    output.push_str(&generate_conclusions_section());
    output.push_str(&generate_references_section(input.references));
    output.push_str(&generate_footer());

    output
}

/// Publication year range, falling back to the search window.
fn year_span(input: &ManuscriptInput<'_>) -> (String, String) {
    let search_year = |date: &str| date.chars().take(4).collect::<String>();
    let overview = &input.summary.overview;

    (
        overview
            .first_year
            .clone()
            .unwrap_or_else(|| search_year(&input.search.date_from)),
        overview
            .last_year
            .clone()
            .unwrap_or_else(|| search_year(&input.search.date_to)),
    )
}

/// Capitalize the first letter of every word, as in "Case-Control".
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;

    for c in text.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = !c.is_alphabetic();
    }

    out
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v * 100.0))
        .unwrap_or_else(|| "N/A".to_string())
}

fn generate_abstract_section(
    summary: &AnalysisSummary,
    report: &ReportConfig,
    first_year: &str,
    last_year: &str,
) -> String {
    let mut section = String::new();
    let overview = &summary.overview;

    section.push_str("## Abstract\n\n");
    section.push_str(&format!(
        "**Background:** Epigenetic mechanisms mediate how modifiable exposures shape cancer risk. \
         We synthesized original human studies ({}–{}) quantifying how behavioural, nutritional, \
         environmental, screening, and therapeutic factors affect epigenetic markers relevant to \
         cancer prevention.\n\n",
        first_year, last_year
    ));
    section.push_str(&format!(
        "**Methods:** Automated PubMed retrieval (n={} records, {} unique studies) followed PRISMA 2020 \
         guidance. Data extraction harmonized exposure domains, epigenetic markers, and study-level \
         outcomes into a master dataset summarized with descriptive statistics.\n\n",
        overview.total_records, overview.unique_studies
    ));

    let mut results = String::from("**Results:** ");
    match summary.exposure_groups.first() {
        Some(top) => results.push_str(&format!(
            "{} exposures exhibited the largest standardized epigenetic effect (mean {:.2}) across {} studies. ",
            title_case(&top.category_value),
            top.mean_effect,
            top.study_count
        )),
        None => results.push_str("No exposure group reported a quantified epigenetic effect. "),
    }
    if let Some(marker) = summary.marker_counts.first() {
        results.push_str(&format!(
            "{} dominated the evidence base ({} observations). ",
            marker.label, marker.count
        ));
    }
    results.push_str(&format!(
        "Mean positive detection across all studies was {}.",
        percent(overview.mean_proportion_positive)
    ));
    match summary.focus {
        Some(ref focus) => results.push_str(&format!(
            " {}-based studies (n={}) revealed a mean positivity of {}.",
            focus.marker,
            focus.records,
            percent(focus.mean_proportion)
        )),
        None => results.push_str(&format!(
            " No {}-based studies were identified.",
            report.focus_marker
        )),
    }
    section.push_str(&results);
    section.push_str("\n\n");

    section.push_str(
        "**Conclusions:** Modifiable exposures consistently alter epigenetic markers tied to cancer \
         prevention. The pipeline delivers reproducible evidence synthesis ready for policy, clinical, \
         and research translation.\n\n",
    );

    section
}

fn generate_introduction_section() -> String {
    let mut section = String::new();

    section.push_str("## Introduction\n\n");
    section.push_str(
        "Epigenetic alterations, including DNA methylation, histone modifications, and non-coding RNA \
         regulation, are central to carcinogenesis and prevention strategies. This manuscript \
         consolidates the latest evidence on how modifiable exposures influence such epigenetic \
         mechanisms, enabling targeted cancer prevention policies and personalised intervention \
         design.\n\n",
    );

    section
}

fn generate_methods_section(search: &SearchConfig, report: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Methods\n\n");

    section.push_str("### Data Sources and Search Strategy\n\n");
    section.push_str(&format!(
        "PubMed was queried through the NCBI E-utilities for publications dated {} to {} \
         (at most {} records) using the following strategy:\n\n```\n{}\n```\n\n\
         Retrieved records were deduplicated by PMID and harmonised into a master dataset.\n\n",
        search.date_from, search.date_to, search.max_results, search.query
    ));

    section.push_str("### Study Eligibility\n\n");
    section.push_str(
        "Eligible studies reported quantitative epigenetic outcomes linked to cancer prevention \
         contexts, covering exposures classified as nutritional, behavioural, environmental, \
         screening, therapeutic, or other. Exclusion criteria removed non-human, in vitro, review \
         articles, and reports lacking epigenetic quantification.\n\n",
    );

    section.push_str("### Data Extraction and Processing\n\n");
    section.push_str(
        "Titles and abstracts were classified with ordered keyword and pattern rules into exposure \
         domain, epigenetic marker, cancer type, and study design. Population sizes and effect sizes \
         were extracted from abstract text. Incomplete quantitative fields received deterministic \
         fallback values, and formatted references were generated for all unique PMIDs.\n\n",
    );

    section.push_str("### Statistical Analysis\n\n");
    section.push_str(&format!(
        "Effect sizes were summarized per exposure domain as study counts, means, population standard \
         deviations, and median population sizes. Marker, cancer, and design frequencies were \
         tabulated, and {} studies were summarized separately. Supporting tables and figures are \
         listed under Results.\n\n",
        report.focus_marker
    ));

    section
}

fn generate_results_section(summary: &AnalysisSummary, report: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Results\n\n");
    section.push_str(&generate_overview_subsection(summary));
    section.push_str(&generate_exposure_subsection(&summary.exposure_groups));
    section.push_str(&generate_count_subsection(
        "Epigenetic Marker Representation",
        "The most frequently profiled markers are listed below.",
        "Epigenetic Marker",
        "Records",
        &summary.marker_counts,
        false,
    ));
    section.push_str(&generate_count_subsection(
        "Cancer Contexts",
        "The following diagnoses account for the majority of observations:",
        "Cancer Type",
        "Records",
        &summary.cancer_counts,
        true,
    ));
    section.push_str(&generate_count_subsection(
        "Study Designs",
        "",
        "Design",
        "Count",
        &summary.design_counts,
        true,
    ));
    section.push_str(&generate_focus_subsection(summary.focus.as_ref(), &report.focus_marker));
    section.push_str(&generate_figures_subsection(report));

    section
}

fn generate_overview_subsection(summary: &AnalysisSummary) -> String {
    let mut section = String::new();
    let overview = &summary.overview;

    section.push_str("### Study Overview\n\n");
    section.push_str(&format!(
        "The corpus comprises {} study records representing {} unique publications",
        overview.total_records, overview.unique_studies
    ));
    if let (Some(first), Some(last)) = (&overview.first_year, &overview.last_year) {
        section.push_str(&format!(" from {}–{}", first, last));
    }
    section.push('.');

    let mut designs = summary.design_counts.iter();
    if let Some(lead) = designs.next() {
        section.push_str(&format!(
            " {} designs account for the largest share ({} records)",
            title_case(&lead.label),
            lead.count
        ));
        let rest: Vec<String> = designs
            .map(|d| format!("{} ({})", d.label, d.count))
            .collect();
        if !rest.is_empty() {
            section.push_str(&format!(", followed by {}", rest.join(", ")));
        }
        section.push('.');
    }
    section.push_str("\n\n");

    section
}

fn generate_exposure_subsection(groups: &[GroupSummary]) -> String {
    let mut section = String::new();

    section.push_str("### Exposure-Level Epigenetic Effects\n\n");

    if groups.is_empty() {
        section.push_str("No exposure group reported a quantified epigenetic effect.\n\n");
        return section;
    }

    let narrative: Vec<String> = groups
        .iter()
        .map(|g| {
            format!(
                "{} interventions ({} studies) had a mean standardized epigenetic effect of {:.2} (SD {:.2}).",
                title_case(&g.category_value),
                g.study_count,
                g.mean_effect,
                g.stddev_effect
            )
        })
        .collect();
    section.push_str(&narrative.join(" "));
    section.push_str("\n\n");

    section.push_str("| Exposure | Studies | Mean Effect | SD | Median Sample Size |\n");
    section.push_str("| --- | ---: | ---: | ---: | ---: |\n");
    for g in groups {
        section.push_str(&format!(
            "| {} | {} | {:.3} | {:.3} | {} |\n",
            title_case(&g.category_value),
            g.study_count,
            g.mean_effect,
            g.stddev_effect,
            g.median_population.trunc()
        ));
    }
    section.push('\n');

    section
}

fn generate_count_subsection(
    heading: &str,
    lead: &str,
    label_header: &str,
    count_header: &str,
    counts: &[LabelCount],
    titled: bool,
) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", heading));
    if !lead.is_empty() {
        section.push_str(lead);
        section.push_str("\n\n");
    }

    section.push_str(&format!("| {} | {} |\n| --- | ---: |\n", label_header, count_header));
    for c in counts {
        let label = if titled { title_case(&c.label) } else { c.label.clone() };
        section.push_str(&format!("| {} | {} |\n", label, c.count));
    }
    section.push('\n');

    section
}

fn generate_focus_subsection(focus: Option<&MarkerFocus>, marker: &str) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {} Evidence\n\n", marker));

    let Some(focus) = focus else {
        section.push_str(&format!(
            "No {}-specific studies met the inclusion criteria in the current dataset.\n\n",
            marker
        ));
        return section;
    };

    let median = focus
        .median_sample
        .map(|m| format!("{}", m))
        .unwrap_or_else(|| "N/A".to_string());
    section.push_str(&format!(
        "A total of {} {}-focused records were identified, with a median sample size of {} and a \
         mean positivity rate of {}. Representative study titles include:\n",
        focus.records,
        focus.marker,
        median,
        percent(focus.mean_proportion)
    ));
    for title in &focus.titles {
        section.push_str(&format!("- {}\n", title));
    }
    section.push('\n');

    section
}

fn generate_figures_subsection(report: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("### Figures and Tables\n\n");
    for figure in &report.figures {
        section.push_str(&format!("- {}: `{}`\n", figure.caption, figure.path));
    }
    section.push_str(&format!("- Analysis summary: `{}`\n", report.summary_file));
    section.push_str(&format!("- Exposure summary table: `{}`\n\n", report.exposure_table_file));

    section.push_str("### Embedded Figures\n\n");
    for figure in &report.figures {
        section.push_str(&format!("![{}]({})\n\n", figure.caption, figure.path));
    }

    section
}

fn generate_discussion_section(summary: &AnalysisSummary) -> String {
    let mut section = String::new();

    section.push_str("## Discussion\n\n");

    let lead_marker = summary
        .marker_counts
        .first()
        .map(|m| m.label.as_str())
        .unwrap_or("No single marker");
    let lead_exposure = summary
        .exposure_groups
        .first()
        .map(|g| title_case(&g.category_value))
        .unwrap_or_else(|| "No exposure domain".to_string());

    section.push_str(&format!(
        "{} accounted for the largest share of observations, reflecting both assay accessibility and \
         regulatory relevance. {} exposures displayed the largest standardized epigenetic shifts, \
         while effects in other domains varied across agents and study designs.\n\n",
        lead_marker, lead_exposure
    ));
    section.push_str(
        "Several limitations remain. Quantitative fields required deterministic fallback values when \
         abstracts lacked granular statistics. Rule-based exposure classification warrants periodic \
         manual validation to avoid misclassification of mixed interventions. Effect sizes were \
         extracted from heterogeneous reporting formats rather than harmonized metrics.\n\n",
    );

    section
}

fn generate_conclusions_section() -> String {
    let mut section = String::new();

    section.push_str("## Conclusions\n\n");
    section.push_str(
        "Automated evidence synthesis confirms that modifiable exposures materially influence \
         epigenetic biomarkers linked to cancer prevention. The dataset, figures, and manuscript \
         provide a reproducible foundation for policy guidance and future mechanistic research.\n\n",
    );

    section
}

fn generate_references_section(references: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## References\n\n");
    for reference in references {
        section.push_str(reference);
        section.push('\n');
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by episynth on {}*\n",
        Utc::now().format("%Y-%m-%d")
    )
}
