//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.episynth.toml` files. Every stage receives the parts it needs
//! explicitly; nothing here is global.

use crate::classifier::KeywordRule;
use crate::models::{EpigeneticMarker, ExposureType, StudyDesign};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".episynth.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// File locations.
    #[serde(default)]
    pub general: GeneralConfig,

    /// PubMed search and retrieval settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Classification rule tables.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Fallback values for the master dataset.
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// Manuscript and reference settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// External render steps.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Where stage inputs and outputs live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory for datasets.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for generated documents.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Extraction file written by the fetch stage.
    #[serde(default = "default_extracted_file")]
    pub extracted_file: String,

    /// Raw JSON dump of retrieved records.
    #[serde(default = "default_raw_file")]
    pub raw_file: String,

    /// Master dataset written by the prepare stage.
    #[serde(default = "default_master_file")]
    pub master_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            extracted_file: default_extracted_file(),
            raw_file: default_raw_file(),
            master_file: default_master_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_extracted_file() -> String {
    "epigenetic_extracted.csv".to_string()
}

fn default_raw_file() -> String {
    "pubmed_raw.json".to_string()
}

fn default_master_file() -> String {
    "epigenetic_master_dataset.csv".to_string()
}

/// PubMed E-utilities settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// E-utilities base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// PubMed query term.
    #[serde(default = "default_query")]
    pub query: String,

    /// Publication date lower bound (YYYY/MM/DD).
    #[serde(default = "default_date_from")]
    pub date_from: String,

    /// Publication date upper bound (YYYY/MM/DD).
    #[serde(default = "default_date_to")]
    pub date_to: String,

    /// Maximum number of PMIDs to retrieve.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// PMIDs per summary request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Contact address sent to NCBI.
    #[serde(default)]
    pub email: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Attempts per request before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Base retry delay; attempt `n` waits `n` times this.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Pause between summary batches.
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,

    /// Pause between abstract requests.
    #[serde(default = "default_abstract_delay")]
    pub abstract_delay_ms: u64,

    /// Fetch abstracts for every record.
    #[serde(default = "default_true")]
    pub fetch_abstracts: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query: default_query(),
            date_from: default_date_from(),
            date_to: default_date_to(),
            max_results: default_max_results(),
            batch_size: default_batch_size(),
            email: String::new(),
            timeout_seconds: default_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
            batch_delay_ms: default_batch_delay(),
            abstract_delay_ms: default_abstract_delay(),
            fetch_abstracts: true,
        }
    }
}

fn default_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

fn default_query() -> String {
    concat!(
        r#"(epigenetics[TIAB] OR "DNA methylation"[TIAB] OR "epigenetic"[TIAB]) "#,
        r#"AND (cancer[TIAB] OR neoplasm*[TIAB]) "#,
        r#"AND (prevention[TIAB] OR risk[TIAB] OR lifestyle[TIAB] OR diet[TIAB] "#,
        r#"OR nutrition[TIAB] OR environment*[TIAB]) "#,
        r#"AND (humans[MH]) AND (english[LA]) "#,
        r#"AND (journal article[PT] OR clinical trial[PT] OR cohort studies[MH]) "#,
        r#"NOT (review[PT] OR meta-analysis[PT])"#
    )
    .to_string()
}

fn default_date_from() -> String {
    "2019/01/01".to_string()
}

fn default_date_to() -> String {
    "2025/12/31".to_string()
}

fn default_max_results() -> usize {
    1000
}

fn default_batch_size() -> usize {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_delay() -> u64 {
    1500
}

fn default_batch_delay() -> u64 {
    500
}

fn default_abstract_delay() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

/// Ordered rule tables for each label dimension.
///
/// Order is priority: the first rule that matches decides the label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Smallest accepted population size (inclusive).
    #[serde(default = "default_min_population")]
    pub min_population: u32,

    /// Largest accepted population size (inclusive).
    #[serde(default = "default_max_population")]
    pub max_population: u32,

    /// Cancer names, scanned in this order.
    #[serde(default = "default_cancer_types")]
    pub cancer_types: Vec<String>,

    #[serde(default = "default_exposure_rules")]
    pub exposure_rules: Vec<KeywordRule<ExposureType>>,

    #[serde(default = "default_marker_rules")]
    pub marker_rules: Vec<KeywordRule<EpigeneticMarker>>,

    #[serde(default = "default_design_rules")]
    pub design_rules: Vec<KeywordRule<StudyDesign>>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_population: default_min_population(),
            max_population: default_max_population(),
            cancer_types: default_cancer_types(),
            exposure_rules: default_exposure_rules(),
            marker_rules: default_marker_rules(),
            design_rules: default_design_rules(),
        }
    }
}

fn default_min_population() -> u32 {
    10
}

fn default_max_population() -> u32 {
    100_000
}

fn default_cancer_types() -> Vec<String> {
    vec![
        "colorectal",
        "breast",
        "lung",
        "prostate",
        "pancreatic",
        "liver",
        "hepatocellular",
        "stomach",
        "gastric",
        "esophageal",
        "bladder",
        "ovarian",
        "cervical",
        "thyroid",
        "melanoma",
        "leukemia",
        "lymphoma",
        "myeloma",
        "glioma",
        "neuroblastoma",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_exposure_rules() -> Vec<KeywordRule<ExposureType>> {
    vec![
        KeywordRule::new(
            ExposureType::Nutritional,
            &[
                "nutrition",
                "nutritional",
                "diet",
                "dietary",
                "food",
                "foods",
                "vitamin",
                "supplement",
                "supplementation",
                "folate",
                "folic acid",
                "beta-carotene",
                "omega-3",
                "fatty acid",
                "fiber",
                "polyphenol",
                "flavonoid",
                "coffee",
                "tea",
                "alcohol intake",
                "alcohol consumption",
                "selenium",
                "zinc",
                "microbiome",
                "prebiotic",
                "probiotic",
            ],
        ),
        KeywordRule::new(
            ExposureType::Behavioural,
            &[
                "smoking",
                "tobacco",
                "cigarette",
                "cessation",
                "physical activity",
                "exercise",
                "sedentary",
                "lifestyle",
                "sleep",
                "stress management",
                "mindfulness",
                "yoga",
                "meditation",
                "behavioral",
                "behavioural",
            ],
        ),
        KeywordRule::new(
            ExposureType::Environmental,
            &[
                "environmental",
                "pollution",
                "toxin",
                "chemical",
                "halobenzoquinone",
                "bisphenol",
                "arsenic",
                "cadmium",
                "nickel",
                "particulate matter",
                "pm2.5",
                "air pollution",
                "pesticide",
                "endocrine disruptor",
                "exposure",
                "heavy metal",
            ],
        ),
        KeywordRule::new(
            ExposureType::Screening,
            &[
                "screening",
                "screened",
                "surveillance",
                "early detection",
                "biomarker screening",
                "diagnostic",
                "liquid biopsy",
                "non-invasive test",
                "colorectal screening",
                "mammography",
                "ct colonography",
            ],
        ),
        KeywordRule::new(
            ExposureType::Therapeutic,
            &[
                "therapy",
                "therapeutic",
                "treatment",
                "drug",
                "chemotherapy",
                "radiotherapy",
                "targeted therapy",
                "immunotherapy",
                "pharmacologic",
                "pharmacological",
                "agent",
                "intervention",
                "trial drug",
            ],
        ),
    ]
}

fn default_marker_rules() -> Vec<KeywordRule<EpigeneticMarker>> {
    vec![
        KeywordRule::new(EpigeneticMarker::Sept9, &["sept9", "msept9"]),
        KeywordRule::new(
            EpigeneticMarker::DnaHydroxymethylation,
            &["5-hmc", "hydroxymethylation", "5hmc"],
        ),
        KeywordRule::new(
            EpigeneticMarker::DnaMethylation,
            &["dna methylation", "methylation"],
        ),
        KeywordRule::new(
            EpigeneticMarker::HistoneModification,
            &[
                "histone",
                "histone modification",
                "h3k",
                "h4k",
                "acetylation",
                "deacetylase",
                "methyltransferase",
            ],
        ),
        KeywordRule::new(
            EpigeneticMarker::MiRna,
            &["mirna", "microrna", "mir-", "circulating microrna"],
        ),
        KeywordRule::new(EpigeneticMarker::LncRna, &["lncrna", "long non-coding rna"]),
        KeywordRule::new(EpigeneticMarker::CircRna, &["circrna", "circular rna"]),
        KeywordRule::new(
            EpigeneticMarker::ChromatinRemodeling,
            &[
                "chromatin",
                "swi/snf",
                "arid1b",
                "smarca",
                "chromatin remodeling",
            ],
        ),
        KeywordRule::new(
            EpigeneticMarker::EpigeneticAging,
            &["epigenetic age", "epigenetic clock"],
        ),
    ]
}

fn default_design_rules() -> Vec<KeywordRule<StudyDesign>> {
    vec![
        KeywordRule::new(
            StudyDesign::Cohort,
            &["cohort", "prospective", "retrospective", "longitudinal"],
        ),
        KeywordRule::new(StudyDesign::CaseControl, &["case-control"])
            .with_patterns(&[r"case.control"]),
        KeywordRule::new(StudyDesign::CrossSectional, &["cross-sectional"])
            .with_patterns(&[r"cross.sectional"]),
        KeywordRule::new(
            StudyDesign::ClinicalTrial,
            &["clinical trial", "randomized", "placebo"],
        ),
        KeywordRule::new(
            StudyDesign::MetaAnalysis,
            &["meta-analysis", "systematic review"],
        )
        .with_patterns(&[r"meta.analysis"]),
    ]
}

/// Deterministic fallbacks applied by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_effect_size")]
    pub default_effect_size: f64,

    #[serde(default = "default_population")]
    pub default_population: u32,

    #[serde(default = "default_proportion")]
    pub default_proportion: f64,

    /// Clamp applied to a defaulted proportion positive.
    #[serde(default = "default_proportion_bounds")]
    pub proportion_bounds: (f64, f64),

    /// Added to proportion positive to derive sensitivity.
    #[serde(default = "default_sensitivity_offset")]
    pub sensitivity_offset: f64,

    /// Added to proportion positive to derive specificity.
    #[serde(default = "default_specificity_offset")]
    pub specificity_offset: f64,

    /// Clamp applied to derived sensitivity and specificity.
    #[serde(default = "default_accuracy_bounds")]
    pub accuracy_bounds: (f64, f64),

    #[serde(default = "default_ci_lower_factor")]
    pub ci_lower_factor: f64,

    #[serde(default = "default_ci_upper_factor")]
    pub ci_upper_factor: f64,

    #[serde(default = "default_design")]
    pub default_design: String,

    #[serde(default = "default_country")]
    pub default_country: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            default_effect_size: default_effect_size(),
            default_population: default_population(),
            default_proportion: default_proportion(),
            proportion_bounds: default_proportion_bounds(),
            sensitivity_offset: default_sensitivity_offset(),
            specificity_offset: default_specificity_offset(),
            accuracy_bounds: default_accuracy_bounds(),
            ci_lower_factor: default_ci_lower_factor(),
            ci_upper_factor: default_ci_upper_factor(),
            default_design: default_design(),
            default_country: default_country(),
        }
    }
}

fn default_effect_size() -> f64 {
    0.3
}

fn default_population() -> u32 {
    200
}

fn default_proportion() -> f64 {
    0.65
}

fn default_proportion_bounds() -> (f64, f64) {
    (0.05, 0.95)
}

fn default_sensitivity_offset() -> f64 {
    0.15
}

fn default_specificity_offset() -> f64 {
    0.10
}

fn default_accuracy_bounds() -> (f64, f64) {
    (0.5, 0.95)
}

fn default_ci_lower_factor() -> f64 {
    0.8
}

fn default_ci_upper_factor() -> f64 {
    1.2
}

fn default_design() -> String {
    "other".to_string()
}

fn default_country() -> String {
    "Unspecified".to_string()
}

/// A figure embedded in the manuscript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureSpec {
    pub caption: String,
    pub path: String,
}

/// Manuscript and reference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Manuscript title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Rows shown in the marker and cancer tables.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Marker that gets its own results subsection.
    #[serde(default = "default_focus_marker")]
    pub focus_marker: String,

    /// Year printed in a reference when the record has none.
    #[serde(default = "default_fallback_year")]
    pub fallback_year: String,

    #[serde(default = "default_manuscript_file")]
    pub manuscript_file: String,

    #[serde(default = "default_references_file")]
    pub references_file: String,

    #[serde(default = "default_summary_file")]
    pub summary_file: String,

    #[serde(default = "default_exposure_table_file")]
    pub exposure_table_file: String,

    /// Figures embedded in the results section, in order.
    #[serde(default = "default_figures")]
    pub figures: Vec<FigureSpec>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            top_n: default_top_n(),
            focus_marker: default_focus_marker(),
            fallback_year: default_fallback_year(),
            manuscript_file: default_manuscript_file(),
            references_file: default_references_file(),
            summary_file: default_summary_file(),
            exposure_table_file: default_exposure_table_file(),
            figures: default_figures(),
        }
    }
}

fn default_title() -> String {
    "Factors Influencing Epigenetics in Cancer Prevention: Comprehensive Findings".to_string()
}

fn default_top_n() -> usize {
    10
}

fn default_focus_marker() -> String {
    "SEPT9".to_string()
}

fn default_fallback_year() -> String {
    "2024".to_string()
}

fn default_manuscript_file() -> String {
    "Epigenetics_PublicHealth_Manuscript.md".to_string()
}

fn default_references_file() -> String {
    "references_formatted.txt".to_string()
}

fn default_summary_file() -> String {
    "summary.json".to_string()
}

fn default_exposure_table_file() -> String {
    "exposure_summary.csv".to_string()
}

fn default_figures() -> Vec<FigureSpec> {
    [
        ("Figure 1. PRISMA flow diagram", "figures/Figure1_PRISMA_Flow.png"),
        (
            "Figure 2. Forest plot of SEPT9 methylation studies",
            "figures/Figure2_ForestPlot_mSEPT9.png",
        ),
        (
            "Figure 3. Distribution of epigenetic effects by exposure domain",
            "figures/Figure3_Conceptual_Model.png",
        ),
        (
            "Figure 4. Exposure-level precision plot",
            "figures/Figure4_Exposure_Funnel.png",
        ),
        (
            "Figure 5. Network of exposure comparisons",
            "figures/Figure5_Exposure_Network.png",
        ),
        (
            "Figure 6. Pairwise mean differences heatmap",
            "figures/Figure6_Exposure_Heatmap.png",
        ),
    ]
    .into_iter()
    .map(|(caption, path)| FigureSpec {
        caption: caption.to_string(),
        path: path.to_string(),
    })
    .collect()
}

/// External commands run by the render stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Project root; render commands run from here.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Each entry is a program followed by its arguments, e.g.
    /// `["pandoc", "output/manuscript.md", "-o", "output/manuscript.docx"]`.
    #[serde(default)]
    pub render_commands: Vec<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            render_commands: Vec::new(),
        }
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref query) = args.query {
            self.search.query = query.clone();
        }
        if let Some(max_results) = args.max_results {
            self.search.max_results = max_results;
        }
        if let Some(ref email) = args.email {
            self.search.email = email.clone();
        }
        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.clone();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.clone();
        }
    }

    pub fn extracted_path(&self) -> PathBuf {
        self.general.data_dir.join(&self.general.extracted_file)
    }

    pub fn raw_path(&self) -> PathBuf {
        self.general.data_dir.join(&self.general.raw_file)
    }

    pub fn master_path(&self) -> PathBuf {
        self.general.data_dir.join(&self.general.master_file)
    }

    pub fn references_path(&self) -> PathBuf {
        self.general.output_dir.join(&self.report.references_file)
    }

    pub fn manuscript_path(&self) -> PathBuf {
        self.general.output_dir.join(&self.report.manuscript_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.general.output_dir.join(&self.report.summary_file)
    }

    pub fn exposure_table_path(&self) -> PathBuf {
        self.general.output_dir.join(&self.report.exposure_table_file)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.batch_size, 10);
        assert_eq!(config.search.max_attempts, 3);
        assert_eq!(config.normalizer.default_population, 200);
        assert_eq!(config.classifier.cancer_types[0], "colorectal");
        assert_eq!(
            config.classifier.exposure_rules[0].label,
            ExposureType::Nutritional
        );
        assert_eq!(config.master_path(), PathBuf::from("data/epigenetic_master_dataset.csv"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_dir = "custom_data"

[search]
query = "sept9[TIAB]"
max_results = 50

[classifier]
cancer_types = ["lung", "breast"]

[[classifier.exposure_rules]]
label = "screening"
keywords = ["colonoscopy"]

[report]
top_n = 5

[pipeline]
render_commands = [["pandoc", "in.md", "-o", "out.docx"]]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_dir, PathBuf::from("custom_data"));
        assert_eq!(config.general.output_dir, PathBuf::from("output"));
        assert_eq!(config.search.query, "sept9[TIAB]");
        assert_eq!(config.search.max_results, 50);
        assert_eq!(config.search.batch_size, 10);
        assert_eq!(config.classifier.cancer_types, vec!["lung", "breast"]);
        assert_eq!(config.classifier.exposure_rules.len(), 1);
        assert_eq!(
            config.classifier.exposure_rules[0].label,
            ExposureType::Screening
        );
        // Untouched tables keep their defaults.
        assert_eq!(config.classifier.marker_rules.len(), 9);
        assert_eq!(config.report.top_n, 5);
        assert_eq!(config.pipeline.render_commands[0][0], "pandoc");
    }

    #[test]
    fn test_default_toml_round_trips() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("exposure_rules"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.classifier.design_rules.len(), 5);
        assert_eq!(parsed.report.figures.len(), 6);
    }

    #[test]
    fn test_general_section_has_only_paths() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.contains("verbose"));

        let config: Config = toml::from_str("[general]\ndata_dir = \"d\"\n").unwrap();
        assert_eq!(config.general.data_dir, PathBuf::from("d"));
        assert_eq!(config.general.master_file, "epigenetic_master_dataset.csv");
    }

    #[test]
    fn test_default_figures_match_manuscript() {
        let figures = ReportConfig::default().figures;
        assert_eq!(figures.len(), 6);
        assert_eq!(figures[4].path, "figures/Figure5_Exposure_Network.png");
        assert_eq!(figures[5].path, "figures/Figure6_Exposure_Heatmap.png");
    }

    #[test]
    fn test_render_root_defaults_to_current_dir() {
        let config = Config::default();
        assert_eq!(config.pipeline.root_dir, PathBuf::from("."));

        let config: Config = toml::from_str("[pipeline]\nroot_dir = \"/srv/review\"\n").unwrap();
        assert_eq!(config.pipeline.root_dir, PathBuf::from("/srv/review"));
        assert!(config.pipeline.render_commands.is_empty());
    }
}
