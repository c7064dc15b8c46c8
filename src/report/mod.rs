//! Report generation.
//!
//! This module renders the reference list, the Markdown manuscript, and
//! the JSON/CSV analysis summaries.

pub mod manuscript;
pub mod references;
pub mod summary;

pub use manuscript::{generate_markdown_manuscript, title_case, ManuscriptInput};
pub use references::{format_references, parse_references, render_references};
pub use summary::{exposure_table, generate_json_summary};
