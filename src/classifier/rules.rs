//! Ordered first-match-wins rule tables.

use crate::error::PipelineError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One configured rule: a label and the terms that select it.
///
/// `keywords` are plain substrings, `patterns` are regular expressions.
/// Both are matched case-insensitively against lower-cased text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule<L> {
    pub label: L,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl<L> KeywordRule<L> {
    pub fn new(label: L, keywords: &[&str]) -> Self {
        Self {
            label,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            patterns: Vec::new(),
        }
    }

    pub fn with_patterns(mut self, patterns: &[&str]) -> Self {
        self.patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
struct CompiledRule<L> {
    label: L,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

impl<L> CompiledRule<L> {
    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
            || self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// An ordered list of rules with a default label.
///
/// Evaluation stops at the first matching rule; later rules are never
/// consulted, so list order is the priority order.
#[derive(Debug, Clone)]
pub struct RuleSet<L> {
    rules: Vec<CompiledRule<L>>,
    default: L,
}

impl<L: Clone> RuleSet<L> {
    /// Compile configured rules. Fails on the first invalid pattern.
    pub fn compile(rules: &[KeywordRule<L>], default: L) -> Result<Self, PipelineError> {
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            let patterns = rule
                .patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .map_err(|source| PipelineError::InvalidRule {
                            rule: p.clone(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            compiled.push(CompiledRule {
                label: rule.label.clone(),
                keywords: rule
                    .keywords
                    .iter()
                    .filter(|k| !k.is_empty())
                    .map(|k| k.to_lowercase())
                    .collect(),
                patterns,
            });
        }

        Ok(Self {
            rules: compiled,
            default,
        })
    }

    /// Build a rule set from plain names, each name being its own label.
    pub fn from_names<S: AsRef<str>>(names: &[S], default: L) -> Self
    where
        L: From<String>,
    {
        let rules = names
            .iter()
            .map(|n| n.as_ref().to_lowercase())
            .filter(|n| !n.is_empty())
            .map(|n| CompiledRule {
                label: L::from(n.clone()),
                keywords: vec![n],
                patterns: Vec::new(),
            })
            .collect();

        Self { rules, default }
    }

    /// Label of the first matching rule, or the default.
    ///
    /// `text` must already be lower-cased.
    pub fn classify(&self, text: &str) -> L {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| rule.label.clone())
            .unwrap_or_else(|| self.default.clone())
    }

    /// Labels in priority order.
    pub fn labels(&self) -> impl Iterator<Item = &L> {
        self.rules.iter().map(|r| &r.label)
    }
}
