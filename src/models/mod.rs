//! Shared data models for analysis results and batch reports.

pub mod version;

use serde::Serialize;
use std::path::PathBuf;

pub use version::HostVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A directive occurrence in source order.
pub struct DirectiveToken {
    /// Verbatim matched source, including arguments and trailing blanks.
    pub raw: String,
    /// Lowercased name, keeping a leading `@` for escaped directives.
    pub name: String,
    /// Byte offset of the leading `@`.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestingEntry {
    pub name: String,
    pub level: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DirectiveKind {
    #[serde(rename = "built-in")]
    BuiltIn,
    #[serde(rename = "custom")]
    Custom,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::BuiltIn => "built-in",
            DirectiveKind::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Occurrence count of one distinct directive name.
pub struct DirectiveStat {
    pub name: String,
    pub count: usize,
    pub kind: DirectiveKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single row of the view information table.
pub struct ViewMetric {
    pub label: &'static str,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// An audit note with its rule id as `code`.
pub struct Warning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Everything computed for one view. Built once, never mutated afterwards.
pub struct AnalysisResult {
    pub metrics: Vec<ViewMetric>,
    pub stats: Vec<DirectiveStat>,
    pub nesting: Vec<NestingEntry>,
    pub warnings: Vec<Warning>,
}

impl AnalysisResult {
    pub fn metric(&self, label: &str) -> Option<usize> {
        self.metrics
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.value)
    }

    pub fn max_level(&self) -> usize {
        self.nesting.iter().map(|n| n.level).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
/// An analyzed view together with where it was found.
pub struct ViewReport {
    pub view: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, Serialize)]
/// Aggregated batch summary used by printers.
pub struct Summary {
    pub views: usize,
    pub skipped: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
/// Results of analyzing every discovered view.
pub struct BatchReport {
    pub reports: Vec<ViewReport>,
    pub skipped: Vec<String>,
    pub summary: Summary,
}
