//! Analysis entry point.
//!
//! `Analyzer` wires the passes together around an injected compiler and view
//! resolver. Tokenization runs once; nesting, statistics, metrics and
//! warnings are independent views over the same tokens and text. Each call
//! builds a fresh `AnalysisResult`, so batch analysis can run views in
//! parallel without sharing state.

use crate::compiler::DirectiveCompiler;
use crate::error::{AuditError, Result};
use crate::metrics::{collect_metrics, SIZE};
use crate::models::{AnalysisResult, BatchReport, Summary, ViewReport};
use crate::nesting::{calculate_nesting, BlockProbe};
use crate::resolver::ViewResolver;
use crate::stats::collect_stats;
use crate::tokenizer::tokenize;
use crate::warnings::WarningEngine;
use rayon::prelude::*;
use std::fs;

pub struct Analyzer<'a> {
    compiler: &'a dyn DirectiveCompiler,
    resolver: &'a dyn ViewResolver,
    warnings: WarningEngine,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        compiler: &'a dyn DirectiveCompiler,
        resolver: &'a dyn ViewResolver,
        warnings: WarningEngine,
    ) -> Self {
        Self {
            compiler,
            resolver,
            warnings,
        }
    }

    /// Analyze template text that did not come from the resolver.
    pub fn analyze_source(&self, src: &str) -> AnalysisResult {
        analyze_source(src, self.compiler, &self.warnings)
    }

    /// Resolve and analyze one view. A view that cannot be resolved yields
    /// `AuditError::NotFound` and no partial result.
    pub fn analyze_view(&self, name: &str) -> Result<ViewReport> {
        let path = self.resolver.find(name)?;
        let bytes = fs::read(&path).map_err(|source| AuditError::Io {
            path: path.clone(),
            source,
        })?;
        let src = String::from_utf8_lossy(&bytes);
        tracing::debug!("Analyzing view '{}' ({} bytes)", name, bytes.len());
        let mut result = self.analyze_source(&src);
        // Lossy decoding widens invalid bytes; report the file's own size.
        if let Some(size) = result.metrics.iter_mut().find(|m| m.label == SIZE) {
            size.value = bytes.len();
        }
        Ok(ViewReport {
            view: name.to_string(),
            path,
            result,
        })
    }

    /// Analyze every view the resolver knows about. Views that fail to load
    /// are skipped and listed in the report.
    pub fn analyze_all(&self) -> BatchReport {
        let names = self.resolver.list_all();
        let outcomes: Vec<(String, Result<ViewReport>)> = names
            .into_par_iter()
            .map(|name| {
                let res = self.analyze_view(&name);
                (name, res)
            })
            .collect();

        let mut reports = Vec::new();
        let mut skipped = Vec::new();
        for (name, res) in outcomes {
            match res {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::warn!("Skipping view '{}': {}", name, e);
                    skipped.push(name);
                }
            }
        }
        let warnings = reports.iter().map(|r| r.result.warnings.len()).sum();
        BatchReport {
            summary: Summary {
                views: reports.len(),
                skipped: skipped.len(),
                warnings,
            },
            reports,
            skipped,
        }
    }
}

/// Run every pass over `src`.
pub fn analyze_source(
    src: &str,
    compiler: &dyn DirectiveCompiler,
    warnings: &WarningEngine,
) -> AnalysisResult {
    let tokens = tokenize(src);
    let probe = BlockProbe::new(compiler);
    AnalysisResult {
        metrics: collect_metrics(src, &tokens),
        stats: collect_stats(&tokens, compiler),
        nesting: calculate_nesting(&tokens, &probe),
        warnings: warnings.detect(src, &tokens, compiler),
    }
}
