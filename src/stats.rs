//! Per-directive occurrence counts with built-in/custom classification.

use crate::compiler::DirectiveCompiler;
use crate::models::{DirectiveKind, DirectiveStat, DirectiveToken};
use std::collections::HashMap;

/// Count tokens by name. Output keeps the order of first appearance.
pub fn collect_stats(tokens: &[DirectiveToken], compiler: &dyn DirectiveCompiler) -> Vec<DirectiveStat> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut stats: Vec<DirectiveStat> = Vec::new();
    for tok in tokens {
        match index.get(tok.name.as_str()) {
            Some(&i) => stats[i].count += 1,
            None => {
                index.insert(tok.name.as_str(), stats.len());
                let kind = if compiler.has_builtin(&tok.name) {
                    DirectiveKind::BuiltIn
                } else {
                    DirectiveKind::Custom
                };
                stats.push(DirectiveStat {
                    name: tok.name.clone(),
                    count: 1,
                    kind,
                });
            }
        }
    }
    stats
}
