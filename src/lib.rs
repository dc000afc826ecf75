//! bladeaudit core library.
//!
//! This crate exposes programmatic APIs for auditing Blade view templates:
//! directive extraction, nesting levels, directive statistics, size metrics
//! and version-aware best-practice notes.
//!
//! High-level modules:
//! - `tokenizer`: Directive occurrences in template text.
//! - `compiler`: The `DirectiveCompiler` seam and the built-in Blade compiler.
//! - `nesting`: Block-opening probe and nesting level calculation.
//! - `stats`: Per-directive counts and built-in/custom classification.
//! - `metrics`: Size, line and element metrics.
//! - `warnings`: Rule engine for audit notes, gated by host version.
//! - `resolver`: Logical view names to files.
//! - `analyze`: Wires the passes together for one view or a batch.
//! - `config`: Discovery and effective configuration resolution.
//! - `models`: Serializable result types and `HostVersion`.
//! - `output`: Human/JSON printers.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `utils`: Console and logging helpers.
//! - `error`: Error types.
pub mod analyze;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod nesting;
pub mod output;
pub mod resolver;
pub mod stats;
pub mod tokenizer;
pub mod utils;
pub mod warnings;
