//! Nesting levels reconstructed from the flat directive stream.
//!
//! A single counter walks the tokens once:
//! - `end*` / `stop*` close a block; the counter drops (never below zero)
//!   before the entry is recorded.
//! - `else*` is recorded one level shallower than the current depth and
//!   leaves the counter alone.
//! - anything else is recorded at the current depth, then opens a block if
//!   the compiler probe says its generated code starts a control structure.
//!
//! Known limitation: because `else*` never moves the counter, directives
//! inside an `@else` branch keep the depth of the `@if` body. Deep trees
//! under `@else` render one column to the right of their `@else`.

use crate::compiler::DirectiveCompiler;
use crate::models::{DirectiveToken, NestingEntry};

/// Substrings of generated code that mark the start of a control structure.
pub const BLOCK_MARKERS: &[&str] = &[
    " if",
    " for",
    " foreach",
    " else",
    "->startSection",
    "->startComponent",
    " while",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    OpensBlock,
    Inline,
    /// The compiler rejected the snippet; treated as inline.
    Failed,
}

impl ProbeResult {
    pub fn opens_block(self) -> bool {
        self == ProbeResult::OpensBlock
    }
}

/// Asks the compiler whether a directive snippet opens a block.
pub struct BlockProbe<'a> {
    compiler: &'a dyn DirectiveCompiler,
}

impl<'a> BlockProbe<'a> {
    pub fn new(compiler: &'a dyn DirectiveCompiler) -> Self {
        Self { compiler }
    }

    pub fn probe(&self, snippet: &str) -> ProbeResult {
        match self.compiler.compile(snippet) {
            Ok(code) if BLOCK_MARKERS.iter().any(|m| code.contains(m)) => ProbeResult::OpensBlock,
            Ok(_) => ProbeResult::Inline,
            Err(e) => {
                tracing::debug!("block probe failed for {:?}: {}", snippet, e);
                ProbeResult::Failed
            }
        }
    }
}

pub fn is_closer(name: &str) -> bool {
    name.starts_with("end") || name.starts_with("stop")
}

pub fn is_else(name: &str) -> bool {
    name.starts_with("else")
}

/// Assign a nesting level to every token, in order.
pub fn calculate_nesting(tokens: &[DirectiveToken], probe: &BlockProbe<'_>) -> Vec<NestingEntry> {
    let mut depth = 0usize;
    let mut out = Vec::with_capacity(tokens.len());
    for tok in tokens {
        if is_closer(&tok.name) {
            depth = depth.saturating_sub(1);
            out.push(NestingEntry {
                name: tok.name.clone(),
                level: depth,
            });
        } else if is_else(&tok.name) {
            out.push(NestingEntry {
                name: tok.name.clone(),
                level: depth.saturating_sub(1),
            });
        } else {
            out.push(NestingEntry {
                name: tok.name.clone(),
                level: depth,
            });
            if probe.probe(&tok.raw).opens_block() {
                depth += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::BladeCompiler;
    use crate::error::CompileError;
    use crate::tokenizer::tokenize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn levels(src: &str) -> Vec<(String, usize)> {
        let compiler = BladeCompiler::new();
        let probe = BlockProbe::new(&compiler);
        calculate_nesting(&tokenize(src), &probe)
            .into_iter()
            .map(|e| (e.name, e.level))
            .collect()
    }

    fn pairs(items: &[(&str, usize)]) -> Vec<(String, usize)> {
        items.iter().map(|(n, l)| (n.to_string(), *l)).collect()
    }

    #[test]
    fn test_if_else_foreach() {
        let got = levels(
            "@if($a)\n @foreach($xs as $x)\n  @include('row')\n @endforeach\n@else\n @csrf\n@endif",
        );
        assert_eq!(
            got,
            pairs(&[
                ("if", 0),
                ("foreach", 1),
                ("include", 2),
                ("endforeach", 1),
                ("else", 0),
                ("csrf", 1),
                ("endif", 0),
            ])
        );
    }

    #[test]
    fn test_unmatched_closer_stays_at_zero() {
        assert_eq!(
            levels("@endif @stop @endsection @if($a) @endif"),
            pairs(&[
                ("endif", 0),
                ("stop", 0),
                ("endsection", 0),
                ("if", 0),
                ("endif", 0)
            ])
        );
    }

    #[test]
    fn test_else_at_top_level_is_zero_and_leaves_depth() {
        assert_eq!(
            levels("@else @section('a') @elseif($b) @yield('x')"),
            pairs(&[("else", 0), ("section", 0), ("elseif", 0), ("yield", 1)])
        );
    }

    #[test]
    fn test_case_insensitive_names() {
        assert_eq!(
            levels("@IF($a) @ENDIF"),
            pairs(&[("if", 0), ("endif", 0)])
        );
    }

    struct Scripted {
        calls: AtomicUsize,
    }

    impl DirectiveCompiler for Scripted {
        fn compile(&self, source: &str) -> Result<String, CompileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match source.trim() {
                "@panel" => Ok("<?php if(true): ?>".into()),
                "@broken" => Err(CompileError::MissingExpression("broken".into())),
                _ => Ok(String::new()),
            }
        }

        fn has_builtin(&self, _name: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_custom_directive_opens_block_via_probe() {
        let compiler = Scripted {
            calls: AtomicUsize::new(0),
        };
        let probe = BlockProbe::new(&compiler);
        let got = calculate_nesting(&tokenize("@panel @broken @a @b @endpanel @c"), &probe);
        let got: Vec<usize> = got.iter().map(|e| e.level).collect();
        assert_eq!(got, vec![0, 1, 1, 1, 0, 0]);
        // closers and else-tokens are never probed
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 5);
        assert_eq!(probe.probe("@broken"), ProbeResult::Failed);
    }

    #[test]
    fn test_output_mirrors_input_length() {
        let src = "@if($a) @if($b) @endif @endif @endif @else @x @y::z @@if";
        let toks = tokenize(src);
        assert_eq!(levels(src).len(), toks.len());
    }
}
