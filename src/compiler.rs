//! Directive compiler used as an oracle by the analysis passes.
//!
//! `DirectiveCompiler` is the seam: nesting asks it whether a directive opens
//! a block (by inspecting generated code), statistics ask whether a name is a
//! built-in capability, and the slow-compile rule times a full compile.
//!
//! `BladeCompiler` is the bundled implementation. It translates built-in
//! directives, echoes and comments into PHP in the shape the framework's own
//! compiler emits, and accepts user-registered custom directives whose
//! output is a template with an `{expression}` placeholder. Directives it
//! does not know are left untouched, as the framework does.

use crate::error::CompileError;
use crate::models::DirectiveToken;
use crate::tokenizer::tokenize;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Translate template source into host code.
///
/// Implementations must be deterministic and free of side effects; analyses
/// of different views may share one compiler across threads.
pub trait DirectiveCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<String, CompileError>;

    /// Whether `name` (lowercased, without `@`) is compiled by a built-in handler.
    fn has_builtin(&self, name: &str) -> bool;
}

/// Names with a built-in compile handler.
pub const BUILTIN_DIRECTIVES: &[&str] = &[
    "append",
    "auth",
    "break",
    "can",
    "canany",
    "cannot",
    "case",
    "choice",
    "component",
    "componentfirst",
    "continue",
    "csrf",
    "dd",
    "default",
    "dump",
    "each",
    "else",
    "elseauth",
    "elsecan",
    "elsecanany",
    "elsecannot",
    "elseguest",
    "elseif",
    "empty",
    "endauth",
    "endcan",
    "endcanany",
    "endcannot",
    "endcomponent",
    "endcomponentfirst",
    "endempty",
    "endenv",
    "enderror",
    "endfor",
    "endforeach",
    "endforelse",
    "endguest",
    "endif",
    "endisset",
    "endlang",
    "endphp",
    "endprepend",
    "endproduction",
    "endpush",
    "endsection",
    "endslot",
    "endswitch",
    "endunless",
    "endwhile",
    "env",
    "error",
    "extends",
    "for",
    "foreach",
    "forelse",
    "guest",
    "hassection",
    "if",
    "include",
    "includefirst",
    "includeif",
    "includewhen",
    "inject",
    "isset",
    "json",
    "lang",
    "method",
    "overwrite",
    "parent",
    "php",
    "prepend",
    "production",
    "push",
    "section",
    "show",
    "slot",
    "stack",
    "stop",
    "switch",
    "unless",
    "unset",
    "while",
    "yield",
];

const LOOP_POP: &str = "$__env->popLoop(); $loop = $__env->getLastLoop();";
const GATE: &str = "app(\\Illuminate\\Contracts\\Auth\\Access\\Gate::class)";
const LOCAL_VARS: &str = "\\Illuminate\\Support\\Arr::except(get_defined_vars(), ['__data', '__path'])";

#[derive(Debug, Clone, Default)]
pub struct BladeCompiler {
    custom: HashMap<String, String>,
}

impl BladeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom directive. `template` is emitted in place of the
    /// directive with `{expression}` replaced by its argument text.
    pub fn with_directive(mut self, name: &str, template: &str) -> Self {
        self.custom
            .insert(name.trim_start_matches('@').to_ascii_lowercase(), template.to_string());
        self
    }

    pub fn with_directives<'a, I>(self, directives: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        directives
            .into_iter()
            .fold(self, |c, (name, template)| c.with_directive(name, template))
    }

    fn compile_segment(&self, segment: &str) -> Result<String, CompileError> {
        let segment = comment_re().replace_all(segment, "");
        let tokens = tokenize(&segment);
        let mut out = String::with_capacity(segment.len() + 64);
        let mut last = 0usize;
        let mut i = 0usize;
        while i < tokens.len() {
            let tok = &tokens[i];
            let after = tok.offset + tok.raw.len();
            out.push_str(&segment[last..tok.offset]);

            if tok.name == "php" && split_expression(tok).0.is_none() {
                if let Some(j) = tokens[i + 1..].iter().position(|t| t.name == "endphp") {
                    let close = &tokens[i + 1 + j];
                    let body_start = tok.offset + 1 + tok.name.len();
                    out.push_str("<?php");
                    out.push_str(&segment[body_start..close.offset]);
                    out.push_str("?>");
                    last = close.offset + close.raw.len();
                    i += j + 2;
                    continue;
                }
            }

            out.push_str(&self.compile_directive(tok, &segment[after..])?);
            last = after;
            i += 1;
        }
        out.push_str(&segment[last..]);
        Ok(compile_echos(&out))
    }

    fn compile_directive(&self, tok: &DirectiveToken, following: &str) -> Result<String, CompileError> {
        if tok.name.starts_with('@') {
            return Ok(tok.raw[1..].to_string());
        }
        let (expr, tail) = split_expression(tok);
        let known = self.custom.contains_key(&tok.name) || self.has_builtin(&tok.name);
        if known && expr.is_none() && following.starts_with('(') {
            return Err(CompileError::UnbalancedParentheses(tok.name.clone()));
        }
        if let Some(template) = self.custom.get(&tok.name) {
            let inner = expr.map(strip_parens).unwrap_or_default();
            return Ok(format!("{}{}", template.replace("{expression}", inner), tail));
        }
        match compile_builtin(&tok.name, expr)? {
            Some(code) => Ok(format!("{code}{tail}")),
            None => Ok(tok.raw.clone()),
        }
    }
}

impl DirectiveCompiler for BladeCompiler {
    fn compile(&self, source: &str) -> Result<String, CompileError> {
        let mut out = String::with_capacity(source.len() + 64);
        let mut last = 0usize;
        for caps in verbatim_re().captures_iter(source) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            out.push_str(&self.compile_segment(&source[last..whole.start])?);
            out.push_str(caps.get(1).map_or("", |m| m.as_str()));
            last = whole.end;
        }
        let rest = &source[last..];
        if tokenize(rest).iter().any(|t| t.name == "verbatim") {
            return Err(CompileError::UnterminatedBlock("@verbatim"));
        }
        out.push_str(&self.compile_segment(rest)?);
        Ok(out)
    }

    fn has_builtin(&self, name: &str) -> bool {
        BUILTIN_DIRECTIVES.binary_search(&name).is_ok()
    }
}

/// Split a token into its parenthesized expression (if any) and the
/// trailing blanks that follow a bare directive.
fn split_expression(tok: &DirectiveToken) -> (Option<&str>, &str) {
    let rest = &tok.raw[1 + tok.name.len()..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if trimmed.starts_with('(') {
        (Some(trimmed), "")
    } else {
        (None, rest)
    }
}

fn strip_parens(expr: &str) -> &str {
    expr.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(expr)
        .trim()
}

fn compile_builtin(name: &str, expr: Option<&str>) -> Result<Option<String>, CompileError> {
    let need = || expr.ok_or_else(|| CompileError::MissingExpression(name.to_string()));
    let inner = || expr.map(strip_parens).unwrap_or_default();
    let code = match name {
        "if" => format!("<?php if{}: ?>", need()?),
        "elseif" => format!("<?php elseif{}: ?>", need()?),
        "else" => "<?php else: ?>".to_string(),
        "unless" => format!("<?php if (! {}): ?>", need()?),
        "isset" => format!("<?php if(isset{}): ?>", need()?),
        "empty" => match expr {
            Some(e) => format!("<?php if(empty{e}): ?>"),
            None => format!("<?php endforeach; {LOOP_POP} if ($__empty_1): ?>"),
        },
        "hassection" => format!(
            "<?php if (! empty(trim($__env->yieldContent{}))): ?>",
            need()?
        ),
        "auth" => format!("<?php if(auth()->guard({})->check()): ?>", inner()),
        "elseauth" => format!("<?php elseif(auth()->guard({})->check()): ?>", inner()),
        "guest" => format!("<?php if(auth()->guard({})->guest()): ?>", inner()),
        "elseguest" => format!("<?php elseif(auth()->guard({})->guest()): ?>", inner()),
        "production" => "<?php if(app()->environment('production')): ?>".to_string(),
        "env" => format!("<?php if(app()->environment{}): ?>", need()?),
        "can" => format!("<?php if ({GATE}->check{}): ?>", need()?),
        "cannot" => format!("<?php if ({GATE}->denies{}): ?>", need()?),
        "canany" => format!("<?php if ({GATE}->any{}): ?>", need()?),
        "elsecan" => format!("<?php elseif ({GATE}->check{}): ?>", need()?),
        "elsecannot" => format!("<?php elseif ({GATE}->denies{}): ?>", need()?),
        "elsecanany" => format!("<?php elseif ({GATE}->any{}): ?>", need()?),
        "endif" | "endunless" | "endisset" | "endempty" | "endauth" | "endguest"
        | "endproduction" | "endenv" | "endcan" | "endcannot" | "endcanany" | "endforelse" => {
            "<?php endif; ?>".to_string()
        }
        "error" => format!(
            "<?php $__errorArgs = [{}]; $__bag = $errors->getBag($__errorArgs[1] ?? 'default'); \
             if ($__bag->has($__errorArgs[0])) : if (isset($message)) {{ $__messageOriginal = $message; }} \
             $message = $__bag->first($__errorArgs[0]); ?>",
            strip_parens(need()?)
        ),
        "enderror" => "<?php unset($message); if (isset($__messageOriginal)) { $message = $__messageOriginal; } \
                       endif; unset($__errorArgs, $__bag); ?>"
            .to_string(),
        "for" => format!("<?php for{}: ?>", need()?),
        "endfor" => "<?php endfor; ?>".to_string(),
        "foreach" => format!(
            "<?php $__currentLoopData = {}; $__env->addLoop($__currentLoopData); \
             foreach($__currentLoopData as {}): $__env->incrementLoopIndices(); $loop = $__env->getLastLoop(); ?>",
            loop_subject(need()?),
            loop_binding(need()?)
        ),
        "endforeach" => format!("<?php endforeach; {LOOP_POP} ?>"),
        "forelse" => format!(
            "<?php $__empty_1 = true; $__currentLoopData = {}; $__env->addLoop($__currentLoopData); \
             foreach($__currentLoopData as {}): $__env->incrementLoopIndices(); $loop = $__env->getLastLoop(); $__empty_1 = false; ?>",
            loop_subject(need()?),
            loop_binding(need()?)
        ),
        "while" => format!("<?php while{}: ?>", need()?),
        "endwhile" => "<?php endwhile; ?>".to_string(),
        "continue" => match expr {
            Some(e) => format!("<?php if{e} continue; ?>"),
            None => "<?php continue; ?>".to_string(),
        },
        "break" => match expr {
            Some(e) => format!("<?php if{e} break; ?>"),
            None => "<?php break; ?>".to_string(),
        },
        "switch" => format!("<?php switch{}:", need()?),
        "case" => format!("<?php case ({}): ?>", inner()),
        "default" => "<?php default: ?>".to_string(),
        "endswitch" => "<?php endswitch; ?>".to_string(),
        "section" => format!("<?php $__env->startSection{}; ?>", need()?),
        "endsection" | "stop" => "<?php $__env->stopSection(); ?>".to_string(),
        "show" => "<?php echo $__env->yieldSection(); ?>".to_string(),
        "append" => "<?php $__env->appendSection(); ?>".to_string(),
        "overwrite" => "<?php $__env->stopSection(true); ?>".to_string(),
        "yield" => format!("<?php echo $__env->yieldContent{}; ?>", need()?),
        "parent" => "##parent-placeholder##".to_string(),
        "component" => format!("<?php $__env->startComponent{}; ?>", need()?),
        "componentfirst" => format!("<?php $__env->startComponentFirst{}; ?>", need()?),
        "endcomponent" | "endcomponentfirst" => "<?php echo $__env->renderComponent(); ?>".to_string(),
        "slot" => format!("<?php $__env->slot{}; ?>", need()?),
        "endslot" => "<?php $__env->endSlot(); ?>".to_string(),
        "include" => format!(
            "<?php echo $__env->make({}, {LOCAL_VARS})->render(); ?>",
            strip_parens(need()?)
        ),
        "includeif" => {
            let args = strip_parens(need()?);
            format!("<?php if ($__env->exists({args})) echo $__env->make({args}, {LOCAL_VARS})->render(); ?>")
        }
        "includewhen" => format!(
            "<?php echo $__env->renderWhen({}, {LOCAL_VARS}); ?>",
            strip_parens(need()?)
        ),
        "includefirst" => format!(
            "<?php echo $__env->first({}, {LOCAL_VARS})->render(); ?>",
            strip_parens(need()?)
        ),
        "each" => format!("<?php echo $__env->renderEach{}; ?>", need()?),
        "push" => format!("<?php $__env->startPush{}; ?>", need()?),
        "endpush" => "<?php $__env->stopPush(); ?>".to_string(),
        "prepend" => format!("<?php $__env->startPrepend{}; ?>", need()?),
        "endprepend" => "<?php $__env->stopPrepend(); ?>".to_string(),
        "stack" => format!("<?php echo $__env->yieldPushContent{}; ?>", need()?),
        "csrf" => "<?php echo csrf_field(); ?>".to_string(),
        "method" => format!("<?php echo method_field{}; ?>", need()?),
        "dd" => format!("<?php dd{}; ?>", need()?),
        "dump" => format!("<?php dump{}; ?>", need()?),
        "json" => format!("<?php echo json_encode({}, 15, 512) ?>", inner()),
        "lang" => match expr {
            Some(e) => format!("<?php echo app('translator')->get{e}; ?>"),
            None => "<?php $__env->startTranslation(); ?>".to_string(),
        },
        "endlang" => "<?php echo $__env->renderTranslation(); ?>".to_string(),
        "choice" => format!("<?php echo app('translator')->choice{}; ?>", need()?),
        "extends" => {
            need()?;
            String::new()
        }
        "endphp" => " ?>".to_string(),
        "php" => match expr {
            Some(e) => format!("<?php {e}; ?>"),
            None => "@php".to_string(),
        },
        "unset" => format!("<?php unset{}; ?>", need()?),
        "inject" => {
            let args = strip_parens(need()?);
            let (variable, service) = args
                .split_once(',')
                .ok_or_else(|| CompileError::MissingExpression(name.to_string()))?;
            format!(
                "<?php ${} = app({}); ?>",
                variable.trim().trim_matches(['\'', '"']),
                service.trim()
            )
        }
        _ => return Ok(None),
    };
    Ok(Some(code))
}

/// `($items as $item)` -> `$items`
fn loop_subject(expr: &str) -> &str {
    let inner = strip_parens(expr);
    inner.split_once(" as ").map_or(inner, |(s, _)| s.trim())
}

/// `($items as $key => $item)` -> `$key => $item`
fn loop_binding(expr: &str) -> &str {
    let inner = strip_parens(expr);
    inner.split_once(" as ").map_or("$__item", |(_, b)| b.trim())
}

fn compile_echos(code: &str) -> String {
    let code = raw_echo_re().replace_all(code, |caps: &Captures| {
        if caps.get(1).is_some() {
            return caps[0][1..].to_string();
        }
        let nl = caps.get(3).map_or("", |m| m.as_str());
        format!("<?php echo {}; ?>{nl}{nl}", &caps[2])
    });
    let code = triple_echo_re().replace_all(&code, |caps: &Captures| {
        if caps.get(1).is_some() {
            return caps[0][1..].to_string();
        }
        let nl = caps.get(3).map_or("", |m| m.as_str());
        format!("<?php echo e({}); ?>{nl}{nl}", &caps[2])
    });
    regular_echo_re()
        .replace_all(&code, |caps: &Captures| {
            if caps.get(1).is_some() {
                return caps[0][1..].to_string();
            }
            let nl = caps.get(3).map_or("", |m| m.as_str());
            format!("<?php echo e({}); ?>{nl}{nl}", &caps[2])
        })
        .into_owned()
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{--.*?--\}\}").expect("valid comment regex"))
}

fn verbatim_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)@verbatim(.*?)@endverbatim").expect("valid verbatim regex"))
}

fn raw_echo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)(@)?\{!!\s*(.+?)\s*!!\}(\r?\n)?").expect("valid echo regex"))
}

fn triple_echo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)(@)?\{\{\{\s*(.+?)\s*\}\}\}(\r?\n)?").expect("valid echo regex")
    })
}

fn regular_echo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)(@)?\{\{\s*(.+?)\s*\}\}(\r?\n)?").expect("valid echo regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_sorted_and_every_entry_compiles() {
        let mut sorted = BUILTIN_DIRECTIVES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, BUILTIN_DIRECTIVES);
        for name in BUILTIN_DIRECTIVES {
            let out = compile_builtin(name, Some("('a', 'b')")).unwrap();
            assert!(out.is_some(), "no handler for @{name}");
        }
    }

    #[test]
    fn test_conditionals_and_loops() {
        let c = BladeCompiler::new();
        assert_eq!(c.compile("@if($a)").unwrap(), "<?php if($a): ?>");
        assert_eq!(c.compile("@endif").unwrap(), "<?php endif; ?>");
        let out = c.compile("@foreach($users as $user)").unwrap();
        assert!(out.contains("$__currentLoopData = $users;"));
        assert!(out.contains(" foreach($__currentLoopData as $user):"));
        assert!(c.compile("@section('content')").unwrap().contains("->startSection('content')"));
    }

    #[test]
    fn test_echoes_and_comments() {
        let c = BladeCompiler::new();
        assert_eq!(c.compile("{{ $name }}").unwrap(), "<?php echo e($name); ?>");
        assert_eq!(c.compile("{!! $html !!}").unwrap(), "<?php echo $html; ?>");
        assert_eq!(c.compile("@{{ $name }}").unwrap(), "{{ $name }}");
        assert_eq!(c.compile("a{{-- gone --}}b").unwrap(), "ab");
    }

    #[test]
    fn test_unknown_and_escaped_directives_pass_through() {
        let c = BladeCompiler::new();
        assert_eq!(c.compile("@datetime($d)").unwrap(), "@datetime($d)");
        assert_eq!(c.compile("@@if($a)").unwrap(), "@if($a)");
        assert!(!c.has_builtin("datetime"));
        assert!(c.has_builtin("foreach"));
    }

    #[test]
    fn test_extends_leaves_no_inline_code() {
        let c = BladeCompiler::new();
        assert_eq!(c.compile("@extends('layouts.app')\n<p>x</p>").unwrap(), "\n<p>x</p>");
        assert_eq!(
            c.compile("@extends"),
            Err(CompileError::MissingExpression("extends".into()))
        );
    }

    #[test]
    fn test_custom_directive_expands_template() {
        let c = BladeCompiler::new().with_directive("@Datetime", "<?php echo ({expression})->format('Y'); ?>");
        assert_eq!(
            c.compile("@datetime($post->created_at)").unwrap(),
            "<?php echo ($post->created_at)->format('Y'); ?>"
        );
        assert!(!c.has_builtin("datetime"));
    }

    #[test]
    fn test_php_blocks_and_verbatim() {
        let c = BladeCompiler::new();
        assert_eq!(c.compile("@php $a = 1; @endphp").unwrap(), "<?php $a = 1; ?>");
        assert_eq!(c.compile("@php").unwrap(), "@php");
        assert_eq!(
            c.compile("@verbatim {{ raw }} @if @endverbatim").unwrap(),
            " {{ raw }} @if "
        );
    }

    #[test]
    fn test_failures() {
        let c = BladeCompiler::new();
        assert_eq!(
            c.compile("@if"),
            Err(CompileError::MissingExpression("if".into()))
        );
        assert_eq!(
            c.compile("@if($a"),
            Err(CompileError::UnbalancedParentheses("if".into()))
        );
        assert_eq!(
            c.compile("@verbatim never closed"),
            Err(CompileError::UnterminatedBlock("@verbatim"))
        );
    }
}
