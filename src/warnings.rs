//! Lint-style warning rules.
//!
//! Every rule is evaluated independently against the raw text and the token
//! stream, and emits at most one `Warning`. Output follows the declaration
//! order of `Rule::ALL`. Rules tied to a framework release are skipped when
//! the configured host version is older than that release.

use crate::compiler::DirectiveCompiler;
use crate::metrics::line_count;
use crate::models::{DirectiveToken, HostVersion, Warning};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

pub const MAX_LINES: usize = 300;
pub const MAX_RAW_ECHOS: usize = 2;
pub const SLOW_COMPILE_THRESHOLD: Duration = Duration::from_millis(700);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    LongView,
    PhpEscape,
    DirConstant,
    FileConstant,
    LegacyCsrfHelper,
    LegacyMethodHelper,
    OrOperator,
    ErrorsHasPattern,
    SlowCompile,
    ExcessiveRawEcho,
}

impl Rule {
    pub const ALL: [Rule; 10] = [
        Rule::LongView,
        Rule::PhpEscape,
        Rule::DirConstant,
        Rule::FileConstant,
        Rule::LegacyCsrfHelper,
        Rule::LegacyMethodHelper,
        Rule::OrOperator,
        Rule::ErrorsHasPattern,
        Rule::SlowCompile,
        Rule::ExcessiveRawEcho,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Rule::LongView => "long-view",
            Rule::PhpEscape => "php-escape",
            Rule::DirConstant => "dir-constant",
            Rule::FileConstant => "file-constant",
            Rule::LegacyCsrfHelper => "legacy-csrf-helper",
            Rule::LegacyMethodHelper => "legacy-method-helper",
            Rule::OrOperator => "or-operator",
            Rule::ErrorsHasPattern => "errors-has-pattern",
            Rule::SlowCompile => "slow-compile",
            Rule::ExcessiveRawEcho => "excessive-raw-echo",
        }
    }

    pub fn from_id(id: &str) -> Option<Rule> {
        Rule::ALL.into_iter().find(|r| r.id() == id)
    }

    /// First host release the rule applies to, if it is version gated.
    pub fn min_version(self) -> Option<HostVersion> {
        match self {
            Rule::LegacyCsrfHelper | Rule::LegacyMethodHelper => Some(HostVersion::new(5, 6, 0)),
            Rule::OrOperator => Some(HostVersion::new(5, 7, 0)),
            Rule::ErrorsHasPattern => Some(HostVersion::new(5, 8, 13)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WarningEngine {
    host_version: HostVersion,
    disabled: HashSet<Rule>,
    slow_compile_threshold: Duration,
}

impl WarningEngine {
    pub fn new(host_version: HostVersion) -> Self {
        Self {
            host_version,
            disabled: HashSet::new(),
            slow_compile_threshold: SLOW_COMPILE_THRESHOLD,
        }
    }

    pub fn with_disabled<I: IntoIterator<Item = Rule>>(mut self, rules: I) -> Self {
        self.disabled.extend(rules);
        self
    }

    pub fn with_slow_compile_threshold(mut self, threshold: Duration) -> Self {
        self.slow_compile_threshold = threshold;
        self
    }

    fn applies(&self, rule: Rule) -> bool {
        !self.disabled.contains(&rule)
            && rule.min_version().map_or(true, |min| self.host_version >= min)
    }

    pub fn detect(
        &self,
        src: &str,
        tokens: &[DirectiveToken],
        compiler: &dyn DirectiveCompiler,
    ) -> Vec<Warning> {
        Rule::ALL
            .into_iter()
            .filter(|&rule| self.applies(rule))
            .filter_map(|rule| {
                self.check(rule, src, tokens, compiler).map(|message| Warning {
                    code: rule.id(),
                    message,
                })
            })
            .collect()
    }

    fn check(
        &self,
        rule: Rule,
        src: &str,
        tokens: &[DirectiveToken],
        compiler: &dyn DirectiveCompiler,
    ) -> Option<String> {
        match rule {
            Rule::LongView => {
                let lines = line_count(src);
                (lines > MAX_LINES).then(|| {
                    format!("View has {lines} lines, it's a good idea to separate & @include codes.")
                })
            }
            Rule::PhpEscape => tokens
                .iter()
                .any(|t| t.name == "php")
                .then(|| "Is not recommended to use php codes directly in your view.".to_string()),
            Rule::DirConstant => src.contains("__DIR__").then(|| {
                "Avoid using __DIR__ because it refers to the location of cache folder, not the view."
                    .to_string()
            }),
            Rule::FileConstant => src.contains("__FILE__").then(|| {
                "Avoid using __FILE__ because it's cached file's location, not the view.".to_string()
            }),
            Rule::LegacyCsrfHelper => csrf_helper_re()
                .is_match(src)
                .then(|| "You could use @csrf instead of {{ csrf_field() }}".to_string()),
            Rule::LegacyMethodHelper => method_helper_re()
                .is_match(src)
                .then(|| "You could use @method(..) instead of {{ method_field(..) }}".to_string()),
            Rule::OrOperator => has_or_fallback(src).then(|| {
                "The \"or\" operator has been removed in favor of ?? as in {{ $var ?? \"\" }}".to_string()
            }),
            Rule::ErrorsHasPattern => errors_has_re().is_match(src).then(|| {
                "You could use @error('..') instead of @if($errors->has(..)).".to_string()
            }),
            Rule::SlowCompile => {
                let started = Instant::now();
                match compiler.compile(src) {
                    Ok(_) => {
                        let elapsed = started.elapsed();
                        tracing::debug!("full compile took {:?}", elapsed);
                        (elapsed > self.slow_compile_threshold).then(|| {
                            format!(
                                "Compiling time ({:.2} seconds) could be better.",
                                elapsed.as_secs_f64()
                            )
                        })
                    }
                    Err(e) => {
                        tracing::debug!("full compile failed, timing skipped: {}", e);
                        None
                    }
                }
            }
            Rule::ExcessiveRawEcho => {
                let n = raw_echo_re().find_iter(src).count();
                (n > MAX_RAW_ECHOS).then(|| {
                    format!("You are using raw echos (un-escaped print) {n} times, be careful.")
                })
            }
        }
    }
}

/// An echo whose body falls back with a standalone `or`, e.g. `{{ $a or 'b' }}`.
/// Blade comments (`{{-- ... --}}`) are not echoes.
fn has_or_fallback(src: &str) -> bool {
    [regular_echo_body_re(), triple_echo_body_re(), unescaped_echo_body_re()]
        .into_iter()
        .flat_map(|re| re.captures_iter(src))
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_str())
        .filter(|body| !body.starts_with("--"))
        .any(|body| or_clause_re().is_match(body))
}

macro_rules! cached_regex {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pat).expect("valid warning regex"))
        }
    };
}

cached_regex!(csrf_helper_re, r"(?:\{\{|\{!!)\s*csrf_field\s*\(");
cached_regex!(method_helper_re, r"(?:\{\{|\{!!)\s*method_field\s*\(");
cached_regex!(errors_has_re, r"(?s)@if\s*\(\s*\$errors->has\s*\(");
cached_regex!(raw_echo_re, r"(?s)\{\{!!\s*(.+?)\s*!!\}\}");
cached_regex!(regular_echo_body_re, r"(?s)\{\{(.*?)\}\}");
cached_regex!(triple_echo_body_re, r"(?s)\{\{\{(.*?)\}\}\}");
cached_regex!(unescaped_echo_body_re, r"(?s)\{!!(.*?)!!\}");
cached_regex!(or_clause_re, r"(?s)\S\s+or\s+\S");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::BladeCompiler;
    use crate::error::CompileError;
    use crate::tokenizer::tokenize;

    fn codes(src: &str, version: &str) -> Vec<&'static str> {
        let engine = WarningEngine::new(version.parse().unwrap());
        let compiler = BladeCompiler::new();
        engine
            .detect(src, &tokenize(src), &compiler)
            .into_iter()
            .map(|w| w.code)
            .collect()
    }

    #[test]
    fn test_long_view_boundary() {
        assert!(codes(&"x\n".repeat(300), "6.0").is_empty());
        let w = WarningEngine::new(HostVersion::LATEST).detect(
            &"x\n".repeat(301),
            &[],
            &BladeCompiler::new(),
        );
        assert_eq!(w[0].code, "long-view");
        assert!(w[0].message.contains("301 lines"));
    }

    #[test]
    fn test_php_escape_needs_php_token() {
        assert_eq!(codes("@php($a = 1)", "6.0"), vec!["php-escape"]);
        assert!(codes("@phpinfo x@php", "6.0").is_empty());
    }

    #[test]
    fn test_magic_constants() {
        assert_eq!(
            codes("{{ __DIR__ }} {{ __FILE__ }}", "6.0"),
            vec!["dir-constant", "file-constant"]
        );
    }

    #[test]
    fn test_csrf_helper_is_version_gated() {
        let src = "<form>{{ csrf_field() }}</form>";
        assert!(codes(src, "5.5.0").is_empty());
        assert_eq!(codes(src, "5.6.0"), vec!["legacy-csrf-helper"]);
        assert_eq!(codes("{!! method_field('PUT') !!}", "5.6"), vec!["legacy-method-helper"]);
    }

    #[test]
    fn test_or_operator() {
        assert_eq!(codes("{{ $name or 'Guest' }}", "5.7"), vec!["or-operator"]);
        assert_eq!(codes("{!! $html or '' !!}", "5.7"), vec!["or-operator"]);
        assert!(codes("{{ $name or 'Guest' }}", "5.6.9").is_empty());
        assert!(codes("{{ $color }} {{ $a ?? 'b' }}", "5.7").is_empty());
        assert!(codes("{{-- this or that --}}", "5.7").is_empty());
    }

    #[test]
    fn test_errors_has_pattern_threshold() {
        let src = "@if ($errors->has('email')) bad @endif";
        assert!(codes(src, "5.8.12").is_empty());
        assert_eq!(codes(src, "5.8.13"), vec!["errors-has-pattern"]);
    }

    #[test]
    fn test_raw_echo_threshold() {
        assert!(codes("{{!! x !!}} {{!! y !!}}", "6.0").is_empty());
        let engine = WarningEngine::new(HostVersion::LATEST);
        let src = "{{!! x !!}} {{!! y !!}} {{!! z !!}}";
        let w = engine.detect(src, &tokenize(src), &BladeCompiler::new());
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].code, "excessive-raw-echo");
        assert!(w[0].message.contains(" 3 times"));
    }

    #[test]
    fn test_order_is_fixed_and_rules_are_independent() {
        let src = format!(
            "{}@php @endphp __FILE__ __DIR__ {{{{ csrf_field() }}}} {{{{!! a !!}}}}{{{{!! b !!}}}}{{{{!! c !!}}}}",
            "\n".repeat(301)
        );
        assert_eq!(
            codes(&src, "6.0"),
            vec![
                "long-view",
                "php-escape",
                "dir-constant",
                "file-constant",
                "legacy-csrf-helper",
                "excessive-raw-echo"
            ]
        );
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let engine = WarningEngine::new(HostVersion::LATEST)
            .with_disabled([Rule::DirConstant, Rule::SlowCompile]);
        let w = engine.detect("__DIR__ __FILE__", &[], &BladeCompiler::new());
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].code, "file-constant");
    }

    struct Sleepy(Duration);

    impl DirectiveCompiler for Sleepy {
        fn compile(&self, source: &str) -> Result<String, CompileError> {
            if source.contains("@fail") {
                return Err(CompileError::MissingExpression("fail".into()));
            }
            std::thread::sleep(self.0);
            Ok(String::new())
        }

        fn has_builtin(&self, _name: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_slow_compile_uses_full_document_timing() {
        let engine = WarningEngine::new(HostVersion::LATEST)
            .with_slow_compile_threshold(Duration::from_millis(5));
        let slow = Sleepy(Duration::from_millis(30));
        let w = engine.detect("hello", &[], &slow);
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].code, "slow-compile");
        assert!(w[0].message.starts_with("Compiling time (0."));

        // a failing compile is swallowed
        assert!(engine.detect("@fail", &[], &slow).is_empty());

        let fast = WarningEngine::new(HostVersion::LATEST);
        assert!(fast.detect("hello", &[], &slow).is_empty());
    }

    #[test]
    fn test_rule_ids_round_trip() {
        for rule in Rule::ALL {
            assert_eq!(Rule::from_id(rule.id()), Some(rule));
        }
        assert_eq!(Rule::from_id("nope"), None);
    }
}
