//! Basic file metrics shown in the view information table.

use crate::models::{DirectiveToken, ViewMetric};
use crate::nesting::{is_closer, is_else};

pub const SIZE: &str = "Size (bytes)";
pub const LINES: &str = "Lines";
pub const LONGEST_LINE: &str = "Longest Line (chars)";
pub const DIRECTIVES: &str = "Directives";
pub const HTML_ELEMENTS: &str = "HTML elements";

/// Metric rows in display order. The markup row is omitted for empty text.
pub fn collect_metrics(src: &str, tokens: &[DirectiveToken]) -> Vec<ViewMetric> {
    let mut rows = vec![
        ViewMetric {
            label: SIZE,
            value: src.len(),
        },
        ViewMetric {
            label: LINES,
            value: line_count(src),
        },
        ViewMetric {
            label: LONGEST_LINE,
            value: longest_line(src),
        },
        ViewMetric {
            label: DIRECTIVES,
            value: directive_count(tokens),
        },
    ];
    if let Some(n) = count_elements(&without_directives(src, tokens)) {
        rows.push(ViewMetric {
            label: HTML_ELEMENTS,
            value: n,
        });
    }
    rows
}

/// Number of newline characters.
pub fn line_count(src: &str) -> usize {
    src.bytes().filter(|&b| b == b'\n').count()
}

/// Length in characters of the longest `\n`-separated line.
pub fn longest_line(src: &str) -> usize {
    src.split('\n').map(|l| l.chars().count()).max().unwrap_or(0)
}

/// Opening and standalone directives only; `end*`, `stop*`, `else*` are skipped.
pub fn directive_count(tokens: &[DirectiveToken]) -> usize {
    tokens
        .iter()
        .filter(|t| !is_closer(&t.name) && !is_else(&t.name))
        .count()
}

/// Elements whose content is text, not markup.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

/// Count start tags with a permissive scan.
///
/// Comments, `<!...>` declarations, `<?...?>` processing blocks and closing
/// tags are not elements. Quoted attribute values and the content of
/// raw-text elements are skipped. Nothing is validated, so stray or
/// unclosed tags still count. Returns `None` for empty input.
pub fn count_elements(src: &str) -> Option<usize> {
    if src.is_empty() {
        return None;
    }
    let bytes = src.as_bytes();
    let mut count = 0usize;
    let mut i = 0usize;
    while let Some(off) = bytes[i..].iter().position(|&b| b == b'<') {
        let at = i + off;
        let rest = &bytes[at..];
        i = if rest.starts_with(b"<!--") {
            find_from(bytes, at + 4, b"-->").map_or(bytes.len(), |e| e + 3)
        } else if rest.starts_with(b"<?") {
            find_from(bytes, at + 2, b"?>").map_or(bytes.len(), |e| e + 2)
        } else if rest.starts_with(b"<!") {
            find_from(bytes, at + 2, b">").map_or(bytes.len(), |e| e + 1)
        } else if rest.get(1).is_some_and(u8::is_ascii_alphabetic) {
            count += 1;
            let name_end = bytes[at + 1..]
                .iter()
                .position(|&b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b':'))
                .map_or(bytes.len(), |p| at + 1 + p);
            let name = src[at + 1..name_end].to_ascii_lowercase();
            let content = tag_end(bytes, name_end);
            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                raw_text_end(bytes, content, &name)
            } else {
                content
            }
        } else {
            at + 1
        };
    }
    Some(count)
}

fn find_from(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Offset just past the `>` that ends a start tag, ignoring `>` in quotes.
fn tag_end(bytes: &[u8], from: usize) -> usize {
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
    }
    bytes.len()
}

/// Offset of the `</name` that closes a raw-text element.
fn raw_text_end(bytes: &[u8], from: usize, name: &str) -> usize {
    let mut i = from;
    while let Some(at) = find_from(bytes, i, b"</") {
        let tag = at + 2;
        if bytes
            .get(tag..tag + name.len())
            .is_some_and(|t| t.eq_ignore_ascii_case(name.as_bytes()))
        {
            return at;
        }
        i = tag;
    }
    bytes.len()
}

/// `src` with every directive token blanked out, so comparisons inside
/// directive arguments are not read as tags.
fn without_directives(src: &str, tokens: &[DirectiveToken]) -> String {
    let mut out = String::with_capacity(src.len());
    let mut last = 0usize;
    for tok in tokens {
        if tok.offset < last {
            continue;
        }
        out.push_str(&src[last..tok.offset]);
        out.extend(std::iter::repeat(' ').take(tok.raw.len()));
        last = tok.offset + tok.raw.len();
    }
    out.push_str(&src[last..]);
    out
}
