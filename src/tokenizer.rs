//! Directive tokenizer.
//!
//! Scans raw template text for `@name(...)` directives without building a
//! syntax tree. A directive starts at an `@` that is not preceded by a word
//! character, may carry a second `@` (escaped directive), then a name of
//! word characters with an optional `::segment`, optional blanks, and an
//! optional argument list. Parentheses inside the argument list are matched
//! with a depth counter so nested calls stay inside one token; an argument
//! list that never closes is left out of the token.
//!
//! Quotes are not tracked: a `)` inside a string literal still counts.

use crate::models::DirectiveToken;

/// Iterator over directive tokens in source order.
pub struct DirectiveTokenizer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DirectiveTokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    /// Try to read a directive whose `@` sits at `at`. Returns the token
    /// and the offset just past it.
    fn read_at(&self, at: usize) -> Option<(DirectiveToken, usize)> {
        if at > 0 && is_word(self.bytes[at - 1]) {
            return None;
        }
        let mut name_start = at + 1;
        if self.bytes.get(name_start) == Some(&b'@') {
            name_start += 1;
        }
        let mut cur = skip_word(self.bytes, name_start);
        if cur == name_start {
            return None;
        }
        if self.bytes[cur..].starts_with(b"::") {
            let after = skip_word(self.bytes, cur + 2);
            if after > cur + 2 {
                cur = after;
            }
        }
        let name_end = cur;
        while matches!(self.bytes.get(cur), Some(b' ' | b'\t')) {
            cur += 1;
        }
        let end = if self.bytes.get(cur) == Some(&b'(') {
            closing_paren(self.bytes, cur).map_or(cur, |close| close + 1)
        } else {
            cur
        };
        let token = DirectiveToken {
            raw: self.src[at..end].to_string(),
            name: self.src[at + 1..name_end].to_ascii_lowercase(),
            offset: at,
        };
        Some((token, end))
    }
}

impl Iterator for DirectiveTokenizer<'_> {
    type Item = DirectiveToken;

    fn next(&mut self) -> Option<DirectiveToken> {
        while self.pos < self.bytes.len() {
            let at = self.pos + self.bytes[self.pos..].iter().position(|&b| b == b'@')?;
            match self.read_at(at) {
                Some((token, end)) => {
                    self.pos = end;
                    return Some(token);
                }
                None => self.pos = at + 1,
            }
        }
        None
    }
}

/// Tokenize a whole template.
pub fn tokenize(src: &str) -> Vec<DirectiveToken> {
    DirectiveTokenizer::new(src).collect()
}

/// Offset of the `)` balancing the `(` at `open`, if any.
pub(crate) fn closing_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_word(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && is_word(bytes[i]) {
        i += 1;
    }
    i
}
