//! Hand-rolled parser for the `@{SESSION_ID}.path` reference grammar.
//!
//! No operators, no method calls: just dotted field access with optional
//! list indexing and a literal fallback value.

use std::iter::Peekable;
use std::str::CharIndices;

/// Marks the start of a reference inside an input template string.
pub const SENTINEL_PREFIX: &str = "@{SESSION_ID}.";

/// One `name` or `name[index]` hop in a reference path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: String,
    pub index: Option<i64>,
}

/// A single `@{SESSION_ID}.path[|default]` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub segments: Vec<PathSegment>,
    pub default: Option<String>,
}

/// A template string broken into literal runs and references.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Ref(Reference),
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

#[derive(Clone)]
struct Scanner<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map(|&(p, _)| p).unwrap_or(self.input.len())
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }
}

/// Parse as many `name` or `name[index]` segments as possible starting at
/// the scanner's current position, stopping at the first character that
/// can't extend the path. Never fails: zero segments just means the text
/// after the sentinel wasn't a valid reference.
fn parse_path(scanner: &mut Scanner) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    loop {
        let start = scanner.pos();
        while scanner.peek_char().map(is_ident_char).unwrap_or(false) {
            scanner.bump();
        }
        let end = scanner.pos();
        if end == start {
            break;
        }
        let name = scanner.input[start..end].to_string();

        let mut index = None;
        if scanner.peek_char() == Some('[') {
            let checkpoint = scanner.clone();
            scanner.bump();
            let num_start = scanner.pos();
            if scanner.peek_char() == Some('-') {
                scanner.bump();
            }
            while scanner.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                scanner.bump();
            }
            let num_end = scanner.pos();
            if scanner.peek_char() == Some(']') && num_end > num_start {
                match scanner.input[num_start..num_end].parse::<i64>() {
                    Ok(n) => {
                        scanner.bump();
                        index = Some(n);
                    }
                    Err(_) => *scanner = checkpoint,
                }
            } else {
                *scanner = checkpoint;
            }
        }

        segments.push(PathSegment { name, index });

        if scanner.peek_char() == Some('.') {
            scanner.bump();
            continue;
        }
        break;
    }
    segments
}

/// Split a template string into literal and reference parts.
pub fn parse_template(input: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut rest = input;

    loop {
        let Some(pos) = rest.find(SENTINEL_PREFIX) else {
            if !rest.is_empty() {
                parts.push(TemplatePart::Literal(rest.to_string()));
            }
            break;
        };

        if pos > 0 {
            parts.push(TemplatePart::Literal(rest[..pos].to_string()));
        }
        let after_prefix = &rest[pos + SENTINEL_PREFIX.len()..];

        let mut scanner = Scanner::new(after_prefix);
        let segments = parse_path(&mut scanner);
        if segments.is_empty() {
            // Not actually a reference: treat the sentinel text as literal
            // and keep scanning from right after it.
            parts.push(TemplatePart::Literal(SENTINEL_PREFIX.to_string()));
            rest = after_prefix;
            continue;
        }

        let path_len = scanner.pos();
        let mut remainder = &after_prefix[path_len..];
        let mut default = None;
        if let Some(stripped) = remainder.strip_prefix('|') {
            let end = stripped.find("@{").unwrap_or(stripped.len());
            default = Some(stripped[..end].to_string());
            remainder = &stripped[end..];
        }

        parts.push(TemplatePart::Ref(Reference { segments, default }));
        rest = remainder;
    }

    parts
}
