//! Symbol, class and context values.
//!
//! A [`SymbolString`] is a normalized hierarchical name like `A.B.Method`,
//! stored as segments so the separator used in the source (`.`, `::`, `->`)
//! does not matter.

use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

// -- Parameters in titles -----------------------------------------------------

fn is_opening_brace(c: char) -> bool {
    matches!(c, '(' | '[' | '{' | '<')
}

fn is_closing_brace(c: char) -> bool {
    matches!(c, ')' | ']' | '}' | '>')
}

fn braces_match(open: char, close: char) -> bool {
    matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}') | ('<', '>'))
}

/// Byte index of a trailing parameter block like the `(int)` in `Add (int)`.
///
/// Nested braces are balanced, the angle brackets of `operator<` are part of
/// the name, and a title that is entirely in braces has no parameters.
pub fn parameters_index(input: &str) -> Option<usize> {
    let input = input.trim_end();
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let &(_, last) = chars.last()?;
    if chars.len() < 2 || !is_closing_brace(last) {
        return None;
    }

    let mut stack = vec![last];
    let mut found = None;
    for &(index, c) in chars.iter().rev().skip(1) {
        if is_closing_brace(c) {
            stack.push(c);
        } else if is_opening_brace(c) {
            match stack.last() {
                Some(&close) if braces_match(c, close) => {
                    stack.pop();
                    if stack.is_empty() {
                        found = Some((index, c));
                        break;
                    }
                }
                _ => return None,
            }
        }
    }

    let (index, open) = found?;
    if open == '<' {
        let before = input[..index].trim_end_matches(' ');
        let tail = before.get(before.len().saturating_sub(8)..);
        if tail.is_some_and(|t| t.eq_ignore_ascii_case("operator")) {
            return None;
        }
    }
    (index > 0).then_some(index)
}

/// Split `Add (int a)` into `("Add", Some("(int a)"))`.
pub fn split_from_parameters(input: &str) -> (&str, Option<&str>) {
    match parameters_index(input) {
        Some(index) => (input[..index].trim_end(), Some(&input[index..])),
        None => (input, None),
    }
}

/// Like [`split_from_parameters`] but only for a trailing `( )` block.
pub fn split_from_ending_parentheses(input: &str) -> (&str, Option<&str>) {
    match split_from_parameters(input) {
        (name, Some(params)) if params.starts_with('(') => (name, Some(params)),
        _ => (input, None),
    }
}

// -- Symbol strings -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SymbolString {
    segments: Vec<String>,
}

fn is_text_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || (c as u32) > 0x7F
}

impl SymbolString {
    /// Normalize plain text such as `A::B->C ()` into a symbol.
    ///
    /// Trailing parentheses are dropped. `.`, `::` and `->` all separate
    /// segments, and whitespace survives only between two text characters.
    /// Returns `None` if nothing is left.
    pub fn from_plain_text(text: &str) -> Option<SymbolString> {
        let (undecorated, parentheses) = split_from_ending_parentheses(text);
        match Self::normalize(undecorated) {
            Some(symbol) => Some(symbol),
            // "::()" normalizes to nothing without its parentheses.
            None if parentheses.is_some() => Self::normalize(text),
            None => None,
        }
    }

    fn normalize(text: &str) -> Option<SymbolString> {
        let chars: Vec<char> = text.trim().chars().collect();
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let separator_len = match (c, chars.get(i + 1)) {
                ('.', _) => 1,
                (':', Some(':')) => 2,
                ('-', Some('>')) => 2,
                _ => 0,
            };
            if separator_len > 0 {
                push_segment(&mut segments, &mut current);
                i += separator_len;
                continue;
            }

            if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
                let start = i;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                let before = start.checked_sub(1).map(|p| chars[p]);
                let after = chars.get(i).copied();
                if before.is_some_and(is_text_char) && after.is_some_and(is_text_char) && !current.is_empty() {
                    current.push(' ');
                }
                continue;
            }

            current.push(c);
            i += 1;
        }
        push_segment(&mut segments, &mut current);

        (!segments.is_empty()).then_some(SymbolString { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn last_segment(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// `self` followed by the segments of `child`.
    pub fn join(&self, child: &SymbolString) -> SymbolString {
        let mut segments = self.segments.clone();
        segments.extend(child.segments.iter().cloned());
        SymbolString { segments }
    }

    /// Join onto an optional scope.
    pub fn under(scope: Option<&SymbolString>, child: &SymbolString) -> SymbolString {
        match scope {
            Some(scope) => scope.join(child),
            None => child.clone(),
        }
    }

    pub fn starts_with(&self, other: &SymbolString) -> bool {
        self.segments.starts_with(&other.segments)
    }

    pub fn format_with(&self, separator: &str) -> String {
        self.segments.join(separator)
    }
}

fn push_segment(segments: &mut Vec<String>, current: &mut String) {
    let segment = current.trim();
    if !segment.is_empty() {
        segments.push(segment.to_string());
    }
    current.clear();
}

impl fmt::Display for SymbolString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with("."))
    }
}

impl Serialize for SymbolString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// -- Class strings ------------------------------------------------------------

/// Identity of a class-like entity within one hierarchy.
///
/// Languages that ignore case compare symbols without it, so `Widget` and
/// `widget` name the same class there.
#[derive(Debug, Clone, Serialize)]
pub struct ClassString {
    pub hierarchy: String,
    pub symbol: SymbolString,
    #[serde(skip)]
    pub case_sensitive: bool,
}

impl ClassString {
    pub fn new(hierarchy: &str, symbol: SymbolString, case_sensitive: bool) -> Self {
        ClassString {
            hierarchy: hierarchy.to_string(),
            symbol,
            case_sensitive,
        }
    }
}

impl PartialEq for ClassString {
    fn eq(&self, other: &Self) -> bool {
        if self.hierarchy != other.hierarchy {
            return false;
        }
        if self.case_sensitive && other.case_sensitive {
            return self.symbol == other.symbol;
        }
        self.symbol.segments.len() == other.symbol.segments.len()
            && self
                .symbol
                .segments
                .iter()
                .zip(&other.symbol.segments)
                .all(|(a, b)| a.to_lowercase() == b.to_lowercase())
    }
}

impl Eq for ClassString {}

impl Hash for ClassString {
    // Lowercased so that equal values hash alike whatever their sensitivity.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hierarchy.hash(state);
        for segment in &self.symbol.segments {
            segment.to_lowercase().hash(state);
        }
    }
}

// -- Using statements and contexts ---------------------------------------------

/// A file-level using statement that changes how names are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsingString {
    /// `using A.B` lets `C` resolve as `A.B.C`.
    AddPrefix { prefix: SymbolString },
    /// `namespace X = A.B` rewrites a leading `X` as `A.B`.
    ReplacePrefix { from: SymbolString, to: SymbolString },
}

impl UsingString {
    /// Candidate expansions of `symbol` under this statement.
    pub fn apply(&self, symbol: &SymbolString) -> Option<SymbolString> {
        match self {
            UsingString::AddPrefix { prefix } => Some(prefix.join(symbol)),
            UsingString::ReplacePrefix { from, to } => {
                if !symbol.starts_with(from) {
                    return None;
                }
                let rest = SymbolString {
                    segments: symbol.segments[from.segments.len()..].to_vec(),
                };
                Some(to.join(&rest))
            }
        }
    }
}

/// Scope plus using statements in effect at some point in a file.
///
/// A context with no scope is global.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ContextString {
    pub scope: Option<SymbolString>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub usings: Vec<UsingString>,
}

impl ContextString {
    pub fn global(usings: &[UsingString]) -> Self {
        ContextString {
            scope: None,
            usings: usings.to_vec(),
        }
    }

    pub fn scoped(scope: Option<&SymbolString>, usings: &[UsingString]) -> Self {
        ContextString {
            scope: scope.cloned(),
            usings: usings.to_vec(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope.is_none()
    }

    /// Every symbol a reference to `name` written in this context could mean,
    /// innermost scope first.
    pub fn candidates(&self, name: &SymbolString) -> Vec<SymbolString> {
        let mut out = Vec::new();
        if let Some(scope) = &self.scope {
            for depth in (1..=scope.segments.len()).rev() {
                let parent = SymbolString {
                    segments: scope.segments[..depth].to_vec(),
                };
                out.push(parent.join(name));
            }
        }
        out.push(name.clone());
        for using in &self.usings {
            if let Some(expanded) = using.apply(name) {
                out.push(expanded);
            }
        }
        out
    }
}
