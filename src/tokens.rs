//! Tokenized source buffer, position cursors, and the two tag side tables.
//!
//! The buffer is immutable once built. Every later stage walks it with
//! [`Cursor`] values and records what it learns in [`CommentTags`] or
//! [`PrototypeTags`], which are owned by the caller and indexed by token.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Sub;

// -- Fundamental kinds --------------------------------------------------------

/// Lexical class of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FundamentalKind {
    /// A run of ASCII letters and digits, or of any non-ASCII characters.
    Text,
    /// A run of spaces and tabs.
    Whitespace,
    /// `\n`, `\r`, or `\r\n`.
    LineBreak,
    /// Exactly one other ASCII character.
    Symbol,
    /// Past either end of the buffer.
    Null,
}

fn kind_of(c: char) -> FundamentalKind {
    match c {
        'a'..='z' | 'A'..='Z' | '0'..='9' => FundamentalKind::Text,
        c if (c as u32) > 0x7F => FundamentalKind::Text,
        ' ' | '\t' => FundamentalKind::Whitespace,
        '\n' | '\r' => FundamentalKind::LineBreak,
        _ => FundamentalKind::Symbol,
    }
}

// -- Buffer -------------------------------------------------------------------

/// Source text split into fundamental tokens with a line table.
#[derive(Debug, Clone)]
pub struct TokenBuffer {
    text: String,
    /// Byte offset of each token, plus a trailing sentinel at `text.len()`.
    starts: Vec<usize>,
    kinds: Vec<FundamentalKind>,
    /// Token index of the first token of each line.
    line_starts: Vec<usize>,
}

impl TokenBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut starts = Vec::new();
        let mut kinds = Vec::new();
        let mut line_starts = vec![0];

        let mut chars = text.char_indices().peekable();
        while let Some((offset, c)) = chars.next() {
            let kind = kind_of(c);
            starts.push(offset);
            kinds.push(kind);

            match kind {
                FundamentalKind::Text | FundamentalKind::Whitespace => {
                    while let Some(&(_, next)) = chars.peek() {
                        if kind_of(next) != kind {
                            break;
                        }
                        chars.next();
                    }
                }
                FundamentalKind::LineBreak => {
                    if c == '\r' && matches!(chars.peek(), Some(&(_, '\n'))) {
                        chars.next();
                    }
                    line_starts.push(kinds.len());
                }
                _ => {}
            }
        }
        starts.push(text.len());

        TokenBuffer {
            text,
            starts,
            kinds,
            line_starts,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_count(&self) -> usize {
        self.kinds.len()
    }

    /// Number of lines. A trailing line break opens one final empty line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn first_token(&self) -> Cursor<'_> {
        Cursor { buf: self, pos: 0 }
    }

    pub fn end(&self) -> Cursor<'_> {
        Cursor {
            buf: self,
            pos: self.kinds.len() as isize,
        }
    }

    /// Cursor at token `index`, clamped to the end sentinel.
    pub fn cursor_at(&self, index: usize) -> Cursor<'_> {
        Cursor {
            buf: self,
            pos: index.min(self.kinds.len()) as isize,
        }
    }

    /// Cursor at the first token of 1-based `line`, or the end sentinel.
    pub fn line_start(&self, line: usize) -> Cursor<'_> {
        match line.checked_sub(1).and_then(|i| self.line_starts.get(i)) {
            Some(&index) => self.cursor_at(index),
            None => self.end(),
        }
    }

    /// Cursor just past the last token of 1-based `line`, including its line break.
    pub fn line_end(&self, line: usize) -> Cursor<'_> {
        self.line_start(line + 1)
    }

    fn line_of(&self, index: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= index).max(1)
    }

    /// Token index starting at byte `offset`, if a token starts exactly there.
    fn token_at_offset(&self, offset: usize) -> Option<usize> {
        self.starts.binary_search(&offset).ok()
    }
}

// -- Cursor -------------------------------------------------------------------

/// A position in a [`TokenBuffer`].
///
/// Cursors are plain values. Movement returns a new cursor and never fails:
/// stepping off either end yields a position whose kind is
/// [`FundamentalKind::Null`].
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a TokenBuffer,
    /// `-1` is before the first token, `kinds.len()` is the end sentinel.
    pos: isize,
}

impl<'a> Cursor<'a> {
    pub fn buffer(&self) -> &'a TokenBuffer {
        self.buf
    }

    pub fn in_bounds(&self) -> bool {
        self.pos >= 0 && (self.pos as usize) < self.buf.kinds.len()
    }

    /// Token index, clamped to `0..=token_count`.
    pub fn index(&self) -> usize {
        self.pos.max(0) as usize
    }

    pub fn kind(&self) -> FundamentalKind {
        if self.in_bounds() {
            self.buf.kinds[self.pos as usize]
        } else {
            FundamentalKind::Null
        }
    }

    pub fn text(&self) -> &'a str {
        if !self.in_bounds() {
            return "";
        }
        let i = self.pos as usize;
        &self.buf.text[self.buf.starts[i]..self.buf.starts[i + 1]]
    }

    /// First character of the current token.
    pub fn character(&self) -> Option<char> {
        self.text().chars().next()
    }

    pub fn is_char(&self, c: char) -> bool {
        self.kind() == FundamentalKind::Symbol && self.character() == Some(c)
    }

    /// 1-based line of the current token. The end sentinel reports the last line.
    pub fn line(&self) -> usize {
        self.buf.line_of(self.index())
    }

    pub fn next(&self) -> Cursor<'a> {
        self.next_by(1)
    }

    pub fn previous(&self) -> Cursor<'a> {
        Cursor {
            buf: self.buf,
            pos: (self.pos - 1).max(-1),
        }
    }

    pub fn next_by(&self, tokens: usize) -> Cursor<'a> {
        Cursor {
            buf: self.buf,
            pos: (self.pos + tokens as isize).min(self.buf.kinds.len() as isize),
        }
    }

    /// Advance until at least `chars` characters have been passed.
    pub fn next_by_chars(&self, chars: usize) -> Cursor<'a> {
        let mut cursor = *self;
        let mut remaining = chars;
        while remaining > 0 && cursor.in_bounds() {
            remaining = remaining.saturating_sub(cursor.text().chars().count());
            cursor = cursor.next();
        }
        cursor
    }

    /// Does `literal` start at this token and end on a token boundary?
    ///
    /// The literal may span several tokens (`/**` is three symbols).
    pub fn matches(&self, literal: &str) -> bool {
        self.match_len(literal, false).is_some()
    }

    pub fn matches_ignore_case(&self, literal: &str) -> bool {
        self.match_len(literal, true).is_some()
    }

    /// Is the current token exactly `text`? Unlike [`Cursor::matches`] this
    /// never spans tokens.
    pub fn matches_token(&self, text: &str) -> bool {
        self.in_bounds() && self.text() == text
    }

    /// Index into `literals` of the first entry that matches here.
    pub fn matches_any<S: AsRef<str>>(&self, literals: &[S], ignore_case: bool) -> Option<usize> {
        literals
            .iter()
            .position(|l| self.match_len(l.as_ref(), ignore_case).is_some())
    }

    /// Number of tokens covered by `literal` if it matches at this position.
    pub fn match_len(&self, literal: &str, ignore_case: bool) -> Option<usize> {
        if !self.in_bounds() || literal.is_empty() {
            return None;
        }
        let start = self.buf.starts[self.pos as usize];
        let end = start + literal.len();
        let candidate = self.buf.text.get(start..end)?;
        let equal = if ignore_case {
            candidate.eq_ignore_ascii_case(literal)
        } else {
            candidate == literal
        };
        if !equal {
            return None;
        }
        let end_token = self.buf.token_at_offset(end)?;
        Some(end_token - self.pos as usize)
    }

    /// Move past `literal` if it matches here.
    pub fn skip_literal(&self, literal: &str, ignore_case: bool) -> Option<Cursor<'a>> {
        self.match_len(literal, ignore_case).map(|n| self.next_by(n))
    }

    /// Skip whitespace tokens without passing `limit`.
    pub fn next_past_whitespace(&self, limit: Cursor<'a>) -> Cursor<'a> {
        let mut cursor = *self;
        while cursor < limit && cursor.kind() == FundamentalKind::Whitespace {
            cursor = cursor.next();
        }
        cursor
    }

    /// Back up over whitespace immediately before this cursor, never before `start`.
    ///
    /// The result is an exclusive end bound with the trailing whitespace removed.
    pub fn previous_past_whitespace(&self, start: Cursor<'a>) -> Cursor<'a> {
        let mut cursor = *self;
        while cursor > start && cursor.previous().kind() == FundamentalKind::Whitespace {
            cursor = cursor.previous();
        }
        cursor
    }

    /// Source text from this cursor up to, but not including, `end`.
    pub fn text_to(&self, end: Cursor<'a>) -> &'a str {
        let from = self.buf.starts[self.index().min(self.buf.kinds.len())];
        let to = self.buf.starts[end.index().min(self.buf.kinds.len())];
        if to <= from {
            ""
        } else {
            &self.buf.text[from..to]
        }
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl Eq for Cursor<'_> {}

impl PartialOrd for Cursor<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cursor<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pos.cmp(&other.pos)
    }
}

impl<'a> Sub for Cursor<'a> {
    type Output = isize;

    /// Distance in tokens.
    fn sub(self, rhs: Cursor<'a>) -> isize {
        self.pos - rhs.pos
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({}, {:?}, {:?})", self.pos, self.kind(), self.text())
    }
}

// -- Comment tags -------------------------------------------------------------

/// Role of a token inside a documentation comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentTag {
    #[default]
    Null,
    CommentSymbol,
    CommentDecoration,
}

/// Comment-role tags, one per token. Each position is written at most once.
#[derive(Debug, Clone)]
pub struct CommentTags {
    tags: Vec<CommentTag>,
}

impl CommentTags {
    pub fn new(buf: &TokenBuffer) -> Self {
        CommentTags {
            tags: vec![CommentTag::Null; buf.token_count()],
        }
    }

    pub fn get(&self, at: Cursor<'_>) -> CommentTag {
        if at.in_bounds() {
            self.tags.get(at.index()).copied().unwrap_or_default()
        } else {
            CommentTag::Null
        }
    }

    /// Tag one token. Returns `false` and leaves the table unchanged if the
    /// position already carries a tag or is out of bounds.
    pub fn set(&mut self, at: Cursor<'_>, tag: CommentTag) -> bool {
        if !at.in_bounds() {
            return false;
        }
        match self.tags.get_mut(at.index()) {
            Some(slot) if *slot == CommentTag::Null => {
                *slot = tag;
                true
            }
            _ => false,
        }
    }

    /// Tag every token in `[start, end)`. Returns how many positions were written.
    pub fn set_range(&mut self, start: Cursor<'_>, end: Cursor<'_>, tag: CommentTag) -> usize {
        let mut written = 0;
        let mut cursor = start;
        while cursor < end && cursor.in_bounds() {
            if self.set(cursor, tag) {
                written += 1;
            }
            cursor = cursor.next();
        }
        written
    }

    pub fn count(&self, tag: CommentTag) -> usize {
        self.tags.iter().filter(|&&t| t == tag).count()
    }
}

// -- Prototype tags -----------------------------------------------------------

/// Role of a token inside a prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrototypeTag {
    #[default]
    Null,
    TypeQualifier,
    Type,
    TypeSuffix,
    OpeningTypeSuffix,
    ClosingTypeSuffix,
    Name,
    NamePrefix,
    NameSuffix,
    OpeningNameSuffix,
    ClosingNameSuffix,
    Modifier,
    OpeningModifier,
    ClosingModifier,
    NameTypeSeparator,
    ParamSeparator,
    DefaultValueSeparator,
    DefaultValue,
    StartOfParams,
    EndOfParams,
}

/// Prototype-role tags, one per token of a prototype buffer.
#[derive(Debug, Clone)]
pub struct PrototypeTags {
    tags: Vec<PrototypeTag>,
}

impl PrototypeTags {
    pub fn new(buf: &TokenBuffer) -> Self {
        PrototypeTags {
            tags: vec![PrototypeTag::Null; buf.token_count()],
        }
    }

    pub fn get(&self, at: Cursor<'_>) -> PrototypeTag {
        if at.in_bounds() {
            self.tags.get(at.index()).copied().unwrap_or_default()
        } else {
            PrototypeTag::Null
        }
    }

    pub fn get_index(&self, index: usize) -> PrototypeTag {
        self.tags.get(index).copied().unwrap_or_default()
    }

    pub fn set(&mut self, at: Cursor<'_>, tag: PrototypeTag) {
        if at.in_bounds() {
            if let Some(slot) = self.tags.get_mut(at.index()) {
                *slot = tag;
            }
        }
    }

    pub fn set_range(&mut self, start: Cursor<'_>, end: Cursor<'_>, tag: PrototypeTag) {
        let mut cursor = start;
        while cursor < end && cursor.in_bounds() {
            self.set(cursor, tag);
            cursor = cursor.next();
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_fundamental_kinds() {
        let buf = TokenBuffer::new("int  x_1;\r\n");
        let kinds: Vec<_> = (0..buf.token_count())
            .map(|i| buf.cursor_at(i).kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                FundamentalKind::Text,
                FundamentalKind::Whitespace,
                FundamentalKind::Text,
                FundamentalKind::Symbol,
                FundamentalKind::Text,
                FundamentalKind::Symbol,
                FundamentalKind::LineBreak,
            ]
        );
        assert_eq!(buf.cursor_at(6).text(), "\r\n");
        assert_eq!(buf.line_count(), 2);
    }

    #[test]
    fn non_ascii_is_text() {
        let buf = TokenBuffer::new("größe=1");
        assert_eq!(buf.first_token().text(), "größe");
        assert_eq!(buf.first_token().kind(), FundamentalKind::Text);
    }

    #[test]
    fn out_of_bounds_is_null() {
        let buf = TokenBuffer::new("a");
        let first = buf.first_token();
        assert_eq!(first.previous().kind(), FundamentalKind::Null);
        assert_eq!(first.previous().previous().kind(), FundamentalKind::Null);
        assert_eq!(first.next().kind(), FundamentalKind::Null);
        assert_eq!(first.next().next().text(), "");
        assert_eq!(first.next_by_chars(10), buf.end());
    }

    #[test]
    fn matches_across_tokens_on_boundary() {
        let buf = TokenBuffer::new("/****** x");
        let c = buf.first_token();
        assert!(c.matches("/*"));
        assert!(c.matches("/**"));
        assert_eq!(c.match_len("/**", false), Some(3));
        assert!(!c.matches("/x"));

        let buf = TokenBuffer::new("operatorX");
        assert!(!buf.first_token().matches("operator"));
        assert!(buf.first_token().matches_token("operatorX"));
        assert!(!buf.first_token().next().matches_token(""));
        assert!(buf.first_token().matches_ignore_case("OPERATORX"));
    }

    #[test]
    fn matches_any_reports_index() {
        let buf = TokenBuffer::new("END;");
        let enders = ["begin", "end"];
        assert_eq!(buf.first_token().matches_any(&enders, true), Some(1));
        assert_eq!(buf.first_token().matches_any(&enders, false), None);
    }

    #[test]
    fn whitespace_helpers() {
        let buf = TokenBuffer::new("  int x  ");
        let start = buf.first_token();
        let first = start.next_past_whitespace(buf.end());
        assert_eq!(first.text(), "int");
        let end = buf.end().previous_past_whitespace(start);
        assert_eq!(first.text_to(end), "int x");
    }

    #[test]
    fn lines_are_one_based() {
        let buf = TokenBuffer::new("a\nb\n\nc");
        assert_eq!(buf.line_count(), 4);
        assert_eq!(buf.line_start(2).text(), "b");
        assert_eq!(buf.line_start(4).line(), 4);
        assert_eq!(buf.line_start(9), buf.end());
        assert_eq!(buf.line_end(1), buf.line_start(2));
    }

    #[test]
    fn cursors_order_and_subtract() {
        let buf = TokenBuffer::new("a b c");
        let a = buf.first_token();
        let c = a.next_by(4);
        assert!(a < c);
        assert_eq!(c - a, 4);
        assert_eq!(a - c, -4);
    }

    #[test]
    fn comment_tags_are_write_once() {
        let buf = TokenBuffer::new("/* x */");
        let mut tags = CommentTags::new(&buf);
        let start = buf.first_token();
        assert_eq!(tags.set_range(start, start.next_by(2), CommentTag::CommentSymbol), 2);
        assert!(!tags.set(start, CommentTag::CommentDecoration));
        assert_eq!(tags.get(start), CommentTag::CommentSymbol);
        assert_eq!(tags.set_range(start, start.next_by(2), CommentTag::CommentSymbol), 0);
        assert!(!tags.set(buf.end(), CommentTag::CommentSymbol));
    }
}
