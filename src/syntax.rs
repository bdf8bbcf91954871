//! Language-agnostic skipping primitives.
//!
//! Every function here takes a cursor and returns the position just past
//! the construct it recognized, or `None` if the cursor is not on one.
//! Unterminated comments, strings and blocks run to the end of the buffer
//! and still count as recognized; callers compare the result with their own
//! limit to detect that.
//!
//! When skipping over arbitrary code, try comments first, then strings,
//! then blocks. Visual Basic comments start with `'`, and Pascal comments
//! use braces.

use crate::profile::{BlockCommentSymbols, LanguageProfile};
use crate::tokens::{Cursor, FundamentalKind};

/// Skipping helpers bound to one language profile.
#[derive(Debug, Clone, Copy)]
pub struct Syntax<'p> {
    profile: &'p LanguageProfile,
}

impl<'p> Syntax<'p> {
    pub fn new(profile: &'p LanguageProfile) -> Self {
        Syntax { profile }
    }

    pub fn profile(&self) -> &'p LanguageProfile {
        self.profile
    }

    /// Block comment first so `--[[` is not read as the line comment `--`.
    pub fn skip_comment<'a>(&self, at: Cursor<'a>) -> Option<Cursor<'a>> {
        self.skip_block_comment(at)
            .or_else(|| self.skip_line_comment(at))
    }

    /// Moves to the line break ending the comment, leaving it unconsumed.
    pub fn skip_line_comment<'a>(&self, at: Cursor<'a>) -> Option<Cursor<'a>> {
        let index = at.matches_any(&self.profile.line_comments, false)?;
        let mut cursor = at.next_by_chars(self.profile.line_comments[index].len());
        while cursor.in_bounds() && cursor.kind() != FundamentalKind::LineBreak {
            cursor = cursor.next();
        }
        Some(cursor)
    }

    fn opening_block_symbols(&self, at: Cursor<'_>) -> Option<&'p BlockCommentSymbols> {
        self.profile
            .block_comments
            .iter()
            .find(|symbols| at.matches(&symbols.open))
    }

    /// Skips a whole block comment, honoring nesting if the language allows it.
    pub fn skip_block_comment<'a>(&self, at: Cursor<'a>) -> Option<Cursor<'a>> {
        let symbols = self.opening_block_symbols(at)?;
        let mut cursor = at.next_by_chars(symbols.open.len());
        let mut closing: Vec<&str> = vec![symbols.close.as_str()];

        while cursor.in_bounds() {
            let Some(&current) = closing.last() else {
                break;
            };
            if let Some(after) = cursor.skip_literal(current, false) {
                cursor = after;
                closing.pop();
                if closing.is_empty() {
                    break;
                }
            } else if let Some(nested) = self
                .profile
                .block_comments_nest
                .then(|| self.opening_block_symbols(cursor))
                .flatten()
            {
                cursor = cursor.next_by_chars(nested.open.len());
                closing.push(&nested.close);
            } else {
                cursor = cursor.next();
            }
        }
        Some(cursor)
    }

    /// Skips a `"` or `'` string with backslash escapes.
    pub fn skip_string<'a>(&self, at: Cursor<'a>) -> Option<Cursor<'a>> {
        let quote = match at.character() {
            Some(c @ ('"' | '\'')) if at.kind() == FundamentalKind::Symbol => c,
            _ => return None,
        };
        let mut cursor = at.next();
        while cursor.in_bounds() {
            if cursor.is_char(quote) {
                return Some(cursor.next());
            } else if cursor.is_char('\\') {
                cursor = cursor.next_by(2);
            } else {
                cursor = cursor.next();
            }
        }
        Some(cursor)
    }

    /// Skips a bracketed block including nested blocks, comments and strings.
    ///
    /// `<` only opens a block when `include_angle` is set, since it is usually
    /// a comparison outside of template parameter lists.
    pub fn skip_block<'a>(&self, at: Cursor<'a>, include_angle: bool) -> Option<Cursor<'a>> {
        let opens = |c: Cursor<'a>| {
            c.kind() == FundamentalKind::Symbol
                && matches!(c.character(), Some('(' | '[' | '{'))
                || (include_angle && c.is_char('<'))
        };
        if !opens(at) {
            return None;
        }

        let mut stack = vec![at.character()?];
        let mut cursor = at.next();
        while cursor.in_bounds() {
            if opens(cursor) {
                stack.push(cursor.character()?);
                cursor = cursor.next();
            } else if closes(cursor, stack.last().copied()) {
                stack.pop();
                cursor = cursor.next();
                if stack.is_empty() {
                    break;
                }
            } else if let Some(after) = self
                .skip_comment(cursor)
                .or_else(|| self.skip_string(cursor))
            {
                cursor = after;
            } else {
                cursor = cursor.next();
            }
        }
        Some(cursor)
    }

    /// Skips anything opaque to prototype scanning: a comment, a string, or a block.
    pub fn skip_opaque<'a>(&self, at: Cursor<'a>, include_angle: bool) -> Option<Cursor<'a>> {
        self.skip_comment(at)
            .or_else(|| self.skip_string(at))
            .or_else(|| self.skip_block(at, include_angle))
    }

    /// Skips something that could be a type or variable name, never passing `limit`.
    ///
    /// Accepts `name`, `$name`, `A.B::C*`, `int[]`, `List<List<T>>`, and glues on
    /// whitespace-separated `*`, `&`, `^` and `const` suffixes, so `int * const`
    /// is one word while the `x` in `int *x` is left alone.
    pub fn skip_type_or_var_name<'a>(&self, at: Cursor<'a>, limit: Cursor<'a>) -> Option<Cursor<'a>> {
        if at >= limit || !(at.kind() == FundamentalKind::Text || is_name_symbol(at)) {
            return None;
        }

        let mut cursor = at.next();
        while cursor < limit {
            if cursor.kind() == FundamentalKind::Text
                || is_name_symbol(cursor)
                || cursor.is_char('.')
                || cursor.is_char('?')
            {
                cursor = cursor.next();
            } else if cursor.matches("::") {
                cursor = cursor.next_by(2);
            } else if cursor.is_char('<') {
                let before = last_non_whitespace(cursor.previous());
                let block = if before.matches_token("operator") {
                    None
                } else {
                    self.skip_block(cursor, true).filter(|end| *end <= limit)
                };
                match block {
                    Some(end) => cursor = end,
                    None => {
                        while cursor < limit && cursor.is_char('<') {
                            cursor = cursor.next();
                        }
                    }
                }
            } else if let Some(end) = self.skip_block(cursor, false) {
                if end > limit {
                    break;
                }
                cursor = end;
            } else if cursor.kind() == FundamentalKind::Whitespace {
                let mut lookahead = cursor.next_past_whitespace(limit);
                while lookahead < limit {
                    let suffix_end = if matches!(lookahead.character(), Some('*' | '&' | '^'))
                        && lookahead.kind() == FundamentalKind::Symbol
                    {
                        Some(lookahead.next())
                    } else if lookahead.text() == "const" && !lookahead.next().is_char('_') {
                        Some(lookahead.next())
                    } else {
                        None
                    };
                    match suffix_end {
                        Some(end) => {
                            cursor = end;
                            lookahead = end.next_past_whitespace(limit);
                        }
                        None => break,
                    }
                }
                break;
            } else {
                break;
            }
        }
        Some(cursor.min(limit))
    }
}

fn closes(at: Cursor<'_>, open: Option<char>) -> bool {
    if at.kind() != FundamentalKind::Symbol {
        return false;
    }
    matches!(
        (open, at.character()),
        (Some('('), Some(')')) | (Some('['), Some(']')) | (Some('{'), Some('}')) | (Some('<'), Some('>'))
    )
}

fn is_name_symbol(at: Cursor<'_>) -> bool {
    at.kind() == FundamentalKind::Symbol
        && matches!(at.character(), Some('_' | '*' | '&' | '^' | '$' | '@' | '%'))
}

/// Nearest non-whitespace token at or before `at`.
fn last_non_whitespace(at: Cursor<'_>) -> Cursor<'_> {
    let mut cursor = at;
    while cursor.kind() == FundamentalKind::Whitespace {
        cursor = cursor.previous();
    }
    cursor
}
