//! Comment candidate scanner.
//!
//! Walks a buffer line by line and reports every comment that is
//! syntactically eligible to hold documentation. Delimiters of accepted
//! comments are tagged [`CommentTag::CommentSymbol`], and horizontal-rule
//! lines inside them [`CommentTag::CommentDecoration`].
//!
//! Order of attempts on each line:
//!
//! 1. Javadoc block comments (`/**`), which must not be followed by another symbol
//! 2. plain block comments, minus Splint-style `/*@ ... @*/` annotations
//! 3. XML line comments (`///`), then a Javadoc re-check on the same line
//! 4. Javadoc line comments (`##` followed by `#` lines)
//! 5. plain line comments

use crate::cancel::{Cancellation, Outcome};
use crate::profile::LanguageProfile;
use crate::tokens::{CommentTag, CommentTags, Cursor, FundamentalKind, TokenBuffer};
use serde::Serialize;
use tracing::{debug, trace};

/// A comment span that may contain documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PossibleComment {
    /// First line, 1-based.
    pub start_line: usize,
    /// One past the last line.
    pub end_line: usize,
    pub javadoc: bool,
    pub xml: bool,
    /// Set once an entity has been found inside the comment.
    pub claimed: bool,
}

impl PossibleComment {
    fn new(start_line: usize, end_line: usize) -> Self {
        PossibleComment {
            start_line,
            end_line,
            javadoc: false,
            xml: false,
            claimed: false,
        }
    }

    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }

    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line < self.end_line
    }
}

/// Result of one attempt to read a comment at the current line.
enum Found {
    /// The line does not start this style of comment.
    NoMatch,
    /// A comment was consumed up to `next_line`; `comment` is `None` if it is
    /// not a documentation candidate.
    Consumed {
        next_line: usize,
        comment: Option<PossibleComment>,
    },
}

/// Find all documentation comment candidates in `buf`.
///
/// `cancel` is polled once per line.
pub fn find_possible_comments(
    buf: &TokenBuffer,
    tags: &mut CommentTags,
    profile: &LanguageProfile,
    cancel: &dyn Cancellation,
) -> Outcome<Vec<PossibleComment>> {
    let mut comments = Vec::new();
    let mut line = 1;

    while line <= buf.line_count() {
        if cancel.is_cancelled() {
            debug!(line, "comment scan cancelled");
            return Outcome::Cancelled;
        }

        match scan_line(buf, tags, profile, line) {
            Found::NoMatch => line += 1,
            Found::Consumed { next_line, comment } => {
                if let Some(mut comment) = comment {
                    if comment.javadoc {
                        comment.xml = true;
                    }
                    mark_decorations(buf, tags, &comment);
                    trace!(
                        start = comment.start_line,
                        end = comment.end_line,
                        javadoc = comment.javadoc,
                        xml = comment.xml,
                        "possible documentation comment"
                    );
                    comments.push(comment);
                }
                line = next_line.max(line + 1);
            }
        }
    }

    debug!(count = comments.len(), "comment scan complete");
    Outcome::Completed(comments)
}

fn scan_line(
    buf: &TokenBuffer,
    tags: &mut CommentTags,
    profile: &LanguageProfile,
    line: usize,
) -> Found {
    // Javadoc block openers extend plain ones (`/**` vs `/*`), so they go first.
    for symbols in &profile.javadoc_block_comments {
        if let Found::Consumed { next_line, comment } =
            block_comment(buf, tags, line, &symbols.open, &symbols.close, true)
        {
            let comment = comment.map(|mut c| {
                c.javadoc = true;
                c
            });
            return Found::Consumed { next_line, comment };
        }
    }

    // Block comments come before line comments because Lua's `--` is a prefix of `--[[`.
    for symbols in &profile.block_comments {
        if let Found::Consumed { next_line, comment } =
            block_comment(buf, tags, line, &symbols.open, &symbols.close, false)
        {
            let comment = comment.filter(|c| !is_splint_annotation(buf, c, &symbols.open, &symbols.close));
            return Found::Consumed { next_line, comment };
        }
    }

    for symbol in &profile.xml_line_comments {
        if let Found::Consumed { next_line, comment } = line_comment(buf, tags, line, symbol, symbol, true) {
            let Some(mut xml) = comment else {
                return Found::Consumed { next_line, comment };
            };
            xml.xml = true;
            return disambiguate_javadoc(buf, tags, profile, xml, next_line);
        }
    }

    for pair in &profile.javadoc_line_comments {
        if let Found::Consumed { next_line, comment } =
            line_comment(buf, tags, line, &pair.first, &pair.following, true)
        {
            let comment = comment.map(|mut c| {
                c.javadoc = true;
                c
            });
            return Found::Consumed { next_line, comment };
        }
    }

    for symbol in &profile.line_comments {
        let found = line_comment(buf, tags, line, symbol, symbol, false);
        if matches!(found, Found::Consumed { .. }) {
            return found;
        }
    }

    Found::NoMatch
}

/// XML and Javadoc line comments may share an opener (`///`). Re-read the
/// XML comment's first line as Javadoc and keep whichever reading is longer.
fn disambiguate_javadoc(
    buf: &TokenBuffer,
    tags: &mut CommentTags,
    profile: &LanguageProfile,
    mut xml: PossibleComment,
    xml_next_line: usize,
) -> Found {
    for pair in &profile.javadoc_line_comments {
        let Found::Consumed { next_line, comment } =
            line_comment(buf, tags, xml.start_line, &pair.first, &pair.following, true)
        else {
            continue;
        };
        if let Some(mut javadoc) = comment {
            if javadoc.end_line > xml.end_line {
                // `## Comment` followed by `#` lines reads as one XML line plus a Javadoc block.
                javadoc.javadoc = true;
                return Found::Consumed {
                    next_line,
                    comment: Some(javadoc),
                };
            } else if javadoc.end_line == xml.end_line && xml.line_count() == 1 {
                // A single `## Comment` line could be either.
                xml.javadoc = true;
            }
            // Equal multi-line spans stay XML: the repeated opener is a border.
        }
        break;
    }

    Found::Consumed {
        next_line: xml_next_line,
        comment: Some(xml),
    }
}

/// First non-whitespace token of `line` and the end of its content (its line
/// break, or the end of the buffer).
fn line_bounds(buf: &TokenBuffer, line: usize) -> (Cursor<'_>, Cursor<'_>) {
    let mut end = buf.line_end(line);
    if end.previous().kind() == FundamentalKind::LineBreak && end.previous() >= buf.line_start(line) {
        end = end.previous();
    }
    let first = buf.line_start(line).next_past_whitespace(end);
    (first, end)
}

fn block_comment(
    buf: &TokenBuffer,
    tags: &mut CommentTags,
    line: usize,
    open: &str,
    close: &str,
    opening_must_be_alone: bool,
) -> Found {
    let (first, _) = line_bounds(buf, line);
    let Some(after_open) = first.skip_literal(open, false) else {
        return Found::NoMatch;
    };
    if opening_must_be_alone && after_open.kind() == FundamentalKind::Symbol {
        return Found::NoMatch;
    }

    // The opener is passed before searching so `"""` style pairs with equal
    // symbols do not close on themselves.
    let mut search_from = after_open;
    let mut current = line;
    loop {
        let (_, end_of_line) = line_bounds(buf, current);
        if let Some(closer) = find_between(search_from, end_of_line, close) {
            let after_close = closer.next_by_chars(close.len());
            let trailing = after_close.next_past_whitespace(end_of_line);
            let comment = if trailing.kind() == FundamentalKind::LineBreak
                || trailing.kind() == FundamentalKind::Null
                || trailing == end_of_line
            {
                tags.set_range(first, after_open, CommentTag::CommentSymbol);
                tags.set_range(closer, after_close, CommentTag::CommentSymbol);
                Some(PossibleComment::new(line, current + 1))
            } else {
                // `/*@out@*/ int x` inside a prototype: not documentation.
                None
            };
            return Found::Consumed {
                next_line: current + 1,
                comment,
            };
        }

        current += 1;
        if current > buf.line_count() {
            return Found::Consumed {
                next_line: current,
                comment: None,
            };
        }
        search_from = line_bounds(buf, current).0;
    }
}

fn find_between<'a>(from: Cursor<'a>, end: Cursor<'a>, literal: &str) -> Option<Cursor<'a>> {
    let mut cursor = from;
    while cursor < end {
        if cursor.matches(literal) {
            return Some(cursor);
        }
        cursor = cursor.next();
    }
    None
}

fn line_comment(
    buf: &TokenBuffer,
    tags: &mut CommentTags,
    line: usize,
    first_symbol: &str,
    following_symbol: &str,
    opening_must_be_alone: bool,
) -> Found {
    let (first, _) = line_bounds(buf, line);
    let Some(after_open) = first.skip_literal(first_symbol, false) else {
        return Found::NoMatch;
    };
    if opening_must_be_alone && after_open.kind() == FundamentalKind::Symbol {
        return Found::NoMatch;
    }
    tags.set_range(first, after_open, CommentTag::CommentSymbol);

    let mut current = line + 1;
    while current <= buf.line_count() {
        let (first, _) = line_bounds(buf, current);
        let Some(after) = first.skip_literal(following_symbol, false) else {
            break;
        };
        tags.set_range(first, after, CommentTag::CommentSymbol);
        current += 1;
    }

    Found::Consumed {
        next_line: current,
        comment: Some(PossibleComment::new(line, current)),
    }
}

/// Content between the comment symbols of a one-opener/one-closer block.
fn block_content<'a>(buf: &'a TokenBuffer, comment: &PossibleComment, open: &str, close: &str) -> Option<(Cursor<'a>, Cursor<'a>)> {
    let (first, _) = line_bounds(buf, comment.start_line);
    let start = first.skip_literal(open, false)?;
    let (_, end_of_last) = line_bounds(buf, comment.end_line - 1);
    let mut closer = end_of_last.previous_past_whitespace(start);
    for _ in 0..close.chars().count() {
        closer = closer.previous();
    }
    let content_start = start.next_past_whitespace(closer);
    let content_end = closer.previous_past_whitespace(content_start);
    Some((content_start, content_end))
}

/// Splint annotations like `/*@null@*/` may appear inside prototypes and are
/// never documentation.
fn is_splint_annotation(buf: &TokenBuffer, comment: &PossibleComment, open: &str, close: &str) -> bool {
    match block_content(buf, comment, open, close) {
        Some((start, end)) if start < end => start.is_char('@') && end.previous().is_char('@'),
        _ => false,
    }
}

/// Tag lines that are nothing but a run of one repeated symbol.
fn mark_decorations(buf: &TokenBuffer, tags: &mut CommentTags, comment: &PossibleComment) {
    for line in comment.start_line..comment.end_line {
        let (first, end) = line_bounds(buf, line);
        let mut cursor = first;
        while cursor < end && tags.get(cursor) == CommentTag::CommentSymbol {
            cursor = cursor.next();
        }
        let content_start = cursor.next_past_whitespace(end);

        let mut content_end = end;
        while content_end > content_start && tags.get(content_end.previous()) == CommentTag::CommentSymbol {
            content_end = content_end.previous();
        }
        let content_end = content_end.previous_past_whitespace(content_start);

        if is_horizontal_rule(content_start, content_end) {
            tags.set_range(content_start, content_end, CommentTag::CommentDecoration);
        }
    }
}

fn is_horizontal_rule(start: Cursor<'_>, end: Cursor<'_>) -> bool {
    if end - start < 3 || start.kind() != FundamentalKind::Symbol {
        return false;
    }
    let Some(symbol) = start.character() else {
        return false;
    };
    let mut cursor = start;
    while cursor < end {
        if !cursor.is_char(symbol) {
            return false;
        }
        cursor = cursor.next();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Never;
    use crate::profile::{builtin_profiles, BlockCommentSymbols, LineCommentPair};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile(name: &str) -> LanguageProfile {
        builtin_profiles()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap()
    }

    fn scan(source: &str, profile: &LanguageProfile) -> (Vec<PossibleComment>, TokenBuffer, CommentTags) {
        let buf = TokenBuffer::new(source);
        let mut tags = CommentTags::new(&buf);
        let comments = find_possible_comments(&buf, &mut tags, profile, &Never)
            .completed()
            .unwrap();
        (comments, buf, tags)
    }

    fn spans(comments: &[PossibleComment]) -> Vec<(usize, usize, bool, bool)> {
        comments
            .iter()
            .map(|c| (c.start_line, c.end_line, c.javadoc, c.xml))
            .collect()
    }

    #[test]
    fn javadoc_block_comment() {
        let src = "/** Function: Add\n * Adds.\n */\nint Add(int a, int b);\n";
        let (comments, _, _) = scan(src, &profile("c"));
        assert_eq!(spans(&comments), vec![(1, 4, true, true)]);
    }

    #[test]
    fn long_star_run_is_plain_block_with_decoration() {
        let src = "/******\n Function: X\n*/\n";
        let (comments, buf, tags) = scan(src, &profile("c"));
        assert_eq!(spans(&comments), vec![(1, 4, false, false)]);
        let first = buf.first_token();
        assert_eq!(tags.get(first), CommentTag::CommentSymbol);
        assert_eq!(tags.get(first.next()), CommentTag::CommentSymbol);
        assert_eq!(tags.get(first.next_by(2)), CommentTag::CommentDecoration);
    }

    #[test]
    fn text_after_closer_is_not_a_candidate() {
        let src = "/* Function: x */ int x;\n// Function: y\nint y;\n";
        let (comments, _, tags) = scan(src, &profile("c"));
        assert_eq!(spans(&comments), vec![(2, 3, false, false)]);
        assert_eq!(tags.count(CommentTag::CommentSymbol), 2);
    }

    #[test]
    fn unclosed_block_comment_skips_to_end() {
        let src = "/* never closed\n// Function: y\n";
        let (comments, _, tags) = scan(src, &profile("c"));
        assert!(comments.is_empty());
        assert_eq!(tags.count(CommentTag::CommentSymbol), 0);
    }

    #[test]
    fn splint_annotations_are_excluded() {
        let src = "/*@out@*/\n/* Function: z */\n";
        let (comments, _, _) = scan(src, &profile("c"));
        assert_eq!(spans(&comments), vec![(2, 3, false, false)]);
    }

    #[test]
    fn opener_must_be_first_on_line() {
        let src = "int x; /* Variable: x */\n";
        let (comments, _, _) = scan(src, &profile("c"));
        assert!(comments.is_empty());
    }

    #[test]
    fn xml_and_javadoc_tie_breaks() {
        let mut p = LanguageProfile::new("hash");
        p.line_comments = vec!["#".into()];
        p.xml_line_comments = vec!["##".into()];
        p.javadoc_line_comments = vec![LineCommentPair {
            first: "##".into(),
            following: "#".into(),
        }];

        // Javadoc reading is longer.
        let (comments, _, _) = scan("## Comment\n# more\n# more\nx\n", &p);
        assert_eq!(spans(&comments), vec![(1, 4, true, true)]);

        // One line: ambiguous, both.
        let (comments, _, _) = scan("## Comment\nx\n", &p);
        assert_eq!(spans(&comments), vec![(1, 2, true, true)]);

        // Equal multi-line spans stay XML only.
        let (comments, _, _) = scan("## Comment\n##\n##\nx\n", &p);
        assert_eq!(spans(&comments), vec![(1, 4, false, true)]);
    }

    #[test]
    fn xml_opener_must_be_alone() {
        let (comments, _, _) = scan("//////////\n// Function: f\n", &profile("c"));
        assert_eq!(spans(&comments), vec![(1, 3, false, false)]);
    }

    #[test]
    fn line_comments_need_the_symbol_on_every_line() {
        let src = "# Function: a\n#\n# text\ncode\n# Function: b\n";
        let (comments, _, _) = scan(src, &profile("python"));
        assert_eq!(spans(&comments), vec![(1, 4, false, false), (5, 6, false, false)]);
    }

    #[test]
    fn lua_block_comment_is_not_a_line_comment() {
        let src = "--[[ Function: f ]]\n-- Function: g\n";
        let (comments, _, _) = scan(src, &profile("lua"));
        assert_eq!(spans(&comments), vec![(1, 2, false, false), (2, 3, false, false)]);
    }

    #[test]
    fn identical_open_and_close_symbols() {
        let mut p = LanguageProfile::new("py");
        p.block_comments = vec![BlockCommentSymbols::new("\"\"\"", "\"\"\"")];
        let (comments, _, _) = scan("\"\"\"\nFunction: f\n\"\"\"\ndef f():\n", &p);
        assert_eq!(spans(&comments), vec![(1, 4, false, false)]);
    }

    #[test]
    fn rescanning_rejects_retagging_and_matches() {
        let src = "/** Function: a */\n// --------\n// Function: b\n";
        let p = profile("c");
        let buf = TokenBuffer::new(src);
        let mut tags = CommentTags::new(&buf);
        let first = find_possible_comments(&buf, &mut tags, &p, &Never);
        let snapshot = tags.clone();
        let second = find_possible_comments(&buf, &mut tags, &p, &Never);
        assert_eq!(first, second);
        assert_eq!(
            tags.count(CommentTag::CommentSymbol),
            snapshot.count(CommentTag::CommentSymbol)
        );
        assert_eq!(
            tags.count(CommentTag::CommentDecoration),
            snapshot.count(CommentTag::CommentDecoration)
        );
        assert!(!tags.set(buf.first_token(), CommentTag::CommentDecoration));
    }

    #[test]
    fn cancellation_after_first_line() {
        let src = "// Function: a\nint a;\n// Function: b\nint b;\n";
        let buf = TokenBuffer::new(src);
        let mut tags = CommentTags::new(&buf);
        let polls = AtomicUsize::new(0);
        let cancel = || polls.fetch_add(1, Ordering::SeqCst) >= 1;
        let outcome = find_possible_comments(&buf, &mut tags, &profile("c"), &cancel);
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(tags.count(CommentTag::CommentSymbol) <= 2);
    }
}
