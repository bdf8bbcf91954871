//! Basic prototype extractor.
//!
//! For languages without a full parser, the prototype of a documented entity
//! is the code right after its comment, up to the first ender symbol for the
//! entity's kind. Comments, strings and `()[]{}` blocks are skipped whole so
//! an ender inside them does not count. The result is only accepted if it
//! contains the entity's title.

use crate::cancel::{Cancellation, Outcome};
use crate::comments::PossibleComment;
use crate::model::Entity;
use crate::profile::{LanguageProfile, PrototypeEnders};
use crate::symbols::split_from_parameters;
use crate::syntax::Syntax;
use crate::tokens::{Cursor, FundamentalKind, TokenBuffer};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

static OPERATOR_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(operator)[ \t]+([^a-z0-9_])").unwrap());

/// Block comments kept in prototypes: Splint annotations and parameter
/// direction markers like `/* out */`.
static KEPT_BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^@.*@$|^[ \t]*(?:in|out|in[-/ ]?out|ref)[ \t]*$").unwrap()
});

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Give each comment's entity a prototype from the code that follows it.
///
/// The entity searched for is the last one whose header lies inside the
/// comment, backing up past embedded entities to their parent. Entities that
/// already have a prototype are left alone.
pub fn add_basic_prototypes(
    buf: &TokenBuffer,
    comments: &[PossibleComment],
    entities: &mut [Entity],
    profile: &LanguageProfile,
    cancel: &dyn Cancellation,
) -> Outcome<()> {
    if entities.is_empty() {
        return Outcome::Completed(());
    }

    let mut element_index = 0;
    let mut found = 0usize;
    for (comment_index, comment) in comments.iter().enumerate() {
        while element_index + 1 < entities.len()
            && entities[element_index + 1].comment_line < comment.end_line
        {
            element_index += 1;
        }

        let mut index = element_index;
        while index > 0
            && entities[index].is_embedded
            && entities[index - 1].comment_line >= comment.start_line
        {
            index -= 1;
        }

        let entity = &entities[index];
        if !comment.contains_line(entity.comment_line) || entity.prototype.is_some() {
            continue;
        }
        let Some(enders) = profile.enders_for(&entity.kind) else {
            continue;
        };

        let end_line = comments
            .get(comment_index + 1)
            .map(|next| next.start_line)
            .unwrap_or(buf.line_count() + 1);

        match find_basic_prototype(buf, &entity.title, enders, comment.end_line, end_line, profile, cancel) {
            Outcome::Cancelled => return Outcome::Cancelled,
            Outcome::Completed(Some(prototype)) => {
                trace!(title = %entity.title, %prototype, "found prototype");
                entities[index].prototype = Some(prototype);
                found += 1;
            }
            Outcome::Completed(None) => {
                trace!(title = %entity.title, "no prototype");
            }
        }
    }

    debug!(found, entities = entities.len(), "basic prototypes");
    Outcome::Completed(())
}

/// Search lines `[start_line, end_line)` for a prototype of `title`.
///
/// Returns the normalized prototype, or `None` if no ender was reached before
/// the end line or the text found does not contain the title.
pub fn find_basic_prototype(
    buf: &TokenBuffer,
    title: &str,
    enders: &PrototypeEnders,
    start_line: usize,
    end_line: usize,
    profile: &LanguageProfile,
    cancel: &dyn Cancellation,
) -> Outcome<Option<String>> {
    let span = match prototype_span(buf, enders, start_line, end_line, profile, cancel) {
        Outcome::Cancelled => return Outcome::Cancelled,
        Outcome::Completed(span) => span,
    };
    let prototype = span
        .filter(|&(start, end)| title_matches(title, start.text_to(end)))
        .map(|(start, end)| normalize_prototype(start, end, profile));
    Outcome::Completed(prototype)
}

fn is_identifier_char(at: Cursor<'_>) -> bool {
    at.kind() == FundamentalKind::Text || at.is_char('_')
}

/// A `_` extender written against identifier text is part of the identifier.
fn extender_in_identifier(at: Cursor<'_>, extender: &str) -> bool {
    extender == "_" && (is_identifier_char(at.previous()) || is_identifier_char(at.next()))
}

/// Token span of the prototype, ender excluded and trailing whitespace trimmed.
///
/// The end never passes the first token of `end_line`.
fn prototype_span<'a>(
    buf: &'a TokenBuffer,
    enders: &PrototypeEnders,
    start_line: usize,
    end_line: usize,
    profile: &LanguageProfile,
    cancel: &dyn Cancellation,
) -> Outcome<Option<(Cursor<'a>, Cursor<'a>)>> {
    let syntax = Syntax::new(profile);

    let mut line = start_line;
    let start = loop {
        if line >= end_line || line > buf.line_count() {
            return Outcome::Completed(None);
        }
        let first = buf.line_start(line).next_past_whitespace(buf.end());
        if first.in_bounds() && first.kind() != FundamentalKind::LineBreak {
            break first;
        }
        line += 1;
    };
    let limit = buf.line_start(end_line).next_past_whitespace(buf.end());

    let mut cursor = start;
    let mut extended = false;
    let mut ended = false;
    while cursor < limit {
        if cursor.kind() == FundamentalKind::LineBreak {
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }
            if enders.include_line_breaks && !extended {
                ended = true;
                break;
            }
            extended = false;
            cursor = cursor.next();
        } else if let Some(extender) = profile
            .line_extender
            .as_deref()
            .filter(|ext| cursor.matches(ext))
        {
            if !extender_in_identifier(cursor, extender) {
                extended = true;
            }
            cursor = cursor.next_by_chars(extender.len());
        } else if cursor.matches_any(&enders.symbols, !profile.case_sensitive).is_some() {
            ended = true;
            break;
        } else if let Some(after) = syntax
            .skip_comment(cursor)
            .or_else(|| syntax.skip_string(cursor))
            .or_else(|| syntax.skip_block(cursor, false))
        {
            cursor = after;
        } else {
            cursor = cursor.next();
        }
    }

    // Running past the limit means an unterminated string, comment or block.
    if !ended || cursor > limit {
        return Outcome::Completed(None);
    }
    let end = cursor.previous_past_whitespace(start);
    if end <= start {
        return Outcome::Completed(None);
    }
    Outcome::Completed(Some((start, end)))
}

/// Collapse a prototype span to one line.
///
/// Line breaks, separate line extenders, line comments and most block
/// comments become a single space. Strings are copied as is.
pub fn normalize_prototype(start: Cursor<'_>, end: Cursor<'_>, profile: &LanguageProfile) -> String {
    let syntax = Syntax::new(profile);
    let mut out = String::new();
    let mut cursor = start;

    let space = |out: &mut String| {
        if !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
    };

    while cursor < end {
        if matches!(cursor.kind(), FundamentalKind::LineBreak | FundamentalKind::Whitespace) {
            space(&mut out);
            cursor = cursor.next();
        } else if let Some(extender) = profile
            .line_extender
            .as_deref()
            .filter(|ext| cursor.matches(ext))
        {
            if extender_in_identifier(cursor, extender) {
                out.push_str(extender);
            } else {
                space(&mut out);
            }
            cursor = cursor.next_by_chars(extender.len());
        } else if let Some(after) = syntax.skip_block_comment(cursor) {
            let after = after.min(end);
            match kept_block_comment(cursor.text_to(after), profile) {
                Some(kept) => out.push_str(&kept),
                None => space(&mut out),
            }
            cursor = after;
        } else if let Some(after) = syntax.skip_line_comment(cursor) {
            space(&mut out);
            cursor = after.min(end);
        } else if let Some(after) = syntax.skip_string(cursor) {
            let after = after.min(end);
            out.push_str(cursor.text_to(after));
            cursor = after;
        } else {
            out.push_str(cursor.text());
            cursor = cursor.next();
        }
    }

    out.trim_end().to_string()
}

/// The block comment on one line, if it is one worth keeping.
fn kept_block_comment(comment: &str, profile: &LanguageProfile) -> Option<String> {
    let symbols = profile
        .block_comments
        .iter()
        .find(|s| comment.starts_with(&s.open) && comment.ends_with(&s.close))?;
    let content = comment
        .get(symbols.open.len()..comment.len().saturating_sub(symbols.close.len()))
        .unwrap_or_default();
    if !KEPT_BLOCK_COMMENT.is_match(content) {
        return None;
    }
    Some(format!(
        "{}{}{}",
        symbols.open,
        WHITESPACE_RUN.replace_all(content, " "),
        symbols.close
    ))
}

/// The part of a title a prototype must contain: no parameters, no
/// qualifiers, no leading sigil.
fn undecorated_title(title: &str) -> &str {
    let (title, _) = split_from_parameters(title.trim());

    let mut cut = title;
    for (i, c) in title.char_indices().rev() {
        if c != '.' && c != ':' {
            continue;
        }
        if c == ':' && !title[..i].ends_with(':') {
            continue;
        }
        let rest = &title[i + 1..];
        if !rest.trim().is_empty() {
            cut = rest;
            break;
        }
    }

    let cut = cut.trim();
    match cut.strip_prefix(['$', '@', '%']) {
        Some(rest) if !rest.is_empty() => rest,
        _ => cut,
    }
}

/// Does `prototype` contain `title`, allowing `operator +` for `operator+`
/// and `A.prototype.b` for `A.b`?
pub fn title_matches(title: &str, prototype: &str) -> bool {
    let title = undecorated_title(title).to_lowercase();
    if title.is_empty() {
        return false;
    }
    let prototype = prototype.to_lowercase();

    if prototype.contains(&title) {
        true
    } else if title.contains("operator") {
        let title = OPERATOR_SPACING.replace_all(&title, "$1$2");
        OPERATOR_SPACING
            .replace_all(&prototype, "$1$2")
            .contains(title.as_ref())
    } else if prototype.contains(".prototype.") {
        // Keep the leading period so `String.prototype.trim` becomes `String.trim`.
        prototype.replacen(".prototype.", ".", 1).contains(&title)
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Never;
    use crate::profile::builtin_profiles;

    fn profile(name: &str) -> LanguageProfile {
        builtin_profiles()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap()
    }

    fn find(source: &str, title: &str, kind: &str, language: &str) -> Option<String> {
        let profile = profile(language);
        let buf = TokenBuffer::new(source);
        let enders = profile.enders_for(kind).unwrap();
        find_basic_prototype(&buf, title, enders, 1, buf.line_count() + 1, &profile, &Never)
            .completed()
            .unwrap()
    }

    #[test]
    fn stops_at_ender_outside_blocks() {
        assert_eq!(
            find("int Add (int a, int b)\n{\n  return a + b;\n}\n", "Add", "function", "c").as_deref(),
            Some("int Add (int a, int b)")
        );
        assert_eq!(
            find("void f(void (*cb)(int); int x);", "f", "function", "c").as_deref(),
            Some("void f(void (*cb)(int); int x)")
        );
    }

    #[test]
    fn skips_leading_blank_lines_and_joins_lines() {
        assert_eq!(
            find("\n\n  static int\n  Count (int a,\n         int b);", "Count", "function", "c").as_deref(),
            Some("static int Count (int a, int b)")
        );
    }

    #[test]
    fn rejects_prototype_without_title() {
        assert_eq!(find("int Other (int a);", "Add", "function", "c"), None);
    }

    #[test]
    fn unterminated_string_fails() {
        assert_eq!(find("log(\"never closed);\nint x;", "log", "function", "c"), None);
        assert_eq!(find("int f (int a;\n", "f", "function", "c"), None);
    }

    #[test]
    fn no_ender_before_limit_fails() {
        let profile = profile("c");
        let buf = TokenBuffer::new("int Add (int a)\n/* next */\nint x;");
        let enders = profile.enders_for("function").unwrap();
        let found = find_basic_prototype(&buf, "Add", enders, 1, 2, &profile, &Never);
        assert_eq!(found, Outcome::Completed(None));
    }

    #[test]
    fn end_never_passes_limit() {
        let profile = profile("c");
        let sources = [
            "int f(int a);\nint g;",
            "int f(int a\n\nint g;",
            "\"open string\nint g;",
            "/* open comment\nint g;",
            "int f",
        ];
        let enders = profile.enders_for("function").unwrap();
        for source in sources {
            let buf = TokenBuffer::new(source);
            for end_line in 1..=buf.line_count() + 1 {
                let limit = buf.line_start(end_line).next_past_whitespace(buf.end());
                if let Outcome::Completed(Some((_, end))) =
                    prototype_span(&buf, enders, 1, end_line, &profile, &Never)
                {
                    assert!(end <= limit, "{source:?} to line {end_line}");
                }
            }
        }
    }

    #[test]
    fn line_break_enders_and_extenders() {
        let source = "Function Compute(a As Integer) _\n    As Integer\nEnd Function\n";
        assert_eq!(
            find(source, "Compute", "function", "visualbasic").as_deref(),
            Some("Function Compute(a As Integer) As Integer")
        );
        assert_eq!(
            find("Dim my_value As Integer\n", "my_value", "variable", "visualbasic").as_deref(),
            Some("Dim my_value As Integer")
        );
    }

    #[test]
    fn enders_honor_case_sensitivity() {
        assert_eq!(
            find("CREATE FUNCTION Total (a INT) RETURNS INT AS\nBEGIN", "Total", "function", "sql").as_deref(),
            Some("CREATE FUNCTION Total (a INT) RETURNS INT")
        );
    }

    #[test]
    fn keeps_annotation_comments() {
        assert_eq!(
            find(
                "int Copy (char *dest /*@out@*/, // target\n  const char *src /* in */);",
                "Copy",
                "function",
                "c"
            )
            .as_deref(),
            Some("int Copy (char *dest /*@out@*/, const char *src /* in */)")
        );
        assert_eq!(
            find("int Copy (char *dest /* the target */);", "Copy", "function", "c").as_deref(),
            Some("int Copy (char *dest )")
        );
    }

    #[test]
    fn kept_comments_condense_whitespace() {
        assert_eq!(
            find("int Copy (char *dest /*   out   */);", "Copy", "function", "c").as_deref(),
            Some("int Copy (char *dest /* out */)")
        );
        assert_eq!(
            find("int Copy (char *dest /*@  not\n   null @*/);", "Copy", "function", "c").as_deref(),
            Some("int Copy (char *dest /*@ not null @*/)")
        );
    }

    #[test]
    fn title_is_matched_against_source_text() {
        // The title only appears in a comment that normalization removes.
        assert_eq!(
            find("int /* Add */ Sum (int a);", "Add", "function", "c").as_deref(),
            Some("int Sum (int a)")
        );
    }

    #[test]
    fn strings_are_copied_verbatim() {
        assert_eq!(
            find("char *greeting = \"a   b\";", "greeting", "variable", "c").as_deref(),
            Some("char *greeting")
        );
        assert_eq!(
            find("void Log (char *fmt = \"a  ;  b\");", "Log", "function", "c").as_deref(),
            Some("void Log (char *fmt = \"a  ;  b\")")
        );
    }

    #[test]
    fn title_containment() {
        assert!(title_matches("Add", "int add (int a)"));
        assert!(title_matches("Add (int a)", "int Add (int a)"));
        assert!(title_matches("Math.Add", "int Add (int a)"));
        assert!(title_matches("Math::Add", "int Add (int a)"));
        assert!(title_matches("$name", "my $name = 1"));
        assert!(title_matches("operator +", "int operator+ (int a)"));
        assert!(title_matches("operator+", "int operator + (int a)"));
        assert!(title_matches("Shape.area", "Shape.prototype.area = function ()"));
        assert!(!title_matches("Add", "int Sum (int a)"));
        assert!(!title_matches("", "int Sum (int a)"));
    }

    #[test]
    fn undecorated_titles() {
        assert_eq!(undecorated_title("A.B::C (int)"), "C");
        assert_eq!(undecorated_title("Trailing."), "Trailing.");
        assert_eq!(undecorated_title("@items"), "items");
        assert_eq!(undecorated_title("$"), "$");
    }

    #[test]
    fn cancellation_at_line_breaks() {
        let profile = profile("c");
        let buf = TokenBuffer::new("int Add\n(int a)\n;");
        let enders = profile.enders_for("function").unwrap();
        let cancel = || true;
        let found = find_basic_prototype(&buf, "Add", enders, 1, 4, &profile, &cancel);
        assert!(found.is_cancelled());
    }

    #[test]
    fn assigns_prototypes_to_entities() {
        let profile = profile("c");
        let source = "/* Function: Add */\nint Add (int a);\n\n/* Function: Sub */\nint Sub (int a);\n";
        let buf = TokenBuffer::new(source);
        let comments = vec![
            PossibleComment {
                start_line: 1,
                end_line: 2,
                javadoc: false,
                xml: false,
                claimed: true,
            },
            PossibleComment {
                start_line: 4,
                end_line: 5,
                javadoc: false,
                xml: false,
                claimed: true,
            },
        ];
        let mut entities = vec![
            Entity::new("Add", "function", 1),
            Entity::new("Sub", "function", 4).with_body("Already known."),
        ];
        entities[1].prototype = Some("int Sub (int b)".to_string());

        let outcome = add_basic_prototypes(&buf, &comments, &mut entities, &profile, &Never);
        assert_eq!(outcome, Outcome::Completed(()));
        assert_eq!(entities[0].prototype.as_deref(), Some("int Add (int a)"));
        assert_eq!(entities[1].prototype.as_deref(), Some("int Sub (int b)"));
    }

    #[test]
    fn embedded_entities_defer_to_parent() {
        let profile = profile("c");
        let source = "/* Enum: Color\n   Red - r\n   Green - g */\nenum Color { Red, Green };\n";
        let buf = TokenBuffer::new(source);
        let comments = vec![PossibleComment {
            start_line: 1,
            end_line: 4,
            javadoc: false,
            xml: false,
            claimed: true,
        }];
        let mut entities = vec![
            Entity::new("Color", "enumeration", 1),
            Entity::new("Red", "constant", 2).embedded(),
            Entity::new("Green", "constant", 3).embedded(),
        ];
        let outcome = add_basic_prototypes(&buf, &comments, &mut entities, &profile, &Never);
        assert!(!outcome.is_cancelled());
        assert_eq!(entities[0].prototype.as_deref(), Some("enum Color"));
        assert!(entities[1].prototype.is_none());
    }
}
