//! Header recognizer.
//!
//! Turns candidate comments into title-bearing entities. A header is a line
//! like `Function: Add` whose keyword belongs to a known entity kind; the
//! lines after it, up to the next header, are its body. Inside an enum's body
//! each `Name - description` line defines an embedded member.

use crate::comments::PossibleComment;
use crate::model::Entity;
use crate::profile::KindTable;
use crate::tokens::{CommentTag, CommentTags, FundamentalKind, TokenBuffer};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+(?: [A-Za-z]+)?):[ \t]+(\S.*?)[ \t]*$").unwrap());

static ENUM_MEMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)[ \t]+-[ \t]+(.*?)[ \t]*$").unwrap());

/// Kind given to enum members.
const MEMBER_KIND: &str = "constant";

/// Text of each line in `comment` with delimiters and decorations removed.
fn comment_lines(buf: &TokenBuffer, tags: &CommentTags, comment: &PossibleComment) -> Vec<(usize, String)> {
    let mut lines = Vec::with_capacity(comment.line_count());
    for line in comment.start_line..comment.end_line {
        let end = buf.line_end(line);
        let mut cursor = buf.line_start(line);
        let mut text = String::new();
        while cursor < end {
            match tags.get(cursor) {
                CommentTag::CommentDecoration => {
                    text.clear();
                    break;
                }
                CommentTag::CommentSymbol => {}
                CommentTag::Null if cursor.kind() != FundamentalKind::LineBreak => text.push_str(cursor.text()),
                CommentTag::Null => {}
            }
            cursor = cursor.next();
        }

        let trimmed = text.trim();
        // Javadoc-style blocks often carry a column of leading stars.
        let trimmed = match trimmed.strip_prefix('*') {
            Some(rest) if rest.is_empty() || rest.starts_with([' ', '\t']) => rest.trim_start(),
            _ => trimmed,
        };
        if is_rule(trimmed) {
            lines.push((line, String::new()));
        } else {
            lines.push((line, trimmed.to_string()));
        }
    }
    lines
}

/// A horizontal rule the scanner could not tag, like ` * -----` in a star column.
fn is_rule(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if !first.is_alphanumeric() && !first.is_whitespace() => {
            text.len() >= 3 && chars.all(|c| c == first)
        }
        _ => false,
    }
}

/// Find every header in `comments`, marking the comments that had one as claimed.
pub fn recognize_headers(
    buf: &TokenBuffer,
    tags: &CommentTags,
    comments: &mut [PossibleComment],
    kinds: &KindTable,
) -> Vec<Entity> {
    let mut entities = Vec::new();

    for comment in comments.iter_mut() {
        let lines = comment_lines(buf, tags, comment);
        let mut found = Vec::new();
        let mut body: Vec<&str> = Vec::new();

        for (line, text) in &lines {
            let header = HEADER.captures(text).and_then(|caps| {
                let keyword = caps.get(1)?.as_str();
                let kind = kinds.by_keyword(keyword).or_else(|| {
                    // `Private Function: X` falls back to its last word.
                    keyword.rsplit(' ').next().and_then(|last| kinds.by_keyword(last))
                })?;
                Some((kind, caps.get(2)?.as_str()))
            });

            match header {
                Some((kind, title)) => {
                    finish(&mut found, &mut body, kinds);
                    found.push(Entity::new(title, kind.name.as_str(), *line));
                }
                None if !found.is_empty() => body.push(text),
                None => {}
            }
        }
        finish(&mut found, &mut body, kinds);

        if !found.is_empty() {
            comment.claimed = true;
            entities.append(&mut found);
        }
    }

    debug!(count = entities.len(), "headers recognized");
    entities
}

/// Attach the collected body to the last entity and expand enum members.
fn finish(found: &mut Vec<Entity>, body: &mut Vec<&str>, kinds: &KindTable) {
    let Some(last) = found.last_mut() else {
        body.clear();
        return;
    };
    let header_line = last.comment_line;
    let is_enum = kinds.get(&last.kind).is_some_and(|k| k.is_enum);
    let text = body.join("\n").trim().to_string();
    last.body = (!text.is_empty()).then_some(text);

    if is_enum && kinds.contains(MEMBER_KIND) {
        let members: Vec<Entity> = body
            .iter()
            .enumerate()
            .filter_map(|(offset, line)| {
                let caps = ENUM_MEMBER.captures(line)?;
                let line = header_line + 1 + offset;
                Some(
                    Entity::new(caps.get(1)?.as_str(), MEMBER_KIND, line)
                        .embedded()
                        .with_body(caps.get(2)?.as_str()),
                )
            })
            .collect();
        found.extend(members);
    }
    body.clear();
}
