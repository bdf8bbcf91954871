//! Per-file extraction results.

use crate::comments::PossibleComment;
use crate::prototype::ParsedPrototype;
use crate::symbols::{ClassString, ContextString, SymbolString};
use crate::tokens::CommentTags;
use serde::Serialize;

/// One documented entity, in source order.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    /// Title as written in the comment.
    pub title: String,
    /// Entity kind name from the [`crate::profile::KindTable`].
    pub kind: String,
    /// 1-based line of the header inside its comment.
    pub comment_line: usize,
    /// Enum members and similar entities defined inside another entity's comment.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_embedded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,
    #[serde(rename = "parsed", skip_serializing_if = "Option::is_none")]
    pub parsed_prototype: Option<ParsedPrototype>,
    pub symbol: Option<SymbolString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassString>,
    pub prototype_context: ContextString,
    pub body_context: ContextString,
}

impl Entity {
    pub fn new(title: impl Into<String>, kind: impl Into<String>, comment_line: usize) -> Self {
        Entity {
            title: title.into(),
            kind: kind.into(),
            comment_line,
            is_embedded: false,
            body: None,
            prototype: None,
            parsed_prototype: None,
            symbol: None,
            class: None,
            prototype_context: ContextString::default(),
            body_context: ContextString::default(),
        }
    }

    pub fn embedded(mut self) -> Self {
        self.is_embedded = true;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body = (!body.trim().is_empty()).then_some(body);
        self
    }
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, Serialize)]
pub struct FileDoc {
    pub path: String,
    pub language: String,
    /// Separator used when symbols are shown to people, e.g. `::` for Perl.
    #[serde(skip)]
    pub member_operator: String,
    pub comments: Vec<PossibleComment>,
    pub entities: Vec<Entity>,
    /// Comment delimiters and decorations, for tools that need comment
    /// boundaries without scanning again.
    #[serde(skip)]
    pub comment_tags: Option<CommentTags>,
}
