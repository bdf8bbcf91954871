//! Per-file extraction pipeline.
//!
//! Dispatches once on how much a language supports, then runs the stages in
//! order: comment scan, header recognition (or a full parser), basic
//! prototype search, prototype classification, and symbol resolution.

use crate::cancel::{Cancellation, Outcome};
use crate::comments::{find_possible_comments, PossibleComment};
use crate::error::{ProfileError, Result};
use crate::headers::recognize_headers;
use crate::model::{Entity, FileDoc};
use crate::profile::{KindTable, LanguageProfile, ProfileSupport};
use crate::prototype::{add_basic_prototypes, parse_prototype};
use crate::resolver::resolve;
use crate::symbols::UsingString;
use crate::tokens::{CommentTags, TokenBuffer};
use std::sync::Arc;
use tracing::{debug, info};

/// A language-specific parser that finds entities and their prototypes itself.
pub trait FullParser: Send + Sync {
    /// Entities in source order, with prototypes where the parser found them.
    /// Symbols and contexts are filled in by the pipeline afterwards.
    fn parse(&self, source: &str, cancel: &dyn Cancellation) -> Outcome<Vec<Entity>>;
}

/// How a file is processed.
#[derive(Clone)]
pub enum SupportLevel {
    Full(Arc<dyn FullParser>),
    Basic,
    TextOnly,
    Container,
}

impl std::fmt::Debug for SupportLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupportLevel::Full(_) => f.write_str("Full"),
            SupportLevel::Basic => f.write_str("Basic"),
            SupportLevel::TextOnly => f.write_str("TextOnly"),
            SupportLevel::Container => f.write_str("Container"),
        }
    }
}

impl From<ProfileSupport> for SupportLevel {
    fn from(support: ProfileSupport) -> Self {
        match support {
            ProfileSupport::Basic => SupportLevel::Basic,
            ProfileSupport::TextOnly => SupportLevel::TextOnly,
            ProfileSupport::Container => SupportLevel::Container,
        }
    }
}

/// Extraction for one language. Cheap to build; make one per worker.
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    profile: &'a LanguageProfile,
    kinds: &'a KindTable,
    support: SupportLevel,
    usings: Vec<UsingString>,
}

impl<'a> Pipeline<'a> {
    pub fn new(profile: &'a LanguageProfile, kinds: &'a KindTable) -> Result<Self> {
        kinds.validate()?;
        profile.validate(kinds)?;
        Ok(Pipeline {
            profile,
            kinds,
            support: profile.support.into(),
            usings: Vec::new(),
        })
    }

    pub fn with_full_parser(mut self, parser: Arc<dyn FullParser>) -> Self {
        self.support = SupportLevel::Full(parser);
        self
    }

    /// File-level using statements applied to every context.
    pub fn with_usings(mut self, usings: Vec<UsingString>) -> Self {
        self.usings = usings;
        self
    }

    pub fn support(&self) -> &SupportLevel {
        &self.support
    }

    /// Extract everything from one file.
    ///
    /// Errors only for container languages, which must be split into their
    /// embedded languages first.
    pub fn parse(&self, path: &str, source: &str, cancel: &dyn Cancellation) -> Result<Outcome<FileDoc>> {
        let buf = TokenBuffer::new(source);
        let mut tags = CommentTags::new(&buf);

        let (comments, entities) = match &self.support {
            SupportLevel::Container => {
                return Err(ProfileError::ContainerLanguage {
                    language: self.profile.name.clone(),
                })
            }
            SupportLevel::TextOnly => {
                if cancel.is_cancelled() {
                    return Ok(Outcome::Cancelled);
                }
                // The whole file is one comment.
                let mut comments = vec![PossibleComment {
                    start_line: 1,
                    end_line: buf.line_count() + 1,
                    javadoc: false,
                    xml: false,
                    claimed: false,
                }];
                let entities = recognize_headers(&buf, &tags, &mut comments, self.kinds);
                (comments, entities)
            }
            SupportLevel::Basic => {
                let Outcome::Completed(mut comments) =
                    find_possible_comments(&buf, &mut tags, self.profile, cancel)
                else {
                    return Ok(Outcome::Cancelled);
                };
                let mut entities = recognize_headers(&buf, &tags, &mut comments, self.kinds);
                if add_basic_prototypes(&buf, &comments, &mut entities, self.profile, cancel).is_cancelled() {
                    return Ok(Outcome::Cancelled);
                }
                (comments, entities)
            }
            SupportLevel::Full(parser) => {
                let Outcome::Completed(comments) = find_possible_comments(&buf, &mut tags, self.profile, cancel)
                else {
                    return Ok(Outcome::Cancelled);
                };
                let Outcome::Completed(entities) = parser.parse(source, cancel) else {
                    return Ok(Outcome::Cancelled);
                };
                (comments, entities)
            }
        };

        let mut entities = entities;
        for entity in &mut entities {
            if let Some(prototype) = &entity.prototype {
                entity.parsed_prototype = Some(parse_prototype(prototype, self.profile));
            }
        }
        resolve(&mut entities, self.kinds, self.profile, &self.usings);

        info!(
            path,
            language = %self.profile.name,
            comments = comments.len(),
            entities = entities.len(),
            "parsed file"
        );
        debug!(
            prototypes = entities.iter().filter(|e| e.prototype.is_some()).count(),
            "prototype coverage"
        );

        Ok(Outcome::Completed(FileDoc {
            path: path.to_string(),
            language: self.profile.name.clone(),
            member_operator: self.profile.member_operator.clone(),
            comments,
            entities,
            comment_tags: Some(tags),
        }))
    }
}
