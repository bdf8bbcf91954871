//! Error types for protodoc.
//!
//! Only configuration mistakes are errors. Malformed source input, failed
//! prototype searches and cancellation are ordinary return values.

use thiserror::Error;

/// A language profile or kind table that cannot be used as configured.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("language {language}: prototype enders reference unknown kind `{kind}`")]
    UnknownEnderKind { language: String, kind: String },

    #[error("language {language}: block comment pair has an empty symbol")]
    EmptyCommentSymbol { language: String },

    #[error("language {language} only embeds other languages and cannot be parsed directly")]
    ContainerLanguage { language: String },

    #[error("unknown language: {name}")]
    UnknownLanguage { name: String },

    #[error("no language is registered for extension: {extension}")]
    UnsupportedExtension { extension: String },

    #[error("kind {kind}: hierarchy is set but the scope is not Start")]
    HierarchyWithoutScope { kind: String },
}

/// Failure while loading a TOML configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Profile(#[from] ProfileError),
}

pub type Result<T> = std::result::Result<T, ProfileError>;
