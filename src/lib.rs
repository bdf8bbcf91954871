//! protodoc: extract documented entities, prototypes and symbols from source
//! files in many languages, driven by per-language profiles.

pub mod cancel;
pub mod comments;
pub mod config;
pub mod error;
pub mod headers;
pub mod model;
pub mod pipeline;
pub mod profile;
pub mod prototype;
pub mod render;
pub mod resolver;
pub mod symbols;
pub mod syntax;
pub mod tokens;

pub use cancel::{Cancellation, Deadline, Never, Outcome};
pub use config::Registry;
pub use error::{ConfigError, ProfileError};
pub use model::{Entity, FileDoc};
pub use pipeline::{FullParser, Pipeline, SupportLevel};
pub use profile::{KindTable, LanguageProfile};
