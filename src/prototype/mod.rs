//! Prototypes: finding them after a comment and classifying their tokens.

pub mod classify;
pub mod find;

pub use classify::{classify_parameter, parse_prototype, ParameterStyle, ParsedPrototype};
pub use find::{add_basic_prototypes, find_basic_prototype, normalize_prototype, title_matches};
