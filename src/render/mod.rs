//! Renderer module: trait-based format dispatch.

pub mod json;
pub mod text;

use crate::model::FileDoc;
use anyhow::{anyhow, Result};

/// Trait for rendering one file's extraction results into an output format.
pub trait Renderer: Send + Sync {
    fn render(&self, doc: &FileDoc) -> String;
    fn file_extension(&self) -> &str;
}

/// Create a renderer for the given format name.
pub fn create_renderer(format: &str) -> Result<Box<dyn Renderer>> {
    match format {
        "json" => Ok(Box::new(json::JsonRenderer)),
        "text" | "txt" => Ok(Box::new(text::TextRenderer)),
        _ => Err(anyhow!("unknown format: {}. Use json or text", format)),
    }
}
