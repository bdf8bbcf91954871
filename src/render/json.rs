//! JSON renderer: structured output for tooling integration.
//!
//! Serializes the FileDoc model directly, one object per file.

use crate::model::FileDoc;
use crate::render::Renderer;
use tracing::warn;

pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, doc: &FileDoc) -> String {
        match serde_json::to_string_pretty(doc) {
            Ok(mut out) => {
                out.push('\n');
                out
            }
            Err(e) => {
                warn!(path = %doc.path, error = %e, "failed to serialize");
                String::new()
            }
        }
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}
