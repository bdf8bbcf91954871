//! Plain text renderer: a line-oriented summary for reading in a terminal.

use crate::model::{Entity, FileDoc};
use crate::render::Renderer;

pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, doc: &FileDoc) -> String {
        let mut out = format!("{} [{}]\n", doc.path, doc.language);
        let separator = if doc.member_operator.is_empty() {
            "."
        } else {
            doc.member_operator.as_str()
        };

        for entity in &doc.entities {
            out.push('\n');
            render_entity(&mut out, entity, separator);
        }
        out
    }

    fn file_extension(&self) -> &str {
        "txt"
    }
}

fn render_entity(out: &mut String, entity: &Entity, separator: &str) {
    let name = entity
        .symbol
        .as_ref()
        .map(|s| s.format_with(separator))
        .unwrap_or_else(|| entity.title.clone());
    out.push_str(&format!("{} {} (line {})\n", entity.kind, name, entity.comment_line));

    if let Some(ref prototype) = entity.prototype {
        out.push_str(&format!("  prototype: {}\n", prototype));
    }
    if let Some(ref parsed) = entity.parsed_prototype {
        for i in 0..parsed.parameter_count() {
            let mut line = format!("  parameter: {}", parsed.parameter_name(i).unwrap_or_default());
            if let Some(ty) = parsed.parameter_type(i) {
                line.push_str(&format!(": {}", ty));
            }
            if let Some(default) = parsed.parameter_default(i) {
                line.push_str(&format!(" = {}", default));
            }
            out.push_str(&line);
            out.push('\n');
        }
        if parsed.parameter_count() > 0 {
            if let Some(ret) = parsed.return_type() {
                out.push_str(&format!("  returns: {}\n", ret));
            }
        }
    }
    // Body lines stay as written, indented under the entity.
    if let Some(ref body) = entity.body {
        for line in body.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                out.push_str(&format!("  | {}\n", line));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Never;
    use crate::pipeline::Pipeline;
    use crate::profile::{builtin_profiles, KindTable};

    fn render(source: &str, language: &str) -> String {
        let profile = builtin_profiles()
            .into_iter()
            .find(|p| p.name == language)
            .unwrap();
        let kinds = KindTable::default();
        let doc = Pipeline::new(&profile, &kinds)
            .unwrap()
            .parse("input", source, &Never)
            .unwrap()
            .completed()
            .unwrap();
        TextRenderer.render(&doc)
    }

    #[test]
    fn summary_lines() {
        let out = render(
            "// Class: Point\n\n// Function: Move\n// Shifts the point.\nvoid Move (int dx, int dy = 0);\n",
            "c",
        );
        let expected = "\
input [c]

class Point (line 1)

function Point.Move (line 3)
  prototype: void Move (int dx, int dy = 0)
  parameter: dx: int
  parameter: dy: int = 0
  returns: void
  | Shifts the point.
";
        assert_eq!(out, expected);
    }

    #[test]
    fn symbols_use_member_operator() {
        let out = render("# Package: Util\n\n# Function: trim\n", "perl");
        assert!(out.contains("function Util::trim (line 3)"));
    }
}
