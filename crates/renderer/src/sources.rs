use std::fs;
use std::path::Path;

use crate::error::HarnessError;

/// Default id of the vertex stage block in a shader page.
pub const DEFAULT_VERTEX_ID: &str = "vertex-shader";
/// Default id of the fragment stage block in a shader page.
pub const DEFAULT_FRAGMENT_ID: &str = "fragment-shader";

/// The two stages of the ray-tracing program, as opaque text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Reads each stage from its own file.
    pub fn from_files(vertex: &Path, fragment: &Path) -> Result<Self, HarnessError> {
        Ok(Self::new(read_source(vertex)?, read_source(fragment)?))
    }

    /// Reads both stages out of an HTML page holding them in
    /// `<script id="...">` blocks.
    pub fn from_page(
        page: &Path,
        vertex_id: &str,
        fragment_id: &str,
    ) -> Result<Self, HarnessError> {
        let document = read_source(page)?;
        let label = page.display().to_string();
        Self::from_document(&document, &label, vertex_id, fragment_id)
    }

    /// Extracts both stages from page text. `label` only feeds error messages.
    pub fn from_document(
        document: &str,
        label: &str,
        vertex_id: &str,
        fragment_id: &str,
    ) -> Result<Self, HarnessError> {
        let lookup = |id: &str| {
            script_block(document, id).ok_or_else(|| HarnessError::ShaderSourceMissing {
                id: id.to_string(),
                document: label.to_string(),
            })
        };
        Ok(Self::new(lookup(vertex_id)?, lookup(fragment_id)?))
    }
}

fn read_source(path: &Path) -> Result<String, HarnessError> {
    fs::read_to_string(path).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the text between the opening `<script ... id="{id}" ...>` tag and
/// the next `</script>`.
fn script_block<'a>(document: &'a str, id: &str) -> Option<&'a str> {
    let mut cursor = 0;
    while let Some(found) = document[cursor..].find("<script") {
        let tag_start = cursor + found;
        let tag_end = tag_start + document[tag_start..].find('>')?;
        let tag = &document[tag_start..tag_end];
        if tag_has_id(tag, id) {
            let body_start = tag_end + 1;
            let body_len = document[body_start..].find("</script>")?;
            return Some(&document[body_start..body_start + body_len]);
        }
        cursor = tag_end;
    }
    None
}

fn tag_has_id(tag: &str, id: &str) -> bool {
    ["\"", "'"].iter().any(|quote| {
        let needle = format!("id={quote}{id}{quote}");
        tag.contains(&needle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<script id="vertex-shader" type="x-shader/x-vertex">
attribute vec4 vPosition;
void main() { gl_Position = vPosition; }
</script>
<script type="text/javascript" src="raytracer.js"></script>
<script id='fragment-shader' type="x-shader/x-fragment">
precision mediump float;
uniform float num_bounces;
void main() { gl_FragColor = vec4(num_bounces); }
</script>
<body><canvas width="512" height="512"></canvas></body>
</html>"#;

    #[test]
    fn extracts_both_stages_by_id() {
        let sources =
            ShaderSources::from_document(PAGE, "index.html", "vertex-shader", "fragment-shader")
                .expect("sources");
        assert!(sources.vertex.contains("attribute vec4 vPosition;"));
        assert!(!sources.vertex.contains("</script>"));
        assert!(sources.fragment.contains("uniform float num_bounces;"));
    }

    #[test]
    fn missing_block_names_the_id() {
        let err = ShaderSources::from_document(PAGE, "index.html", "vertex-shader", "nope")
            .expect_err("missing id");
        match err {
            HarnessError::ShaderSourceMissing { id, document } => {
                assert_eq!(id, "nope");
                assert_eq!(document, "index.html");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reads_stage_files() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        let vertex = dir.join("quad.vert");
        let fragment = dir.join("scene.frag");
        fs::write(&vertex, "void main() {}").unwrap();
        fs::write(&fragment, "void main() { gl_FragColor = vec4(1.0); }").unwrap();

        let sources = ShaderSources::from_files(&vertex, &fragment).expect("sources");
        assert_eq!(sources.vertex, "void main() {}");
        assert!(sources.fragment.contains("gl_FragColor"));

        let missing = ShaderSources::from_files(&dir.join("absent.vert"), &fragment);
        assert!(matches!(missing, Err(HarnessError::Io { .. })));
    }
}
