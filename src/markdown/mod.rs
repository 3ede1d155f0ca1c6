//! Markdown frontmatter splitting.
//!
//! Every source document Braid touches is split exactly once into a metadata
//! map and a publishable body. The metadata block carries the dependency
//! edges (`requires:`, `skills:`), recipe membership tags (`recipes:`), and
//! dispatch declarations (`dispatches:`), so splitting operates on the raw
//! content while the stripped body is what lands in compiled output.
//!
//! Parsing is deliberately tolerant: a document with no frontmatter, or with
//! frontmatter that fails to parse as YAML, degrades to an empty
//! [`SourceMetadata`] with the full input as body. Malformed frontmatter
//! emits one warning; missing frontmatter is silent.
//!
//! # Example
//!
//! ```rust
//! use braid_cli::markdown::split;
//!
//! let (metadata, body) = split("---\nrequires:\n  - style.md\n---\n# Guide\n");
//! assert_eq!(metadata.requires, vec!["style.md"]);
//! assert!(body.starts_with("# Guide"));
//! ```

use gray_matter::{
    Matter, Pod,
    engine::Engine,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Custom gray_matter engine that returns raw frontmatter text without parsing.
///
/// Returning the raw text lets us run our own `serde_yaml` pass on top and
/// degrade gracefully when the YAML is malformed, instead of failing inside
/// the extraction step.
struct RawFrontmatter;

impl Engine for RawFrontmatter {
    fn parse(content: &str) -> Result<Pod, gray_matter::Error> {
        Ok(Pod::String(content.to_string()))
    }
}

/// Typed view of a source document's frontmatter.
///
/// Unrecognized keys are preserved in `extra` so documents can carry custom
/// metadata without breaking the split.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Brief description of the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Outbound `requires` edges, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Outbound `skills` edges, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,

    /// Recipes this document declares membership in. The membership scan
    /// picks these up as implicit roots.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipes: Vec<String>,

    /// Subagent dispatch targets this document declares.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dispatches: Vec<String>,

    /// Unrecognized frontmatter keys, preserved as-is.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl SourceMetadata {
    /// Whether the document declares any outbound edges.
    pub fn has_edges(&self) -> bool {
        !self.requires.is_empty() || !self.skills.is_empty()
    }
}

/// Split raw content into `(metadata, body)`.
///
/// Never fails: malformed or missing frontmatter yields an empty metadata
/// map and leaves the body intact.
pub fn split(raw: &str) -> (SourceMetadata, String) {
    split_with_context(raw, None)
}

/// Split raw content, naming `context` (usually the file path) in warnings.
pub fn split_with_context(raw: &str, context: Option<&str>) -> (SourceMetadata, String) {
    let matter = Matter::<RawFrontmatter>::new();

    let parsed = match matter.parse::<String>(raw) {
        Ok(parsed) => parsed,
        Err(_) => return (SourceMetadata::default(), raw.to_string()),
    };

    let Some(frontmatter) = parsed.data.filter(|text| !text.is_empty()) else {
        return (SourceMetadata::default(), raw.to_string());
    };

    match serde_yaml::from_str::<SourceMetadata>(&frontmatter) {
        Ok(metadata) => (metadata, published_body(parsed.content)),
        Err(err) => {
            if let Some(ctx) = context {
                tracing::warn!("unparseable frontmatter in '{ctx}': {err}");
                eprintln!(
                    "Warning: Unable to parse YAML frontmatter in '{ctx}'. \
                     The document will be processed without metadata. Error: {err}"
                );
            } else {
                tracing::warn!("unparseable frontmatter: {err}");
                eprintln!(
                    "Warning: Unable to parse YAML frontmatter. \
                     The document will be processed without metadata. Error: {err}"
                );
            }
            // The invalid frontmatter stays out of the body either way; a
            // half-parsed metadata block must not contribute edges.
            (SourceMetadata::default(), published_body(parsed.content))
        }
    }
}

/// The closing fence keeps its trailing newline; any blank lines between it
/// and the first content line are not part of the published body.
fn published_body(content: String) -> String {
    content.trim_start_matches(['\r', '\n']).to_string()
}
