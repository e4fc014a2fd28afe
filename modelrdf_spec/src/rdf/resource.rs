//! Common metadata shared by every resource description (models, datasets).

use crate::diagnostics::DiagnosticSink;
use crate::node::{FieldView, Node, ParseError};
use crate::rdf::author::{Author, Maintainer};
use crate::rdf::cite_entry::CiteEntry;
use crate::rdf::file_reference::FileReference;
use crate::rdf::version::FormatVersion;

/// How strictly required resource fields are enforced.
///
/// The top-level document is decoded strictly; nested resource references
/// (`training_data`) are decoded leniently, since documents may reference a
/// dataset by id alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    Strict,
    Lenient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub format_version: Option<FormatVersion>,
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub documentation: Option<FileReference>,
    pub authors: Vec<Author>,
    pub maintainers: Vec<Maintainer>,
    pub cite: Vec<CiteEntry>,
    pub license: Option<String>,
    pub tags: Vec<String>,
    pub covers: Vec<FileReference>,
    pub attachments: Option<Node>,
    pub training_data: Option<Box<Resource>>,
    pub version: Option<String>,
}

impl Resource {
    pub(crate) fn decode(
        node: &Node,
        context: &str,
        mode: DecodeMode,
        diags: &mut DiagnosticSink,
    ) -> Result<Self, ParseError> {
        // An id-only reference may be written as a bare string.
        if mode == DecodeMode::Lenient {
            if let Some(id) = node.as_str() {
                return Ok(Self::id_only(id.to_owned()));
            }
        }
        let view = FieldView::over(node, context)?;

        // The format version gates every later branch, so it is checked
        // before anything else is read.
        let format_version = match mode {
            DecodeMode::Strict => Some(view.require_str("format_version")?.parse()?),
            DecodeMode::Lenient => view
                .optional_str("format_version")?
                .and_then(|raw| raw.parse().ok()),
        };
        let (name, description) = match mode {
            DecodeMode::Strict => (view.require_str("name")?, view.require_str("description")?),
            DecodeMode::Lenient => (
                view.optional_str("name")?.unwrap_or_default(),
                view.optional_str("description")?.unwrap_or_default(),
            ),
        };

        let training_data = match view.node("training_data") {
            Some(child) if mode == DecodeMode::Strict => Some(Box::new(Self::decode(
                child,
                &view.path("training_data"),
                DecodeMode::Lenient,
                diags,
            )?)),
            _ => None,
        };

        Ok(Self {
            format_version,
            id: view.optional_scalar_str("id")?,
            name,
            description,
            documentation: view
                .optional_str("documentation")?
                .map(FileReference::from),
            authors: Author::decode_list(&view, "authors")?,
            maintainers: Author::decode_list(&view, "maintainers")?,
            cite: CiteEntry::decode_list(&view, "cite")?,
            license: view.optional_scalar_str("license")?,
            tags: view.optional_string_list("tags")?,
            covers: FileReference::decode_string_list(&view, "covers")?,
            attachments: view.optional_raw("attachments"),
            training_data,
            version: view.optional_scalar_str("version")?,
        })
    }

    fn id_only(id: String) -> Self {
        Self {
            format_version: None,
            id: Some(id),
            name: String::new(),
            description: String::new(),
            documentation: None,
            authors: Vec::new(),
            maintainers: Vec::new(),
            cite: Vec::new(),
            license: None,
            tags: Vec::new(),
            covers: Vec::new(),
            attachments: None,
            training_data: None,
            version: None,
        }
    }
}
