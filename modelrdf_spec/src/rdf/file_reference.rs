//! References to files that travel with (or are linked from) a resource.

use crate::node::{FieldView, Node, ParseError};

/// Either a URL or a path relative to the document's container.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum FileReference {
    #[display("{_0}")]
    Url(String),
    #[display("{_0}")]
    Path(String),
}

impl From<String> for FileReference {
    fn from(raw: String) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw)
        } else {
            Self::Path(raw)
        }
    }
}

impl FileReference {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(s) | Self::Path(s) => s,
        }
    }

    /// Documents write file references either as a plain string or as a
    /// mapping with a `source` key (0.5-style test/sample tensors).
    pub(crate) fn decode(node: &Node, context: &str) -> Result<Self, ParseError> {
        if let Some(raw) = node.as_str() {
            return Ok(Self::from(raw.to_owned()));
        }
        let view = FieldView::over(node, context)?;
        Ok(Self::from(view.require_str("source")?))
    }

    pub(crate) fn decode_string_list(
        view: &FieldView<'_>,
        field: &str,
    ) -> Result<Vec<Self>, ParseError> {
        Ok(view
            .optional_string_list(field)?
            .into_iter()
            .map(Self::from)
            .collect())
    }
}
