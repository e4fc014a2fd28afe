//! Citation entries of a resource.

use crate::node::{FieldView, Node, ParseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiteEntry {
    pub text: String,
    pub doi: Option<String>,
    pub url: Option<String>,
}

impl CiteEntry {
    pub(crate) fn decode(node: &Node, context: &str) -> Result<Self, ParseError> {
        let view = FieldView::over(node, context)?;
        Ok(Self {
            text: view.require_str("text")?,
            doi: view.optional_str("doi")?,
            url: view.optional_str("url")?,
        })
    }

    pub(crate) fn decode_list(
        view: &FieldView<'_>,
        field: &str,
    ) -> Result<Vec<Self>, ParseError> {
        match view.optional_sequence(field)? {
            None => Ok(Vec::new()),
            Some(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Self::decode(item, &format!("{}[{i}]", view.path(field))))
                .collect(),
        }
    }
}
