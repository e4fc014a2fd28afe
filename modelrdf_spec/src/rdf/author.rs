//! Authors and maintainers of a resource.

use std::fmt::Display;

use crate::node::{FieldView, Node, ParseError};

/// A person credited on a resource.
///
/// Documents carry authors either as structured mappings or as bare strings
/// (`authors: ["Constantin Pape;@bioimage-io"]`); the bare form keeps the
/// literal string as the name and leaves every other field empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub affiliation: Option<String>,
    pub email: Option<String>,
    pub github_user: Option<String>,
    pub orcid: Option<String>,
}

/// Same shape as [`Author`]; kept distinct in name only.
pub type Maintainer = Author;

impl Author {
    pub(crate) fn decode(node: &Node, context: &str) -> Result<Self, ParseError> {
        if let Some(name) = node.as_str() {
            return Ok(Self {
                name: name.to_owned(),
                affiliation: None,
                email: None,
                github_user: None,
                orcid: None,
            });
        }
        let view = FieldView::over(node, context)?;
        Ok(Self {
            name: view.require_str("name")?,
            affiliation: view.optional_str("affiliation")?,
            email: view.optional_str("email")?,
            github_user: view.optional_str("github_user")?,
            orcid: view.optional_str("orcid")?,
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

impl Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(email) = &self.email {
            write!(f, " <{email}>")?;
        }
        if let Some(github_user) = &self.github_user {
            write!(f, " (github: {github_user})")?;
        }
        Ok(())
    }
}
