//! Weight-artifact descriptors, keyed by serialization format.

use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::node::{FieldView, Node, ParseError};
use crate::rdf::author::Author;
use crate::rdf::file_reference::FileReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, derive_more::Display)]
pub enum WeightsFormat {
    #[display("keras_hdf5")]
    KerasHdf5,
    #[display("pytorch_state_dict")]
    PytorchStateDict,
    #[display("tensorflow_js")]
    TensorflowJs,
    #[display("tensorflow_saved_model_bundle")]
    TensorflowSavedModelBundle,
    #[display("onnx")]
    Onnx,
    #[display("torchscript")]
    Torchscript,
}

impl WeightsFormat {
    /// Resolves a document key, including the legacy aliases older format
    /// generations used. Unknown keys resolve to `None` (dropped by the map
    /// decoder, never fatal).
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "keras_hdf5" | "keras" => Self::KerasHdf5,
            "pytorch_state_dict" => Self::PytorchStateDict,
            "tensorflow_js" => Self::TensorflowJs,
            "tensorflow_saved_model_bundle" | "tensorflow_saved_model" => {
                Self::TensorflowSavedModelBundle
            }
            "onnx" => Self::Onnx,
            "torchscript" | "pytorch_script" => Self::Torchscript,
            _ => return None,
        })
    }
}

/// One weight artifact: where it lives and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightsEntry {
    pub source: FileReference,
    pub sha256: Option<String>,
    /// Provenance chain: the format this artifact was converted from.
    pub parent: Option<WeightsFormat>,
    pub authors: Vec<Author>,
    pub attachments: Option<Node>,
}

impl WeightsEntry {
    fn decode(node: &Node, context: &str, diags: &mut DiagnosticSink) -> Result<Self, ParseError> {
        let view = FieldView::over(node, context)?;
        let parent = match view.optional_str("parent")? {
            None => None,
            Some(key) => match WeightsFormat::from_key(&key) {
                Some(format) => Some(format),
                None => {
                    diags.push(Diagnostic::UnknownWeightsFormat { key });
                    None
                }
            },
        };
        Ok(Self {
            source: FileReference::decode(view.require_node("source")?, &view.path("source"))?,
            sha256: view.optional_str("sha256")?,
            parent,
            authors: Author::decode_list(&view, "authors")?,
            attachments: view.optional_raw("attachments"),
        })
    }
}

/// All weight artifacts of a model, keyed by format.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightsMap {
    entries: BTreeMap<WeightsFormat, WeightsEntry>,
}

impl WeightsMap {
    /// Decodes the raw weights mapping. Keys this schema generation does not
    /// recognize are dropped with a diagnostic; the rest of the model still
    /// parses.
    pub(crate) fn decode(
        node: &Node,
        context: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Self, ParseError> {
        let mapping = node.as_mapping().ok_or_else(|| ParseError::TypeMismatch {
            at: context.to_owned(),
            expected: "mapping",
            found: crate::node::node_kind(node),
        })?;
        let mut entries = BTreeMap::new();
        for (key, value) in mapping {
            let key = match key.as_str() {
                Some(key) => key,
                None => {
                    return Err(ParseError::TypeMismatch {
                        at: context.to_owned(),
                        expected: "string key",
                        found: crate::node::node_kind(key),
                    })
                }
            };
            match WeightsFormat::from_key(key) {
                Some(format) => {
                    let entry =
                        WeightsEntry::decode(value, &format!("{context}.{key}"), diags)?;
                    entries.insert(format, entry);
                }
                None => diags.push(Diagnostic::UnknownWeightsFormat {
                    key: key.to_owned(),
                }),
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, format: WeightsFormat) -> Option<&WeightsEntry> {
        self.entries.get(&format)
    }

    /// String-keyed projection for convenience lookups; accepts the same
    /// legacy aliases as the decoder.
    pub fn by_name(&self, key: &str) -> Option<&WeightsEntry> {
        WeightsFormat::from_key(key).and_then(|format| self.entries.get(&format))
    }

    pub fn formats(&self) -> impl Iterator<Item = WeightsFormat> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WeightsFormat, &WeightsEntry)> {
        self.entries.iter().map(|(format, entry)| (*format, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
