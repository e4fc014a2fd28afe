//! The model resource description and its assembly pipeline.

pub mod axis;
pub mod axis_size;
pub mod data_descr;
pub mod processing;
pub mod shape;
pub mod tensor;
pub mod weights;

use crate::diagnostics::DiagnosticSink;
use crate::node::{FieldView, Node, ParseError};
use crate::rdf::author::Author;
use crate::rdf::file_reference::FileReference;
use crate::rdf::resource::{DecodeMode, Resource};
use crate::rdf::version::FormatVersion;
use axis_size::ResolutionScope;
use tensor::{InputTensor, OutputTensor};
use weights::WeightsMap;

/// The model this one was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelParent {
    pub id: Option<String>,
    pub sha256: Option<String>,
    pub uri: Option<String>,
}

impl ModelParent {
    fn decode(node: &Node, context: &str) -> Result<Self, ParseError> {
        let view = FieldView::over(node, context)?;
        Ok(Self {
            id: view.optional_str("id")?,
            sha256: view.optional_str("sha256")?,
            uri: view
                .optional_str("uri")?
                .or(view.optional_str("rdf_source")?),
        })
    }
}

/// A fully parsed and cross-validated model description.
///
/// Constructed once by [`Model::decode`] and immutable afterwards; every
/// reference an axis size or implicit shape carries has been bound before
/// the value is handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    resource: Resource,
    format_version: FormatVersion,
    inputs: Vec<InputTensor>,
    outputs: Vec<OutputTensor>,
    weights: WeightsMap,
    parent: Option<ModelParent>,
    config: Option<Node>,
    packaged_by: Vec<Author>,
    timestamp: Option<String>,
    legacy_test_inputs: Vec<FileReference>,
    legacy_test_outputs: Vec<FileReference>,
    legacy_sample_inputs: Vec<FileReference>,
    legacy_sample_outputs: Vec<FileReference>,
}

impl Model {
    /// Runs the whole assembly pipeline over a raw document tree: resource
    /// metadata, the single format-version branch, weights, tensors, then
    /// the cross-tensor validation pass (inputs in document order, then
    /// outputs, so outputs may reference inputs).
    pub(crate) fn decode(node: &Node, diags: &mut DiagnosticSink) -> Result<Self, ParseError> {
        let resource = Resource::decode(node, "model", DecodeMode::Strict, diags)?;
        let format_version = resource
            .format_version
            .ok_or_else(|| ParseError::MissingField {
                field: "format_version".to_owned(),
                context: "model".to_owned(),
            })?;
        // The one generation branch. Everything downstream keys off this
        // flag instead of re-comparing versions.
        let current_gen = format_version > FormatVersion::V0_5_0;

        let view = FieldView::over(node, "model")?;
        tracing::debug!(%format_version, "decoding model fields");
        let weights = WeightsMap::decode(view.require_node("weights")?, "model.weights", diags)?;

        let mut inputs = view
            .require_sequence("inputs")?
            .iter()
            .enumerate()
            .map(|(i, item)| InputTensor::decode(item, &format!("model.inputs[{i}]"), diags))
            .collect::<Result<Vec<_>, _>>()?;
        let mut outputs = view
            .require_sequence("outputs")?
            .iter()
            .enumerate()
            .map(|(i, item)| OutputTensor::decode(item, &format!("model.outputs[{i}]"), diags))
            .collect::<Result<Vec<_>, _>>()?;

        // Legacy documents keep test/sample files and the timestamp at model
        // level; the current generation stores them per tensor and any
        // model-level leftovers are ignored.
        let (timestamp, test_in, test_out, sample_in, sample_out) = if current_gen {
            (None, Vec::new(), Vec::new(), Vec::new(), Vec::new())
        } else {
            (
                view.optional_str("timestamp")?,
                FileReference::decode_string_list(&view, "test_inputs")?,
                FileReference::decode_string_list(&view, "test_outputs")?,
                FileReference::decode_string_list(&view, "sample_inputs")?,
                FileReference::decode_string_list(&view, "sample_outputs")?,
            )
        };

        let parent = view
            .node("parent")
            .map(|n| ModelParent::decode(n, "model.parent"))
            .transpose()?;

        tracing::debug!(
            inputs = inputs.len(),
            outputs = outputs.len(),
            "resolving cross-tensor references"
        );
        let mut scope = ResolutionScope::default();
        for input in &mut inputs {
            input.validate(&scope)?;
            input.register(&mut scope);
        }
        for output in &mut outputs {
            output.validate(&scope)?;
            output.register(&mut scope);
        }

        Ok(Self {
            resource,
            format_version,
            inputs,
            outputs,
            weights,
            parent,
            config: view.optional_raw("config"),
            packaged_by: Author::decode_list(&view, "packaged_by")?,
            timestamp,
            legacy_test_inputs: test_in,
            legacy_test_outputs: test_out,
            legacy_sample_inputs: sample_in,
            legacy_sample_outputs: sample_out,
        })
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    pub fn format_version(&self) -> FormatVersion {
        self.format_version
    }

    pub fn inputs(&self) -> &[InputTensor] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputTensor] {
        &self.outputs
    }

    pub fn weights(&self) -> &WeightsMap {
        &self.weights
    }

    pub fn parent(&self) -> Option<&ModelParent> {
        self.parent.as_ref()
    }

    pub fn config(&self) -> Option<&Node> {
        self.config.as_ref()
    }

    pub fn packaged_by(&self) -> &[Author] {
        &self.packaged_by
    }

    /// Model-level timestamp; only legacy documents carry one.
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Test input files: the model-level list for legacy documents, or the
    /// per-tensor test files projected over the inputs for the current
    /// generation.
    pub fn test_inputs(&self) -> Vec<FileReference> {
        if self.format_version > FormatVersion::V0_5_0 {
            self.inputs
                .iter()
                .filter_map(|t| t.test_tensor().cloned())
                .collect()
        } else {
            self.legacy_test_inputs.clone()
        }
    }

    pub fn test_outputs(&self) -> Vec<FileReference> {
        if self.format_version > FormatVersion::V0_5_0 {
            self.outputs
                .iter()
                .filter_map(|t| t.test_tensor().cloned())
                .collect()
        } else {
            self.legacy_test_outputs.clone()
        }
    }

    pub fn sample_inputs(&self) -> Vec<FileReference> {
        if self.format_version > FormatVersion::V0_5_0 {
            self.inputs
                .iter()
                .filter_map(|t| t.sample_tensor().cloned())
                .collect()
        } else {
            self.legacy_sample_inputs.clone()
        }
    }

    pub fn sample_outputs(&self) -> Vec<FileReference> {
        if self.format_version > FormatVersion::V0_5_0 {
            self.outputs
                .iter()
                .filter_map(|t| t.sample_tensor().cloned())
                .collect()
        } else {
            self.legacy_sample_outputs.clone()
        }
    }
}
