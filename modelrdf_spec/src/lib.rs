//! Parser and cross-reference validator for model resource description
//! documents.
//!
//! A document (YAML or JSON, safe-loaded into a generic tree) describes a
//! machine-learning model: its input/output tensors, their axes and sizes,
//! processing pipelines, weight artifacts and metadata. Two incompatible
//! schema generations are supported behind one data model, selected by the
//! document's `format_version` tag.
//!
//! Parsing is all-or-nothing: the entry points either return a fully
//! validated, immutable [`Model`] — every axis-size and shape reference to a
//! sibling tensor already resolved — or a [`ParseError`]. Recoverable oddities
//! (unknown weight formats, unknown processing operations, unknown axis
//! types, malformed numeric tokens) never abort the parse; they are logged
//! and carried as [`Diagnostic`]s next to the model.

pub mod diagnostics;
pub mod node;
pub mod rdf;

use std::path::Path;

pub use diagnostics::Diagnostic;
pub use node::{Node, ParseError};
pub use rdf::model::axis::Axis;
pub use rdf::model::axis_size::{AxisSize, ResolvedSize, SizeError};
pub use rdf::model::processing::Processing;
pub use rdf::model::shape::TensorShape;
pub use rdf::model::tensor::{InputTensor, OutputTensor};
pub use rdf::model::weights::{WeightsFormat, WeightsMap};
pub use rdf::model::Model;
pub use rdf::FormatVersion;

use diagnostics::DiagnosticSink;

/// A validated model together with the recoverable diagnostics recorded
/// while parsing it.
#[derive(Debug)]
pub struct ParsedModel {
    model: Model,
    diagnostics: Vec<Diagnostic>,
}

impl ParsedModel {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    pub fn into_parts(self) -> (Model, Vec<Diagnostic>) {
        (self.model, self.diagnostics)
    }
}

/// Parses an already-loaded document tree into a model.
pub fn parse_model(node: &Node) -> Result<ParsedModel, ParseError> {
    let mut diags = DiagnosticSink::default();
    let model = Model::decode(node, &mut diags)?;
    Ok(ParsedModel {
        model,
        diagnostics: diags.into_vec(),
    })
}

/// Safe-loads YAML text and parses it.
pub fn parse_model_yaml(text: &str) -> Result<ParsedModel, ParseError> {
    let node: Node = serde_yaml::from_str(text)?;
    parse_model(&node)
}

/// Safe-loads raw document bytes (YAML, which subsumes JSON) and parses
/// them.
pub fn parse_model_slice(bytes: &[u8]) -> Result<ParsedModel, ParseError> {
    let node: Node = serde_yaml::from_slice(bytes)?;
    parse_model(&node)
}

/// Parses JSON text through the same tree representation.
pub fn parse_model_json(text: &str) -> Result<ParsedModel, ParseError> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    let node: Node = serde_yaml::to_value(json)?;
    parse_model(&node)
}

const CANONICAL_NAMES: [&str; 4] = ["model.yaml", "model.yml", "rdf.yaml", "rdf.yml"];

/// Whether a path is a plausible model description document, by filename
/// convention alone. The search over directories or archives belongs to the
/// caller; this is the pure predicate it filters with.
pub fn is_model_rdf_filename(path: impl AsRef<Path>) -> bool {
    let name = match path.as_ref().file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_ascii_lowercase(),
        None => return false,
    };
    if CANONICAL_NAMES.contains(&name.as_str()) {
        return true;
    }
    let stem = match name.strip_suffix(".yaml").or_else(|| name.strip_suffix(".yml")) {
        Some(stem) => stem,
        None => return false,
    };
    stem.starts_with("model") || stem.starts_with("rdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_filenames_match_case_insensitively() {
        assert!(is_model_rdf_filename("model.yaml"));
        assert!(is_model_rdf_filename("RDF.YML"));
        assert!(is_model_rdf_filename("some/dir/Model.Yaml"));
    }

    #[test]
    fn prefixed_yaml_names_match() {
        assert!(is_model_rdf_filename("model_v2.yaml"));
        assert!(is_model_rdf_filename("rdf-draft.yml"));
        assert!(!is_model_rdf_filename("mymodel.yaml"));
        assert!(!is_model_rdf_filename("model.json"));
        assert!(!is_model_rdf_filename("notes.txt"));
    }

    #[test]
    fn json_front_door_reaches_the_same_parser() {
        let err = parse_model_json("{\"name\": \"unet\"}").unwrap_err();
        assert!(matches!(err, ParseError::MissingField { .. }));
    }
}
