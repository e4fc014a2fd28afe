//! Raw document tree and the field reader every decoder goes through.
//!
//! The parsing core never touches a concrete YAML/JSON decoder; it operates
//! on an already-loaded [`Node`] tree (a safe load — no native type
//! instantiation from tags). All missing-field and type-mismatch errors are
//! produced here so every diagnostic names the field and the sub-document it
//! came from.

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// One node of the raw document tree.
pub type Node = serde_yaml::Value;

/// Describes a node's structural shape for error messages.
pub fn node_kind(node: &Node) -> &'static str {
    match node {
        Node::Null => "null",
        Node::Bool(_) => "boolean",
        Node::Number(_) => "number",
        Node::String(_) => "string",
        Node::Sequence(_) => "sequence",
        Node::Mapping(_) => "mapping",
        Node::Tagged(_) => "tagged value",
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },
    #[error("expected {expected} at {at}, found {found}")]
    TypeMismatch {
        at: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("cannot resolve reference to tensor '{tensor_id}' from {at}")]
    UnresolvableTensor { at: String, tensor_id: String },
    #[error("cannot resolve reference to axis '{axis_id}' of tensor '{tensor_id}' from {at}")]
    UnresolvableAxis {
        at: String,
        tensor_id: String,
        axis_id: String,
    },
    #[error("invalid shape description at {at}: {reason}")]
    InvalidShape { at: String, reason: String },
    #[error(transparent)]
    FormatVersion(#[from] crate::rdf::version::FormatVersionParsingError),
    #[error(transparent)]
    AxisLetter(#[from] crate::rdf::model::axis::AxisLetterParsingError),
    #[error(transparent)]
    SpaceUnit(#[from] crate::rdf::model::axis::SpaceUnitParsingError),
    #[error(transparent)]
    TimeUnit(#[from] crate::rdf::model::axis::TimeUnitParsingError),
    #[error(transparent)]
    DataType(#[from] crate::rdf::model::data_descr::DataTypeParsingError),
    #[error(transparent)]
    Size(#[from] crate::rdf::model::axis_size::SizeError),
    #[error("document is not valid YAML: {0}")]
    Decode(#[from] serde_yaml::Error),
    #[error("document is not valid JSON: {0}")]
    DecodeJson(#[from] serde_json::Error),
}

/// Read-only view over one mapping node, tagged with a context label that
/// prefixes every error raised through it.
pub struct FieldView<'a> {
    node: &'a Node,
    context: String,
}

impl<'a> FieldView<'a> {
    pub fn over(node: &'a Node, context: impl Into<String>) -> Result<Self, ParseError> {
        let context = context.into();
        if node.as_mapping().is_none() {
            return Err(ParseError::TypeMismatch {
                at: context,
                expected: "mapping",
                found: node_kind(node),
            });
        }
        Ok(Self { node, context })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Full dotted path of a field under this view, for error messages.
    pub fn path(&self, field: &str) -> String {
        format!("{}.{}", self.context, field)
    }

    pub fn missing(&self, field: &str) -> ParseError {
        ParseError::MissingField {
            field: field.to_owned(),
            context: self.context.clone(),
        }
    }

    pub fn mismatch(&self, field: &str, expected: &'static str, found: &Node) -> ParseError {
        ParseError::TypeMismatch {
            at: self.path(field),
            expected,
            found: node_kind(found),
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.node.get(field).is_some()
    }

    /// Raw child node; absent and explicit-null are both `None`.
    pub fn node(&self, field: &str) -> Option<&'a Node> {
        match self.node.get(field) {
            Some(Node::Null) | None => None,
            Some(n) => Some(n),
        }
    }

    pub fn require_node(&self, field: &str) -> Result<&'a Node, ParseError> {
        self.node(field).ok_or_else(|| self.missing(field))
    }

    pub fn require_str(&self, field: &str) -> Result<String, ParseError> {
        let node = self.require_node(field)?;
        node.as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.mismatch(field, "string", node))
    }

    pub fn optional_str(&self, field: &str) -> Result<Option<String>, ParseError> {
        match self.node(field) {
            None => Ok(None),
            Some(node) => node
                .as_str()
                .map(|s| Some(s.to_owned()))
                .ok_or_else(|| self.mismatch(field, "string", node)),
        }
    }

    /// A string, or a scalar printable as one (version tags are often typed
    /// as numbers by YAML).
    pub fn optional_scalar_str(&self, field: &str) -> Result<Option<String>, ParseError> {
        match self.node(field) {
            None => Ok(None),
            Some(Node::String(s)) => Ok(Some(s.clone())),
            Some(Node::Number(n)) => Ok(Some(n.to_string())),
            Some(Node::Bool(b)) => Ok(Some(b.to_string())),
            Some(node) => Err(self.mismatch(field, "scalar", node)),
        }
    }

    pub fn require_u64(&self, field: &str) -> Result<u64, ParseError> {
        let node = self.require_node(field)?;
        node.as_u64()
            .ok_or_else(|| self.mismatch(field, "non-negative integer", node))
    }

    pub fn optional_u64(&self, field: &str) -> Result<Option<u64>, ParseError> {
        match self.node(field) {
            None => Ok(None),
            Some(node) => node
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.mismatch(field, "non-negative integer", node)),
        }
    }

    pub fn optional_u64_or(&self, field: &str, default: u64) -> Result<u64, ParseError> {
        Ok(self.optional_u64(field)?.unwrap_or(default))
    }

    pub fn optional_i64_or(&self, field: &str, default: i64) -> Result<i64, ParseError> {
        match self.node(field) {
            None => Ok(default),
            Some(node) => node
                .as_i64()
                .ok_or_else(|| self.mismatch(field, "integer", node)),
        }
    }

    pub fn require_f64(&self, field: &str) -> Result<f64, ParseError> {
        let node = self.require_node(field)?;
        node.as_f64()
            .ok_or_else(|| self.mismatch(field, "number", node))
    }

    pub fn optional_f64(&self, field: &str) -> Result<Option<f64>, ParseError> {
        match self.node(field) {
            None => Ok(None),
            Some(node) => node
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.mismatch(field, "number", node)),
        }
    }

    pub fn optional_f64_or(&self, field: &str, default: f64) -> Result<f64, ParseError> {
        Ok(self.optional_f64(field)?.unwrap_or(default))
    }

    pub fn require_sequence(&self, field: &str) -> Result<&'a [Node], ParseError> {
        let node = self.require_node(field)?;
        node.as_sequence()
            .map(Vec::as_slice)
            .ok_or_else(|| self.mismatch(field, "sequence", node))
    }

    pub fn optional_sequence(&self, field: &str) -> Result<Option<&'a [Node]>, ParseError> {
        match self.node(field) {
            None => Ok(None),
            Some(node) => node
                .as_sequence()
                .map(|s| Some(s.as_slice()))
                .ok_or_else(|| self.mismatch(field, "sequence", node)),
        }
    }

    pub fn require_string_list(&self, field: &str) -> Result<Vec<String>, ParseError> {
        let items = self.require_sequence(field)?;
        self.strings_from(field, items)
    }

    pub fn optional_string_list(&self, field: &str) -> Result<Vec<String>, ParseError> {
        match self.optional_sequence(field)? {
            None => Ok(Vec::new()),
            Some(items) => self.strings_from(field, items),
        }
    }

    fn strings_from(&self, field: &str, items: &[Node]) -> Result<Vec<String>, ParseError> {
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| self.mismatch(field, "sequence of strings", item))
            })
            .collect()
    }

    pub fn optional_u64_list(&self, field: &str) -> Result<Option<Vec<u64>>, ParseError> {
        match self.optional_sequence(field)? {
            None => Ok(None),
            Some(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .ok_or_else(|| self.mismatch(field, "sequence of non-negative integers", item))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
        }
    }

    /// Numeric-array coercion. Accepts a sequence or a lone scalar (promoted
    /// to a one-element array). Inside the array, the string tokens `"inf"`
    /// and `"-inf"` coerce to the infinities (YAML's own `.inf`/`-.inf`
    /// already arrive as numbers); a null or otherwise unparseable element
    /// becomes NaN with a recorded diagnostic instead of failing the parse.
    pub fn optional_floats(
        &self,
        field: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Option<Vec<f64>>, ParseError> {
        let node = match self.node(field) {
            None => return Ok(None),
            Some(n) => n,
        };
        let items: &[Node] = match node {
            Node::Sequence(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(match coerce_float_element(item) {
                Some(v) => v,
                None => {
                    diags.push(Diagnostic::MalformedNumericToken {
                        at: self.path(field),
                        token: describe_token(item),
                    });
                    f64::NAN
                }
            });
        }
        Ok(Some(out))
    }

    pub fn floats_or(
        &self,
        field: &str,
        default: &[f64],
        diags: &mut DiagnosticSink,
    ) -> Result<Vec<f64>, ParseError> {
        Ok(self
            .optional_floats(field, diags)?
            .unwrap_or_else(|| default.to_vec()))
    }

    /// A pair like `data_range: [-.inf, .inf]`, run through the numeric
    /// coercion above.
    pub fn optional_float_pair(
        &self,
        field: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Option<(f64, f64)>, ParseError> {
        match self.optional_floats(field, diags)? {
            None => Ok(None),
            Some(values) if values.len() == 2 => Ok(Some((values[0], values[1]))),
            Some(_) => Err(ParseError::TypeMismatch {
                at: self.path(field),
                expected: "two-element numeric array",
                found: "sequence",
            }),
        }
    }

    /// Opaque payload kept verbatim (config, attachments, kwargs).
    pub fn optional_raw(&self, field: &str) -> Option<Node> {
        self.node(field).cloned()
    }
}

fn coerce_float_element(node: &Node) -> Option<f64> {
    match node {
        Node::Number(n) => n.as_f64(),
        Node::String(s) => match s.as_str() {
            "inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            other => {
                // Rust's float parser also accepts "infinity"/"nan" spellings;
                // those are not part of the coercion contract.
                if other.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                    None
                } else {
                    other.parse::<f64>().ok()
                }
            }
        },
        _ => None,
    }
}

fn describe_token(node: &Node) -> String {
    match node {
        Node::String(s) => format!("\"{s}\""),
        other => node_kind(other).to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Node {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn missing_required_field_names_field_and_context() {
        let node = yaml("name: unet");
        let view = FieldView::over(&node, "model").unwrap();
        let err = view.require_str("description").unwrap_err();
        assert!(matches!(err, ParseError::MissingField { .. }));
        assert_eq!(
            err.to_string(),
            "missing required field 'description' in model"
        );
    }

    #[test]
    fn type_mismatch_names_expected_and_actual_shape() {
        let node = yaml("threshold: {a: 1}");
        let view = FieldView::over(&node, "kwargs").unwrap();
        let err = view.require_f64("threshold").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected number at kwargs.threshold, found mapping"
        );
    }

    #[test]
    fn explicit_null_counts_as_absent_for_optional_fields() {
        let node = yaml("unit: null");
        let view = FieldView::over(&node, "axis").unwrap();
        assert_eq!(view.optional_str("unit").unwrap(), None);
    }

    #[test]
    fn yaml_dotted_infinities_pass_through_as_numbers() {
        let node = yaml("data_range: [-.inf, .inf]");
        let view = FieldView::over(&node, "tensor").unwrap();
        let mut diags = DiagnosticSink::default();
        let (lo, hi) = view.optional_float_pair("data_range", &mut diags).unwrap().unwrap();
        assert_eq!(lo, f64::NEG_INFINITY);
        assert_eq!(hi, f64::INFINITY);
        assert!(diags.is_empty());
    }

    #[test]
    fn string_inf_tokens_coerce_to_infinities() {
        let node = yaml(r#"values: ["inf", "-inf", 2.5]"#);
        let view = FieldView::over(&node, "tensor").unwrap();
        let mut diags = DiagnosticSink::default();
        let values = view.optional_floats("values", &mut diags).unwrap().unwrap();
        assert_eq!(values[0], f64::INFINITY);
        assert_eq!(values[1], f64::NEG_INFINITY);
        assert_eq!(values[2], 2.5);
        assert!(diags.is_empty());
    }

    #[test]
    fn bare_unquoted_inf_decodes_as_string_and_takes_the_coercion_path() {
        // YAML only treats the dotted spellings as numbers; `inf` survives
        // as a plain string.
        let node = yaml("values: [inf, -inf]");
        let view = FieldView::over(&node, "tensor").unwrap();
        let mut diags = DiagnosticSink::default();
        let values = view.optional_floats("values", &mut diags).unwrap().unwrap();
        assert_eq!(values, vec![f64::INFINITY, f64::NEG_INFINITY]);
    }

    #[test]
    fn null_inside_numeric_array_becomes_nan_with_diagnostic() {
        let node = yaml("values: [1.0, null, 3.0]");
        let view = FieldView::over(&node, "tensor").unwrap();
        let mut diags = DiagnosticSink::default();
        let values = view.optional_floats("values", &mut diags).unwrap().unwrap();
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 3.0);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn alphabetic_infinity_spellings_are_not_special_cased() {
        let node = yaml(r#"values: ["infinity", "nan"]"#);
        let view = FieldView::over(&node, "tensor").unwrap();
        let mut diags = DiagnosticSink::default();
        let values = view.optional_floats("values", &mut diags).unwrap().unwrap();
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn scalar_promotes_to_one_element_float_array() {
        let node = yaml("gain: 2.0");
        let view = FieldView::over(&node, "kwargs").unwrap();
        let mut diags = DiagnosticSink::default();
        assert_eq!(
            view.optional_floats("gain", &mut diags).unwrap().unwrap(),
            vec![2.0]
        );
    }
}
