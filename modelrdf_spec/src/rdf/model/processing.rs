//! Pre- and post-processing steps attached to tensors.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::node::{FieldView, Node, ParseError};

const DEFAULT_EPS: f64 = 1e-6;

#[derive(thiserror::Error, Debug)]
#[error("'{token}' is not a processing mode")]
pub struct ProcessingModeParsingError {
    token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum ProcessingMode {
    #[display("fixed")]
    Fixed,
    #[display("per_dataset")]
    PerDataset,
    #[default]
    #[display("per_sample")]
    PerSample,
}

impl std::str::FromStr for ProcessingMode {
    type Err = ProcessingModeParsingError;
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Ok(match token {
            "fixed" => Self::Fixed,
            "per_dataset" => Self::PerDataset,
            "per_sample" => Self::PerSample,
            _ => {
                return Err(ProcessingModeParsingError {
                    token: token.to_owned(),
                })
            }
        })
    }
}

/// A named numeric transform applied before or after inference.
///
/// The vocabulary is closed but the fallback is open: an operation name this
/// schema generation does not know becomes [`Processing::Unknown`] carrying
/// its raw keyword arguments, so documents written against newer schema
/// revisions still parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Processing {
    Binarize {
        threshold: f64,
    },
    Clip {
        min: f64,
        max: f64,
    },
    ScaleLinear {
        gain: Vec<f64>,
        offset: Vec<f64>,
        axes: Vec<String>,
    },
    Sigmoid,
    ScaleMeanVariance {
        reference_tensor: String,
        mode: ProcessingMode,
        axes: Vec<String>,
        eps: f64,
    },
    ScaleRange {
        reference_tensor: Option<String>,
        min_percentile: f64,
        max_percentile: f64,
        mode: ProcessingMode,
        axes: Vec<String>,
        eps: f64,
    },
    ZeroMeanUnitVariance {
        mean: Vec<f64>,
        std: Vec<f64>,
        mode: ProcessingMode,
        axes: Vec<String>,
        eps: f64,
    },
    Unknown {
        name: String,
        kwargs: Node,
    },
}

impl Processing {
    pub(crate) fn decode_list(
        node: &Node,
        context: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Vec<Self>, ParseError> {
        let items = match node.as_sequence() {
            Some(items) => items,
            None => {
                return Err(ParseError::TypeMismatch {
                    at: context.to_owned(),
                    expected: "sequence of processing steps",
                    found: crate::node::node_kind(node),
                })
            }
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| Self::decode(item, &format!("{context}[{i}]"), diags))
            .collect()
    }

    pub(crate) fn decode(
        node: &Node,
        context: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Self, ParseError> {
        let step = FieldView::over(node, context)?;
        let name = match step.optional_str("name")? {
            Some(name) => name,
            // 0.4 documents tag the operation as `id`.
            None => step.require_str("id").map_err(|_| step.missing("name"))?,
        };
        let empty = Node::Mapping(serde_yaml::Mapping::new());
        let kwargs_node = step.node("kwargs").unwrap_or(&empty);
        let kwargs = FieldView::over(kwargs_node, step.path("kwargs"))?;

        Ok(match name.as_str() {
            "binarize" => Self::Binarize {
                threshold: kwargs.require_f64("threshold")?,
            },
            "clip" => Self::Clip {
                min: kwargs.optional_f64_or("min", f64::NEG_INFINITY)?,
                max: kwargs.optional_f64_or("max", f64::INFINITY)?,
            },
            "scale_linear" => Self::ScaleLinear {
                gain: kwargs.floats_or("gain", &[1.0], diags)?,
                offset: kwargs.floats_or("offset", &[0.0], diags)?,
                axes: axes_list(&kwargs)?,
            },
            "sigmoid" => Self::Sigmoid,
            "scale_mean_variance" => Self::ScaleMeanVariance {
                // Unlike scale_range this operation keeps its reference
                // tensor inside the kwargs mapping.
                reference_tensor: kwargs.require_str("reference_tensor")?,
                mode: mode_field(&kwargs)?,
                axes: axes_list(&kwargs)?,
                eps: kwargs.optional_f64_or("eps", DEFAULT_EPS)?,
            },
            "scale_range" => Self::ScaleRange {
                // Documents place this one's reference tensor on the step
                // object itself, not in kwargs; both layouts are in the wild
                // and only this one is accepted here.
                reference_tensor: step.optional_str("reference_tensor")?,
                min_percentile: kwargs.optional_f64_or("min_percentile", 0.0)?,
                max_percentile: kwargs.optional_f64_or("max_percentile", 100.0)?,
                mode: mode_field(&kwargs)?,
                axes: axes_list(&kwargs)?,
                eps: kwargs.optional_f64_or("eps", DEFAULT_EPS)?,
            },
            "zero_mean_unit_variance" => Self::ZeroMeanUnitVariance {
                mean: kwargs.floats_or("mean", &[], diags)?,
                std: kwargs.floats_or("std", &[], diags)?,
                mode: mode_field(&kwargs)?,
                axes: axes_list(&kwargs)?,
                eps: kwargs.optional_f64_or("eps", DEFAULT_EPS)?,
            },
            _ => {
                diags.push(Diagnostic::UnknownProcessingOp {
                    name: name.clone(),
                    at: context.to_owned(),
                });
                Self::Unknown {
                    name,
                    kwargs: kwargs_node.clone(),
                }
            }
        })
    }
}

fn mode_field(kwargs: &FieldView<'_>) -> Result<ProcessingMode, ParseError> {
    match kwargs.optional_str("mode")? {
        None => Ok(ProcessingMode::default()),
        Some(token) => token.parse().map_err(|_| ParseError::TypeMismatch {
            at: kwargs.path("mode"),
            expected: "one of fixed, per_dataset, per_sample",
            found: "string",
        }),
    }
}

/// Axes are written either as a legacy code string (`"xyz"`) or a sequence
/// of axis ids.
fn axes_list(kwargs: &FieldView<'_>) -> Result<Vec<String>, ParseError> {
    match kwargs.node("axes") {
        None => Ok(Vec::new()),
        Some(Node::String(code)) => Ok(code.chars().map(|c| c.to_string()).collect()),
        Some(_) => kwargs.optional_string_list("axes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str, diags: &mut DiagnosticSink) -> Result<Processing, ParseError> {
        let node: Node = serde_yaml::from_str(text).unwrap();
        Processing::decode(&node, "preprocessing[0]", diags)
    }

    #[test]
    fn binarize_requires_a_threshold() {
        let mut diags = DiagnosticSink::default();
        assert_eq!(
            decode("{name: binarize, kwargs: {threshold: 0.5}}", &mut diags).unwrap(),
            Processing::Binarize { threshold: 0.5 }
        );
        assert!(decode("{name: binarize}", &mut diags).is_err());
    }

    #[test]
    fn clip_defaults_to_the_infinities() {
        let mut diags = DiagnosticSink::default();
        let Processing::Clip { min, max } = decode("{name: clip}", &mut diags).unwrap() else {
            panic!();
        };
        assert_eq!(min, f64::NEG_INFINITY);
        assert_eq!(max, f64::INFINITY);
    }

    #[test]
    fn legacy_id_field_names_the_operation() {
        let mut diags = DiagnosticSink::default();
        assert_eq!(
            decode("{id: sigmoid}", &mut diags).unwrap(),
            Processing::Sigmoid
        );
    }

    #[test]
    fn scale_linear_promotes_scalar_gain() {
        let mut diags = DiagnosticSink::default();
        let Processing::ScaleLinear { gain, offset, axes } =
            decode("{name: scale_linear, kwargs: {gain: 2.0, axes: xy}}", &mut diags).unwrap()
        else {
            panic!();
        };
        assert_eq!(gain, vec![2.0]);
        assert_eq!(offset, vec![0.0]);
        assert_eq!(axes, vec!["x", "y"]);
    }

    #[test]
    fn scale_mean_variance_reads_reference_tensor_from_kwargs() {
        let mut diags = DiagnosticSink::default();
        let step = decode(
            "{name: scale_mean_variance, kwargs: {reference_tensor: input0}}",
            &mut diags,
        )
        .unwrap();
        let Processing::ScaleMeanVariance { reference_tensor, mode, eps, .. } = step else {
            panic!();
        };
        assert_eq!(reference_tensor, "input0");
        assert_eq!(mode, ProcessingMode::PerSample);
        assert_eq!(eps, 1e-6);
        // The enclosing-object layout is not accepted for this operation.
        assert!(decode(
            "{name: scale_mean_variance, reference_tensor: input0}",
            &mut diags
        )
        .is_err());
    }

    #[test]
    fn scale_range_reads_reference_tensor_from_the_step_object() {
        let mut diags = DiagnosticSink::default();
        let step = decode(
            "{name: scale_range, reference_tensor: input1, kwargs: {min_percentile: 1.0, max_percentile: 99.8, mode: per_dataset}}",
            &mut diags,
        )
        .unwrap();
        let Processing::ScaleRange {
            reference_tensor,
            min_percentile,
            max_percentile,
            mode,
            ..
        } = step
        else {
            panic!();
        };
        assert_eq!(reference_tensor.as_deref(), Some("input1"));
        assert_eq!(min_percentile, 1.0);
        assert_eq!(max_percentile, 99.8);
        assert_eq!(mode, ProcessingMode::PerDataset);
    }

    #[test]
    fn scale_range_defaults_percentiles_to_full_range() {
        let mut diags = DiagnosticSink::default();
        let Processing::ScaleRange { reference_tensor, min_percentile, max_percentile, .. } =
            decode("{name: scale_range}", &mut diags).unwrap()
        else {
            panic!();
        };
        assert_eq!(reference_tensor, None);
        assert_eq!(min_percentile, 0.0);
        assert_eq!(max_percentile, 100.0);
    }

    #[test]
    fn unknown_operation_keeps_raw_kwargs_and_records_a_diagnostic() {
        let mut diags = DiagnosticSink::default();
        let step = decode(
            "{name: fancy_new_op, kwargs: {alpha: 3, beta: [1, 2]}}",
            &mut diags,
        )
        .unwrap();
        let Processing::Unknown { name, kwargs } = step else {
            panic!();
        };
        assert_eq!(name, "fancy_new_op");
        assert_eq!(kwargs.get("alpha").and_then(Node::as_u64), Some(3));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn bad_mode_token_is_fatal() {
        let mut diags = DiagnosticSink::default();
        assert!(decode(
            "{name: zero_mean_unit_variance, kwargs: {mode: per_epoch}}",
            &mut diags
        )
        .is_err());
    }
}
