//! Whole-tensor shape descriptors (the legacy, pre-axis representation).

use crate::node::{node_kind, FieldView, Node, ParseError};
use crate::rdf::model::axis_size::{round_to_step, ResolutionScope, ResolvedSize};

/// The extent of an entire tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorShape {
    /// A literal integer array.
    Explicit(Vec<u64>),
    /// Per-dimension `min + n * step` grids (legacy parameterized inputs).
    Parameterized(ParameterizedShape),
    /// Computed from a reference tensor's shape with per-dimension scale and
    /// offset (legacy implicit outputs).
    Implicit(ImplicitShape),
    /// Synthesized by projecting an axis list's sizes in document order.
    FromAxes(Vec<ResolvedSize>),
}

impl TensorShape {
    /// Decodes a raw shape node. Like sizes, dispatch probes key presence in
    /// a fixed order; unlike sizes there is no catch-all — an unrecognized
    /// mapping shape is fatal.
    pub(crate) fn decode(node: &Node, context: &str) -> Result<Self, ParseError> {
        if let Some(items) = node.as_sequence() {
            let dims = items
                .iter()
                .map(|item| {
                    item.as_u64().ok_or_else(|| ParseError::TypeMismatch {
                        at: context.to_owned(),
                        expected: "sequence of non-negative integers",
                        found: node_kind(item),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::Explicit(dims));
        }
        if node.as_mapping().is_none() {
            return Err(ParseError::TypeMismatch {
                at: context.to_owned(),
                expected: "sequence or mapping",
                found: node_kind(node),
            });
        }
        let view = FieldView::over(node, context)?;
        if view.has("min") && view.has("step") {
            let min = view
                .optional_u64_list("min")?
                .ok_or_else(|| view.missing("min"))?;
            let step = view
                .optional_u64_list("step")?
                .ok_or_else(|| view.missing("step"))?;
            if min.len() != step.len() {
                return Err(ParseError::InvalidShape {
                    at: context.to_owned(),
                    reason: format!(
                        "min has {} entries but step has {}",
                        min.len(),
                        step.len()
                    ),
                });
            }
            return Ok(Self::Parameterized(ParameterizedShape { min, step }));
        }
        if view.has("offset") && view.has("scale") {
            let scale = scale_list(&view)?;
            let offset = offset_list(&view)?;
            if scale.len() != offset.len() {
                return Err(ParseError::InvalidShape {
                    at: context.to_owned(),
                    reason: format!(
                        "scale has {} entries but offset has {}",
                        scale.len(),
                        offset.len()
                    ),
                });
            }
            return Ok(Self::Implicit(ImplicitShape {
                reference_tensor: view.require_str("reference_tensor")?,
                scale,
                offset,
                resolved: false,
            }));
        }
        Err(ParseError::InvalidShape {
            at: context.to_owned(),
            reason: "mapping is neither min/step parameterized nor scale/offset implicit".to_owned(),
        })
    }

    /// Concrete dimensions, where this shape has any: the literal array, the
    /// per-dimension minima of a parameterized shape, or fully-exact
    /// projected axis sizes. Implicit shapes and data-dependent axes have no
    /// concrete dimensions of their own.
    pub fn dims(&self) -> Option<Vec<u64>> {
        match self {
            Self::Explicit(dims) => Some(dims.clone()),
            Self::Parameterized(p) => Some(p.min.clone()),
            Self::Implicit(_) => None,
            Self::FromAxes(sizes) => sizes.iter().map(|s| s.exact()).collect(),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Self::Explicit(dims) => dims.len(),
            Self::Parameterized(p) => p.min.len(),
            Self::Implicit(i) => i.scale.len(),
            Self::FromAxes(sizes) => sizes.len(),
        }
    }

    pub(crate) fn resolve(&mut self, scope: &ResolutionScope, at: &str) -> Result<(), ParseError> {
        if let Self::Implicit(implicit) = self {
            implicit.resolve(scope, at)?;
        }
        Ok(())
    }
}

fn scale_list(view: &FieldView<'_>) -> Result<Vec<f64>, ParseError> {
    view.require_sequence("scale")?
        .iter()
        .map(|item| {
            item.as_f64()
                .ok_or_else(|| view.mismatch("scale", "sequence of numbers", item))
        })
        .collect()
}

fn offset_list(view: &FieldView<'_>) -> Result<Vec<i64>, ParseError> {
    view.require_sequence("offset")?
        .iter()
        .map(|item| {
            item.as_i64()
                .ok_or_else(|| view.mismatch("offset", "sequence of integers", item))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedShape {
    min: Vec<u64>,
    step: Vec<u64>,
}

impl ParameterizedShape {
    pub fn min(&self) -> &[u64] {
        &self.min
    }

    pub fn step(&self) -> &[u64] {
        &self.step
    }

    /// Rounds a requested shape to the nearest compatible one, dimension by
    /// dimension.
    pub fn target_shape(&self, target: &[i64]) -> Vec<u64> {
        self.min
            .iter()
            .zip(&self.step)
            .zip(target)
            .map(|((&min, &step), &t)| round_to_step(t, min, step))
            .collect()
    }
}

/// An output shape defined relative to another tensor's shape.
///
/// Unresolved until the validation pass confirms the reference tensor
/// exists among the siblings validated so far.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitShape {
    reference_tensor: String,
    scale: Vec<f64>,
    offset: Vec<i64>,
    resolved: bool,
}

impl ImplicitShape {
    pub fn reference_tensor(&self) -> &str {
        &self.reference_tensor
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn offset(&self) -> &[i64] {
        &self.offset
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// `round(target[i] * scale[i] + offset[i] * 2)` per dimension. The
    /// doubled offset is the modeled formula's documented behavior (symmetric
    /// borders on both tensor sides) and is kept verbatim.
    pub fn target_shape(&self, target: &[u64]) -> Vec<u64> {
        self.scale
            .iter()
            .zip(&self.offset)
            .zip(target)
            .map(|((&scale, &offset), &t)| {
                let value = (t as f64 * scale + (offset * 2) as f64).round();
                if value < 0.0 {
                    0
                } else {
                    value as u64
                }
            })
            .collect()
    }

    fn resolve(&mut self, scope: &ResolutionScope, at: &str) -> Result<(), ParseError> {
        if !scope.has_tensor(&self.reference_tensor) {
            return Err(ParseError::UnresolvableTensor {
                at: at.to_owned(),
                tensor_id: self.reference_tensor.clone(),
            });
        }
        self.resolved = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Result<TensorShape, ParseError> {
        let node: Node = serde_yaml::from_str(text).unwrap();
        TensorShape::decode(&node, "shape")
    }

    #[test]
    fn integer_array_is_an_explicit_shape() {
        assert_eq!(
            decode("[1, 1, 64, 64]").unwrap(),
            TensorShape::Explicit(vec![1, 1, 64, 64])
        );
    }

    #[test]
    fn min_step_mapping_is_parameterized() {
        let shape = decode("{min: [1, 1, 32, 32], step: [0, 0, 16, 16]}").unwrap();
        match shape {
            TensorShape::Parameterized(p) => {
                assert_eq!(p.min(), &[1, 1, 32, 32]);
                assert_eq!(p.step(), &[0, 0, 16, 16]);
            }
            other => panic!("expected parameterized, got {other:?}"),
        }
    }

    #[test]
    fn scale_offset_mapping_is_implicit() {
        let shape =
            decode("{reference_tensor: input0, scale: [1, 1, 2, 2], offset: [0, 0, 8, 8]}")
                .unwrap();
        match shape {
            TensorShape::Implicit(i) => {
                assert_eq!(i.reference_tensor(), "input0");
                assert!(!i.is_resolved());
            }
            other => panic!("expected implicit, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_mapping_is_fatal_not_a_fallback() {
        assert!(matches!(
            decode("{foo: 1}"),
            Err(ParseError::InvalidShape { .. })
        ));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(decode("{min: [1, 2], step: [0]}").is_err());
        assert!(decode("{reference_tensor: t, scale: [1, 1], offset: [0]}").is_err());
    }

    #[test]
    fn parameterized_target_rounds_per_dimension() {
        let shape = decode("{min: [1, 32], step: [0, 16]}").unwrap();
        let TensorShape::Parameterized(p) = shape else {
            panic!();
        };
        assert_eq!(p.target_shape(&[1, 70]), vec![1, 64]);
        assert_eq!(p.target_shape(&[5, -1]), vec![1, 32]);
    }

    #[test]
    fn implicit_target_doubles_the_offset() {
        // Known quirk of the modeled formula: the per-dimension offset is
        // applied twice (once per tensor side). Pinned here pending upstream
        // clarification.
        let shape = decode("{reference_tensor: t, scale: [1.0], offset: [4]}").unwrap();
        let TensorShape::Implicit(i) = shape else {
            panic!();
        };
        assert_eq!(i.target_shape(&[64]), vec![72]);
    }

    #[test]
    fn identity_implicit_shape_is_a_no_op() {
        let shape = decode(
            "{reference_tensor: t, scale: [1.0, 1.0, 1.0, 1.0], offset: [0, 0, 0, 0]}",
        )
        .unwrap();
        let TensorShape::Implicit(i) = shape else {
            panic!();
        };
        assert_eq!(i.target_shape(&[1, 1, 64, 64]), vec![1, 1, 64, 64]);
    }

    #[test]
    fn resolving_an_implicit_shape_requires_the_reference_tensor() {
        let mut shape = decode("{reference_tensor: t, scale: [1.0], offset: [0]}").unwrap();
        let scope = ResolutionScope::default();
        assert!(matches!(
            shape.resolve(&scope, "outputs[0].shape"),
            Err(ParseError::UnresolvableTensor { .. })
        ));
    }
}
