//! Axis size descriptors and the deferred-resolution protocol for sizes that
//! reference another tensor's axis.

use std::collections::{BTreeMap, BTreeSet};

use crate::node::{node_kind, FieldView, Node, ParseError};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeError {
    #[error("size referencing axis '{axis_id}' of tensor '{tensor_id}' was read before resolution")]
    Unresolved { tensor_id: String, axis_id: String },
    #[error("legacy character axes carry no per-axis size; consult the tensor-level shape")]
    LegacyAxis,
}

/// A concrete size once resolution has run. Data-dependent sizes stay
/// explicitly unknown rather than defaulting to anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedSize {
    Exact(u64),
    DataDependent,
}

impl ResolvedSize {
    pub fn exact(self) -> Option<u64> {
        match self {
            Self::Exact(n) => Some(n),
            Self::DataDependent => None,
        }
    }
}

/// The extent of one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisSize {
    Fixed(u64),
    /// Any `min + n * step` for non-negative integer `n`.
    Parameterized { min: u64, step: u64 },
    /// Determined only by the data fed to the model.
    DataDependent { min: u64, max: Option<u64> },
    /// Defined in terms of another tensor's axis; unresolved until the
    /// cross-tensor validation pass runs.
    Reference(SizeReference),
}

impl AxisSize {
    /// Decodes a raw size node. The checks are ordered key-presence probes,
    /// not a discriminant tag, and the order is load-bearing: a mapping with
    /// `axis_id`/`tensor_id` must not fall through to the data-dependent
    /// catch-all.
    pub(crate) fn decode(node: &Node, context: &str) -> Result<Self, ParseError> {
        if let Some(n) = node.as_u64() {
            return Ok(Self::Fixed(n));
        }
        if node.as_mapping().is_none() {
            return Err(ParseError::TypeMismatch {
                at: context.to_owned(),
                expected: "integer or mapping",
                found: node_kind(node),
            });
        }
        let view = FieldView::over(node, context)?;
        if view.has("min") && view.has("step") {
            return Ok(Self::Parameterized {
                min: view.require_u64("min")?,
                step: view.require_u64("step")?,
            });
        }
        if view.has("axis_id") && view.has("tensor_id") {
            return Ok(Self::Reference(SizeReference {
                tensor_id: view.require_str("tensor_id")?,
                axis_id: view.require_str("axis_id")?,
                offset: view.optional_i64_or("offset", 0)?,
                scale: view.optional_f64_or("scale", 1.0)?,
                resolved: None,
            }));
        }
        Ok(Self::DataDependent {
            min: view.optional_u64_or("min", 1)?,
            max: view.optional_u64("max")?,
        })
    }

    /// The resolved size. Referenced sizes fail here until [`resolve`] has
    /// bound them; data-dependent sizes report the explicit unknown sentinel.
    ///
    /// [`resolve`]: AxisSize::resolve
    pub fn size(&self) -> Result<ResolvedSize, SizeError> {
        match self {
            Self::Fixed(n) => Ok(ResolvedSize::Exact(*n)),
            Self::Parameterized { min, .. } => Ok(ResolvedSize::Exact(*min)),
            Self::DataDependent { .. } => Ok(ResolvedSize::DataDependent),
            Self::Reference(r) => r.size(),
        }
    }

    /// Rounds `target` to a size this descriptor can take. Only the
    /// parameterized variant actually consults `target`; the others answer
    /// with the one size they have.
    pub fn target_size(&self, target: i64) -> Result<u64, SizeError> {
        match self {
            Self::Fixed(n) => Ok(*n),
            Self::Parameterized { min, step } => Ok(round_to_step(target, *min, *step)),
            Self::DataDependent { min, .. } => Ok(*min),
            Self::Reference(r) => match r.size()? {
                ResolvedSize::Exact(n) => Ok(n),
                ResolvedSize::DataDependent => Ok(0),
            },
        }
    }

    /// Binds a referenced size against the already-validated sibling
    /// tensors. Non-reference variants need no cross-reference and validate
    /// trivially. Resolving an already-resolved reference again with a valid
    /// scope rebinds it to the same value.
    pub(crate) fn resolve(
        &mut self,
        own_scale: f64,
        scope: &ResolutionScope,
        at: &str,
    ) -> Result<(), ParseError> {
        if let Self::Reference(r) = self {
            r.resolve(own_scale, scope, at)?;
        }
        Ok(())
    }
}

/// Nearest `min + k * step` to `target`; degenerate steps and negative
/// targets clamp to `min`.
pub(crate) fn round_to_step(target: i64, min: u64, step: u64) -> u64 {
    if target < 0 || step == 0 {
        return min;
    }
    let k = ((target as f64 - min as f64) / step as f64).round().max(0.0) as u64;
    min + k * step
}

/// A size defined as `ref_axis.size * ref_axis.scale / own_scale + offset`.
///
/// Constructed unresolved, holding only the lookup keys; `resolve` performs
/// the sibling lookup and binds the concrete value. Reading the size before
/// that is an error, never a default.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeReference {
    pub tensor_id: String,
    pub axis_id: String,
    pub offset: i64,
    pub scale: f64,
    resolved: Option<ResolvedSize>,
}

impl SizeReference {
    pub fn size(&self) -> Result<ResolvedSize, SizeError> {
        self.resolved.ok_or_else(|| SizeError::Unresolved {
            tensor_id: self.tensor_id.clone(),
            axis_id: self.axis_id.clone(),
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    fn resolve(
        &mut self,
        own_scale: f64,
        scope: &ResolutionScope,
        at: &str,
    ) -> Result<(), ParseError> {
        let handle = match scope.axis(&self.tensor_id, &self.axis_id) {
            Some(handle) => handle,
            None if !scope.has_tensor(&self.tensor_id) => {
                return Err(ParseError::UnresolvableTensor {
                    at: at.to_owned(),
                    tensor_id: self.tensor_id.clone(),
                })
            }
            None => {
                return Err(ParseError::UnresolvableAxis {
                    at: at.to_owned(),
                    tensor_id: self.tensor_id.clone(),
                    axis_id: self.axis_id.clone(),
                })
            }
        };
        self.resolved = Some(match handle.size {
            ResolvedSize::Exact(n) => {
                let scaled = (n as f64 * handle.scale / own_scale).round() as i64 + self.offset;
                ResolvedSize::Exact(scaled.max(0) as u64)
            }
            ResolvedSize::DataDependent => ResolvedSize::DataDependent,
        });
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn unresolved(tensor_id: &str, axis_id: &str, offset: i64, scale: f64) -> Self {
        Self {
            tensor_id: tensor_id.to_owned(),
            axis_id: axis_id.to_owned(),
            offset,
            scale,
            resolved: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AxisHandle {
    pub size: ResolvedSize,
    pub scale: f64,
}

/// Accumulates the tensors (and their axes) validated so far, in validation
/// order, so later tensors can resolve references against earlier ones.
#[derive(Debug, Default)]
pub struct ResolutionScope {
    tensors: BTreeSet<String>,
    axes: BTreeMap<(String, String), AxisHandle>,
}

impl ResolutionScope {
    pub(crate) fn register_tensor(&mut self, tensor_id: &str) {
        self.tensors.insert(tensor_id.to_owned());
    }

    pub(crate) fn register_axis(
        &mut self,
        tensor_id: &str,
        axis_id: &str,
        size: ResolvedSize,
        scale: f64,
    ) {
        self.axes.insert(
            (tensor_id.to_owned(), axis_id.to_owned()),
            AxisHandle { size, scale },
        );
    }

    pub(crate) fn has_tensor(&self, tensor_id: &str) -> bool {
        self.tensors.contains(tensor_id)
    }

    pub(crate) fn axis(&self, tensor_id: &str, axis_id: &str) -> Option<AxisHandle> {
        self.axes
            .get(&(tensor_id.to_owned(), axis_id.to_owned()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> AxisSize {
        let node: Node = serde_yaml::from_str(text).unwrap();
        AxisSize::decode(&node, "size").unwrap()
    }

    #[test]
    fn scalar_integer_is_fixed() {
        assert_eq!(decode("64"), AxisSize::Fixed(64));
    }

    #[test]
    fn min_and_step_dispatch_to_parameterized() {
        assert_eq!(
            decode("{min: 32, step: 16}"),
            AxisSize::Parameterized { min: 32, step: 16 }
        );
    }

    #[test]
    fn axis_and_tensor_ids_dispatch_to_reference() {
        let size = decode("{axis_id: x, tensor_id: input0, offset: -4}");
        match size {
            AxisSize::Reference(r) => {
                assert_eq!(r.tensor_id, "input0");
                assert_eq!(r.axis_id, "x");
                assert_eq!(r.offset, -4);
                assert_eq!(r.scale, 1.0);
                assert!(!r.is_resolved());
            }
            other => panic!("expected reference, got {other:?}"),
        }
    }

    #[test]
    fn min_step_probe_runs_before_the_reference_probe() {
        // Overlapping key sets must keep the documented check order.
        let size = decode("{min: 8, step: 4, axis_id: x, tensor_id: input0}");
        assert_eq!(size, AxisSize::Parameterized { min: 8, step: 4 });
    }

    #[test]
    fn any_other_mapping_falls_back_to_data_dependent() {
        assert_eq!(
            decode("{max: 512}"),
            AxisSize::DataDependent { min: 1, max: Some(512) }
        );
        assert_eq!(
            decode("{}"),
            AxisSize::DataDependent { min: 1, max: None }
        );
    }

    #[test]
    fn non_integer_scalar_is_a_type_mismatch() {
        let node: Node = serde_yaml::from_str("wide").unwrap();
        assert!(AxisSize::decode(&node, "size").is_err());
    }

    #[test]
    fn parameterized_target_rounds_to_the_grid() {
        let size = AxisSize::Parameterized { min: 16, step: 8 };
        assert_eq!(size.target_size(16).unwrap(), 16);
        assert_eq!(size.target_size(29).unwrap(), 32);
        assert_eq!(size.target_size(27).unwrap(), 24);
        // Nearest grid value stays congruent to min modulo step.
        for target in 16..200 {
            let got = size.target_size(target).unwrap();
            assert_eq!((got - 16) % 8, 0);
            let diff = (got as i64 - target).abs();
            assert!(diff <= 4, "target {target} rounded to {got}");
        }
    }

    #[test]
    fn parameterized_target_clamps_degenerate_cases_to_min() {
        assert_eq!(
            AxisSize::Parameterized { min: 16, step: 8 }.target_size(-3).unwrap(),
            16
        );
        assert_eq!(
            AxisSize::Parameterized { min: 16, step: 0 }.target_size(100).unwrap(),
            16
        );
        assert_eq!(
            AxisSize::Parameterized { min: 16, step: 8 }.target_size(2).unwrap(),
            16
        );
    }

    #[test]
    fn reference_size_fails_before_resolution() {
        let r = SizeReference::unresolved("input0", "x", 0, 1.0);
        assert_eq!(
            r.size().unwrap_err(),
            SizeError::Unresolved {
                tensor_id: "input0".into(),
                axis_id: "x".into()
            }
        );
    }

    #[test]
    fn resolving_against_a_scope_missing_the_tensor_is_fatal() {
        let mut size = AxisSize::Reference(SizeReference::unresolved("input0", "x", 0, 1.0));
        let scope = ResolutionScope::default();
        let err = size.resolve(1.0, &scope, "outputs[0].axes[2]").unwrap_err();
        assert!(matches!(err, ParseError::UnresolvableTensor { .. }));
    }

    #[test]
    fn resolving_against_a_tensor_missing_the_axis_is_fatal() {
        let mut size = AxisSize::Reference(SizeReference::unresolved("input0", "q", 0, 1.0));
        let mut scope = ResolutionScope::default();
        scope.register_tensor("input0");
        scope.register_axis("input0", "x", ResolvedSize::Exact(64), 1.0);
        let err = size.resolve(1.0, &scope, "outputs[0].axes[2]").unwrap_err();
        assert!(matches!(err, ParseError::UnresolvableAxis { .. }));
    }

    #[test]
    fn resolution_applies_scale_ratio_and_offset() {
        let mut size = AxisSize::Reference(SizeReference::unresolved("input0", "x", 3, 2.0));
        let mut scope = ResolutionScope::default();
        scope.register_tensor("input0");
        scope.register_axis("input0", "x", ResolvedSize::Exact(64), 1.0);
        // 64 * 1.0 / 2.0 + 3 = 35
        size.resolve(2.0, &scope, "outputs[0].axes[0]").unwrap();
        assert_eq!(size.size().unwrap(), ResolvedSize::Exact(35));
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut size = AxisSize::Reference(SizeReference::unresolved("input0", "x", 0, 1.0));
        let mut scope = ResolutionScope::default();
        scope.register_tensor("input0");
        scope.register_axis("input0", "x", ResolvedSize::Exact(64), 1.0);
        size.resolve(1.0, &scope, "at").unwrap();
        let first = size.size().unwrap();
        size.resolve(1.0, &scope, "at").unwrap();
        assert_eq!(size.size().unwrap(), first);
    }

    #[test]
    fn reference_to_a_data_dependent_axis_stays_unknown() {
        let mut size = AxisSize::Reference(SizeReference::unresolved("input0", "x", 0, 1.0));
        let mut scope = ResolutionScope::default();
        scope.register_tensor("input0");
        scope.register_axis("input0", "x", ResolvedSize::DataDependent, 1.0);
        size.resolve(1.0, &scope, "at").unwrap();
        assert_eq!(size.size().unwrap(), ResolvedSize::DataDependent);
    }
}
