//! Input and output tensor descriptors and the cross-tensor validation pass.

use crate::diagnostics::DiagnosticSink;
use crate::node::{FieldView, Node, ParseError};
use crate::rdf::file_reference::FileReference;
use crate::rdf::model::axis::Axis;
use crate::rdf::model::axis_size::{ResolutionScope, SizeError};
use crate::rdf::model::data_descr::{DataDescr, DataType};
use crate::rdf::model::processing::Processing;
use crate::rdf::model::shape::TensorShape;

/// Fields shared by input and output tensors.
///
/// Identity is the `id` (0.5) or the legacy `name` (0.4); at least one is
/// required. All cross-tensor lookups use [`TensorDescr::key`].
#[derive(Debug, Clone, PartialEq)]
pub struct TensorDescr {
    id: Option<String>,
    name: Option<String>,
    axes: Vec<Axis>,
    doc_shape: Option<TensorShape>,
    data_type: Option<DataType>,
    data_range: Option<(f64, f64)>,
    data: Option<DataDescr>,
    test_tensor: Option<FileReference>,
    sample_tensor: Option<FileReference>,
}

impl TensorDescr {
    fn decode(view: &FieldView<'_>, diags: &mut DiagnosticSink) -> Result<Self, ParseError> {
        let id = view.optional_str("id")?;
        let name = view.optional_str("name")?;
        if id.is_none() && name.is_none() {
            return Err(view.missing("id"));
        }
        Ok(Self {
            id,
            name,
            axes: Axis::decode_list(view.require_node("axes")?, &view.path("axes"), diags)?,
            doc_shape: view
                .node("shape")
                .map(|n| TensorShape::decode(n, &view.path("shape")))
                .transpose()?,
            data_type: view.optional_str("data_type")?.map(|t| t.parse()).transpose()?,
            data_range: view.optional_float_pair("data_range", diags)?,
            data: view
                .node("data")
                .map(|n| DataDescr::decode(n, &view.path("data"), diags))
                .transpose()?,
            test_tensor: view
                .node("test_tensor")
                .map(|n| FileReference::decode(n, &view.path("test_tensor")))
                .transpose()?,
            sample_tensor: view
                .node("sample_tensor")
                .map(|n| FileReference::decode(n, &view.path("sample_tensor")))
                .transpose()?,
        })
    }

    /// Stable machine key: the id, or the legacy name where no id exists.
    pub fn key(&self) -> &str {
        match (&self.id, &self.name) {
            (Some(id), _) => id,
            (None, Some(name)) => name,
            (None, None) => "",
        }
    }

    /// Human-readable name, falling back to the id.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.key())
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn data_range(&self) -> Option<(f64, f64)> {
        self.data_range
    }

    pub fn data(&self) -> Option<&DataDescr> {
        self.data.as_ref()
    }

    pub fn test_tensor(&self) -> Option<&FileReference> {
        self.test_tensor.as_ref()
    }

    pub fn sample_tensor(&self) -> Option<&FileReference> {
        self.sample_tensor.as_ref()
    }

    pub fn has_explicit_shape(&self) -> bool {
        self.doc_shape.is_some()
    }

    /// The tensor's shape: the document's explicit shape if it had one,
    /// otherwise synthesized by projecting the size of every axis in
    /// document order. The projection requires all sizes resolved, so on an
    /// unvalidated tensor (or one with legacy axes and no explicit shape)
    /// this fails rather than guessing.
    pub fn shape(&self) -> Result<TensorShape, SizeError> {
        if let Some(shape) = &self.doc_shape {
            return Ok(shape.clone());
        }
        let sizes = self
            .axes
            .iter()
            .map(Axis::size)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TensorShape::FromAxes(sizes))
    }

    /// Resolves every cross-tensor reference this tensor carries: first the
    /// explicit shape's, then each axis's, in document order. After this
    /// returns `Ok`, every accessor on the tensor is safe to call.
    pub(crate) fn validate(&mut self, scope: &ResolutionScope) -> Result<(), ParseError> {
        let at = format!("tensor '{}'", self.key());
        if let Some(shape) = &mut self.doc_shape {
            shape.resolve(scope, &format!("{at}.shape"))?;
        }
        for (i, axis) in self.axes.iter_mut().enumerate() {
            axis.resolve(scope, &format!("{at}.axes[{i}]"))?;
        }
        Ok(())
    }

    /// Publishes this tensor's axes into the scope later siblings resolve
    /// against. Legacy axes have no id and cannot be referenced.
    pub(crate) fn register(&self, scope: &mut ResolutionScope) {
        scope.register_tensor(self.key());
        for axis in &self.axes {
            if axis.id().is_empty() {
                continue;
            }
            if let Ok(size) = axis.size() {
                scope.register_axis(self.key(), axis.id(), size, axis.scale());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Deref)]
pub struct InputTensor {
    #[deref]
    descr: TensorDescr,
    preprocessing: Vec<Processing>,
}

impl InputTensor {
    pub(crate) fn decode(
        node: &Node,
        context: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Self, ParseError> {
        let view = FieldView::over(node, context)?;
        let descr = TensorDescr::decode(&view, diags)?;
        let preprocessing = match view.node("preprocessing") {
            Some(steps) => Processing::decode_list(steps, &view.path("preprocessing"), diags)?,
            None => Vec::new(),
        };
        Ok(Self {
            descr,
            preprocessing,
        })
    }

    pub fn preprocessing(&self) -> &[Processing] {
        &self.preprocessing
    }

    pub(crate) fn validate(&mut self, scope: &ResolutionScope) -> Result<(), ParseError> {
        self.descr.validate(scope)
    }

    pub(crate) fn register(&self, scope: &mut ResolutionScope) {
        self.descr.register(scope)
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Deref)]
pub struct OutputTensor {
    #[deref]
    descr: TensorDescr,
    postprocessing: Vec<Processing>,
    legacy_halo: Option<Vec<u64>>,
}

impl OutputTensor {
    pub(crate) fn decode(
        node: &Node,
        context: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Self, ParseError> {
        let view = FieldView::over(node, context)?;
        let descr = TensorDescr::decode(&view, diags)?;
        let postprocessing = match view.node("postprocessing") {
            Some(steps) => Processing::decode_list(steps, &view.path("postprocessing"), diags)?,
            None => Vec::new(),
        };
        Ok(Self {
            descr,
            postprocessing,
            legacy_halo: view.optional_u64_list("halo")?,
        })
    }

    pub fn postprocessing(&self) -> &[Processing] {
        &self.postprocessing
    }

    /// Border to crop per dimension: the legacy tensor-level array where the
    /// document gave one, otherwise the per-axis halos projected in axis
    /// order (axis kinds without a halo contribute 0).
    pub fn halo(&self) -> Vec<u64> {
        match &self.legacy_halo {
            Some(halo) => halo.clone(),
            None => self.descr.axes().iter().map(Axis::halo).collect(),
        }
    }

    pub(crate) fn validate(&mut self, scope: &ResolutionScope) -> Result<(), ParseError> {
        self.descr.validate(scope)
    }

    pub(crate) fn register(&self, scope: &mut ResolutionScope) {
        self.descr.register(scope)
    }
}
