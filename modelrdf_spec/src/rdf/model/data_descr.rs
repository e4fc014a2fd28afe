//! Tensor element-data descriptions.

use crate::diagnostics::DiagnosticSink;
use crate::node::{FieldView, Node, ParseError};

#[derive(thiserror::Error, Debug)]
#[error("'{token}' is not a tensor data type")]
pub struct DataTypeParsingError {
    token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum DataType {
    #[display("float32")]
    Float32,
    #[display("float64")]
    Float64,
    #[display("uint8")]
    Uint8,
    #[display("int8")]
    Int8,
    #[display("uint16")]
    Uint16,
    #[display("int16")]
    Int16,
    #[display("uint32")]
    Uint32,
    #[display("int32")]
    Int32,
    #[display("uint64")]
    Uint64,
    #[display("int64")]
    Int64,
    #[display("bool")]
    Bool,
}

impl std::str::FromStr for DataType {
    type Err = DataTypeParsingError;
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Ok(match token {
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "uint8" => Self::Uint8,
            "int8" => Self::Int8,
            "uint16" => Self::Uint16,
            "int16" => Self::Int16,
            "uint32" => Self::Uint32,
            "int32" => Self::Int32,
            "uint64" => Self::Uint64,
            "int64" => Self::Int64,
            "bool" => Self::Bool,
            _ => {
                return Err(DataTypeParsingError {
                    token: token.to_owned(),
                })
            }
        })
    }
}

/// Numeric (interval/ratio scale) element description.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericDataDescr {
    pub data_type: Option<DataType>,
    pub range: Option<(f64, f64)>,
    pub unit: Option<String>,
    pub scale: f64,
    pub offset: f64,
}

/// What the values of a tensor mean, on the classic measurement scales.
/// Nominal and ordinal data enumerate their values; interval and ratio data
/// are numeric with optional unit/range.
#[derive(Debug, Clone, PartialEq)]
pub enum DataDescr {
    Nominal {
        values: Vec<Node>,
        data_type: Option<DataType>,
    },
    Ordinal {
        values: Vec<Node>,
        data_type: Option<DataType>,
    },
    Interval(NumericDataDescr),
    Ratio(NumericDataDescr),
}

impl DataDescr {
    pub(crate) fn decode(
        node: &Node,
        context: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Self, ParseError> {
        let view = FieldView::over(node, context)?;
        let data_type = view
            .optional_str("type")?
            .or(view.optional_str("data_type")?);
        // `values` distinguishes the enumerated kinds even without a tag.
        let kind = view
            .optional_str("kind")?
            .unwrap_or_else(|| if view.has("values") { "nominal" } else { "ratio" }.to_owned());
        let data_type = data_type.map(|t| t.parse()).transpose()?;
        match kind.as_str() {
            "nominal" | "ordinal" => {
                let values = view.require_sequence("values")?.to_vec();
                if kind == "nominal" {
                    Ok(Self::Nominal { values, data_type })
                } else {
                    Ok(Self::Ordinal { values, data_type })
                }
            }
            _ => {
                let numeric = NumericDataDescr {
                    data_type,
                    range: view.optional_float_pair("range", diags)?,
                    unit: view.optional_str("unit")?,
                    scale: view.optional_f64_or("scale", 1.0)?,
                    offset: view.optional_f64_or("offset", 0.0)?,
                };
                if kind == "interval" {
                    Ok(Self::Interval(numeric))
                } else {
                    Ok(Self::Ratio(numeric))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> DataDescr {
        let node: Node = serde_yaml::from_str(text).unwrap();
        let mut diags = DiagnosticSink::default();
        DataDescr::decode(&node, "data", &mut diags).unwrap()
    }

    #[test]
    fn values_without_a_kind_tag_mean_nominal_data() {
        let descr = decode("{values: [fg, bg], type: uint8}");
        assert!(matches!(
            descr,
            DataDescr::Nominal { ref values, data_type: Some(DataType::Uint8) } if values.len() == 2
        ));
    }

    #[test]
    fn numeric_data_defaults_to_ratio_scale() {
        let descr = decode("{type: float32, range: [0.0, 1.0], unit: arbitrary intensity}");
        let DataDescr::Ratio(numeric) = descr else { panic!() };
        assert_eq!(numeric.range, Some((0.0, 1.0)));
        assert_eq!(numeric.scale, 1.0);
        assert_eq!(numeric.offset, 0.0);
    }

    #[test]
    fn interval_kind_is_kept_distinct_from_ratio() {
        let descr = decode("{kind: interval, type: int16, offset: -273.15}");
        assert!(matches!(descr, DataDescr::Interval(_)));
    }

    #[test]
    fn unknown_data_type_token_is_fatal() {
        let node: Node = serde_yaml::from_str("{type: float128}").unwrap();
        let mut diags = DiagnosticSink::default();
        assert!(DataDescr::decode(&node, "data", &mut diags).is_err());
    }
}
