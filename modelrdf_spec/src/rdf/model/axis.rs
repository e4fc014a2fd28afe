//! Axis descriptors: the structured 0.5 variants and the legacy
//! single-character form.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::node::{node_kind, FieldView, Node, ParseError};
use crate::rdf::model::axis_size::{AxisSize, ResolutionScope, ResolvedSize, SizeError};

#[derive(thiserror::Error, Debug)]
pub enum AxisLetterParsingError {
    #[error("character cannot be a legacy axis id: {character}")]
    Invalid { character: char },
}

/// Single-letter axis-type code, also the encoding of whole legacy axes
/// lists (e.g. `"bcyx"`).
#[derive(serde::Deserialize, derive_more::Display)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub enum AxisLetter {
    #[serde(rename = "b")]
    #[display("b")]
    B,
    #[serde(rename = "i")]
    #[display("i")]
    I,
    #[serde(rename = "c")]
    #[display("c")]
    C,
    #[serde(rename = "x")]
    #[display("x")]
    X,
    #[serde(rename = "y")]
    #[display("y")]
    Y,
    #[serde(rename = "z")]
    #[display("z")]
    Z,
    #[serde(rename = "t")]
    #[display("t")]
    T,
}

impl TryFrom<char> for AxisLetter {
    type Error = AxisLetterParsingError;
    fn try_from(c: char) -> Result<Self, Self::Error> {
        Ok(match c {
            'b' => Self::B,
            'i' => Self::I,
            'c' => Self::C,
            'x' => Self::X,
            'y' => Self::Y,
            'z' => Self::Z,
            't' => Self::T,
            _ => return Err(AxisLetterParsingError::Invalid { character: c }),
        })
    }
}

#[derive(thiserror::Error, Debug)]
#[error("'{token}' is not a space unit")]
pub struct SpaceUnitParsingError {
    token: String,
}

/// Physical unit of a space axis. `NoUnit` is the explicit "dimensionless"
/// sentinel a document opts into with an empty unit token; an omitted unit
/// is `None` at the axis level instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SpaceUnit {
    #[display("attometer")]
    Attometer,
    #[display("angstrom")]
    Angstrom,
    #[display("centimeter")]
    Centimeter,
    #[display("decimeter")]
    Decimeter,
    #[display("exameter")]
    Exameter,
    #[display("femtometer")]
    Femtometer,
    #[display("foot")]
    Foot,
    #[display("gigameter")]
    Gigameter,
    #[display("hectometer")]
    Hectometer,
    #[display("inch")]
    Inch,
    #[display("kilometer")]
    Kilometer,
    #[display("megameter")]
    Megameter,
    #[display("meter")]
    Meter,
    #[display("micrometer")]
    Micrometer,
    #[display("mile")]
    Mile,
    #[display("millimeter")]
    Millimeter,
    #[display("nanometer")]
    Nanometer,
    #[display("parsec")]
    Parsec,
    #[display("petameter")]
    Petameter,
    #[display("picometer")]
    Picometer,
    #[display("terameter")]
    Terameter,
    #[display("yard")]
    Yard,
    #[display("yoctometer")]
    Yoctometer,
    #[display("yottameter")]
    Yottameter,
    #[display("zeptometer")]
    Zeptometer,
    #[display("zettameter")]
    Zettameter,
    #[display("")]
    NoUnit,
}

impl std::str::FromStr for SpaceUnit {
    type Err = SpaceUnitParsingError;
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Ok(match token {
            "attometer" => Self::Attometer,
            "angstrom" => Self::Angstrom,
            "centimeter" => Self::Centimeter,
            "decimeter" => Self::Decimeter,
            "exameter" => Self::Exameter,
            "femtometer" => Self::Femtometer,
            "foot" => Self::Foot,
            "gigameter" => Self::Gigameter,
            "hectometer" => Self::Hectometer,
            "inch" => Self::Inch,
            "kilometer" => Self::Kilometer,
            "megameter" => Self::Megameter,
            "meter" => Self::Meter,
            "micrometer" => Self::Micrometer,
            "mile" => Self::Mile,
            "millimeter" => Self::Millimeter,
            "nanometer" => Self::Nanometer,
            "parsec" => Self::Parsec,
            "petameter" => Self::Petameter,
            "picometer" => Self::Picometer,
            "terameter" => Self::Terameter,
            "yard" => Self::Yard,
            "yoctometer" => Self::Yoctometer,
            "yottameter" => Self::Yottameter,
            "zeptometer" => Self::Zeptometer,
            "zettameter" => Self::Zettameter,
            "" => Self::NoUnit,
            _ => {
                return Err(SpaceUnitParsingError {
                    token: token.to_owned(),
                })
            }
        })
    }
}

#[derive(thiserror::Error, Debug)]
#[error("'{token}' is not a time unit")]
pub struct TimeUnitParsingError {
    token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TimeUnit {
    #[display("attosecond")]
    Attosecond,
    #[display("centisecond")]
    Centisecond,
    #[display("day")]
    Day,
    #[display("decisecond")]
    Decisecond,
    #[display("exasecond")]
    Exasecond,
    #[display("femtosecond")]
    Femtosecond,
    #[display("hectosecond")]
    Hectosecond,
    #[display("hour")]
    Hour,
    #[display("kilosecond")]
    Kilosecond,
    #[display("megasecond")]
    Megasecond,
    #[display("microsecond")]
    Microsecond,
    #[display("millisecond")]
    Millisecond,
    #[display("minute")]
    Minute,
    #[display("nanosecond")]
    Nanosecond,
    #[display("petasecond")]
    Petasecond,
    #[display("picosecond")]
    Picosecond,
    #[display("second")]
    Second,
    #[display("terasecond")]
    Terasecond,
    #[display("yoctosecond")]
    Yoctosecond,
    #[display("yottasecond")]
    Yottasecond,
    #[display("zeptosecond")]
    Zeptosecond,
    #[display("zettasecond")]
    Zettasecond,
    #[display("")]
    NoUnit,
}

impl std::str::FromStr for TimeUnit {
    type Err = TimeUnitParsingError;
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Ok(match token {
            "attosecond" => Self::Attosecond,
            "centisecond" => Self::Centisecond,
            "day" => Self::Day,
            "decisecond" => Self::Decisecond,
            "exasecond" => Self::Exasecond,
            "femtosecond" => Self::Femtosecond,
            "hectosecond" => Self::Hectosecond,
            "hour" => Self::Hour,
            "kilosecond" => Self::Kilosecond,
            "megasecond" => Self::Megasecond,
            "microsecond" => Self::Microsecond,
            "millisecond" => Self::Millisecond,
            "minute" => Self::Minute,
            "nanosecond" => Self::Nanosecond,
            "petasecond" => Self::Petasecond,
            "picosecond" => Self::Picosecond,
            "second" => Self::Second,
            "terasecond" => Self::Terasecond,
            "yoctosecond" => Self::Yoctosecond,
            "yottasecond" => Self::Yottasecond,
            "zeptosecond" => Self::Zeptosecond,
            "zettasecond" => Self::Zettasecond,
            "" => Self::NoUnit,
            _ => {
                return Err(TimeUnitParsingError {
                    token: token.to_owned(),
                })
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchAxis {
    pub id: String,
    pub size: AxisSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAxis {
    pub id: String,
    /// Channel names are required; their count fixes the axis size.
    pub channel_names: Vec<String>,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexAxis {
    pub id: String,
    pub scale: f64,
    pub size: AxisSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpaceAxis {
    pub id: String,
    pub scale: f64,
    pub unit: Option<SpaceUnit>,
    pub size: AxisSize,
    pub halo: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub id: String,
    pub scale: f64,
    pub unit: Option<TimeUnit>,
    pub size: AxisSize,
    pub halo: u64,
}

/// A legacy single-character axis. It identifies a dimension but carries no
/// size of its own; the tensor-level shape is the only size source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyAxis {
    pub letter: AxisLetter,
}

/// One named dimension of a tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum Axis {
    Batch(BatchAxis),
    Channel(ChannelAxis),
    Index(IndexAxis),
    Space(SpaceAxis),
    Time(TimeAxis),
    Legacy(LegacyAxis),
}

impl Axis {
    /// Decodes an axes list: either a legacy code string (one axis per
    /// character) or a sequence of typed mappings. Unrecognized `type`
    /// strings drop the one entry with a diagnostic instead of aborting.
    pub(crate) fn decode_list(
        node: &Node,
        context: &str,
        diags: &mut DiagnosticSink,
    ) -> Result<Vec<Axis>, ParseError> {
        if let Some(code) = node.as_str() {
            return code
                .chars()
                .map(|c| {
                    AxisLetter::try_from(c)
                        .map(|letter| Axis::Legacy(LegacyAxis { letter }))
                        .map_err(ParseError::from)
                })
                .collect();
        }
        let items = match node.as_sequence() {
            Some(items) => items,
            None => {
                return Err(ParseError::TypeMismatch {
                    at: context.to_owned(),
                    expected: "axes code string or sequence of axis mappings",
                    found: node_kind(node),
                })
            }
        };
        let mut axes = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let at = format!("{context}[{i}]");
            let view = FieldView::over(item, at.as_str())?;
            let type_name = view.require_str("type")?;
            match type_name.as_str() {
                "batch" => axes.push(Axis::Batch(BatchAxis {
                    id: view.optional_str("id")?.unwrap_or_else(|| "batch".to_owned()),
                    size: AxisSize::Fixed(view.optional_u64_or("size", 1)?),
                })),
                "channel" => {
                    let channel_names = view.require_string_list("channel_names")?;
                    if channel_names.is_empty() {
                        return Err(ParseError::TypeMismatch {
                            at: view.path("channel_names"),
                            expected: "non-empty sequence of strings",
                            found: "sequence",
                        });
                    }
                    axes.push(Axis::Channel(ChannelAxis {
                        id: view
                            .optional_str("id")?
                            .unwrap_or_else(|| "channel".to_owned()),
                        channel_names,
                        scale: view.optional_f64_or("scale", 1.0)?,
                    }));
                }
                "index" => axes.push(Axis::Index(IndexAxis {
                    id: view.optional_str("id")?.unwrap_or_else(|| "index".to_owned()),
                    scale: view.optional_f64_or("scale", 1.0)?,
                    size: AxisSize::decode(view.require_node("size")?, &view.path("size"))?,
                })),
                "space" => axes.push(Axis::Space(SpaceAxis {
                    id: view.require_str("id")?,
                    scale: view.optional_f64_or("scale", 1.0)?,
                    unit: view
                        .optional_str("unit")?
                        .map(|token| token.parse())
                        .transpose()?,
                    size: AxisSize::decode(view.require_node("size")?, &view.path("size"))?,
                    halo: view.optional_u64_or("halo", 0)?,
                })),
                "time" => axes.push(Axis::Time(TimeAxis {
                    id: view.optional_str("id")?.unwrap_or_else(|| "time".to_owned()),
                    scale: view.optional_f64_or("scale", 1.0)?,
                    unit: view
                        .optional_str("unit")?
                        .map(|token| token.parse())
                        .transpose()?,
                    size: AxisSize::decode(view.require_node("size")?, &view.path("size"))?,
                    halo: view.optional_u64_or("halo", 0)?,
                })),
                unknown => diags.push(Diagnostic::UnknownAxisType {
                    type_name: unknown.to_owned(),
                    at,
                }),
            }
        }
        Ok(axes)
    }

    /// Machine key of the axis; legacy axes have no id (empty string), only
    /// their letter.
    pub fn id(&self) -> &str {
        match self {
            Self::Batch(a) => &a.id,
            Self::Channel(a) => &a.id,
            Self::Index(a) => &a.id,
            Self::Space(a) => &a.id,
            Self::Time(a) => &a.id,
            Self::Legacy(_) => "",
        }
    }

    pub fn letter(&self) -> AxisLetter {
        match self {
            Self::Batch(_) => AxisLetter::B,
            Self::Channel(_) => AxisLetter::C,
            Self::Index(_) => AxisLetter::I,
            Self::Time(_) => AxisLetter::T,
            Self::Space(a) => match a.id.as_str() {
                "y" => AxisLetter::Y,
                "z" => AxisLetter::Z,
                _ => AxisLetter::X,
            },
            Self::Legacy(a) => a.letter,
        }
    }

    /// The axis size. Legacy axes structurally cannot answer this and fail
    /// explicitly; a reference size fails until the validation pass has
    /// bound it.
    pub fn size(&self) -> Result<ResolvedSize, SizeError> {
        match self {
            Self::Batch(a) => a.size.size(),
            Self::Channel(a) => Ok(ResolvedSize::Exact(a.channel_names.len() as u64)),
            Self::Index(a) => a.size.size(),
            Self::Space(a) => a.size.size(),
            Self::Time(a) => a.size.size(),
            Self::Legacy(_) => Err(SizeError::LegacyAxis),
        }
    }

    pub fn scale(&self) -> f64 {
        match self {
            Self::Batch(_) | Self::Legacy(_) => 1.0,
            Self::Channel(a) => a.scale,
            Self::Index(a) => a.scale,
            Self::Space(a) => a.scale,
            Self::Time(a) => a.scale,
        }
    }

    pub fn halo(&self) -> u64 {
        match self {
            Self::Space(a) => a.halo,
            Self::Time(a) => a.halo,
            _ => 0,
        }
    }

    pub(crate) fn resolve(&mut self, scope: &ResolutionScope, at: &str) -> Result<(), ParseError> {
        let scale = self.scale();
        match self {
            Self::Index(a) => a.size.resolve(scale, scope, at),
            Self::Space(a) => a.size.resolve(scale, scope, at),
            Self::Time(a) => a.size.resolve(scale, scope, at),
            Self::Batch(_) | Self::Channel(_) | Self::Legacy(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str, diags: &mut DiagnosticSink) -> Vec<Axis> {
        let node: Node = serde_yaml::from_str(text).unwrap();
        Axis::decode_list(&node, "axes", diags).unwrap()
    }

    #[test]
    fn legacy_code_string_expands_one_axis_per_character() {
        let mut diags = DiagnosticSink::default();
        let axes = decode("bcyx", &mut diags);
        let letters: Vec<_> = axes.iter().map(Axis::letter).collect();
        assert_eq!(
            letters,
            vec![AxisLetter::B, AxisLetter::C, AxisLetter::Y, AxisLetter::X]
        );
        assert!(axes.iter().all(|a| a.id().is_empty()));
    }

    #[test]
    fn legacy_axes_refuse_to_report_a_size() {
        let mut diags = DiagnosticSink::default();
        let axes = decode("bc", &mut diags);
        assert_eq!(axes[0].size().unwrap_err(), SizeError::LegacyAxis);
    }

    #[test]
    fn invalid_legacy_character_is_fatal() {
        let node: Node = serde_yaml::from_str("bq").unwrap();
        let mut diags = DiagnosticSink::default();
        assert!(Axis::decode_list(&node, "axes", &mut diags).is_err());
    }

    #[test]
    fn batch_axis_defaults_to_size_one() {
        let mut diags = DiagnosticSink::default();
        let axes = decode("[{type: batch}]", &mut diags);
        assert_eq!(axes[0].size().unwrap(), ResolvedSize::Exact(1));
        assert_eq!(axes[0].id(), "batch");
    }

    #[test]
    fn channel_names_fix_the_channel_axis_size() {
        let mut diags = DiagnosticSink::default();
        let axes = decode("[{type: channel, channel_names: [dapi, gfp, rfp]}]", &mut diags);
        assert_eq!(axes[0].size().unwrap(), ResolvedSize::Exact(3));
    }

    #[test]
    fn channel_names_are_required() {
        let node: Node = serde_yaml::from_str("[{type: channel}]").unwrap();
        let mut diags = DiagnosticSink::default();
        assert!(Axis::decode_list(&node, "axes", &mut diags).is_err());
    }

    #[test]
    fn space_axis_reads_unit_and_halo() {
        let mut diags = DiagnosticSink::default();
        let axes = decode(
            "[{type: space, id: x, size: 64, unit: micrometer, scale: 1.5, halo: 8}]",
            &mut diags,
        );
        let Axis::Space(space) = &axes[0] else { panic!() };
        assert_eq!(space.unit, Some(SpaceUnit::Micrometer));
        assert_eq!(space.halo, 8);
        assert_eq!(axes[0].scale(), 1.5);
    }

    #[test]
    fn empty_unit_token_is_the_explicit_no_unit_sentinel() {
        let mut diags = DiagnosticSink::default();
        let axes = decode("[{type: space, id: x, size: 4, unit: \"\"}]", &mut diags);
        let Axis::Space(space) = &axes[0] else { panic!() };
        assert_eq!(space.unit, Some(SpaceUnit::NoUnit));

        let axes = decode("[{type: space, id: x, size: 4}]", &mut diags);
        let Axis::Space(space) = &axes[0] else { panic!() };
        assert_eq!(space.unit, None);
    }

    #[test]
    fn unknown_axis_type_is_skipped_with_a_diagnostic() {
        let mut diags = DiagnosticSink::default();
        let axes = decode(
            "[{type: batch}, {type: hyperbolic, id: q}, {type: space, id: x, size: 8}]",
            &mut diags,
        );
        assert_eq!(axes.len(), 2);
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            diags.iter().next().unwrap(),
            Diagnostic::UnknownAxisType { type_name, .. } if type_name == "hyperbolic"
        ));
    }

    #[test]
    fn space_axis_size_may_be_any_size_variant() {
        let mut diags = DiagnosticSink::default();
        let axes = decode(
            "[{type: space, id: x, size: {min: 32, step: 16}}]",
            &mut diags,
        );
        let Axis::Space(space) = &axes[0] else { panic!() };
        assert_eq!(space.size, AxisSize::Parameterized { min: 32, step: 16 });
    }
}
