//! Format-version tag of a resource description document.

use std::fmt::Display;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatVersionParsingError {
    #[error("format version '{raw}' is not semver-shaped (expected MAJOR.MINOR.PATCH)")]
    NotSemver { raw: String },
    #[error("format version component '{component}' in '{raw}' is not a number")]
    BadComponent { raw: String, component: String },
}

/// Semantic-version tag declaring which schema generation's field layout a
/// document follows. Every variant-selection branch in the parser compares
/// against a threshold version, so ordering is derived on the numeric triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct FormatVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl FormatVersion {
    pub const V0_5_0: FormatVersion = FormatVersion::new(0, 5, 0);

    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }
}

impl FromStr for FormatVersion {
    type Err = FormatVersionParsingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        // Pre-release/build tails are tolerated and ignored for ordering.
        let core = raw.split(['-', '+']).next().unwrap_or(raw);
        let mut parts = core.split('.');
        let (a, b, c) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c), None) => (a, b, c),
            _ => return Err(FormatVersionParsingError::NotSemver { raw: raw.to_owned() }),
        };
        let parse = |component: &str| {
            component
                .parse::<u64>()
                .map_err(|_| FormatVersionParsingError::BadComponent {
                    raw: raw.to_owned(),
                    component: component.to_owned(),
                })
        };
        Ok(Self::new(parse(a)?, parse(b)?, parse(c)?))
    }
}

impl TryFrom<String> for FormatVersion {
    type Error = FormatVersionParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
