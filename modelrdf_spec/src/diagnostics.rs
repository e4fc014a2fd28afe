//! Recoverable parse diagnostics.
//!
//! Fatal conditions abort the parse through `ParseError`; everything here is
//! the non-fatal half of the taxonomy — recorded, logged, and carried
//! alongside the finished model so callers need not scrape logs.

/// One recoverable condition encountered while parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("unrecognized weights format key '{key}'; entry dropped")]
    UnknownWeightsFormat { key: String },
    #[error("unrecognized processing operation '{name}' at {at}; kept as a generic step")]
    UnknownProcessingOp { name: String, at: String },
    #[error("unrecognized axis type '{type_name}' at {at}; axis skipped")]
    UnknownAxisType { type_name: String, at: String },
    #[error("unparseable numeric token {token} at {at}; substituted NaN")]
    MalformedNumericToken { at: String, token: String },
}

/// Collects diagnostics during one parse. Every push is also logged.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    items: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
