//! The mail record flowing through a pipeline.

use std::fmt;

/// Number of lines that frame one record on an input or output feed:
/// sender, recipient, body.
pub const LINES_PER_RECORD: usize = 3;

/// A single mail record.
///
/// Plain value type. Clones are fully independent copies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub from: String,
    pub to: String,
    pub body: String,
}

impl Record {
    /// Create a record from its three fields.
    pub fn new(from: impl Into<String>, to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for Record {
    /// Formats the record in feed framing: three newline-terminated lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.from)?;
        writeln!(f, "{}", self.to)?;
        writeln!(f, "{}", self.body)
    }
}
