use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a problem in the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Byte offset from the start of the content handed to the parser.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
}

impl Position {
    pub fn locate(src: &str, offset: usize) -> Self {
        let offset = offset.min(src.len());
        let line = src.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1;
        Self { offset, line }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, byte {}", self.line, self.offset)
    }
}

/// Chain of tag names from the document root down to a node, e.g.
/// `OFX/BANKMSGSRSV1/STMTTRNRS/STMTRS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPath(Vec<String>);

impl TagPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl<S: Into<String>> FromIterator<S> for TagPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        f.write_str(&self.0.join("/"))
    }
}

/// Fatal errors. Any of these aborts the call and no statements are returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfxError {
    /// The input cannot be tokenized, or strict mode rejected a recoverable issue.
    #[error("Malformed input{}: {message}", describe_location(.position, .path))]
    MalformedInput {
        message: String,
        position: Option<Position>,
        path: Option<TagPath>,
    },

    /// Encrypted or compressed content, which this crate does not handle.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A document tree was built but holds no statement message.
    #[error("No recognizable statement found in document")]
    NoStatementFound,

    #[error("Content is required")]
    MissingContent,
}

impl OfxError {
    pub(crate) fn malformed_at(src: &str, offset: usize, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
            position: Some(Position::locate(src, offset)),
            path: None,
        }
    }
}

fn describe_location(position: &Option<Position>, path: &Option<TagPath>) -> String {
    match (position, path) {
        (Some(pos), Some(path)) => format!(" at {pos} ({path})"),
        (Some(pos), None) => format!(" at {pos}"),
        (None, Some(path)) => format!(" at {path}"),
        (None, None) => String::new(),
    }
}

/// Field-level conversion failures. The mapper turns these into warnings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Invalid OFX date '{0}'")]
    InvalidDate(String),

    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),
}

/// Alias for results carrying the crate's fatal error type.
pub type OfxResult<T> = Result<T, OfxError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    MissingHeader,
    MalformedHeader,
    UnrecognizedEncoding,
    StrayText,
    UnknownTag,
    UnclosedTag,
    MismatchedCloseTag,
    InvalidDate,
    InvalidAmount,
    InvalidCurrency,
    MissingField,
    UnknownTransactionType,
    UnknownAccountType,
}

impl WarningKind {
    /// Whether strict parsing turns this warning into a fatal error.
    pub fn is_fatal_when_strict(self) -> bool {
        matches!(
            self,
            WarningKind::UnclosedTag | WarningKind::MismatchedCloseTag | WarningKind::MissingField
        )
    }
}

/// A non-fatal problem. Warnings are returned next to the parsed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub kind: WarningKind,
    pub path: TagPath,
    pub message: String,
}

impl ParseWarning {
    pub fn new(kind: WarningKind, path: TagPath, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}: {}", self.kind, self.path, self.message)
    }
}

impl From<ParseWarning> for OfxError {
    fn from(warning: ParseWarning) -> Self {
        OfxError::MalformedInput {
            message: warning.message,
            position: None,
            path: Some(warning.path),
        }
    }
}

/// Collects warnings while a parse call runs.
#[derive(Debug, Default)]
pub(crate) struct Warnings(Vec<ParseWarning>);

impl Warnings {
    pub(crate) fn push(&mut self, kind: WarningKind, path: TagPath, message: impl Into<String>) {
        let warning = ParseWarning::new(kind, path, message);
        tracing::debug!(%warning, "recorded parse warning");
        self.0.push(warning);
    }

    pub(crate) fn extend(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }

    pub(crate) fn into_inner(self) -> Vec<ParseWarning> {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn as_slice(&self) -> &[ParseWarning] {
        &self.0
    }
}
