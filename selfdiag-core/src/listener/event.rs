//! Severity levels and the diagnostic event passed from sources to listeners.

use crate::encoding::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[repr(u8)]
pub enum Severity {
    /// Everything, including high-volume tracing detail.
    Verbose = 0,
    /// Informational messages.
    Informational = 1,
    /// Something unexpected that the SDK recovered from.
    #[default]
    Warning = 2,
    /// An operation failed.
    Error = 3,
    /// The SDK cannot continue a major function.
    Critical = 4,
}

impl Severity {
    /// Parse a severity name, case-insensitively.
    ///
    /// `all` and `logalways` select every event and map to `Verbose`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" | "logalways" | "verbose" => Some(Self::Verbose),
            "informational" | "info" => Some(Self::Informational),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Informational => "informational",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Verbose,
            1 => Self::Informational,
            2 => Self::Warning,
            3 => Self::Error,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or("invalid severity")
    }
}

impl TryFrom<String> for Severity {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, &'static str> {
        s.parse()
    }
}

/// A single diagnostic event, borrowed from its emitter for the duration of
/// one synchronous delivery.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticEvent<'a> {
    /// When the event was raised.
    pub timestamp: Timestamp,
    /// Event severity.
    pub level: Severity,
    /// Message template or literal text.
    pub message: &'a str,
    /// Ordered parameter values; `None` renders as `null`.
    pub parameters: &'a [Option<&'a str>],
}

impl<'a> DiagnosticEvent<'a> {
    /// Create an event stamped with the current UTC time.
    pub fn new(level: Severity, message: &'a str, parameters: &'a [Option<&'a str>]) -> Self {
        Self {
            timestamp: Timestamp::now_utc(),
            level,
            message,
            parameters,
        }
    }

    /// Replace the timestamp.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}
