use std::fmt;

/// Machine-readable error codes surfaced by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InputNotFound,
    RowParseError,
    UnsupportedInputFormat,
    AnomaliesDetected,
    OutputWriteFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InputNotFound => "E2001",
            Self::RowParseError => "E2002",
            Self::UnsupportedInputFormat => "E2003",
            Self::AnomaliesDetected => "E3001",
            Self::OutputWriteFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InputNotFound => "Input file not found",
            Self::RowParseError => "Malformed input row",
            Self::UnsupportedInputFormat => "Unsupported input format",
            Self::AnomaliesDetected => "History anomalies detected",
            Self::OutputWriteFailed => "Snapshot output write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in bugtrail.toml and retry."),
            Self::InputNotFound => Some("Pass an existing file, or `-` to read from stdin."),
            Self::RowParseError => {
                Some("Rows need 8 tab-separated columns: bug_id .. _merge_order.")
            }
            Self::UnsupportedInputFormat => Some("Use one of: tsv, jsonl."),
            Self::AnomaliesDetected => {
                Some("Run `bugtrail check` to list the affected bugs, or drop --strict.")
            }
            Self::OutputWriteFailed => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
