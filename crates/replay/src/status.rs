//! Coarse execution status, mapped from the runtime's native representation.
//!
//! The runtime reports status either as a small integer code or as a
//! string, optionally prefixed with `WORKFLOW_EXECUTION_STATUS_` and in
//! any of SCREAMING_SNAKE or CamelCase spelling. Anything not in the table
//! is an error; guessing a default would misreport execution health.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Canceled,
    Terminated,
    ContinuedAsNew,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("unknown execution status '{raw}'")]
    UnknownStatus { raw: String },
}

const STATUS_PREFIX: &str = "WORKFLOW_EXECUTION_STATUS_";

/// (native code, normalized name, status). Names are upper case with
/// underscores removed, so `TIMED_OUT` and `TimedOut` share an entry.
const STATUS_TABLE: &[(u8, &str, ExecutionStatus)] = &[
    (1, "RUNNING", ExecutionStatus::Running),
    (2, "COMPLETED", ExecutionStatus::Completed),
    (3, "FAILED", ExecutionStatus::Failed),
    (4, "CANCELED", ExecutionStatus::Canceled),
    (5, "TERMINATED", ExecutionStatus::Terminated),
    (6, "CONTINUEDASNEW", ExecutionStatus::ContinuedAsNew),
    (7, "TIMEDOUT", ExecutionStatus::Timeout),
];

impl ExecutionStatus {
    /// Map a native status code or string.
    pub fn from_native(raw: &str) -> Result<Self, StatusError> {
        let trimmed = raw.trim();
        let unknown = || StatusError::UnknownStatus {
            raw: raw.to_string(),
        };

        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let code = trimmed.parse::<u8>().map_err(|_| unknown())?;
            return STATUS_TABLE
                .iter()
                .find(|(c, _, _)| *c == code)
                .map(|(_, _, status)| *status)
                .ok_or_else(unknown);
        }

        let upper = trimmed.to_ascii_uppercase();
        let name: String = upper
            .strip_prefix(STATUS_PREFIX)
            .unwrap_or(upper.as_str())
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let name = match name.as_str() {
            "CANCELLED" => "CANCELED",
            "TIMEOUT" => "TIMEDOUT",
            other => other,
        };
        STATUS_TABLE
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|(_, _, status)| *status)
            .ok_or_else(unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Canceled => "CANCELED",
            ExecutionStatus::Terminated => "TERMINATED",
            ExecutionStatus::ContinuedAsNew => "CONTINUED_AS_NEW",
            ExecutionStatus::Timeout => "TIMEOUT",
        }
    }

    pub fn is_closed(self) -> bool {
        self != ExecutionStatus::Running
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
