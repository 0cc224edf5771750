//! Status codes for scheduler and executor outcomes.
//!
//! Codes follow the canonical RPC code set so that executor families
//! backed by remote services can pass their codes through unchanged.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Canonical outcome code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum StatusCode {
    /// Success
    Ok = 0,
    /// Operation was cancelled by the caller
    Cancelled = 1,
    /// Unknown error
    Unknown = 2,
    /// Caller supplied an invalid argument
    InvalidArgument = 3,
    /// Deadline expired before completion
    DeadlineExceeded = 4,
    /// Entity not found
    NotFound = 5,
    /// Entity already exists
    AlreadyExists = 6,
    /// Caller lacks permission
    PermissionDenied = 7,
    /// Resource exhausted
    ResourceExhausted = 8,
    /// System not in a state required for the operation
    FailedPrecondition = 9,
    /// Operation aborted
    Aborted = 10,
    /// Value out of range
    OutOfRange = 11,
    /// Operation not implemented
    Unimplemented = 12,
    /// Internal error
    Internal = 13,
    /// Service unavailable
    Unavailable = 14,
    /// Unrecoverable data loss
    DataLoss = 15,
    /// Missing or invalid credentials
    Unauthenticated = 16,
}

impl StatusCode {
    /// Map a raw integer code, returning `None` for unknown values
    #[must_use]
    pub const fn from_i32(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => return None,
        })
    }

    /// Raw integer value
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Canonical upper-case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome code plus an optional human-readable message
///
/// Two statuses compare equal when their codes match; the message is
/// informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    /// Outcome code
    pub code: StatusCode,
    /// Optional message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    /// Create a status with a code and optional message
    #[must_use]
    pub fn new(code: StatusCode, message: Option<String>) -> Self {
        Self { code, message }
    }

    /// Successful status without a message
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: None,
        }
    }

    /// Cancelled status
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Cancelled, Some(message.into()))
    }

    /// Aborted status
    #[must_use]
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Aborted, Some(message.into()))
    }

    /// Deadline-exceeded status
    #[must_use]
    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(StatusCode::DeadlineExceeded, Some(message.into()))
    }

    /// Internal-error status
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Internal, Some(message.into()))
    }

    /// Whether the code is OK
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    /// Whether the code is CANCELLED
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.code == StatusCode::Cancelled
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Status {}

impl Hash for Status {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        Self::new(code, None)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.code, message),
            None => write!(f, "{}", self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", Status::ok()), "OK");
        assert_eq!(
            format!("{}", Status::cancelled("stopped by operator")),
            "CANCELLED: stopped by operator"
        );
    }

    #[test]
    fn test_status_predicates() {
        assert!(Status::ok().is_ok());
        assert!(!Status::ok().is_cancelled());
        assert!(Status::cancelled("x").is_cancelled());
        assert!(!Status::internal("x").is_ok());
    }

    #[test]
    fn test_status_code_from_i32() {
        assert_eq!(StatusCode::from_i32(0), Some(StatusCode::Ok));
        assert_eq!(StatusCode::from_i32(4), Some(StatusCode::DeadlineExceeded));
        assert_eq!(StatusCode::from_i32(16), Some(StatusCode::Unauthenticated));
        assert_eq!(StatusCode::from_i32(17), None);
        assert_eq!(StatusCode::from_i32(-1), None);
    }

    #[test]
    fn test_status_serde_uses_canonical_names() {
        let status = Status::aborted("executor lost");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["code"], "ABORTED");
        assert_eq!(json["message"], "executor lost");

        let ok: Status = serde_json::from_str(r#"{"code":"OK"}"#).unwrap();
        assert!(ok.is_ok());
        assert!(ok.message.is_none());
    }

    proptest! {
        #[test]
        fn prop_equality_ignores_message(code in 0i32..=16, a: String, b: String) {
            let code = StatusCode::from_i32(code).unwrap();
            let left = Status::new(code, Some(a));
            let right = Status::new(code, Some(b));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn prop_code_roundtrips_through_i32(code in 0i32..=16) {
            let parsed = StatusCode::from_i32(code).unwrap();
            prop_assert_eq!(parsed.as_i32(), code);
        }
    }
}
