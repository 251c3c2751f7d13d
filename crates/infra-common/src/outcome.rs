//! The uniform `(code, message)` result carried along async call paths.

use serde::{Deserialize, Serialize};

use crate::codes::{self, ErrorCode, NO_ERROR};

/// Outcome of an operation as reported over the wire.
///
/// Invariant: `code == 0` forbids a message, any other code requires one.
/// [`Outcome::set`] enforces the invariant and refuses violating updates,
/// leaving the value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub code: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outcome {
    /// The success outcome: `{0, None}`.
    pub fn ok() -> Self {
        Outcome::default()
    }

    /// An error outcome with the canonical description of `code`.
    pub fn error(code: ErrorCode) -> Self {
        Outcome {
            code: code.code(),
            message: Some(code.description().to_string()),
        }
    }

    /// An error outcome with a custom message.
    pub fn error_msg(code: ErrorCode, message: impl Into<String>) -> Self {
        Outcome {
            code: code.code(),
            message: Some(message.into()),
        }
    }

    /// Replace code and message, upholding the invariant.
    ///
    /// Returns `false` (and leaves `self` unchanged) if `code` is zero and
    /// a message is given, or if `code` is non-zero and no message is
    /// given.
    pub fn set(&mut self, code: u64, message: Option<&str>) -> bool {
        if code == NO_ERROR && message.is_some() {
            return false;
        }
        if code != NO_ERROR && message.is_none() {
            return false;
        }
        self.code = code;
        self.message = message.map(str::to_string);
        true
    }

    /// Reset to the success outcome `{0, None}`.
    pub fn clear(&mut self) {
        self.code = NO_ERROR;
        self.message = None;
    }

    pub fn is_ok(&self) -> bool {
        self.code == NO_ERROR
    }

    /// The message, or `""` for success outcomes.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// True iff this outcome carries a critical error code.
    pub fn is_critical(&self) -> bool {
        !self.is_ok() && codes::is_critical(self.code)
    }
}

impl From<ErrorCode> for Outcome {
    fn from(code: ErrorCode) -> Self {
        Outcome::error(code)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_ok() {
            write!(f, "ok")
        } else {
            write!(f, "{}|{}", self.code, self.message())
        }
    }
}
