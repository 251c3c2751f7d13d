//! Typed per-connection socket key.

use serde::{Deserialize, Serialize};

/// Identity of one client transport connection.
///
/// A dedicated type rather than a bare integer, so socket keys cannot be
/// mixed up with user ids or loop names in the controller's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientSocket(pub u64);

impl std::fmt::Display for ClientSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "socket:{}", self.0)
    }
}

impl From<u64> for ClientSocket {
    fn from(raw: u64) -> Self {
        ClientSocket(raw)
    }
}
