//! Loop participation permission.

use serde::{Deserialize, Serialize};

/// What a connection may do on a loop, totally ordered for grant
/// comparison: `None < Recv < Send`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    None,
    Recv,
    Send,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::None => "none",
            Permission::Recv => "recv",
            Permission::Send => "send",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "none" => Some(Permission::None),
            "recv" => Some(Permission::Recv),
            "send" => Some(Permission::Send),
            _ => None,
        }
    }

    /// True iff a role holding `self` may request `requested`.
    pub fn grants(self, requested: Permission) -> bool {
        self >= requested
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
