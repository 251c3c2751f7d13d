//! Controller configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session_store::DEFAULT_MAX_LIFETIME_USEC;

/// SDP offered to the ICE frontend when a client requests media setup.
pub const DEFAULT_SDP: &str = "v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Deadline for every suspended request.
    #[serde(default = "default_response_timeout_usec")]
    pub response_timeout_usec: u64,
    /// Lifetime of persisted user sessions.
    #[serde(default = "default_session_lifetime_usec")]
    pub session_max_lifetime_usec: u64,
    /// Cadence of the session eviction sweep.
    #[serde(default = "default_eviction_interval_usec")]
    pub session_eviction_interval_usec: u64,
    /// Directory holding the persisted sessions file (`None`: in-memory).
    #[serde(default)]
    pub sessions_dir: Option<PathBuf>,
    /// Authenticate against the LDAP collaborator instead of the local
    /// credential store.
    #[serde(default)]
    pub ldap_enabled: bool,
    /// Upper bound for one recordings result page.
    #[serde(default = "default_recordings_page")]
    pub recordings_page_limit: u32,
}

fn default_response_timeout_usec() -> u64 {
    5_000_000
}

fn default_session_lifetime_usec() -> u64 {
    DEFAULT_MAX_LIFETIME_USEC
}

fn default_eviction_interval_usec() -> u64 {
    60_000_000
}

fn default_recordings_page() -> u32 {
    100
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            response_timeout_usec: default_response_timeout_usec(),
            session_max_lifetime_usec: default_session_lifetime_usec(),
            session_eviction_interval_usec: default_eviction_interval_usec(),
            sessions_dir: None,
            ldap_enabled: false,
            recordings_page_limit: default_recordings_page(),
        }
    }
}

impl ControllerConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_micros(self.response_timeout_usec)
    }

    pub fn session_eviction_interval(&self) -> Duration {
        Duration::from_micros(self.session_eviction_interval_usec)
    }
}
