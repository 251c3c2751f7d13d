//! Per-socket connection state.

use std::collections::HashMap;

use voxloop_signaling_core::ClientSocket;

use crate::permission::Permission;

/// Participation of one connection in one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopParticipation {
    pub permission: Permission,
    /// Playback gain 0..=100 for this loop.
    pub volume: u8,
}

/// Everything the controller tracks per transport socket.
///
/// `user`, `role` and `session` fill in as the connection walks through
/// authentication, authorization and media setup. ICE completion and
/// mixer acquisition are concurrent; `media_ready` is announced to the
/// client exactly once, when both have happened.
#[derive(Debug)]
pub struct Connection {
    pub socket: ClientSocket,
    pub client: Option<String>,
    pub user: Option<String>,
    pub role: Option<String>,
    pub session: Option<String>,
    pub ice_complete: bool,
    pub mixer_acquired: bool,
    pub media_ready_announced: bool,
    pub loops: HashMap<String, LoopParticipation>,
}

impl Connection {
    pub fn new(socket: ClientSocket) -> Self {
        Self {
            socket,
            client: None,
            user: None,
            role: None,
            session: None,
            ice_complete: false,
            mixer_acquired: false,
            media_ready_announced: false,
            loops: HashMap::new(),
        }
    }

    pub fn authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn authorized(&self) -> bool {
        self.role.is_some()
    }

    /// ICE and mixer are both in place.
    pub fn media_ready(&self) -> bool {
        self.ice_complete && self.mixer_acquired
    }

    /// Current permission on `loop_name` (`None` when not participating).
    pub fn loop_state(&self, loop_name: &str) -> Permission {
        self.loops
            .get(loop_name)
            .map(|p| p.permission)
            .unwrap_or(Permission::None)
    }

    pub fn set_loop_state(&mut self, loop_name: &str, permission: Permission, volume: u8) {
        match permission {
            Permission::None => {
                self.loops.remove(loop_name);
            }
            _ => {
                self.loops
                    .entry(loop_name.to_string())
                    .and_modify(|p| p.permission = permission)
                    .or_insert(LoopParticipation { permission, volume });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_state_defaults_to_none() {
        let mut conn = Connection::new(ClientSocket(1));
        assert_eq!(conn.loop_state("L1"), Permission::None);

        conn.set_loop_state("L1", Permission::Recv, 50);
        assert_eq!(conn.loop_state("L1"), Permission::Recv);

        conn.set_loop_state("L1", Permission::None, 50);
        assert_eq!(conn.loop_state("L1"), Permission::None);
        assert!(conn.loops.is_empty());
    }

    #[test]
    fn media_ready_requires_both_flags() {
        let mut conn = Connection::new(ClientSocket(1));
        conn.ice_complete = true;
        assert!(!conn.media_ready());
        conn.mixer_acquired = true;
        assert!(conn.media_ready());
    }
}
