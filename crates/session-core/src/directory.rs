//! The credential, role and loop store behind the controller.
//!
//! The authoritative directory (LDAP-backed or database-backed in a full
//! deployment) is an external collaborator; this trait is the interface
//! the controller consumes. [`MemoryDirectory`] is the in-process
//! implementation used for standalone setups and tests.

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use voxloop_rtp_core::{MulticastGroup, DEFAULT_MULTICAST_PORT};

use crate::permission::Permission;

/// What a role may do on one loop, plus the persisted per-user state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopGrant {
    pub permission: Permission,
    /// Persisted participation state of the user in this loop.
    pub state: Permission,
    /// Persisted playback gain 0..=100.
    pub volume: u8,
}

pub trait Directory: Send {
    /// Validate credentials against the local store.
    fn authenticate(&self, user: &str, password: &str) -> bool;

    /// Validate that `user` may assume `role`.
    fn authorize(&self, user: &str, role: &str) -> bool;

    fn user_roles(&self, user: &str) -> Option<Vec<String>>;

    /// The loops `role` can reach, with persisted state and volume of
    /// `user`.
    fn role_loops(&self, user: &str, role: &str) -> Option<BTreeMap<String, LoopGrant>>;

    fn permission(&self, role: &str, loop_name: &str) -> Permission;

    fn multicast_group(&self, loop_name: &str) -> Option<MulticastGroup>;

    fn volume(&self, user: &str, role: &str, loop_name: &str) -> u8;

    fn set_state(&mut self, user: &str, role: &str, loop_name: &str, state: Permission);

    fn set_volume(&mut self, user: &str, role: &str, loop_name: &str, volume: u8);

    /// The user entity as exposed by `get`.
    fn user_entity(&self, user: &str) -> Option<serde_json::Value>;

    fn keyset_layout(&self, user: &str, name: &str) -> Option<serde_json::Value>;

    fn set_keyset_layout(&mut self, user: &str, name: &str, layout: serde_json::Value);

    fn user_data(&self, user: &str) -> Option<serde_json::Value>;

    fn set_user_data(&mut self, user: &str, data: serde_json::Value);
}

#[derive(Debug, Clone, Default)]
struct UserRecord {
    password: String,
    roles: Vec<String>,
}

/// In-memory [`Directory`].
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: HashMap<String, UserRecord>,
    /// role -> loop -> granted permission
    grants: HashMap<String, BTreeMap<String, Permission>>,
    loops: HashMap<String, MulticastGroup>,
    /// (user, role, loop) -> persisted state and volume
    participation: HashMap<(String, String, String), (Permission, u8)>,
    keysets: HashMap<(String, String), serde_json::Value>,
    user_data: HashMap<String, serde_json::Value>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: &str, password: &str, roles: &[&str]) -> Self {
        self.users.insert(
            user.to_string(),
            UserRecord {
                password: password.to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_grant(mut self, role: &str, loop_name: &str, permission: Permission) -> Self {
        self.grants
            .entry(role.to_string())
            .or_default()
            .insert(loop_name.to_string(), permission);
        self
    }

    pub fn with_loop(mut self, loop_name: &str, group: Ipv4Addr) -> Self {
        self.loops.insert(
            loop_name.to_string(),
            MulticastGroup::new(group, DEFAULT_MULTICAST_PORT),
        );
        self
    }
}

impl Directory for MemoryDirectory {
    fn authenticate(&self, user: &str, password: &str) -> bool {
        self.users
            .get(user)
            .map(|u| u.password == password)
            .unwrap_or(false)
    }

    fn authorize(&self, user: &str, role: &str) -> bool {
        self.users
            .get(user)
            .map(|u| u.roles.iter().any(|r| r == role))
            .unwrap_or(false)
    }

    fn user_roles(&self, user: &str) -> Option<Vec<String>> {
        self.users.get(user).map(|u| u.roles.clone())
    }

    fn role_loops(&self, user: &str, role: &str) -> Option<BTreeMap<String, LoopGrant>> {
        let grants = self.grants.get(role)?;
        Some(
            grants
                .iter()
                .map(|(loop_name, &permission)| {
                    let key = (user.to_string(), role.to_string(), loop_name.clone());
                    let (state, volume) = self
                        .participation
                        .get(&key)
                        .copied()
                        .unwrap_or((Permission::None, 50));
                    (
                        loop_name.clone(),
                        LoopGrant {
                            permission,
                            state,
                            volume,
                        },
                    )
                })
                .collect(),
        )
    }

    fn permission(&self, role: &str, loop_name: &str) -> Permission {
        self.grants
            .get(role)
            .and_then(|grants| grants.get(loop_name).copied())
            .unwrap_or(Permission::None)
    }

    fn multicast_group(&self, loop_name: &str) -> Option<MulticastGroup> {
        self.loops.get(loop_name).copied()
    }

    fn volume(&self, user: &str, role: &str, loop_name: &str) -> u8 {
        self.participation
            .get(&(user.to_string(), role.to_string(), loop_name.to_string()))
            .map(|(_, volume)| *volume)
            .unwrap_or(50)
    }

    fn set_state(&mut self, user: &str, role: &str, loop_name: &str, state: Permission) {
        let entry = self
            .participation
            .entry((user.to_string(), role.to_string(), loop_name.to_string()))
            .or_insert((Permission::None, 50));
        entry.0 = state;
    }

    fn set_volume(&mut self, user: &str, role: &str, loop_name: &str, volume: u8) {
        let entry = self
            .participation
            .entry((user.to_string(), role.to_string(), loop_name.to_string()))
            .or_insert((Permission::None, 50));
        entry.1 = volume.min(100);
    }

    fn user_entity(&self, user: &str) -> Option<serde_json::Value> {
        let record = self.users.get(user)?;
        Some(serde_json::json!({
            "id": user,
            "roles": record.roles,
        }))
    }

    fn keyset_layout(&self, user: &str, name: &str) -> Option<serde_json::Value> {
        self.keysets
            .get(&(user.to_string(), name.to_string()))
            .cloned()
    }

    fn set_keyset_layout(&mut self, user: &str, name: &str, layout: serde_json::Value) {
        self.keysets
            .insert((user.to_string(), name.to_string()), layout);
    }

    fn user_data(&self, user: &str) -> Option<serde_json::Value> {
        self.user_data.get(user).cloned()
    }

    fn set_user_data(&mut self, user: &str, data: serde_json::Value) {
        self.user_data.insert(user.to_string(), data);
    }
}
