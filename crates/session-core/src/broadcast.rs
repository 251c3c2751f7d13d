//! Multi-subscriber fan-out keyed by scope.

use std::collections::{BTreeSet, HashMap};

use voxloop_signaling_core::{ClientSocket, Envelope};

use crate::collab::ClientSink;

/// Broadcast scope. A socket may hold many keys within each scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Loop,
    User,
    Role,
    System,
}

/// Subscription table for state-transition broadcasts.
#[derive(Debug, Default)]
pub struct BroadcastRegistry {
    subscriptions: HashMap<(Scope, String), BTreeSet<ClientSocket>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, scope: Scope, key: impl Into<String>, socket: ClientSocket) {
        self.subscriptions
            .entry((scope, key.into()))
            .or_default()
            .insert(socket);
    }

    pub fn unset(&mut self, scope: Scope, key: &str, socket: ClientSocket) {
        let entry = (scope, key.to_string());
        let now_empty = match self.subscriptions.get_mut(&entry) {
            Some(set) => {
                set.remove(&socket);
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.subscriptions.remove(&entry);
        }
    }

    /// Remove `socket` from every key of every scope.
    pub fn drop_socket(&mut self, socket: ClientSocket) {
        self.subscriptions.retain(|_, set| {
            set.remove(&socket);
            !set.is_empty()
        });
    }

    pub fn subscribers(&self, scope: Scope, key: &str) -> usize {
        self.subscriptions
            .get(&(scope, key.to_string()))
            .map(BTreeSet::len)
            .unwrap_or(0)
    }

    pub fn is_subscribed(&self, scope: Scope, key: &str, socket: ClientSocket) -> bool {
        self.subscriptions
            .get(&(scope, key.to_string()))
            .map(|set| set.contains(&socket))
            .unwrap_or(false)
    }

    /// Fan `message` out to every subscriber of `(scope, key)`.
    ///
    /// Iterates the subscriber set once; a failing send is logged and
    /// does not abort the fan-out. Returns the number of deliveries.
    pub fn send(
        &self,
        scope: Scope,
        key: &str,
        message: &Envelope,
        sink: &dyn ClientSink,
    ) -> usize {
        let Some(subscribers) = self.subscriptions.get(&(scope, key.to_string())) else {
            return 0;
        };
        let mut delivered = 0;
        for &socket in subscribers {
            if sink.send(socket, message) {
                delivered += 1;
            } else {
                tracing::warn!(%socket, ?scope, key, event = %message.event, "broadcast delivery failed");
            }
        }
        delivered
    }
}
