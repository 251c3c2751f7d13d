//! Pending-request store matching async requests with responses.
//!
//! Every request to the mixer backend, ICE frontend, SIP gateway or
//! directory suspends by registering its correlation id here and
//! returning to the event loop. The matching response (or the deadline)
//! is the single resumption gate: exactly one of *matched*, *timed out*
//! or *socket dropped* consumes each entry.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::socket::ClientSocket;

/// One suspended request.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending<T> {
    pub socket: ClientSocket,
    pub payload: T,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelatorError {
    /// The id is already live; correlation ids are minted fresh per
    /// request, so a collision means broken invariants upstream.
    #[error("correlation id {0} already registered")]
    IdCollision(Uuid),
}

#[derive(Debug)]
struct Entry<T> {
    pending: Pending<T>,
    deadline: Instant,
}

/// The correlation store.
///
/// Owned by the controller task; all operations are plain method calls.
/// `next_deadline` lets the owner sleep until the earliest expiry.
#[derive(Debug)]
pub struct Correlator<T> {
    entries: HashMap<Uuid, Entry<T>>,
    deadlines: BTreeSet<(Instant, Uuid)>,
}

impl<T> Default for Correlator<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            deadlines: BTreeSet::new(),
        }
    }
}

impl<T> Correlator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `payload` under `id` until `deadline`.
    pub fn set(
        &mut self,
        id: Uuid,
        socket: ClientSocket,
        payload: T,
        deadline: Instant,
    ) -> Result<(), CorrelatorError> {
        if self.entries.contains_key(&id) {
            return Err(CorrelatorError::IdCollision(id));
        }
        self.entries.insert(
            id,
            Entry {
                pending: Pending { socket, payload },
                deadline,
            },
        );
        self.deadlines.insert((deadline, id));
        Ok(())
    }

    /// Remove and return the entry for `id`, if live.
    pub fn unset(&mut self, id: &Uuid) -> Option<Pending<T>> {
        let entry = self.entries.remove(id)?;
        self.deadlines.remove(&(entry.deadline, *id));
        Some(entry.pending)
    }

    /// Remove all entries of `socket` without firing their timeouts.
    /// Returns the cancelled correlation ids.
    pub fn drop_socket(&mut self, socket: ClientSocket) -> Vec<Uuid> {
        let ids: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.pending.socket == socket)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(entry) = self.entries.remove(id) {
                self.deadlines.remove(&(entry.deadline, *id));
            }
        }
        ids
    }

    /// Earliest live deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().next().map(|(deadline, _)| *deadline)
    }

    /// Pop every entry whose deadline is at or before `now`.
    pub fn expired(&mut self, now: Instant) -> Vec<(Uuid, Pending<T>)> {
        let due: Vec<Uuid> = self
            .deadlines
            .range(..=(now, Uuid::max()))
            .map(|(_, id)| *id)
            .collect();
        due.iter()
            .filter_map(|id| self.unset(id).map(|pending| (*id, pending)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.contains_key(id)
    }
}
