//! The loops table: who participates where.

use voxloop_signaling_core::ClientSocket;

/// One participant of a loop. The socket is the weak back-reference the
/// controller uses to remove the participant when the connection goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub socket: ClientSocket,
    pub client: Option<String>,
    pub user: String,
    pub role: String,
}

/// State of one named loop. The loop is not destroyed when its last
/// participant leaves; it stays in the table until explicitly released.
#[derive(Debug, Default)]
pub struct LoopState {
    pub name: String,
    participants: Vec<Participant>,
}

impl LoopState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participants: Vec::new(),
        }
    }

    /// Add or refresh a participant (one entry per socket, insertion
    /// order preserved).
    pub fn add_participant(&mut self, participant: Participant) {
        match self
            .participants
            .iter_mut()
            .find(|p| p.socket == participant.socket)
        {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    /// Remove by socket; true if something was removed.
    pub fn drop_participant(&mut self, socket: ClientSocket) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.socket != socket);
        self.participants.len() != before
    }

    pub fn contains(&self, socket: ClientSocket) -> bool {
        self.participants.iter().any(|p| p.socket == socket)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// The derived participant list as it appears in responses and
    /// broadcasts.
    pub fn participants_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.participants
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "user": p.user,
                        "role": p.role,
                        "client": p.client,
                    })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(socket: u64, user: &str) -> Participant {
        Participant {
            socket: ClientSocket(socket),
            client: None,
            user: user.to_string(),
            role: "operator".to_string(),
        }
    }

    #[test]
    fn one_entry_per_socket() {
        let mut state = LoopState::new("L1");
        state.add_participant(participant(1, "alice"));
        state.add_participant(participant(2, "bob"));
        state.add_participant(participant(1, "alice"));
        assert_eq!(state.participants().len(), 2);
    }

    #[test]
    fn drop_removes_only_that_socket() {
        let mut state = LoopState::new("L1");
        state.add_participant(participant(1, "alice"));
        state.add_participant(participant(2, "bob"));

        assert!(state.drop_participant(ClientSocket(1)));
        assert!(!state.drop_participant(ClientSocket(1)));
        assert!(state.contains(ClientSocket(2)));
        assert!(!state.is_empty());
    }

    #[test]
    fn participant_list_preserves_order() {
        let mut state = LoopState::new("L1");
        state.add_participant(participant(2, "bob"));
        state.add_participant(participant(1, "alice"));

        let json = state.participants_json();
        assert_eq!(json[0]["user"], "bob");
        assert_eq!(json[1]["user"], "alice");
    }
}
