//! Loop participation: switch_loop_state, switch_loop_volume, talking.

use uuid::Uuid;
use voxloop_infra_common::{ErrorCode, Outcome};
use voxloop_signaling_core::backend::LoopData;
use voxloop_signaling_core::envelope::keys;
use voxloop_signaling_core::{ClientSocket, Envelope};

use super::SessionController;
use crate::broadcast::Scope;
use crate::loops::{LoopState, Participant};
use crate::permission::Permission;

impl SessionController {
    /// `switch_loop_state`: `{loop, state in {none,recv,send}}`.
    ///
    /// The transition chain runs through the backend and frontend; the
    /// response is produced only after the final step resolves. An
    /// identical-state request succeeds idempotently with no side
    /// effects.
    pub(super) fn client_switch_loop_state(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let (Some(user), Some(role)) = (conn.user.clone(), conn.role.clone()) else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };
        let Some(session) = conn.session.clone() else {
            self.send_error(socket, &envelope, ErrorCode::SessionUnknown);
            return;
        };
        if !conn.media_ready() {
            self.send_error(socket, &envelope, ErrorCode::Inactive);
            return;
        }
        let current_of = conn.loop_state(envelope.param_str(keys::LOOP).unwrap_or_default());

        let id = envelope.id;
        let loop_name = envelope.param_str(keys::LOOP).map(str::to_string);
        let state = envelope.param_str(keys::STATE).map(str::to_string);
        let (Some(id), Some(loop_name), Some(state)) = (id, loop_name, state) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };
        let Some(requested) = Permission::parse(&state) else {
            self.send_error(socket, &envelope, ErrorCode::BadArgument);
            return;
        };

        let granted = self.directory.permission(&role, &loop_name);
        if !granted.grants(requested) {
            self.send_error(socket, &envelope, ErrorCode::Permission);
            return;
        }

        if current_of == requested {
            let state = self
                .loops
                .entry(loop_name.clone())
                .or_insert_with(|| LoopState::new(loop_name.clone()));
            let participants = state.participants_json();
            self.send_success(
                socket,
                &envelope,
                serde_json::json!({
                    keys::PARTICIPANTS: participants,
                    keys::STATE: requested.as_str(),
                    keys::LOOP: loop_name,
                }),
            );
            return;
        }

        if !self.perform_switch(id, &session, &user, &role, &loop_name, current_of, requested) {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    /// Issue the next transition step towards `requested`.
    fn perform_switch(
        &mut self,
        id: Uuid,
        session: &str,
        user: &str,
        role: &str,
        loop_name: &str,
        current: Permission,
        requested: Permission,
    ) -> bool {
        let Some(group) = self.directory.multicast_group(loop_name) else {
            tracing::error!(loop_name, "no multicast group configured for loop");
            return false;
        };
        let data = LoopData {
            name: loop_name.to_string(),
            group,
            volume: self.directory.volume(user, role, loop_name),
        };

        match (current, requested) {
            (Permission::None, Permission::Recv | Permission::Send) => {
                self.recorder
                    .participation(user, role, loop_name, Permission::Recv);
                self.backend.join_loop(id, session, &data)
            }
            (Permission::Recv, Permission::None) => {
                self.recorder
                    .participation(user, role, loop_name, Permission::None);
                self.backend.leave_loop(id, session, loop_name)
            }
            (Permission::Recv, Permission::Send) => {
                self.recorder
                    .participation(user, role, loop_name, Permission::Send);
                self.frontend.talk(id, session, true, &data)
            }
            (Permission::Send, Permission::None | Permission::Recv) => {
                self.recorder
                    .participation(user, role, loop_name, Permission::Recv);
                self.frontend.talk(id, session, false, &data)
            }
            _ => false,
        }
    }

    /// Backend confirmed a loop join: the connection is now RECV.
    pub(super) fn on_loop_joined(
        &mut self,
        id: Uuid,
        session: String,
        loop_name: String,
        outcome: Outcome,
    ) {
        let Some(pending) = self.correlator.unset(&id) else {
            // original timed out: the join is an orphan, switch it off
            self.backend.leave_loop(Uuid::new_v4(), &session, &loop_name);
            return;
        };
        let socket = pending.socket;
        let envelope = pending.payload;

        if !outcome.is_ok() {
            self.send(socket, &envelope.outcome_response(&outcome));
            return;
        }

        let Some(conn) = self.connections.get_mut(&socket) else {
            self.backend.leave_loop(Uuid::new_v4(), &session, &loop_name);
            return;
        };
        let user = conn.user.clone().unwrap_or_default();
        let role = conn.role.clone().unwrap_or_default();
        let client = conn.client.clone();

        let requested = envelope
            .param_str(keys::STATE)
            .and_then(Permission::parse)
            .unwrap_or(Permission::Recv);
        let current = Permission::Recv;
        let volume = self.directory.volume(&user, &role, &loop_name);
        conn.set_loop_state(&loop_name, current, volume);
        self.directory.set_state(&user, &role, &loop_name, current);

        let state = self
            .loops
            .entry(loop_name.clone())
            .or_insert_with(|| LoopState::new(loop_name.clone()));
        state.add_participant(Participant {
            socket,
            client,
            user: user.clone(),
            role: role.clone(),
        });
        let participants = state.participants_json();

        self.broadcasts.set(Scope::Loop, loop_name.as_str(), socket);
        // the intermediate RECV is announced before a SEND chain continues
        self.switch_loop_broadcast(&loop_name, Some(&user), Some(&role), current);

        if requested != current {
            // chain the talk-on under the same correlation id
            if !self.suspend(socket, envelope) {
                self.drop_connection(socket, true, true);
                return;
            }
            if !self.perform_switch(id, &session, &user, &role, &loop_name, current, requested) {
                tracing::error!(loop_name, session, "talk switch failed mid-chain");
                self.drop_connection(socket, true, true);
            }
            return;
        }

        self.switch_loop_user_broadcast(&user, &loop_name, current);
        self.send_success(
            socket,
            &envelope,
            serde_json::json!({
                keys::PARTICIPANTS: participants,
                keys::STATE: current.as_str(),
                keys::LOOP: loop_name,
            }),
        );
    }

    /// Backend confirmed a loop leave: the connection is out.
    pub(super) fn on_loop_left(
        &mut self,
        id: Uuid,
        _session: String,
        loop_name: String,
        outcome: Outcome,
    ) {
        let Some(pending) = self.correlator.unset(&id) else {
            return;
        };
        let socket = pending.socket;
        let envelope = pending.payload;

        if !outcome.is_ok() {
            self.send(socket, &envelope.outcome_response(&outcome));
            return;
        }

        let Some(conn) = self.connections.get_mut(&socket) else {
            return;
        };
        let user = conn.user.clone().unwrap_or_default();
        let role = conn.role.clone().unwrap_or_default();
        conn.set_loop_state(&loop_name, Permission::None, 0);
        self.directory
            .set_state(&user, &role, &loop_name, Permission::None);

        self.broadcasts.unset(Scope::Loop, &loop_name, socket);
        let participants = match self.loops.get_mut(&loop_name) {
            Some(state) => {
                state.drop_participant(socket);
                state.participants_json()
            }
            None => serde_json::Value::Array(vec![]),
        };

        self.switch_loop_broadcast(&loop_name, Some(&user), Some(&role), Permission::None);
        self.switch_loop_user_broadcast(&user, &loop_name, Permission::None);
        self.send_success(
            socket,
            &envelope,
            serde_json::json!({
                keys::PARTICIPANTS: participants,
                keys::STATE: Permission::None.as_str(),
                keys::LOOP: loop_name,
            }),
        );
    }

    /// Frontend confirmed a talk switch.
    pub(super) fn on_talk_switched(
        &mut self,
        id: Uuid,
        session: String,
        loop_name: String,
        on: bool,
        outcome: Outcome,
    ) {
        let Some(pending) = self.correlator.unset(&id) else {
            return;
        };
        let socket = pending.socket;
        let envelope = pending.payload;

        if !outcome.is_ok() {
            self.send(socket, &envelope.outcome_response(&outcome));
            return;
        }

        let current = if on { Permission::Send } else { Permission::Recv };
        let Some(conn) = self.connections.get_mut(&socket) else {
            return;
        };
        let user = conn.user.clone().unwrap_or_default();
        let role = conn.role.clone().unwrap_or_default();
        let volume = self.directory.volume(&user, &role, &loop_name);
        conn.set_loop_state(&loop_name, current, volume);
        self.directory.set_state(&user, &role, &loop_name, current);

        let requested = envelope
            .param_str(keys::STATE)
            .and_then(Permission::parse)
            .unwrap_or(current);

        if requested == Permission::None {
            // talk-off confirmed, now leave the loop under the same id
            if !self.suspend(socket, envelope) {
                self.drop_connection(socket, true, true);
                return;
            }
            if !self.backend.leave_loop(id, &session, &loop_name) {
                self.drop_connection(socket, true, true);
            }
            return;
        }

        let participants = self
            .loops
            .get(&loop_name)
            .map(|state| state.participants_json())
            .unwrap_or_else(|| serde_json::Value::Array(vec![]));

        self.switch_loop_broadcast(&loop_name, Some(&user), Some(&role), current);
        self.switch_loop_user_broadcast(&user, &loop_name, current);
        self.send_success(
            socket,
            &envelope,
            serde_json::json!({
                keys::PARTICIPANTS: participants,
                keys::STATE: current.as_str(),
                keys::LOOP: loop_name,
            }),
        );
    }

    /// `switch_loop_volume`: `{loop, volume in 0..=100}`.
    pub(super) fn client_switch_loop_volume(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let (Some(user), Some(_role)) = (conn.user.clone(), conn.role.clone()) else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };
        let session = conn.session.clone();

        let id = envelope.id;
        let loop_name = envelope.param_str(keys::LOOP).map(str::to_string);
        let volume = envelope.param_u64(keys::VOLUME);
        let (Some(id), Some(loop_name), Some(volume)) = (id, loop_name, volume) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };
        if volume > 100 {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        }
        let Some(session) = session else {
            self.send_error(socket, &envelope, ErrorCode::SessionUnknown);
            return;
        };

        if !self
            .backend
            .set_loop_volume(id, &session, &loop_name, volume as u8)
        {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
            return;
        }

        // other connections of the same user learn the change right away
        self.switch_volume_user_broadcast(&user, &loop_name, volume as u8);
    }

    /// Backend confirmed a volume change.
    pub(super) fn on_volume_set(
        &mut self,
        id: Uuid,
        _session: String,
        loop_name: String,
        volume: u8,
        outcome: Outcome,
    ) {
        let Some(pending) = self.correlator.unset(&id) else {
            return;
        };
        let socket = pending.socket;
        let envelope = pending.payload;

        if !outcome.is_ok() {
            self.send(socket, &envelope.outcome_response(&outcome));
            return;
        }

        let Some(conn) = self.connections.get_mut(&socket) else {
            return;
        };
        let user = conn.user.clone().unwrap_or_default();
        let role = conn.role.clone().unwrap_or_default();
        if let Some(participation) = conn.loops.get_mut(&loop_name) {
            participation.volume = volume;
        }
        self.directory.set_volume(&user, &role, &loop_name, volume);

        self.send_success(
            socket,
            &envelope,
            serde_json::json!({
                keys::VOLUME: volume,
                keys::LOOP: loop_name,
            }),
        );
    }

    /// `talking`: PTT activity on a loop the role may send on.
    pub(super) fn client_talking(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let (Some(user), Some(role)) = (conn.user.clone(), conn.role.clone()) else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };

        let loop_name = envelope.param_str(keys::LOOP).map(str::to_string);
        let state = envelope.param(keys::STATE).and_then(|s| s.as_bool());
        let (Some(_), Some(loop_name), Some(on)) = (envelope.id, loop_name, state) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        if self.directory.permission(&role, &loop_name) != Permission::Send {
            self.send_error(socket, &envelope, ErrorCode::Permission);
            return;
        }

        self.recorder.ptt(&user, &role, &loop_name, on);

        let client = envelope.client.clone();
        self.send_success(
            socket,
            &envelope,
            serde_json::json!({
                keys::USER: user,
                keys::ROLE: role,
                keys::LOOP: loop_name,
                keys::STATE: on,
            }),
        );
        self.talking_broadcast(&loop_name, &user, &role, on, client.as_deref());
    }
}
