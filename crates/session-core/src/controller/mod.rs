//! The session controller.
//!
//! One instance owns all signalling state and consumes the mailbox on a
//! single task. Handlers either answer synchronously or suspend the
//! request in the correlator and return to the loop; collaborator
//! responses re-enter through [`ControllerEvent`] variants.

mod auth;
mod calls;
mod data;
mod info;
mod loops;
mod media;

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;
use voxloop_infra_common::ErrorCode;
use voxloop_signaling_core::envelope::MessageType;
use voxloop_signaling_core::{ClientSocket, Correlator, Envelope};

use crate::broadcast::{BroadcastRegistry, Scope};
use crate::collab::{
    ClientSink, Collaborators, IceFrontend, LdapAuthenticator, MixerBackend, Recorder, SipGateway,
};
use crate::config::ControllerConfig;
use crate::connection::Connection;
use crate::directory::Directory;
use crate::events::ControllerEvent;
use crate::loops::LoopState;
use crate::permission::Permission;
use crate::session_store::UserSessionStore;

pub struct SessionController {
    config: ControllerConfig,
    sink: Box<dyn ClientSink>,
    backend: Box<dyn MixerBackend>,
    frontend: Box<dyn IceFrontend>,
    sip: Box<dyn SipGateway>,
    ldap: Option<Box<dyn LdapAuthenticator>>,
    recorder: Box<dyn Recorder>,
    directory: Box<dyn Directory>,

    connections: HashMap<ClientSocket, Connection>,
    /// media session id -> owning socket
    media_sessions: HashMap<String, ClientSocket>,
    loops: HashMap<String, LoopState>,
    correlator: Correlator<Envelope>,
    broadcasts: BroadcastRegistry,
    user_sessions: UserSessionStore,
}

impl SessionController {
    pub fn new(config: ControllerConfig, collaborators: Collaborators) -> Self {
        let user_sessions = UserSessionStore::new(
            config.sessions_dir.as_deref(),
            config.session_max_lifetime_usec,
        );
        Self {
            config,
            sink: collaborators.sink,
            backend: collaborators.backend,
            frontend: collaborators.frontend,
            sip: collaborators.sip,
            ldap: collaborators.ldap,
            recorder: collaborators.recorder,
            directory: collaborators.directory,
            connections: HashMap::new(),
            media_sessions: HashMap::new(),
            loops: HashMap::new(),
            correlator: Correlator::new(),
            broadcasts: BroadcastRegistry::new(),
            user_sessions,
        }
    }

    /// Drive the controller until the mailbox closes.
    pub async fn run(mut self, mut mailbox: mpsc::Receiver<ControllerEvent>) {
        let mut eviction = tokio::time::interval(self.config.session_eviction_interval());
        eviction.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            let deadline = self.correlator.next_deadline();
            tokio::select! {
                event = mailbox.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = eviction.tick() => {
                    self.user_sessions.evict_expired(voxloop_infra_common::now_usecs());
                }
                _ = sleep_until_opt(deadline) => {
                    self.fire_timeouts();
                }
            }
        }
        tracing::info!("controller mailbox closed, shutting down");
    }

    /// Process one event. All state mutation funnels through here.
    pub fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Client { socket, envelope } => {
                self.dispatch_client(socket, envelope)
            }
            ControllerEvent::ClientClosed { socket } => {
                tracing::debug!(%socket, "client socket closed");
                if self.connections.contains_key(&socket) {
                    self.drop_connection(socket, true, true);
                }
            }
            ControllerEvent::Backend(event) => self.on_backend_event(event),
            ControllerEvent::Frontend(event) => self.on_frontend_event(event),
            ControllerEvent::Ldap { id, granted } => self.on_ldap_result(id, granted),
            ControllerEvent::Sip(event) => self.on_sip_event(event),
            ControllerEvent::Recorder(event) => self.on_recorder_event(event),
            ControllerEvent::VoiceActivity { loop_name, on } => {
                self.on_voice_activity(&loop_name, on)
            }
        }
    }

    fn dispatch_client(&mut self, socket: ClientSocket, envelope: Envelope) {
        self.connections
            .entry(socket)
            .or_insert_with(|| Connection::new(socket));

        match envelope.event.as_str() {
            "login" | "authenticate" => self.client_login(socket, envelope),
            "logout" => self.client_logout(socket, envelope),
            "update_login" => self.client_update_login(socket, envelope),
            "authorize" => self.client_authorize(socket, envelope),
            "media" => self.client_media(socket, envelope),
            "candidate" => self.client_candidate(socket, envelope),
            "end_of_candidates" => self.client_end_of_candidates(socket, envelope),
            "get" => self.client_get(socket, envelope),
            "user_roles" => self.client_user_roles(socket, envelope),
            "role_loops" => self.client_role_loops(socket, envelope),
            "switch_loop_state" => self.client_switch_loop_state(socket, envelope),
            "switch_loop_volume" => self.client_switch_loop_volume(socket, envelope),
            "talking" => self.client_talking(socket, envelope),
            "call" => self.client_call(socket, envelope),
            "hangup" => self.client_hangup(socket, envelope),
            "permit_call" => self.client_permit_call(socket, envelope),
            "revoke_call" => self.client_revoke_call(socket, envelope),
            "list_calls" => self.client_list_calls(socket, envelope),
            "list_call_permissions" => self.client_list_call_permissions(socket, envelope),
            "list_sip_status" | "sip" => self.client_sip_status(socket, envelope),
            "get_recording" => self.client_get_recording(socket, envelope),
            "register" => self.client_register(socket, envelope),
            "set_keyset_layout" => self.client_set_keyset_layout(socket, envelope),
            "get_keyset_layout" => self.client_get_keyset_layout(socket, envelope),
            "set_user_data" => self.client_set_user_data(socket, envelope),
            "get_user_data" => self.client_get_user_data(socket, envelope),
            other => {
                tracing::debug!(%socket, event = other, "unsupported event, dropping connection");
                self.drop_connection(socket, true, true);
            }
        }
    }

    // ------------------------------------------------------------------
    // plumbing shared by the handler modules

    pub(crate) fn send(&self, socket: ClientSocket, envelope: &Envelope) -> bool {
        self.sink.send(socket, envelope)
    }

    pub(crate) fn send_success(
        &self,
        socket: ClientSocket,
        request: &Envelope,
        response: serde_json::Value,
    ) -> bool {
        self.send(socket, &request.success_response(response))
    }

    pub(crate) fn send_error(
        &self,
        socket: ClientSocket,
        request: &Envelope,
        code: ErrorCode,
    ) -> bool {
        self.send(socket, &request.error_response(code))
    }

    /// Park `envelope` in the correlator under its own id. `false` means
    /// the request cannot suspend (missing id or id collision).
    pub(crate) fn suspend(&mut self, socket: ClientSocket, envelope: Envelope) -> bool {
        let Some(id) = envelope.id else {
            tracing::error!(%socket, event = %envelope.event, "cannot suspend request without id");
            return false;
        };
        let deadline = Instant::now() + self.config.response_timeout();
        match self.correlator.set(id, socket, envelope, deadline) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(%socket, error = %e, "failed to suspend request");
                false
            }
        }
    }

    fn fire_timeouts(&mut self) {
        self.fire_due_timeouts(Instant::now());
    }

    /// Evict every pending request whose deadline passed: the originator
    /// gets a timeout error and its connection is dropped. Driven by
    /// [`SessionController::run`]; public for external drivers.
    pub fn fire_due_timeouts(&mut self, now: Instant) {
        for (id, pending) in self.correlator.expired(now) {
            tracing::error!(%id, socket = %pending.socket, event = %pending.payload.event,
                "async timeout, dropping connection");
            let response = pending.payload.error_response(ErrorCode::Timeout);
            self.send(pending.socket, &response);
            self.drop_connection(pending.socket, true, true);
        }
    }

    /// Tear one connection down: release media resources, cancel pending
    /// requests without firing their timeouts, leave every loop (with a
    /// closing broadcast for participating loops), unsubscribe, close.
    pub(crate) fn drop_connection(
        &mut self,
        socket: ClientSocket,
        drop_frontend: bool,
        release_backend: bool,
    ) {
        let Some(conn) = self.connections.remove(&socket) else {
            self.sink.close(socket);
            return;
        };

        if let Some(session) = &conn.session {
            if drop_frontend && !self.frontend.drop_session(Uuid::new_v4(), session) {
                tracing::error!(session, "failed to drop ICE session");
            }
            if release_backend && !self.backend.release_mixer(Uuid::new_v4(), session) {
                tracing::error!(session, "failed to release mixer");
            }
            self.media_sessions.remove(session);
        }

        let cancelled = self.correlator.drop_socket(socket);
        if !cancelled.is_empty() {
            tracing::debug!(%socket, count = cancelled.len(), "cancelled pending requests");
        }
        self.broadcasts.drop_socket(socket);

        for (loop_name, participation) in &conn.loops {
            if let Some(state) = self.loops.get_mut(loop_name) {
                state.drop_participant(socket);
            }
            if participation.permission != Permission::None {
                self.switch_loop_broadcast(
                    loop_name,
                    conn.user.as_deref(),
                    conn.role.as_deref(),
                    Permission::None,
                );
            }
        }

        self.sink.close(socket);
        tracing::info!(%socket, user = conn.user.as_deref().unwrap_or("-"), "connection dropped");
    }

    pub(crate) fn socket_of_session(&self, session: &str) -> Option<ClientSocket> {
        self.media_sessions.get(session).copied()
    }

    /// Tell the client its media path is up, exactly once per setup.
    pub(crate) fn announce_media_ready(&mut self, socket: ClientSocket) {
        let Some(conn) = self.connections.get_mut(&socket) else {
            return;
        };
        if conn.media_ready() && !conn.media_ready_announced {
            conn.media_ready_announced = true;
            let message = Envelope::message("media_ready").with_type(MessageType::Unicast);
            self.sink.send(socket, &message);
        }
    }

    // ------------------------------------------------------------------
    // broadcasts

    pub(crate) fn switch_loop_broadcast(
        &self,
        loop_name: &str,
        user: Option<&str>,
        role: Option<&str>,
        state: Permission,
    ) {
        let mut parameter = serde_json::json!({
            "loop": loop_name,
            "state": state.as_str(),
        });
        if let Some(user) = user {
            parameter["user"] = user.into();
        }
        if let Some(role) = role {
            parameter["role"] = role.into();
        }
        let message =
            Envelope::request("switch_loop_state", parameter).with_type(MessageType::LoopBroadcast);
        self.broadcasts
            .send(Scope::Loop, loop_name, &message, self.sink.as_ref());
    }

    pub(crate) fn switch_loop_user_broadcast(&self, user: &str, loop_name: &str, state: Permission) {
        let message = Envelope::request(
            "switch_loop_state",
            serde_json::json!({
                "loop": loop_name,
                "state": state.as_str(),
                "user": user,
            }),
        )
        .with_type(MessageType::UserBroadcast);
        self.broadcasts
            .send(Scope::User, user, &message, self.sink.as_ref());
    }

    pub(crate) fn switch_volume_user_broadcast(&self, user: &str, loop_name: &str, volume: u8) {
        let message = Envelope::request(
            "switch_loop_volume",
            serde_json::json!({
                "loop": loop_name,
                "volume": volume,
                "user": user,
            }),
        )
        .with_type(MessageType::UserBroadcast);
        self.broadcasts
            .send(Scope::User, user, &message, self.sink.as_ref());
    }

    pub(crate) fn talking_broadcast(
        &self,
        loop_name: &str,
        user: &str,
        role: &str,
        on: bool,
        client: Option<&str>,
    ) {
        let mut parameter = serde_json::json!({
            "loop": loop_name,
            "user": user,
            "role": role,
            "state": on,
        });
        if let Some(client) = client {
            parameter["client"] = client.into();
        }
        let message =
            Envelope::request("talking", parameter).with_type(MessageType::LoopBroadcast);
        self.broadcasts
            .send(Scope::Loop, loop_name, &message, self.sink.as_ref());
    }

    fn on_voice_activity(&mut self, loop_name: &str, on: bool) {
        let message = Envelope::request(
            "vad",
            serde_json::json!({ "loop": loop_name, "state": on }),
        )
        .with_type(MessageType::LoopBroadcast);
        self.broadcasts
            .send(Scope::Loop, loop_name, &message, self.sink.as_ref());
    }

    // ------------------------------------------------------------------
    // introspection (used by the test suite and status surfaces)

    pub fn connection(&self, socket: ClientSocket) -> Option<&Connection> {
        self.connections.get(&socket)
    }

    pub fn pending_requests(&self) -> usize {
        self.correlator.len()
    }

    pub fn loop_state(&self, name: &str) -> Option<&LoopState> {
        self.loops.get(name)
    }

    pub fn is_subscribed(&self, scope: Scope, key: &str, socket: ClientSocket) -> bool {
        self.broadcasts.is_subscribed(scope, key, socket)
    }

    pub fn user_sessions(&self) -> &UserSessionStore {
        &self.user_sessions
    }

    pub fn user_sessions_mut(&mut self) -> &mut UserSessionStore {
        &mut self.user_sessions
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
