//! Shared controller test harness: recording collaborator doubles and
//! canned request flows.

// not every test binary uses every helper
#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use uuid::Uuid;
use voxloop_infra_common::Outcome;
use voxloop_session_core::{
    BackendEvent, Collaborators, ControllerConfig, ControllerEvent, FrontendEvent,
    MemoryDirectory, Permission, SessionController,
};
use voxloop_signaling_core::backend::{LoopData, MixerForward};
use voxloop_signaling_core::frontend::{CandidateInfo, MediaKind};
use voxloop_signaling_core::{ClientSocket, Envelope};
use voxloop_storage_core::RecordingFilter;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Acquire { id: Uuid, session: String },
    Release { session: String },
    Join { id: Uuid, session: String, loop_name: String, volume: u8 },
    Leave { id: Uuid, session: String, loop_name: String },
    Volume { id: Uuid, session: String, loop_name: String, volume: u8 },
    State { id: Uuid, session: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrontendCall {
    CreateSession { id: Uuid },
    UpdateSession { id: Uuid, session: String, kind: MediaKind },
    Candidate { id: Uuid, session: String },
    EndOfCandidates { id: Uuid, session: String },
    Talk { id: Uuid, session: String, loop_name: String, on: bool },
    DropSession { session: String },
}

#[derive(Default)]
pub struct Recordings {
    pub sent: Mutex<Vec<(ClientSocket, Envelope)>>,
    pub closed: Mutex<Vec<ClientSocket>>,
    pub backend: Mutex<Vec<BackendCall>>,
    pub frontend: Mutex<Vec<FrontendCall>>,
    pub ldap: Mutex<Vec<(Uuid, String)>>,
    pub recorder_queries: Mutex<Vec<(Uuid, RecordingFilter, u32, u32)>>,
    pub participation: Mutex<Vec<(String, String, Permission)>>,
    pub authenticate_calls: Mutex<u32>,
}

pub struct Harness {
    pub controller: SessionController,
    pub log: Arc<Recordings>,
}

struct Sink(Arc<Recordings>);
impl voxloop_session_core::ClientSink for Sink {
    fn send(&self, socket: ClientSocket, envelope: &Envelope) -> bool {
        self.0.sent.lock().unwrap().push((socket, envelope.clone()));
        true
    }
    fn close(&self, socket: ClientSocket) {
        self.0.closed.lock().unwrap().push(socket);
    }
}

struct Backend(Arc<Recordings>);
impl voxloop_session_core::MixerBackend for Backend {
    fn acquire_mixer(&self, id: Uuid, session: &str, _forward: &MixerForward) -> bool {
        self.0.backend.lock().unwrap().push(BackendCall::Acquire {
            id,
            session: session.to_string(),
        });
        true
    }
    fn release_mixer(&self, _id: Uuid, session: &str) -> bool {
        self.0.backend.lock().unwrap().push(BackendCall::Release {
            session: session.to_string(),
        });
        true
    }
    fn join_loop(&self, id: Uuid, session: &str, data: &LoopData) -> bool {
        self.0.backend.lock().unwrap().push(BackendCall::Join {
            id,
            session: session.to_string(),
            loop_name: data.name.clone(),
            volume: data.volume,
        });
        true
    }
    fn leave_loop(&self, id: Uuid, session: &str, loop_name: &str) -> bool {
        self.0.backend.lock().unwrap().push(BackendCall::Leave {
            id,
            session: session.to_string(),
            loop_name: loop_name.to_string(),
        });
        true
    }
    fn set_loop_volume(&self, id: Uuid, session: &str, loop_name: &str, volume: u8) -> bool {
        self.0.backend.lock().unwrap().push(BackendCall::Volume {
            id,
            session: session.to_string(),
            loop_name: loop_name.to_string(),
            volume,
        });
        true
    }
    fn get_state(&self, id: Uuid, session: &str) -> bool {
        self.0.backend.lock().unwrap().push(BackendCall::State {
            id,
            session: session.to_string(),
        });
        true
    }
}

struct Frontend(Arc<Recordings>);
impl voxloop_session_core::IceFrontend for Frontend {
    fn create_session(&self, id: Uuid, _sdp: &str) -> bool {
        self.0
            .frontend
            .lock()
            .unwrap()
            .push(FrontendCall::CreateSession { id });
        true
    }
    fn update_session(&self, id: Uuid, session: &str, kind: MediaKind, _sdp: &str) -> bool {
        self.0.frontend.lock().unwrap().push(FrontendCall::UpdateSession {
            id,
            session: session.to_string(),
            kind,
        });
        true
    }
    fn candidate(&self, id: Uuid, session: &str, _info: &CandidateInfo) -> bool {
        self.0.frontend.lock().unwrap().push(FrontendCall::Candidate {
            id,
            session: session.to_string(),
        });
        true
    }
    fn end_of_candidates(&self, id: Uuid, session: &str) -> bool {
        self.0
            .frontend
            .lock()
            .unwrap()
            .push(FrontendCall::EndOfCandidates {
                id,
                session: session.to_string(),
            });
        true
    }
    fn talk(&self, id: Uuid, session: &str, on: bool, data: &LoopData) -> bool {
        self.0.frontend.lock().unwrap().push(FrontendCall::Talk {
            id,
            session: session.to_string(),
            loop_name: data.name.clone(),
            on,
        });
        true
    }
    fn drop_session(&self, _id: Uuid, session: &str) -> bool {
        self.0.frontend.lock().unwrap().push(FrontendCall::DropSession {
            session: session.to_string(),
        });
        true
    }
}

struct Sip;
impl voxloop_session_core::SipGateway for Sip {
    fn create_call(&self, _id: Uuid, _loop: &str, _destination: &str, _from: &str) -> bool {
        true
    }
    fn terminate_call(&self, _id: Uuid, _call_id: &str) -> bool {
        true
    }
    fn permit_call(&self, _id: Uuid, _caller: &str, _callee: &str, _loop: &str) -> bool {
        true
    }
    fn revoke_call(&self, _id: Uuid, _caller: &str, _callee: &str, _loop: &str) -> bool {
        true
    }
    fn list_calls(&self, _id: Uuid) -> bool {
        true
    }
    fn list_permissions(&self, _id: Uuid) -> bool {
        true
    }
    fn connected(&self) -> bool {
        true
    }
}

struct Ldap(Arc<Recordings>);
impl voxloop_session_core::LdapAuthenticator for Ldap {
    fn authenticate(&self, id: Uuid, user: &str, _password: &str) -> bool {
        self.0.ldap.lock().unwrap().push((id, user.to_string()));
        true
    }
}

struct RecorderDouble(Arc<Recordings>);
impl voxloop_session_core::Recorder for RecorderDouble {
    fn participation(&self, user: &str, _role: &str, loop_name: &str, state: Permission) {
        self.0
            .participation
            .lock()
            .unwrap()
            .push((user.to_string(), loop_name.to_string(), state));
    }
    fn ptt(&self, _user: &str, _role: &str, _loop: &str, _on: bool) {}
    fn get_recordings(&self, id: Uuid, filter: RecordingFilter, max: u32, offset: u32) -> bool {
        self.0
            .recorder_queries
            .lock()
            .unwrap()
            .push((id, filter, max, offset));
        true
    }
}

/// Directory double counting authenticate calls on top of the in-memory
/// implementation.
struct CountingDirectory {
    inner: MemoryDirectory,
    log: Arc<Recordings>,
}

impl voxloop_session_core::Directory for CountingDirectory {
    fn authenticate(&self, user: &str, password: &str) -> bool {
        *self.log.authenticate_calls.lock().unwrap() += 1;
        self.inner.authenticate(user, password)
    }
    fn authorize(&self, user: &str, role: &str) -> bool {
        self.inner.authorize(user, role)
    }
    fn user_roles(&self, user: &str) -> Option<Vec<String>> {
        self.inner.user_roles(user)
    }
    fn role_loops(
        &self,
        user: &str,
        role: &str,
    ) -> Option<std::collections::BTreeMap<String, voxloop_session_core::LoopGrant>> {
        self.inner.role_loops(user, role)
    }
    fn permission(&self, role: &str, loop_name: &str) -> Permission {
        self.inner.permission(role, loop_name)
    }
    fn multicast_group(&self, loop_name: &str) -> Option<voxloop_rtp_core::MulticastGroup> {
        self.inner.multicast_group(loop_name)
    }
    fn volume(&self, user: &str, role: &str, loop_name: &str) -> u8 {
        self.inner.volume(user, role, loop_name)
    }
    fn set_state(&mut self, user: &str, role: &str, loop_name: &str, state: Permission) {
        self.inner.set_state(user, role, loop_name, state)
    }
    fn set_volume(&mut self, user: &str, role: &str, loop_name: &str, volume: u8) {
        self.inner.set_volume(user, role, loop_name, volume)
    }
    fn user_entity(&self, user: &str) -> Option<serde_json::Value> {
        self.inner.user_entity(user)
    }
    fn keyset_layout(&self, user: &str, name: &str) -> Option<serde_json::Value> {
        self.inner.keyset_layout(user, name)
    }
    fn set_keyset_layout(&mut self, user: &str, name: &str, layout: serde_json::Value) {
        self.inner.set_keyset_layout(user, name, layout)
    }
    fn user_data(&self, user: &str) -> Option<serde_json::Value> {
        self.inner.user_data(user)
    }
    fn set_user_data(&mut self, user: &str, data: serde_json::Value) {
        self.inner.set_user_data(user, data)
    }
}

pub fn directory() -> MemoryDirectory {
    MemoryDirectory::new()
        .with_user("alice", "secret", &["operator"])
        .with_user("bob", "hunter2", &["operator", "observer"])
        .with_grant("operator", "L1", Permission::Send)
        .with_grant("operator", "L2", Permission::Recv)
        .with_grant("observer", "L1", Permission::Recv)
        .with_loop("L1", Ipv4Addr::new(239, 1, 1, 1))
        .with_loop("L2", Ipv4Addr::new(239, 1, 1, 2))
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        let log = Arc::new(Recordings::default());
        let controller = SessionController::new(
            config,
            Collaborators {
                sink: Box::new(Sink(log.clone())),
                backend: Box::new(Backend(log.clone())),
                frontend: Box::new(Frontend(log.clone())),
                sip: Box::new(Sip),
                ldap: Some(Box::new(Ldap(log.clone()))),
                recorder: Box::new(RecorderDouble(log.clone())),
                directory: Box::new(CountingDirectory {
                    inner: directory(),
                    log: log.clone(),
                }),
            },
        );
        Self { controller, log }
    }

    pub fn request(&mut self, socket: u64, event: &str, parameter: serde_json::Value) -> Envelope {
        let envelope = Envelope::request(event, parameter);
        self.controller.handle(ControllerEvent::Client {
            socket: ClientSocket(socket),
            envelope: envelope.clone(),
        });
        envelope
    }

    pub fn request_with_client(
        &mut self,
        socket: u64,
        event: &str,
        client: &str,
        parameter: serde_json::Value,
    ) -> Envelope {
        let envelope = Envelope::request(event, parameter).with_client(client);
        self.controller.handle(ControllerEvent::Client {
            socket: ClientSocket(socket),
            envelope: envelope.clone(),
        });
        envelope
    }

    /// The last envelope sent to `socket`.
    pub fn last_sent(&self, socket: u64) -> Option<Envelope> {
        self.log
            .sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _)| *s == ClientSocket(socket))
            .map(|(_, e)| e.clone())
    }

    /// The response to `request` delivered on `socket`, if any.
    pub fn response_to(&self, socket: u64, request: &Envelope) -> Option<Envelope> {
        self.log
            .sent
            .lock()
            .unwrap()
            .iter()
            .find(|(s, e)| *s == ClientSocket(socket) && e.id == request.id && e.is_response())
            .map(|(_, e)| e.clone())
    }

    /// All broadcast envelopes of `event` with the given type on `socket`.
    pub fn sent_events(&self, socket: u64, event: &str) -> Vec<Envelope> {
        self.log
            .sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, e)| *s == ClientSocket(socket) && e.event == event)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn was_closed(&self, socket: u64) -> bool {
        self.log.closed.lock().unwrap().contains(&ClientSocket(socket))
    }

    pub fn login(&mut self, socket: u64, user: &str, password: &str) -> Envelope {
        self.request_with_client(
            socket,
            "login",
            &format!("client-{}", socket),
            serde_json::json!({ "user": user, "password": password }),
        )
    }

    pub fn authorize(&mut self, socket: u64, role: &str) {
        self.request(socket, "authorize", serde_json::json!({ "role": role }));
    }

    /// Walk one socket through the full media setup: ICE session plus
    /// mixer acquisition, ICE completed.
    pub fn media_ready(&mut self, socket: u64, session: &str) -> Envelope {
        let media = self.request(socket, "media", serde_json::json!({ "type": "request" }));
        let id = media.id.unwrap();
        self.controller
            .handle(ControllerEvent::Frontend(FrontendEvent::SessionCreated {
                id,
                session: session.to_string(),
                kind: MediaKind::Offer,
                sdp: "v=0\r\n".to_string(),
                forward: MixerForward {
                    host: "10.0.0.1".to_string(),
                    port: 40_000,
                    ssrc: 1234,
                    payload_type: 100,
                },
                outcome: Outcome::ok(),
            }));
        self.controller
            .handle(ControllerEvent::Backend(BackendEvent::MixerAcquired {
                id,
                session: session.to_string(),
                outcome: Outcome::ok(),
            }));
        self.controller
            .handle(ControllerEvent::Frontend(FrontendEvent::SessionCompleted {
                session: session.to_string(),
                success: true,
            }));
        media
    }

    /// Login, authorize and complete media setup.
    pub fn operator_ready(&mut self, socket: u64, user: &str, password: &str, session: &str) {
        self.login(socket, user, password);
        self.authorize(socket, "operator");
        self.media_ready(socket, session);
    }
}
