//! Interfaces of the controller's external collaborators.
//!
//! Transport, mixer backend, ICE frontend, SIP gateway, LDAP directory
//! and recorder are separate subsystems. All request methods are
//! fire-and-forget: the controller registers a correlation id, calls the
//! collaborator, and resumes when the matching [`crate::ControllerEvent`]
//! arrives on its mailbox.

use uuid::Uuid;
use voxloop_signaling_core::backend::{LoopData, MixerForward};
use voxloop_signaling_core::frontend::{CandidateInfo, MediaKind};
use voxloop_signaling_core::{ClientSocket, Envelope};
use voxloop_storage_core::RecordingFilter;

use crate::permission::Permission;

/// Outbound client transport (WebSocket in production).
pub trait ClientSink: Send {
    /// Deliver one envelope; `false` on transport failure.
    fn send(&self, socket: ClientSocket, envelope: &Envelope) -> bool;

    /// Close the underlying transport.
    fn close(&self, socket: ClientSocket);
}

/// The mixer manager.
pub trait MixerBackend: Send {
    fn acquire_mixer(&self, id: Uuid, session: &str, forward: &MixerForward) -> bool;
    fn release_mixer(&self, id: Uuid, session: &str) -> bool;
    fn join_loop(&self, id: Uuid, session: &str, data: &LoopData) -> bool;
    fn leave_loop(&self, id: Uuid, session: &str, loop_name: &str) -> bool;
    fn set_loop_volume(&self, id: Uuid, session: &str, loop_name: &str, volume: u8) -> bool;
    fn get_state(&self, id: Uuid, session: &str) -> bool;
}

/// The WebRTC/ICE proxy.
pub trait IceFrontend: Send {
    fn create_session(&self, id: Uuid, sdp: &str) -> bool;
    fn update_session(&self, id: Uuid, session: &str, kind: MediaKind, sdp: &str) -> bool;
    fn candidate(&self, id: Uuid, session: &str, info: &CandidateInfo) -> bool;
    fn end_of_candidates(&self, id: Uuid, session: &str) -> bool;
    fn talk(&self, id: Uuid, session: &str, on: bool, data: &LoopData) -> bool;
    fn drop_session(&self, id: Uuid, session: &str) -> bool;
}

/// The SIP signalling endpoint.
pub trait SipGateway: Send {
    fn create_call(&self, id: Uuid, loop_name: &str, destination: &str, from: &str) -> bool;
    fn terminate_call(&self, id: Uuid, call_id: &str) -> bool;
    fn permit_call(&self, id: Uuid, caller: &str, callee: &str, loop_name: &str) -> bool;
    fn revoke_call(&self, id: Uuid, caller: &str, callee: &str, loop_name: &str) -> bool;
    fn list_calls(&self, id: Uuid) -> bool;
    fn list_permissions(&self, id: Uuid) -> bool;
    /// Current connection status towards the SIP service.
    fn connected(&self) -> bool;
}

/// The asynchronous directory bind.
pub trait LdapAuthenticator: Send {
    fn authenticate(&self, id: Uuid, user: &str, password: &str) -> bool;
}

/// Loop recording and participation audit.
pub trait Recorder: Send {
    /// Participation state change (`Permission::None` marks leaving).
    fn participation(&self, user: &str, role: &str, loop_name: &str, state: Permission);

    /// Push-to-talk activity.
    fn ptt(&self, user: &str, role: &str, loop_name: &str, on: bool);

    /// Query recordings; the result arrives as a
    /// [`crate::RecorderEvent::Recordings`] mailbox event.
    fn get_recordings(&self, id: Uuid, filter: RecordingFilter, max: u32, offset: u32) -> bool;
}

/// Everything the controller is wired to.
pub struct Collaborators {
    pub sink: Box<dyn ClientSink>,
    pub backend: Box<dyn MixerBackend>,
    pub frontend: Box<dyn IceFrontend>,
    pub sip: Box<dyn SipGateway>,
    pub ldap: Option<Box<dyn LdapAuthenticator>>,
    pub recorder: Box<dyn Recorder>,
    pub directory: Box<dyn crate::directory::Directory>,
}
