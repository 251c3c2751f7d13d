//! The controller mailbox.
//!
//! Every stimulus (a decoded client request, a collaborator response, an
//! out-of-band notification) enters the controller as one of these
//! events, serialized on the single controller task.

use uuid::Uuid;
use voxloop_infra_common::Outcome;
use voxloop_signaling_core::backend::MixerForward;
use voxloop_signaling_core::frontend::MediaKind;
use voxloop_signaling_core::{ClientSocket, Envelope};
use voxloop_storage_core::{QueryPage, Recording};

#[derive(Debug)]
pub enum ControllerEvent {
    /// A decoded request from a client socket.
    Client {
        socket: ClientSocket,
        envelope: Envelope,
    },
    /// The transport closed a client socket.
    ClientClosed { socket: ClientSocket },
    Backend(BackendEvent),
    Frontend(FrontendEvent),
    /// Directory bind result for a suspended login.
    Ldap { id: Uuid, granted: bool },
    Sip(SipEvent),
    Recorder(RecorderEvent),
    /// Voice activity detected on a loop (external VAD module).
    VoiceActivity { loop_name: String, on: bool },
}

/// Responses and notifications from the mixer backend.
#[derive(Debug)]
pub enum BackendEvent {
    MixerAcquired {
        id: Uuid,
        session: String,
        outcome: Outcome,
    },
    MixerReleased {
        id: Uuid,
        session: String,
        outcome: Outcome,
    },
    /// Out-of-band: the mixer behind `session` is gone.
    MixerLost { session: String },
    LoopJoined {
        id: Uuid,
        session: String,
        loop_name: String,
        outcome: Outcome,
    },
    LoopLeft {
        id: Uuid,
        session: String,
        loop_name: String,
        outcome: Outcome,
    },
    VolumeSet {
        id: Uuid,
        session: String,
        loop_name: String,
        volume: u8,
        outcome: Outcome,
    },
    State {
        id: Uuid,
        state: serde_json::Value,
    },
}

/// Responses and notifications from the ICE frontend.
#[derive(Debug)]
pub enum FrontendEvent {
    SessionCreated {
        id: Uuid,
        session: String,
        kind: MediaKind,
        sdp: String,
        forward: MixerForward,
        outcome: Outcome,
    },
    /// ICE negotiation finished (or failed) for `session`.
    SessionCompleted { session: String, success: bool },
    SessionUpdated {
        id: Uuid,
        session: String,
        outcome: Outcome,
    },
    CandidateHandled { id: Uuid, outcome: Outcome },
    EndOfCandidatesHandled { id: Uuid, outcome: Outcome },
    TalkSwitched {
        id: Uuid,
        session: String,
        loop_name: String,
        on: bool,
        outcome: Outcome,
    },
    /// The frontend dropped `session` (peer went away).
    SessionDropped { session: String },
}

/// Responses and notifications from the SIP gateway.
#[derive(Debug)]
pub enum SipEvent {
    CallInitiated {
        id: Uuid,
        call_id: Option<String>,
        outcome: Outcome,
    },
    CallTerminated { id: Uuid, outcome: Outcome },
    PermitHandled { id: Uuid, outcome: Outcome },
    RevokeHandled { id: Uuid, outcome: Outcome },
    Calls {
        id: Uuid,
        calls: serde_json::Value,
    },
    Permissions {
        id: Uuid,
        permissions: serde_json::Value,
    },
    /// Notification: a SIP caller entered a loop.
    NewCall {
        call_id: String,
        loop_name: String,
        peer: String,
    },
    /// Notification: a SIP call ended.
    CallEnded { call_id: String, loop_name: String },
    /// Connection to the SIP service changed.
    ConnectionStatus { connected: bool },
}

/// Responses from the recorder storage.
#[derive(Debug)]
pub enum RecorderEvent {
    Recordings {
        id: Uuid,
        page: Result<QueryPage<Recording>, String>,
    },
}
