//! Media setup: ICE session lifecycle and mixer acquisition.
//!
//! ICE completion and mixer acquisition run concurrently; the client is
//! told `media_ready` exactly once, when both have happened. If mixer
//! acquisition fails after ICE completed, the ICE session is released and
//! the connection is dropped.

use uuid::Uuid;
use voxloop_infra_common::{ErrorCode, Outcome};
use voxloop_signaling_core::backend::MixerForward;
use voxloop_signaling_core::envelope::keys;
use voxloop_signaling_core::frontend::{CandidateInfo, MediaKind};
use voxloop_signaling_core::{ClientSocket, Envelope};

use super::SessionController;
use crate::config::DEFAULT_SDP;
use crate::events::{BackendEvent, FrontendEvent};

impl SessionController {
    /// `media`: SDP exchange with the ICE frontend.
    pub(super) fn client_media(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if !conn.authenticated() {
            self.drop_connection(socket, true, true);
            return;
        }
        let session = conn.session.clone();

        let Some(id) = envelope.id else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            self.drop_connection(socket, true, true);
            return;
        };

        let kind = envelope
            .param_str(keys::TYPE)
            .and_then(MediaKind::from_str);
        let sdp = envelope.param_str(keys::SDP).map(str::to_string);

        let issued = match kind {
            Some(MediaKind::Request) => self.frontend.create_session(id, DEFAULT_SDP),
            Some(kind @ (MediaKind::Offer | MediaKind::Answer)) => {
                let Some(sdp) = sdp else {
                    self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
                    self.drop_connection(socket, true, true);
                    return;
                };
                let Some(session) = session else {
                    self.send_error(socket, &envelope, ErrorCode::SessionUnknown);
                    self.drop_connection(socket, true, true);
                    return;
                };
                self.frontend.update_session(id, &session, kind, &sdp)
            }
            None => {
                self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
                self.drop_connection(socket, true, true);
                return;
            }
        };

        if !issued {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            self.drop_connection(socket, true, true);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    /// `candidate`: trickle one ICE candidate to the frontend.
    pub(super) fn client_candidate(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if !conn.authenticated() {
            self.drop_connection(socket, true, true);
            return;
        }
        let session = conn.session.clone();

        let Some(id) = envelope.id else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            self.drop_connection(socket, true, true);
            return;
        };
        let info: Option<CandidateInfo> = envelope
            .parameter
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok());
        let Some(info) = info.filter(|i| !i.candidate.is_empty() && !i.ufrag.is_empty()) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            self.drop_connection(socket, true, true);
            return;
        };
        let Some(session) = session else {
            self.send_error(socket, &envelope, ErrorCode::SessionUnknown);
            self.drop_connection(socket, true, true);
            return;
        };

        if !self.frontend.candidate(id, &session, &info) {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            self.drop_connection(socket, true, true);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    /// `end_of_candidates`.
    pub(super) fn client_end_of_candidates(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if !conn.authenticated() {
            self.drop_connection(socket, true, true);
            return;
        }
        let session = conn.session.clone();

        let Some(id) = envelope.id else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            self.drop_connection(socket, true, true);
            return;
        };
        let Some(session) = session else {
            self.send_error(socket, &envelope, ErrorCode::SessionUnknown);
            self.drop_connection(socket, true, true);
            return;
        };

        if !self.frontend.end_of_candidates(id, &session) {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            self.drop_connection(socket, true, true);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    pub(super) fn on_frontend_event(&mut self, event: FrontendEvent) {
        match event {
            FrontendEvent::SessionCreated {
                id,
                session,
                kind,
                sdp,
                forward,
                outcome,
            } => self.on_session_created(id, session, kind, sdp, forward, outcome),
            FrontendEvent::SessionCompleted { session, success } => {
                self.on_session_completed(&session, success)
            }
            FrontendEvent::SessionUpdated { id, outcome, .. } => {
                self.on_simple_frontend_reply(id, outcome)
            }
            FrontendEvent::CandidateHandled { id, outcome }
            | FrontendEvent::EndOfCandidatesHandled { id, outcome } => {
                self.on_simple_frontend_reply(id, outcome)
            }
            FrontendEvent::TalkSwitched {
                id,
                session,
                loop_name,
                on,
                outcome,
            } => self.on_talk_switched(id, session, loop_name, on, outcome),
            FrontendEvent::SessionDropped { session } => {
                if let Some(socket) = self.socket_of_session(&session) {
                    self.drop_connection(socket, false, true);
                }
            }
        }
    }

    fn on_session_created(
        &mut self,
        id: Uuid,
        session: String,
        kind: MediaKind,
        sdp: String,
        forward: MixerForward,
        outcome: Outcome,
    ) {
        let Some(pending) = self.correlator.unset(&id) else {
            // original request timed out; release an orphaned session
            if outcome.is_ok() {
                tracing::debug!(session, "releasing ICE session created after timeout");
                self.frontend.drop_session(Uuid::new_v4(), &session);
            }
            return;
        };
        let socket = pending.socket;
        let envelope = pending.payload;

        if !outcome.is_ok() {
            self.send(socket, &envelope.outcome_response(&outcome));
            return;
        }

        self.media_sessions.insert(session.clone(), socket);
        match self.connections.get_mut(&socket) {
            Some(conn) => conn.session = Some(session.clone()),
            None => {
                self.media_sessions.remove(&session);
                self.frontend.drop_session(Uuid::new_v4(), &session);
                return;
            }
        }

        if !self.backend.acquire_mixer(id, &session, &forward) {
            tracing::error!(session, "failed to request mixer acquisition");
            self.media_sessions.remove(&session);
            self.frontend.drop_session(Uuid::new_v4(), &session);
            self.drop_connection(socket, false, false);
            return;
        }

        self.send_success(
            socket,
            &envelope,
            serde_json::json!({
                keys::TYPE: kind,
                keys::SDP: sdp,
            }),
        );
    }

    fn on_session_completed(&mut self, session: &str, success: bool) {
        let Some(socket) = self.socket_of_session(session) else {
            return;
        };
        let Some(conn) = self.connections.get_mut(&socket) else {
            return;
        };
        if success && conn.ice_complete {
            return;
        }
        conn.ice_complete = true;

        if !success {
            tracing::error!(session, "ICE session failed");
            self.drop_connection(socket, false, true);
            return;
        }
        self.announce_media_ready(socket);
    }

    fn on_simple_frontend_reply(&mut self, id: Uuid, outcome: Outcome) {
        let Some(pending) = self.correlator.unset(&id) else {
            // response for a request that already timed out
            return;
        };
        let response = pending.payload.outcome_response(&outcome);
        self.send(pending.socket, &response);
    }

    pub(super) fn on_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::MixerAcquired {
                id,
                session,
                outcome,
            } => self.on_mixer_acquired(id, session, outcome),
            BackendEvent::MixerReleased {
                session, outcome, ..
            } => {
                if !outcome.is_ok() {
                    tracing::error!(session, %outcome, "mixer release failed");
                } else if let Some(socket) = self.socket_of_session(&session) {
                    self.drop_connection(socket, true, false);
                }
            }
            BackendEvent::MixerLost { session } => {
                tracing::error!(session, "mixer lost");
                if let Some(socket) = self.socket_of_session(&session) {
                    // the mixer side is already gone, leave it untouched
                    self.drop_connection(socket, true, false);
                }
            }
            BackendEvent::LoopJoined {
                id,
                session,
                loop_name,
                outcome,
            } => self.on_loop_joined(id, session, loop_name, outcome),
            BackendEvent::LoopLeft {
                id,
                session,
                loop_name,
                outcome,
            } => self.on_loop_left(id, session, loop_name, outcome),
            BackendEvent::VolumeSet {
                id,
                session,
                loop_name,
                volume,
                outcome,
            } => self.on_volume_set(id, session, loop_name, volume, outcome),
            BackendEvent::State { id, state } => {
                let Some(pending) = self.correlator.unset(&id) else {
                    return;
                };
                let response = pending
                    .payload
                    .success_response(serde_json::json!({ keys::BACKEND: state }));
                self.send(pending.socket, &response);
            }
        }
    }

    /// Management surface: fetch the state of the mixer behind a
    /// connection. The backend reply resolves through
    /// [`BackendEvent::State`] into a `get_state` response envelope.
    pub fn request_mixer_state(&mut self, socket: ClientSocket) -> bool {
        let Some(conn) = self.connections.get(&socket) else {
            return false;
        };
        let Some(session) = conn.session.clone() else {
            return false;
        };
        let envelope = Envelope::request(
            "get_state",
            serde_json::json!({ keys::SESSION: session }),
        );
        let id = envelope.id.expect("fresh request has an id");
        if !self.backend.get_state(id, &session) {
            return false;
        }
        self.suspend(socket, envelope)
    }

    fn on_mixer_acquired(&mut self, id: Uuid, session: String, outcome: Outcome) {
        // acquisition is matched by session, not by a correlator entry;
        // drop a stale correlator entry if one exists
        let _ = self.correlator.unset(&id);

        let Some(socket) = self.socket_of_session(&session) else {
            // connection is gone, give the mixer back
            self.backend.release_mixer(Uuid::new_v4(), &session);
            return;
        };

        if !outcome.is_ok() {
            tracing::error!(session, %outcome, "mixer acquisition failed");
            self.drop_connection(socket, true, false);
            return;
        }

        if let Some(conn) = self.connections.get_mut(&socket) {
            conn.mixer_acquired = true;
        }
        self.announce_media_ready(socket);
    }
}
