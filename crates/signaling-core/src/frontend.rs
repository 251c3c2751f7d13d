//! Wire protocol towards the ICE frontend.
//!
//! The frontend terminates WebRTC with the user's browser and bridges
//! RTP onto the internal multicast plane. Same envelope rules as the
//! backend: requests carry a correlation `id`, replies echo it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voxloop_infra_common::Outcome;

use crate::backend::{LoopData, MixerForward, ReplyError};
use crate::envelope::{keys, Envelope};

pub const CREATE_SESSION: &str = "create_session";
pub const UPDATE_SESSION: &str = "update_session";
pub const CANDIDATE: &str = "candidate";
pub const END_OF_CANDIDATES: &str = "end_of_candidates";
pub const TALK: &str = "talk";
pub const DROP_SESSION: &str = "drop_session";

/// SDP exchange phase of a media request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Request,
    Offer,
    Answer,
}

impl MediaKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "request" => Some(MediaKind::Request),
            "offer" => Some(MediaKind::Offer),
            "answer" => Some(MediaKind::Answer),
            _ => None,
        }
    }
}

/// One trickled ICE candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub candidate: String,
    #[serde(rename = "SDPMlineIndex", default)]
    pub sdp_mline_index: u64,
    pub ufrag: String,
}

pub fn create_session(id: Uuid, sdp: &str) -> Envelope {
    Envelope::request(CREATE_SESSION, serde_json::json!({ keys::SDP: sdp })).with_id(id)
}

pub fn update_session(id: Uuid, session: &str, kind: MediaKind, sdp: &str) -> Envelope {
    Envelope::request(
        UPDATE_SESSION,
        serde_json::json!({
            keys::SESSION: session,
            keys::TYPE: kind,
            keys::SDP: sdp,
        }),
    )
    .with_id(id)
}

pub fn candidate(id: Uuid, session: &str, info: &CandidateInfo) -> Envelope {
    Envelope::request(
        CANDIDATE,
        serde_json::json!({
            keys::SESSION: session,
            "candidate": info,
        }),
    )
    .with_id(id)
}

pub fn end_of_candidates(id: Uuid, session: &str) -> Envelope {
    Envelope::request(
        END_OF_CANDIDATES,
        serde_json::json!({ keys::SESSION: session }),
    )
    .with_id(id)
}

pub fn talk(id: Uuid, session: &str, on: bool, data: &LoopData) -> Envelope {
    Envelope::request(
        TALK,
        serde_json::json!({
            keys::SESSION: session,
            keys::STATE: on,
            keys::LOOP: data,
        }),
    )
    .with_id(id)
}

pub fn drop_session(id: Uuid, session: &str) -> Envelope {
    Envelope::request(DROP_SESSION, serde_json::json!({ keys::SESSION: session })).with_id(id)
}

/// A decoded frontend reply to `create_session`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCreatedReply {
    pub id: Uuid,
    pub session: String,
    pub kind: MediaKind,
    pub sdp: String,
    /// Where the session's RTP lands inside the media plane; the mixer
    /// acquisition forwards to exactly this point.
    pub forward: MixerForward,
    pub outcome: Outcome,
}

pub fn parse_session_created(envelope: &Envelope) -> Result<SessionCreatedReply, ReplyError> {
    if !envelope.is_response() {
        return Err(ReplyError::NotAResponse);
    }
    let id = envelope.id.ok_or(ReplyError::MissingId)?;
    let response = envelope.response.as_ref();
    let session = response
        .and_then(|r| r.get(keys::SESSION)?.as_str())
        .ok_or(ReplyError::MissingSession)?
        .to_string();
    let kind = response
        .and_then(|r| r.get(keys::TYPE))
        .and_then(|t| serde_json::from_value(t.clone()).ok())
        .unwrap_or(MediaKind::Offer);
    let sdp = response
        .and_then(|r| r.get(keys::SDP)?.as_str())
        .unwrap_or_default()
        .to_string();
    let forward = response
        .and_then(|r| serde_json::from_value(r.get("forward")?.clone()).ok())
        .unwrap_or(MixerForward {
            host: String::new(),
            port: 0,
            ssrc: 0,
            payload_type: 100,
        });
    Ok(SessionCreatedReply {
        id,
        session,
        kind,
        sdp,
        forward,
        outcome: envelope.outcome(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn talk_request_shape() {
        let id = Uuid::new_v4();
        let data = LoopData {
            name: "L1".into(),
            group: voxloop_rtp_core::MulticastGroup::new(
                std::net::Ipv4Addr::new(239, 0, 0, 1),
                21_000,
            ),
            volume: 50,
        };
        let envelope = talk(id, "sess", true, &data);
        assert_eq!(envelope.event, TALK);
        assert_eq!(envelope.param_bool(keys::STATE), Some(true));
        assert_eq!(envelope.param(keys::LOOP).unwrap()["name"], "L1");
    }

    #[test]
    fn session_created_reply_decodes() {
        let request = create_session(Uuid::new_v4(), "v=0");
        let response = request.success_response(serde_json::json!({
            "session": "sess-9",
            "type": "offer",
            "sdp": "v=0\r\n",
            "forward": { "host": "10.0.0.1", "port": 40000, "ssrc": 99, "payload_type": 100 },
        }));
        let reply = parse_session_created(&response).unwrap();
        assert_eq!(reply.session, "sess-9");
        assert_eq!(reply.kind, MediaKind::Offer);
        assert_eq!(reply.forward.ssrc, 99);
        assert!(reply.outcome.is_ok());
    }

    #[test]
    fn candidate_serializes_mline_index() {
        let info = CandidateInfo {
            candidate: "candidate:0 1 UDP ...".into(),
            sdp_mline_index: 0,
            ufrag: "abcd".into(),
        };
        let envelope = candidate(Uuid::new_v4(), "sess", &info);
        assert_eq!(
            envelope.param("candidate").unwrap()["SDPMlineIndex"],
            0
        );
    }
}
