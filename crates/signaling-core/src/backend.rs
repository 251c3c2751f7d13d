//! Wire protocol towards the mixer backend.
//!
//! The backend owns and lifecycle-manages mixers. Requests are
//! fire-and-forget envelopes carrying a correlation `id`; the backend
//! echoes that `id` in its reply.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use voxloop_infra_common::Outcome;
use voxloop_rtp_core::MulticastGroup;

use crate::envelope::{keys, Envelope};

pub const REGISTER: &str = "register";
pub const ACQUIRE_MIXER: &str = "acquire_mixer";
pub const RELEASE_MIXER: &str = "release_mixer";
pub const JOIN_LOOP: &str = "join_loop";
pub const LEAVE_LOOP: &str = "leave_loop";
pub const SET_VOLUME: &str = "set_volume";
pub const GET_STATE: &str = "get_state";

/// A loop as the media plane sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopData {
    pub name: String,
    pub group: MulticastGroup,
    /// Playback gain 0..=100.
    pub volume: u8,
}

/// Where an acquired mixer forwards its mixed stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerForward {
    pub host: String,
    pub port: u16,
    pub ssrc: u32,
    pub payload_type: u8,
}

/// Registration handshake.
pub fn register(id: Uuid) -> Envelope {
    Envelope::message(REGISTER).with_id(id)
}

pub fn acquire_mixer(id: Uuid, session: &str, forward: &MixerForward) -> Envelope {
    Envelope::request(
        ACQUIRE_MIXER,
        serde_json::json!({
            keys::SESSION: session,
            "forward": forward,
        }),
    )
    .with_id(id)
}

pub fn release_mixer(id: Uuid, session: &str) -> Envelope {
    Envelope::request(RELEASE_MIXER, serde_json::json!({ keys::SESSION: session })).with_id(id)
}

pub fn join_loop(id: Uuid, session: &str, data: &LoopData) -> Envelope {
    Envelope::request(
        JOIN_LOOP,
        serde_json::json!({
            keys::SESSION: session,
            keys::LOOP: data,
        }),
    )
    .with_id(id)
}

pub fn leave_loop(id: Uuid, session: &str, loop_name: &str) -> Envelope {
    Envelope::request(
        LEAVE_LOOP,
        serde_json::json!({
            keys::SESSION: session,
            keys::LOOP: loop_name,
        }),
    )
    .with_id(id)
}

pub fn set_volume(id: Uuid, session: &str, loop_name: &str, volume: u8) -> Envelope {
    Envelope::request(
        SET_VOLUME,
        serde_json::json!({
            keys::SESSION: session,
            keys::LOOP: loop_name,
            keys::VOLUME: volume.min(100),
        }),
    )
    .with_id(id)
}

pub fn get_state(id: Uuid, session: &str) -> Envelope {
    Envelope::request(GET_STATE, serde_json::json!({ keys::SESSION: session })).with_id(id)
}

#[derive(Debug, Error, PartialEq)]
pub enum ReplyError {
    #[error("reply is missing its correlation id")]
    MissingId,
    #[error("reply is missing the session")]
    MissingSession,
    #[error("envelope is not a response")]
    NotAResponse,
}

/// A decoded backend reply.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub id: Uuid,
    pub session: String,
    pub loop_name: Option<String>,
    pub volume: Option<u8>,
    pub state: Option<serde_json::Value>,
    pub outcome: Outcome,
}

/// Decode a backend response envelope.
///
/// Replies echo the request parameters (`session`, `loop`, `volume`)
/// alongside `response` or `error`.
pub fn parse_reply(envelope: &Envelope) -> Result<BackendReply, ReplyError> {
    if !envelope.is_response() {
        return Err(ReplyError::NotAResponse);
    }
    let id = envelope.id.ok_or(ReplyError::MissingId)?;
    let session = envelope
        .param_str(keys::SESSION)
        .or_else(|| envelope.response.as_ref()?.get(keys::SESSION)?.as_str())
        .ok_or(ReplyError::MissingSession)?
        .to_string();
    let loop_name = envelope
        .param_str(keys::LOOP)
        .or_else(|| envelope.response.as_ref()?.get(keys::LOOP)?.as_str())
        .map(str::to_string);
    let volume = envelope
        .param_u64(keys::VOLUME)
        .or_else(|| envelope.response.as_ref()?.get(keys::VOLUME)?.as_u64())
        .map(|v| v.min(100) as u8);
    let state = envelope
        .response
        .as_ref()
        .and_then(|r| r.get(keys::STATE))
        .cloned();

    Ok(BackendReply {
        id,
        session,
        loop_name,
        volume,
        state,
        outcome: envelope.outcome(),
    })
}
