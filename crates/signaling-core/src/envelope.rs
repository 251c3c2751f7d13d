//! The wire message envelope.
//!
//! Requests, responses and broadcasts all travel in one envelope shape:
//!
//! ```json
//! { "event": "...", "id": "<uuid>", "client": "...",
//!   "parameter": { ... }, "response": { ... },
//!   "error": { "code": 5004, "description": "permission error" },
//!   "type": "unicast" }
//! ```
//!
//! Responses copy `id` from the originating request; broadcasts carry
//! their scope in `type`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use voxloop_infra_common::{ErrorCode, Outcome};
use voxloop_value_core::Value;

/// Well-known envelope and parameter keys.
pub mod keys {
    pub const USER: &str = "user";
    pub const ROLE: &str = "role";
    pub const ROLES: &str = "roles";
    pub const LOOP: &str = "loop";
    pub const LOOPS: &str = "loops";
    pub const STATE: &str = "state";
    pub const SESSION: &str = "session";
    pub const VOLUME: &str = "volume";
    pub const PASSWORD: &str = "password";
    pub const PARTICIPANTS: &str = "participants";
    pub const SDP: &str = "sdp";
    pub const TYPE: &str = "type";
    pub const MEDIA: &str = "media";
    pub const MEDIA_READY: &str = "media_ready";
    pub const CONNECTED: &str = "connected";
    pub const BACKEND: &str = "backend";
    pub const FRONTEND: &str = "frontend";
    pub const ID: &str = "id";
    pub const RESULT: &str = "result";
    pub const DOMAIN: &str = "domain";
    pub const SYSTEM: &str = "system";
}

/// Message delivery class. Broadcast variants carry their scope key in
/// the parameter object (`loop`, `user` or `role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Unicast,
    LoopBroadcast,
    UserBroadcast,
    RoleBroadcast,
    SystemBroadcast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u64,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("not an envelope: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("envelope has no event")]
    MissingEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
}

impl Envelope {
    /// A fresh request with a new correlation id.
    pub fn request(event: impl Into<String>, parameter: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            id: Some(Uuid::new_v4()),
            client: None,
            parameter: Some(parameter),
            response: None,
            error: None,
            message_type: None,
        }
    }

    /// A server-initiated message (fresh id, empty parameter object).
    pub fn message(event: impl Into<String>) -> Self {
        Self::request(event, serde_json::json!({}))
    }

    /// Success response to this request, echoing event and id.
    pub fn success_response(&self, response: serde_json::Value) -> Self {
        Self {
            event: self.event.clone(),
            id: self.id,
            client: None,
            parameter: None,
            response: Some(response),
            error: None,
            message_type: Some(MessageType::Unicast),
        }
    }

    /// Error response to this request with the code's canonical text.
    pub fn error_response(&self, code: ErrorCode) -> Self {
        self.error_response_raw(code.code(), code.description())
    }

    /// Error response with an explicit code and description.
    pub fn error_response_raw(&self, code: u64, description: impl Into<String>) -> Self {
        Self {
            event: self.event.clone(),
            id: self.id,
            client: None,
            parameter: None,
            response: None,
            error: Some(ErrorInfo {
                code,
                description: description.into(),
            }),
            message_type: Some(MessageType::Unicast),
        }
    }

    /// Error response for an arbitrary outcome.
    pub fn outcome_response(&self, outcome: &Outcome) -> Self {
        if outcome.is_ok() {
            self.success_response(serde_json::json!({}))
        } else {
            self.error_response_raw(outcome.code, outcome.message())
        }
    }

    /// Override the correlation id (chained requests reuse the id of the
    /// suspended original).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    /// The request outcome carried by a response envelope.
    pub fn outcome(&self) -> Outcome {
        match &self.error {
            None => Outcome::ok(),
            Some(info) => {
                let mut outcome = Outcome::ok();
                outcome.set(info.code, Some(&info.description));
                outcome
            }
        }
    }

    pub fn is_response(&self) -> bool {
        self.response.is_some() || self.error.is_some()
    }

    /// String field of the parameter object.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameter.as_ref()?.get(key)?.as_str()
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.parameter.as_ref()?.get(key)?.as_u64()
    }

    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.parameter.as_ref()?.get(key)?.as_bool()
    }

    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.parameter.as_ref()?.get(key)
    }

    /// Decode from a parsed structured value.
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        let envelope: Envelope = serde_json::from_value(value.to_json())?;
        if envelope.event.is_empty() {
            return Err(EnvelopeError::MissingEvent);
        }
        Ok(envelope)
    }

    /// Encode into the structured value driving framed IO.
    pub fn to_value(&self) -> Value {
        Value::from_json(&serde_json::to_value(self).expect("envelope serializes"))
    }
}
