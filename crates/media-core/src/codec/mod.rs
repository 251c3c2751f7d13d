//! Audio codec framework.
//!
//! Codecs convert between 16-bit linear PCM and RTP payload octets. Each
//! stream owns its codec instance, so implementations may keep state
//! (packet-loss concealment history and the like).

mod g711;

pub use g711::{G711Codec, G711Variant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One audio codec instance.
pub trait AudioCodec: Send {
    fn name(&self) -> &'static str;

    fn payload_type(&self) -> u8;

    /// Encode linear PCM into one RTP payload.
    fn encode(&mut self, pcm: &[i16]) -> Result<Bytes>;

    /// Decode one RTP payload into linear PCM.
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<i16>>;

    /// Concealment PCM for a missing frame. Default: silence.
    fn conceal(&mut self, samples: usize) -> Vec<i16> {
        vec![0; samples]
    }
}

/// Which codec a channel or mixer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Pcmu,
    Pcma,
}

/// Codec selection as it appears in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CodecConfig {
    #[serde(default)]
    pub kind: CodecKind,
}

/// Instantiate a codec from its configuration.
pub fn create_codec(config: CodecConfig) -> Box<dyn AudioCodec> {
    match config.kind {
        CodecKind::Pcmu => Box::new(G711Codec::new(G711Variant::Pcmu)),
        CodecKind::Pcma => Box::new(G711Codec::new(G711Variant::Pcma)),
    }
}

/// Instantiate a codec by its RTP payload-type name.
pub fn codec_by_name(name: &str) -> Result<Box<dyn AudioCodec>> {
    match name.to_ascii_lowercase().as_str() {
        "pcmu" | "ulaw" => Ok(Box::new(G711Codec::new(G711Variant::Pcmu))),
        "pcma" | "alaw" => Ok(Box::new(G711Codec::new(G711Variant::Pcma))),
        other => Err(Error::UnsupportedCodec(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_from_json() {
        let config: CodecConfig = serde_json::from_str(r#"{"kind":"pcma"}"#).unwrap();
        assert_eq!(config.kind, CodecKind::Pcma);
        assert_eq!(create_codec(config).name(), "PCMA");
    }

    #[test]
    fn unknown_codec_is_rejected() {
        assert!(matches!(codec_by_name("g729"), Err(Error::UnsupportedCodec(_))));
    }
}
