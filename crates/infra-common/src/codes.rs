//! The stable numeric error surface.
//!
//! Codes are partitioned into ranges: general errors (< 2000), session
//! errors (2000..=2999), configuration (3000..=3999), codec/parse
//! (4000..=4999), auth (5000..=5999), backend lifecycle (6000..=6999),
//! general infrastructure (>= 10000) and non-critical/retryable
//! (50000..=59000). A code is *critical* iff it falls outside the
//! non-critical range.

/// Success code. A successful [`crate::Outcome`] carries this and no message.
pub const NO_ERROR: u64 = 0;

/// Lower bound of the non-critical (try-again) range.
pub const NON_CRITICAL: u64 = 50_000;

/// Upper bound (inclusive) of the non-critical range.
pub const NON_CRITICAL_END: u64 = 59_000;

/// True iff `code` denotes an error a caller must not simply retry.
pub fn is_critical(code: u64) -> bool {
    !(NON_CRITICAL..=NON_CRITICAL_END).contains(&code)
}

/// Every error code of the voxloop wire surface, with its canonical
/// description.
///
/// The numeric values are stable protocol constants; clients switch on
/// them. Descriptions are the canonical human-readable form sent in the
/// error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    Unknown,
    UnknownEvent,
    Processing,
    Input,
    Signaling,
    NotEnabled,
    Comms,
    Withdraw,
    ConnectionLost,
    ParameterMissing,
    AlreadySet,
    Inactive,
    NotFound,
    MaxItemsReached,
    NotAResponse,

    SessionCreate,
    SessionDelete,
    SessionUnknown,
    StreamUnknown,
    DestinationUnknown,
    CandidateProcessing,
    SessionUpdate,
    SessionCancelled,

    Config,
    MediaConfig,
    SessionConfig,
    Type,
    SocketCreate,

    SdpDecode,
    SdpEncode,
    JsonDecode,
    JsonEncode,
    CandidateDecode,
    JsonIncomplete,
    Codec,

    Auth,
    AuthSwitchRole,
    AlreadyAuthenticated,
    NotAuthenticated,
    Permission,
    LdapInUse,

    Lifetime,
    Deleted,
    Incomplete,
    Lost,

    NotImplemented,

    Internal,
    NoResource,
    UnknownUser,
    UnknownLoop,
    UnknownRecorder,
    AlreadyAcquired,
    NotRecording,
    Timeout,
    Unterminated,
    MalformedRequest,
    BadArgument,
    InvalidResult,
    AudioIo,
    AudioUnderrun,

    TryAgain,
    SameResource,
    TableFull,
    AlreadyInState,
}

impl ErrorCode {
    /// The stable numeric value of this code.
    pub fn code(self) -> u64 {
        match self {
            ErrorCode::Unknown => 998,
            ErrorCode::UnknownEvent => 999,
            ErrorCode::Processing => 1000,
            ErrorCode::Input => 1001,
            ErrorCode::Signaling => 1002,
            ErrorCode::NotEnabled => 1003,
            ErrorCode::Comms => 1004,
            ErrorCode::Withdraw => 1005,
            ErrorCode::ConnectionLost => 1007,
            ErrorCode::ParameterMissing => 1008,
            ErrorCode::AlreadySet => 1009,
            ErrorCode::Inactive => 1010,
            ErrorCode::NotFound => 1011,
            ErrorCode::MaxItemsReached => 1012,
            ErrorCode::NotAResponse => 1234,

            ErrorCode::SessionCreate => 2000,
            ErrorCode::SessionDelete => 2001,
            ErrorCode::SessionUnknown => 2002,
            ErrorCode::StreamUnknown => 2003,
            ErrorCode::DestinationUnknown => 2004,
            ErrorCode::CandidateProcessing => 2005,
            ErrorCode::SessionUpdate => 2006,
            ErrorCode::SessionCancelled => 2010,

            ErrorCode::Config => 3000,
            ErrorCode::MediaConfig => 3001,
            ErrorCode::SessionConfig => 3002,
            ErrorCode::Type => 3003,
            ErrorCode::SocketCreate => 3004,

            ErrorCode::SdpDecode => 4000,
            ErrorCode::SdpEncode => 4001,
            ErrorCode::JsonDecode => 4002,
            ErrorCode::JsonEncode => 4003,
            ErrorCode::CandidateDecode => 4004,
            ErrorCode::JsonIncomplete => 4005,
            ErrorCode::Codec => 4006,

            ErrorCode::Auth => 5000,
            ErrorCode::AuthSwitchRole => 5001,
            ErrorCode::AlreadyAuthenticated => 5002,
            ErrorCode::NotAuthenticated => 5003,
            ErrorCode::Permission => 5004,
            ErrorCode::LdapInUse => 5005,

            ErrorCode::Lifetime => 6000,
            ErrorCode::Deleted => 6001,
            ErrorCode::Incomplete => 6002,
            ErrorCode::Lost => 6003,

            ErrorCode::NotImplemented => 9999,

            ErrorCode::Internal => 10_000,
            ErrorCode::NoResource => 10_010,
            ErrorCode::UnknownUser => 10_011,
            ErrorCode::UnknownLoop => 10_012,
            ErrorCode::UnknownRecorder => 10_013,
            ErrorCode::AlreadyAcquired => 10_014,
            ErrorCode::NotRecording => 10_020,
            ErrorCode::Timeout => 20_001,
            ErrorCode::Unterminated => 30_001,
            ErrorCode::MalformedRequest => 30_010,
            ErrorCode::BadArgument => 30_020,
            ErrorCode::InvalidResult => 30_030,
            ErrorCode::AudioIo => 40_100,
            ErrorCode::AudioUnderrun => 40_110,

            ErrorCode::TryAgain => 51_000,
            ErrorCode::SameResource => 51_100,
            ErrorCode::TableFull => 52_010,
            ErrorCode::AlreadyInState => 58_000,
        }
    }

    /// Canonical description, suitable for the wire error envelope.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::Unknown => "unknown",
            ErrorCode::UnknownEvent => "unknown event",
            ErrorCode::Processing => "server processing error",
            ErrorCode::Input => "input error",
            ErrorCode::Signaling => "signaling error",
            ErrorCode::NotEnabled => "not enabled",
            ErrorCode::Comms => "communication error",
            ErrorCode::Withdraw => "withdraw input error",
            ErrorCode::ConnectionLost => "connection lost",
            ErrorCode::ParameterMissing => "parameter missing",
            ErrorCode::AlreadySet => "already set",
            ErrorCode::Inactive => "inactive",
            ErrorCode::NotFound => "not found",
            ErrorCode::MaxItemsReached => "max items reached",
            ErrorCode::NotAResponse => "not a response",

            ErrorCode::SessionCreate => "failed to create a session",
            ErrorCode::SessionDelete => "failed to delete a session",
            ErrorCode::SessionUnknown => "session unknown",
            ErrorCode::StreamUnknown => "stream unknown",
            ErrorCode::DestinationUnknown => "destination unknown",
            ErrorCode::CandidateProcessing => "candidate processing",
            ErrorCode::SessionUpdate => "session update",
            ErrorCode::SessionCancelled => "session cancelled by peer",

            ErrorCode::Config => "configuration error",
            ErrorCode::MediaConfig => "media configuration error",
            ErrorCode::SessionConfig => "session configuration error",
            ErrorCode::Type => "type error",
            ErrorCode::SocketCreate => "socket create error",

            ErrorCode::SdpDecode => "failed to decode SDP",
            ErrorCode::SdpEncode => "failed to encode SDP",
            ErrorCode::JsonDecode => "failed to decode JSON",
            ErrorCode::JsonEncode => "failed to encode JSON",
            ErrorCode::CandidateDecode => "failed to decode ICE candidate",
            ErrorCode::JsonIncomplete => "JSON is incomplete",
            ErrorCode::Codec => "unsupported codec",

            ErrorCode::Auth => "authentication or authorization failed",
            ErrorCode::AuthSwitchRole => "switch role failed",
            ErrorCode::AlreadyAuthenticated => "already authenticated",
            ErrorCode::NotAuthenticated => "user not authenticated",
            ErrorCode::Permission => "permission error",
            ErrorCode::LdapInUse => "ldap used cannot change values",

            ErrorCode::Lifetime => "lifetime ended",
            ErrorCode::Deleted => "deleted",
            ErrorCode::Incomplete => "incomplete",
            ErrorCode::Lost => "lost resource",

            ErrorCode::NotImplemented => "not implemented yet",

            ErrorCode::Internal => "serious unspecified internal error",
            ErrorCode::NoResource => "no more resources",
            ErrorCode::UnknownUser => "unknown user",
            ErrorCode::UnknownLoop => "unknown loop",
            ErrorCode::UnknownRecorder => "unknown recorder",
            ErrorCode::AlreadyAcquired => "resource already acquired",
            ErrorCode::NotRecording => "currently not recording",
            ErrorCode::Timeout => "run into timeout",
            ErrorCode::Unterminated => "unterminated message received",
            ErrorCode::MalformedRequest => "request is malformed",
            ErrorCode::BadArgument => "bad argument",
            ErrorCode::InvalidResult => "result is invalid",
            ErrorCode::AudioIo => "audio hardware I/O error",
            ErrorCode::AudioUnderrun => "audio hardware buffer underflow",

            ErrorCode::TryAgain => "could not be done, try again",
            ErrorCode::SameResource => "resource with same ID already there",
            ErrorCode::TableFull => "translation table full",
            ErrorCode::AlreadyInState => "system already in desired state",
        }
    }

    /// True iff this code lies outside the non-critical range.
    pub fn is_critical(self) -> bool {
        is_critical(self.code())
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}
