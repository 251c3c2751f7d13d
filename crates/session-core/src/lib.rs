//! # Session and participation controller for voxloop
//!
//! The event-driven core of the platform: authenticates clients, acquires
//! and releases media mixers, tracks loop participation, enforces
//! per-role send/receive permissions, and fans state transitions out to
//! subscribed connections.
//!
//! The controller ([`SessionController`]) owns all signalling state and
//! runs as a single task consuming a mailbox of [`ControllerEvent`]s.
//! Operations that need the mixer backend, the ICE frontend, SIP or LDAP
//! suspend by registering their correlation id and resume when the
//! response event re-enters the mailbox; the correlator is the only
//! resumption gate.

pub mod broadcast;
pub mod collab;
pub mod config;
pub mod connection;
pub mod controller;
pub mod directory;
pub mod events;
pub mod loops;
pub mod permission;
pub mod recorder_db;
pub mod session_store;

pub use broadcast::{BroadcastRegistry, Scope};
pub use collab::{ClientSink, Collaborators, IceFrontend, LdapAuthenticator, MixerBackend, Recorder, SipGateway};
pub use config::ControllerConfig;
pub use connection::{Connection, LoopParticipation};
pub use controller::SessionController;
pub use directory::{Directory, LoopGrant, MemoryDirectory};
pub use events::{BackendEvent, ControllerEvent, FrontendEvent, RecorderEvent, SipEvent};
pub use loops::{LoopState, Participant};
pub use permission::Permission;
pub use session_store::{UserSession, UserSessionStore};
