//! Media setup: ICE session lifecycle, mixer acquisition, media_ready.

mod common;

use common::{BackendCall, FrontendCall, Harness};
use serde_json::json;
use uuid::Uuid;
use voxloop_infra_common::{ErrorCode, Outcome};
use voxloop_session_core::{BackendEvent, ControllerEvent, FrontendEvent};
use voxloop_signaling_core::backend::MixerForward;
use voxloop_signaling_core::frontend::MediaKind;
use voxloop_signaling_core::ClientSocket;

fn session_created(id: Uuid, session: &str, outcome: Outcome) -> ControllerEvent {
    ControllerEvent::Frontend(FrontendEvent::SessionCreated {
        id,
        session: session.to_string(),
        kind: MediaKind::Offer,
        sdp: "v=0\r\n".to_string(),
        forward: MixerForward {
            host: "10.0.0.1".to_string(),
            port: 40_000,
            ssrc: 77,
            payload_type: 100,
        },
        outcome,
    })
}

#[test]
fn media_request_creates_session_and_acquires_mixer() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");

    let media = h.request(1, "media", json!({ "type": "request" }));
    let id = media.id.unwrap();
    assert_eq!(
        h.log.frontend.lock().unwrap()[0],
        FrontendCall::CreateSession { id }
    );
    assert!(h.response_to(1, &media).is_none());

    h.controller.handle(session_created(id, "sess-1", Outcome::ok()));

    // the SDP answer goes back to the client, the mixer is requested
    let response = h.response_to(1, &media).expect("media response");
    let body = response.response.unwrap();
    assert_eq!(body["type"], "offer");
    assert_eq!(body["sdp"], "v=0\r\n");
    assert_eq!(
        h.log.backend.lock().unwrap()[0],
        BackendCall::Acquire {
            id,
            session: "sess-1".to_string()
        }
    );
}

#[test]
fn media_ready_announced_exactly_once() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");

    let media = h.request(1, "media", json!({ "type": "request" }));
    let id = media.id.unwrap();
    h.controller.handle(session_created(id, "sess-1", Outcome::ok()));

    // mixer first, then ICE
    h.controller
        .handle(ControllerEvent::Backend(BackendEvent::MixerAcquired {
            id,
            session: "sess-1".to_string(),
            outcome: Outcome::ok(),
        }));
    assert!(h.sent_events(1, "media_ready").is_empty());

    h.controller
        .handle(ControllerEvent::Frontend(FrontendEvent::SessionCompleted {
            session: "sess-1".to_string(),
            success: true,
        }));
    assert_eq!(h.sent_events(1, "media_ready").len(), 1);

    // repeated completion must not re-announce
    h.controller
        .handle(ControllerEvent::Frontend(FrontendEvent::SessionCompleted {
            session: "sess-1".to_string(),
            success: true,
        }));
    assert_eq!(h.sent_events(1, "media_ready").len(), 1);
}

#[test]
fn mixer_failure_after_ice_drops_the_connection() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");

    let media = h.request(1, "media", json!({ "type": "request" }));
    let id = media.id.unwrap();
    h.controller.handle(session_created(id, "sess-1", Outcome::ok()));
    h.controller
        .handle(ControllerEvent::Frontend(FrontendEvent::SessionCompleted {
            session: "sess-1".to_string(),
            success: true,
        }));

    h.controller
        .handle(ControllerEvent::Backend(BackendEvent::MixerAcquired {
            id,
            session: "sess-1".to_string(),
            outcome: Outcome::error(ErrorCode::NoResource),
        }));

    assert!(h.was_closed(1));
    // the ICE session is released on the way down
    assert!(h
        .log
        .frontend
        .lock()
        .unwrap()
        .contains(&FrontendCall::DropSession {
            session: "sess-1".to_string()
        }));
}

#[test]
fn failed_ice_session_creation_is_surfaced() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");

    let media = h.request(1, "media", json!({ "type": "request" }));
    let id = media.id.unwrap();
    h.controller.handle(session_created(
        id,
        "sess-1",
        Outcome::error(ErrorCode::SessionCreate),
    ));

    let response = h.response_to(1, &media).expect("error response");
    assert_eq!(response.outcome().code, 2000);
    assert!(h.log.backend.lock().unwrap().is_empty());
}

#[test]
fn late_session_creation_after_timeout_is_released() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");

    // a session response nobody is waiting for
    h.controller
        .handle(session_created(Uuid::new_v4(), "orphan", Outcome::ok()));

    assert!(h
        .log
        .frontend
        .lock()
        .unwrap()
        .contains(&FrontendCall::DropSession {
            session: "orphan".to_string()
        }));
}

#[test]
fn offer_requires_an_existing_session() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");

    let media = h.request(1, "media", json!({ "type": "offer", "sdp": "v=0" }));
    let response = h.response_to(1, &media).expect("error response");
    assert_eq!(response.outcome().code, 2002);
    assert!(h.was_closed(1));
}

#[test]
fn candidate_is_forwarded_and_answered() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");
    h.media_ready(1, "sess-1");

    let candidate = h.request(
        1,
        "candidate",
        json!({ "candidate": "candidate:0 1 UDP 2122 10.0.0.2 50000 typ host", "ufrag": "ab" }),
    );
    let id = candidate.id.unwrap();
    assert!(h
        .log
        .frontend
        .lock()
        .unwrap()
        .contains(&FrontendCall::Candidate {
            id,
            session: "sess-1".to_string()
        }));

    h.controller
        .handle(ControllerEvent::Frontend(FrontendEvent::CandidateHandled {
            id,
            outcome: Outcome::ok(),
        }));
    assert!(h.response_to(1, &candidate).unwrap().outcome().is_ok());
}

#[test]
fn frontend_session_drop_tears_down_backend_side_only() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");
    h.media_ready(1, "sess-1");

    h.controller
        .handle(ControllerEvent::Frontend(FrontendEvent::SessionDropped {
            session: "sess-1".to_string(),
        }));

    assert!(h.was_closed(1));
    let backend = h.log.backend.lock().unwrap();
    assert!(backend.contains(&BackendCall::Release {
        session: "sess-1".to_string()
    }));
    // no drop_session back to the frontend, it is already gone
    assert!(!h
        .log
        .frontend
        .lock()
        .unwrap()
        .contains(&FrontendCall::DropSession {
            session: "sess-1".to_string()
        }));
}

#[test]
fn mixer_lost_drops_without_backend_release() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");
    h.media_ready(1, "sess-1");

    h.controller
        .handle(ControllerEvent::Backend(BackendEvent::MixerLost {
            session: "sess-1".to_string(),
        }));

    assert!(h.was_closed(1));
    assert!(!h
        .log
        .backend
        .lock()
        .unwrap()
        .contains(&BackendCall::Release {
            session: "sess-1".to_string()
        }));
    assert!(h.controller.connection(ClientSocket(1)).is_none());
}
