//! Authentication and session-binding flows.

mod common;

use common::Harness;
use serde_json::json;
use voxloop_session_core::{ControllerConfig, ControllerEvent, Scope};
use voxloop_signaling_core::ClientSocket;

#[test]
fn login_returns_session_token_and_subscribes() {
    let mut h = Harness::new();
    let request = h.login(1, "alice", "secret");

    let response = h.response_to(1, &request).expect("login response");
    let body = response.response.expect("success body");
    assert_eq!(body["id"], "alice");
    assert!(body["session"].as_str().unwrap().len() == 36);

    assert!(h.controller.is_subscribed(Scope::User, "alice", ClientSocket(1)));
    assert!(h.controller.is_subscribed(Scope::System, "system", ClientSocket(1)));
    assert_eq!(*h.log.authenticate_calls.lock().unwrap(), 1);
}

#[test]
fn wrong_password_surfaces_auth_error_and_drops() {
    let mut h = Harness::new();
    let request = h.login(1, "alice", "wrong");

    let response = h.response_to(1, &request).expect("error response");
    assert_eq!(response.outcome().code, 5000);
    assert!(h.was_closed(1));
}

#[test]
fn relogin_with_session_token_skips_directory() {
    let mut h = Harness::new();
    let first = h.login(1, "alice", "secret");
    let token = h.response_to(1, &first).unwrap().response.unwrap()["session"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(*h.log.authenticate_calls.lock().unwrap(), 1);

    // connection goes away, same client re-presents the token
    h.controller
        .handle(ControllerEvent::ClientClosed { socket: ClientSocket(1) });

    let relogin = h.request_with_client(
        2,
        "login",
        "client-1",
        json!({ "user": "alice", "password": token }),
    );
    let response = h.response_to(2, &relogin).expect("relogin response");
    assert!(response.outcome().is_ok());
    assert_eq!(response.response.unwrap()["id"], "alice");
    // no second directory round trip
    assert_eq!(*h.log.authenticate_calls.lock().unwrap(), 1);
}

#[test]
fn second_login_is_rejected() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");
    let request = h.login(1, "alice", "secret");

    let response = h.response_to(1, &request).expect("error response");
    assert_eq!(response.outcome().code, 5002);
    assert!(!h.was_closed(1));
}

#[test]
fn ldap_login_suspends_until_bind_result() {
    let mut h = Harness::with_config(ControllerConfig {
        ldap_enabled: true,
        ..ControllerConfig::default()
    });
    let request = h.login(1, "alice", "secret");

    // suspended: no response yet, bind issued
    assert!(h.response_to(1, &request).is_none());
    assert_eq!(h.controller.pending_requests(), 1);
    let (bind_id, bind_user) = h.log.ldap.lock().unwrap()[0].clone();
    assert_eq!(bind_id, request.id.unwrap());
    assert_eq!(bind_user, "alice");

    h.controller.handle(ControllerEvent::Ldap {
        id: bind_id,
        granted: true,
    });
    let response = h.response_to(1, &request).expect("login response");
    assert!(response.outcome().is_ok());
    assert_eq!(h.controller.pending_requests(), 0);
}

#[test]
fn ldap_rejection_drops_the_connection() {
    let mut h = Harness::with_config(ControllerConfig {
        ldap_enabled: true,
        ..ControllerConfig::default()
    });
    let request = h.login(1, "alice", "secret");
    let id = request.id.unwrap();

    h.controller.handle(ControllerEvent::Ldap { id, granted: false });
    let response = h.response_to(1, &request).expect("error response");
    assert_eq!(response.outcome().code, 5000);
    assert!(h.was_closed(1));
}

#[test]
fn authorize_binds_one_role() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");
    let request = h.request(1, "authorize", json!({ "role": "operator" }));

    let response = h.response_to(1, &request).unwrap();
    assert_eq!(response.response.unwrap()["id"], "operator");
    assert!(h.controller.is_subscribed(Scope::Role, "operator", ClientSocket(1)));

    // changing the role requires logout/login
    let again = h.request(1, "authorize", json!({ "role": "operator" }));
    let response = h.response_to(1, &again).unwrap();
    assert_eq!(response.outcome().code, 9999);
}

#[test]
fn authorization_failure_keeps_the_connection() {
    let mut h = Harness::new();
    h.login(1, "alice", "secret");
    let request = h.request(1, "authorize", json!({ "role": "admin" }));

    let response = h.response_to(1, &request).unwrap();
    assert_eq!(response.outcome().code, 5000);
    assert!(!h.was_closed(1));
}

#[test]
fn logout_confirms_then_tears_down() {
    let mut h = Harness::new();
    let login = h.login(1, "alice", "secret");
    let token = h.response_to(1, &login).unwrap().response.unwrap()["session"]
        .as_str()
        .unwrap()
        .to_string();

    let logout = h.request(1, "logout", json!({}));
    let response = h.response_to(1, &logout).expect("logout response");
    assert!(response.outcome().is_ok());
    assert!(h.was_closed(1));

    // the session binding is gone: the token no longer works
    let relogin = h.request_with_client(
        2,
        "login",
        "client-1",
        json!({ "user": "alice", "password": token }),
    );
    let response = h.response_to(2, &relogin).unwrap();
    assert_eq!(response.outcome().code, 5000);
}

#[test]
fn update_login_refreshes_the_binding() {
    let mut h = Harness::new();
    let login = h.login(1, "alice", "secret");
    let token = h.response_to(1, &login).unwrap().response.unwrap()["session"]
        .as_str()
        .unwrap()
        .to_string();

    let update = h.request_with_client(
        1,
        "update_login",
        "client-1",
        json!({ "user": "alice", "session": token }),
    );
    let response = h.response_to(1, &update).unwrap();
    assert!(response.outcome().is_ok());

    let bogus = h.request_with_client(
        1,
        "update_login",
        "client-1",
        json!({ "user": "alice", "session": uuid::Uuid::new_v4() }),
    );
    let response = h.response_to(1, &bogus).unwrap();
    assert_eq!(response.outcome().code, 1000);
}

#[test]
fn requests_without_auth_are_rejected() {
    let mut h = Harness::new();
    let request = h.request(1, "user_roles", json!({}));
    let response = h.response_to(1, &request).unwrap();
    assert_eq!(response.outcome().code, 5003);
}
