//! Session store persistence across restarts.

use voxloop_session_core::session_store::{UserSessionStore, SESSIONS_FILE};

#[test]
fn sessions_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let token = {
        let mut store = UserSessionStore::new(Some(dir.path()), 0);
        store.init("client-1", "alice")
    };

    let reloaded = UserSessionStore::new(Some(dir.path()), 0);
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.verify("client-1", "alice", &token.to_string()));
}

#[test]
fn file_shape_matches_the_wire_contract() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = UserSessionStore::new(Some(dir.path()), 0);
    store.init("client-1", "alice");

    let raw = std::fs::read_to_string(dir.path().join(SESSIONS_FILE)).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &parsed["client-1"];
    assert_eq!(record["client"], "client-1");
    assert_eq!(record["user"], "alice");
    assert!(record["last_update"].as_u64().unwrap() > 0);
    assert!(record["id"].as_str().unwrap().len() == 36);
}

#[test]
fn unknown_fields_in_the_file_are_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let token = uuid::Uuid::new_v4();
    let contents = serde_json::json!({
        "client-1": {
            "last_update": voxloop_infra_common::now_usecs(),
            "id": token,
            "client": "client-1",
            "user": "alice",
            "introduced_later": { "nested": true },
        }
    });
    std::fs::write(
        dir.path().join(SESSIONS_FILE),
        serde_json::to_vec(&contents).unwrap(),
    )
    .unwrap();

    let store = UserSessionStore::new(Some(dir.path()), 0);
    assert!(store.verify("client-1", "alice", &token.to_string()));
}

#[test]
fn deletion_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = UserSessionStore::new(Some(dir.path()), 0);
        store.init("client-1", "alice");
        store.init("client-2", "bob");
        assert!(store.delete("client-1"));
    }
    let reloaded = UserSessionStore::new(Some(dir.path()), 0);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.user_of("client-2"), Some("bob"));
}
