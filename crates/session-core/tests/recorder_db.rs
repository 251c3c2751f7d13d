//! The database-backed recorder resolves through the controller mailbox.

use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;
use voxloop_session_core::recorder_db::DbRecorder;
use voxloop_session_core::{ControllerEvent, Permission, Recorder, RecorderEvent};
use voxloop_storage_core::{Database, EventFilter, QueryPage, RecordingFilter};

#[tokio::test]
async fn participation_events_land_in_the_store() {
    let db = Database::open_in_memory().await.unwrap();
    db.prepare().await.unwrap();
    let (tx, _rx) = mpsc::channel(8);
    let recorder = DbRecorder::new(db.clone(), tx);

    recorder.participation("alice", "operator", "L1", Permission::Recv);
    recorder.ptt("alice", "operator", "L1", true);
    // leaving produces no audit row
    recorder.participation("alice", "operator", "L1", Permission::None);

    let filter = EventFilter {
        user: Some("alice".to_string()),
        ..EventFilter::default()
    };
    let mut rows = Vec::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let QueryPage::Results(events) =
            db.get_participation_events(&filter, 10, 0).await.unwrap()
        {
            if events.len() >= 2 {
                rows = events;
                break;
            }
        }
    }
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn recording_queries_resolve_via_the_mailbox() {
    let db = Database::open_in_memory().await.unwrap();
    db.prepare().await.unwrap();
    db.add_recording(Uuid::new_v4(), "file:///l1.wav", "L1", chrono::Utc::now())
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let recorder = DbRecorder::new(db, tx);

    let query_id = Uuid::new_v4();
    let filter = RecordingFilter {
        loop_name: Some("L1".to_string()),
        ..RecordingFilter::default()
    };
    assert!(recorder.get_recordings(query_id, filter, 10, 0));

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("query resolves")
        .expect("mailbox open");
    match event {
        ControllerEvent::Recorder(RecorderEvent::Recordings { id, page }) => {
            assert_eq!(id, query_id);
            match page.unwrap() {
                QueryPage::Results(rows) => assert_eq!(rows.len(), 1),
                QueryPage::TooManyResults => panic!("one row fits"),
            }
        }
        other => panic!("unexpected event {:?}", other),
    }
}
