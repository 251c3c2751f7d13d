//! Database-backed [`Recorder`].
//!
//! Participation events are written fire-and-forget on spawned tasks;
//! recording queries resolve back into the controller mailbox so the
//! controller task never blocks on the database.

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;
use voxloop_storage_core::{Database, ParticipationEvent, ParticipationState, RecordingFilter};

use crate::collab::Recorder;
use crate::events::{ControllerEvent, RecorderEvent};
use crate::permission::Permission;

pub struct DbRecorder {
    db: Database,
    mailbox: mpsc::Sender<ControllerEvent>,
}

impl DbRecorder {
    pub fn new(db: Database, mailbox: mpsc::Sender<ControllerEvent>) -> Self {
        Self { db, mailbox }
    }

    fn record(&self, user: &str, role: &str, loop_name: &str, state: ParticipationState) {
        let db = self.db.clone();
        let event = ParticipationEvent {
            user: user.to_string(),
            role: role.to_string(),
            loop_name: loop_name.to_string(),
            state,
            time: Utc::now(),
        };
        tokio::spawn(async move {
            if let Err(e) = db.add_participation_event(&event).await {
                tracing::error!(error = %e, "failed to record participation event");
            }
        });
    }
}

impl Recorder for DbRecorder {
    fn participation(&self, user: &str, role: &str, loop_name: &str, state: Permission) {
        let state = match state {
            // leaving is not an audit event of its own
            Permission::None => return,
            Permission::Recv => ParticipationState::Recv,
            Permission::Send => ParticipationState::Send,
        };
        self.record(user, role, loop_name, state);
    }

    fn ptt(&self, user: &str, role: &str, loop_name: &str, on: bool) {
        let state = if on {
            ParticipationState::Send
        } else {
            ParticipationState::Recv
        };
        self.record(user, role, loop_name, state);
    }

    fn get_recordings(&self, id: Uuid, filter: RecordingFilter, max: u32, offset: u32) -> bool {
        let db = self.db.clone();
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let page = db
                .get_recordings(&filter, max, offset)
                .await
                .map_err(|e| e.to_string());
            let _ = mailbox
                .send(ControllerEvent::Recorder(RecorderEvent::Recordings {
                    id,
                    page,
                }))
                .await;
        });
        true
    }
}
