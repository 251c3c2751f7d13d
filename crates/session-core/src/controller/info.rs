//! Read-side handlers: entity lookup, role/loop listings, status,
//! recording queries.

use chrono::{DateTime, Utc};
use voxloop_infra_common::ErrorCode;
use voxloop_signaling_core::envelope::keys;
use voxloop_signaling_core::{ClientSocket, Envelope};
use voxloop_storage_core::{QueryPage, RecordingFilter};

use super::SessionController;
use crate::broadcast::Scope;
use crate::events::RecorderEvent;

impl SessionController {
    /// `get`: entity lookup. Only `type == "user"` is served.
    pub(super) fn client_get(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let Some(user) = conn.user.clone() else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };

        let Some(kind) = envelope.param_str(keys::TYPE) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };
        if kind != keys::USER {
            let response = envelope.error_response_raw(
                ErrorCode::NotImplemented.code(),
                "only GET user implemented yet",
            );
            self.send(socket, &response);
            return;
        }

        let entity = self.directory.user_entity(&user);
        self.send_success(
            socket,
            &envelope,
            serde_json::json!({
                keys::RESULT: entity,
                keys::TYPE: keys::USER,
            }),
        );
    }

    /// `user_roles`: the roles the bound user may assume.
    pub(super) fn client_user_roles(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let Some(user) = conn.user.clone() else {
            self.send_error(socket, &envelope, ErrorCode::NotAuthenticated);
            return;
        };

        let Some(roles) = self.directory.user_roles(&user) else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };
        self.send_success(socket, &envelope, serde_json::json!({ keys::ROLES: roles }));
    }

    /// `role_loops`: the loops reachable with the bound role, including
    /// persisted state and volume. Subscribes the socket to every listed
    /// loop's broadcast key.
    pub(super) fn client_role_loops(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let (Some(user), Some(role)) = (conn.user.clone(), conn.role.clone()) else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };

        let Some(loops) = self.directory.role_loops(&user, &role) else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };
        for loop_name in loops.keys() {
            self.broadcasts.set(Scope::Loop, loop_name.as_str(), socket);
        }
        self.send_success(
            socket,
            &envelope,
            serde_json::json!({ keys::LOOPS: loops }),
        );
    }

    /// `register`: transport keepalive handshake.
    pub(super) fn client_register(&mut self, socket: ClientSocket, envelope: Envelope) {
        self.send_success(socket, &envelope, serde_json::json!({}));
    }

    /// `list_sip_status` / `sip`: connection status of the SIP gateway.
    pub(super) fn client_sip_status(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if conn.user.is_none() {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        }
        let connected = self.sip.connected();
        self.send_success(
            socket,
            &envelope,
            serde_json::json!({ keys::CONNECTED: connected }),
        );
    }

    /// `get_recording`: filtered recording lookup, paged.
    pub(super) fn client_get_recording(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if conn.user.is_none() || conn.role.is_none() {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        }
        let Some(id) = envelope.id else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        let filter = RecordingFilter {
            loop_name: envelope.param_str(keys::LOOP).map(str::to_string),
            user: envelope.param_str(keys::USER).map(str::to_string),
            from: envelope.param_u64("from").and_then(epoch_secs),
            until: envelope.param_u64("to").and_then(epoch_secs),
        };
        let max = envelope
            .param_u64("max_num_results")
            .map(|m| m as u32)
            .unwrap_or(self.config.recordings_page_limit);
        let offset = envelope.param_u64("offset").map(|o| o as u32).unwrap_or(0);

        if !self.recorder.get_recordings(id, filter, max, offset) {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    pub(super) fn on_recorder_event(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::Recordings { id, page } => {
                let Some(pending) = self.correlator.unset(&id) else {
                    return;
                };
                let socket = pending.socket;
                let envelope = pending.payload;

                match page {
                    Ok(QueryPage::Results(recordings)) => {
                        let rows: Vec<serde_json::Value> = recordings
                            .iter()
                            .map(|r| {
                                serde_json::json!({
                                    "id": r.id,
                                    "uri": r.uri,
                                    "loop": r.loop_name,
                                    "start": voxloop_storage_core::format_timestamp(r.start),
                                    "end": r.end.map(voxloop_storage_core::format_timestamp),
                                })
                            })
                            .collect();
                        self.send_success(
                            socket,
                            &envelope,
                            serde_json::json!({ "recordings": rows }),
                        );
                    }
                    Ok(QueryPage::TooManyResults) => {
                        let response = envelope.error_response_raw(
                            ErrorCode::Processing.code(),
                            "search returned too many results - please confine your search parameters",
                        );
                        self.send(socket, &response);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "recording query failed");
                        self.send_error(socket, &envelope, ErrorCode::Processing);
                    }
                }
            }
        }
    }
}

fn epoch_secs(secs: u64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs as i64, 0)
}
