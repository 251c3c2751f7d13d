//! SIP call bridging: dial-out, hangup, call permissions.

use voxloop_infra_common::ErrorCode;
use voxloop_signaling_core::envelope::{keys, MessageType};
use voxloop_signaling_core::{ClientSocket, Envelope};

use super::SessionController;
use crate::broadcast::Scope;
use crate::events::SipEvent;
use crate::permission::Permission;

impl SessionController {
    /// `call`: dial a SIP destination into a loop.
    pub(super) fn client_call(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let (Some(user), Some(role)) = (conn.user.clone(), conn.role.clone()) else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };

        let id = envelope.id;
        let loop_name = envelope.param_str(keys::LOOP).map(str::to_string);
        let destination = envelope.param_str("destination").map(str::to_string);
        let (Some(id), Some(loop_name), Some(destination)) = (id, loop_name, destination) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        if self.directory.permission(&role, &loop_name) != Permission::Send {
            self.send_error(socket, &envelope, ErrorCode::Permission);
            return;
        }

        if !self.sip.create_call(id, &loop_name, &destination, &user) {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    /// `hangup`: terminate a bridged SIP call.
    pub(super) fn client_hangup(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if conn.user.is_none() || conn.role.is_none() {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        }

        let id = envelope.id;
        let call_id = envelope.param_str("call").map(str::to_string);
        let (Some(id), Some(call_id)) = (id, call_id) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        if !self.sip.terminate_call(id, &call_id) {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    /// `permit_call` / `revoke_call`: caller whitelisting per loop.
    pub(super) fn client_permit_call(&mut self, socket: ClientSocket, envelope: Envelope) {
        self.call_permission_request(socket, envelope, true)
    }

    pub(super) fn client_revoke_call(&mut self, socket: ClientSocket, envelope: Envelope) {
        self.call_permission_request(socket, envelope, false)
    }

    fn call_permission_request(
        &mut self,
        socket: ClientSocket,
        envelope: Envelope,
        permit: bool,
    ) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if conn.user.is_none() || conn.role.is_none() {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        }

        let id = envelope.id;
        let caller = envelope.param_str("caller").map(str::to_string);
        let callee = envelope.param_str("callee").map(str::to_string);
        let loop_name = envelope.param_str(keys::LOOP).map(str::to_string);
        let (Some(id), Some(caller), Some(callee), Some(loop_name)) =
            (id, caller, callee, loop_name)
        else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        let issued = if permit {
            self.sip.permit_call(id, &caller, &callee, &loop_name)
        } else {
            self.sip.revoke_call(id, &caller, &callee, &loop_name)
        };
        if !issued {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    /// `list_calls` / `list_call_permissions`.
    pub(super) fn client_list_calls(&mut self, socket: ClientSocket, envelope: Envelope) {
        self.sip_listing(socket, envelope, true)
    }

    pub(super) fn client_list_call_permissions(&mut self, socket: ClientSocket, envelope: Envelope) {
        self.sip_listing(socket, envelope, false)
    }

    fn sip_listing(&mut self, socket: ClientSocket, envelope: Envelope, calls: bool) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if conn.user.is_none() {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        }
        let Some(id) = envelope.id else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        let issued = if calls {
            self.sip.list_calls(id)
        } else {
            self.sip.list_permissions(id)
        };
        if !issued {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            return;
        }
        if !self.suspend(socket, envelope) {
            self.drop_connection(socket, true, true);
        }
    }

    pub(super) fn on_sip_event(&mut self, event: SipEvent) {
        match event {
            SipEvent::CallInitiated { id, call_id, outcome } => {
                let Some(pending) = self.correlator.unset(&id) else {
                    return;
                };
                if !outcome.is_ok() {
                    self.send(pending.socket, &pending.payload.outcome_response(&outcome));
                    return;
                }
                self.send_success(
                    pending.socket,
                    &pending.payload,
                    serde_json::json!({ "call": call_id }),
                );
            }
            SipEvent::CallTerminated { id, outcome }
            | SipEvent::PermitHandled { id, outcome }
            | SipEvent::RevokeHandled { id, outcome } => {
                let Some(pending) = self.correlator.unset(&id) else {
                    return;
                };
                self.send(pending.socket, &pending.payload.outcome_response(&outcome));
            }
            SipEvent::Calls { id, calls } => {
                let Some(pending) = self.correlator.unset(&id) else {
                    return;
                };
                self.send_success(
                    pending.socket,
                    &pending.payload,
                    serde_json::json!({ "calls": calls }),
                );
            }
            SipEvent::Permissions { id, permissions } => {
                let Some(pending) = self.correlator.unset(&id) else {
                    return;
                };
                self.send_success(
                    pending.socket,
                    &pending.payload,
                    serde_json::json!({ "permissions": permissions }),
                );
            }
            SipEvent::NewCall {
                call_id,
                loop_name,
                peer,
            } => {
                let message = Envelope::request(
                    "call",
                    serde_json::json!({
                        "call": call_id,
                        keys::LOOP: loop_name,
                        "peer": peer,
                    }),
                )
                .with_type(MessageType::LoopBroadcast);
                self.broadcasts
                    .send(Scope::Loop, &loop_name, &message, self.sink.as_ref());
            }
            SipEvent::CallEnded { call_id, loop_name } => {
                let message = Envelope::request(
                    "hangup",
                    serde_json::json!({
                        "call": call_id,
                        keys::LOOP: loop_name,
                    }),
                )
                .with_type(MessageType::LoopBroadcast);
                self.broadcasts
                    .send(Scope::Loop, &loop_name, &message, self.sink.as_ref());
            }
            SipEvent::ConnectionStatus { connected } => {
                let message = Envelope::request(
                    "sip",
                    serde_json::json!({ keys::CONNECTED: connected }),
                )
                .with_type(MessageType::SystemBroadcast);
                self.broadcasts
                    .send(Scope::System, keys::SYSTEM, &message, self.sink.as_ref());
            }
        }
    }
}
