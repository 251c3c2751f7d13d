//! Data management: keyset layouts and per-user data.

use voxloop_infra_common::ErrorCode;
use voxloop_signaling_core::envelope::keys;
use voxloop_signaling_core::{ClientSocket, Envelope};

use super::SessionController;

impl SessionController {
    /// `set_keyset_layout`: store a named keyset layout for the user.
    pub(super) fn client_set_keyset_layout(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let Some(user) = conn.user.clone() else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };

        let name = envelope.param_str("name").map(str::to_string);
        let layout = envelope.param("layout").cloned();
        let (Some(name), Some(layout)) = (name, layout) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        self.directory.set_keyset_layout(&user, &name, layout.clone());
        self.send_success(
            socket,
            &envelope,
            serde_json::json!({ "name": name, "layout": layout }),
        );
    }

    /// `get_keyset_layout`.
    pub(super) fn client_get_keyset_layout(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let Some(user) = conn.user.clone() else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };

        let Some(name) = envelope.param_str("name").map(str::to_string) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        match self.directory.keyset_layout(&user, &name) {
            Some(layout) => {
                self.send_success(
                    socket,
                    &envelope,
                    serde_json::json!({ "name": name, "layout": layout }),
                );
            }
            None => {
                self.send_error(socket, &envelope, ErrorCode::NotFound);
            }
        }
    }

    /// `set_user_data`: update the user's own data blob.
    ///
    /// With LDAP in use the directory owns credentials; a data blob
    /// trying to smuggle in a password change is rejected.
    pub(super) fn client_set_user_data(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let Some(user) = conn.user.clone() else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };

        let Some(data) = envelope.parameter.clone() else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };
        if self.config.ldap_enabled && data.get(keys::PASSWORD).is_some() {
            self.send_error(socket, &envelope, ErrorCode::LdapInUse);
            return;
        }

        self.directory.set_user_data(&user, data.clone());
        self.send_success(socket, &envelope, serde_json::json!({ keys::RESULT: data }));
    }

    /// `get_user_data`.
    pub(super) fn client_get_user_data(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let Some(user) = conn.user.clone() else {
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        };

        match self.directory.user_data(&user) {
            Some(data) => {
                self.send_success(socket, &envelope, serde_json::json!({ keys::RESULT: data }));
            }
            None => {
                self.send_error(socket, &envelope, ErrorCode::NotFound);
            }
        }
    }
}
