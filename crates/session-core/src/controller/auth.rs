//! Authentication and authorization handlers.

use voxloop_infra_common::ErrorCode;
use voxloop_signaling_core::envelope::keys;
use voxloop_signaling_core::{ClientSocket, Envelope};

use super::SessionController;
use crate::broadcast::Scope;

impl SessionController {
    /// `login` / `authenticate`.
    ///
    /// A previously issued session token may be re-presented as the
    /// password; if it matches the stored binding for `client`, the login
    /// succeeds without directory interaction. With LDAP enabled the
    /// request suspends on the asynchronous bind.
    pub(super) fn client_login(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        if conn.authenticated() {
            self.send_error(socket, &envelope, ErrorCode::AlreadyAuthenticated);
            return;
        }
        if envelope.id.is_none() {
            self.drop_connection(socket, true, true);
            return;
        }

        let client = envelope.client.clone();
        let user = envelope.param_str(keys::USER).map(str::to_string);
        let password = envelope.param_str(keys::PASSWORD).map(str::to_string);

        let (Some(user), Some(password)) = (user, password) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        // session token re-presented as password: no directory round trip
        if let Some(client_id) = &client {
            if self.user_sessions.user_of(client_id).is_some()
                && self.user_sessions.verify(client_id, &user, &password)
            {
                tracing::debug!(client = %client_id, "relogin with session token");
                self.finish_login(socket, &envelope, client.as_deref(), &user);
                return;
            }
        }

        if self.config.ldap_enabled {
            let Some(ldap) = &self.ldap else {
                tracing::error!("LDAP enabled but no authenticator wired");
                self.send_error(socket, &envelope, ErrorCode::Config);
                return;
            };
            let id = envelope.id.expect("checked above");
            tracing::debug!(user = %user, "requesting LDAP authentication");
            let ldap_ok = ldap.authenticate(id, &user, &password);
            if !ldap_ok || !self.suspend(socket, envelope) {
                self.drop_connection(socket, true, true);
            }
            return;
        }

        if !self.directory.authenticate(&user, &password) {
            tracing::warn!(%socket, user = %user, "local authentication failed");
            self.send_error(socket, &envelope, ErrorCode::Auth);
            self.drop_connection(socket, true, true);
            return;
        }

        self.finish_login(socket, &envelope, client.as_deref(), &user);
    }

    /// Directory bind result for a suspended login.
    pub(super) fn on_ldap_result(&mut self, id: uuid::Uuid, granted: bool) {
        let Some(pending) = self.correlator.unset(&id) else {
            // timed out meanwhile
            return;
        };
        let socket = pending.socket;
        let envelope = pending.payload;

        if !granted {
            tracing::warn!(%socket, "LDAP authentication rejected");
            self.send_error(socket, &envelope, ErrorCode::Auth);
            self.drop_connection(socket, true, true);
            return;
        }

        let client = envelope.client.clone();
        let Some(user) = envelope.param_str(keys::USER).map(str::to_string) else {
            self.drop_connection(socket, true, true);
            return;
        };
        tracing::info!(%socket, user = %user, "LDAP authentication granted");
        self.finish_login(socket, &envelope, client.as_deref(), &user);
    }

    fn finish_login(
        &mut self,
        socket: ClientSocket,
        envelope: &Envelope,
        client: Option<&str>,
        user: &str,
    ) {
        let token = match client {
            Some(client_id) => self.user_sessions.init(client_id, user),
            // no client id: token cannot be re-presented later
            None => uuid::Uuid::new_v4(),
        };

        self.broadcasts.set(Scope::User, user, socket);
        self.broadcasts.set(Scope::System, keys::SYSTEM, socket);

        if let Some(conn) = self.connections.get_mut(&socket) {
            conn.client = client.map(str::to_string);
            conn.user = Some(user.to_string());
        }

        let sent = self.send_success(
            socket,
            envelope,
            serde_json::json!({ keys::ID: user, keys::SESSION: token }),
        );
        if sent {
            tracing::info!(%socket, user, "authenticated");
        } else {
            tracing::error!(%socket, user, "authentication response undeliverable");
        }
    }

    /// `logout`: confirm, forget the session binding, tear down.
    pub(super) fn client_logout(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let client = conn.client.clone();
        let user = conn.user.clone();

        self.send_success(socket, &envelope, serde_json::json!({}));
        tracing::info!(%socket, user = user.as_deref().unwrap_or("-"), "client logout");

        if let Some(client_id) = client {
            self.user_sessions.delete(&client_id);
        }
        self.drop_connection(socket, true, true);
    }

    /// `update_login`: refresh the session binding lifetime.
    pub(super) fn client_update_login(&mut self, socket: ClientSocket, envelope: Envelope) {
        let client = envelope.client.clone();
        let session = envelope.param_str(keys::SESSION).map(str::to_string);
        let user = envelope.param_str(keys::USER).map(str::to_string);

        let (Some(client), Some(session), Some(user)) = (client, session, user) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        if !self.user_sessions.update(&client, &user, &session) {
            self.send_error(socket, &envelope, ErrorCode::Processing);
            return;
        }

        self.send_success(
            socket,
            &envelope,
            serde_json::json!({ keys::ID: user, keys::SESSION: session }),
        );
    }

    /// `authorize`: assume one role for this connection.
    pub(super) fn client_authorize(&mut self, socket: ClientSocket, envelope: Envelope) {
        let conn = self.connections.get(&socket).expect("dispatch ensured");
        let Some(user) = conn.user.clone() else {
            self.send_error(socket, &envelope, ErrorCode::NotAuthenticated);
            return;
        };
        if conn.authorized() {
            let response = envelope.error_response_raw(
                ErrorCode::NotImplemented.code(),
                "changing a role MUST be done using logout/login",
            );
            self.send(socket, &response);
            return;
        }

        let Some(role) = envelope.param_str(keys::ROLE).map(str::to_string) else {
            self.send_error(socket, &envelope, ErrorCode::ParameterMissing);
            return;
        };

        if !self.directory.authorize(&user, &role) {
            tracing::warn!(%socket, user = %user, role = %role, "authorization failed");
            self.send_error(socket, &envelope, ErrorCode::Auth);
            return;
        }

        self.broadcasts.set(Scope::Role, role.as_str(), socket);
        if let Some(conn) = self.connections.get_mut(&socket) {
            conn.role = Some(role.clone());
        }

        self.send_success(socket, &envelope, serde_json::json!({ keys::ID: role }));
        tracing::info!(%socket, user = %user, role = %role, "authorized");
    }
}
