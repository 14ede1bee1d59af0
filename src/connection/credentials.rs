use std::fmt;

use crate::error::{ViewerError, ViewerResult};
use crate::persistence::settings::AppSettings;

pub const PROTOCOLS: [&str; 6] = ["neo4j", "neo4j+s", "neo4j+ssc", "bolt", "bolt+s", "bolt+ssc"];

/// Credentials of the active session. Only the connection form creates these.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.password.clear();
    }
}

/// Editable state of the connection dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionForm {
    pub protocol: String,
    pub host: String,
    pub port: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for ConnectionForm {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

impl ConnectionForm {
    /// Seed the form from persisted defaults; the password always starts empty.
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            protocol: settings.selected_protocol.clone(),
            host: settings.hostname.clone(),
            port: settings.port.clone(),
            database: settings.database.clone(),
            username: settings.username.clone(),
            password: String::new(),
        }
    }

    /// Client-side gate for the Submit button.
    pub fn can_submit(&self) -> bool {
        !self.username.is_empty() && !self.host.is_empty() && !self.password.is_empty()
    }

    pub fn validate(&self) -> ViewerResult<()> {
        let missing: Vec<&str> = [
            ("username", &self.username),
            ("host", &self.host),
            ("password", &self.password),
        ]
        .iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| *k)
        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ViewerError::InvalidForm(format!("missing {}", missing.join(", "))))
        }
    }

    pub fn connection_uri(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            uri: self.connection_uri(),
            username: self.username.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }

    /// Copy the non-secret fields into `settings`.
    pub fn store_into(&self, settings: &mut AppSettings) {
        settings.selected_protocol = self.protocol.clone();
        settings.hostname = self.host.clone();
        settings.database = self.database.clone();
        settings.username = self.username.clone();
        settings.port = self.port.clone();
    }

    pub fn clear_password(&mut self) {
        self.password.clear();
    }
}
