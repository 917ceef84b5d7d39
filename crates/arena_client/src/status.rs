//! Human-readable connection status for the UI collaborator.

use std::fmt;

use arena_net::Identity;

use crate::session::SessionState;

/// Snapshot of a session's connection state plus the last error reason.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub state: SessionState,
    pub identity: Option<Identity>,
    pub last_error: Option<String>,
}

impl ConnectionStatus {
    /// Status of a session that has not started its handshake.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            identity: None,
            last_error: None,
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = self
            .identity
            .map(|id| id.short())
            .unwrap_or_else(|| "?".to_string());
        match self.state {
            SessionState::Idle => f.write_str("Not connected")?,
            SessionState::Connecting => f.write_str("Connecting...")?,
            SessionState::Unregistered => write!(f, "Connected as {who}")?,
            SessionState::Registered => write!(f, "Playing as {who}")?,
            SessionState::Disconnected => f.write_str("Disconnected")?,
        }
        if let Some(err) = &self.last_error {
            write!(f, " ({err})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(ConnectionStatus::idle().to_string(), "Not connected");

        let identity = Identity::random();
        let status = ConnectionStatus {
            state: SessionState::Registered,
            identity: Some(identity),
            last_error: None,
        };
        assert_eq!(status.to_string(), format!("Playing as {}", identity.short()));

        let status = ConnectionStatus {
            state: SessionState::Disconnected,
            identity: Some(identity),
            last_error: Some("handshake timed out after 15s".into()),
        };
        assert_eq!(status.to_string(), "Disconnected (handshake timed out after 15s)");
    }
}
