use thiserror::Error;

/// Top-level error type for the `maas-api` crate.
///
/// Covers every failure mode of the outbound clients: transport, the DHCP
/// agent's response envelope, and archive downloads. `maas-core` maps these
/// into its own error types.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── DHCP agent ──────────────────────────────────────────────────
    /// Error reported by the DHCP agent (parsed from the `{status, message}` envelope).
    #[error("DHCP agent error: {message}")]
    Agent { message: String },

    /// The agent answered with an unexpected HTTP status.
    #[error("DHCP agent returned HTTP {status}")]
    AgentStatus { status: u16 },

    // ── Archive ─────────────────────────────────────────────────────
    /// Downloaded package does not match the checksum in the index.
    #[error("Checksum mismatch for {filename}: expected {expected}, got {actual}")]
    Checksum {
        filename: String,
        expected: String,
        actual: String,
    },

    /// The package index could not be decompressed.
    #[error("Failed to decompress package index: {0}")]
    Decompress(#[from] std::io::Error),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::AgentStatus { status: 404 } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn agent_error_is_not_a_missing_map() {
        let err = Error::Agent {
            message: "subnet not managed".into(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn missing_host_map_is_not_found() {
        assert!(Error::AgentStatus { status: 404 }.is_not_found());
    }
}
