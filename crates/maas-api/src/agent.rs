// DHCP agent HTTP client
//
// Pushes and retracts static host mappings (IP-to-MAC bindings) on the
// agent that manages a subnet's DHCP server. Responses are wrapped in a
// `{ status, message }` envelope, which is stripped before the caller sees
// the result.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// A static host mapping as understood by the DHCP agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMapEntry {
    /// Identifier of the subnet whose DHCP server owns the mapping.
    pub subnet_id: u64,
    /// CIDR of that subnet, so the agent can pick the right pool.
    pub cidr: String,
    pub ip: IpAddr,
    pub mac: String,
    /// Interface name, used by the agent as the host declaration name.
    pub hostname: String,
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for a DHCP agent.
pub struct DhcpAgentClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DhcpAgentClient {
    /// Create a new agent client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create an agent client with a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The agent base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/api/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        );
        Ok(Url::parse(&full)?)
    }

    /// Create (or replace) the host mapping for `entry.ip`.
    pub async fn add_host_map(&self, entry: &HostMapEntry) -> Result<(), Error> {
        let url = self.api_url("host-maps")?;
        debug!(ip = %entry.ip, mac = %entry.mac, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(entry)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_envelope(resp).await
    }

    /// Remove the host mapping for `entry.ip` on `entry.subnet_id`.
    ///
    /// Removing a mapping the agent does not know about is not an error.
    pub async fn remove_host_map(&self, entry: &HostMapEntry) -> Result<(), Error> {
        let url = self.api_url(&format!("host-maps/{}/{}", entry.subnet_id, entry.ip))?;
        debug!(ip = %entry.ip, "DELETE {}", url);

        let resp = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(Error::Transport)?;

        match parse_envelope(resp).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

/// Parse the `{ status, message }` envelope, returning `Ok(())` on
/// `"ok"` or an `Error::Agent` otherwise.
async fn parse_envelope(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if body.trim().is_empty() {
        return if status.is_success() {
            Ok(())
        } else {
            Err(Error::AgentStatus {
                status: status.as_u16(),
            })
        };
    }

    let envelope: AgentResponse = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(Error::AgentStatus {
                status: status.as_u16(),
            });
        }
        Err(e) => {
            return Err(Error::Deserialization {
                message: e.to_string(),
                body,
            });
        }
    };

    match envelope.status.as_str() {
        "ok" if status.is_success() => Ok(()),
        "ok" => Err(Error::AgentStatus {
            status: status.as_u16(),
        }),
        _ if status == reqwest::StatusCode::NOT_FOUND => Err(Error::AgentStatus { status: 404 }),
        other => Err(Error::Agent {
            message: envelope
                .message
                .unwrap_or_else(|| format!("status={other}")),
        }),
    }
}
