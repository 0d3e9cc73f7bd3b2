// ── Request payloads ──
//
// The raw shape of link, unlink and set-default-gateway requests. Fields
// stay loosely typed where the caller may send anything (`mode`,
// `ip_address`) so that bad input is reported as a field error rather than
// a parse failure.

use serde::{Deserialize, Serialize};

use crate::model::{LinkId, SubnetId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub subnet: Option<SubnetId>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub default_gateway: bool,
}

impl LinkRequest {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: Some(mode.into()),
            ..Self::default()
        }
    }

    pub fn subnet(mut self, subnet: SubnetId) -> Self {
        self.subnet = Some(subnet);
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn default_gateway(mut self, default_gateway: bool) -> Self {
        self.default_gateway = default_gateway;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlinkRequest {
    #[serde(default)]
    pub id: Option<LinkId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetGatewayRequest {
    #[serde(default)]
    pub link_id: Option<LinkId>,
}
