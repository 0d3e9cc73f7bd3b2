//! Shared helpers for command handlers.

use maas_core::{
    AddressLink, HostMapAction, HostMapFailure, Interface, InterfaceId, Inventory, LinkId,
    SubnetId,
};
use tabled::Tabled;

use crate::error::CliError;
use crate::output::Painter;

/// Resolve an interface id or name.
pub fn resolve_interface(inventory: &Inventory, key: &str) -> Result<InterfaceId, CliError> {
    inventory
        .find_interface(key)
        .map(|iface| iface.id)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "interface".into(),
            identifier: key.into(),
            list_command: "interfaces list".into(),
        })
}

/// Resolve a subnet id, name or CIDR. Unknown numeric ids pass through so
/// the link engine reports them against the `subnet` field.
pub fn resolve_subnet(inventory: &Inventory, key: &str) -> Result<SubnetId, CliError> {
    if let Some(subnet) = inventory.find_subnet(key) {
        return Ok(subnet.id);
    }
    key.parse::<SubnetId>().map_err(|_| CliError::NotFound {
        resource_type: "subnet".into(),
        identifier: key.into(),
        list_command: "subnets list".into(),
    })
}

/// "STATIC" / "LINK_UP" / ... as users know the modes.
pub fn mode_label(link: &AddressLink) -> String {
    link.mode().map_or_else(
        || link.alloc_type.to_string(),
        |mode| mode.to_string().to_uppercase(),
    )
}

pub fn subnet_label(inventory: &Inventory, subnet: Option<SubnetId>) -> String {
    match subnet {
        Some(id) => inventory
            .subnet(id)
            .map_or_else(|| id.to_string(), |s| format!("{} ({})", s.name, s.cidr)),
        None => "-".into(),
    }
}

/// One-line description, e.g. "STATIC lab (10.0.0.0/24) 10.0.0.200".
pub fn describe_link(inventory: &Inventory, link: &AddressLink) -> String {
    let mut parts = vec![mode_label(link)];
    if link.subnet.is_some() {
        parts.push(subnet_label(inventory, link.subnet));
    }
    if let Some(ip) = link.ip {
        parts.push(ip.to_string());
    }
    parts.join(" ")
}

// ── Link table ──────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct LinkRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Mode")]
    pub mode: String,
    #[tabled(rename = "Subnet")]
    pub subnet: String,
    #[tabled(rename = "IP")]
    pub ip: String,
    #[tabled(rename = "Gateway")]
    pub gateway: String,
}

impl LinkRow {
    pub fn new(inventory: &Inventory, link: &AddressLink, painter: Painter) -> Self {
        let gateway_of = |id: LinkId| {
            inventory
                .interface(link.interface)
                .and_then(|iface| inventory.node(iface.node))
                .is_some_and(|node| {
                    node.gateway_link_ipv4 == Some(id) || node.gateway_link_ipv6 == Some(id)
                })
        };
        Self {
            id: link.id.to_string(),
            mode: mode_label(link),
            subnet: subnet_label(inventory, link.subnet),
            ip: link.ip.map_or_else(|| painter.dim("-"), |ip| ip.to_string()),
            gateway: if gateway_of(link.id) {
                painter.good("default")
            } else {
                String::new()
            },
        }
    }
}

/// `maas-netctl` refers to an interface by its name in messages.
pub fn interface_name(inventory: &Inventory, id: InterfaceId) -> String {
    inventory
        .interface(id)
        .map_or_else(|| id.to_string(), |iface: &Interface| iface.name.clone())
}

// ── Host-map failures ───────────────────────────────────────────────

/// Tell the user which host-map pushes failed. The change itself is
/// committed; the failed calls wait in the inventory for `reconcile`.
pub fn report_host_map_failures(failures: &[HostMapFailure], painter: Painter, quiet: bool) {
    if quiet || failures.is_empty() {
        return;
    }
    for failure in failures {
        let (verb, map) = match &failure.action {
            HostMapAction::Add(map) => ("add", map),
            HostMapAction::Remove(map) => ("remove", map),
        };
        eprintln!(
            "{} host map {verb} {} -> {} on {} failed: {}",
            painter.warn("warning:"),
            map.mac,
            map.ip,
            map.cidr,
            failure.error
        );
    }
    eprintln!(
        "{}",
        painter.dim("queued for retry; run `maas-netctl reconcile` once the agent is reachable")
    );
}
