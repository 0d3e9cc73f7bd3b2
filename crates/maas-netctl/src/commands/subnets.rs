//! Subnet command handlers.

use std::net::IpAddr;

use serde::Serialize;
use tabled::Tabled;

use maas_core::{Inventory, Subnet};

use crate::cli::{GlobalOpts, SubnetsArgs, SubnetsCommand};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SubnetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CIDR")]
    cidr: String,
    #[tabled(rename = "Gateway")]
    gateway: String,
    #[tabled(rename = "VLAN")]
    vlan: String,
    #[tabled(rename = "Dynamic")]
    dynamic: String,
    #[tabled(rename = "Static")]
    fixed: String,
    #[tabled(rename = "In use")]
    used: String,
}

fn or_dash(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

fn vlan_label(inventory: &Inventory, subnet: &Subnet) -> String {
    inventory
        .vlan(subnet.vlan)
        .map_or_else(|| subnet.vlan.to_string(), |v| v.vid.to_string())
}

impl SubnetRow {
    fn new(inventory: &Inventory, subnet: &Subnet) -> Self {
        Self {
            id: subnet.id.to_string(),
            name: subnet.name.clone(),
            cidr: subnet.cidr.to_string(),
            gateway: or_dash(subnet.gateway_ip),
            vlan: vlan_label(inventory, subnet),
            dynamic: or_dash(subnet.dynamic_range()),
            fixed: or_dash(subnet.static_range()),
            used: inventory.allocated_ips(subnet.id).len().to_string(),
        }
    }
}

/// Structured view of a subnet with the addresses held on it.
#[derive(Serialize)]
struct SubnetView<'a> {
    #[serde(flatten)]
    subnet: &'a Subnet,
    allocated: Vec<IpAddr>,
}

fn detail(inventory: &Inventory, view: &SubnetView<'_>) -> String {
    let s = view.subnet;
    let mut lines = vec![
        format!("ID:        {}", s.id),
        format!("Name:      {}", s.name),
        format!("CIDR:      {}", s.cidr),
        format!("Family:    {}", s.family()),
        format!("Gateway:   {}", or_dash(s.gateway_ip)),
        format!("VLAN:      {}", vlan_label(inventory, s)),
        format!("Managed:   {}", if s.is_managed() { "yes" } else { "no" }),
    ];
    if let (Some(dynamic), Some(fixed)) = (s.dynamic_range(), s.static_range()) {
        lines.push(format!("Dynamic:   {dynamic}"));
        lines.push(format!("Static:    {fixed}"));
    }
    if view.allocated.is_empty() {
        lines.push("Allocated: -".into());
    } else {
        lines.push("Allocated:".into());
        for ip in &view.allocated {
            let holder = inventory
                .link_holding(s.id, *ip)
                .map(|l| util::interface_name(inventory, l.interface))
                .unwrap_or_default();
            lines.push(format!("  {ip:<40} {holder}"));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: SubnetsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let inventory = ctx.service.snapshot().await;

    let out = match args.command {
        SubnetsCommand::List => output::render_list(
            global.output,
            &inventory.subnets,
            |s| SubnetRow::new(&inventory, s),
            |s| s.cidr.to_string(),
        )?,

        SubnetsCommand::Get { subnet } => {
            let id = util::resolve_subnet(&inventory, &subnet)?;
            let found = inventory.require_subnet(id)?;
            let mut allocated: Vec<IpAddr> = inventory.allocated_ips(id).into_iter().collect();
            allocated.sort_unstable();
            let view = SubnetView {
                subnet: found,
                allocated,
            };
            output::render_single(
                global.output,
                &view,
                |v| detail(&inventory, v),
                |v| v.subnet.cidr.to_string(),
            )?
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
