//! Interface command handlers.

use serde::Serialize;
use tabled::Tabled;

use maas_core::{AddressLink, Interface, Inventory};

use crate::cli::{GlobalOpts, InterfacesArgs, InterfacesCommand};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{self, LinkRow};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct InterfaceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Parents")]
    parents: String,
    #[tabled(rename = "Links")]
    links: String,
}

impl InterfaceRow {
    fn new(inventory: &Inventory, iface: &Interface) -> Self {
        Self {
            id: iface.id.to_string(),
            node: hostname(inventory, iface),
            name: iface.name.clone(),
            mac: iface.mac.to_string(),
            kind: iface.kind.to_string(),
            parents: parent_names(inventory, iface),
            links: inventory
                .links_on(iface.id)
                .into_iter()
                .map(|l| util::describe_link(inventory, l))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Structured view of one interface with its links.
#[derive(Serialize)]
struct InterfaceView<'a> {
    #[serde(flatten)]
    interface: &'a Interface,
    links: Vec<&'a AddressLink>,
}

fn hostname(inventory: &Inventory, iface: &Interface) -> String {
    inventory
        .node(iface.node)
        .map_or_else(|| iface.node.to_string(), |n| n.hostname.clone())
}

fn parent_names(inventory: &Inventory, iface: &Interface) -> String {
    iface
        .parents
        .iter()
        .map(|p| util::interface_name(inventory, *p))
        .collect::<Vec<_>>()
        .join(", ")
}

fn detail(inventory: &Inventory, view: &InterfaceView<'_>) -> String {
    let iface = view.interface;
    let mut lines = vec![
        format!("ID:      {}", iface.id),
        format!("Name:    {}", iface.name),
        format!("Node:    {}", hostname(inventory, iface)),
        format!("MAC:     {}", iface.mac),
        format!("Type:    {}", iface.kind),
        format!("VLAN:    {}", inventory.vlan(iface.vlan).map_or_else(|| iface.vlan.to_string(), |v| format!("{} ({})", v.vid, v.name))),
    ];
    if !iface.parents.is_empty() {
        lines.push(format!("Parents: {}", parent_names(inventory, iface)));
    }
    if view.links.is_empty() {
        lines.push("Links:   -".into());
    } else {
        lines.push("Links:".into());
        for link in &view.links {
            lines.push(format!("  [{}] {}", link.id, util::describe_link(inventory, link)));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: InterfacesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let inventory = ctx.service.snapshot().await;

    let out = match args.command {
        InterfacesCommand::List { node } => {
            let selected: Vec<&Interface> = inventory
                .interfaces
                .iter()
                .filter(|iface| {
                    node.as_deref().is_none_or(|n| {
                        iface.node.to_string() == n || hostname(&inventory, iface) == n
                    })
                })
                .collect();
            output::render_list(
                global.output,
                &selected,
                |iface| InterfaceRow::new(&inventory, iface),
                |iface| iface.name.clone(),
            )?
        }

        InterfacesCommand::Get { interface } => {
            let id = util::resolve_interface(&inventory, &interface)?;
            let view = InterfaceView {
                interface: inventory.require_interface(id)?,
                links: inventory.links_on(id),
            };
            output::render_single(
                global.output,
                &view,
                |v| detail(&inventory, v),
                |v| v.interface.id.to_string(),
            )?
        }

        InterfacesCommand::Links { interface } => {
            let id = util::resolve_interface(&inventory, &interface)?;
            let links = inventory.links_on(id);
            output::render_list(
                global.output,
                &links,
                |l| LinkRow::new(&inventory, l, ctx.painter),
                |l| l.id.to_string(),
            )?
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
