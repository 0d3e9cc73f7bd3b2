//! Link, unlink and default-gateway handlers.

use serde::Serialize;
use tabled::Tabled;

use maas_core::{
    AddressFamily, AddressLink, InterfaceId, Inventory, LinkId, LinkRequest, SetGatewayRequest,
    UnlinkRequest,
};

use crate::cli::{GlobalOpts, LinkArgs, SetGatewayArgs, UnlinkArgs};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{self, LinkRow};

async fn interface_id(ctx: &Context, key: &str) -> Result<InterfaceId, CliError> {
    let inventory = ctx.service.snapshot().await;
    util::resolve_interface(&inventory, key)
}

fn render_link(
    ctx: &Context,
    inventory: &Inventory,
    link: &AddressLink,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        link,
        |l| {
            format!(
                "{} link {} on {}: {}",
                ctx.painter.good("✓"),
                l.id,
                util::interface_name(inventory, l.interface),
                util::describe_link(inventory, l)
            )
        },
        |l| l.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn render_links(
    ctx: &Context,
    inventory: &Inventory,
    links: &[AddressLink],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = output::render_list(
        global.output,
        links,
        |l| LinkRow::new(inventory, l, ctx.painter),
        |l| l.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Link / unlink ───────────────────────────────────────────────────

pub async fn link(ctx: &Context, args: LinkArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let inventory = ctx.service.snapshot().await;
    let interface = util::resolve_interface(&inventory, &args.interface)?;
    let subnet = args
        .subnet
        .as_deref()
        .map(|key| util::resolve_subnet(&inventory, key))
        .transpose()?;

    let request = LinkRequest {
        mode: args.mode,
        subnet,
        ip_address: args.ip_address,
        default_gateway: args.default_gateway,
    };
    let outcome = ctx.service.link(interface, &request).await?;
    ctx.save().await?;

    let inventory = ctx.service.snapshot().await;
    render_link(ctx, &inventory, &outcome.value, global)?;
    util::report_host_map_failures(&outcome.host_map_failures, ctx.painter, global.quiet);
    Ok(())
}

pub async fn unlink(ctx: &Context, args: UnlinkArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let interface = interface_id(ctx, &args.interface).await?;
    let request = UnlinkRequest {
        id: args.id.map(LinkId),
    };
    let before = ctx.service.snapshot().await;
    let outcome = ctx.service.unlink(interface, &request).await?;
    ctx.save().await?;

    let out = output::render_single(
        global.output,
        &outcome.value,
        |l| {
            format!(
                "{} removed link {} from {}: {}",
                ctx.painter.good("✓"),
                l.id,
                util::interface_name(&before, l.interface),
                util::describe_link(&before, l)
            )
        },
        |l| l.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    util::report_host_map_failures(&outcome.host_map_failures, ctx.painter, global.quiet);
    Ok(())
}

// ── Gateways ────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Tabled)]
struct GatewayRow {
    #[tabled(rename = "Family")]
    family: AddressFamily,
    #[tabled(rename = "Link")]
    link: LinkId,
    #[tabled(rename = "Subnet")]
    subnet: String,
    #[tabled(rename = "Gateway")]
    gateway: String,
}

impl GatewayRow {
    fn new(inventory: &Inventory, family: AddressFamily, link: LinkId) -> Self {
        let subnet = inventory
            .link(link)
            .and_then(|l| l.subnet)
            .and_then(|s| inventory.subnet(s));
        Self {
            family,
            link,
            subnet: subnet.map_or_else(|| "-".into(), |s| s.name.clone()),
            gateway: subnet
                .and_then(|s| s.gateway_ip)
                .map_or_else(|| "-".into(), |ip| ip.to_string()),
        }
    }
}

fn render_gateways(rows: &[GatewayRow], global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(
        global.output,
        rows,
        GatewayRow::clone,
        |r| format!("{} {}", r.family, r.link),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn set_default_gateway(
    ctx: &Context,
    args: SetGatewayArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let interface = interface_id(ctx, &args.interface).await?;
    let request = SetGatewayRequest {
        link_id: args.link_id.map(LinkId),
    };
    let assignment = ctx.service.set_default_gateway(interface, &request).await?;
    ctx.save().await?;

    let inventory = ctx.service.snapshot().await;
    let rows: Vec<GatewayRow> = assignment
        .into_iter()
        .map(|(family, link)| GatewayRow::new(&inventory, family, link))
        .collect();
    render_gateways(&rows, global)
}

pub async fn gateway_choices(
    ctx: &Context,
    interface: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let interface = interface_id(ctx, interface).await?;
    let candidates = ctx.service.gateway_choices(interface).await?;

    let inventory = ctx.service.snapshot().await;
    let rows: Vec<GatewayRow> = [AddressFamily::Ipv4, AddressFamily::Ipv6]
        .into_iter()
        .flat_map(|family| {
            candidates
                .family(family)
                .iter()
                .map(move |link| (family, *link))
        })
        .map(|(family, link)| GatewayRow::new(&inventory, family, link))
        .collect();
    render_gateways(&rows, global)
}

// ── AUTO addresses ──────────────────────────────────────────────────

pub async fn claim_auto(ctx: &Context, interface: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let interface = interface_id(ctx, interface).await?;
    let outcome = ctx.service.claim_auto_ips(interface).await?;
    ctx.save().await?;

    let inventory = ctx.service.snapshot().await;
    render_links(ctx, &inventory, &outcome.value, global)?;
    util::report_host_map_failures(&outcome.host_map_failures, ctx.painter, global.quiet);
    Ok(())
}

pub async fn release_auto(
    ctx: &Context,
    interface: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let interface = interface_id(ctx, interface).await?;
    let outcome = ctx.service.release_auto_ips(interface).await?;
    ctx.save().await?;

    let inventory = ctx.service.snapshot().await;
    render_links(ctx, &inventory, &outcome.value, global)?;
    util::report_host_map_failures(&outcome.host_map_failures, ctx.painter, global.quiet);
    Ok(())
}
