#![allow(clippy::unwrap_used)]

mod common;

use common::{Lab, errors_json, ip, managed_ranges};
use maas_core::{
    AddressFamily, AllocType, CoreError, HostMapAction, InterfaceKind, LinkMode, LinkRequest,
    SubnetId,
};
use pretty_assertions::assert_eq;

// ── Input parsing ───────────────────────────────────────────────────

#[tokio::test]
async fn mode_is_required() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let result = service.link(eth0, &LinkRequest::default()).await;
    assert_eq!(errors_json(result), r#"{"mode":["This field is required."]}"#);
}

#[tokio::test]
async fn mode_is_case_insensitive() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let outcome = service.link(eth0, &LinkRequest::new("DHCP")).await.unwrap();
    assert_eq!(outcome.value.alloc_type, AllocType::Dhcp);
}

#[tokio::test]
async fn unknown_mode_is_an_invalid_choice() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let result = service.link(eth0, &LinkRequest::new("bogus")).await;
    assert_eq!(
        errors_json(result),
        r#"{"mode":["Select a valid choice. bogus is not one of the available choices."]}"#
    );
}

#[tokio::test]
async fn subnet_must_be_on_interface_vlan() {
    let lab = Lab::new();
    let (eth0, elsewhere) = (lab.eth0, lab.elsewhere);
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("dhcp").subnet(elsewhere))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"subnet":["Select a valid choice. That choice is not one of the available choices."]}"#
    );
}

#[tokio::test]
async fn ip_address_must_parse() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.unmanaged);
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).ip_address("10.0.0.999"))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"ip_address":["Enter a valid IPv4 or IPv6 address."]}"#
    );
}

#[tokio::test]
async fn unknown_interface_is_not_a_field_error() {
    let service = Lab::new().service();
    let err = service
        .link(maas_core::InterfaceId(999), &LinkRequest::new("dhcp"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

// ── AUTO ────────────────────────────────────────────────────────────

#[tokio::test]
async fn auto_requires_subnet() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let result = service.link(eth0, &LinkRequest::new("auto")).await;
    assert_eq!(errors_json(result), r#"{"subnet":["This field is required."]}"#);
}

#[tokio::test]
async fn auto_creates_pending_link_on_subnet() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("auto").subnet(subnet))
        .await
        .unwrap()
        .value;
    assert_eq!(link.alloc_type, AllocType::Auto);
    assert_eq!(link.subnet, Some(subnet));
    assert_eq!(link.ip, None);
    assert_eq!(link.mode(), Some(LinkMode::Auto));
    assert!(service.host_maps().calls().is_empty());
}

#[tokio::test]
async fn auto_sets_node_gateway_per_family() {
    let lab = Lab::new();
    let (eth0, node, v4, v6) = (lab.eth0, lab.node, lab.unmanaged, lab.v6);
    let service = lab.service();

    let link4 = service
        .link(eth0, &LinkRequest::new("auto").subnet(v4).default_gateway(true))
        .await
        .unwrap()
        .value;
    let link6 = service
        .link(eth0, &LinkRequest::new("auto").subnet(v6).default_gateway(true))
        .await
        .unwrap()
        .value;

    let inventory = service.snapshot().await;
    let node = inventory.node(node).unwrap();
    assert_eq!(node.gateway_link(AddressFamily::Ipv4), Some(link4.id));
    assert_eq!(node.gateway_link(AddressFamily::Ipv6), Some(link6.id));
}

#[tokio::test]
async fn auto_default_gateway_requires_subnet() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("auto").default_gateway(true))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"default_gateway":["Subnet is required when default_gateway is True."],"subnet":["This field is required."]}"#
    );
}

#[tokio::test]
async fn auto_default_gateway_requires_subnet_gateway_ip() {
    let lab = Lab::new();
    let (eth0, no_gw) = (lab.eth0, lab.no_gw);
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("auto").subnet(no_gw).default_gateway(true))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"default_gateway":["Cannot set as default gateway because subnet lab-nogw doesn't provide a gateway IP address."]}"#
    );
}

// ── DHCP ────────────────────────────────────────────────────────────

#[tokio::test]
async fn dhcp_rejected_when_already_dhcp_from_subnet() {
    let mut lab = Lab::new();
    let subnet = lab.add_subnet("eth0-subnet", "10.20.0.0/24", None, Default::default());
    let eth0 = lab.eth0;
    let service = lab.service();

    service
        .link(eth0, &LinkRequest::new("dhcp").subnet(subnet))
        .await
        .unwrap();
    let err = service.link(eth0, &LinkRequest::new("dhcp")).await.unwrap_err();
    let errors = err.field_errors().unwrap();
    assert_eq!(
        errors.get("mode").unwrap(),
        ["Interface is already set to DHCP from 'eth0-subnet'."]
    );
}

#[tokio::test]
async fn dhcp_rejected_when_already_dhcp_without_subnet() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    service.link(eth0, &LinkRequest::new("dhcp")).await.unwrap();
    let result = service.link(eth0, &LinkRequest::new("dhcp")).await;
    assert_eq!(errors_json(result), r#"{"mode":["Interface is already set to DHCP."]}"#);

    let inventory = service.snapshot().await;
    let dhcp = inventory
        .links_on(eth0)
        .iter()
        .filter(|l| l.alloc_type == AllocType::Dhcp)
        .count();
    assert_eq!(dhcp, 1);
}

#[tokio::test]
async fn dhcp_rejects_default_gateway() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.unmanaged);
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("dhcp").subnet(subnet).default_gateway(true))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"default_gateway":["Cannot use in mode 'dhcp'."]}"#
    );
}

#[tokio::test]
async fn dhcp_reports_gateway_conflict_before_existing_dhcp() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    let service = lab.service();

    service
        .link(eth0, &LinkRequest::new("dhcp").subnet(subnet))
        .await
        .unwrap();
    let result = service
        .link(eth0, &LinkRequest::new("dhcp").subnet(subnet).default_gateway(true))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"default_gateway":["Cannot use in mode 'dhcp'."],"mode":["Interface is already set to DHCP from 'lab-managed'."]}"#
    );
}

#[tokio::test]
async fn dhcp_creates_link_with_or_without_subnet() {
    let lab = Lab::new();
    let (eth0, eth1, subnet) = (lab.eth0, lab.eth1, lab.unmanaged);
    let service = lab.service();

    let bound = service
        .link(eth0, &LinkRequest::new("dhcp").subnet(subnet))
        .await
        .unwrap()
        .value;
    assert_eq!((bound.alloc_type, bound.subnet), (AllocType::Dhcp, Some(subnet)));

    let unbound = service.link(eth1, &LinkRequest::new("dhcp")).await.unwrap().value;
    assert_eq!((unbound.alloc_type, unbound.subnet), (AllocType::Dhcp, None));
}

#[tokio::test]
async fn dhcp_on_managed_subnet_maps_discovered_addresses() {
    let mut lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    lab.inventory
        .add_discovered(eth0, subnet, ip("10.0.0.150"))
        .unwrap();
    let service = lab.service();

    service
        .link(eth0, &LinkRequest::new("dhcp").subnet(subnet))
        .await
        .unwrap();

    let calls = service.host_maps().calls();
    assert_eq!(calls.len(), 1);
    let HostMapAction::Add(map) = &calls[0] else {
        panic!("expected add, got {calls:?}");
    };
    assert_eq!(map.ip, ip("10.0.0.150"));
    assert_eq!(map.mac.as_str(), "52:54:00:12:34:01");
}

// ── STATIC ──────────────────────────────────────────────────────────

#[tokio::test]
async fn static_requires_subnet() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let result = service.link(eth0, &LinkRequest::new("static")).await;
    assert_eq!(errors_json(result), r#"{"subnet":["This field is required."]}"#);
}

#[tokio::test]
async fn static_rejects_address_outside_subnet() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.unmanaged);
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).ip_address("fd00::20"))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"ip_address":["IP address is not in the given subnet 'lab-unmanaged'."]}"#
    );
}

#[tokio::test]
async fn static_rejects_address_in_dynamic_range() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).ip_address("10.0.0.100"))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"ip_address":["IP address is inside a managed dynamic range 10.0.0.100 to 10.0.0.199."]}"#
    );
}

#[tokio::test]
async fn static_rejects_address_in_use() {
    let lab = Lab::new();
    let (eth0, eth1, subnet) = (lab.eth0, lab.eth1, lab.unmanaged);
    let service = lab.service();

    let request = LinkRequest::new("static").subnet(subnet).ip_address("192.168.1.50");
    service.link(eth0, &request).await.unwrap();
    let result = service.link(eth1, &request).await;
    assert_eq!(errors_json(result), r#"{"ip_address":["IP address is already in use."]}"#);
}

#[tokio::test]
async fn static_sets_given_address_on_managed_subnet() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).ip_address("10.0.0.200"))
        .await
        .unwrap()
        .value;
    assert_eq!(link.alloc_type, AllocType::Sticky);
    assert_eq!(link.ip, Some(ip("10.0.0.200")));

    let calls = service.host_maps().calls();
    assert!(matches!(&calls[..], [HostMapAction::Add(m)] if m.ip == ip("10.0.0.200")));
}

#[tokio::test]
async fn static_picks_from_cidr_on_unmanaged_subnet() {
    let lab = Lab::new();
    let (eth0, eth1, subnet) = (lab.eth0, lab.eth1, lab.unmanaged);
    let service = lab.service();

    let first = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet))
        .await
        .unwrap();
    let second = service
        .link(eth1, &LinkRequest::new("static").subnet(subnet))
        .await
        .unwrap();

    // .0 is the network address, .1 the gateway.
    assert_eq!(first.value.ip, Some(ip("192.168.1.2")));
    assert_eq!(second.value.ip, Some(ip("192.168.1.3")));
    assert!(service.host_maps().calls().is_empty());
}

#[tokio::test]
async fn static_picks_from_static_range_on_managed_subnet() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet))
        .await
        .unwrap()
        .value;
    assert_eq!(link.ip, Some(ip("10.0.0.200")));
    assert_eq!(service.host_maps().calls().len(), 1);
}

#[tokio::test]
async fn static_reports_exhausted_range() {
    let mut lab = Lab::new();
    let tiny = lab.add_subnet(
        "tiny",
        "10.30.0.0/24",
        None,
        managed_ranges(("10.30.0.10", "10.30.0.20"), ("10.30.0.30", "10.30.0.30")),
    );
    let (eth0, eth1) = (lab.eth0, lab.eth1);
    let service = lab.service();

    service
        .link(eth0, &LinkRequest::new("static").subnet(tiny))
        .await
        .unwrap();
    let result = service.link(eth1, &LinkRequest::new("static").subnet(tiny)).await;
    assert_eq!(
        errors_json(result),
        r#"{"ip_address":["No more IPs available in subnet 'tiny'."]}"#
    );
}

#[tokio::test]
async fn static_default_gateway_on_unmanaged_subnet_end_to_end() {
    let lab = Lab::new();
    let (eth0, node, subnet) = (lab.eth0, lab.node, lab.unmanaged);
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).default_gateway(true))
        .await
        .unwrap()
        .value;

    let inventory = service.snapshot().await;
    let links = inventory.links_on(eth0);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].alloc_type, AllocType::Sticky);
    let cidr = inventory.subnet(subnet).unwrap().cidr;
    assert!(cidr.contains(link.ip.unwrap()));
    assert_eq!(inventory.node(node).unwrap().gateway_link_ipv4, Some(link.id));
}

#[tokio::test]
async fn static_default_gateway_ipv6() {
    let lab = Lab::new();
    let (eth0, node, subnet) = (lab.eth0, lab.node, lab.v6);
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).default_gateway(true))
        .await
        .unwrap()
        .value;
    assert_eq!(link.ip, Some(ip("fd00::2")));
    let inventory = service.snapshot().await;
    assert_eq!(inventory.node(node).unwrap().gateway_link_ipv6, Some(link.id));
    assert_eq!(inventory.node(node).unwrap().gateway_link_ipv4, None);
}

// ── LINK_UP ─────────────────────────────────────────────────────────

#[tokio::test]
async fn link_up_rejected_when_other_links_exist() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    service.link(eth0, &LinkRequest::new("dhcp")).await.unwrap();
    let result = service.link(eth0, &LinkRequest::new("link_up")).await;
    assert_eq!(
        errors_json(result),
        r#"{"mode":["Cannot configure interface to link up (with no IP address) while other links are already configured."]}"#
    );
}

#[tokio::test]
async fn link_up_ignores_observed_addresses() {
    let mut lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    lab.inventory
        .add_discovered(eth0, subnet, ip("10.0.0.150"))
        .unwrap();
    let service = lab.service();

    let up = service
        .link(eth0, &LinkRequest::new("link_up"))
        .await
        .unwrap()
        .value;
    assert_eq!(up.mode(), Some(LinkMode::LinkUp));

    // The observed address is still there alongside the new link.
    let inventory = service.snapshot().await;
    let kinds: Vec<_> = inventory.links_on(eth0).iter().map(|l| l.alloc_type).collect();
    assert_eq!(kinds, [AllocType::Discovered, AllocType::Sticky]);

    // Once configured, the interface refuses a second link-up.
    let result = service.link(eth0, &LinkRequest::new("link_up")).await;
    assert!(errors_json(result).contains("other links are already configured"));
}

#[tokio::test]
async fn link_up_reports_gateway_conflict_before_other_links() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    service.link(eth0, &LinkRequest::new("dhcp")).await.unwrap();
    let result = service
        .link(eth0, &LinkRequest::new("link_up").default_gateway(true))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"default_gateway":["Cannot use in mode 'link_up'."],"mode":["Cannot configure interface to link up (with no IP address) while other links are already configured."]}"#
    );
}

#[tokio::test]
async fn link_up_rejects_default_gateway() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("link_up").default_gateway(true))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"default_gateway":["Cannot use in mode 'link_up'."]}"#
    );
}

#[tokio::test]
async fn link_up_creates_sticky_link_without_address() {
    let lab = Lab::new();
    let (eth0, eth1, subnet) = (lab.eth0, lab.eth1, lab.unmanaged);
    let service = lab.service();

    let bound = service
        .link(eth0, &LinkRequest::new("link_up").subnet(subnet))
        .await
        .unwrap()
        .value;
    assert_eq!((bound.alloc_type, bound.subnet, bound.ip), (AllocType::Sticky, Some(subnet), None));
    assert_eq!(bound.mode(), Some(LinkMode::LinkUp));

    let unbound = service.link(eth1, &LinkRequest::new("link_up")).await.unwrap().value;
    assert_eq!(unbound.subnet, None);
}

#[tokio::test]
async fn configuring_an_address_replaces_link_up() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.unmanaged);
    let service = lab.service();

    let up = service.link(eth0, &LinkRequest::new("link_up")).await.unwrap().value;
    let auto = service
        .link(eth0, &LinkRequest::new("auto").subnet(subnet))
        .await
        .unwrap()
        .value;

    let inventory = service.snapshot().await;
    let ids: Vec<_> = inventory.links_on(eth0).iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![auto.id]);
    assert!(inventory.link(up.id).is_none());
}

// ── Aggregates ──────────────────────────────────────────────────────

#[tokio::test]
async fn bond_member_cannot_be_linked() {
    let mut lab = Lab::new();
    let (eth0, eth1, subnet) = (lab.eth0, lab.eth1, lab.managed);
    lab.add_interface(InterfaceKind::Bond, "bond0", "52:54:00:12:34:10", &[eth0, eth1]);
    let service = lab.service();

    let result = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).ip_address("10.0.0.200"))
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"bond":["Cannot link interface(eth0) when interface is in a bond(bond0)."]}"#
    );
}

#[tokio::test]
async fn bridge_member_cannot_be_linked() {
    let mut lab = Lab::new();
    let eth1 = lab.eth1;
    lab.add_interface(InterfaceKind::Bridge, "br0", "52:54:00:12:34:11", &[eth1]);
    let service = lab.service();

    let result = service.link(eth1, &LinkRequest::new("dhcp")).await;
    assert_eq!(
        errors_json(result),
        r#"{"bridge":["Cannot link interface(eth1) when interface is in a bridge(br0)."]}"#
    );
}

#[tokio::test]
async fn vlan_interface_on_a_nic_can_be_linked() {
    let mut lab = Lab::new();
    let eth0 = lab.eth0;
    let vlan_if = lab.add_interface(InterfaceKind::Vlan, "eth0.10", "52:54:00:12:34:01", &[eth0]);
    let service = lab.service();

    service.link(eth0, &LinkRequest::new("dhcp")).await.unwrap();
    service.link(vlan_if, &LinkRequest::new("dhcp")).await.unwrap();
}

#[tokio::test]
async fn errors_are_collected_not_short_circuited() {
    let mut lab = Lab::new();
    let (eth0, eth1) = (lab.eth0, lab.eth1);
    lab.add_interface(InterfaceKind::Bond, "bond0", "52:54:00:12:34:10", &[eth0, eth1]);
    let service = lab.service();

    let err = service
        .link(
            eth0,
            &LinkRequest::new("static")
                .subnet(SubnetId(404))
                .ip_address("nonsense")
                .default_gateway(true),
        )
        .await
        .unwrap_err();
    let errors = err.field_errors().unwrap();
    let fields: Vec<_> = errors.iter().map(|(f, _)| f).collect();
    assert_eq!(fields, ["subnet", "ip_address", "bond"]);
    assert_eq!(service.store().version(), 0);
}
