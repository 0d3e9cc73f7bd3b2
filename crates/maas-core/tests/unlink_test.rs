#![allow(clippy::unwrap_used)]

mod common;

use common::{Lab, errors_json, ip};
use maas_core::{HostMapAction, LinkId, LinkRequest, SetGatewayRequest, UnlinkRequest};
use pretty_assertions::assert_eq;

fn unlink(id: LinkId) -> UnlinkRequest {
    UnlinkRequest { id: Some(id) }
}

#[tokio::test]
async fn id_is_required() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let result = service.unlink(eth0, &UnlinkRequest::default()).await;
    assert_eq!(errors_json(result), r#"{"id":["This field is required."]}"#);
}

#[tokio::test]
async fn unknown_id_on_bare_interface() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let result = service.unlink(eth0, &unlink(LinkId(512))).await;
    assert_eq!(
        errors_json(result),
        r#"{"id":["'512' is not a valid id. It should be one of: ."]}"#
    );
}

#[tokio::test]
async fn id_of_another_interface_is_unknown() {
    let lab = Lab::new();
    let (eth0, eth1, subnet) = (lab.eth0, lab.eth1, lab.unmanaged);
    let service = lab.service();

    let mine_a = service.link(eth0, &LinkRequest::new("dhcp")).await.unwrap().value;
    let mine_b = service
        .link(eth0, &LinkRequest::new("auto").subnet(subnet))
        .await
        .unwrap()
        .value;
    let theirs = service.link(eth1, &LinkRequest::new("dhcp")).await.unwrap().value;

    let result = service.unlink(eth0, &unlink(theirs.id)).await;
    assert_eq!(
        errors_json(result),
        format!(
            r#"{{"id":["'{}' is not a valid id. It should be one of: {}, {}."]}}"#,
            theirs.id, mine_a.id, mine_b.id
        )
    );
    // Repeating the request changes nothing.
    assert!(service.unlink(eth0, &unlink(theirs.id)).await.is_err());
    assert!(service.snapshot().await.link(theirs.id).is_some());
}

#[tokio::test]
async fn dhcp_unlink_on_unmanaged_subnet_deletes_link() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.unmanaged);
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("dhcp").subnet(subnet))
        .await
        .unwrap()
        .value;
    let removed = service.unlink(eth0, &unlink(link.id)).await.unwrap();
    assert_eq!(removed.value.id, link.id);
    assert!(service.snapshot().await.link(link.id).is_none());
    assert!(service.host_maps().calls().is_empty());
}

#[tokio::test]
async fn dhcp_unlink_on_managed_subnet_retracts_discovered_maps() {
    let mut lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    lab.inventory
        .add_discovered(eth0, subnet, ip("10.0.0.142"))
        .unwrap();
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("dhcp").subnet(subnet))
        .await
        .unwrap()
        .value;
    service.host_maps().clear();

    service.unlink(eth0, &unlink(link.id)).await.unwrap();
    let calls = service.host_maps().calls();
    assert!(matches!(&calls[..], [HostMapAction::Remove(m)] if m.ip == ip("10.0.0.142")));
}

#[tokio::test]
async fn static_unlink_on_managed_subnet_retracts_its_map() {
    let lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).ip_address("10.0.0.220"))
        .await
        .unwrap()
        .value;
    service.unlink(eth0, &unlink(link.id)).await.unwrap();

    let calls = service.host_maps().calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[1], HostMapAction::Remove(m) if m.ip == ip("10.0.0.220")));
}

#[tokio::test]
async fn unlink_releases_address_for_reuse() {
    let lab = Lab::new();
    let (eth0, eth1, subnet) = (lab.eth0, lab.eth1, lab.unmanaged);
    let service = lab.service();

    let request = LinkRequest::new("static").subnet(subnet).ip_address("192.168.1.40");
    let link = service.link(eth0, &request).await.unwrap().value;
    service.unlink(eth0, &unlink(link.id)).await.unwrap();
    service.link(eth1, &request).await.unwrap();
}

#[tokio::test]
async fn unlink_clears_node_gateway() {
    let lab = Lab::new();
    let (eth0, node, subnet) = (lab.eth0, lab.node, lab.unmanaged);
    let service = lab.service();

    let link = service
        .link(eth0, &LinkRequest::new("static").subnet(subnet).default_gateway(true))
        .await
        .unwrap()
        .value;
    assert_eq!(
        service.snapshot().await.node(node).unwrap().gateway_link_ipv4,
        Some(link.id)
    );

    service.unlink(eth0, &unlink(link.id)).await.unwrap();
    assert_eq!(service.snapshot().await.node(node).unwrap().gateway_link_ipv4, None);

    // Nothing usable is left to select.
    let result = service
        .set_default_gateway(eth0, &SetGatewayRequest::default())
        .await;
    assert_eq!(
        errors_json(result),
        r#"{"__all__":["This interface has no usable gateways."]}"#
    );
}

#[tokio::test]
async fn link_up_unlink_deletes_link() {
    let lab = Lab::new();
    let eth0 = lab.eth0;
    let service = lab.service();

    let link = service.link(eth0, &LinkRequest::new("link_up")).await.unwrap().value;
    service.unlink(eth0, &unlink(link.id)).await.unwrap();
    assert!(service.snapshot().await.links_on(eth0).is_empty());
}

#[tokio::test]
async fn discovered_addresses_cannot_be_unlinked() {
    let mut lab = Lab::new();
    let (eth0, subnet) = (lab.eth0, lab.managed);
    let observed = lab
        .inventory
        .add_discovered(eth0, subnet, ip("10.0.0.150"))
        .unwrap();
    let service = lab.service();

    let result = service.unlink(eth0, &unlink(observed)).await;
    assert_eq!(
        errors_json(result),
        format!(r#"{{"id":["'{observed}' is not a valid id. It should be one of: ."]}}"#)
    );
}
