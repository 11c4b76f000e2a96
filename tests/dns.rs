//! Tests for the DNS resolver against fake servers on loopback.

mod common;

use common::{
    addr, addrs, has_opt, reply, DualStack, FakeServer, Proto, TlsServer,
};
use domain_resolvers::base::Rcode;
use domain_resolvers::dns::{DnsConfig, DnsResolver, Transport};
use domain_resolvers::error::ErrorKind;
use domain_resolvers::{Network, Resolver};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const ZONE: &[(&str, &str)] = &[
    ("www.example.com.", "192.0.2.1"),
    ("www.example.com.", "2001:db8::10"),
    ("v4.example.com.", "192.0.2.2"),
];

fn resolver(server: SocketAddr, transport: Transport) -> DnsResolver {
    let mut config = DnsConfig::new(server);
    config.set_transport(transport);
    config.set_dialer(DualStack::new());
    config.set_timeout(Duration::from_secs(2));
    DnsResolver::new(config)
}

#[tokio::test]
async fn udp_lookup() {
    common::init_logging();
    let server = FakeServer::zone(ZONE).await;
    let dns = resolver(server.addr(), Transport::Udp);

    assert_eq!(
        dns.lookup_ip(Network::Ip, "www.example.com").await.unwrap(),
        addrs(&["2001:db8::10", "192.0.2.1"])
    );
    assert_eq!(server.udp_queries(), 2);
    assert_eq!(server.tcp_queries(), 0);

    assert_eq!(
        dns.lookup_ip(Network::Ip4, "WWW.Example.COM.").await.unwrap(),
        addrs(&["192.0.2.1"])
    );
    assert_eq!(
        dns.lookup_host("v4.example.com").await.unwrap(),
        vec!["192.0.2.2".to_string()]
    );
}

#[tokio::test]
async fn tcp_lookup() {
    common::init_logging();
    let server = FakeServer::zone(ZONE).await;
    let dns = resolver(server.addr(), Transport::Tcp);

    assert_eq!(
        dns.lookup_ip(Network::Ip6, "www.example.com").await.unwrap(),
        addrs(&["2001:db8::10"])
    );
    assert_eq!(server.udp_queries(), 0);
    assert_eq!(server.tcp_queries(), 1);
}

#[tokio::test]
async fn single_request() {
    let server = FakeServer::zone(ZONE).await;
    let mut config = DnsConfig::new(server.addr());
    config.set_single_request(true);
    config.set_dialer(DualStack::new());
    let dns = DnsResolver::new(config);

    assert_eq!(
        dns.lookup_ip(Network::Ip, "www.example.com").await.unwrap(),
        addrs(&["2001:db8::10", "192.0.2.1"])
    );
    assert_eq!(server.udp_queries(), 2);
}

#[tokio::test]
async fn truncated_answer_is_repeated_over_tcp() {
    common::init_logging();
    let zone = common::zone(ZONE);
    let server = FakeServer::start(Arc::new(
        move |query: &[u8], proto: Proto| match proto {
            Proto::Udp => Some(reply(query, Rcode::NoError, true, &[])),
            Proto::Tcp => zone(query, proto),
        },
    ))
    .await;
    let dns = resolver(server.addr(), Transport::Udp);

    assert_eq!(
        dns.lookup_ip(Network::Ip4, "www.example.com").await.unwrap(),
        addrs(&["192.0.2.1"])
    );
    assert_eq!(server.udp_queries(), 1);
    assert_eq!(server.tcp_queries(), 1);
}

#[tokio::test]
async fn cut_off_truncated_answer_is_repeated_over_tcp() {
    let zone = common::zone(ZONE);
    let server = FakeServer::start(Arc::new(
        move |query: &[u8], proto: Proto| match proto {
            Proto::Udp => {
                let mut resp =
                    reply(query, Rcode::NoError, true, &[addr("192.0.2.1")]);
                // The address record ends in the middle of its data.
                resp.truncate(resp.len() - 3);
                Some(resp)
            }
            Proto::Tcp => zone(query, proto),
        },
    ))
    .await;
    let dns = resolver(server.addr(), Transport::Udp);

    assert_eq!(
        dns.lookup_ip(Network::Ip4, "www.example.com").await.unwrap(),
        addrs(&["192.0.2.1"])
    );
    assert_eq!(server.udp_queries(), 1);
    assert_eq!(server.tcp_queries(), 1);
}

#[tokio::test]
async fn formerr_is_repeated_without_edns() {
    let zone = common::zone(ZONE);
    let server = FakeServer::start(Arc::new(
        move |query: &[u8], proto: Proto| {
            if has_opt(query) {
                Some(reply(query, Rcode::FormErr, false, &[]))
            } else {
                zone(query, proto)
            }
        },
    ))
    .await;
    let dns = resolver(server.addr(), Transport::Udp);

    assert_eq!(
        dns.lookup_ip(Network::Ip4, "www.example.com").await.unwrap(),
        addrs(&["192.0.2.1"])
    );
    assert_eq!(server.udp_queries(), 2);
}

#[tokio::test]
async fn edns_can_be_disabled() {
    let server = FakeServer::start(Arc::new(|query: &[u8], _: Proto| {
        let rcode = if has_opt(query) {
            Rcode::FormErr
        } else {
            Rcode::NXDomain
        };
        Some(reply(query, rcode, false, &[]))
    }))
    .await;
    let mut config = DnsConfig::new(server.addr());
    config.set_edns(false);
    let dns = DnsResolver::new(config);

    let err = dns.lookup_ip(Network::Ip4, "example.com").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(server.udp_queries(), 1);
}

#[tokio::test]
async fn nxdomain_is_not_found() {
    let server = FakeServer::zone(ZONE).await;
    let dns = resolver(server.addr(), Transport::Udp);

    let err = dns
        .lookup_ip(Network::Ip, "nope.example.com")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_temporary());
    assert_eq!(err.server(), Some(server.addr()));
    assert_eq!(err.name(), "nope.example.com.");
}

#[tokio::test]
async fn no_data_is_not_found() {
    let server = FakeServer::zone(ZONE).await;
    let dns = resolver(server.addr(), Transport::Udp);

    let err = dns
        .lookup_ip(Network::Ip6, "v4.example.com")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn servfail_is_temporary() {
    let server = FakeServer::start(Arc::new(|query: &[u8], _: Proto| {
        Some(reply(query, Rcode::ServFail, false, &[]))
    }))
    .await;
    let dns = resolver(server.addr(), Transport::Udp);

    let err = dns
        .lookup_ip(Network::Ip4, "www.example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerMisbehaving(Rcode::ServFail));
    assert!(err.is_temporary());
    assert!(!err.is_not_found());
    assert_eq!(err.server(), Some(server.addr()));
}

#[tokio::test]
async fn refused_is_permanent() {
    let server = FakeServer::start(Arc::new(|query: &[u8], _: Proto| {
        Some(reply(query, Rcode::Refused, false, &[]))
    }))
    .await;
    let dns = resolver(server.addr(), Transport::Udp);

    let err = dns
        .lookup_ip(Network::Ip4, "www.example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerMisbehaving(Rcode::Refused));
    assert!(!err.is_temporary());
}

#[tokio::test]
async fn silent_server_times_out() {
    let server =
        FakeServer::start(Arc::new(|_: &[u8], _: Proto| None::<Vec<u8>>))
            .await;
    let mut config = DnsConfig::new(server.addr());
    config.set_timeout(Duration::from_millis(200));
    let dns = DnsResolver::new(config);

    let err = dns
        .lookup_ip(Network::Ip4, "www.example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_timeout());
    assert!(err.is_temporary());
    assert_eq!(err.server(), Some(server.addr()));
}

#[tokio::test]
async fn invalid_name_is_not_found() {
    let server = FakeServer::zone(ZONE).await;
    let dns = resolver(server.addr(), Transport::Udp);

    let err = dns.lookup_ip(Network::Ip, "a..b").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(server.udp_queries(), 0);
}

#[tokio::test]
async fn failed_tls_handshake_is_permanent() {
    common::init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((sock, _)) = listener.accept().await {
            drop(sock);
        }
    });
    let dns = resolver(addr, Transport::Tls);

    let err = dns
        .lookup_ip(Network::Ip4, "www.example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TlsHandshake);
    assert!(!err.is_temporary());
}

fn tls_config(server: &TlsServer) -> DnsConfig {
    let mut config = DnsConfig::new(server.addr());
    config.set_transport(Transport::Tls);
    config.set_dialer(DualStack::new());
    config.set_timeout(Duration::from_secs(2));
    config.set_tls_config(TlsServer::client_config());
    config
}

#[tokio::test]
async fn tls_lookup() {
    common::init_logging();
    let server = TlsServer::zone(ZONE).await;
    let dns = DnsResolver::new(tls_config(&server));

    // The certificate is checked against the server’s IP address.
    assert_eq!(
        dns.lookup_ip(Network::Ip4, "www.example.com").await.unwrap(),
        addrs(&["192.0.2.1"])
    );
    assert_eq!(server.queries(), 1);
}

#[tokio::test]
async fn tls_server_name_must_match_certificate() {
    common::init_logging();
    let server = TlsServer::zone(ZONE).await;
    let mut config = tls_config(&server);
    config.set_server_name("dns.example.com");
    let dns = DnsResolver::new(config);

    let err = dns
        .lookup_ip(Network::Ip4, "www.example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TlsHandshake);
    assert!(!err.is_temporary());
    assert_eq!(err.server(), Some(server.addr()));
    assert_eq!(server.queries(), 0);
}
