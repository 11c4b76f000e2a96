//! A resolver asking a DNS server.
//!
//! [`DnsResolver`] is the leaf resolver that actually talks DNS. It asks a
//! single recursive server, configured via [`DnsConfig`], for the A and/or
//! AAAA records of a name over UDP, TCP, or TLS.
//!
//! The resolver keeps no state between lookups. Each query opens a
//! connection of its own which is closed again once the answer has been
//! received.

pub use self::transport::{Transport, UnsupportedProtocol};

use crate::addrselect::sort_by_rfc6724;
use crate::base::iana::{Rcode, Rtype};
use crate::base::name;
use crate::error::Error;
use crate::net::{Dialer, DirectDialer};
use crate::resolver::{LookupIp, Network, Resolver};
use futures_util::future::join_all;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::debug;

mod transport;

/// The default time allowed for a query.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

//------------ DnsConfig -----------------------------------------------------

/// Configuration for a [`DnsResolver`].
#[derive(Clone)]
pub struct DnsConfig {
    /// The address of the server.
    ///
    /// A port of 0 is replaced with the default port of the transport.
    server: SocketAddr,

    /// The transport protocol.
    transport: Transport,

    /// The time allowed for connecting and a complete exchange.
    timeout: Duration,

    /// Used to open all connections.
    dialer: Arc<dyn Dialer>,

    /// The TLS client configuration.
    ///
    /// If missing, the Mozilla root certificates are trusted.
    tls_config: Option<Arc<ClientConfig>>,

    /// The name to verify the server certificate against.
    ///
    /// If missing, the server’s IP address is used.
    server_name: Option<String>,

    /// Query A and AAAA records one after the other.
    single_request: bool,

    /// Add an EDNS OPT record to queries.
    edns: bool,
}

impl DnsConfig {
    /// Creates a new config for the given server with default values.
    pub fn new(server: SocketAddr) -> Self {
        DnsConfig {
            server,
            transport: Transport::default(),
            timeout: DEFAULT_TIMEOUT,
            dialer: Arc::new(DirectDialer),
            tls_config: None,
            server_name: None,
            single_request: false,
            edns: true,
        }
    }

    /// Returns the server address.
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Sets the server address.
    pub fn set_server(&mut self, server: SocketAddr) {
        self.server = server
    }

    /// Returns the transport protocol.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Sets the transport protocol.
    pub fn set_transport(&mut self, transport: Transport) {
        self.transport = transport
    }

    /// Returns the time allowed for a single query.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the time allowed for a single query.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout
    }

    /// Returns the dialer.
    pub fn dialer(&self) -> &Arc<dyn Dialer> {
        &self.dialer
    }

    /// Sets the dialer used to open connections to the server.
    pub fn set_dialer(&mut self, dialer: Arc<dyn Dialer>) {
        self.dialer = dialer
    }

    /// Returns the TLS client configuration if one was set.
    pub fn tls_config(&self) -> Option<&Arc<ClientConfig>> {
        self.tls_config.as_ref()
    }

    /// Sets the TLS client configuration.
    pub fn set_tls_config(
        &mut self,
        tls_config: impl Into<Arc<ClientConfig>>,
    ) {
        self.tls_config = Some(tls_config.into())
    }

    /// Returns the name used to verify the server certificate, if set.
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// Sets the name used to verify the server certificate.
    pub fn set_server_name(&mut self, server_name: impl Into<String>) {
        self.server_name = Some(server_name.into())
    }

    /// Returns whether A and AAAA records are queried one after the other.
    pub fn single_request(&self) -> bool {
        self.single_request
    }

    /// Sets whether A and AAAA records are queried one after the other.
    ///
    /// This helps with broken connection tracking for UDP.
    pub fn set_single_request(&mut self, value: bool) {
        self.single_request = value
    }

    /// Returns whether queries carry an EDNS OPT record.
    pub fn edns(&self) -> bool {
        self.edns
    }

    /// Sets whether queries carry an EDNS OPT record.
    pub fn set_edns(&mut self, value: bool) {
        self.edns = value
    }
}

impl fmt::Debug for DnsConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DnsConfig")
            .field("server", &self.server)
            .field("transport", &self.transport)
            .field("timeout", &self.timeout)
            .field("server_name", &self.server_name)
            .field("single_request", &self.single_request)
            .field("edns", &self.edns)
            .finish_non_exhaustive()
    }
}

/// Returns a TLS client config trusting the Mozilla root certificates.
pub(crate) fn default_tls_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.into(),
    };
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
}

//------------ DnsResolver ---------------------------------------------------

/// A resolver asking a single DNS server.
#[derive(Clone, Debug)]
pub struct DnsResolver {
    config: DnsConfig,
}

impl DnsResolver {
    /// Creates a new resolver from a config.
    ///
    /// Missing values are filled in here: a missing port becomes the
    /// transport’s default port and a TLS transport without a client
    /// config gets one trusting the Mozilla root certificates.
    pub fn new(mut config: DnsConfig) -> Self {
        if config.server.port() == 0 {
            config.server.set_port(config.transport.default_port());
        }
        if config.transport == Transport::Tls && config.tls_config.is_none() {
            config.tls_config = Some(default_tls_config());
        }
        DnsResolver { config }
    }

    /// Returns the effective config.
    pub fn config(&self) -> &DnsConfig {
        &self.config
    }

    async fn lookup(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        if !name::is_domain_name(host) {
            return Err(Error::not_found(host));
        }
        let name = name::fqdn(host);
        let qtypes: &[Rtype] = match network {
            Network::Ip => &[Rtype::A, Rtype::Aaaa],
            Network::Ip4 => &[Rtype::A],
            Network::Ip6 => &[Rtype::Aaaa],
        };

        let results = if self.config.single_request {
            let mut results = Vec::with_capacity(qtypes.len());
            for qtype in qtypes {
                results.push(self.query_addrs(&name, *qtype).await);
            }
            results
        } else {
            let queries =
                qtypes.iter().map(|qtype| self.query_addrs(&name, *qtype));
            join_all(queries).await
        };

        let mut addrs = Vec::new();
        let mut first_err = None;
        for res in results {
            match res {
                Ok(some) => addrs.extend(some),
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err)
                    }
                }
            }
        }

        if addrs.is_empty() {
            return Err(first_err.unwrap_or_else(|| {
                Error::not_found(&name).with_server(self.config.server)
            }));
        }
        if network != Network::Ip4 {
            sort_by_rfc6724(self.config.dialer.as_ref(), &mut addrs).await;
        }
        Ok(addrs)
    }

    /// Queries for one record type and returns the addresses found.
    async fn query_addrs(
        &self,
        name: &str,
        qtype: Rtype,
    ) -> Result<Vec<IpAddr>, Error> {
        let server = self.config.server;
        let answer = transport::query(&self.config, name, qtype).await?;
        let rcode = answer.header().rcode();
        debug!(%server, name, %qtype, %rcode, "received answer");
        match rcode {
            Rcode::NoError => {
                let family = match qtype {
                    Rtype::A => Network::Ip4,
                    _ => Network::Ip6,
                };
                Ok(answer
                    .addresses()
                    .filter(|addr| family.contains(*addr))
                    .collect())
            }
            Rcode::NXDomain => {
                Err(Error::not_found(name).with_server(server))
            }
            rcode => Err(Error::server_misbehaving(name, server, rcode)),
        }
    }
}

impl Resolver for DnsResolver {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(self.lookup(network, host))
    }
}

//============ Testing =======================================================
