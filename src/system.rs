//! A resolver behaving like the system’s.

use crate::conf::SystemConf;
use crate::dns::{DnsConfig, DnsResolver, Transport};
use crate::hosts::{Hosts, SYSTEM_HOSTS_FILE};
use crate::literal::Literal;
use crate::net::{Dialer, DirectDialer};
use crate::relative::{Relative, RelativeConfig};
use crate::resolver::Resolver;
use crate::retry::{Retry, RetryConfig};
use crate::round_robin::RoundRobin;
use crate::sequential::Sequential;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

//------------ HostsSource ---------------------------------------------------

/// Where the host table of a system resolver comes from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum HostsSource {
    /// The system’s hosts file.
    ///
    /// If the file doesn’t exist, the table is empty.
    #[default]
    System,

    /// A hosts file at the given location that must exist.
    File(PathBuf),

    /// An empty table.
    None,
}

//------------ SystemResolverConfig ------------------------------------------

/// Configuration for [`system`].
#[derive(Clone, Default)]
pub struct SystemResolverConfig {
    /// The resolver configuration, read from the system if missing.
    conf: Option<SystemConf>,

    /// Where to get the host table from.
    hosts: HostsSource,

    /// The dialer to use for all connections.
    dialer: Option<Arc<dyn Dialer>>,
}

impl SystemResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resolver configuration if one was set.
    pub fn conf(&self) -> Option<&SystemConf> {
        self.conf.as_ref()
    }

    /// Sets the resolver configuration to use instead of the system’s.
    pub fn set_conf(&mut self, conf: SystemConf) {
        self.conf = Some(conf)
    }

    pub fn hosts(&self) -> &HostsSource {
        &self.hosts
    }

    pub fn set_hosts(&mut self, hosts: HostsSource) {
        self.hosts = hosts
    }

    /// Sets the dialer used for talking to servers and ordering addresses.
    pub fn set_dialer(&mut self, dialer: Arc<dyn Dialer>) {
        self.dialer = Some(dialer)
    }
}

//------------ system --------------------------------------------------------

/// Creates a resolver emulating the system’s resolver.
///
/// The resulting resolver first checks for address literals and
/// `localhost`, then the host table, and finally asks the configured name
/// servers. Relative names are expanded via the search list and lookups
/// that failed temporarily are repeated. With the `rotate` option, each
/// lookup starts with a random server; otherwise servers are asked in the
/// configured order.
///
/// The function fails if an explicitly configured hosts file can’t be
/// read.
pub fn system(config: SystemResolverConfig) -> Result<Sequential, io::Error> {
    let mut conf = match config.conf {
        Some(conf) => conf,
        None => SystemConf::system(),
    };
    conf.finalize();
    let dialer = config
        .dialer
        .unwrap_or_else(|| Arc::new(DirectDialer) as Arc<dyn Dialer>);

    let hosts = match config.hosts {
        HostsSource::System => match Hosts::system() {
            Ok(hosts) => hosts,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no hosts file at {}", SYSTEM_HOSTS_FILE);
                Hosts::new()
            }
            Err(err) => return Err(err),
        },
        HostsSource::File(path) => Hosts::from_file(path)?,
        HostsSource::None => Hosts::new(),
    };
    let hosts = hosts.with_dialer(dialer.clone());

    let servers = conf.servers.iter().map(|server| {
        let mut dns = DnsConfig::new(*server);
        if conf.use_tcp {
            dns.set_transport(Transport::Tcp);
        }
        dns.set_timeout(conf.timeout);
        dns.set_single_request(conf.single_request);
        dns.set_dialer(dialer.clone());
        Box::new(DnsResolver::new(dns)) as Box<dyn Resolver>
    });
    let servers: Box<dyn Resolver> = if conf.rotate {
        Box::new(servers.collect::<RoundRobin>())
    } else {
        Box::new(servers.collect::<Sequential>())
    };

    let mut relative = RelativeConfig::default();
    relative.set_search(conf.search.iter().cloned());
    relative.set_ndots(conf.ndots);

    let mut retry = RetryConfig::default();
    retry.set_attempts(conf.attempts);

    Ok(Sequential::default()
        .with(Literal::new())
        .with(hosts)
        .with(Retry::with_config(
            Relative::with_config(servers, relative),
            retry,
        )))
}
