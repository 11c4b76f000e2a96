//! Static host table.
//!
//! [`Hosts`] resolves names from a table mapping host names to addresses.
//! The table is usually loaded from a hosts file such as `/etc/hosts` when
//! the resolver is created. In addition, hosts can be added and removed at
//! any time while lookups are in progress.

use crate::addrselect::sort_by_rfc6724;
use crate::base::name;
use crate::error::Error;
use crate::net::{Dialer, DirectDialer};
use crate::resolver::{LookupIp, Network, Resolver};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// The location of the system’s hosts file.
pub const SYSTEM_HOSTS_FILE: &str = "/etc/hosts";

//------------ Hosts ---------------------------------------------------------

/// A resolver using a host table.
pub struct Hosts {
    /// The table, keyed by canonical names.
    table: RwLock<HashMap<String, Vec<IpAddr>>>,

    /// Used to order the addresses of a host.
    dialer: Arc<dyn Dialer>,
}

/// # Creation and Manipulation
///
impl Hosts {
    /// Creates a new, empty host table.
    pub fn new() -> Self {
        Hosts {
            table: RwLock::new(HashMap::new()),
            dialer: Arc::new(DirectDialer),
        }
    }

    /// Creates a host table from the system’s hosts file.
    pub fn system() -> Result<Self, io::Error> {
        Self::from_file(SYSTEM_HOSTS_FILE)
    }

    /// Creates a host table from the hosts file at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Creates a host table from a reader providing hosts file content.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, io::Error> {
        let res = Self::new();
        {
            let mut table = res.table.write();
            for (host, addr) in parse_hosts(io::BufReader::new(reader))? {
                let addrs = table.entry(host).or_default();
                if !addrs.contains(&addr) {
                    addrs.push(addr)
                }
            }
        }
        Ok(res)
    }

    /// Sets the dialer used to order addresses.
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    /// Adds a host, replacing any previous addresses it had.
    pub fn add_host(
        &self,
        host: &str,
        addrs: impl IntoIterator<Item = IpAddr>,
    ) {
        let addrs = addrs.into_iter().collect();
        self.table.write().insert(name::canonical(host), addrs);
    }

    /// Removes a host.
    pub fn remove_host(&self, host: &str) {
        self.table.write().remove(&name::canonical(host));
    }

    async fn lookup(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        // Clone so the lock isn’t held while ordering.
        let addrs = self.table.read().get(&name::canonical(host)).cloned();
        let mut addrs = match addrs {
            Some(addrs) => network.filter(addrs),
            None => Vec::new(),
        };
        if addrs.is_empty() {
            return Err(Error::not_found(host));
        }
        if network != Network::Ip4 {
            sort_by_rfc6724(self.dialer.as_ref(), &mut addrs).await;
        }
        Ok(addrs)
    }
}

impl Default for Hosts {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for Hosts {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(self.lookup(network, host))
    }
}

//------------ Parsing Hosts Files -------------------------------------------

/// Parses hosts file content into a list of names and addresses.
///
/// Each line has an address followed by one or more names. Everything
/// after a `#` is a comment. Names are returned in canonical form. Lines
/// that can’t be parsed are skipped.
pub fn parse_hosts<R: BufRead>(
    reader: R,
) -> Result<Vec<(String, IpAddr)>, io::Error> {
    let mut res = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if let Err(msg) = parse_line(&line, &mut res) {
            warn!(line = idx + 1, "skipping hosts file line: {msg}");
        }
    }
    Ok(res)
}

/// Parses a single line.
fn parse_line(
    line: &str,
    target: &mut Vec<(String, IpAddr)>,
) -> Result<(), &'static str> {
    let line = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let mut words = line.split_whitespace();
    let Some(addr) = words.next() else {
        return Ok(());
    };
    let addr = IpAddr::from_str(addr).map_err(|_| "invalid address")?;

    let names: Vec<_> = words.collect();
    if names.is_empty() {
        return Err("missing host name");
    }
    if !names.iter().all(|host| name::is_domain_name(host)) {
        return Err("invalid host name");
    }
    target.extend(
        names.into_iter().map(|host| (name::canonical(host), addr)),
    );
    Ok(())
}

//============ Testing =======================================================
