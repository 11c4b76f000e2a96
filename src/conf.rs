//! System resolver configuration.
//!
//! [`SystemConf`] collects what the system’s stub resolver is told in
//! `/etc/resolv.conf`: the name servers to ask, the search list, and a set
//! of options. The [`system`][crate::system::system] function uses it to
//! assemble a resolver behaving like the system’s.
//!
//! Parsing is modeled along the lines of glibc’s resolver: unknown
//! keywords and options are ignored and lines that can’t be used are
//! skipped with a warning.

use core::fmt;
use std::fs;
use std::io::{self, BufRead, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::str::SplitWhitespace;
use std::time::Duration;
use tracing::{debug, warn};

/// The location of the system’s resolver configuration.
pub const SYSTEM_RESOLV_CONF: &str = "/etc/resolv.conf";

/// The maximum number of name servers, same as glibc’s `MAXNS`.
pub const MAX_SERVERS: usize = 3;

/// The largest value for the `ndots` option.
const MAX_NDOTS: usize = 15;

const DEFAULT_NDOTS: usize = 1;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_ATTEMPTS: usize = 2;

//------------ SystemConf ----------------------------------------------------

/// The system’s resolver configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SystemConf {
    /// Addresses of the name servers to ask.
    pub servers: Vec<SocketAddr>,

    /// Search list for relative host names.
    ///
    /// All names are absolute.
    pub search: Vec<String>,

    /// Number of dots before an initial absolute query is made.
    pub ndots: usize,

    /// Timeout to wait for a response.
    pub timeout: Duration,

    /// Number of attempts before giving up.
    pub attempts: usize,

    /// Use round-robin selection of name servers.
    pub rotate: bool,

    /// Send the A and AAAA queries one after the other.
    pub single_request: bool,

    /// Always use TCP.
    pub use_tcp: bool,
}

/// # Management
///
impl SystemConf {
    /// Creates a new configuration without any servers.
    ///
    /// Call [`finalize`][Self::finalize] to make it usable.
    pub fn new() -> Self {
        SystemConf {
            servers: Vec::new(),
            search: Vec::new(),
            ndots: DEFAULT_NDOTS,
            timeout: DEFAULT_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
            rotate: false,
            single_request: false,
            use_tcp: false,
        }
    }

    /// Finalizes the configuration for actual use.
    ///
    /// If there are no servers, the loopback addresses on port 53 are
    /// added. If the search list is empty, it is set to the local
    /// machine’s [domain] or, if there is none, to only the root.
    pub fn finalize(&mut self) {
        self.finalize_with_domain(domain)
    }

    fn finalize_with_domain(
        &mut self,
        domain: impl FnOnce() -> Option<String>,
    ) {
        if self.servers.is_empty() {
            self.servers
                .push(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 53));
            self.servers
                .push(SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 53));
        }
        if self.search.is_empty() {
            self.search.push(domain().unwrap_or_else(|| ".".into()))
        }
    }

    /// Creates the configuration for this system.
    ///
    /// If the system’s configuration file doesn’t exist or can’t be read,
    /// the defaults are used.
    pub fn system() -> Self {
        Self::from_file_or_default(SYSTEM_RESOLV_CONF)
    }

    /// Reads the configuration at `path`, falling back to the defaults.
    ///
    /// A file that fails half way is discarded entirely.
    fn from_file_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut res = Self::new();
        match res.parse_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no resolver configuration at {}", path.display());
            }
            Err(err) => {
                warn!(
                    "cannot read {}, using defaults: {}",
                    path.display(),
                    err
                );
                res = Self::new();
            }
        }
        res.finalize();
        res
    }
}

/// # Parsing Configuration File
///
impl SystemConf {
    /// Parses the configuration from a file.
    pub fn parse_file<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<(), io::Error> {
        let mut file = fs::File::open(path)?;
        self.parse(&mut file)
    }

    /// Parses the configuration from a reader.
    ///
    /// The format is that of the `/etc/resolv.conf` file. Like glibc, the
    /// parser takes what it can: words following the argument of a
    /// `nameserver` or `domain` line are ignored and lines it can’t make
    /// sense of are skipped with a warning. Only reading can fail.
    pub fn parse<R: Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<(), io::Error> {
        for (idx, line) in io::BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.trim();

            if line.is_empty()
                || line.starts_with(';')
                || line.starts_with('#')
            {
                continue;
            }

            let mut words = line.split_whitespace();
            let res = match words.next() {
                Some("nameserver") => self.parse_nameserver(words),
                Some("domain") => self.parse_domain(words),
                Some("search") => self.parse_search(words),
                Some("options") => self.parse_options(words),
                _ => Ok(()),
            };
            if let Err(msg) = res {
                warn!(line = idx + 1, "skipping resolv.conf line: {msg}");
            }
        }
        Ok(())
    }

    fn parse_nameserver(
        &mut self,
        mut words: SplitWhitespace,
    ) -> Result<(), &'static str> {
        let word = words.next().ok_or("missing name server address")?;
        if self.servers.len() >= MAX_SERVERS {
            debug!("ignoring name server {}: too many servers", word);
            return Ok(());
        }
        let addr = word
            .parse::<IpAddr>()
            .map_err(|_| "name server is not an IP address")?;
        self.servers.push(SocketAddr::new(addr, 53));
        Ok(())
    }

    fn parse_domain(
        &mut self,
        mut words: SplitWhitespace,
    ) -> Result<(), &'static str> {
        let domain = words.next().ok_or("missing domain name")?;
        self.search = vec![rooted(domain)];
        Ok(())
    }

    fn parse_search(
        &mut self,
        words: SplitWhitespace,
    ) -> Result<(), &'static str> {
        self.search = words
            .map(rooted)
            .filter(|name| name != ".")
            .collect();
        Ok(())
    }

    fn parse_options(
        &mut self,
        words: SplitWhitespace,
    ) -> Result<(), &'static str> {
        for word in words {
            match split_arg(word) {
                ("ndots", Some(n)) => self.ndots = n.min(MAX_NDOTS),
                ("timeout", Some(n)) => {
                    self.timeout = Duration::from_secs(n.max(1) as u64)
                }
                ("attempts", Some(n)) => self.attempts = n.max(1),
                ("rotate", None) => self.rotate = true,
                ("single-request", None)
                | ("single-request-reopen", None) => {
                    self.single_request = true
                }
                ("use-vc", None) | ("usevc", None) | ("tcp", None) => {
                    self.use_tcp = true
                }
                // Ignore unknown or misformated options.
                _ => {}
            }
        }
        Ok(())
    }
}

//--- Default

impl Default for SystemConf {
    fn default() -> Self {
        Self::new()
    }
}

//--- Display

impl fmt::Display for SystemConf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for server in &self.servers {
            writeln!(f, "nameserver {}", server.ip())?;
        }
        match self.search.as_slice() {
            [] => {}
            [domain] => writeln!(f, "domain {}", domain)?,
            search => writeln!(f, "search {}", search.join(" "))?,
        }

        // Only print options that aren’t the default.
        let mut options = Vec::new();
        if self.ndots != DEFAULT_NDOTS {
            options.push(format!("ndots:{}", self.ndots));
        }
        if self.timeout != DEFAULT_TIMEOUT {
            // This ignores fractional seconds.
            options.push(format!("timeout:{}", self.timeout.as_secs()));
        }
        if self.attempts != DEFAULT_ATTEMPTS {
            options.push(format!("attempts:{}", self.attempts));
        }
        if self.rotate {
            options.push("rotate".into())
        }
        if self.single_request {
            options.push("single-request".into())
        }
        if self.use_tcp {
            options.push("use-vc".into())
        }
        if !options.is_empty() {
            writeln!(f, "options {}", options.join(" "))?;
        }
        Ok(())
    }
}

//------------ Host Name and Domain ------------------------------------------

/// Returns the host name of the local machine.
#[cfg(unix)]
pub fn hostname() -> Result<String, io::Error> {
    let mut buf = [0u8; 256];
    let res = unsafe {
        libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len())
    };
    if res != 0 {
        return Err(io::Error::last_os_error());
    }
    // The name may not be terminated if it was truncated.
    let len = buf.iter().position(|&ch| ch == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..len].to_vec())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Returns the host name of the local machine.
#[cfg(not(unix))]
pub fn hostname() -> Result<String, io::Error> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "host name not available on this platform",
    ))
}

/// Returns the domain of the local machine.
///
/// This is the absolute name following the first label of the
/// [hostname]. There is no domain if the host name can’t be determined or
/// has only a single label.
pub fn domain() -> Option<String> {
    match hostname() {
        Ok(hostname) => domain_of(&hostname),
        Err(err) => {
            debug!("cannot determine host name: {}", err);
            None
        }
    }
}

/// Returns the domain part of a host name.
fn domain_of(hostname: &str) -> Option<String> {
    let (_, domain) = hostname.split_once('.')?;
    if domain.is_empty() || domain == "." {
        return None;
    }
    Some(rooted(domain))
}

//------------ Private Helpers -----------------------------------------------

/// Splits the name and argument from an option with arguments.
///
/// Arguments that aren’t a number are treated as zero, as glibc does.
fn split_arg(s: &str) -> (&str, Option<usize>) {
    match s.split_once(':') {
        Some((left, right)) => (left, Some(right.parse().unwrap_or(0))),
        None => (s, None),
    }
}

/// Returns the name with a trailing dot.
fn rooted(name: &str) -> String {
    if name.ends_with('.') {
        name.into()
    } else {
        format!("{}.", name)
    }
}

//============ Testing =======================================================
