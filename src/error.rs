//! The error type of all resolvers.
//!
//! Every lookup fails with the same [`Error`] type. It carries the name
//! that was looked up, the server that was asked if there was one, and an
//! [`ErrorKind`] describing what went wrong. On top of that, each error is
//! classified through two flags: [`is_temporary`][Error::is_temporary]
//! tells whether repeating the lookup may succeed, and
//! [`is_timeout`][Error::is_timeout] whether a deadline expired.
//!
//! Resolvers that try several alternatives combine the errors of all
//! alternatives into a single joined error via [`Error::join`].

use crate::base::iana::Rcode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::{error, fmt, io};

//------------ ErrorKind -----------------------------------------------------

/// What went wrong during a lookup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The name does not exist or has no addresses of the requested family.
    ///
    /// This is also used for host strings that aren't valid domain names.
    NotFound,

    /// An unknown network name was given.
    UnsupportedNetwork,

    /// An unknown transport protocol was given.
    UnsupportedProtocol,

    /// The server answered with an unexpected response code.
    ServerMisbehaving(Rcode),

    /// Connecting to the server failed.
    Connect,

    /// The TLS handshake with the server failed.
    TlsHandshake,

    /// Sending the query or receiving the response failed.
    Exchange,

    /// The lookup didn't finish in time.
    Timeout,

    /// Several alternatives were tried and all of them failed.
    ///
    /// The individual errors are available via [`Error::errors`].
    Joined,
}

//------------ Error ---------------------------------------------------------

/// A lookup failed.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,

    /// The name that was looked up.
    name: String,

    /// The server that was asked, if any.
    server: Option<SocketAddr>,

    is_timeout: bool,
    is_temporary: bool,

    /// The underlying I/O error for transport errors.
    source: Option<Arc<io::Error>>,

    /// The constituents of a joined error.
    errors: Vec<Error>,
}

/// # Creation
///
impl Error {
    fn new(kind: ErrorKind, name: &str) -> Self {
        Error {
            kind,
            name: name.into(),
            server: None,
            is_timeout: false,
            is_temporary: false,
            source: None,
            errors: Vec::new(),
        }
    }

    /// Creates a “no such host” error.
    pub fn not_found(name: &str) -> Self {
        Self::new(ErrorKind::NotFound, name)
    }

    /// Creates an error for an unknown network name.
    pub fn unsupported_network(name: &str) -> Self {
        Self::new(ErrorKind::UnsupportedNetwork, name)
    }

    /// Creates an error for an unknown transport protocol.
    pub fn unsupported_protocol(name: &str) -> Self {
        Self::new(ErrorKind::UnsupportedProtocol, name)
    }

    /// Creates an error for a response with an unexpected rcode.
    ///
    /// Only a server failure is considered temporary.
    pub fn server_misbehaving(
        name: &str,
        server: SocketAddr,
        rcode: Rcode,
    ) -> Self {
        let mut res = Self::new(ErrorKind::ServerMisbehaving(rcode), name);
        res.server = Some(server);
        res.is_temporary = rcode == Rcode::ServFail;
        res
    }

    /// Creates an error for a failed connection attempt.
    pub fn connect(name: &str, server: SocketAddr, err: io::Error) -> Self {
        Self::transport(ErrorKind::Connect, name, server, err, true)
    }

    /// Creates an error for a failed TLS handshake.
    ///
    /// These are not temporary: a handshake failure usually means the
    /// server is not configured the way the client expects.
    pub fn tls_handshake(
        name: &str,
        server: SocketAddr,
        err: io::Error,
    ) -> Self {
        Self::transport(ErrorKind::TlsHandshake, name, server, err, false)
    }

    /// Creates an error for a failed exchange of messages.
    pub fn exchange(name: &str, server: SocketAddr, err: io::Error) -> Self {
        Self::transport(ErrorKind::Exchange, name, server, err, true)
    }

    fn transport(
        kind: ErrorKind,
        name: &str,
        server: SocketAddr,
        err: io::Error,
        is_temporary: bool,
    ) -> Self {
        let mut res = Self::new(kind, name);
        res.server = Some(server);
        res.is_timeout = err.kind() == io::ErrorKind::TimedOut;
        res.is_temporary = is_temporary;
        res.source = Some(Arc::new(err));
        res
    }

    /// Creates a timeout error.
    ///
    /// Timeouts are temporary. Use
    /// [`with_temporary`][Self::with_temporary] for a timeout that should
    /// not be retried.
    pub fn timeout(name: &str, server: Option<SocketAddr>) -> Self {
        let mut res = Self::new(ErrorKind::Timeout, name);
        res.server = server;
        res.is_timeout = true;
        res.is_temporary = true;
        res
    }

    /// Combines the errors of several alternatives into one.
    ///
    /// Nested joined errors are flattened. Joining no errors at all
    /// results in a “no such host” error for `name` while joining a single
    /// error returns that error unchanged.
    pub fn join(name: &str, errors: impl IntoIterator<Item = Error>) -> Self {
        let mut flat = Vec::new();
        for err in errors {
            if err.kind == ErrorKind::Joined {
                flat.extend(err.errors)
            } else {
                flat.push(err)
            }
        }
        match flat.len() {
            0 => Self::not_found(name),
            1 => flat.pop().unwrap_or_else(|| Self::not_found(name)),
            _ => {
                let mut res = Self::new(ErrorKind::Joined, name);
                res.is_timeout = flat.iter().any(Error::is_timeout);
                res.is_temporary = flat.iter().any(Error::is_temporary);
                res.errors = flat;
                res
            }
        }
    }

    /// Returns the error with the server set.
    pub fn with_server(mut self, server: SocketAddr) -> Self {
        self.server = Some(server);
        self
    }

    /// Returns the error with the temporary flag changed.
    pub fn with_temporary(mut self, is_temporary: bool) -> Self {
        self.is_temporary = is_temporary;
        self
    }
}

/// # Access
///
impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the name that was looked up.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the server that was asked, if there was one.
    pub fn server(&self) -> Option<SocketAddr> {
        self.server
    }

    /// Returns whether the error was caused by an expired deadline.
    pub fn is_timeout(&self) -> bool {
        self.is_timeout
    }

    /// Returns whether repeating the lookup may succeed.
    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }

    /// Returns whether the name doesn’t exist.
    ///
    /// A joined error is “not found” only if all its constituents are.
    pub fn is_not_found(&self) -> bool {
        match self.kind {
            ErrorKind::NotFound => true,
            ErrorKind::Joined => self.errors.iter().all(Error::is_not_found),
            _ => false,
        }
    }

    /// Returns the constituents of a joined error.
    ///
    /// This is empty for all other errors.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }
}

//--- Display and Error

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.kind == ErrorKind::Joined {
            for (i, err) in self.errors.iter().enumerate() {
                if i > 0 {
                    f.write_str("\n")?;
                }
                err.fmt(f)?;
            }
            return Ok(());
        }

        write!(f, "lookup {}", self.name)?;
        if let Some(server) = self.server {
            write!(f, " on {}", server)?;
        }
        f.write_str(": ")?;
        match self.kind {
            ErrorKind::NotFound => f.write_str("no such host"),
            ErrorKind::UnsupportedNetwork => {
                f.write_str("unsupported network")
            }
            ErrorKind::UnsupportedProtocol => {
                f.write_str("unsupported protocol")
            }
            ErrorKind::ServerMisbehaving(rcode) => write!(
                f,
                "unexpected return code {}: server misbehaving",
                rcode
            ),
            ErrorKind::Connect => write!(f, "dial failed: {}", Source(self)),
            ErrorKind::TlsHandshake => {
                write!(f, "TLS handshake failed: {}", Source(self))
            }
            ErrorKind::Exchange => {
                write!(f, "exchange failed: {}", Source(self))
            }
            ErrorKind::Timeout => f.write_str("i/o timeout"),
            ErrorKind::Joined => Ok(()),
        }
    }
}

/// Displays the source of an error if there is one.
struct Source<'a>(&'a Error);

impl fmt::Display for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.source.as_ref() {
            Some(err) => err.fmt(f),
            None => f.write_str("unknown error"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.source.as_ref() {
            Some(err) => Some(err.as_ref()),
            None => self.errors.first().map(|err| err as _),
        }
    }
}

//============ Testing =======================================================
