//! Exchanging a single query with a server.
//!
//! Every query uses a connection of its own: a datagram socket for UDP, a
//! TCP connection for TCP, and a TCP connection with a TLS session on top
//! for TLS. The connection is dropped once the response has arrived.

use super::DnsConfig;
use crate::base::header::Header;
use crate::base::iana::{Rcode, Rtype};
use crate::base::message::{Message, Query};
use crate::error::Error;
use crate::net::{AsyncDgram, AsyncStream};
use bytes::Bytes;
use core::fmt;
use core::str::FromStr;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use tracing::{debug, trace};

/// The size of the receive buffer for UDP responses.
///
/// This is the largest possible datagram so that even servers ignoring the
/// advertised payload size are understood.
const RECV_SIZE: usize = 65535;

//------------ Transport -----------------------------------------------------

/// The transport protocol used to talk to a DNS server.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Transport {
    /// DNS over UDP as defined in RFC 1035.
    ///
    /// Truncated responses are repeated over TCP.
    #[default]
    Udp,

    /// DNS over TCP as defined in RFC 1035.
    Tcp,

    /// DNS over TLS as defined in RFC 7858.
    Tls,
}

impl Transport {
    /// Returns the port used if a server address doesn’t have one.
    pub fn default_port(self) -> u16 {
        match self {
            Transport::Udp | Transport::Tcp => 53,
            Transport::Tls => 853,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::Tls => "tcp-tls",
        }
    }
}

impl FromStr for Transport {
    type Err = UnsupportedProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            "tcp-tls" | "tls" => Ok(Transport::Tls),
            _ => Err(UnsupportedProtocol),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------ UnsupportedProtocol -------------------------------------------

/// A transport name was not one of `udp`, `tcp`, or `tcp-tls`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnsupportedProtocol;

impl fmt::Display for UnsupportedProtocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unsupported protocol")
    }
}

impl std::error::Error for UnsupportedProtocol {}

//------------ query ---------------------------------------------------------

/// Asks the configured server for records of `qtype` for `name`.
///
/// Returns the response whatever its rcode. The configured timeout covers
/// connecting as well as all exchanges.
pub(super) async fn query(
    config: &DnsConfig,
    name: &str,
    qtype: Rtype,
) -> Result<Message, Error> {
    let server = config.server();
    let res = tokio::time::timeout(
        config.timeout(),
        query_no_timeout(config, name, qtype),
    )
    .await;
    match res {
        Ok(res) => res,
        Err(_) => {
            debug!(%server, name, %qtype, "query timed out");
            Err(Error::timeout(name, Some(server)))
        }
    }
}

async fn query_no_timeout(
    config: &DnsConfig,
    name: &str,
    qtype: Rtype,
) -> Result<Message, Error> {
    let query = Query::new(name, qtype, config.edns())
        .map_err(|_| Error::not_found(name))?;
    let answer = exchange(config, name, &query).await?;

    // Servers that don't understand EDNS may answer with FORMERR. Ask once
    // more without it.
    if answer.header().rcode() == Rcode::FormErr && query.has_edns() {
        debug!(
            server = %config.server(), name,
            "FORMERR, retrying without EDNS"
        );
        return exchange(config, name, &query.without_edns()).await;
    }
    Ok(answer)
}

async fn exchange(
    config: &DnsConfig,
    name: &str,
    query: &Query,
) -> Result<Message, Error> {
    let server = config.server();
    trace!(
        %server, name, qtype = %query.qtype(), id = query.id(),
        "sending query"
    );
    match config.transport() {
        Transport::Udp => match udp_exchange(config, name, query).await? {
            DgramReply::Answer(answer) => Ok(answer),
            DgramReply::Truncated => {
                debug!(%server, name, "truncated response, using TCP");
                tcp_exchange(config, name, query).await
            }
        },
        Transport::Tcp => tcp_exchange(config, name, query).await,
        Transport::Tls => tls_exchange(config, name, query).await,
    }
}

//------------ UDP -----------------------------------------------------------

/// The outcome of a UDP exchange.
#[derive(Debug)]
enum DgramReply {
    /// A complete answer to the query.
    Answer(Message),

    /// The server set the TC bit. The rest of the reply is ignored.
    Truncated,
}

async fn udp_exchange(
    config: &DnsConfig,
    name: &str,
    query: &Query,
) -> Result<DgramReply, Error> {
    let server = config.server();
    let sock = config
        .dialer()
        .dial_dgram(server)
        .await
        .map_err(|err| Error::connect(name, server, err))?;
    dgram_exchange(sock.as_ref(), query)
        .await
        .map_err(|err| Error::exchange(name, server, err))
}

/// Sends the query and waits for the answer.
///
/// Datagrams that aren’t a response to the query are silently dropped.
/// Waiting ends only through an answer, an error, or the caller’s
/// timeout.
///
/// A truncated response is recognised by its header alone since its body
/// may well be cut off in the middle of a record.
async fn dgram_exchange(
    sock: &dyn AsyncDgram,
    query: &Query,
) -> Result<DgramReply, io::Error> {
    let sent = sock.send(query.as_slice()).await?;
    if sent != query.as_slice().len() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "short UDP send",
        ));
    }

    let mut buf = vec![0; RECV_SIZE];
    loop {
        let len = sock.recv(&mut buf).await?;
        let Some(header) = Header::from_message_slice(&buf[..len]) else {
            trace!("dropping short datagram");
            continue;
        };
        if header.tc() && header.qr() && header.id() == query.id() {
            return Ok(DgramReply::Truncated);
        }
        let octets = Bytes::copy_from_slice(&buf[..len]);
        let answer = match Message::from_octets(octets) {
            Ok(answer) => answer,
            Err(err) => {
                trace!("dropping malformed datagram: {err}");
                continue;
            }
        };
        if !query.is_answer(&answer) {
            trace!(id = answer.header().id(), "dropping unrelated datagram");
            continue;
        }
        return Ok(DgramReply::Answer(answer));
    }
}

//------------ TCP and TLS ---------------------------------------------------

async fn dial_stream(
    config: &DnsConfig,
    name: &str,
) -> Result<Box<dyn AsyncStream>, Error> {
    let server = config.server();
    config
        .dialer()
        .dial_stream(server)
        .await
        .map_err(|err| Error::connect(name, server, err))
}

async fn tcp_exchange(
    config: &DnsConfig,
    name: &str,
    query: &Query,
) -> Result<Message, Error> {
    let mut sock = dial_stream(config, name).await?;
    stream_exchange(&mut sock, query)
        .await
        .map_err(|err| Error::exchange(name, config.server(), err))
}

async fn tls_exchange(
    config: &DnsConfig,
    name: &str,
    query: &Query,
) -> Result<Message, Error> {
    let server = config.server();
    let server_name = server_name(config, name)?;
    let tcp = dial_stream(config, name).await?;
    let tls_config = config
        .tls_config()
        .cloned()
        .unwrap_or_else(super::default_tls_config);
    let connector = TlsConnector::from(tls_config);
    let mut tls = connector
        .connect(server_name, tcp)
        .await
        .map_err(|err| Error::tls_handshake(name, server, err))?;
    stream_exchange(&mut tls, query)
        .await
        .map_err(|err| Error::exchange(name, server, err))
}

/// Returns the name used to verify the server’s certificate.
///
/// Unless configured otherwise, this is the server’s IP address.
fn server_name(
    config: &DnsConfig,
    name: &str,
) -> Result<ServerName<'static>, Error> {
    match config.server_name() {
        Some(server_name) => ServerName::try_from(server_name.to_owned())
            .map_err(|err| {
                Error::tls_handshake(
                    name,
                    config.server(),
                    io::Error::new(io::ErrorKind::InvalidInput, err),
                )
            }),
        None => Ok(ServerName::from(config.server().ip())),
    }
}

/// Sends the query over a stream and reads the answer.
///
/// Messages on a stream are preceded by their length as a 16 bit
/// integer in network byte order.
async fn stream_exchange<S>(
    sock: &mut S,
    query: &Query,
) -> Result<Message, io::Error>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    sock.write_all(&query.as_stream_slice()).await?;
    sock.flush().await?;

    let len = sock.read_u16().await?;
    let mut buf = vec![0; usize::from(len)];
    sock.read_exact(&mut buf).await?;

    let answer = Message::from_octets(Bytes::from(buf))
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    if !query.is_answer(&answer) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "reply does not match query",
        ));
    }
    Ok(answer)
}

//============ Testing =======================================================
