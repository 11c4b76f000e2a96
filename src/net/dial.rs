//! Dialers and the connections they produce.

#![warn(missing_docs)]

use futures_util::future::BoxFuture;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UdpSocket};
use tracing::trace;

/// How many times do we try a new random port if we get ‘address in use.’
const RETRY_RANDOM_PORT: usize = 10;

/// The port used when probing for a source address.
///
/// This is the discard port. No datagram is ever sent to it.
const PROBE_PORT: u16 = 9;

//------------ AsyncStream ---------------------------------------------------

/// A connected byte stream.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

//------------ AsyncDgram ----------------------------------------------------

/// A datagram socket connected to a single peer.
pub trait AsyncDgram: Send + Sync {
    /// Sends a datagram to the peer.
    fn send<'a>(&'a self, buf: &'a [u8]) -> BoxFuture<'a, io::Result<usize>>;

    /// Receives a datagram from the peer into `buf`.
    fn recv<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, io::Result<usize>>;

    /// Returns the local address of the socket.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl AsyncDgram for UdpSocket {
    fn send<'a>(&'a self, buf: &'a [u8]) -> BoxFuture<'a, io::Result<usize>> {
        Box::pin(UdpSocket::send(self, buf))
    }

    fn recv<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, io::Result<usize>> {
        Box::pin(UdpSocket::recv(self, buf))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

//------------ Dialer --------------------------------------------------------

/// Opens connections to remote addresses.
pub trait Dialer: Send + Sync {
    /// Opens a stream connection to `addr`.
    fn dial_stream(
        &self,
        addr: SocketAddr,
    ) -> BoxFuture<'_, io::Result<Box<dyn AsyncStream>>>;

    /// Opens a datagram socket connected to `addr`.
    fn dial_dgram(
        &self,
        addr: SocketAddr,
    ) -> BoxFuture<'_, io::Result<Box<dyn AsyncDgram>>>;

    /// Determines the source address used to reach `dest`.
    ///
    /// Returns `None` if `dest` is unreachable. The default implementation
    /// connects a datagram socket and reads its local address. Connecting
    /// a datagram socket only consults the routing table, nothing is sent.
    fn probe_source(&self, dest: IpAddr) -> BoxFuture<'_, Option<IpAddr>> {
        Box::pin(async move {
            match self.dial_dgram(SocketAddr::new(dest, PROBE_PORT)).await {
                Ok(sock) => sock.local_addr().ok().map(|addr| addr.ip()),
                Err(err) => {
                    trace!("no source address for {dest}: {err}");
                    None
                }
            }
        })
    }
}

impl<D: Dialer + ?Sized> Dialer for Arc<D> {
    fn dial_stream(
        &self,
        addr: SocketAddr,
    ) -> BoxFuture<'_, io::Result<Box<dyn AsyncStream>>> {
        self.as_ref().dial_stream(addr)
    }

    fn dial_dgram(
        &self,
        addr: SocketAddr,
    ) -> BoxFuture<'_, io::Result<Box<dyn AsyncDgram>>> {
        self.as_ref().dial_dgram(addr)
    }

    fn probe_source(&self, dest: IpAddr) -> BoxFuture<'_, Option<IpAddr>> {
        self.as_ref().probe_source(dest)
    }
}

//------------ DirectDialer --------------------------------------------------

/// A dialer using the sockets of the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectDialer;

impl DirectDialer {
    /// Binds a UDP socket to a random local port.
    ///
    /// Binding to port 0 lets the operating system pick a random port. If
    /// that happens to fail, it is tried a few more times.
    async fn udp_bind(v4: bool) -> io::Result<UdpSocket> {
        let mut i = 0;
        loop {
            let local: SocketAddr = if v4 {
                (Ipv4Addr::UNSPECIFIED, 0).into()
            } else {
                (Ipv6Addr::UNSPECIFIED, 0).into()
            };
            match UdpSocket::bind(&local).await {
                Ok(sock) => return Ok(sock),
                Err(err) => {
                    if i == RETRY_RANDOM_PORT {
                        return Err(err);
                    } else {
                        i += 1
                    }
                }
            }
        }
    }
}

impl Dialer for DirectDialer {
    fn dial_stream(
        &self,
        addr: SocketAddr,
    ) -> BoxFuture<'_, io::Result<Box<dyn AsyncStream>>> {
        Box::pin(async move {
            let sock = TcpStream::connect(addr).await?;
            sock.set_nodelay(true)?;
            Ok(Box::new(sock) as Box<dyn AsyncStream>)
        })
    }

    fn dial_dgram(
        &self,
        addr: SocketAddr,
    ) -> BoxFuture<'_, io::Result<Box<dyn AsyncDgram>>> {
        Box::pin(async move {
            let sock = Self::udp_bind(addr.is_ipv4()).await?;
            sock.connect(addr).await?;
            Ok(Box::new(sock) as Box<dyn AsyncDgram>)
        })
    }
}

//============ Testing =======================================================
