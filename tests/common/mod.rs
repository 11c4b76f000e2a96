//! Helpers shared by the integration tests.
#![allow(dead_code)]

use bytes::{BufMut, BytesMut};
use domain_resolvers::base::{Header, HeaderCounts, Rcode};
use domain_resolvers::error::Error;
use domain_resolvers::net::{AsyncDgram, AsyncStream, Dialer, DirectDialer};
use domain_resolvers::resolver::{LookupIp, Network, Resolver};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio_rustls::rustls::pki_types::CertificateDer;
use tokio_rustls::rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;
use tracing_subscriber::EnvFilter;

//------------ Logging -------------------------------------------------------

/// Setup logging of events reported by the resolvers and the test suite.
///
/// Use the RUST_LOG environment variable to override the defaults, e.g.,
/// `RUST_LOG=domain_resolvers=trace`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_ids(true)
        .without_time()
        .try_init()
        .ok();
}

pub fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn addrs(s: &[&str]) -> Vec<IpAddr> {
    s.iter().map(|s| addr(s)).collect()
}

//------------ MockResolver --------------------------------------------------

/// A resolver with canned answers that counts how often it was asked.
///
/// Hosts without an answer of their own get the fallback answer, which is
/// a “not found” error unless changed.
#[derive(Default)]
pub struct MockResolver {
    answers: HashMap<String, Result<Vec<IpAddr>, Error>>,
    fallback: Option<Result<Vec<IpAddr>, Error>>,
    delay: Duration,
    calls: AtomicUsize,
    log: Mutex<Vec<(Network, String)>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers lookups for `host` with the given addresses.
    pub fn answer(mut self, host: &str, answer: &[&str]) -> Self {
        self.answers.insert(host.into(), Ok(addrs(answer)));
        self
    }

    /// Fails lookups for `host` with the given error.
    pub fn fail(mut self, host: &str, err: Error) -> Self {
        self.answers.insert(host.into(), Err(err));
        self
    }

    /// Answers lookups for all other hosts with the given addresses.
    pub fn otherwise(mut self, answer: &[&str]) -> Self {
        self.fallback = Some(Ok(addrs(answer)));
        self
    }

    /// Fails lookups for all other hosts with the given error.
    pub fn otherwise_fail(mut self, err: Error) -> Self {
        self.fallback = Some(Err(err));
        self
    }

    /// Delays every answer.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the lookups made so far.
    pub fn log(&self) -> Vec<(Network, String)> {
        self.log.lock().clone()
    }

    fn result(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        let res = match self.answers.get(host).or(self.fallback.as_ref()) {
            Some(res) => res.clone(),
            None => Err(Error::not_found(host)),
        };
        let addrs = network.filter(res?);
        if addrs.is_empty() {
            return Err(Error::not_found(host));
        }
        Ok(addrs)
    }
}

impl Resolver for MockResolver {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push((network, host.into()));
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result(network, host)
        })
    }
}

//------------ DualStack -----------------------------------------------------

/// A dialer pretending the host has global IPv4 and IPv6 addresses.
///
/// Connections are made through the operating system. Only the source
/// addresses used to order destinations are made up: `2001:db8::1` for
/// IPv6 and `10.0.0.2` for IPv4 destinations.
#[derive(Clone, Copy, Debug, Default)]
pub struct DualStack;

impl DualStack {
    pub const SOURCE_V4: &'static str = "10.0.0.2";
    pub const SOURCE_V6: &'static str = "2001:db8::1";

    pub fn new() -> Arc<dyn Dialer> {
        Arc::new(DualStack)
    }
}

impl Dialer for DualStack {
    fn dial_stream(
        &self,
        addr: SocketAddr,
    ) -> BoxFuture<'_, io::Result<Box<dyn AsyncStream>>> {
        DirectDialer.dial_stream(addr)
    }

    fn dial_dgram(
        &self,
        addr: SocketAddr,
    ) -> BoxFuture<'_, io::Result<Box<dyn AsyncDgram>>> {
        DirectDialer.dial_dgram(addr)
    }

    fn probe_source(&self, dest: IpAddr) -> BoxFuture<'_, Option<IpAddr>> {
        let src = if dest.is_ipv4() {
            Self::SOURCE_V4
        } else {
            Self::SOURCE_V6
        };
        Box::pin(async move { Some(addr(src)) })
    }
}

//------------ Fake DNS Server -----------------------------------------------

/// The transport a query arrived over.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Proto {
    Udp,
    Tcp,
}

/// Produces the response to a query or `None` to not respond at all.
pub type Handler =
    Arc<dyn Fn(&[u8], Proto) -> Option<Vec<u8>> + Send + Sync + 'static>;

/// A DNS server on loopback listening on both UDP and TCP.
pub struct FakeServer {
    addr: SocketAddr,
    udp_queries: Arc<AtomicUsize>,
    tcp_queries: Arc<AtomicUsize>,
}

impl FakeServer {
    /// Starts a server answering queries via `handler`.
    ///
    /// The server runs until the runtime shuts down.
    pub async fn start(handler: Handler) -> Self {
        let (tcp, udp) = bind_pair().await;
        let addr = udp.local_addr().unwrap();
        let udp_queries = Arc::new(AtomicUsize::new(0));
        let tcp_queries = Arc::new(AtomicUsize::new(0));

        tokio::spawn(serve_udp(udp, handler.clone(), udp_queries.clone()));
        tokio::spawn(serve_tcp(tcp, handler, tcp_queries.clone()));

        FakeServer {
            addr,
            udp_queries,
            tcp_queries,
        }
    }

    /// Starts a server answering from the given zone.
    pub async fn zone(records: &[(&str, &str)]) -> Self {
        Self::start(zone(records)).await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn udp_queries(&self) -> usize {
        self.udp_queries.load(Ordering::SeqCst)
    }

    pub fn tcp_queries(&self) -> usize {
        self.tcp_queries.load(Ordering::SeqCst)
    }
}

/// Binds a TCP listener and a UDP socket to the same loopback port.
async fn bind_pair() -> (TcpListener, UdpSocket) {
    for _ in 0..10 {
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = tcp.local_addr().unwrap();
        if let Ok(udp) = UdpSocket::bind(addr).await {
            return (tcp, udp);
        }
    }
    panic!("cannot bind fake server sockets");
}

async fn serve_udp(
    sock: UdpSocket,
    handler: Handler,
    count: Arc<AtomicUsize>,
) {
    let mut buf = vec![0; 65535];
    loop {
        let Ok((len, peer)) = sock.recv_from(&mut buf).await else {
            return;
        };
        count.fetch_add(1, Ordering::SeqCst);
        if let Some(resp) = handler(&buf[..len], Proto::Udp) {
            let _ = sock.send_to(&resp, peer).await;
        }
    }
}

async fn serve_tcp(
    listener: TcpListener,
    handler: Handler,
    count: Arc<AtomicUsize>,
) {
    loop {
        let Ok((sock, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(serve_stream(sock, handler.clone(), count.clone()));
    }
}

/// Answers length-prefixed queries on a stream until it is closed.
async fn serve_stream<S: AsyncRead + AsyncWrite + Unpin>(
    mut sock: S,
    handler: Handler,
    count: Arc<AtomicUsize>,
) {
    loop {
        let Ok(len) = sock.read_u16().await else {
            return;
        };
        let mut buf = vec![0; usize::from(len)];
        if sock.read_exact(&mut buf).await.is_err() {
            return;
        }
        count.fetch_add(1, Ordering::SeqCst);
        let Some(resp) = handler(&buf, Proto::Tcp) else {
            return;
        };
        let mut out = Vec::with_capacity(resp.len() + 2);
        out.extend_from_slice(&(resp.len() as u16).to_be_bytes());
        out.extend_from_slice(&resp);
        if sock.write_all(&out).await.is_err() || sock.flush().await.is_err()
        {
            return;
        }
    }
}

//------------ Fake DNS-over-TLS Server --------------------------------------

/// A DNS-over-TLS server on 127.0.0.1.
///
/// The server presents the certificate in `test-data/server.crt` which is
/// valid for the IP address 127.0.0.1 only and issued by the authority in
/// `test-data/ca.crt`.
pub struct TlsServer {
    addr: SocketAddr,
    queries: Arc<AtomicUsize>,
}

impl TlsServer {
    /// Starts a server answering from the given zone.
    pub async fn zone(records: &[(&str, &str)]) -> Self {
        let certs = load_certs("server.crt");
        let mut key_file = open_test_data("server.key");
        let key = rustls_pemfile::private_key(&mut key_file)
            .unwrap()
            .unwrap();
        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let queries = Arc::new(AtomicUsize::new(0));
        let handler = zone(records);
        let count = queries.clone();
        tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let handler = handler.clone();
                let count = count.clone();
                tokio::spawn(async move {
                    // Failed handshakes are what some tests are after.
                    if let Ok(sock) = acceptor.accept(sock).await {
                        serve_stream(sock, handler, count).await
                    }
                });
            }
        });
        TlsServer { addr, queries }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Returns a client configuration trusting only the test authority.
    pub fn client_config() -> ClientConfig {
        let mut roots = RootCertStore::empty();
        for cert in load_certs("ca.crt") {
            roots.add(cert).unwrap();
        }
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    }
}

fn open_test_data(file: &str) -> BufReader<File> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test-data")
        .join(file);
    BufReader::new(File::open(path).unwrap())
}

fn load_certs(file: &str) -> Vec<CertificateDer<'static>> {
    rustls_pemfile::certs(&mut open_test_data(file))
        .collect::<Result<_, _>>()
        .unwrap()
}

//------------ Building Responses --------------------------------------------

/// Returns a handler answering from a list of names and addresses.
///
/// Names not in the list get NXDOMAIN. Names in the list without an
/// address of the requested type get an empty NOERROR answer.
pub fn zone(records: &[(&str, &str)]) -> Handler {
    let records: Vec<(String, IpAddr)> = records
        .iter()
        .map(|(name, a)| (name.to_ascii_lowercase(), addr(a)))
        .collect();
    Arc::new(move |query: &[u8], _: Proto| {
        let qname = qname(query);
        let qtype = qtype(query);
        let mut known = false;
        let mut answers = Vec::new();
        for (name, a) in &records {
            if *name != qname {
                continue;
            }
            known = true;
            if (qtype == 1 && a.is_ipv4()) || (qtype == 28 && a.is_ipv6()) {
                answers.push(*a)
            }
        }
        let rcode = if known {
            Rcode::NoError
        } else {
            Rcode::NXDomain
        };
        Some(reply(query, rcode, false, &answers))
    })
}

/// Builds a response to `query`.
///
/// The question is copied from the query. Each address becomes an answer
/// record using a compression pointer to the question name.
pub fn reply(
    query: &[u8],
    rcode: Rcode,
    tc: bool,
    answers: &[IpAddr],
) -> Vec<u8> {
    let mut header = Header::from_message_slice(query).unwrap();
    header.set_qr(true);
    header.set_ra(true);
    header.set_tc(tc);
    header.set_rcode(rcode);
    let counts = HeaderCounts {
        qdcount: 1,
        ancount: answers.len() as u16,
        ..Default::default()
    };

    let mut buf = BytesMut::new();
    buf.put_slice(header.as_slice());
    buf.put_slice(&counts.to_bytes());
    buf.put_slice(question(query));
    for answer in answers {
        buf.put_u16(0xC00C);
        match answer {
            IpAddr::V4(a) => {
                buf.put_u16(1);
                buf.put_u16(1);
                buf.put_u32(300);
                buf.put_u16(4);
                buf.put_slice(&a.octets());
            }
            IpAddr::V6(a) => {
                buf.put_u16(28);
                buf.put_u16(1);
                buf.put_u32(300);
                buf.put_u16(16);
                buf.put_slice(&a.octets());
            }
        }
    }
    buf.to_vec()
}

/// Returns the question section of a query.
pub fn question(query: &[u8]) -> &[u8] {
    let mut pos = 12;
    while query[pos] != 0 {
        pos += usize::from(query[pos]) + 1;
    }
    &query[12..pos + 5]
}

/// Returns the question name of a query in lowercase with a trailing dot.
pub fn qname(query: &[u8]) -> String {
    let mut res = String::new();
    let mut pos = 12;
    while query[pos] != 0 {
        let len = usize::from(query[pos]);
        let label = &query[pos + 1..pos + 1 + len];
        res.push_str(&String::from_utf8_lossy(label).to_ascii_lowercase());
        res.push('.');
        pos += len + 1;
    }
    if res.is_empty() {
        res.push('.');
    }
    res
}

/// Returns the question type of a query.
pub fn qtype(query: &[u8]) -> u16 {
    let q = question(query);
    u16::from_be_bytes([q[q.len() - 4], q[q.len() - 3]])
}

/// Returns whether a query has an OPT record.
pub fn has_opt(query: &[u8]) -> bool {
    u16::from_be_bytes([query[10], query[11]]) > 0
}
