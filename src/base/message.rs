//! Building queries and parsing responses.
//!
//! A stub resolver only ever sends one kind of message: a recursive query
//! with a single question, optionally carrying an EDNS OPT record. It only
//! needs three things from a response: the header, the question to match
//! it against the query, and the address records of the answer section.
//! [`Query`] and [`Message`] provide exactly that.

use super::header::{Header, HeaderCounts};
use super::iana::{Class, Rcode, Rtype};
use super::name::{self, NameError};
use bytes::{BufMut, Bytes, BytesMut};
use core::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The UDP payload size advertised via EDNS.
///
/// This is the value recommended by DNS Flag Day 2020 which avoids IP
/// fragmentation on practically all paths.
pub const EDNS_UDP_PAYLOAD_SIZE: u16 = 1232;

/// The maximum number of compression pointers followed in a single name.
const MAX_POINTERS: usize = 64;

//------------ Query ---------------------------------------------------------

/// A query message with a single question.
#[derive(Clone, Debug)]
pub struct Query {
    /// The message in wire format.
    message: Bytes,

    /// The question name in uncompressed wire format.
    qname: Vec<u8>,

    /// The question type.
    qtype: Rtype,

    /// Whether the message carries an OPT record.
    edns: bool,
}

impl Query {
    /// Creates a new query for `qname` and `qtype` in class IN.
    ///
    /// The query gets a random message ID and has the RD bit set. If `edns`
    /// is `true`, an OPT record advertising [`EDNS_UDP_PAYLOAD_SIZE`] is
    /// added to the additional section.
    pub fn new(
        qname: &str,
        qtype: Rtype,
        edns: bool,
    ) -> Result<Self, NameError> {
        Ok(Self::from_wire_name(name::to_wire(qname)?, qtype, edns))
    }

    fn from_wire_name(qname: Vec<u8>, qtype: Rtype, edns: bool) -> Self {
        let mut header = Header::new();
        header.set_random_id();
        header.set_rd(true);
        let counts = HeaderCounts {
            qdcount: 1,
            arcount: u16::from(edns),
            ..Default::default()
        };

        let mut buf = BytesMut::with_capacity(12 + qname.len() + 4 + 11);
        buf.put_slice(header.as_slice());
        buf.put_slice(&counts.to_bytes());
        buf.put_slice(&qname);
        buf.put_u16(qtype.to_int());
        buf.put_u16(Class::In.to_int());
        if edns {
            // Root owner, type OPT, payload size as class, zero extended
            // rcode, version and flags, empty rdata.
            buf.put_u8(0);
            buf.put_u16(Rtype::Opt.to_int());
            buf.put_u16(EDNS_UDP_PAYLOAD_SIZE);
            buf.put_u32(0);
            buf.put_u16(0);
        }

        Query {
            message: buf.freeze(),
            qname,
            qtype,
            edns,
        }
    }

    /// Returns the same query with a fresh ID and without the OPT record.
    pub fn without_edns(&self) -> Self {
        Self::from_wire_name(self.qname.clone(), self.qtype, false)
    }

    /// Returns the message ID.
    pub fn id(&self) -> u16 {
        // The message always starts with a complete header.
        u16::from_be_bytes([self.message[0], self.message[1]])
    }

    /// Returns the question type.
    pub fn qtype(&self) -> Rtype {
        self.qtype
    }

    /// Returns whether the query carries an OPT record.
    pub fn has_edns(&self) -> bool {
        self.edns
    }

    /// Returns the message in wire format.
    pub fn as_slice(&self) -> &[u8] {
        self.message.as_ref()
    }

    /// Returns the message prefixed with its length for stream transports.
    pub fn as_stream_slice(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.message.len() + 2);
        // A single question never gets anywhere near 64k.
        buf.put_u16(self.message.len() as u16);
        buf.put_slice(&self.message);
        buf.freeze()
    }

    /// Returns whether `answer` is a response to this query.
    ///
    /// The response must have the QR bit set, the same ID, and repeat the
    /// question. Error responses without a question section are accepted
    /// as well since some servers strip it when answering FORMERR.
    pub fn is_answer(&self, answer: &Message) -> bool {
        if !answer.header().qr() || answer.header().id() != self.id() {
            return false;
        }
        match answer.question() {
            Some(question) => {
                question.qtype == self.qtype
                    && question.qclass == Class::In
                    && question.qname.eq_ignore_ascii_case(&self.qname)
            }
            None => {
                answer.counts().qdcount == 0
                    && answer.header().rcode() != Rcode::NoError
            }
        }
    }
}

//------------ Message -------------------------------------------------------

/// A parsed response message.
#[derive(Clone, Debug)]
pub struct Message {
    octets: Bytes,
    header: Header,
    counts: HeaderCounts,
    question: Option<Question>,
    answer: Vec<Record>,
}

impl Message {
    /// Parses a message from its wire format.
    ///
    /// Only the header, the first question and the answer section are
    /// parsed. Anything after the answer section is ignored.
    pub fn from_octets(octets: Bytes) -> Result<Self, ParseError> {
        let header = Header::from_message_slice(&octets)
            .ok_or(ParseError::ShortInput)?;
        let counts = HeaderCounts::from_message_slice(&octets)
            .ok_or(ParseError::ShortInput)?;

        let mut parser = Parser::new(&octets, 12);
        let mut question = None;
        for _ in 0..counts.qdcount {
            let qname = parser.parse_name()?;
            let qtype = Rtype::from_int(parser.parse_u16()?);
            let qclass = Class::from_int(parser.parse_u16()?);
            if question.is_none() {
                question = Some(Question {
                    qname,
                    qtype,
                    qclass,
                });
            }
        }

        let mut answer = Vec::with_capacity(usize::from(counts.ancount));
        for _ in 0..counts.ancount {
            answer.push(parser.parse_record()?);
        }

        Ok(Message {
            octets,
            header,
            counts,
            question,
            answer,
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn counts(&self) -> HeaderCounts {
        self.counts
    }

    /// Returns the first question, if there is one.
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    /// Returns the records of the answer section.
    pub fn answer(&self) -> &[Record] {
        &self.answer
    }

    /// Returns the raw octets of the message.
    pub fn as_slice(&self) -> &[u8] {
        self.octets.as_ref()
    }

    /// Returns the addresses of all A and AAAA records in class IN.
    ///
    /// A recursive server is expected to have followed any CNAME chain
    /// already, so all address records are taken to be for the canonical
    /// name of the question.
    pub fn addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.answer.iter().filter_map(Record::address)
    }
}

//------------ Question ------------------------------------------------------

/// The question of a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Question {
    /// The name in uncompressed wire format.
    pub qname: Vec<u8>,
    pub qtype: Rtype,
    pub qclass: Class,
}

//------------ Record --------------------------------------------------------

/// A resource record of the answer section.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// The owner name in uncompressed wire format.
    pub owner: Vec<u8>,
    pub rtype: Rtype,
    pub class: Class,
    pub ttl: u32,
    pub data: Bytes,
}

impl Record {
    /// Returns the address if this is an A or AAAA record in class IN.
    pub fn address(&self) -> Option<IpAddr> {
        if self.class != Class::In {
            return None;
        }
        match self.rtype {
            Rtype::A => {
                let octets: [u8; 4] = self.data.as_ref().try_into().ok()?;
                Some(Ipv4Addr::from(octets).into())
            }
            Rtype::Aaaa => {
                let octets: [u8; 16] = self.data.as_ref().try_into().ok()?;
                Some(Ipv6Addr::from(octets).into())
            }
            _ => None,
        }
    }
}

//------------ Parser --------------------------------------------------------

/// A cursor over the octets of a message.
struct Parser<'a> {
    octets: &'a Bytes,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(octets: &'a Bytes, pos: usize) -> Self {
        Parser { octets, pos }
    }

    fn parse_u16(&mut self) -> Result<u16, ParseError> {
        let s = self
            .octets
            .get(self.pos..self.pos + 2)
            .ok_or(ParseError::ShortInput)?;
        self.pos += 2;
        Ok(u16::from_be_bytes([s[0], s[1]]))
    }

    fn parse_u32(&mut self) -> Result<u32, ParseError> {
        let s = self
            .octets
            .get(self.pos..self.pos + 4)
            .ok_or(ParseError::ShortInput)?;
        self.pos += 4;
        Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }

    /// Parses a possibly compressed name into uncompressed wire format.
    fn parse_name(&mut self) -> Result<Vec<u8>, ParseError> {
        let mut res = Vec::new();
        let mut pos = self.pos;
        let mut end = None;
        let mut pointers = 0;
        loop {
            let len = *self.octets.get(pos).ok_or(ParseError::ShortInput)?;
            match len & 0xC0 {
                0x00 => {
                    let len = usize::from(len);
                    let label = self
                        .octets
                        .get(pos + 1..pos + 1 + len)
                        .ok_or(ParseError::ShortInput)?;
                    res.push(len as u8);
                    res.extend_from_slice(label);
                    if res.len() > name::MAX_NAME_LEN {
                        return Err(ParseError::form_error(
                            "long domain name",
                        ));
                    }
                    pos += 1 + len;
                    if len == 0 {
                        break;
                    }
                }
                0xC0 => {
                    let low = *self
                        .octets
                        .get(pos + 1)
                        .ok_or(ParseError::ShortInput)?;
                    if end.is_none() {
                        end = Some(pos + 2);
                    }
                    pointers += 1;
                    if pointers > MAX_POINTERS {
                        return Err(ParseError::form_error(
                            "compression pointer loop",
                        ));
                    }
                    pos = usize::from(len & 0x3F) << 8 | usize::from(low);
                }
                _ => {
                    return Err(ParseError::form_error("invalid label type"))
                }
            }
        }
        self.pos = end.unwrap_or(pos);
        Ok(res)
    }

    fn parse_record(&mut self) -> Result<Record, ParseError> {
        let owner = self.parse_name()?;
        let rtype = Rtype::from_int(self.parse_u16()?);
        let class = Class::from_int(self.parse_u16()?);
        let ttl = self.parse_u32()?;
        let rdlen = usize::from(self.parse_u16()?);
        let end = self.pos + rdlen;
        if end > self.octets.len() {
            return Err(ParseError::ShortInput);
        }
        let data = self.octets.slice(self.pos..end);
        self.pos = end;
        Ok(Record {
            owner,
            rtype,
            class,
            ttl,
            data,
        })
    }
}

//------------ ParseError ----------------------------------------------------

/// An error happened while parsing a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// An attempt was made to go beyond the end of the message.
    ShortInput,

    /// A formatting error occurred.
    Form(&'static str),
}

impl ParseError {
    /// Creates a new parse error as a form error with the given message.
    pub fn form_error(msg: &'static str) -> Self {
        ParseError::Form(msg)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::ShortInput => f.write_str("unexpected end of input"),
            ParseError::Form(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ParseError {}

//============ Testing =======================================================
