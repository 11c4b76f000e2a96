//! IANA registry values used by the resolvers.
//!
//! Only the handful of values a stub resolver actually needs are given
//! names here. Everything else is carried through as its raw integer.
#![allow(clippy::upper_case_acronyms)]

use core::fmt;

//------------ Rtype ---------------------------------------------------------

/// Resource record types.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Rtype {
    /// A host address.
    A,

    /// IPv6 address.
    ///
    /// Defined in [RFC 3596].
    ///
    /// [RFC 3596]: https://tools.ietf.org/html/rfc3596
    Aaaa,

    /// The EDNS option pseudo-record.
    ///
    /// Defined in [RFC 6891].
    ///
    /// [RFC 6891]: https://tools.ietf.org/html/rfc6891
    Opt,

    /// A raw value for types without a name of their own.
    Int(u16),
}

impl Rtype {
    pub fn from_int(value: u16) -> Self {
        match value {
            1 => Rtype::A,
            28 => Rtype::Aaaa,
            41 => Rtype::Opt,
            _ => Rtype::Int(value),
        }
    }

    pub fn to_int(self) -> u16 {
        match self {
            Rtype::A => 1,
            Rtype::Aaaa => 28,
            Rtype::Opt => 41,
            Rtype::Int(value) => value,
        }
    }
}

impl fmt::Display for Rtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Rtype::A => f.write_str("A"),
            Rtype::Aaaa => f.write_str("AAAA"),
            Rtype::Opt => f.write_str("OPT"),
            Rtype::Int(value) => write!(f, "TYPE{}", value),
        }
    }
}

//------------ Class ---------------------------------------------------------

/// DNS classes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Class {
    /// Internet (IN).
    In,

    /// Any other class.
    Int(u16),
}

impl Class {
    pub fn from_int(value: u16) -> Self {
        match value {
            1 => Class::In,
            _ => Class::Int(value),
        }
    }

    pub fn to_int(self) -> u16 {
        match self {
            Class::In => 1,
            Class::Int(value) => value,
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Class::In => f.write_str("IN"),
            Class::Int(value) => write!(f, "CLASS{}", value),
        }
    }
}

//------------ Rcode ---------------------------------------------------------

/// DNS Response Codes.
///
/// The response code of a response indicates what happend on the server
/// when trying to answer the query. The code is a 4 bit value and part of
/// the header of a DNS message.
///
/// [RFC 1035]: https://tools.ietf.org/html/rfc1035
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Rcode {
    /// No error condition.
    ///
    /// (Otherwise known as success.)
    NoError,

    /// Format error.
    ///
    /// The name server was unable to interpret the query.
    FormErr,

    /// Server failure.
    ///
    /// The name server was unable to process this query due to a problem
    /// with the name server.
    ServFail,

    /// Name error.
    ///
    /// The domain name given in the query does not exist at the name server.
    NXDomain,

    /// Not implemented.
    ///
    /// The name server does not support the requested kind of query.
    NotImp,

    /// Query refused.
    ///
    /// The name server refused to perform the operation requested by the
    /// query for policy reasons.
    Refused,

    /// A raw integer rcode value.
    ///
    /// When converting to a 4 bit code, the upper bits are simply ignored.
    Int(u8),
}

impl Rcode {
    /// Creates an rcode from an integer.
    ///
    /// Only the lower four bits of `value` are considered.
    pub fn from_int(value: u8) -> Rcode {
        match value & 0x0F {
            0 => Rcode::NoError,
            1 => Rcode::FormErr,
            2 => Rcode::ServFail,
            3 => Rcode::NXDomain,
            4 => Rcode::NotImp,
            5 => Rcode::Refused,
            value => Rcode::Int(value),
        }
    }

    /// Returns the integer value for this rcode.
    pub fn to_int(self) -> u8 {
        match self {
            Rcode::NoError => 0,
            Rcode::FormErr => 1,
            Rcode::ServFail => 2,
            Rcode::NXDomain => 3,
            Rcode::NotImp => 4,
            Rcode::Refused => 5,
            Rcode::Int(value) => value & 0x0F,
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Rcode::NoError => f.write_str("NOERROR"),
            Rcode::FormErr => f.write_str("FORMERR"),
            Rcode::ServFail => f.write_str("SERVFAIL"),
            Rcode::NXDomain => f.write_str("NXDOMAIN"),
            Rcode::NotImp => f.write_str("NOTIMP"),
            Rcode::Refused => f.write_str("REFUSED"),
            Rcode::Int(value) => write!(f, "RCODE{}", value & 0x0F),
        }
    }
}

//============ Test ==========================================================
