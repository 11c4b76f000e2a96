//! Basics.
//!
//! This module provides the small part of the DNS wire format a stub
//! resolver needs: the message [header], the few [IANA values][iana] that
//! are looked at, domain names in presentation format and their conversion
//! into wire format ([name]), as well as building queries and parsing
//! responses ([message]).
//!
//! Parsing only ever looks at the header, the question, and the answer
//! section. Everything else in a response is skipped.

pub use self::header::{Header, HeaderCounts};
pub use self::iana::{Class, Rcode, Rtype};
pub use self::message::{Message, ParseError, Query, Question, Record};
pub use self::name::NameError;

pub mod header;
pub mod iana;
pub mod message;
pub mod name;
