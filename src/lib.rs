//! Composable DNS resolvers.
//!
//! This crate provides a set of small resolvers that each implement one
//! strategy for turning a host name into a list of IP addresses. All of
//! them implement the [`Resolver`] trait and can therefore be combined
//! freely: resolvers can be chained, raced, retried, and their results
//! post-processed. Together they can emulate the resolver of the
//! operating system while talking DNS directly over UDP, TCP, or TLS
//! instead of relying on the system’s resolver library.
//!
//! # Modules
//!
//! The leaf resolvers produce addresses themselves:
//!
//! * [dns] asks a DNS server,
//! * [hosts] looks names up in a host table such as `/etc/hosts`,
//! * [literal] understands address literals and `localhost`.
//!
//! The combinators wrap other resolvers:
//!
//! * [sequential], [parallel], and [round_robin] ask a list of resolvers
//!   one after another, all at once, or in random order,
//! * [retry] repeats lookups that failed temporarily,
//! * [relative] expands relative names via a search list,
//! * [dns64] synthesizes IPv6 addresses for IPv4-only hosts,
//! * [preferred] orders addresses by preference.
//!
//! The [`system()`] function assembles a resolver that behaves like the
//! system’s based on a [`SystemConf`][conf::SystemConf], usually read from
//! `/etc/resolv.conf`.
//!
//! In addition, [base] contains the minimal DNS message handling the
//! [dns] module needs, [addrselect] implements the address ordering of
//! RFC 6724, and [net] defines how connections are made.
//!
//! # Example
//!
//! ```no_run
//! use domain_resolvers::{system, Resolver, SystemResolverConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = system(SystemResolverConfig::default())?;
//! for addr in resolver.lookup_host("www.example.com").await? {
//!     println!("{}", addr);
//! }
//! # Ok(())
//! # }
//! ```

#![allow(renamed_and_removed_lints)]
#![allow(clippy::unknown_clippy_lints)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use self::error::{Error, ErrorKind};
pub use self::resolver::{Network, Resolver};
pub use self::system::{system, HostsSource, SystemResolverConfig};

pub mod addrselect;
pub mod base;
pub mod conf;
pub mod dns;
pub mod dns64;
pub mod error;
pub mod hosts;
pub mod literal;
pub mod net;
pub mod parallel;
pub mod preferred;
pub mod relative;
pub mod resolver;
pub mod retry;
pub mod round_robin;
pub mod sequential;
pub mod system;
