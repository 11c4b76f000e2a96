//! Resolving relative host names.
//!
//! A host name without a trailing dot may be relative to one of a list of
//! search domains. [`Relative`] expands such names and hands the
//! resulting absolute names to an inner resolver one after another, the
//! way the system’s stub resolver treats the `search` and `ndots` options
//! of `resolv.conf`.

use crate::base::name;
use crate::error::Error;
use crate::resolver::{LookupIp, Network, Resolver};
use std::net::IpAddr;
use tracing::trace;

//------------ RelativeConfig ------------------------------------------------

/// Configuration for a [`Relative`] resolver.
#[derive(Clone, Debug)]
pub struct RelativeConfig {
    /// The search list.
    search: Vec<String>,

    /// The number of dots that make a name absolute.
    ndots: usize,
}

impl RelativeConfig {
    /// Returns the search list.
    pub fn search(&self) -> &[String] {
        &self.search
    }

    /// Sets the search list.
    ///
    /// The suffixes are appended to relative names in order. A suffix of
    /// `"."` stands for the root, i.e., the name itself.
    pub fn set_search<I, S>(&mut self, search: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = search.into_iter().map(Into::into).collect()
    }

    /// Returns the number of dots that make a name absolute.
    pub fn ndots(&self) -> usize {
        self.ndots
    }

    /// Sets the number of dots that make a name absolute.
    ///
    /// A name without a trailing dot that contains fewer than this many
    /// dots is expanded via the search list.
    pub fn set_ndots(&mut self, ndots: usize) {
        self.ndots = ndots
    }
}

impl Default for RelativeConfig {
    fn default() -> Self {
        RelativeConfig {
            search: vec![".".into()],
            ndots: 1,
        }
    }
}

//------------ Relative ------------------------------------------------------

/// A resolver expanding relative names via a search list.
///
/// Candidate names are tried in search list order and the first success
/// is returned. If all candidates fail, the errors are joined. If no
/// candidate was a valid domain name, the lookup fails with a not-found
/// error.
pub struct Relative<R> {
    inner: R,
    config: RelativeConfig,
}

impl<R> Relative<R> {
    /// Creates a new resolver with the default config.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, Default::default())
    }

    pub fn with_config(inner: R, config: RelativeConfig) -> Self {
        Relative { inner, config }
    }

    pub fn config(&self) -> &RelativeConfig {
        &self.config
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Returns the absolute names to try for `host`.
    pub fn candidates(&self, host: &str) -> Vec<String> {
        let dots = host.matches('.').count();
        if name::is_fqdn(host) || dots >= self.config.ndots {
            return vec![name::fqdn(host)];
        }
        self.config
            .search
            .iter()
            .map(|suffix| name::join(host, suffix))
            .filter(|candidate| name::is_domain_name(candidate))
            .collect()
    }
}

impl<R: Resolver> Relative<R> {
    async fn lookup(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        let mut errors = Vec::new();
        for candidate in self.candidates(host) {
            match self.inner.lookup_ip(network, &candidate).await {
                Ok(addrs) => return Ok(addrs),
                Err(err) => {
                    trace!(host, candidate, "candidate failed: {err}");
                    errors.push(err)
                }
            }
        }
        Err(Error::join(host, errors))
    }
}

impl<R: Resolver> Resolver for Relative<R> {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(self.lookup(network, host))
    }
}

//============ Testing =======================================================
