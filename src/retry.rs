//! Repeating failed lookups.

use crate::error::Error;
use crate::resolver::{LookupIp, Network, Resolver};
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// The default number of attempts, same as glibc’s.
const DEFAULT_ATTEMPTS: usize = 2;

//------------ RetryConfig ---------------------------------------------------

/// Configuration for a [`Retry`] resolver.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// The maximum number of attempts, 0 for no limit.
    attempts: usize,

    /// The time allowed for each attempt.
    attempt_timeout: Option<Duration>,

    /// The time allowed for all attempts together.
    total_timeout: Option<Duration>,

    /// The time to wait before the second attempt.
    ///
    /// The delay doubles with each further attempt.
    delay: Duration,
}

impl RetryConfig {
    /// Returns the maximum number of attempts.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Sets the maximum number of attempts.
    ///
    /// A value of 0 means to keep trying until a lookup succeeds, fails
    /// permanently, or the total timeout expires.
    pub fn set_attempts(&mut self, attempts: usize) {
        self.attempts = attempts
    }

    /// Returns the time allowed for each attempt.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Sets the time allowed for each attempt.
    ///
    /// An attempt that runs out of time fails with a temporary timeout
    /// error and is thus retried.
    pub fn set_attempt_timeout(&mut self, value: Option<Duration>) {
        self.attempt_timeout = value
    }

    /// Returns the time allowed for all attempts together.
    pub fn total_timeout(&self) -> Option<Duration> {
        self.total_timeout
    }

    /// Sets the time allowed for all attempts together.
    ///
    /// Once this time has expired, the lookup fails with a timeout error
    /// that is not temporary.
    pub fn set_total_timeout(&mut self, value: Option<Duration>) {
        self.total_timeout = value
    }

    /// Returns the delay before the second attempt.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sets the delay before the second attempt.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            attempts: DEFAULT_ATTEMPTS,
            attempt_timeout: None,
            total_timeout: None,
            delay: Duration::ZERO,
        }
    }
}

//------------ Retry ---------------------------------------------------------

/// A resolver repeating lookups that failed temporarily.
///
/// A lookup is repeated only if the error says it is temporary. Only the
/// error of the last attempt is returned.
pub struct Retry<R> {
    inner: R,
    config: RetryConfig,
}

impl<R> Retry<R> {
    /// Creates a retrying resolver with the default config.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, Default::default())
    }

    pub fn with_config(inner: R, config: RetryConfig) -> Self {
        Retry { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: Resolver> Retry<R> {
    async fn lookup(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        let Some(total) = self.config.total_timeout else {
            return self.attempts(network, host).await;
        };
        match timeout(total, self.attempts(network, host)).await {
            Ok(res) => res,
            Err(_) => {
                debug!(host, "retry budget exhausted");
                Err(Error::timeout(host, None).with_temporary(false))
            }
        }
    }

    async fn attempts(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        let mut attempt = 0;
        let mut delay = self.config.delay;
        loop {
            attempt += 1;
            let err = match self.attempt(network, host).await {
                Ok(addrs) => return Ok(addrs),
                Err(err) => err,
            };
            let limit = self.config.attempts;
            if !err.is_temporary() || (limit != 0 && attempt >= limit) {
                return Err(err);
            }
            debug!(host, attempt, "retrying after temporary error: {err}");

            // Give cancellation and timeouts a chance between attempts.
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }
    }

    async fn attempt(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        let lookup = self.inner.lookup_ip(network, host);
        match self.config.attempt_timeout {
            Some(limit) => match timeout(limit, lookup).await {
                Ok(res) => res,
                Err(_) => Err(Error::timeout(host, None)),
            },
            None => lookup.await,
        }
    }
}

impl<R: Resolver> Resolver for Retry<R> {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(self.lookup(network, host))
    }
}

//============ Testing =======================================================
