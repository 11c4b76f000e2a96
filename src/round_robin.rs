//! Spreading lookups over several resolvers.

use crate::resolver::{LookupIp, Network, Resolver};
use crate::sequential::lookup_in_order;
use rand::seq::SliceRandom;

//------------ RoundRobin ----------------------------------------------------

/// A resolver trying a list of resolvers in random order.
///
/// Every lookup shuffles the list anew and then tries the resolvers in
/// that order just like [`Sequential`][crate::sequential::Sequential]
/// does. Over many lookups, the load is spread evenly across all
/// resolvers without the resolvers having to share any state.
#[derive(Default)]
pub struct RoundRobin {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl RoundRobin {
    /// Creates a resolver spreading lookups over the given resolvers.
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        RoundRobin { resolvers }
    }

    /// Adds another resolver.
    pub fn push(&mut self, resolver: impl Resolver + 'static) {
        self.resolvers.push(Box::new(resolver))
    }

    /// Returns the resolver with another resolver added.
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.push(resolver);
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Returns a random order in which to try the resolvers.
    fn shuffled(&self) -> Vec<usize> {
        let mut order: Vec<_> = (0..self.resolvers.len()).collect();
        order.shuffle(&mut rand::thread_rng());
        order
    }
}

impl FromIterator<Box<dyn Resolver>> for RoundRobin {
    fn from_iter<T: IntoIterator<Item = Box<dyn Resolver>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Resolver for RoundRobin {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        // The generator must not be held across an await point.
        let order = self.shuffled();
        Box::pin(lookup_in_order(&self.resolvers, order, network, host))
    }
}
