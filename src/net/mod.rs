//! Opening connections to DNS servers.
//!
//! All network access of the resolvers goes through a [`Dialer`]. The
//! default [`DirectDialer`] uses the operating system’s sockets via Tokio.
//! Other implementations can route DNS traffic through a tunnel or a
//! user space network stack, or fake the network altogether in tests.

pub use self::dial::{AsyncDgram, AsyncStream, Dialer, DirectDialer};

pub mod dial;
