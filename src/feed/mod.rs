//! Upstream result feed.

pub mod backoff;
pub mod client;
pub mod codec;
pub mod transport;

pub use backoff::Backoff;
pub use client::{FeedClient, FeedState};
pub use codec::{FeedEvent, decode_message};
pub use transport::{FeedConnection, FeedConnector, SignalRConnector};
