mod actor;
mod cache;
mod failover;
mod resolver;
mod upstream;

pub mod persist;

pub use actor::{ActorGone, ActorHandle, ForwarderStatus};
pub use cache::{CacheEntry, ResponseCache};
pub use failover::{Failover, FailureAction, FALLBACK_FORWARDER};
pub use resolver::{Resolver, DEFAULT_FORWARDER_PORT};
pub use upstream::{ForwardError, UdpUpstream, Upstream, UPSTREAM_TIMEOUT};
