pub mod dispatcher;
pub mod forwarding;
pub mod pool;
pub mod resolver;
pub mod transport;

pub use dispatcher::{QueryDispatcher, UpstreamDispatcher};
pub use pool::{PoolSnapshot, Server, ServerLease, ServerPool};
pub use resolver::{ResolveHandler, Resolver, ResolverGroup};
