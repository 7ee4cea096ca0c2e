pub mod server;
pub mod server_pool;

pub use server::Server;
pub use server_pool::{PoolSnapshot, ServerLease, ServerPool};
