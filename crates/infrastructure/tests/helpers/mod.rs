pub mod dns_server_mock;
pub mod mock_dispatcher;

pub use dns_server_mock::MockDnsServer;
pub use mock_dispatcher::{DispatchCall, MockDispatcher};
