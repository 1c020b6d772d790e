//! MCP connections owned by the daemon
//!
//! - [`ClientHandle`] / [`Connector`]: the contract for one live connection
//! - [`RmcpConnector`]: the real implementation over rmcp (stdio + streamable HTTP)
//! - [`ConnectionPool`]: one handle per server name, lazily or eagerly connected

mod connect;
mod handle;
mod pool;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use connect::{RmcpConnector, RmcpHandle};
pub use handle::{ClientHandle, Connector};
pub use pool::{ConnectionPool, INIT_CONNECT_TIMEOUT};
pub use types::{ConnectionDetail, ConnectionState, InitStatus, ToolInfo, ToolList};
