pub mod connection;
pub mod protocol;
pub mod transport;

pub use connection::{ConnectionState, EventConnection};
pub use transport::{EventHandler, EventTransport, SocketIoTransport, TransportError};
