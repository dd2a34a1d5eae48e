//! Transport layer — sockets and the bounded request pump.

pub mod server;
pub mod tcp;
pub mod transport;
pub mod udp;
