//! Helpers shared by the transport components

pub mod port_finder;
pub mod thread;

pub use port_finder::{find_available_port, find_port_pair};
pub use thread::join_with_timeout;
