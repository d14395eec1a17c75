//! Client side of the control channel.

pub mod client;
pub mod connection;

pub use client::{ControlClient, PortControl};
pub use connection::{BoxedStream, Connector, ControlStream, SocketConnector};
