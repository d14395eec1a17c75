//! portlite shared - types used on both sides of the control channel
//!
//! This crate contains the forwarding rule model, the control target,
//! the NDJSON wire protocol and the error type used by the portlite
//! client (`portlite`), its CLI, and test control services.

pub mod constants;
pub mod errors;
pub mod port;
pub mod protocol;
pub mod transport;

pub use errors::{PortliteError, PortliteResult};
pub use port::{ForwardingRule, PathPair, Protocol, RuleSpec, SocketPair};
pub use protocol::{ControlRequest, ControlResponse};
pub use transport::ControlTarget;
