//! portlite - expose host ports to guests through a virtualization host's
//! control service.
//!
//! The crate implements the client half of the port-exposure lifecycle:
//!
//! 1. [`bind`]: optionally bind the host endpoint locally
//! 2. [`portal`]: connect to the control service and send `expose`
//! 3. [`lifecycle`]: hold the forward until shutdown, then send `unexpose`
//!
//! ```no_run
//! use portlite::{ExposeOptions, LogReporter, PortExposer};
//! use portlite_shared::{ControlTarget, ForwardingRule};
//!
//! # async fn demo() -> portlite_shared::PortliteResult<()> {
//! let rule = ForwardingRule::unix("/var/run/docker.sock", "/run/docker.sock");
//! let options = ExposeOptions::new(rule, ControlTarget::vsock(62373));
//!
//! let mut exposer = PortExposer::new(options);
//! // Hold until the process is killed.
//! exposer.run(&LogReporter, futures::future::pending()).await?;
//! # Ok(())
//! # }
//! ```

pub mod bind;
pub mod lifecycle;
pub mod options;
pub mod portal;

pub use bind::{LocalBindMode, LocalBindOutcome, LocalBinder, SocketBinder};
pub use lifecycle::{Exposure, LifecycleState, LogReporter, PortExposer, Reporter};
pub use options::ExposeOptions;
pub use portal::{BoxedStream, Connector, ControlClient, PortControl, SocketConnector};
