//! Wire protocol between the control client and the control service.
//!
//! ## Wire Format: NDJSON (Newline-Delimited JSON)
//!
//! Each message is a single JSON object terminated by `\n`.
//!
//! - **Request**: one [`ControlRequest`] line.
//! - **Response**: exactly one [`ControlResponse`] line per request.
//!
//! ```text
//! -> {"op":"expose","port":{"proto":"tcp","host_ip":"10.0.0.1","host_port":8080,...}}
//! <- {"status":"ok"}
//! -> {"op":"unexpose","port":{...}}
//! <- {"status":"error","message":"no such forward"}
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{PortliteError, PortliteResult};
use crate::port::ForwardingRule;

/// Requests the control service accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ControlRequest {
    /// Start forwarding `port`.
    Expose { port: ForwardingRule },
    /// Stop forwarding `port`.
    Unexpose { port: ForwardingRule },
}

impl ControlRequest {
    pub fn rule(&self) -> &ForwardingRule {
        match self {
            ControlRequest::Expose { port } | ControlRequest::Unexpose { port } => port,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            ControlRequest::Expose { .. } => "expose",
            ControlRequest::Unexpose { .. } => "unexpose",
        }
    }
}

/// Reply to a single [`ControlRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ControlResponse {
    Ok,
    Error { message: String },
}

impl ControlResponse {
    pub fn error(message: impl Into<String>) -> Self {
        ControlResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ControlResponse::Ok)
    }
}

/// Encode a message as one NDJSON line (trailing newline included).
pub fn encode_line<T: Serialize>(message: &T) -> PortliteResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode one NDJSON line. Surrounding whitespace, including the newline, is ignored.
pub fn decode_line<'a, T: Deserialize<'a>>(line: &'a str) -> PortliteResult<T> {
    let line = line.trim();
    if line.is_empty() {
        return Err(PortliteError::Protocol("empty message".into()));
    }
    Ok(serde_json::from_str(line)?)
}
