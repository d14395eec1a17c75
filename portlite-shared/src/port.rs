//! Forwarding rule model.
//!
//! A [`ForwardingRule`] says how one host-side endpoint maps to one guest-side
//! endpoint. IP protocols carry address/port pairs, `unix` carries a pair of
//! socket paths; the enum makes it impossible to populate both shapes.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{PortliteError, PortliteResult};

/// Transport protocol of a forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Unix,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Unix => "unix",
        }
    }

    /// Whether rules of this protocol use address/port endpoints.
    pub fn is_ip(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = PortliteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "unix" => Ok(Protocol::Unix),
            other => Err(PortliteError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Address/port endpoints of a tcp or udp forward.
///
/// `None` addresses mean "unset": all interfaces on the host side, the
/// service's default on the guest side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketPair {
    pub host_ip: Option<IpAddr>,
    pub host_port: u16,
    pub guest_ip: Option<IpAddr>,
    pub guest_port: u16,
}

/// Socket path endpoints of a unix forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPair {
    pub host_path: String,
    pub guest_path: String,
}

/// One host-to-guest forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "proto", rename_all = "lowercase")]
pub enum ForwardingRule {
    Tcp(SocketPair),
    Udp(SocketPair),
    Unix(PathPair),
}

impl ForwardingRule {
    pub fn tcp(pair: SocketPair) -> Self {
        ForwardingRule::Tcp(pair)
    }

    pub fn udp(pair: SocketPair) -> Self {
        ForwardingRule::Udp(pair)
    }

    pub fn unix(host_path: impl Into<String>, guest_path: impl Into<String>) -> Self {
        ForwardingRule::Unix(PathPair {
            host_path: host_path.into(),
            guest_path: guest_path.into(),
        })
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            ForwardingRule::Tcp(_) => Protocol::Tcp,
            ForwardingRule::Udp(_) => Protocol::Udp,
            ForwardingRule::Unix(_) => Protocol::Unix,
        }
    }

    /// Address/port endpoints, for tcp and udp rules.
    pub fn socket_pair(&self) -> Option<&SocketPair> {
        match self {
            ForwardingRule::Tcp(pair) | ForwardingRule::Udp(pair) => Some(pair),
            ForwardingRule::Unix(_) => None,
        }
    }

    /// Concrete host socket address, if the rule names one.
    ///
    /// Returns `None` for unix rules and for unset or unspecified (wildcard)
    /// host addresses.
    pub fn host_socket_addr(&self) -> Option<SocketAddr> {
        let pair = self.socket_pair()?;
        let ip = pair.host_ip.filter(|ip| !ip.is_unspecified())?;
        Some(SocketAddr::new(ip, pair.host_port))
    }
}

fn fmt_ip(ip: &Option<IpAddr>) -> String {
    match ip {
        None => "*".to_string(),
        Some(IpAddr::V4(v4)) => v4.to_string(),
        Some(IpAddr::V6(v6)) => format!("[{}]", v6),
    }
}

impl fmt::Display for ForwardingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardingRule::Tcp(p) | ForwardingRule::Udp(p) => write!(
                f,
                "{}:{}:{}:{}:{}",
                self.protocol(),
                fmt_ip(&p.host_ip),
                p.host_port,
                fmt_ip(&p.guest_ip),
                p.guest_port
            ),
            ForwardingRule::Unix(p) => write!(f, "unix:{}:{}", p.host_path, p.guest_path),
        }
    }
}

/// Parse an IP the way the upstream tooling does: empty and malformed strings
/// both yield "unset".
pub fn parse_ip_lenient(s: &str) -> Option<IpAddr> {
    s.trim().parse().ok()
}

/// Raw, unvalidated rule inputs as they come from flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSpec {
    pub proto: String,
    pub host_ip: String,
    pub host_port: Option<u16>,
    pub container_ip: String,
    pub container_port: Option<u16>,
    pub host_path: String,
    pub container_path: String,
}

impl RuleSpec {
    /// Validate the inputs and build the rule.
    ///
    /// The protocol is checked first, so an unknown protocol always reports
    /// [`PortliteError::UnsupportedProtocol`].
    pub fn build(&self) -> PortliteResult<ForwardingRule> {
        let proto: Protocol = self.proto.parse()?;

        if !proto.is_ip() {
            if self.host_path.is_empty() || self.container_path.is_empty() {
                return Err(PortliteError::Config(
                    "unix forwards need both -host-path and -container-path".into(),
                ));
            }
            return Ok(ForwardingRule::unix(
                self.host_path.clone(),
                self.container_path.clone(),
            ));
        }

        let (Some(host_port), Some(guest_port)) = (self.host_port, self.container_port) else {
            return Err(PortliteError::Config(format!(
                "{} forwards need both -host-port and -container-port",
                proto
            )));
        };

        let pair = SocketPair {
            host_ip: parse_ip_lenient(&self.host_ip),
            host_port,
            guest_ip: parse_ip_lenient(&self.container_ip),
            guest_port,
        };

        Ok(match proto {
            Protocol::Udp => ForwardingRule::udp(pair),
            _ => ForwardingRule::tcp(pair),
        })
    }

    /// Non-empty IP inputs that do not parse and will be treated as unset.
    pub fn malformed_ips(&self) -> Vec<&str> {
        [self.host_ip.as_str(), self.container_ip.as_str()]
            .into_iter()
            .filter(|s| !s.trim().is_empty() && parse_ip_lenient(s).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::net::Ipv4Addr;

    fn tcp_spec() -> RuleSpec {
        RuleSpec {
            proto: "tcp".into(),
            host_ip: "10.0.0.1".into(),
            host_port: Some(8080),
            container_ip: "172.17.0.2".into(),
            container_port: Some(80),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_tcp_matches_inputs() {
        let rule = tcp_spec().build().unwrap();
        assert_eq!(rule.protocol(), Protocol::Tcp);

        let pair = rule.socket_pair().unwrap();
        assert_eq!(pair.host_ip, Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert_eq!(pair.host_port, 8080);
        assert_eq!(pair.guest_ip, Some(IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2))));
        assert_eq!(pair.guest_port, 80);
    }

    #[test]
    fn test_build_udp() {
        let spec = RuleSpec {
            proto: "udp".into(),
            ..tcp_spec()
        };
        let rule = spec.build().unwrap();
        assert_eq!(rule.protocol(), Protocol::Udp);
        assert_eq!(rule.to_string(), "udp:10.0.0.1:8080:172.17.0.2:80");
    }

    #[test]
    fn test_build_unix_matches_inputs() {
        let spec = RuleSpec {
            proto: "unix".into(),
            host_path: "/var/run/a.sock".into(),
            container_path: "/run/b.sock".into(),
            ..Default::default()
        };
        let rule = spec.build().unwrap();
        assert_eq!(rule, ForwardingRule::unix("/var/run/a.sock", "/run/b.sock"));
        assert!(rule.socket_pair().is_none());
        assert!(rule.host_socket_addr().is_none());
    }

    #[rstest]
    #[case("sctp")]
    #[case("TCP")]
    #[case("")]
    fn test_unsupported_protocol(#[case] proto: &str) {
        let spec = RuleSpec {
            proto: proto.into(),
            ..tcp_spec()
        };
        let err = spec.build().unwrap_err();
        assert!(matches!(err, PortliteError::UnsupportedProtocol(p) if p == proto));
    }

    #[test]
    fn test_missing_ports_are_config_errors() {
        let spec = RuleSpec {
            container_port: None,
            ..tcp_spec()
        };
        assert!(matches!(spec.build(), Err(PortliteError::Config(_))));

        let spec = RuleSpec {
            proto: "unix".into(),
            host_path: "/a.sock".into(),
            ..Default::default()
        };
        assert!(matches!(spec.build(), Err(PortliteError::Config(_))));
    }

    #[test]
    fn test_lenient_ip_parsing() {
        let spec = RuleSpec {
            host_ip: "".into(),
            container_ip: "not-an-ip".into(),
            ..tcp_spec()
        };
        let rule = spec.build().unwrap();
        let pair = rule.socket_pair().unwrap();
        assert_eq!(pair.host_ip, None);
        assert_eq!(pair.guest_ip, None);
        assert_eq!(spec.malformed_ips(), vec!["not-an-ip"]);
        assert_eq!(rule.to_string(), "tcp:*:8080:*:80");
    }

    #[test]
    fn test_host_socket_addr() {
        let rule = tcp_spec().build().unwrap();
        assert_eq!(
            rule.host_socket_addr(),
            Some("10.0.0.1:8080".parse().unwrap())
        );

        let wildcard = RuleSpec {
            host_ip: "0.0.0.0".into(),
            ..tcp_spec()
        };
        assert_eq!(wildcard.build().unwrap().host_socket_addr(), None);

        let v6 = RuleSpec {
            host_ip: "::1".into(),
            ..tcp_spec()
        };
        let rule = v6.build().unwrap();
        assert_eq!(rule.host_socket_addr(), Some("[::1]:8080".parse().unwrap()));
        assert_eq!(rule.to_string(), "tcp:[::1]:8080:172.17.0.2:80");
    }

    #[test]
    fn test_serialization_is_tagged_by_proto() {
        let rule = ForwardingRule::unix("/a.sock", "/b.sock");
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["proto"], "unix");
        assert_eq!(json["host_path"], "/a.sock");

        let rule = tcp_spec().build().unwrap();
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["proto"], "tcp");
        assert_eq!(json["host_port"], 8080);
    }
}
