use std::path::PathBuf;

use clap::Parser;
use portlite::LocalBindMode;
use portlite_shared::RuleSpec;

/// portlite-expose - ask the host control service to forward a port or socket
/// into the guest, hold it until terminated, then withdraw it.
#[derive(Parser, Debug)]
#[command(name = "portlite-expose", author, version, about, long_about = None)]
pub struct Cli {
    /// Forwarding protocol: tcp, udp or unix
    #[arg(long, default_value = "tcp")]
    pub proto: String,

    /// Host-side IP address (tcp/udp). Empty means any
    #[arg(long)]
    pub host_ip: Option<String>,

    /// Host-side port (tcp/udp)
    #[arg(long)]
    pub host_port: Option<u16>,

    /// Guest-side IP address (tcp/udp)
    #[arg(long)]
    pub container_ip: Option<String>,

    /// Guest-side port (tcp/udp)
    #[arg(long)]
    pub container_port: Option<u16>,

    /// Host-side socket path (unix)
    #[arg(long)]
    pub host_path: Option<String>,

    /// Guest-side socket path (unix)
    #[arg(long)]
    pub container_path: Option<String>,

    /// Reserve the port on the local stack first: best-effort, always or never
    ///
    /// Default: best-effort
    #[arg(long, env = "PORTLITE_LOCAL_BIND")]
    pub local_bind: Option<LocalBindMode>,

    /// Same as `--local-bind never`, kept for existing scripts
    #[arg(long, hide = true)]
    pub no_local_ip: bool,

    /// Unix domain socket or Windows named pipe of the control service
    #[arg(long, env = "PORTLITE_CONTROL_PIPE")]
    pub control_pipe: Option<String>,

    /// AF_VSOCK port of the control service on the host
    #[arg(long, env = "PORTLITE_CONTROL_VSOCK")]
    pub control_vsock: Option<String>,

    /// Seconds to wait for the control service to withdraw the forward
    #[arg(long, env = "PORTLITE_RELEASE_TIMEOUT")]
    pub release_timeout: Option<u64>,

    /// Config file (YAML or JSON). Searched for when not given
    #[arg(long, env = "PORTLITE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log control-plane interaction at debug level
    #[arg(long)]
    pub debug: bool,

    /// Print OK to stdout on success, errors to stderr
    #[arg(short = 'i', long)]
    pub interactive: bool,
}

impl Cli {
    /// Raw rule inputs as given on the command line.
    pub fn rule_spec(&self) -> RuleSpec {
        RuleSpec {
            proto: self.proto.clone(),
            host_ip: self.host_ip.clone().unwrap_or_default(),
            host_port: self.host_port,
            container_ip: self.container_ip.clone().unwrap_or_default(),
            container_port: self.container_port,
            host_path: self.host_path.clone().unwrap_or_default(),
            container_path: self.container_path.clone().unwrap_or_default(),
        }
    }

    /// Local-bind mode requested on the command line, if any.
    ///
    /// An explicit `--local-bind` wins over the legacy `--no-local-ip`.
    pub fn local_bind_override(&self) -> Option<LocalBindMode> {
        self.local_bind.or(self.no_local_ip.then_some(LocalBindMode::Never))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["portlite-expose"]).unwrap();
        assert_eq!(cli.proto, "tcp");
        assert!(cli.local_bind.is_none());
        assert!(!cli.interactive);
        assert!(cli.local_bind_override().is_none());
    }

    #[test]
    fn test_tcp_rule_spec() {
        let cli = Cli::try_parse_from([
            "portlite-expose",
            "--host-ip",
            "10.0.0.1",
            "--host-port",
            "8080",
            "--container-ip",
            "172.17.0.2",
            "--container-port",
            "80",
        ])
        .unwrap();

        let spec = cli.rule_spec();
        assert_eq!(spec.proto, "tcp");
        assert_eq!(spec.host_ip, "10.0.0.1");
        assert_eq!(spec.host_port, Some(8080));
        assert_eq!(spec.container_port, Some(80));
        assert!(spec.host_path.is_empty());
    }

    #[test]
    fn test_short_interactive() {
        let cli = Cli::try_parse_from(["portlite-expose", "-i"]).unwrap();
        assert!(cli.interactive);
    }

    #[test]
    fn test_invalid_local_bind_rejected() {
        let err = Cli::try_parse_from(["portlite-expose", "--local-bind", "sometimes"]).unwrap_err();
        assert!(err.to_string().contains("best-effort"));
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["portlite-expose", "--host-port", "70000"]).is_err());
    }

    #[test]
    fn test_explicit_local_bind_beats_no_local_ip() {
        let cli = Cli::try_parse_from([
            "portlite-expose",
            "--no-local-ip",
            "--local-bind",
            "always",
        ])
        .unwrap();
        assert_eq!(cli.local_bind_override(), Some(LocalBindMode::Always));

        let cli = Cli::try_parse_from(["portlite-expose", "--no-local-ip"]).unwrap();
        assert_eq!(cli.local_bind_override(), Some(LocalBindMode::Never));
    }
}
