//! Constants shared between the control client and control services.

/// Transport constants
pub mod transport {
    /// Well-known CID of the host, as seen from inside a guest.
    pub const VSOCK_HOST_CID: u32 = 2;

    /// URI scheme for pipe-style targets (Unix socket or Windows named pipe).
    pub const PIPE_SCHEME: &str = "pipe://";

    /// URI scheme for AF_VSOCK targets.
    pub const VSOCK_SCHEME: &str = "vsock://";
}

/// Lifecycle constants
pub mod lifecycle {
    /// Upper bound on the teardown `unexpose` call, in seconds.
    pub const DEFAULT_RELEASE_TIMEOUT_SECS: u64 = 5;

    /// Line printed on stdout in interactive mode once the port is exposed.
    pub const INTERACTIVE_OK: &str = "OK";
}

/// Configuration file lookup
pub mod config {
    /// Base name of the configuration file (without extension).
    pub const FILE_STEM: &str = "portlite-expose";

    /// Extensions tried, in order, in every search directory.
    pub const FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

    /// System-wide configuration directory.
    pub const SYSTEM_DIR: &str = "/etc/portlite";

    /// Sub-directory of the user configuration directory.
    pub const USER_SUBDIR: &str = "portlite";
}
