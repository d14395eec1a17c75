#![allow(dead_code)]

use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command as StdCommand, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use portlite_test_utils::FakeControlService;
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_portlite-expose");

/// A control service listening on a Unix socket in a private temp dir.
///
/// The temp dir doubles as working and config directory for the binary so
/// no config file on the host leaks into a test.
pub struct FakeHost {
    pub service: FakeControlService,
    pub socket: PathBuf,
    pub dir: TempDir,
}

impl FakeHost {
    pub fn start() -> Self {
        Self::with_service(FakeControlService::new())
    }

    pub fn with_service(service: FakeControlService) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let socket = dir.path().join("control.sock");
        let listener = UnixListener::bind(&socket).expect("Failed to bind control socket");
        listener
            .set_nonblocking(true)
            .expect("Failed to make listener non-blocking");

        let served = service.clone();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build runtime");
            runtime.block_on(async move {
                let listener = tokio::net::UnixListener::from_std(listener)
                    .expect("Failed to register listener");
                while let Ok((stream, _)) = listener.accept().await {
                    let service = served.clone();
                    tokio::spawn(async move {
                        let _ = service.serve(stream).await;
                    });
                }
            });
        });

        Self {
            service,
            socket,
            dir,
        }
    }

    pub fn socket_arg(&self) -> &str {
        self.socket.to_str().expect("temp path is UTF-8")
    }

    /// A command for the binary, isolated from host config and environment.
    pub fn cmd(&self) -> Command {
        let mut std = StdCommand::new(BIN);
        isolate(&mut std, &self.dir);
        let mut cmd = Command::from_std(std);
        cmd.timeout(Duration::from_secs(30));
        cmd
    }

    /// Spawn the binary with `args`, stdout piped.
    pub fn spawn(&self, args: &[&str]) -> Running {
        let mut cmd = StdCommand::new(BIN);
        isolate(&mut cmd, &self.dir);
        let mut child = cmd
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn portlite-expose");
        let stdout = BufReader::new(child.stdout.take().expect("stdout is piped"));
        Running { child, stdout }
    }

    /// Poll until the service has seen `count` requests.
    pub fn wait_for_requests(&self, count: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if self.service.requests().len() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }
}

fn isolate(cmd: &mut StdCommand, dir: &TempDir) {
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .env_remove("PORTLITE_CONTROL_PIPE")
        .env_remove("PORTLITE_CONTROL_VSOCK")
        .env_remove("PORTLITE_LOCAL_BIND")
        .env_remove("PORTLITE_RELEASE_TIMEOUT")
        .env_remove("PORTLITE_CONFIG")
        .env_remove("RUST_LOG");
}

/// A running `portlite-expose` process.
pub struct Running {
    pub child: Child,
    pub stdout: BufReader<ChildStdout>,
}

impl Running {
    pub fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.stdout
            .read_line(&mut line)
            .expect("Failed to read stdout");
        line.trim_end().to_string()
    }

    pub fn signal(&self, signal: nix::sys::signal::Signal) {
        let pid = nix::unistd::Pid::from_raw(self.child.id() as i32);
        nix::sys::signal::kill(pid, signal).expect("Failed to signal child");
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
