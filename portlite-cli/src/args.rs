//! Command-line compatibility with the single-dash flag style.
//!
//! Existing scripts call the tool as `-host-port 8080 -no-local-ip`. clap
//! only understands long flags with two dashes, so known long names written
//! with one dash are rewritten before parsing.

use std::ffi::OsString;

/// Long flags accepted with a single dash.
const LONG_FLAGS: &[&str] = &[
    "proto",
    "host-ip",
    "host-port",
    "container-ip",
    "container-port",
    "host-path",
    "container-path",
    "local-bind",
    "no-local-ip",
    "control-pipe",
    "control-vsock",
    "release-timeout",
    "config",
    "debug",
    "interactive",
];

/// Rewrite `-name` / `-name=value` to `--name` / `--name=value` for known
/// long flags. The program name, short flags, values and everything after
/// `--` pass through untouched.
pub fn normalize<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut out: Vec<OsString> = args.next().into_iter().collect();

    for arg in args.by_ref() {
        if arg == "--" {
            out.push(arg);
            break;
        }
        match arg.to_str().and_then(rewrite) {
            Some(rewritten) => out.push(rewritten.into()),
            None => out.push(arg),
        }
    }
    out.extend(args);
    out
}

fn rewrite(arg: &str) -> Option<String> {
    let rest = arg.strip_prefix('-')?;
    if rest.starts_with('-') {
        return None;
    }
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    LONG_FLAGS.contains(&name).then(|| format!("-{}", arg))
}
