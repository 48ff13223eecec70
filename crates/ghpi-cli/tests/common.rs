#![allow(dead_code)]

use std::panic;
use std::path::Path;

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use httptest::Server;
use serde_json::Value;

/// Variables that would leak the developer's own setup into a test run.
const RELAY_ENV: &[&str] = &[
    "GITHUB_PAT",
    "GITHUB_REPO",
    "GITHUB_API_URL",
    "DEVPI_SERVER",
    "DEVPI_USER",
    "DEVPI_PASSWORD",
    "DEVPI_INDEX",
    "DEVPI_USE_PROXY",
    "NO_COLOR",
];

/// A `ghpi` command running in `cwd` with a scrubbed relay environment.
pub fn ghpi(cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("ghpi");
    cmd.current_dir(cwd);
    for key in RELAY_ENV {
        cmd.env_remove(key);
    }
    cmd.env("GHPI_PROGRESS", "0").env("GHPI_KEEP_PROXIES", "0");
    cmd
}

pub fn parse_json(assert: &Assert) -> Value {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&stdout).unwrap_or_else(|err| panic!("invalid json {err}: {stdout}"))
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

pub fn mock_server(test: &str) -> Option<Server> {
    if let Ok(server) = panic::catch_unwind(Server::run) {
        Some(server)
    } else {
        eprintln!("skipping {test} (httptest server unavailable)");
        None
    }
}
