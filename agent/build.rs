//! Stamps the hookdeploy binary with the commit and time it was built from.
//! Both values surface through `--version` and `GET /version`.

use std::process::Command;

use chrono::Utc;

const UNKNOWN: &str = "unknown";

fn main() {
    let commit = git_short_hash().unwrap_or_else(|| UNKNOWN.to_string());
    let built_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    println!("cargo:rustc-env=GIT_HASH={}", commit);
    println!("cargo:rustc-env=BUILD_TIME={}", built_at);

    // The package sits one level below the repository root.
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Abbreviated HEAD commit, or None outside a git checkout
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}
