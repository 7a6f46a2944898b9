//! Embeds `RELINK_VERSION` for `relink --version`.
//!
//! A tagged checkout reports the tag; any other checkout reports the
//! crate version with the short commit as build metadata
//! (`0.1.0+3f2a9c1`, `0.1.0+3f2a9c1.dirty`). Outside git the crate
//! version is used as is. `RELINK_BUILD_VERSION` overrides all of it.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=RELINK_BUILD_VERSION");

    let package = env!("CARGO_PKG_VERSION");
    let version = std::env::var("RELINK_BUILD_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(exact_tag)
        .or_else(|| commit().map(|commit| format!("{}+{}", package, commit)))
        .unwrap_or_else(|| package.to_string());

    println!("cargo:rustc-env=RELINK_VERSION={}", version);
}

fn exact_tag() -> Option<String> {
    let tag = git(&["describe", "--tags", "--exact-match"])?;
    Some(tag.trim_start_matches('v').to_string())
}

fn commit() -> Option<String> {
    let sha = git(&["rev-parse", "--short", "HEAD"])?;
    let dirty = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=no"])
        .output()
        .is_ok_and(|out| out.status.success() && !out.stdout.is_empty());
    Some(if dirty { format!("{}.dirty", sha) } else { sha })
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!text.is_empty()).then_some(text)
}
