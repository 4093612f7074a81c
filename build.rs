// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=SCAN_ENGINE_VERSION");

    // Packagers can pin the version without a git checkout
    let version = std::env::var("SCAN_ENGINE_VERSION")
        .ok()
        .or_else(git_version)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `0.2.0-3f1c2ab` on a tag, `0.2.0-dirty-3f1c2ab` past it, the bare hash without tags
fn git_version() -> Option<String> {
    let hash = git(&["rev-parse", "--short", "HEAD"])?;
    let Some(describe) = git(&["describe", "--tags", "--match", "v*"]) else {
        return Some(hash);
    };
    let describe = describe.strip_prefix('v').unwrap_or(&describe);

    // "<tag>-<commits>-g<hash>" when HEAD is past the tag
    let mut parts = describe.rsplitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(tag)) => Some(format!("{}-dirty-{}", tag, hash)),
        _ => Some(format!("{}-{}", describe, hash)),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
