use std::env;
use std::path::PathBuf;

use mkver_core::git::{CommitResolver, GitCli};
use mkver_core::manifest::{Manifest, ManifestKind, ManifestReader, CARGO_TOML};
use mkver_core::timestamp::{Clock, SystemClock};
use mkver_core::VersionInfo;

fn main() {
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let workspace_dir = crate_dir.join("..").join("..");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    for watched in [
        workspace_dir.join(CARGO_TOML),
        workspace_dir.join(".git").join("HEAD"),
        workspace_dir.join(".git").join("index"),
    ] {
        // A missing path would rerun the script on every build.
        if watched.exists() {
            println!("cargo:rerun-if-changed={}", watched.display());
        }
    }

    let version = Manifest::new(ManifestKind::CargoToml, crate_dir.join(CARGO_TOML))
        .read_version()
        .or_else(|_| env::var("CARGO_PKG_VERSION"))
        .unwrap_or_default();
    // No commit when built outside a checkout, e.g. from a published tarball.
    let git_sha = GitCli
        .head_commit(&crate_dir)
        .unwrap_or_else(|_| "unknown".to_string());
    let info = VersionInfo::compose(git_sha, SystemClock.now(), version);

    println!("cargo:rustc-env=MKVER_BUILD_RELEASE={}", info.release);
    println!("cargo:rustc-env=MKVER_BUILD_SHA={}", info.git_sha);
}
