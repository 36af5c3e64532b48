use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use mkver_core::config::load_config;
use mkver_core::git::GitCli;
use mkver_core::manifest::Manifest;
use mkver_core::timestamp::SystemClock;
use mkver_core::{parse_module, Composer, Generated};

mod logging;
mod version;

#[derive(Parser)]
#[command(
    name = "mkver",
    version = version::FULL,
    about = "Generate a version module from git HEAD, the manifest version and the current time"
)]
struct Cli {
    /// Module to write; the extension picks the format (.js, .cjs, .mjs, .ts, .json, .rs)
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init().context("install log subscriber")?;

    let dir = std::env::current_dir().context("resolve working directory")?;
    let config = load_config(&dir)
        .with_context(|| format!("load config under {}", dir.display()))?
        .unwrap_or_default();

    let output = config.output_path(cli.output.as_deref());
    let format = config.output_format()?;
    let manifest = match config.manifest_path(&dir) {
        Some(path) => Manifest::at(path)?,
        None => Manifest::detect(&dir)?,
    };
    debug!(manifest = %manifest.path.display(), output = %output.display(), "starting");

    let composer = Composer::new(GitCli, manifest, SystemClock);
    let generated = composer
        .generate(&dir, &output, format)
        .with_context(|| format!("generate {}", output.display()))?;

    verify_written(&generated);

    info!(
        path = %generated.path.display(),
        release = %generated.info.release,
        git_sha = %generated.info.git_sha,
        "wrote version module"
    );
    Ok(())
}

/// Reads the module back. The file is already in place, so a mismatch is
/// reported but does not fail the run.
fn verify_written(generated: &Generated) {
    let text = match std::fs::read_to_string(&generated.path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %generated.path.display(), error = %err, "cannot read back module");
            return;
        }
    };
    match parse_module(&text, generated.format) {
        Ok(parsed) if parsed == generated.info => debug!(?parsed, "verified written module"),
        Ok(parsed) => warn!(
            ?parsed,
            expected = ?generated.info,
            "written module reads back differently"
        ),
        Err(err) => warn!(error = %err, "written module does not read back"),
    }
}
