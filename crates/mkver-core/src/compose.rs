use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::MkverError;
use crate::git::CommitResolver;
use crate::manifest::ManifestReader;
use crate::render::{render, OutputFormat};
use crate::timestamp::Clock;
use crate::version_info::{looks_like_version, VersionInfo};

/// Result of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub info: VersionInfo,
}

/// Builds [`VersionInfo`] from explicit collaborators and writes it out.
pub struct Composer<R, M, C> {
    resolver: R,
    manifest: M,
    clock: C,
}

impl<R, M, C> Composer<R, M, C>
where
    R: CommitResolver,
    M: ManifestReader,
    C: Clock,
{
    pub fn new(resolver: R, manifest: M, clock: C) -> Self {
        Self {
            resolver,
            manifest,
            clock,
        }
    }

    /// Resolves HEAD, reads the manifest, then captures the instant.
    pub fn compose(&self, dir: &Path) -> Result<VersionInfo, MkverError> {
        let git_sha = self.resolver.head_commit(dir)?;
        debug!(dir = %dir.display(), git_sha = %git_sha, "resolved HEAD");

        let version = self.manifest.read_version()?;
        debug!(manifest = %self.manifest.path().display(), version = %version, "read manifest");
        if !looks_like_version(&version) {
            warn!(
                manifest = %self.manifest.path().display(),
                version = %version,
                "version is not dot-separated integers; using it verbatim"
            );
        }

        let git_date = self.clock.now();
        Ok(VersionInfo::compose(git_sha, git_date, version))
    }

    /// Composes and writes the module. `output` is resolved against `dir`
    /// when relative; `format` defaults to the output's extension.
    pub fn generate(
        &self,
        dir: &Path,
        output: &Path,
        format: Option<OutputFormat>,
    ) -> Result<Generated, MkverError> {
        let path = if output.is_absolute() {
            output.to_path_buf()
        } else {
            dir.join(output)
        };
        let format = match format {
            Some(format) => format,
            None => OutputFormat::from_path(&path)?,
        };

        let info = self.compose(dir)?;
        let text = render(&info, format);
        write_module(&path, &text)?;
        debug!(path = %path.display(), format = %format, "wrote module");

        Ok(Generated { path, format, info })
    }
}

/// Replaces `path` with `text` through a sibling temp file, so a failed
/// write never leaves a truncated module behind. A symlinked target is
/// resolved first and the link itself is kept.
pub fn write_module(path: &Path, text: &str) -> Result<(), MkverError> {
    replace_file(path, |file| file.write_all(text.as_bytes()))
}

fn resolve_target(path: &Path) -> Result<PathBuf, MkverError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(path)
            .map_err(|err| MkverError::write_path(path, format!("resolve symlink: {err}"))),
        _ => Ok(path.to_path_buf()),
    }
}

fn replace_file<F>(path: &Path, fill: F) -> Result<(), MkverError>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let target = resolve_target(path)?;
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| MkverError::write_path(path, "output path has no file name"))?;
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(MkverError::write_path(
            path,
            format!("parent directory {} does not exist", parent.display()),
        ));
    }
    if target.is_dir() {
        return Err(MkverError::write_path(path, "output path is a directory"));
    }

    let tmp = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));
    let written = fs::File::create(&tmp).and_then(|mut file| {
        fill(&mut file)?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(MkverError::write_path(path, err.to_string()));
    }
    if let Err(err) = fs::rename(&tmp, &target) {
        let _ = fs::remove_file(&tmp);
        return Err(MkverError::write_path(path, err.to_string()));
    }
    Ok(())
}
