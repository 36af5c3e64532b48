use std::path::Path;
use std::process::Command;

use crate::error::MkverError;

/// Resolves the commit identifier of HEAD for a working tree.
pub trait CommitResolver {
    fn head_commit(&self, dir: &Path) -> Result<String, MkverError>;
}

/// Asks the `git` executable on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl CommitResolver for GitCli {
    fn head_commit(&self, dir: &Path) -> Result<String, MkverError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["rev-parse", "-q", "--verify", "HEAD"])
            .output()
            .map_err(|err| MkverError::no_commit(dir, format!("run git: {err}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                "git rev-parse HEAD failed (no commits yet?)".to_string()
            } else {
                stderr
            };
            return Err(MkverError::no_commit(dir, reason));
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        validate_commit_id(dir, sha)
    }
}

/// Accepts full SHA-1 (40) or SHA-256 (64) object names.
pub fn validate_commit_id(dir: &Path, sha: String) -> Result<String, MkverError> {
    let well_formed =
        matches!(sha.len(), 40 | 64) && sha.chars().all(|c| c.is_ascii_hexdigit());
    if !well_formed {
        return Err(MkverError::no_commit(
            dir,
            format!("unexpected commit identifier {sha:?}"),
        ));
    }
    Ok(sha.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn accepts_sha1_and_sha256() {
        let dir = Path::new(".");
        let sha1 = "A1B2C3D4E5F60718293a4b5c6d7e8f9012345678".to_string();
        assert_eq!(
            validate_commit_id(dir, sha1).unwrap(),
            "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678"
        );
        let sha256 = "0".repeat(64);
        assert!(validate_commit_id(dir, sha256).is_ok());
    }

    #[test]
    fn rejects_abbreviated_or_non_hex() {
        let dir = Path::new(".");
        assert!(validate_commit_id(dir, "a1b2c3d".to_string()).is_err());
        assert!(validate_commit_id(dir, "g".repeat(40)).is_err());
        assert!(validate_commit_id(dir, String::new()).is_err());
    }

    #[test]
    fn plain_directory_has_no_commit() {
        let temp = TempDir::new().expect("tempdir");
        let err = GitCli.head_commit(temp.path()).unwrap_err();
        assert!(matches!(err, MkverError::NoCommitIdentifier { .. }), "{err}");
    }
}
