use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MkverError;

pub const PACKAGE_JSON: &str = "package.json";
pub const CARGO_TOML: &str = "Cargo.toml";

/// Reads the project version from a manifest.
pub trait ManifestReader {
    /// Path the version is read from, for diagnostics.
    fn path(&self) -> &Path;
    fn read_version(&self) -> Result<String, MkverError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    PackageJson,
    CargoToml,
}

impl ManifestKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(PACKAGE_JSON) => Some(Self::PackageJson),
            Some(CARGO_TOML) => Some(Self::CargoToml),
            _ => None,
        }
    }
}

/// A manifest located on disk. `package.json` wins over `Cargo.toml` when
/// both sit in the same directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub kind: ManifestKind,
    pub path: PathBuf,
}

impl Manifest {
    pub fn new(kind: ManifestKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Builds a manifest for an explicit path; the kind comes from the file
    /// name.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self, MkverError> {
        let path = path.into();
        let kind = ManifestKind::from_path(&path).ok_or_else(|| {
            MkverError::manifest(&path, "expected a package.json or Cargo.toml file")
        })?;
        Ok(Self::new(kind, path))
    }

    pub fn detect(dir: &Path) -> Result<Self, MkverError> {
        for (name, kind) in [
            (PACKAGE_JSON, ManifestKind::PackageJson),
            (CARGO_TOML, ManifestKind::CargoToml),
        ] {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(Self::new(kind, candidate));
            }
        }
        Err(MkverError::manifest(
            &dir.join(PACKAGE_JSON),
            "no package.json or Cargo.toml found",
        ))
    }
}

impl ManifestReader for Manifest {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_version(&self) -> Result<String, MkverError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|err| MkverError::manifest(&self.path, err.to_string()))?;
        let version = match self.kind {
            ManifestKind::PackageJson => package_json_version(&self.path, &raw)?,
            ManifestKind::CargoToml => cargo_toml_version(&self.path, &raw)?,
        };
        non_blank(&self.path, version)
    }
}

fn non_blank(path: &Path, version: String) -> Result<String, MkverError> {
    if version.trim().is_empty() {
        return Err(MkverError::manifest(path, "version field is blank"));
    }
    Ok(version)
}

fn package_json_version(path: &Path, raw: &str) -> Result<String, MkverError> {
    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|err| MkverError::manifest(path, format!("parse: {err}")))?;
    match parsed.get("version") {
        Some(serde_json::Value::String(version)) => Ok(version.clone()),
        Some(_) => Err(MkverError::manifest(path, "version field is not a string")),
        None => Err(MkverError::manifest(path, "missing version field")),
    }
}

fn cargo_toml_version(path: &Path, raw: &str) -> Result<String, MkverError> {
    let parsed: toml::Table = raw
        .parse()
        .map_err(|err| MkverError::manifest(path, format!("parse: {err}")))?;

    match parsed.get("package").and_then(|package| package.get("version")) {
        Some(toml::Value::String(version)) => return Ok(version.clone()),
        Some(toml::Value::Table(table)) if inherits_workspace(table) => {
            if let Some(version) = workspace_version(&parsed) {
                return Ok(version);
            }
            return inherited_version(path);
        }
        Some(_) => {
            return Err(MkverError::manifest(
                path,
                "package.version is neither a string nor { workspace = true }",
            ))
        }
        None => {}
    }

    // Virtual workspace manifests only carry workspace.package.version.
    workspace_version(&parsed)
        .ok_or_else(|| MkverError::manifest(path, "missing package.version field"))
}

fn inherits_workspace(table: &toml::Table) -> bool {
    matches!(table.get("workspace"), Some(toml::Value::Boolean(true)))
}

fn workspace_version(parsed: &toml::Table) -> Option<String> {
    parsed
        .get("workspace")?
        .get("package")?
        .get("version")?
        .as_str()
        .map(str::to_string)
}

fn inherited_version(member: &Path) -> Result<String, MkverError> {
    let start = member.parent().and_then(Path::parent);
    for dir in start.into_iter().flat_map(Path::ancestors) {
        let candidate = dir.join(CARGO_TOML);
        if !candidate.is_file() {
            continue;
        }
        let raw = fs::read_to_string(&candidate)
            .map_err(|err| MkverError::manifest(&candidate, err.to_string()))?;
        let parsed: toml::Table = raw
            .parse()
            .map_err(|err| MkverError::manifest(&candidate, format!("parse: {err}")))?;
        if parsed.contains_key("workspace") {
            return workspace_version(&parsed).ok_or_else(|| {
                MkverError::manifest(&candidate, "missing workspace.package.version field")
            });
        }
    }
    Err(MkverError::manifest(
        member,
        "version.workspace = true but no workspace root found",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn read(dir: &Path) -> Result<String, MkverError> {
        Manifest::detect(dir)?.read_version()
    }

    #[test]
    fn reads_package_json_version() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join(PACKAGE_JSON),
            r#"{"name":"demo","version":"7.3.11"}"#,
        )
        .expect("write");
        assert_eq!(read(temp.path()).unwrap(), "7.3.11");
    }

    #[test]
    fn package_json_preferred_over_cargo_toml() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join(PACKAGE_JSON), r#"{"version":"1.0.0"}"#).expect("write");
        fs::write(
            temp.path().join(CARGO_TOML),
            "[package]\nname = \"demo\"\nversion = \"2.0.0\"\n",
        )
        .expect("write");
        let manifest = Manifest::detect(temp.path()).unwrap();
        assert_eq!(manifest.kind, ManifestKind::PackageJson);
        assert_eq!(manifest.read_version().unwrap(), "1.0.0");
    }

    #[test]
    fn reads_cargo_package_version() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join(CARGO_TOML),
            "[package]\nname = \"demo\"\nversion = \"0.9.1\"\n",
        )
        .expect("write");
        assert_eq!(read(temp.path()).unwrap(), "0.9.1");
    }

    #[test]
    fn resolves_workspace_inherited_version() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join(CARGO_TOML),
            "[workspace]\nmembers = [\"crates/app\"]\n\n[workspace.package]\nversion = \"3.1.4\"\n",
        )
        .expect("write root");
        let member = temp.path().join("crates").join("app");
        fs::create_dir_all(&member).expect("member dir");
        fs::write(
            member.join(CARGO_TOML),
            "[package]\nname = \"app\"\nversion.workspace = true\n",
        )
        .expect("write member");
        assert_eq!(read(&member).unwrap(), "3.1.4");
        assert_eq!(read(temp.path()).unwrap(), "3.1.4");
    }

    #[test]
    fn missing_manifest_is_unreadable() {
        let temp = TempDir::new().expect("tempdir");
        let err = read(temp.path()).unwrap_err();
        assert!(matches!(err, MkverError::ManifestUnreadable { .. }), "{err}");
    }

    #[test]
    fn malformed_or_versionless_manifests_are_unreadable() {
        for body in ["{not json", r#"{"name":"demo"}"#, r#"{"version":7}"#, r#"{"version":"  "}"#] {
            let temp = TempDir::new().expect("tempdir");
            fs::write(temp.path().join(PACKAGE_JSON), body).expect("write");
            let err = read(temp.path()).unwrap_err();
            assert!(
                matches!(err, MkverError::ManifestUnreadable { .. }),
                "{body}: {err}"
            );
        }
    }

    fn cargo_error(body: &str) -> MkverError {
        let temp = TempDir::new().expect("tempdir");
        let member = temp.path().join("app");
        fs::create_dir_all(&member).expect("member dir");
        fs::write(member.join(CARGO_TOML), body).expect("write");
        read(&member).unwrap_err()
    }

    #[test]
    fn non_string_cargo_version_is_unreadable() {
        let err = cargo_error("[package]\nname = \"demo\"\nversion = 3\n");
        assert!(matches!(err, MkverError::ManifestUnreadable { .. }), "{err}");
        assert!(err.to_string().contains("neither a string"), "{err}");
    }

    #[test]
    fn inherited_version_without_workspace_root_is_unreadable() {
        let err = cargo_error("[package]\nname = \"app\"\nversion.workspace = true\n");
        assert!(matches!(err, MkverError::ManifestUnreadable { .. }), "{err}");
        assert!(err.to_string().contains("no workspace root"), "{err}");
    }

    #[test]
    fn malformed_cargo_toml_is_unreadable() {
        let err = cargo_error("[package\nname = \"demo\"\n");
        assert!(matches!(err, MkverError::ManifestUnreadable { .. }), "{err}");
        assert!(err.to_string().contains("parse"), "{err}");
    }

    #[test]
    fn workspace_root_without_package_version_is_unreadable() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join(CARGO_TOML),
            "[workspace]\nmembers = [\"app\"]\n",
        )
        .expect("write root");
        let member = temp.path().join("app");
        fs::create_dir_all(&member).expect("member dir");
        fs::write(
            member.join(CARGO_TOML),
            "[package]\nname = \"app\"\nversion.workspace = true\n",
        )
        .expect("write member");
        let err = read(&member).unwrap_err();
        assert!(
            err.to_string().contains("missing workspace.package.version"),
            "{err}"
        );
    }

    #[test]
    fn explicit_path_must_be_known_manifest() {
        assert!(Manifest::at("pyproject.toml").is_err());
        let manifest = Manifest::at("sub/Cargo.toml").unwrap();
        assert_eq!(manifest.kind, ManifestKind::CargoToml);
    }
}
