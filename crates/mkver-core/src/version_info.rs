use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::timestamp::ymdhms;

/// What a generated module exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub git_sha: String,
    pub git_date: DateTime<Utc>,
    pub version: String,
    pub release: String,
}

impl VersionInfo {
    pub fn compose(
        git_sha: impl Into<String>,
        git_date: DateTime<Utc>,
        version: impl Into<String>,
    ) -> Self {
        let version = version.into();
        let release = release_string(&version, &git_date);
        Self {
            git_sha: git_sha.into(),
            git_date,
            version,
            release,
        }
    }
}

/// `<version>+<ymdhms(at)>`.
pub fn release_string(version: &str, at: &DateTime<Utc>) -> String {
    format!("{}+{}", version, ymdhms(at))
}

fn version_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^\d+(\.\d+)*(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$").expect("regex")
    })
}

/// Dot-separated integers, optionally with semver prerelease/build suffixes.
pub fn looks_like_version(version: &str) -> bool {
    version_shape().is_match(version)
}
