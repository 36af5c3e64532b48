use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::error::MkverError;
use crate::version_info::VersionInfo;

const BANNER: &str = "// Generated by mkver. Do not edit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    CommonJs,
    EsModule,
    TypeScript,
    Json,
    Rust,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, MkverError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("js") | Some("cjs") => Ok(Self::CommonJs),
            Some("mjs") => Ok(Self::EsModule),
            Some("ts") => Ok(Self::TypeScript),
            Some("json") => Ok(Self::Json),
            Some("rs") => Ok(Self::Rust),
            _ => Err(MkverError::UnsupportedOutput {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CommonJs => "cjs",
            Self::EsModule => "esm",
            Self::TypeScript => "ts",
            Self::Json => "json",
            Self::Rust => "rust",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cjs" | "js" | "commonjs" => Ok(Self::CommonJs),
            "esm" | "mjs" => Ok(Self::EsModule),
            "ts" | "typescript" => Ok(Self::TypeScript),
            "json" => Ok(Self::Json),
            "rust" | "rs" => Ok(Self::Rust),
            other => Err(format!(
                "unknown output format {other:?} (expected cjs, esm, ts, json or rust)"
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonModule {
    git_sha: String,
    git_date: String,
    version: String,
    release: String,
}

fn rfc3339(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

pub fn render(info: &VersionInfo, format: OutputFormat) -> String {
    match format {
        OutputFormat::CommonJs => format!(
            "{BANNER}\n\"use strict\";\n\
exports.gitSha = {};\n\
exports.gitDate = new Date({});\n\
exports.version = {};\n\
exports.release = {};\n",
            js_string(&info.git_sha),
            info.git_date.timestamp_millis(),
            js_string(&info.version),
            js_string(&info.release),
        ),
        OutputFormat::EsModule | OutputFormat::TypeScript => format!(
            "{BANNER}\n\
export const gitSha = {};\n\
export const gitDate = new Date({});\n\
export const version = {};\n\
export const release = {};\n",
            js_string(&info.git_sha),
            info.git_date.timestamp_millis(),
            js_string(&info.version),
            js_string(&info.release),
        ),
        OutputFormat::Json => {
            let module = serde_json::json!({
                "gitSha": info.git_sha,
                "gitDate": rfc3339(&info.git_date),
                "version": info.version,
                "release": info.release,
            });
            format!("{module:#}\n")
        }
        OutputFormat::Rust => format!(
            "{BANNER}\n\
pub const GIT_SHA: &str = {:?};\n\
pub const GIT_DATE: &str = {:?};\n\
pub const GIT_DATE_MILLIS: i64 = {};\n\
pub const VERSION: &str = {:?};\n\
pub const RELEASE: &str = {:?};\n",
            info.git_sha,
            rfc3339(&info.git_date),
            info.git_date.timestamp_millis(),
            info.version,
            info.release,
        ),
    }
}

fn js_binding_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:exports\.|export\s+const\s+)(\w+)\s*=\s*(.+?)\s*;?\s*$")
            .expect("regex")
    })
}

fn rust_const_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*pub\s+const\s+(\w+)\s*:\s*[^=]+=\s*(.+?)\s*;\s*$").expect("regex")
    })
}

fn js_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^new\s+Date\((-?\d+)\)$").expect("regex"))
}

fn unreadable(message: impl Into<String>) -> MkverError {
    MkverError::GeneratedUnreadable(message.into())
}

fn bindings<'a>(text: &'a str, re: &Regex) -> HashMap<&'a str, &'a str> {
    re.captures_iter(text)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect()
}

fn field<'a>(map: &HashMap<&str, &'a str>, name: &str) -> Result<&'a str, MkverError> {
    map.get(name)
        .copied()
        .ok_or_else(|| unreadable(format!("missing {name}")))
}

fn string_literal(name: &str, literal: &str) -> Result<String, MkverError> {
    serde_json::from_str::<String>(literal)
        .map_err(|err| unreadable(format!("{name} is not a string literal: {err}")))
}

/// Reads a Rust string literal as written by `{:?}`.
fn rust_string_literal(name: &str, literal: &str) -> Result<String, MkverError> {
    let bad = |what: &str| unreadable(format!("{name} is not a string literal: {what}"));
    let inner = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| bad("missing quotes"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Err(bad("unescaped quote")),
            '\\' => {}
            other => {
                out.push(other);
                continue;
            }
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                u8::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|byte| byte.is_ascii())
                    .map(char::from)
                    .ok_or_else(|| bad("malformed \\x escape"))?
            }
            Some('u') => {
                if chars.next() != Some('{') {
                    return Err(bad("malformed \\u escape"));
                }
                let mut hex = String::new();
                let mut closed = false;
                for digit in chars.by_ref() {
                    if digit == '}' {
                        closed = true;
                        break;
                    }
                    hex.push(digit);
                }
                closed
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or_else(|| bad("malformed \\u escape"))?
            }
            _ => return Err(bad("unknown escape")),
        };
        out.push(escaped);
    }
    Ok(out)
}

fn millis(name: &str, value: i64) -> Result<DateTime<Utc>, MkverError> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| unreadable(format!("{name} out of range: {value}")))
}

fn parse_rfc3339(name: &str, value: &str) -> Result<DateTime<Utc>, MkverError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| unreadable(format!("{name} is not an RFC 3339 timestamp: {err}")))
}

/// Reads a generated module back without executing it.
pub fn parse_module(text: &str, format: OutputFormat) -> Result<VersionInfo, MkverError> {
    match format {
        OutputFormat::CommonJs | OutputFormat::EsModule | OutputFormat::TypeScript => {
            let map = bindings(text, js_binding_re());
            let date = field(&map, "gitDate")?;
            let ms = js_date_re()
                .captures(date)
                .and_then(|caps| caps.get(1))
                .and_then(|value| value.as_str().parse::<i64>().ok())
                .ok_or_else(|| unreadable(format!("gitDate is not new Date(<ms>): {date}")))?;
            Ok(VersionInfo {
                git_sha: string_literal("gitSha", field(&map, "gitSha")?)?,
                git_date: millis("gitDate", ms)?,
                version: string_literal("version", field(&map, "version")?)?,
                release: string_literal("release", field(&map, "release")?)?,
            })
        }
        OutputFormat::Json => {
            let module: JsonModule =
                serde_json::from_str(text).map_err(|err| unreadable(err.to_string()))?;
            Ok(VersionInfo {
                git_sha: module.git_sha,
                git_date: parse_rfc3339("gitDate", &module.git_date)?,
                version: module.version,
                release: module.release,
            })
        }
        OutputFormat::Rust => {
            let map = bindings(text, rust_const_re());
            let date = parse_rfc3339(
                "GIT_DATE",
                &rust_string_literal("GIT_DATE", field(&map, "GIT_DATE")?)?,
            )?;
            let ms = field(&map, "GIT_DATE_MILLIS")?
                .parse::<i64>()
                .map_err(|err| unreadable(format!("GIT_DATE_MILLIS: {err}")))?;
            if millis("GIT_DATE_MILLIS", ms)? != date {
                return Err(unreadable("GIT_DATE and GIT_DATE_MILLIS disagree"));
            }
            Ok(VersionInfo {
                git_sha: rust_string_literal("GIT_SHA", field(&map, "GIT_SHA")?)?,
                git_date: date,
                version: rust_string_literal("VERSION", field(&map, "VERSION")?)?,
                release: rust_string_literal("RELEASE", field(&map, "RELEASE")?)?,
            })
        }
    }
}
