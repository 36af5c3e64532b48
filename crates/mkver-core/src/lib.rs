//! Generates version-information modules from git HEAD, a manifest version
//! and the generation instant.

pub mod compose;
pub mod config;
pub mod error;
pub mod git;
pub mod manifest;
pub mod render;
pub mod timestamp;
pub mod version_info;

pub use compose::{Composer, Generated};
pub use error::MkverError;
pub use render::{parse_module, render, OutputFormat};
pub use timestamp::ymdhms;
pub use version_info::VersionInfo;
