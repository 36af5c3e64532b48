/// The tool's own release, stamped by `build.rs` with mkver's composer:
/// `<version>+<ymdhms> (<commit>)`.
pub const FULL: &str = concat!(
    env!("MKVER_BUILD_RELEASE"),
    " (",
    env!("MKVER_BUILD_SHA"),
    ")"
);
