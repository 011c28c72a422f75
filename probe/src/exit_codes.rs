//! Stable exit codes for probe CLI commands.

/// Command succeeded (a write may still have printed an advisory).
pub const OK: i32 = 0;
/// Rejected before reaching the engine: bad path, missing dictionary, bad config.
pub const INVALID: i32 = 1;
/// The engine failed the call or rejected the dictionary.
pub const ENGINE: i32 = 2;
/// A write ran but the engine marked it invalid.
pub const VIOLATION: i32 = 3;

/// Exit code for a command whose reply carried a notice of `kind`.
pub fn for_notice(kind: crate::session::NoticeKind) -> i32 {
    use crate::session::NoticeKind;
    match kind {
        NoticeKind::Validation => INVALID,
        NoticeKind::Engine => ENGINE,
        NoticeKind::Violation => VIOLATION,
        NoticeKind::Advisory => OK,
    }
}
