//! Filter applied to every message shown to the user.

use std::sync::LazyLock;

use regex::Regex;

/// Anything outside printable ASCII, the common CJK, kana, Hangul and
/// full-width ranges, or tab/newline/carriage return.
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[^\x20-\x7E\x{4E00}-\x{9FFF}\x{3040}-\x{30FF}\x{AC00}-\x{D7AF}\x{FF01}-\x{FF60}\n\r\t]",
    )
    .unwrap()
});

/// Strip characters that should never reach a display widget.
pub fn sanitize_message(message: &str) -> String {
    DISALLOWED.replace_all(message, "").into_owned()
}
