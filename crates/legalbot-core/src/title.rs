//! Session titles derived from the first user message.

/// Maximum number of characters kept from the first message.
pub const TITLE_MAX_CHARS: usize = 30;

const ELLIPSIS: &str = "...";

/// Build a session title from the first user message.
///
/// Keeps the first [`TITLE_MAX_CHARS`] characters and appends `...` only when
/// something was cut. Counts characters, not bytes, so multi-byte text never
/// splits inside a code point.
pub fn title_from_message(message: &str) -> String {
    let message = message.trim();
    match message.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &message[..cut]),
        None => message.to_string(),
    }
}
