//!
//! Small formatting helpers shared across logs and error rendering.
//!

///
/// Ellipsize a string in the middle when it exceeds the `threshold`.
///
/// Produces: first `head` chars, a Unicode ellipsis '…', then last `tail`
/// chars. Returns the original string when it fits, or when shortening
/// would not actually shorten it.
///
#[must_use]
pub fn ellipsize_middle(s: &str, threshold: usize, head: usize, tail: usize) -> String {
    let len = s.chars().count();
    if len <= threshold || head + 1 + tail >= len {
        return s.to_string();
    }

    let prefix: String = s.chars().take(head).collect();
    let skip = len.saturating_sub(tail);
    let suffix: String = s.chars().skip(skip).collect();

    format!("{prefix}…{suffix}")
}

///
/// TESTS
///
