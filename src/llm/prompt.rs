//! Prompt construction: diff interpolation into the configured template.

use std::borrow::Cow;

use tracing::warn;

/// Placeholder replaced by the diff in prompt templates.
pub const DIFF_PLACEHOLDER: &str = "{diff}";

/// Maximum characters of diff text sent to the model.
pub const MAX_DIFF_LENGTH: usize = 120_000;

const TRUNCATION_NOTE: &str = "\n... (diff truncated)";

/// Substitute `diff` into `template`.
///
/// Every `{diff}` placeholder is replaced; a template without one gets the
/// diff appended after a blank line.
pub fn interpolate(template: &str, diff: &str) -> String {
    if template.contains(DIFF_PLACEHOLDER) {
        template.split(DIFF_PLACEHOLDER).collect::<Vec<_>>().join(diff)
    } else {
        format!("{template}\n\n{diff}")
    }
}

/// Cut an oversized diff at the last full line that fits.
pub fn truncate_diff(diff: &str, max_len: usize) -> Cow<'_, str> {
    if diff.len() <= max_len {
        return Cow::Borrowed(diff);
    }

    let mut cut = max_len;
    while !diff.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = &diff[..cut];
    let head = head.rfind('\n').map_or(head, |idx| &head[..idx]);

    warn!(
        "Diff is {} bytes; sending the first {} to the model",
        diff.len(),
        head.len()
    );
    Cow::Owned(format!("{head}{TRUNCATION_NOTE}"))
}

/// Build the user message for `diff`.
pub fn build_user_prompt(template: &str, diff: &str) -> String {
    interpolate(template, &truncate_diff(diff, MAX_DIFF_LENGTH))
}
