//! Stripping of markdown code fences around generator replies
//!
//! Generators wrap JSON in fenced blocks even when told not to. Handles:
//! - ```` ```json\n{...}\n``` ````
//! - ```` ```\n{...}\n``` ````
//! - an opening fence whose closing fence was cut off

const FENCE: &str = "```";

/// Remove a surrounding code fence, returning the trimmed payload
///
/// The *last* closing fence is used so that fenced snippets embedded in the
/// payload do not truncate it. Nested wrappers are peeled until none is
/// left, which makes the function idempotent.
///
/// # Examples
///
/// ```
/// use reframe_gatekeeper::sanitize;
///
/// assert_eq!(sanitize("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(sanitize("  {\"a\": 1}  "), "{\"a\": 1}");
/// ```
pub fn sanitize(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed.to_string();
    }

    // A fence with nothing after it on a new line is left alone
    let Some(first_newline) = trimmed.find('\n') else {
        return trimmed.to_string();
    };
    let body_start = first_newline + 1;

    match trimmed.rfind(FENCE) {
        Some(last) if last >= body_start => trimmed[body_start..last].trim().to_string(),
        // Closing fence missing: keep everything after the opening line
        _ => trimmed[body_start..].trim().to_string(),
    }
}
