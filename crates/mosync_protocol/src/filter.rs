//! Filters for raw values serialized by the transport.
//!
//! Some API generations return attribute values still wrapped in their
//! JSON text form: a single string as `"x"`, a list as `["x","y"]`. These
//! filters trim that decoration without parsing the value.

/// Removes one pair of surrounding double quotes, if both are present.
pub fn strip_quotes(word: &str) -> &str {
    word.strip_prefix('"')
        .and_then(|w| w.strip_suffix('"'))
        .unwrap_or(word)
}

/// Removes one pair of surrounding square brackets, if both are present.
pub fn strip_square_brackets(word: &str) -> &str {
    word.strip_prefix('[')
        .and_then(|w| w.strip_suffix(']'))
        .unwrap_or(word)
}

/// Normalizes a raw serialized value into the plain string stored locally.
///
/// `["a","b"]` becomes `a,b`, `"x"` becomes `x`, and undecorated values
/// such as `42` pass through unchanged.
pub fn normalize_raw(raw: &str) -> String {
    let inner = strip_square_brackets(raw);
    let unquoted = strip_quotes(inner);
    if unquoted.len() == inner.len() {
        return inner.to_string();
    }
    unquoted.replace("\",\"", ",")
}
