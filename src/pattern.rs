//! Glob pattern helpers for the point-lookup shortcut.
//!
//! A match pattern without any unescaped glob metacharacter names exactly one
//! field, so `get_fields` can answer it with a direct lookup instead of a
//! scan.

const GLOB_CHARS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// True when the pattern contains at least one unescaped glob metacharacter.
pub fn is_glob(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if GLOB_CHARS.contains(&c) {
            return true;
        }
    }
    false
}

/// Strips escape backslashes so a literal pattern can be used as a field
/// name. A trailing lone backslash is kept as-is.
pub fn unescape(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
