use crate::net::sha1_hex;

const MAX_DIR_NAME_CHARS: usize = 64;

/// Folder name for an instance: letters, digits, spaces, `-` and `_` only,
/// trimmed. May be empty.
pub fn sanitize_dir_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let trimmed = kept.trim();
    match trimmed.char_indices().nth(MAX_DIR_NAME_CHARS) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Sanitised folder name that `is_taken` does not reject. Empty or taken
/// names get a stable suffix derived from the full display name.
pub fn unique_dir_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let sanitized = sanitize_dir_name(name);
    if !sanitized.is_empty() && !is_taken(&sanitized) {
        return sanitized;
    }

    let stem = if sanitized.is_empty() { "instance" } else { sanitized.as_str() };
    let hash = sha1_hex(name.as_bytes());
    let candidate = format!("{}-{}", stem, &hash[..8]);
    if !is_taken(&candidate) {
        return candidate;
    }

    // Only reachable when the hashed name itself is occupied.
    (2u32..)
        .map(|n| format!("{}-{}-{}", stem, &hash[..8], n))
        .find(|c| !is_taken(c))
        .unwrap_or(candidate)
}
