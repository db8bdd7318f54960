//! Filename helpers shared by the resolution loop and the rename prompts.

use std::path::Path;

/// Next candidate name for a colliding file, appending " (n)" before the
/// extension and incrementing an existing counter.
///
/// Examples:
/// - "movie.mkv" -> "movie (2).mkv"
/// - "movie (2).mkv" -> "movie (3).mkv"
/// - ".env" -> ".env (2)"
/// - "archive.tar.gz" -> "archive.tar (2).gz"
pub fn next_candidate_name(name: &str) -> String {
    let base = Path::new(name);
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = base.extension().map(|e| e.to_string_lossy().into_owned());

    let (prefix, n) = match split_counter_suffix(&stem) {
        Some((prefix, n)) => (prefix.to_string(), n.saturating_add(1)),
        None => (stem, 2),
    };

    match ext {
        Some(e) => format!("{prefix} ({n}).{e}"),
        None => format!("{prefix} ({n})"),
    }
}

/// Split a trailing " (n)" counter off a file stem, if present.
fn split_counter_suffix(stem: &str) -> Option<(&str, u32)> {
    let rest = stem.strip_suffix(')')?;
    let open = rest.rfind(" (")?;
    let digits = &rest[open + 2..];
    if digits.is_empty() {
        return None;
    }
    let n = digits.parse::<u32>().ok()?;
    Some((&rest[..open], n))
}
