//! Scrubbing of engine diagnostics before they are persisted or returned to clients.

use std::path::Path;

/// Longest error or trace kept on a job record.
pub const MAX_MESSAGE_LEN: usize = 4000;

const SCRUBBED_PATH: &str = "<tmp>";

/// Replace every occurrence of `paths` (scratch directories, temp files) with a placeholder
/// and cap the result at [`MAX_MESSAGE_LEN`] characters.
pub fn sanitize_message(message: &str, paths: &[&Path]) -> String {
    let mut cleaned = message.to_string();
    for path in paths {
        let text = path.to_string_lossy();
        if !text.is_empty() {
            cleaned = cleaned.replace(text.as_ref(), SCRUBBED_PATH);
        }
    }

    // The system temp dir itself, for paths the caller did not know about.
    let tmp = std::env::temp_dir();
    let tmp = tmp.to_string_lossy();
    let tmp = tmp.trim_end_matches('/');
    if tmp.len() > 1 {
        cleaned = cleaned.replace(tmp, SCRUBBED_PATH);
    }

    truncate(cleaned.trim())
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_LEN {
        return message.to_string();
    }
    let mut out: String = message.chars().take(MAX_MESSAGE_LEN).collect();
    out.push_str("... (truncated)");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_known_paths() {
        let dir = Path::new("/var/scratch/job-42");
        let msg = "Error: cannot open /var/scratch/job-42/input.docx";
        assert_eq!(
            sanitize_message(msg, &[dir]),
            "Error: cannot open <tmp>/input.docx"
        );
    }

    #[test]
    fn replaces_system_temp_dir() {
        let path = std::env::temp_dir().join(".tmpXYZ").join("input.html");
        let msg = format!("failed to load {}", path.display());
        let cleaned = sanitize_message(&msg, &[]);
        assert!(cleaned.starts_with("failed to load <tmp>"));
        assert!(cleaned.ends_with(".tmpXYZ/input.html"));
    }

    #[test]
    fn caps_length() {
        let long = "x".repeat(MAX_MESSAGE_LEN + 100);
        let cleaned = sanitize_message(&long, &[]);
        assert!(cleaned.ends_with("(truncated)"));
        assert!(cleaned.len() < long.len());
    }
}
