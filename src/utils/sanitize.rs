//! Output name sanitization.

/// Base name used when nothing usable survives sanitization.
pub const DEFAULT_OUTPUT_NAME: &str = "merged";

/// Reduce a requested output name to `[A-Za-z0-9_-]`.
///
/// A trailing `.<extension>` is dropped first so `sheets.pdf` becomes
/// `sheets`; every other character, including dots and path separators,
/// is removed.
pub fn sanitize_output_name(name: &str, extension: &str) -> String {
    let name = name.trim();
    let suffix = format!(".{}", extension);
    let split = name.len().saturating_sub(suffix.len());
    let stem = match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(tail)) if tail.eq_ignore_ascii_case(&suffix) => stem,
        _ => name,
    };

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if cleaned.is_empty() {
        DEFAULT_OUTPUT_NAME.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_traversal_is_flattened() {
        assert_eq!(sanitize_output_name("../../etc/passwd", "pdf"), "etcpasswd");
    }

    #[test]
    fn test_existing_extension_dropped() {
        assert_eq!(sanitize_output_name("Week 3 Math.PDF", "pdf"), "Week3Math");
        assert_eq!(sanitize_output_name("a.b.pdf", "pdf"), "ab");
    }

    #[test]
    fn test_empty_falls_back_to_default() {
        assert_eq!(sanitize_output_name("", "pdf"), DEFAULT_OUTPUT_NAME);
        assert_eq!(sanitize_output_name("../..", "pdf"), DEFAULT_OUTPUT_NAME);
        assert_eq!(sanitize_output_name(".pdf", "pdf"), DEFAULT_OUTPUT_NAME);
    }

    #[test]
    fn test_allowed_characters_kept() {
        assert_eq!(sanitize_output_name("kiddo_set-02", "pdf"), "kiddo_set-02");
    }
}
