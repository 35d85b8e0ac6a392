//! Edge validation of public namespace paths.
//!
//! A namespace path must stay small, ASCII, flat, and free of URL machinery:
//! at most 4 slashes, at most 300 bytes, `.json` as the only tolerated
//! extension, and none of the characters that mean something to URLs or
//! shells.

/// Characters rejected anywhere in the extension-stripped path.
const SPECIAL_CHARS: &str = r#"~`!@#$%^&*()_+=-{}|[]\:";'<>?,."#;

/// Maximum byte length of the extension-stripped path.
const MAX_PATH_LEN: usize = 300;

/// Maximum number of `/`-separated elements (4 slashes).
const MAX_PATH_ELEMENTS: usize = 5;

/// Check a request path against the namespace rules.
///
/// Returns the human-readable reason on rejection; the edge maps any reason
/// to a plain 400.
pub fn validate_public_path(path: &str) -> Result<(), String> {
    let ext = extension(path);
    let base = &path[..path.len() - ext.len()];

    if path.split('/').count() > MAX_PATH_ELEMENTS {
        return Err("path has too many separators".to_string());
    }
    if base.len() > MAX_PATH_LEN {
        return Err("path is too long".to_string());
    }
    if !ext.is_empty() && ext != ".json" {
        return Err("path does not support this extension".to_string());
    }
    if !base.is_ascii() {
        return Err("path has non-ASCII character(s)".to_string());
    }
    if base.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err("path has URL special character(s)".to_string());
    }
    Ok(())
}

/// The extension of the final path element, including the dot, or `""`.
fn extension(path: &str) -> &str {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rfind('.') {
        Some(dot) => &last[dot..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_pass() {
        assert!(validate_public_path("/pub/a").is_ok());
        assert!(validate_public_path("/pub/orders/eu").is_ok());
        assert!(validate_public_path("/pub/a/b/c").is_ok());
    }

    #[test]
    fn json_extension_is_tolerated() {
        assert!(validate_public_path("/pub/aa.json").is_ok());
        assert!(validate_public_path("/pub/a.txt").is_err());
        assert!(validate_public_path("/pub/a.JSON").is_err());
    }

    #[test]
    fn deep_paths_are_rejected() {
        assert!(validate_public_path("/pub/a/b/c").is_ok());
        assert!(validate_public_path("/pub/a/b/c/d").is_err());
        assert!(validate_public_path("/pub/a/b/c/d/e").is_err());
    }

    #[test]
    fn long_paths_are_rejected() {
        let ns = "a".repeat(MAX_PATH_LEN);
        assert!(validate_public_path(&format!("/pub/{ns}")).is_err());
        let ns = "a".repeat(MAX_PATH_LEN - "/pub/".len());
        assert!(validate_public_path(&format!("/pub/{ns}")).is_ok());
    }

    #[test]
    fn non_ascii_is_rejected() {
        assert!(validate_public_path("/pub/café").is_err());
        assert!(validate_public_path("/pub/数").is_err());
    }

    #[test]
    fn special_characters_are_rejected() {
        for bad in ["/pub/a!b", "/pub/a;b", "/pub/a b?", "/pub/a&b", "/pub/a:b", "/pub/a.b.json"] {
            assert!(validate_public_path(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn extension_is_final_element_only() {
        assert_eq!(extension("/pub/a.json"), ".json");
        assert_eq!(extension("/pub/a"), "");
        assert_eq!(extension("/pub/a.b/c"), "");
    }
}
