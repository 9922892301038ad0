//! Screenshot reference parsing and URL normalization
//!
//! A stored screenshot value exists in three interchangeable representations:
//! an absolute URL (seed data), a legacy relative path already prefixed with a
//! serving route, or a bare storage-object identifier. Every read path must
//! normalize them identically so the same asset never yields divergent URLs.

/// The three on-record representations of a tool's preview image pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotRef {
    /// Absolute URL, passed through unchanged
    Absolute(String),
    /// Relative path already prefixed with a known serving route
    LegacyPath(String),
    /// Bare storage-object identifier
    StorageId(String),
}

impl ScreenshotRef {
    /// Discriminate a raw stored value at the record-store boundary
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            ScreenshotRef::Absolute(raw.to_string())
        } else if raw.starts_with("/image?id=") || raw.starts_with("/images/") {
            ScreenshotRef::LegacyPath(raw.to_string())
        } else {
            ScreenshotRef::StorageId(raw.to_string())
        }
    }

    /// Rewrite this reference into a public URL.
    ///
    /// Storage identifiers become a readable `/images/{slug}-{id}.png` path
    /// when a tool name is available, otherwise the `/image?id={id}` fallback.
    pub fn to_public_url(&self, base_url: &str, tool_name: Option<&str>) -> String {
        match self {
            ScreenshotRef::Absolute(url) => url.clone(),
            ScreenshotRef::LegacyPath(path) => format!("{}{}", base_url, path),
            ScreenshotRef::StorageId(id) => match tool_name.map(slugify).filter(|s| !s.is_empty())
            {
                Some(slug) => format!("{}/images/{}-{}.png", base_url, slug, id),
                None => format!("{}/image?id={}", base_url, id),
            },
        }
    }
}

/// Normalize a raw stored screenshot value into a public URL.
///
/// Pure and deterministic; `None` stays `None`.
pub fn normalize_screenshot(
    raw: Option<&str>,
    tool_name: Option<&str>,
    base_url: &str,
) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(ScreenshotRef::parse(raw).to_public_url(base_url, tool_name))
}

/// Lowercase a name and collapse runs of non-alphanumerics to a single hyphen
pub fn slugify(name: &str) -> String {
    collapse(name, '-')
}

/// Filename-safe variant used for captured screenshot files
pub fn screenshot_filename(name: &str) -> String {
    collapse(name, '_')
}

fn collapse(name: &str, sep: char) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(sep);
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://trendi.example.com";

    #[test]
    fn test_parse_discrimination() {
        assert_eq!(
            ScreenshotRef::parse("https://cdn.example.com/a.png"),
            ScreenshotRef::Absolute("https://cdn.example.com/a.png".to_string())
        );
        assert_eq!(
            ScreenshotRef::parse("/image?id=abc123"),
            ScreenshotRef::LegacyPath("/image?id=abc123".to_string())
        );
        assert_eq!(
            ScreenshotRef::parse("/images/canva-abc.png"),
            ScreenshotRef::LegacyPath("/images/canva-abc.png".to_string())
        );
        assert_eq!(
            ScreenshotRef::parse("abc123"),
            ScreenshotRef::StorageId("abc123".to_string())
        );
    }

    #[test]
    fn test_absolute_idempotent() {
        let url = "https://cdn.example.com/shot.png";
        let once = normalize_screenshot(Some(url), Some("Canva"), BASE).unwrap();
        assert_eq!(once, url);
        // Normalizing an already-normalized value returns it unchanged
        let twice = normalize_screenshot(Some(&once), Some("Canva"), BASE).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_legacy_path_prefixed() {
        assert_eq!(
            normalize_screenshot(Some("/image?id=k123"), None, BASE).unwrap(),
            "https://trendi.example.com/image?id=k123"
        );
    }

    #[test]
    fn test_storage_id_with_name() {
        assert_eq!(
            normalize_screenshot(Some("k123"), Some("Canva Pro!"), BASE).unwrap(),
            "https://trendi.example.com/images/canva-pro-k123.png"
        );
        // Determinism: same inputs, same output
        assert_eq!(
            normalize_screenshot(Some("k123"), Some("Canva Pro!"), BASE),
            normalize_screenshot(Some("k123"), Some("Canva Pro!"), BASE),
        );
    }

    #[test]
    fn test_storage_id_without_name() {
        assert_eq!(
            normalize_screenshot(Some("k123"), None, BASE).unwrap(),
            "https://trendi.example.com/image?id=k123"
        );
        // A name that slugifies to nothing also falls back
        assert_eq!(
            normalize_screenshot(Some("k123"), Some("!!!"), BASE).unwrap(),
            "https://trendi.example.com/image?id=k123"
        );
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(normalize_screenshot(None, None, BASE), None);
        assert_eq!(normalize_screenshot(Some(""), None, BASE), None);
        assert_eq!(normalize_screenshot(Some("  "), None, BASE), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Canva Pro"), "canva-pro");
        assert_eq!(slugify("  A&B  Tool "), "a-b-tool");
        assert_eq!(screenshot_filename("Canva Pro!"), "canva_pro");
    }
}
