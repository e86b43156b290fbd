use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};

/// Opaque reference to a panel image: a URL, a data URI or a path under the site root.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    /// Absolute and data URLs pass through, relative paths are rooted at `/`.
    pub fn normalized(&self) -> Self {
        let src = self.as_str();
        if src.is_empty() || src.starts_with("data:") || is_absolute_url(src) || src.starts_with('/')
        {
            return self.clone();
        }
        Self::new(format!("/{src}"))
    }
}

fn is_absolute_url(src: &str) -> bool {
    ["//", "http://", "https://"]
        .iter()
        .any(|scheme| src.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_sources() {
        let cases = vec![
            ("optimized/lcup/1-1600.webp", "/optimized/lcup/1-1600.webp"),
            ("/optimized/lcup/1-1600.webp", "/optimized/lcup/1-1600.webp"),
            ("https://cdn.example.org/a.png", "https://cdn.example.org/a.png"),
            ("http://cdn.example.org/a.png", "http://cdn.example.org/a.png"),
            ("//cdn.example.org/a.png", "//cdn.example.org/a.png"),
            ("data:image/png;base64,AAAA", "data:image/png;base64,AAAA"),
            ("", ""),
        ];

        for (raw, expected) in cases {
            assert_eq!(ImageRef::new(raw).normalized().as_str(), expected);
        }
    }

    #[test]
    fn test_image_ref_is_transparent_in_json() {
        let refs: Vec<ImageRef> = serde_json::from_str(r#"["a.webp", "/b.webp"]"#).unwrap();
        assert_eq!(refs, vec![ImageRef::new("a.webp"), ImageRef::new("/b.webp")]);
    }
}
