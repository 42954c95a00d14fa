//! First-seen-ordered registries for stylesheet and image URLs.

/// Ordered, deduplicated registry of the stylesheet and image URLs a book
/// references.
///
/// The index assigned to a stylesheet URL is stable for the life of the
/// registry and names the on-disk file (`StyleNN.css`), so registration
/// must stay serialized: chapters are processed one at a time and any
/// concurrent download layer has to funnel registration through a single
/// writer.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    stylesheets: Vec<String>,
    images: Vec<String>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stylesheet URL, returning its index. A URL already
    /// present keeps its original index and is not re-appended; dedup is
    /// by exact URL string.
    pub fn register_stylesheet(&mut self, url: &str) -> usize {
        if let Some(index) = self.stylesheets.iter().position(|u| u == url) {
            return index;
        }
        self.stylesheets.push(url.to_string());
        self.stylesheets.len() - 1
    }

    pub fn contains_stylesheet(&self, url: &str) -> bool {
        self.stylesheets.iter().any(|u| u == url)
    }

    pub fn stylesheet_urls(&self) -> &[String] {
        &self.stylesheets
    }

    /// The on-disk name for the stylesheet at `index`: `StyleNN.css` with
    /// the index zero-padded to two digits.
    pub fn stylesheet_file_name(index: usize) -> String {
        format!("Style{index:0>2}.css")
    }

    /// Register an image URL, returning its index. Same dedup rules as
    /// stylesheets.
    pub fn register_image(&mut self, url: &str) -> usize {
        if let Some(index) = self.images.iter().position(|u| u == url) {
            return index;
        }
        self.images.push(url.to_string());
        self.images.len() - 1
    }

    pub fn image_urls(&self) -> &[String] {
        &self.images
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_stability() {
        let mut registry = AssetRegistry::new();
        assert_eq!(registry.register_stylesheet("A"), 0);
        assert_eq!(registry.register_stylesheet("B"), 1);
        assert_eq!(registry.register_stylesheet("A"), 0);
        assert_eq!(registry.register_stylesheet("C"), 2);
        assert_eq!(registry.stylesheet_urls(), ["A", "B", "C"]);
    }

    #[test]
    fn test_contains() {
        let mut registry = AssetRegistry::new();
        registry.register_stylesheet("A");
        assert!(registry.contains_stylesheet("A"));
        assert!(!registry.contains_stylesheet("B"));
    }

    #[test]
    fn test_image_dedup() {
        let mut registry = AssetRegistry::new();
        assert_eq!(registry.register_image("x.png"), 0);
        assert_eq!(registry.register_image("y.png"), 1);
        assert_eq!(registry.register_image("x.png"), 0);
        assert_eq!(registry.image_urls().len(), 2);
    }

    #[test]
    fn test_stylesheet_file_name_padding() {
        assert_eq!(AssetRegistry::stylesheet_file_name(0), "Style00.css");
        assert_eq!(AssetRegistry::stylesheet_file_name(7), "Style07.css");
        assert_eq!(AssetRegistry::stylesheet_file_name(123), "Style123.css");
    }
}
