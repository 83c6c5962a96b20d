//! Clothing candidates: generated garments ahead of the preset catalog.

use bananafit_core::ImageAsset;

/// Generated assets (newest first) followed by the fixed presets.
///
/// Presets are never removed or reordered. Generated assets are only ever
/// prepended.
#[derive(Debug, Clone, Default)]
pub struct ClothingCandidates {
    generated: Vec<ImageAsset>,
    presets: Vec<ImageAsset>,
}

impl ClothingCandidates {
    pub fn new(presets: Vec<ImageAsset>) -> Self {
        Self {
            generated: Vec::new(),
            presets,
        }
    }

    /// Add a freshly generated garment in front of every other candidate.
    pub fn prepend_generated(&mut self, asset: ImageAsset) {
        // Stored oldest first; reversed on read.
        self.generated.push(asset);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageAsset> {
        self.generated.iter().rev().chain(self.presets.iter())
    }

    pub fn to_vec(&self) -> Vec<ImageAsset> {
        self.iter().cloned().collect()
    }

    pub fn find(&self, id: &str) -> Option<&ImageAsset> {
        self.iter().find(|asset| asset.id == id)
    }

    pub fn len(&self) -> usize {
        self.generated.len() + self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bananafit_core::InlineImage;

    fn presets() -> Vec<ImageAsset> {
        vec![
            ImageAsset::preset("c1", "https://example.com/c1.png"),
            ImageAsset::preset("c2", "https://example.com/c2.png"),
        ]
    }

    fn generated(id: &str) -> ImageAsset {
        ImageAsset::generated(id, InlineImage::from_bytes("image/png", id.as_bytes()))
    }

    #[test]
    fn generated_assets_come_first_newest_first() {
        let mut candidates = ClothingCandidates::new(presets());
        candidates.prepend_generated(generated("gen_1"));
        candidates.prepend_generated(generated("gen_2"));

        let ids: Vec<_> = candidates.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["gen_2", "gen_1", "c1", "c2"]);
        assert_eq!(candidates.len(), 4);
    }

    #[test]
    fn presets_keep_their_order() {
        let mut candidates = ClothingCandidates::new(presets());
        candidates.prepend_generated(generated("gen_1"));

        let tail: Vec<_> = candidates.to_vec().into_iter().skip(1).collect();
        assert_eq!(tail, presets());
    }

    #[test]
    fn find_by_id() {
        let mut candidates = ClothingCandidates::new(presets());
        candidates.prepend_generated(generated("gen_1"));

        assert!(!candidates.find("gen_1").unwrap().is_preset());
        assert!(candidates.find("c2").unwrap().is_preset());
        assert!(candidates.find("nope").is_none());
    }

    #[test]
    fn empty_catalog() {
        let candidates = ClothingCandidates::default();
        assert!(candidates.is_empty());
        assert!(candidates.iter().next().is_none());
    }
}
