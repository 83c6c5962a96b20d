//! Append-only log of completed compositions.

use bananafit_core::InlineImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successful try-on: the inputs and the image the model returned.
///
/// Entries are created once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub person: InlineImage,
    pub clothing: InlineImage,
    pub result: InlineImage,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(person: InlineImage, clothing: InlineImage, result: InlineImage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            person,
            clothing,
            result,
            created_at: Utc::now(),
        }
    }
}

/// Insertion-ordered history, oldest first.
#[derive(Debug, Default, Clone)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn all(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tag: &str) -> InlineImage {
        InlineImage::from_bytes("image/png", tag.as_bytes())
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut log = HistoryLog::new();
        assert!(log.is_empty());

        log.append(HistoryEntry::new(image("p1"), image("c1"), image("r1")));
        log.append(HistoryEntry::new(image("p2"), image("c2"), image("r2")));

        assert_eq!(log.len(), 2);
        assert_eq!(log.all()[0].result, image("r1"));
        assert_eq!(log.all()[1].result, image("r2"));
    }

    #[test]
    fn entry_ids_are_unique() {
        let a = HistoryEntry::new(image("p"), image("c"), image("r"));
        let b = HistoryEntry::new(image("p"), image("c"), image("r"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn entry_serializes_images_as_data_urls() {
        let entry = HistoryEntry::new(image("p"), image("c"), image("r"));
        let json = serde_json::to_value(&entry).unwrap();
        assert!(
            json["result"]
                .as_str()
                .unwrap()
                .starts_with("data:image/png;base64,")
        );
    }
}
