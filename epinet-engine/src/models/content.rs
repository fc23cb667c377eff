//! Content title index used for node display names

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub title: String,
}

/// Content id → titled item, fetched once per warming pass
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    items: HashMap<String, ContentItem>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, item: ContentItem) {
        self.items.insert(id.into(), item);
    }

    pub fn title(&self, id: &str) -> Option<&str> {
        self.items.get(id).map(|item| item.title.as_str())
    }
}

impl FromIterator<(String, ContentItem)> for ContentIndex {
    fn from_iter<I: IntoIterator<Item = (String, ContentItem)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
