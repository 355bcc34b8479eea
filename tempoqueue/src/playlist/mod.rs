//! Playlist : séquence ordonnée de MusicItem

pub(crate) mod edit;

use crate::item::MusicItem;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Ordered queue of playable items
///
/// Order is meaningful and duplicates are allowed. The whole list is stored
/// as a single value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Playlist {
    items: Vec<MusicItem>,
}

impl Playlist {
    pub fn new(items: Vec<MusicItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MusicItem> {
        self.items.get(index)
    }

    pub fn contains(&self, item: &MusicItem) -> bool {
        self.items.contains(item)
    }

    /// Index of the first item equal to `item`
    pub fn index_of(&self, item: &MusicItem) -> Option<usize> {
        self.items.iter().position(|i| i == item)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MusicItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[MusicItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<MusicItem> {
        self.items
    }
}

impl From<Vec<MusicItem>> for Playlist {
    fn from(items: Vec<MusicItem>) -> Self {
        Self::new(items)
    }
}

impl FromIterator<MusicItem> for Playlist {
    fn from_iter<I: IntoIterator<Item = MusicItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Playlist {
    type Item = MusicItem;
    type IntoIter = std::vec::IntoIter<MusicItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a MusicItem;
    type IntoIter = std::slice::Iter<'a, MusicItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Index<usize> for Playlist {
    type Output = MusicItem;

    fn index(&self, index: usize) -> &MusicItem {
        &self.items[index]
    }
}
