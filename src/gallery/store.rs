use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::Serialize;

use crate::models::DetectionResult;

/// One captured frame. Immutable after creation.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub original_image: Arc<RgbaImage>,
    pub annotated_image: Arc<RgbaImage>,
    pub file_name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub detection_result: DetectionResult,
}

/// Lightweight view of the gallery for presentation hooks.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GallerySnapshot {
    pub len: usize,
    pub current_index: Option<usize>,
}

#[derive(Default)]
struct GalleryState {
    entries: Vec<Arc<GalleryEntry>>,
    current: Option<usize>,
}

impl GalleryState {
    fn snapshot(&self) -> GallerySnapshot {
        GallerySnapshot {
            len: self.entries.len(),
            current_index: self.current,
        }
    }
}

/// Ordered collection of captured frames with a navigation cursor.
///
/// The store does not decide ordering: controllers `add` for finite jobs and
/// `prepend` for live sources. Navigation clamps at both ends.
#[derive(Default)]
pub struct GalleryStore {
    state: RwLock<GalleryState>,
}

impl GalleryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append. The cursor lands on the first entry if the gallery was empty.
    pub fn add(&self, entry: GalleryEntry) -> GallerySnapshot {
        let mut state = self.write();
        state.entries.push(Arc::new(entry));
        if state.current.is_none() {
            state.current = Some(0);
        }
        state.snapshot()
    }

    pub fn add_batch(&self, entries: Vec<GalleryEntry>) -> GallerySnapshot {
        let mut state = self.write();
        state.entries.extend(entries.into_iter().map(Arc::new));
        if state.current.is_none() && !state.entries.is_empty() {
            state.current = Some(0);
        }
        state.snapshot()
    }

    /// Insert newest-first and select it.
    pub fn prepend(&self, entry: GalleryEntry) -> GallerySnapshot {
        let mut state = self.write();
        state.entries.insert(0, Arc::new(entry));
        state.current = Some(0);
        state.snapshot()
    }

    /// Select `index`; out of range is a no-op. Returns whether it moved.
    pub fn navigate(&self, index: usize) -> bool {
        let mut state = self.write();
        if index >= state.entries.len() {
            return false;
        }
        state.current = Some(index);
        true
    }

    /// Move forward one entry; stays put on the last entry.
    pub fn next(&self) -> Option<usize> {
        let mut state = self.write();
        let last = state.entries.len().checked_sub(1)?;
        let next = state.current.map_or(0, |i| (i + 1).min(last));
        state.current = Some(next);
        Some(next)
    }

    /// Move back one entry; stays put on the first entry.
    pub fn previous(&self) -> Option<usize> {
        let mut state = self.write();
        if state.entries.is_empty() {
            return None;
        }
        let previous = state.current.map_or(0, |i| i.saturating_sub(1));
        state.current = Some(previous);
        Some(previous)
    }

    /// Remove `index`. The cursor keeps pointing at the same entry when it
    /// can, otherwise at its nearest neighbour.
    pub fn remove(&self, index: usize) -> Option<Arc<GalleryEntry>> {
        let mut state = self.write();
        if index >= state.entries.len() {
            return None;
        }
        let removed = state.entries.remove(index);
        let len = state.entries.len();
        state.current = match state.current {
            _ if len == 0 => None,
            Some(current) if current > index => Some(current - 1),
            Some(current) => Some(current.min(len - 1)),
            None => None,
        };
        Some(removed)
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.current = None;
    }

    pub fn current(&self) -> Option<Arc<GalleryEntry>> {
        let state = self.read();
        state.current.and_then(|i| state.entries.get(i).cloned())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.read().current
    }

    pub fn get(&self, index: usize) -> Option<Arc<GalleryEntry>> {
        self.read().entries.get(index).cloned()
    }

    pub fn entries(&self) -> Vec<Arc<GalleryEntry>> {
        self.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> GallerySnapshot {
        self.read().snapshot()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, GalleryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, GalleryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
