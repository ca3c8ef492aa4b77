//! Ordered item storage.

use std::collections::BTreeSet;

use super::types::{ItemSnapshot, ItemStatus, UploadItem};
use crate::validator::RejectReason;

/// Items in enqueue order with a capacity cap.
///
/// Removal keeps the relative order of the rest, so the first `Pending`
/// item is always the oldest one waiting.
#[derive(Debug)]
pub struct UploadQueue {
    items: Vec<UploadItem>,
    max_items: usize,
}

impl UploadQueue {
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Vec::new(),
            max_items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Append an item. Rejects once the cap is reached.
    pub fn push(&mut self, item: UploadItem) -> Result<(), RejectReason> {
        if self.items.len() >= self.max_items {
            return Err(RejectReason::QueueFull {
                max_items: self.max_items,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&UploadItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut UploadItem> {
        self.items.iter_mut().find(|i| i.id() == id)
    }

    /// Remove and return the item with the given id.
    pub fn remove(&mut self, id: &str) -> Option<UploadItem> {
        let index = self.items.iter().position(|i| i.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Oldest item still waiting to be uploaded.
    pub fn next_pending_mut(&mut self) -> Option<&mut UploadItem> {
        self.items
            .iter_mut()
            .find(|i| i.status() == ItemStatus::Pending)
    }

    pub fn has_pending(&self) -> bool {
        self.items.iter().any(|i| i.status() == ItemStatus::Pending)
    }

    pub fn count_status(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status() == status).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadItem> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut UploadItem> {
        self.items.iter_mut()
    }

    pub fn snapshots(&self) -> Vec<ItemSnapshot> {
        self.items.iter().map(UploadItem::snapshot).collect()
    }

    /// Ids of items in the given status, in queue order.
    pub fn ids_with_status(&self, status: ItemStatus) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.status() == status)
            .map(|i| i.id().to_string())
            .collect()
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.is_selected())
            .map(|i| i.id().to_string())
            .collect()
    }

    /// Set the selection flag on the given ids. Returns how many matched.
    pub fn select(&mut self, ids: &BTreeSet<String>, selected: bool) -> usize {
        let mut matched = 0;
        for item in self.items.iter_mut().filter(|i| ids.contains(i.id())) {
            item.set_selected(selected);
            matched += 1;
        }
        matched
    }

    pub fn select_all(&mut self, selected: bool) {
        for item in &mut self.items {
            item.set_selected(selected);
        }
    }

    /// Remove every completed item, releasing its preview.
    pub fn clear_completed(&mut self) -> Vec<UploadItem> {
        self.take_where(|i| i.status() == ItemStatus::Completed)
    }

    /// Remove selected items that are not currently uploading.
    pub fn remove_selected(&mut self) -> Vec<UploadItem> {
        self.take_where(|i| i.is_selected() && i.status() != ItemStatus::Uploading)
    }

    /// Remove everything, releasing previews.
    pub fn drain(&mut self) -> Vec<UploadItem> {
        let mut drained: Vec<UploadItem> = self.items.drain(..).collect();
        for item in &mut drained {
            item.release_preview();
        }
        drained
    }

    fn take_where(&mut self, pred: impl Fn(&UploadItem) -> bool) -> Vec<UploadItem> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for mut item in self.items.drain(..) {
            if pred(&item) {
                item.release_preview();
                taken.push(item);
            } else {
                kept.push(item);
            }
        }
        self.items = kept;
        taken
    }
}
