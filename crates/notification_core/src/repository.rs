//! crates/notification_core/src/repository.rs
//!
//! The in-memory working set of notifications, kept newest first.

use crate::domain::{Notification, NotificationFilter};
use chrono::{DateTime, Utc};

/// Ordered set of notifications with unique ids.
#[derive(Debug, Default, Clone)]
pub struct NotificationRepository {
    items: Vec<Notification>,
}

impl NotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Getters =====

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.is_read).count()
    }

    /// Recomputed on every call; order follows the repository.
    pub fn filtered(&self, filter: NotificationFilter) -> Vec<&Notification> {
        self.items.iter().filter(|n| filter.matches(n)).collect()
    }

    // ===== Mutations =====

    /// Wholesale replacement used for backlog loads. The list is taken in
    /// server order; later duplicates of an id are dropped.
    pub fn replace_all(&mut self, notifications: Vec<Notification>) {
        self.items.clear();
        for notification in notifications {
            if self.get(&notification.id).is_none() {
                self.items.push(notification);
            }
        }
    }

    /// Inserts at the front. An existing record with the same id is replaced
    /// where it stands.
    pub fn prepend(&mut self, notification: Notification) {
        match self.items.iter_mut().find(|n| n.id == notification.id) {
            Some(existing) => *existing = notification,
            None => self.items.insert(0, notification),
        }
    }

    /// Returns `true` if the record changed.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                true
            }
            _ => false,
        }
    }

    /// Returns how many records changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for n in self.items.iter_mut().filter(|n| !n.is_read) {
            n.is_read = true;
            changed += 1;
        }
        changed
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn clear_all(&mut self) {
        self.items.clear();
    }

    /// Drops records whose expiry has passed. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|n| !n.is_expired(now));
        before - self.items.len()
    }
}
