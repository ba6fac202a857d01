//! services/notifier/src/client/panel.rs
//!
//! The presentation layer: bell badge, filterable list and per-item actions.
//! It owns no notification data; every mutation goes through the dispatcher
//! or the settings store.

use crate::client::dispatcher::{Dispatcher, SyncRoute};
use crate::client::state::ClientState;
use chrono::{DateTime, Utc};
use notification_core::{
    Action, Notification, NotificationCategory, NotificationFilter, NotificationRepository,
    NotificationSettings, NotificationType, SettingsPatch,
};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// One list entry, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRow {
    pub id: String,
    pub icon: &'static str,
    pub title: String,
    pub message: String,
    pub age: String,
    pub category: NotificationCategory,
    pub unread: bool,
    pub important: bool,
    /// `(label, url)` of the call to action.
    pub action: Option<(String, String)>,
    /// Metadata lines such as `Loan: LN-1001`.
    pub details: Vec<String>,
}

pub struct NotificationPanel {
    state: Arc<ClientState>,
    dispatcher: Dispatcher,
    filter: NotificationFilter,
    open: bool,
}

impl NotificationPanel {
    pub fn new(state: Arc<ClientState>, dispatcher: Dispatcher) -> Self {
        Self {
            state,
            dispatcher,
            filter: NotificationFilter::All,
            open: false,
        }
    }

    // ===== Panel state =====

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn filter(&self) -> NotificationFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: NotificationFilter) {
        self.filter = filter;
    }

    // ===== Views =====

    /// Expired records never count toward the badge.
    pub async fn badge(&self) -> Option<String> {
        let mut repository = self.state.repository.lock().await;
        self.purge_expired(&mut repository, Utc::now());
        badge_label(repository.unread_count())
    }

    /// Rows for the active filter, newest first. Expired records are dropped
    /// before the view is built.
    pub async fn rows(&self) -> Vec<NotificationRow> {
        let now = Utc::now();
        let mut repository = self.state.repository.lock().await;
        self.purge_expired(&mut repository, now);
        repository
            .filtered(self.filter)
            .into_iter()
            .map(|n| NotificationRow::build(n, now))
            .collect()
    }

    pub async fn render(&self) -> String {
        let mut out = String::new();
        let rows = self.rows().await;
        let unread = self.state.unread_count().await;
        let _ = writeln!(
            out,
            "Notifications ({} unread) [filter: {}]",
            unread, self.filter
        );

        if rows.is_empty() {
            out.push_str("  No notifications\n");
            return out;
        }
        for row in rows {
            let marker = if row.unread { '●' } else { ' ' };
            let important = if row.important { " [important]" } else { "" };
            let _ = writeln!(
                out,
                "{} {} {}{} · {} · {}  ({})",
                marker, row.icon, row.title, important, row.category, row.age, row.id
            );
            if !row.message.is_empty() {
                let _ = writeln!(out, "      {}", row.message);
            }
            if let Some((label, url)) = &row.action {
                let _ = writeln!(out, "      {} -> {}", label, url);
            }
            for detail in &row.details {
                let _ = writeln!(out, "      {}", detail);
            }
        }
        out
    }

    fn purge_expired(&self, repository: &mut NotificationRepository, now: DateTime<Utc>) {
        if repository.purge_expired(now) > 0 {
            self.state.touch();
        }
    }

    // ===== Actions =====

    pub async fn mark_read(&self, id: &str) -> SyncRoute {
        self.dispatcher.dispatch(Action::MarkRead(id.to_string())).await
    }

    pub async fn mark_all_read(&self) -> SyncRoute {
        self.dispatcher.dispatch(Action::MarkAllRead).await
    }

    pub async fn delete(&self, id: &str) -> SyncRoute {
        self.dispatcher.dispatch(Action::Delete(id.to_string())).await
    }

    pub async fn clear_all(&self) -> SyncRoute {
        self.dispatcher.dispatch(Action::ClearAll).await
    }

    /// Selecting an entry marks it read (if needed) and yields its action URL.
    pub async fn select(&self, id: &str) -> Option<String> {
        let (is_read, url) = {
            let repository = self.state.repository.lock().await;
            let n = repository.get(id)?;
            (n.is_read, n.action_url.clone())
        };
        if !is_read {
            self.mark_read(id).await;
        }
        url
    }

    /// A click on a desktop popup: the panel opens and the caller navigates
    /// to the returned URL, if any.
    pub async fn handle_desktop_click(&mut self, id: &str) -> Option<String> {
        self.open = true;
        if let Err(e) = self.state.sink.dismiss_desktop(id) {
            debug!("Could not close popup {}: {}", id, e);
        }
        let repository = self.state.repository.lock().await;
        repository.get(id).and_then(|n| n.action_url.clone())
    }

    // ===== Settings =====

    pub async fn settings(&self) -> NotificationSettings {
        self.state.settings.lock().await.get().clone()
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> NotificationSettings {
        let updated = self.state.settings.lock().await.update(patch).clone();
        self.state.touch();
        updated
    }
}

impl NotificationRow {
    fn build(n: &Notification, now: DateTime<Utc>) -> Self {
        let meta = &n.metadata;
        let details = [
            ("Loan", &meta.loan_id),
            ("Amount", &meta.amount),
            ("Customer", &meta.customer_id),
            ("Application", &meta.application_id),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
        .collect();

        let action = n.action_url.as_ref().map(|url| {
            let label = n.action_label.clone().unwrap_or_else(|| "View".to_string());
            (label, url.clone())
        });

        Self {
            id: n.id.clone(),
            icon: icon(n.kind),
            title: n.title.clone(),
            message: n.message.clone(),
            age: time_ago(n.created_at, now),
            category: n.category,
            unread: !n.is_read,
            important: n.is_important,
            action,
            details,
        }
    }
}

/// Text of the bell badge. Hidden at zero.
pub fn badge_label(unread: usize) -> Option<String> {
    match unread {
        0 => None,
        1..=99 => Some(unread.to_string()),
        _ => Some("99+".to_string()),
    }
}

pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        created_at.format("%d %b %Y").to_string()
    }
}

fn icon(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::Success => "✓",
        NotificationType::Error => "✗",
        NotificationType::Warning => "!",
        NotificationType::Info => "i",
        NotificationType::Urgent => "‼",
    }
}
