//! crates/notification_core/src/domain.rs
//!
//! Defines the pure, core data structures for the notification client.
//! These structs are independent of any wire or storage format.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Returned when a label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Visual severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    Success,
    Error,
    Warning,
    Info,
    Urgent,
}

/// Routing and filtering class of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotificationCategory {
    Loan,
    Payment,
    Document,
    System,
    Security,
    Promotional,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 6] = [
        NotificationCategory::Loan,
        NotificationCategory::Payment,
        NotificationCategory::Document,
        NotificationCategory::System,
        NotificationCategory::Security,
        NotificationCategory::Promotional,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCategory::Loan => "LOAN",
            NotificationCategory::Payment => "PAYMENT",
            NotificationCategory::Document => "DOCUMENT",
            NotificationCategory::System => "SYSTEM",
            NotificationCategory::Security => "SECURITY",
            NotificationCategory::Promotional => "PROMOTIONAL",
        }
    }

    /// Whether the category is switched on when no preference was stored.
    pub fn enabled_by_default(self) -> bool {
        self != NotificationCategory::Promotional
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// Opaque pass-through fields. Rendered verbatim, never interpreted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationMetadata {
    pub loan_id: Option<String>,
    pub amount: Option<String>,
    pub customer_id: Option<String>,
    pub application_id: Option<String>,
}

impl NotificationMetadata {
    pub fn is_empty(&self) -> bool {
        self.loan_id.is_none()
            && self.amount.is_none()
            && self.customer_id.is_none()
            && self.application_id.is_none()
    }
}

/// One delivered alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub category: NotificationCategory,
    pub is_read: bool,
    pub is_important: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
    pub metadata: NotificationMetadata,
}

impl Notification {
    /// Builds an unread, unimportant notification stamped with the current time.
    /// A fresh UUID is used when `id` is `None`.
    pub fn new(
        id: Option<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        category: NotificationCategory,
    ) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: title.into(),
            message: message.into(),
            kind,
            category,
            is_read: false,
            is_important: false,
            created_at: Utc::now(),
            expires_at: None,
            action_url: None,
            action_label: None,
            metadata: NotificationMetadata::default(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Which subset of the repository the panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
    Important,
    Category(NotificationCategory),
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        match self {
            NotificationFilter::All => true,
            NotificationFilter::Unread => !notification.is_read,
            NotificationFilter::Important => notification.is_important,
            NotificationFilter::Category(category) => notification.category == *category,
        }
    }
}

impl fmt::Display for NotificationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationFilter::All => f.write_str("ALL"),
            NotificationFilter::Unread => f.write_str("UNREAD"),
            NotificationFilter::Important => f.write_str("IMPORTANT"),
            NotificationFilter::Category(category) => category.fmt(f),
        }
    }
}

impl FromStr for NotificationFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(NotificationFilter::All),
            "UNREAD" => Ok(NotificationFilter::Unread),
            "IMPORTANT" => Ok(NotificationFilter::Important),
            other => other
                .parse::<NotificationCategory>()
                .map(NotificationFilter::Category)
                .map_err(|_| UnknownVariant {
                    kind: "filter",
                    value: s.to_string(),
                }),
        }
    }
}

/// User notification preferences, one per local profile.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSettings {
    pub sound_enabled: bool,
    /// Playback volume between 0.0 and 1.0.
    pub sound_volume: f32,
    pub desktop_enabled: bool,
    pub categories: BTreeMap<NotificationCategory, bool>,
}

impl NotificationSettings {
    pub const DEFAULT_VOLUME: f32 = 0.7;

    pub fn is_category_enabled(&self, category: NotificationCategory) -> bool {
        self.categories
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.enabled_by_default())
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sound_volume: Self::DEFAULT_VOLUME,
            desktop_enabled: true,
            categories: NotificationCategory::ALL
                .into_iter()
                .map(|c| (c, c.enabled_by_default()))
                .collect(),
        }
    }
}

/// Whether the host allows desktop popups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DesktopPermission {
    Granted,
    Denied,
    /// The user has not been asked yet.
    #[default]
    Default,
}

impl FromStr for DesktopPermission {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(DesktopPermission::Granted),
            "denied" => Ok(DesktopPermission::Denied),
            "default" => Ok(DesktopPermission::Default),
            _ => Err(UnknownVariant {
                kind: "desktop permission",
                value: s.to_string(),
            }),
        }
    }
}
