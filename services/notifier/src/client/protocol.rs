//! services/notifier/src/client/protocol.rs
//!
//! Defines the WebSocket message protocol between the notification client and
//! the push server. Every frame is a JSON text message tagged by `"type"`.

use chrono::{DateTime, Utc};
use notification_core::{
    Action, Notification, NotificationCategory, NotificationMetadata, NotificationType,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Asks for the backlog. Sent right after every successful open.
    GetNotifications { limit: u32 },

    MarkRead {
        #[serde(rename = "notificationId")]
        notification_id: String,
    },

    MarkAllRead,

    DeleteNotification {
        #[serde(rename = "notificationId")]
        notification_id: String,
    },

    ClearAll,

    /// Reply to a server `PING`.
    Pong,
}

impl From<&Action> for ClientMessage {
    fn from(action: &Action) -> Self {
        match action {
            Action::MarkRead(id) => ClientMessage::MarkRead {
                notification_id: id.clone(),
            },
            Action::MarkAllRead => ClientMessage::MarkAllRead,
            Action::Delete(id) => ClientMessage::DeleteNotification {
                notification_id: id.clone(),
            },
            Action::ClearAll => ClientMessage::ClearAll,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// The backlog. Replaces everything the client holds.
    NotificationsList {
        #[serde(default)]
        notifications: Vec<NotificationPayload>,
    },

    NewNotification { notification: NotificationPayload },

    /// Another session of the same user read a notification.
    NotificationRead {
        #[serde(rename = "notificationId")]
        notification_id: String,
    },

    /// Keepalive. Must be answered with `PONG`.
    Ping,
}

//=========================================================================================
// Notification Payload
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireType {
    Success,
    Error,
    Warning,
    Info,
    Urgent,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireCategory {
    Loan,
    Payment,
    Document,
    System,
    Security,
    Promotional,
}

/// Opaque values are kept as raw JSON so numbers and strings both pass through.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    pub loan_id: Option<serde_json::Value>,
    pub amount: Option<serde_json::Value>,
    pub customer_id: Option<serde_json::Value>,
    pub application_id: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Missing ids get a client-side UUID.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: WireType,
    pub category: WireCategory,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_important: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub action_label: Option<String>,
    #[serde(default)]
    pub metadata: Option<MetadataPayload>,
}

impl From<WireType> for NotificationType {
    fn from(kind: WireType) -> Self {
        match kind {
            WireType::Success => NotificationType::Success,
            WireType::Error => NotificationType::Error,
            WireType::Warning => NotificationType::Warning,
            WireType::Info => NotificationType::Info,
            WireType::Urgent => NotificationType::Urgent,
        }
    }
}

impl From<NotificationType> for WireType {
    fn from(kind: NotificationType) -> Self {
        match kind {
            NotificationType::Success => WireType::Success,
            NotificationType::Error => WireType::Error,
            NotificationType::Warning => WireType::Warning,
            NotificationType::Info => WireType::Info,
            NotificationType::Urgent => WireType::Urgent,
        }
    }
}

impl From<WireCategory> for NotificationCategory {
    fn from(category: WireCategory) -> Self {
        match category {
            WireCategory::Loan => NotificationCategory::Loan,
            WireCategory::Payment => NotificationCategory::Payment,
            WireCategory::Document => NotificationCategory::Document,
            WireCategory::System => NotificationCategory::System,
            WireCategory::Security => NotificationCategory::Security,
            WireCategory::Promotional => NotificationCategory::Promotional,
        }
    }
}

impl From<NotificationCategory> for WireCategory {
    fn from(category: NotificationCategory) -> Self {
        match category {
            NotificationCategory::Loan => WireCategory::Loan,
            NotificationCategory::Payment => WireCategory::Payment,
            NotificationCategory::Document => WireCategory::Document,
            NotificationCategory::System => WireCategory::System,
            NotificationCategory::Security => WireCategory::Security,
            NotificationCategory::Promotional => WireCategory::Promotional,
        }
    }
}

fn verbatim(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl From<NotificationPayload> for Notification {
    fn from(payload: NotificationPayload) -> Self {
        let metadata = payload.metadata.unwrap_or_default();
        Notification {
            id: payload
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: payload.title,
            message: payload.message,
            kind: payload.kind.into(),
            category: payload.category.into(),
            is_read: payload.is_read,
            is_important: payload.is_important,
            created_at: payload.created_at,
            expires_at: payload.expires_at,
            action_url: payload.action_url,
            action_label: payload.action_label,
            metadata: NotificationMetadata {
                loan_id: verbatim(metadata.loan_id),
                amount: verbatim(metadata.amount),
                customer_id: verbatim(metadata.customer_id),
                application_id: verbatim(metadata.application_id),
            },
        }
    }
}

impl From<&Notification> for NotificationPayload {
    fn from(n: &Notification) -> Self {
        let meta = &n.metadata;
        NotificationPayload {
            id: Some(n.id.clone()),
            title: n.title.clone(),
            message: n.message.clone(),
            kind: n.kind.into(),
            category: n.category.into(),
            is_read: n.is_read,
            is_important: n.is_important,
            created_at: n.created_at,
            expires_at: n.expires_at,
            action_url: n.action_url.clone(),
            action_label: n.action_label.clone(),
            metadata: (!meta.is_empty()).then(|| MetadataPayload {
                loan_id: meta.loan_id.clone().map(serde_json::Value::String),
                amount: meta.amount.clone().map(serde_json::Value::String),
                customer_id: meta.customer_id.clone().map(serde_json::Value::String),
                application_id: meta.application_id.clone().map(serde_json::Value::String),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_use_screaming_tags() {
        let cases = [
            (
                ClientMessage::GetNotifications { limit: 50 },
                json!({"type": "GET_NOTIFICATIONS", "limit": 50}),
            ),
            (
                ClientMessage::MarkRead {
                    notification_id: "n1".to_string(),
                },
                json!({"type": "MARK_READ", "notificationId": "n1"}),
            ),
            (ClientMessage::MarkAllRead, json!({"type": "MARK_ALL_READ"})),
            (
                ClientMessage::DeleteNotification {
                    notification_id: "n2".to_string(),
                },
                json!({"type": "DELETE_NOTIFICATION", "notificationId": "n2"}),
            ),
            (ClientMessage::ClearAll, json!({"type": "CLEAR_ALL"})),
            (ClientMessage::Pong, json!({"type": "PONG"})),
        ];
        for (message, expected) in cases {
            assert_eq!(serde_json::to_value(&message).unwrap(), expected);
        }
    }

    #[test]
    fn new_notification_parses_into_domain() {
        let raw = r#"{
            "type": "NEW_NOTIFICATION",
            "notification": {
                "id": "emi-7",
                "title": "EMI due",
                "message": "Your EMI of 4,200 is due on 5 Nov",
                "type": "WARNING",
                "category": "PAYMENT",
                "isImportant": true,
                "createdAt": "2024-11-01T09:30:00Z",
                "actionUrl": "/repayments",
                "actionLabel": "Pay now",
                "metadata": {"loanId": "LN-1001", "amount": 4200}
            }
        }"#;
        let ServerMessage::NewNotification { notification } = serde_json::from_str(raw).unwrap()
        else {
            panic!("expected NEW_NOTIFICATION");
        };
        let n = Notification::from(notification);
        assert_eq!(n.id, "emi-7");
        assert_eq!(n.kind, NotificationType::Warning);
        assert_eq!(n.category, NotificationCategory::Payment);
        assert!(n.is_important);
        assert!(!n.is_read);
        assert_eq!(n.metadata.loan_id.as_deref(), Some("LN-1001"));
        assert_eq!(n.metadata.amount.as_deref(), Some("4200"));
        assert_eq!(n.action_label.as_deref(), Some("Pay now"));
    }

    #[test]
    fn missing_id_gets_client_uuid() {
        let raw = json!({
            "title": "KYC verified",
            "type": "SUCCESS",
            "category": "DOCUMENT",
            "createdAt": "2024-11-01T09:30:00Z"
        });
        let payload: NotificationPayload = serde_json::from_value(raw).unwrap();
        let n = Notification::from(payload);
        assert!(Uuid::parse_str(&n.id).is_ok());
    }

    #[test]
    fn ping_and_read_echo_parse() {
        assert!(matches!(
            serde_json::from_str::<ServerMessage>(r#"{"type":"PING"}"#),
            Ok(ServerMessage::Ping)
        ));
        assert!(matches!(
            serde_json::from_str::<ServerMessage>(r#"{"type":"NOTIFICATION_READ","notificationId":"x"}"#),
            Ok(ServerMessage::NotificationRead { notification_id }) if notification_id == "x"
        ));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        assert!(serde_json::from_str::<ServerMessage>(r#"{"type":"SHUTDOWN"}"#).is_err());
        assert!(serde_json::from_str::<ServerMessage>("not json").is_err());
    }
}
