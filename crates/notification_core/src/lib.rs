pub mod action;
pub mod arrival;
pub mod domain;
pub mod ports;
pub mod reconnect;
pub mod repository;
pub mod settings;

pub use action::Action;
pub use arrival::ArrivalPlan;
pub use domain::{
    DesktopPermission, Notification, NotificationCategory, NotificationFilter,
    NotificationMetadata, NotificationSettings, NotificationType, UnknownVariant,
};
pub use ports::{
    DesktopRequest, NoopSink, NotificationSink, PortError, PortResult, RemoteSyncService,
};
pub use reconnect::{ConnectionEvent, ConnectionState, Effect};
pub use repository::NotificationRepository;
pub use settings::{SettingsPatch, SettingsStore};
