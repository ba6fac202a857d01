//! crates/notification_core/src/ports.rs
//!
//! Defines the capability contracts (traits) the notification core depends on.
//! These traits keep the core independent of the audio device, the desktop
//! notification host, local storage and the REST backend.

use crate::domain::{DesktopPermission, NotificationSettings};
use async_trait::async_trait;
use std::time::Duration;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Malformed data: {0}")]
    Malformed(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Local Capabilities
//=========================================================================================

/// A request to raise (or replace) one desktop popup.
#[derive(Debug, Clone, PartialEq)]
pub struct DesktopRequest {
    /// Popups sharing a tag replace each other instead of stacking.
    pub tag: String,
    pub title: String,
    pub body: String,
    pub action_url: Option<String>,
    /// `None` keeps the popup until the user dismisses it.
    pub auto_dismiss: Option<Duration>,
}

/// The ambient host objects the client touches: the shared audio element,
/// the desktop notification host and local persistent storage.
///
/// Every method is synchronous and must not block for longer than a file
/// read; playback and popup lifetimes run in the background.
pub trait NotificationSink: Send + Sync {
    /// Rewinds the shared alert sound and plays it at `volume`.
    fn play_sound(&self, volume: f32) -> PortResult<()>;

    fn desktop_permission(&self) -> DesktopPermission;

    fn show_desktop(&self, request: DesktopRequest) -> PortResult<()>;

    /// Closes the popup shown under `tag`, if it is still up.
    fn dismiss_desktop(&self, _tag: &str) -> PortResult<()> {
        Ok(())
    }

    /// `Ok(None)` when nothing was ever stored.
    fn load_settings(&self) -> PortResult<Option<NotificationSettings>>;

    fn save_settings(&self, settings: &NotificationSettings) -> PortResult<()>;
}

/// A sink that does nothing. Useful for embedding without a host and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn play_sound(&self, _volume: f32) -> PortResult<()> {
        Ok(())
    }

    fn desktop_permission(&self) -> DesktopPermission {
        DesktopPermission::Denied
    }

    fn show_desktop(&self, _request: DesktopRequest) -> PortResult<()> {
        Ok(())
    }

    fn load_settings(&self) -> PortResult<Option<NotificationSettings>> {
        Ok(None)
    }

    fn save_settings(&self, _settings: &NotificationSettings) -> PortResult<()> {
        Ok(())
    }
}

//=========================================================================================
// Remote Services
//=========================================================================================

/// The REST endpoints used to sync user actions while the push link is down.
/// Every call is idempotent on the server.
#[async_trait]
pub trait RemoteSyncService: Send + Sync {
    async fn mark_read(&self, notification_id: &str) -> PortResult<()>;

    async fn mark_all_read(&self) -> PortResult<()>;

    async fn delete(&self, notification_id: &str) -> PortResult<()>;

    async fn clear_all(&self) -> PortResult<()>;
}
