//! crates/notification_core/src/arrival.rs
//!
//! Side effects of a live-pushed notification: the alert sound and the
//! desktop popup. Backlog replays never go through here.

use crate::domain::{DesktopPermission, Notification, NotificationSettings};
use crate::ports::{DesktopRequest, NotificationSink};
use std::time::Duration;
use tracing::debug;

/// How long an unimportant desktop popup stays up.
pub const AUTO_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// What to do for one arrival, decided from the current settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrivalPlan {
    /// Volume to play the alert at.
    pub sound: Option<f32>,
    pub desktop: Option<DesktopRequest>,
}

impl ArrivalPlan {
    pub fn for_notification(
        settings: &NotificationSettings,
        notification: &Notification,
        permission: DesktopPermission,
    ) -> Self {
        if !settings.is_category_enabled(notification.category) {
            return Self::default();
        }

        let sound = settings.sound_enabled.then_some(settings.sound_volume);

        let desktop = (settings.desktop_enabled && permission == DesktopPermission::Granted)
            .then(|| DesktopRequest {
                tag: notification.id.clone(),
                title: notification.title.clone(),
                body: notification.message.clone(),
                action_url: notification.action_url.clone(),
                auto_dismiss: (!notification.is_important).then_some(AUTO_DISMISS_AFTER),
            });

        Self { sound, desktop }
    }

    pub fn is_silent(&self) -> bool {
        self.sound.is_none() && self.desktop.is_none()
    }

    /// Performs the plan. Playback and popup failures degrade to a no-op.
    pub fn execute(self, sink: &dyn NotificationSink) {
        if let Some(volume) = self.sound {
            if let Err(e) = sink.play_sound(volume) {
                debug!("Alert sound blocked: {}", e);
            }
        }
        if let Some(request) = self.desktop {
            if let Err(e) = sink.show_desktop(request) {
                debug!("Desktop notification not shown: {}", e);
            }
        }
    }
}
