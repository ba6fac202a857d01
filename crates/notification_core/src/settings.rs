//! crates/notification_core/src/settings.rs
//!
//! Single source of truth for notification preferences. Every update is
//! written straight back through the sink.

use crate::domain::{NotificationCategory, NotificationSettings};
use crate::ports::NotificationSink;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A shallow partial update. `None` leaves the field untouched; category
/// entries are merged key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub sound_enabled: Option<bool>,
    pub sound_volume: Option<f32>,
    pub desktop_enabled: Option<bool>,
    pub categories: BTreeMap<NotificationCategory, bool>,
}

impl SettingsPatch {
    pub fn sound(enabled: bool) -> Self {
        Self {
            sound_enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn volume(volume: f32) -> Self {
        Self {
            sound_volume: Some(volume),
            ..Self::default()
        }
    }

    pub fn desktop(enabled: bool) -> Self {
        Self {
            desktop_enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn category(category: NotificationCategory, enabled: bool) -> Self {
        Self {
            categories: BTreeMap::from([(category, enabled)]),
            ..Self::default()
        }
    }
}

pub struct SettingsStore {
    current: NotificationSettings,
    sink: Arc<dyn NotificationSink>,
}

impl SettingsStore {
    /// Reads the stored preferences, falling back to the defaults when
    /// nothing was stored or the stored value cannot be read.
    pub fn load(sink: Arc<dyn NotificationSink>) -> Self {
        let current = match sink.load_settings() {
            Ok(Some(settings)) => sanitize(settings),
            Ok(None) => {
                debug!("No stored notification settings, using defaults.");
                NotificationSettings::default()
            }
            Err(e) => {
                warn!("Discarding stored notification settings: {}", e);
                NotificationSettings::default()
            }
        };
        Self { current, sink }
    }

    pub fn get(&self) -> &NotificationSettings {
        &self.current
    }

    /// Merges `patch` and persists the full object. A failed write is logged
    /// and the in-memory value is kept.
    pub fn update(&mut self, patch: SettingsPatch) -> &NotificationSettings {
        if let Some(enabled) = patch.sound_enabled {
            self.current.sound_enabled = enabled;
        }
        if let Some(volume) = patch.sound_volume {
            self.current.sound_volume = volume;
        }
        if let Some(enabled) = patch.desktop_enabled {
            self.current.desktop_enabled = enabled;
        }
        self.current.categories.extend(patch.categories);
        self.current = sanitize(std::mem::take(&mut self.current));

        if let Err(e) = self.sink.save_settings(&self.current) {
            warn!("Failed to persist notification settings: {}", e);
        }
        &self.current
    }
}

fn sanitize(mut settings: NotificationSettings) -> NotificationSettings {
    settings.sound_volume = if settings.sound_volume.is_finite() {
        settings.sound_volume.clamp(0.0, 1.0)
    } else {
        NotificationSettings::DEFAULT_VOLUME
    };
    settings
}
