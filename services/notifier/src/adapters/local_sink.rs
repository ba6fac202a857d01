//! services/notifier/src/adapters/local_sink.rs
//!
//! This module contains the local host adapter. It implements the
//! `NotificationSink` port from the `core` crate: the terminal bell stands in
//! for the alert sound, desktop popups are written to the log, and settings
//! live in a JSON file.

use crate::client::protocol::WireCategory;
use notification_core::domain::{DesktopPermission, NotificationSettings};
use notification_core::ports::{DesktopRequest, NotificationSink, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

//=========================================================================================
// Stored Settings Document
//=========================================================================================

/// The flat object written to the settings file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct SettingsDocument {
    sound_enabled: bool,
    sound_volume: f32,
    desktop_enabled: bool,
    #[serde(default)]
    categories: BTreeMap<WireCategory, bool>,
}

impl SettingsDocument {
    fn to_domain(self) -> NotificationSettings {
        let mut settings = NotificationSettings {
            sound_enabled: self.sound_enabled,
            sound_volume: self.sound_volume,
            desktop_enabled: self.desktop_enabled,
            ..NotificationSettings::default()
        };
        settings
            .categories
            .extend(self.categories.into_iter().map(|(c, on)| (c.into(), on)));
        settings
    }

    fn from_domain(settings: &NotificationSettings) -> Self {
        Self {
            sound_enabled: settings.sound_enabled,
            sound_volume: settings.sound_volume,
            desktop_enabled: settings.desktop_enabled,
            categories: settings
                .categories
                .iter()
                .map(|(c, on)| ((*c).into(), *on))
                .collect(),
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// One popup on screen. `timer` is `None` for popups that stay until dismissed.
struct Popup {
    serial: u64,
    timer: Option<JoinHandle<()>>,
}

impl Popup {
    fn is_showing(&self) -> bool {
        self.timer.as_ref().map_or(true, |t| !t.is_finished())
    }
}

type Popups = Arc<Mutex<HashMap<String, Popup>>>;

/// An adapter that implements the `NotificationSink` port for a terminal session.
#[derive(Clone)]
pub struct LocalSink {
    settings_path: PathBuf,
    permission: DesktopPermission,
    bell: bool,
    popups: Popups,
    serials: Arc<AtomicU64>,
}

impl LocalSink {
    /// Creates a new `LocalSink` storing settings at `settings_path`.
    pub fn new(settings_path: impl Into<PathBuf>, permission: DesktopPermission) -> Self {
        Self {
            settings_path: settings_path.into(),
            permission,
            bell: true,
            popups: Arc::new(Mutex::new(HashMap::new())),
            serials: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Disables the terminal bell (useful when stderr is not a terminal).
    pub fn without_bell(mut self) -> Self {
        self.bell = false;
        self
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Tags of the popups currently on screen.
    pub fn active_popups(&self) -> Vec<String> {
        let Ok(mut popups) = self.popups.lock() else {
            return Vec::new();
        };
        popups.retain(|_, popup| popup.is_showing());
        let mut tags: Vec<String> = popups.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Closes a popup by hand, as a user click on its close button would.
    pub fn dismiss(&self, tag: &str) {
        if let Ok(mut popups) = self.popups.lock() {
            if let Some(Popup { timer: Some(timer), .. }) = popups.remove(tag) {
                timer.abort();
            }
        }
    }
}

//=========================================================================================
// `NotificationSink` Trait Implementation
//=========================================================================================

impl NotificationSink for LocalSink {
    fn play_sound(&self, volume: f32) -> PortResult<()> {
        if !self.bell || volume <= 0.0 {
            return Ok(());
        }
        let mut stderr = io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|e| PortError::Unavailable(e.to_string()))
    }

    fn desktop_permission(&self) -> DesktopPermission {
        self.permission
    }

    fn show_desktop(&self, request: DesktopRequest) -> PortResult<()> {
        if self.permission != DesktopPermission::Granted {
            return Err(PortError::Unavailable(
                "desktop notifications are not permitted".to_string(),
            ));
        }

        info!(
            target: "desktop",
            tag = %request.tag,
            action_url = request.action_url.as_deref().unwrap_or(""),
            "{}: {}",
            request.title,
            request.body
        );

        let serial = self.serials.fetch_add(1, Ordering::Relaxed);
        let timer = match (request.auto_dismiss, tokio::runtime::Handle::try_current()) {
            (Some(after), Ok(runtime)) => {
                let tag = request.tag.clone();
                let popups = Arc::clone(&self.popups);
                Some(runtime.spawn(async move {
                    tokio::time::sleep(after).await;
                    info!(target: "desktop", tag = %tag, "Popup dismissed.");
                    if let Ok(mut popups) = popups.lock() {
                        // A newer popup may have taken the tag meanwhile.
                        if popups.get(&tag).is_some_and(|p| p.serial == serial) {
                            popups.remove(&tag);
                        }
                    }
                }))
            }
            _ => None,
        };

        let mut popups = self
            .popups
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        popups.retain(|_, popup| popup.is_showing());
        // Same tag: the new popup replaces the old one.
        if let Some(Popup { timer: Some(previous), .. }) =
            popups.insert(request.tag, Popup { serial, timer })
        {
            previous.abort();
        }
        Ok(())
    }

    fn dismiss_desktop(&self, tag: &str) -> PortResult<()> {
        self.dismiss(tag);
        Ok(())
    }

    fn load_settings(&self) -> PortResult<Option<NotificationSettings>> {
        let raw = match std::fs::read_to_string(&self.settings_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        serde_json::from_str::<SettingsDocument>(&raw)
            .map(|doc| Some(doc.to_domain()))
            .map_err(|e| PortError::Malformed(e.to_string()))
    }

    fn save_settings(&self, settings: &NotificationSettings) -> PortResult<()> {
        if let Some(parent) = self.settings_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
            }
        }
        let json = serde_json::to_string_pretty(&SettingsDocument::from_domain(settings))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        std::fs::write(&self.settings_path, json).map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notification_core::domain::NotificationCategory;
    use notification_core::{SettingsPatch, SettingsStore};
    use std::time::Duration;

    fn sink_in(dir: &tempfile::TempDir) -> LocalSink {
        LocalSink::new(dir.path().join("prefs/settings.json"), DesktopPermission::Granted)
            .without_bell()
    }

    fn popup(tag: &str, auto_dismiss: Option<Duration>) -> DesktopRequest {
        DesktopRequest {
            tag: tag.to_string(),
            title: "Document verified".to_string(),
            body: "Your PAN card was verified".to_string(),
            action_url: None,
            auto_dismiss,
        }
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sink_in(&dir).load_settings().unwrap().is_none());
    }

    #[test]
    fn settings_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(sink_in(&dir));

        let mut store = SettingsStore::load(sink.clone());
        store.update(SettingsPatch::desktop(false));
        store.update(SettingsPatch::volume(0.4));
        store.update(SettingsPatch::category(NotificationCategory::Promotional, true));
        let written = store.get().clone();

        let fresh = SettingsStore::load(Arc::new(sink_in(&dir)));
        assert_eq!(fresh.get(), &written);
    }

    #[test]
    fn file_is_flat_camel_case_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir);
        sink.save_settings(&NotificationSettings::default()).unwrap();

        let raw = std::fs::read_to_string(sink.settings_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["soundEnabled"], true);
        assert_eq!(value["desktopEnabled"], true);
        assert_eq!(value["categories"]["PROMOTIONAL"], false);
        assert_eq!(value["categories"]["LOAN"], true);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir);
        std::fs::create_dir_all(sink.settings_path().parent().unwrap()).unwrap();
        std::fs::write(sink.settings_path(), "{\"soundEnabled\": \"loud\"").unwrap();

        assert!(matches!(sink.load_settings(), Err(PortError::Malformed(_))));
        let store = SettingsStore::load(Arc::new(sink));
        assert_eq!(store.get(), &NotificationSettings::default());
    }

    #[test]
    fn popups_need_permission() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path().join("s.json"), DesktopPermission::Denied);
        assert!(sink.show_desktop(popup("a", None)).is_err());
        assert!(sink.active_popups().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn same_tag_replaces_and_unimportant_popups_close() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir);

        sink.show_desktop(popup("n1", Some(Duration::from_secs(5)))).unwrap();
        sink.show_desktop(popup("n1", Some(Duration::from_secs(5)))).unwrap();
        sink.show_desktop(popup("n2", None)).unwrap();
        assert_eq!(sink.active_popups(), ["n1", "n2"]);

        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert_eq!(sink.active_popups(), ["n2"]);

        sink.dismiss("n2");
        assert!(sink.active_popups().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismissed_popups_leave_no_entries_behind() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir);

        for i in 0..200 {
            sink.show_desktop(popup(&format!("n{i}"), Some(Duration::from_secs(5))))
                .unwrap();
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert!(sink.popups.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn old_timer_does_not_close_replacement() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(&dir);

        sink.show_desktop(popup("n1", Some(Duration::from_secs(5)))).unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;
        sink.show_desktop(popup("n1", None)).unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert_eq!(sink.active_popups(), ["n1"]);

        sink.dismiss_desktop("n1").unwrap();
        assert!(sink.popups.lock().unwrap().is_empty());
    }
}
