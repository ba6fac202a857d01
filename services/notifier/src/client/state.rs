//! services/notifier/src/client/state.rs
//!
//! Defines the state shared by the transport, the dispatcher and the panel.

use crate::client::protocol::{ClientMessage, ServerMessage};
use chrono::Utc;
use notification_core::{
    ArrivalPlan, Notification, NotificationRepository, NotificationSink, RemoteSyncService,
    SettingsStore,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

/// Created once per mounted client and passed to every task.
pub struct ClientState {
    pub repository: Mutex<NotificationRepository>,
    pub settings: Mutex<SettingsStore>,
    pub sink: Arc<dyn NotificationSink>,
    pub remote: Arc<dyn RemoteSyncService>,
    /// Bumped after every change to the repository or the settings.
    revision: watch::Sender<u64>,
}

impl ClientState {
    /// Loads the stored settings through the sink. The repository starts empty.
    pub fn new(sink: Arc<dyn NotificationSink>, remote: Arc<dyn RemoteSyncService>) -> Self {
        let settings = SettingsStore::load(sink.clone());
        let (revision, _) = watch::channel(0);
        Self {
            repository: Mutex::new(NotificationRepository::new()),
            settings: Mutex::new(settings),
            sink,
            remote,
            revision,
        }
    }

    /// A receiver that wakes on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn touch(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    pub async fn unread_count(&self) -> usize {
        self.repository.lock().await.unread_count()
    }

    /// Applies one inbound message. Returns the reply to send, if any.
    pub async fn handle_server_message(&self, message: ServerMessage) -> Option<ClientMessage> {
        match message {
            ServerMessage::Ping => return Some(ClientMessage::Pong),
            ServerMessage::NotificationsList { notifications } => {
                let list: Vec<Notification> = notifications.into_iter().map(Into::into).collect();
                info!("Backlog received with {} notifications.", list.len());
                let mut repository = self.repository.lock().await;
                repository.replace_all(list);
                repository.purge_expired(Utc::now());
            }
            ServerMessage::NewNotification { notification } => {
                let notification = Notification::from(notification);
                debug!(
                    "New notification {} in {}.",
                    notification.id, notification.category
                );
                let plan = {
                    let settings = self.settings.lock().await;
                    ArrivalPlan::for_notification(
                        settings.get(),
                        &notification,
                        self.sink.desktop_permission(),
                    )
                };
                plan.execute(self.sink.as_ref());
                self.repository.lock().await.prepend(notification);
            }
            ServerMessage::NotificationRead { notification_id } => {
                if !self.repository.lock().await.mark_read(&notification_id) {
                    return None;
                }
            }
        }
        self.touch();
        None
    }
}
