//! crates/notification_core/src/action.rs
//!
//! User actions carry both halves of an optimistic update: the local
//! repository mutation and the remote sync call.

use crate::ports::{PortResult, RemoteSyncService};
use crate::repository::NotificationRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    MarkRead(String),
    MarkAllRead,
    Delete(String),
    ClearAll,
}

impl Action {
    /// Applies the local half. Returns `true` if the repository changed.
    pub fn apply(&self, repository: &mut NotificationRepository) -> bool {
        match self {
            Action::MarkRead(id) => repository.mark_read(id),
            Action::MarkAllRead => repository.mark_all_read() > 0,
            Action::Delete(id) => repository.delete(id),
            Action::ClearAll => {
                let changed = !repository.is_empty();
                repository.clear_all();
                changed
            }
        }
    }

    /// Runs the remote half against the REST fallback.
    pub async fn sync_via(&self, remote: &dyn RemoteSyncService) -> PortResult<()> {
        match self {
            Action::MarkRead(id) => remote.mark_read(id).await,
            Action::MarkAllRead => remote.mark_all_read().await,
            Action::Delete(id) => remote.delete(id).await,
            Action::ClearAll => remote.clear_all().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Notification, NotificationCategory, NotificationType};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRemote {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteSyncService for RecordingRemote {
        async fn mark_read(&self, notification_id: &str) -> PortResult<()> {
            self.calls.lock().unwrap().push(format!("read {notification_id}"));
            Ok(())
        }

        async fn mark_all_read(&self) -> PortResult<()> {
            self.calls.lock().unwrap().push("read-all".to_string());
            Ok(())
        }

        async fn delete(&self, notification_id: &str) -> PortResult<()> {
            self.calls.lock().unwrap().push(format!("delete {notification_id}"));
            Ok(())
        }

        async fn clear_all(&self) -> PortResult<()> {
            self.calls.lock().unwrap().push("clear".to_string());
            Ok(())
        }
    }

    fn repo_with(ids: &[&str]) -> NotificationRepository {
        let mut repo = NotificationRepository::new();
        for id in ids {
            repo.prepend(Notification::new(
                Some(id.to_string()),
                "Payment received",
                "We received your EMI payment",
                NotificationType::Success,
                NotificationCategory::Payment,
            ));
        }
        repo
    }

    #[test]
    fn local_half_reports_changes() {
        let mut repo = repo_with(&["a", "b"]);
        assert!(Action::MarkRead("a".to_string()).apply(&mut repo));
        assert!(!Action::MarkRead("a".to_string()).apply(&mut repo));
        assert!(Action::MarkAllRead.apply(&mut repo));
        assert!(!Action::MarkAllRead.apply(&mut repo));
        assert!(Action::Delete("b".to_string()).apply(&mut repo));
        assert!(Action::ClearAll.apply(&mut repo));
        assert!(!Action::ClearAll.apply(&mut repo));
    }

    #[tokio::test]
    async fn remote_half_calls_matching_endpoint() {
        let remote = RecordingRemote::default();
        for action in [
            Action::MarkRead("a".to_string()),
            Action::MarkAllRead,
            Action::Delete("b".to_string()),
            Action::ClearAll,
        ] {
            action.sync_via(&remote).await.unwrap();
        }
        assert_eq!(
            *remote.calls.lock().unwrap(),
            ["read a", "read-all", "delete b", "clear"]
        );
    }
}
