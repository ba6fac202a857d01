//! services/notifier/src/client/dispatcher.rs
//!
//! Executes user actions: the local mutation first, then a best-effort sync
//! over the open socket or, when the link is down, over REST.

use crate::client::protocol::ClientMessage;
use crate::client::state::ClientState;
use crate::client::transport::Link;
use notification_core::Action;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How an action reached the server.
#[derive(Debug)]
pub enum SyncRoute {
    Socket,
    /// The REST call runs in the background; awaiting the handle is optional.
    Rest(JoinHandle<()>),
}

#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<ClientState>,
    link: Link,
}

impl Dispatcher {
    pub fn new(state: Arc<ClientState>, link: Link) -> Self {
        Self { state, link }
    }

    /// Applies `action` locally and starts the remote sync. Never waits on the
    /// network. A failed REST call is logged and not retried; the next backlog
    /// replace reconciles the two sides.
    pub async fn dispatch(&self, action: Action) -> SyncRoute {
        let changed = {
            let mut repository = self.state.repository.lock().await;
            action.apply(&mut repository)
        };
        if changed {
            self.state.touch();
        }
        if let Action::MarkRead(id) | Action::Delete(id) = &action {
            if let Err(e) = self.state.sink.dismiss_desktop(id) {
                debug!("Could not close popup {}: {}", id, e);
            }
        }

        if self.link.send(ClientMessage::from(&action)) {
            debug!("Synced {:?} over the push connection.", action);
            return SyncRoute::Socket;
        }

        let remote = self.state.remote.clone();
        SyncRoute::Rest(tokio::spawn(async move {
            match action.sync_via(remote.as_ref()).await {
                Ok(()) => debug!("Synced {:?} over REST.", action),
                Err(e) => warn!("REST sync of {:?} failed: {}", action, e),
            }
        }))
    }
}
