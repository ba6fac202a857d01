pub mod dispatcher;
pub mod panel;
pub mod protocol;
pub mod state;
pub mod transport;

// Re-export the pieces a front-end needs to mount the client.
pub use dispatcher::{Dispatcher, SyncRoute};
pub use panel::{NotificationPanel, NotificationRow};
pub use state::ClientState;
pub use transport::{Connector, Link};
