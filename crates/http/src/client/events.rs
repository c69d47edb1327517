//! Session lifecycle notifications
//!
//! The client never decides what the user sees when a session ends. It
//! publishes an event and the presentation layer reacts (show a login
//! screen, print a hint, stop its pollers).

use tokio::sync::broadcast;

/// Lifecycle changes of the stored session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login stored a fresh credential pair
    LoggedIn,
    /// A refresh exchange minted a new access credential
    Refreshed,
    /// The user logged out explicitly
    LoggedOut,
    /// Credentials were purged after an unrecoverable 401
    Expired,
}

const CHANNEL_CAPACITY: usize = 16;

/// Fan-out of session events to any number of subscribers
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
