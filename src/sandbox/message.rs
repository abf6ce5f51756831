//! Cross-context message channel
//!
//! The host document and the embedded document run as independent event-loop
//! contexts with no shared memory. Each context owns a window endpoint;
//! everything that crosses the boundary travels as a posted JSON value
//! stamped with the sender's window id and origin. Delivery honors the
//! target origin: a message addressed to an origin the receiving window no
//! longer has is dropped, not delivered.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Wildcard target origin. Recognized on delivery, never sent by this crate.
pub const ANY_ORIGIN: &str = "*";

/// Process-unique identifier of one window endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

impl WindowId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        WindowId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// One message as seen by the receiving window
#[derive(Debug, Clone)]
pub struct PostedMessage {
    /// Window that sent the message
    pub source: WindowId,
    /// Sender's origin at send time
    pub origin: String,
    /// Target origin the sender addressed
    pub target_origin: String,
    /// JSON payload
    pub data: Value,
}

/// Sending half of a window endpoint. Cheap to clone.
#[derive(Clone)]
pub struct WindowHandle {
    id: WindowId,
    origin: Arc<Mutex<String>>,
    sender: mpsc::UnboundedSender<PostedMessage>,
}

/// Receiving half of a window endpoint
pub struct Mailbox {
    receiver: mpsc::UnboundedReceiver<PostedMessage>,
}

/// Create a window endpoint with the given origin.
pub fn window_channel(origin: &str) -> (WindowHandle, Mailbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let handle = WindowHandle {
        id: WindowId::next(),
        origin: Arc::new(Mutex::new(origin.to_string())),
        sender,
    };
    (handle, Mailbox { receiver })
}

impl WindowHandle {
    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn origin(&self) -> String {
        self.origin.lock().unwrap().clone()
    }

    /// Update the window's origin (the document navigated).
    pub fn set_origin(&self, origin: &str) {
        *self.origin.lock().unwrap() = origin.to_string();
    }

    /// Post `data` to this window, addressed to `target_origin`.
    ///
    /// The message is delivered only if `target_origin` matches the
    /// window's current origin (or is the wildcard). A mismatch drops the
    /// message silently; a navigated-away listener never sees it.
    pub fn post_message(&self, data: Value, target_origin: &str, from: &WindowHandle) {
        if target_origin != ANY_ORIGIN && target_origin != *self.origin.lock().unwrap() {
            log::debug!(
                "dropping message addressed to {} (window origin changed)",
                target_origin
            );
            return;
        }
        let message = PostedMessage {
            source: from.id,
            origin: from.origin(),
            target_origin: target_origin.to_string(),
            data,
        };
        // Receiver gone means the context was torn down; nothing to notify.
        let _ = self.sender.send(message);
    }
}

impl Mailbox {
    /// Receive the next message, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<PostedMessage> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, for draining in tests.
    pub fn try_recv(&mut self) -> Option<PostedMessage> {
        self.receiver.try_recv().ok()
    }
}
