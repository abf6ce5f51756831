//! User-facing prompt surface for blocked dApp requests
//!
//! When an embedded page asks for an operation the bridge refuses, the host
//! raises a prompt carrying the explanation and the recovery actions the UI
//! should offer. The bridge never blocks on the prompt; it is fire-and-forget
//! from the handler's point of view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Actions the UI offers the user when a request was blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Open the trusted SVMSeek wallet UI
    OpenWallet,
    /// Show an explanation of why signing is blocked in embedded pages
    LearnMore,
    Dismiss,
}

/// A structured prompt describing one blocked request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedRequestPrompt {
    pub title: String,
    pub message: String,
    pub actions: Vec<RecoveryAction>,
}

/// Surface the bridge notifies when a blocked operation occurs
#[async_trait]
pub trait PromptSurface: Send + Sync {
    async fn raise(&self, prompt: BlockedRequestPrompt);
}

/// Adapter that forwards prompts into a channel the host UI drains,
/// the same way pending signing requests queue up for the wallet view.
pub struct PromptChannel {
    sender: mpsc::UnboundedSender<BlockedRequestPrompt>,
}

impl PromptChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BlockedRequestPrompt>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl PromptSurface for PromptChannel {
    async fn raise(&self, prompt: BlockedRequestPrompt) {
        if self.sender.send(prompt).is_err() {
            log::warn!("prompt surface receiver dropped; blocked-request prompt lost");
        }
    }
}
