//! Untrusted-side wallet provider
//!
//! This is the code that runs inside the embedded document once the bridge
//! host injects it. It exposes the standard wallet-adapter surface
//! (`connect`, `disconnect`, the three signing methods) and turns each call
//! into a correlated request posted to the parent window. It holds no key
//! material and can produce no signature; everything it knows arrives in
//! `WALLET_RESPONSE` / `WALLET_ERROR` replies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::bridge::protocol::{self, BridgeMessage};
use crate::sandbox::message::{Mailbox, WindowHandle};

pub const EVENT_CONNECTED: &str = "wallet-connected";
pub const EVENT_DISCONNECTED: &str = "wallet-disconnected";
pub const EVENT_ERROR: &str = "wallet-error";

type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Shared plumbing behind every provider alias in one document:
/// correlation-id allocation, pending calls, the inbound message listener,
/// and the wallet event registry.
pub struct ProviderRuntime {
    own_window: WindowHandle,
    parent: WindowHandle,
    origin: String,
    request_timeout: Duration,
    next_request_id: AtomicU64,
    pending: Mutex<HashMap<String, oneshot::Sender<Result<Value, String>>>>,
    next_listener_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<(u64, EventCallback)>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ProviderRuntime {
    pub fn new(
        own_window: WindowHandle,
        parent: WindowHandle,
        origin: String,
        request_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            own_window,
            parent,
            origin,
            request_timeout,
            next_request_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
            pump: Mutex::new(None),
        })
    }

    /// Start the inbound message listener over the document's mailbox.
    pub fn spawn_pump(self: Arc<Self>, mut mailbox: Mailbox) {
        let runtime = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            while let Some(message) = mailbox.recv().await {
                // Only the parent window may answer; anything else is not
                // our bridge.
                if message.source != runtime.parent.id() {
                    continue;
                }
                let Some(object) = message.data.as_object() else {
                    log::debug!("ignoring non-object message from parent");
                    continue;
                };
                let Some(kind) = object.get("type").and_then(Value::as_str) else {
                    log::debug!("ignoring message without a string type from parent");
                    continue;
                };
                match protocol::parse_reply(&message.data) {
                    Some((id, outcome)) => runtime.resolve(&id, outcome),
                    None => log::debug!("ignoring parent message of type {}", kind),
                }
            }
        });
        *self.pump.lock().unwrap() = Some(handle);
    }

    fn resolve(&self, id: &str, outcome: Result<Value, String>) {
        let sender = self.pending.lock().unwrap().remove(id);
        match sender {
            Some(sender) => {
                if sender.send(outcome).is_err() {
                    log::debug!("pending call {} was already abandoned", id);
                }
            }
            None => log::debug!("no pending call for reply id {}", id),
        }
    }

    /// Send one correlated request to the parent and wait for its reply.
    ///
    /// The reply races the request deadline; whichever loses is dropped.
    /// Timing out removes the pending call so a late reply finds nothing.
    pub async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, String> {
        let id = format!(
            "req-{}",
            self.next_request_id.fetch_add(1, Ordering::Relaxed)
        );
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().unwrap().insert(id.clone(), sender);

        let message = BridgeMessage::Request {
            id: id.clone(),
            method: method.to_string(),
            params,
        };
        let data = match serde_json::to_value(&message) {
            Ok(data) => data,
            Err(e) => {
                self.pending.lock().unwrap().remove(&id);
                return Err(format!("Failed to encode wallet request: {}", e));
            }
        };
        self.parent
            .post_message(data, &self.origin, &self.own_window);

        match timeout(self.request_timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                self.pending.lock().unwrap().remove(&id);
                Err("Wallet bridge was torn down before responding".to_string())
            }
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(format!(
                    "Wallet request timed out waiting for a response: {}",
                    method
                ))
            }
        }
    }

    fn add_listener(&self, event: &str, callback: EventCallback) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    fn remove_listener(&self, event: &str, id: u64) {
        if let Some(callbacks) = self.listeners.lock().unwrap().get_mut(event) {
            callbacks.retain(|(listener_id, _)| *listener_id != id);
        }
    }

    fn dispatch_event(&self, event: &str, detail: &Value) {
        let callbacks: Vec<EventCallback> = self
            .listeners
            .lock()
            .unwrap()
            .get(event)
            .map(|callbacks| callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        for callback in callbacks {
            callback(detail);
        }
    }

    /// Detach the message listener and clear all pending calls. In-flight
    /// requests reject.
    pub fn cleanup(&self) {
        if let Some(handle) = self.pump.lock().unwrap().take() {
            handle.abort();
        }
        self.pending.lock().unwrap().clear();
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// The provider object the embedded dApp sees as `window.solana`,
/// `window.phantom.solana` and `window.svmseek`.
pub struct WalletProvider {
    connected: AtomicBool,
    public_key: Mutex<Option<String>>,
    runtime: Arc<ProviderRuntime>,
}

impl WalletProvider {
    pub fn new(runtime: Arc<ProviderRuntime>) -> Self {
        Self {
            connected: AtomicBool::new(false),
            public_key: Mutex::new(None),
            runtime,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn public_key(&self) -> Option<String> {
        self.public_key.lock().unwrap().clone()
    }

    fn reset_connection(&self) {
        self.connected.store(false, Ordering::Relaxed);
        *self.public_key.lock().unwrap() = None;
    }

    /// Generic correlated call to the host. The named methods below all go
    /// through here; the host decides what is answered and what is refused.
    pub async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, String> {
        self.runtime.request(method, params).await
    }

    /// Connect to the wallet. On success the provider carries the wallet's
    /// public key and `wallet-connected` fires; on failure the provider is
    /// left disconnected and `wallet-error` fires.
    pub async fn connect(&self) -> Result<String, String> {
        match self.runtime.request("connect", Vec::new()).await {
            Ok(result) => {
                let key = result
                    .get("publicKey")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                match key {
                    Some(key) => {
                        self.connected.store(true, Ordering::Relaxed);
                        *self.public_key.lock().unwrap() = Some(key.clone());
                        self.runtime
                            .dispatch_event(EVENT_CONNECTED, &json!({ "publicKey": key }));
                        Ok(key)
                    }
                    None => {
                        let error = "Connect response carried no public key".to_string();
                        self.reset_connection();
                        self.runtime
                            .dispatch_event(EVENT_ERROR, &json!({ "error": error }));
                        Err(error)
                    }
                }
            }
            Err(error) => {
                self.reset_connection();
                self.runtime
                    .dispatch_event(EVENT_ERROR, &json!({ "error": error }));
                Err(error)
            }
        }
    }

    /// Disconnect the dApp's view of the wallet. Local state resets whether
    /// or not the host call succeeds.
    pub async fn disconnect(&self) -> Result<(), String> {
        let outcome = self.runtime.request("disconnect", Vec::new()).await;
        self.reset_connection();
        self.runtime.dispatch_event(EVENT_DISCONNECTED, &Value::Null);
        outcome.map(|_| ())
    }

    pub async fn sign_transaction(&self, transaction: Value) -> Result<Value, String> {
        self.require_connected()?;
        self.runtime
            .request("signTransaction", vec![transaction])
            .await
    }

    pub async fn sign_all_transactions(&self, transactions: Vec<Value>) -> Result<Value, String> {
        self.require_connected()?;
        self.runtime
            .request("signAllTransactions", vec![Value::Array(transactions)])
            .await
    }

    pub async fn sign_message(&self, message: &[u8]) -> Result<Value, String> {
        self.require_connected()?;
        self.runtime.request("signMessage", vec![json!(message)]).await
    }

    fn require_connected(&self) -> Result<(), String> {
        if self.is_connected() {
            Ok(())
        } else {
            Err("Wallet not connected: call connect() first".to_string())
        }
    }

    /// Subscribe to a wallet event (`wallet-connected`,
    /// `wallet-disconnected`, `wallet-error`). Returns a listener id for
    /// [`WalletProvider::off`].
    pub fn on(&self, event: &str, callback: impl Fn(&Value) + Send + Sync + 'static) -> u64 {
        self.runtime.add_listener(event, Arc::new(callback))
    }

    pub fn off(&self, event: &str, listener_id: u64) {
        self.runtime.remove_listener(event, listener_id);
    }

    /// Detach from the bridge: stop listening and reject pending calls.
    pub fn cleanup(&self) {
        self.runtime.cleanup();
    }
}
