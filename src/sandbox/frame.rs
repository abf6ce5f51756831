//! Embedded frame and document model
//!
//! An `EmbeddedFrame` is the host-side handle to one sandboxed document.
//! The document owns the untrusted side of the message channel, the global
//! namespace wallet providers are registered into, and the marker flag that
//! guards against double injection. Navigation replaces the document
//! wholesale: new origin, new channel, empty globals.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::bridge::provider::WalletProvider;
use crate::bridge::script::ProviderScript;
use crate::origin;
use crate::sandbox::message::{window_channel, Mailbox, WindowHandle};

/// Origin string of a document whose URL cannot be parsed
const OPAQUE_ORIGIN: &str = "null";

#[derive(Default)]
struct Globals {
    wallet_injected: bool,
    providers: HashMap<String, Arc<WalletProvider>>,
}

/// The untrusted document currently loaded in a frame
pub struct Document {
    origin: String,
    window: WindowHandle,
    parent: WindowHandle,
    mailbox: Mutex<Option<Mailbox>>,
    globals: Mutex<Globals>,
}

impl Document {
    fn new(src: &str, parent: WindowHandle) -> Arc<Self> {
        let origin = origin::resolve_origin(src).unwrap_or_else(|| OPAQUE_ORIGIN.to_string());
        let (window, mailbox) = window_channel(&origin);
        Arc::new(Self {
            origin,
            window,
            parent,
            mailbox: Mutex::new(Some(mailbox)),
            globals: Mutex::new(Globals::default()),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The document's own window endpoint
    pub fn window(&self) -> WindowHandle {
        self.window.clone()
    }

    /// The hosting document's window endpoint
    pub fn parent(&self) -> WindowHandle {
        self.parent.clone()
    }

    /// Take the document's inbox. Consumed once, by the provider script's
    /// message listener.
    pub fn take_mailbox(&self) -> Option<Mailbox> {
        self.mailbox.lock().unwrap().take()
    }

    /// Marker flag: have wallet providers been injected into this document?
    pub fn is_wallet_injected(&self) -> bool {
        self.globals.lock().unwrap().wallet_injected
    }

    pub fn mark_wallet_injected(&self) {
        self.globals.lock().unwrap().wallet_injected = true;
    }

    /// Register a provider under a global name (`solana`, `phantom.solana`,
    /// `svmseek`).
    pub fn register_provider(&self, name: &str, provider: Arc<WalletProvider>) {
        self.globals
            .lock()
            .unwrap()
            .providers
            .insert(name.to_string(), provider);
    }

    /// Look up an injected provider by its global name.
    pub fn provider(&self, name: &str) -> Option<Arc<WalletProvider>> {
        self.globals.lock().unwrap().providers.get(name).cloned()
    }

    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .globals
            .lock()
            .unwrap()
            .providers
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Tear the document down: detach provider listeners and clear globals.
    fn unload(&self) {
        let providers = {
            let mut globals = self.globals.lock().unwrap();
            globals.wallet_injected = false;
            std::mem::take(&mut globals.providers)
        };
        for provider in providers.values() {
            provider.cleanup();
        }
    }
}

struct FrameInner {
    src: Mutex<String>,
    parent: WindowHandle,
    ready: watch::Sender<bool>,
    script_access: AtomicBool,
    document: Mutex<Arc<Document>>,
}

/// Host-side handle to one sandboxed embedded frame. Cheap to clone; all
/// clones refer to the same frame.
#[derive(Clone)]
pub struct EmbeddedFrame {
    inner: Arc<FrameInner>,
}

impl EmbeddedFrame {
    /// Create a frame navigated to `src`, child of `parent`. The document
    /// starts in the loading state; the embedder signals readiness with
    /// [`EmbeddedFrame::notify_loaded`].
    pub fn new(src: &str, parent: WindowHandle) -> Self {
        let document = Document::new(src, parent.clone());
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(FrameInner {
                src: Mutex::new(src.to_string()),
                parent,
                ready,
                script_access: AtomicBool::new(true),
                document: Mutex::new(document),
            }),
        }
    }

    pub fn src(&self) -> String {
        self.inner.src.lock().unwrap().clone()
    }

    pub fn document(&self) -> Arc<Document> {
        self.inner.document.lock().unwrap().clone()
    }

    /// The content window of the current document
    pub fn content_window(&self) -> WindowHandle {
        self.document().window()
    }

    /// Whether both handles refer to the same frame
    pub fn is_same(&self, other: &EmbeddedFrame) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Signal that the current document finished loading.
    pub fn notify_loaded(&self) {
        self.inner.ready.send_replace(true);
    }

    /// Watch the document's ready state.
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.inner.ready.subscribe()
    }

    /// Allow or deny script access to the document. A sandboxed or
    /// cross-origin document denies access, which makes
    /// [`EmbeddedFrame::attach_script`] fail the way touching such a
    /// document throws in a browser.
    pub fn set_script_access(&self, allowed: bool) {
        self.inner.script_access.store(allowed, Ordering::Relaxed);
    }

    /// Navigate the frame to a new URL. The old document is unloaded (its
    /// provider listeners detach, pending calls reject) and replaced by a
    /// fresh one with no injected state.
    pub fn navigate(&self, src: &str) {
        let old = {
            let mut document = self.inner.document.lock().unwrap();
            let old = document.clone();
            *self.inner.src.lock().unwrap() = src.to_string();
            *document = Document::new(src, self.inner.parent.clone());
            old
        };
        old.unload();
        self.inner.ready.send_replace(false);
    }

    /// Attach a provider script to the document head and wait for its
    /// load/error outcome. The script resource is released as soon as the
    /// outcome is known.
    pub async fn attach_script(&self, script: ProviderScript) -> Result<Vec<String>, String> {
        if !self.inner.script_access.load(Ordering::Relaxed) {
            return Err("embedded document denied script access".to_string());
        }
        script.install(&self.document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::message::window_channel;

    fn parent() -> WindowHandle {
        window_channel("http://localhost:3000").0
    }

    #[tokio::test]
    async fn test_document_origin_from_src() {
        let frame = EmbeddedFrame::new("http://localhost:3000/dapp?x=1", parent());
        assert_eq!(frame.document().origin(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_unparsable_src_gets_opaque_origin() {
        let frame = EmbeddedFrame::new("not a url", parent());
        assert_eq!(frame.document().origin(), "null");
    }

    #[tokio::test]
    async fn test_ready_signal() {
        let frame = EmbeddedFrame::new("http://localhost:3000", parent());
        let mut ready = frame.ready_signal();
        assert!(!*ready.borrow());

        frame.notify_loaded();
        ready.wait_for(|loaded| *loaded).await.unwrap();
    }

    #[tokio::test]
    async fn test_navigation_replaces_document() {
        let frame = EmbeddedFrame::new("http://localhost:3000", parent());
        let before = frame.document();
        before.mark_wallet_injected();

        frame.navigate("https://app.svmseek.com");

        let after = frame.document();
        assert_eq!(after.origin(), "https://app.svmseek.com");
        assert!(!after.is_wallet_injected());
        assert!(!*frame.ready_signal().borrow());
        assert_ne!(before.window().id(), after.window().id());
    }

    #[tokio::test]
    async fn test_mailbox_taken_once() {
        let frame = EmbeddedFrame::new("http://localhost:3000", parent());
        let document = frame.document();
        assert!(document.take_mailbox().is_some());
        assert!(document.take_mailbox().is_none());
    }
}
