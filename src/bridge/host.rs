//! Trusted-side bridge controller
//!
//! The host owns the embedded frame binding, runs the load-and-inject
//! sequence, listens for requests from the injected providers, and posts
//! every reply to the concrete origin of the bound frame. Origins are
//! checked before the frame is ever waited on, and a frame that fails any
//! step of the sequence ends in a terminal failed binding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::bridge::handlers::MethodHandlers;
use crate::bridge::protocol::{self, BridgeMessage, WalletMethod};
use crate::bridge::script::ProviderScript;
use crate::config::BridgeConfig;
use crate::origin;
use crate::prompt::PromptSurface;
use crate::sandbox::frame::EmbeddedFrame;
use crate::sandbox::message::{window_channel, Mailbox, WindowHandle};
use crate::wallet::WalletStateSource;

pub const ERR_UNTRUSTED_ORIGIN: &str =
    "Wallet provider injection blocked for security reasons: untrusted origin";
pub const ERR_LOAD_TIMEOUT: &str = "Iframe load timeout";
pub const ERR_INJECTION_FAILED: &str = "Failed to inject wallet providers";

/// Result of one injection attempt
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub injected_providers: Option<Vec<String>>,
}

impl InjectionOutcome {
    fn injected(providers: Vec<String>) -> Self {
        Self {
            success: true,
            error: None,
            injected_providers: Some(providers),
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            success: false,
            error: Some(message.to_string()),
            injected_providers: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingState {
    Loading,
    Loaded,
    Injecting,
    Injected,
    Failed,
}

/// Live association between this host and one embedded frame
struct FrameBinding {
    frame: EmbeddedFrame,
    state: BindingState,
    providers: Vec<String>,
}

pub struct BridgeHost {
    config: BridgeConfig,
    host_origin: String,
    window: WindowHandle,
    binding: Arc<Mutex<Option<FrameBinding>>>,
    router: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl BridgeHost {
    /// Create a host whose own document lives at `host_origin`. The
    /// request listener starts immediately and lives until
    /// [`BridgeHost::cleanup`].
    pub fn new(
        host_origin: &str,
        wallet: Arc<dyn WalletStateSource>,
        prompts: Arc<dyn PromptSurface>,
        config: BridgeConfig,
    ) -> Self {
        let (window, mailbox) = window_channel(host_origin);
        let binding: Arc<Mutex<Option<FrameBinding>>> = Arc::new(Mutex::new(None));
        let handlers = Arc::new(MethodHandlers::new(wallet, prompts));
        let router = Self::spawn_router(
            mailbox,
            Arc::clone(&binding),
            handlers,
            window.clone(),
            host_origin.to_string(),
        );
        Self {
            config,
            host_origin: host_origin.to_string(),
            window,
            binding,
            router: Mutex::new(Some(router)),
            disposed: AtomicBool::new(false),
        }
    }

    /// The host document's window endpoint, for embedding frames under it.
    pub fn window(&self) -> WindowHandle {
        self.window.clone()
    }

    /// Load-and-inject sequence for one embedded frame.
    ///
    /// The frame's origin is validated before any load wait, so an
    /// untrusted document is never even loaded on the bridge's behalf.
    /// Injecting into an already-injected frame is a no-op reporting the
    /// providers injected the first time.
    pub async fn inject_wallet_providers(&self, frame: &EmbeddedFrame) -> InjectionOutcome {
        if self.disposed.load(Ordering::Relaxed) {
            return InjectionOutcome::failure("Bridge host disposed");
        }

        {
            let mut binding = self.binding.lock().unwrap();
            match binding.as_ref() {
                Some(bound) if bound.frame.is_same(frame) => match bound.state {
                    BindingState::Injected => {
                        return InjectionOutcome::injected(bound.providers.clone());
                    }
                    BindingState::Failed => {
                        // A fresh attempt on the same frame starts a new binding.
                        *binding = Some(FrameBinding {
                            frame: frame.clone(),
                            state: BindingState::Loading,
                            providers: Vec::new(),
                        });
                    }
                    _ => return InjectionOutcome::failure("Injection already in progress"),
                },
                Some(_) => {
                    return InjectionOutcome::failure("Bridge host already bound to another frame")
                }
                None => {
                    *binding = Some(FrameBinding {
                        frame: frame.clone(),
                        state: BindingState::Loading,
                        providers: Vec::new(),
                    });
                }
            }
        }

        let src = frame.src();
        if !origin::is_allowed(&src) {
            log::warn!("🚫 refused wallet injection into untrusted origin: {}", src);
            self.set_state(BindingState::Failed);
            return InjectionOutcome::failure(ERR_UNTRUSTED_ORIGIN);
        }

        let mut ready = frame.ready_signal();
        match timeout(self.config.load_timeout(), ready.wait_for(|loaded| *loaded)).await {
            Ok(Ok(_)) => self.set_state(BindingState::Loaded),
            Ok(Err(_)) | Err(_) => {
                self.set_state(BindingState::Failed);
                return InjectionOutcome::failure(ERR_LOAD_TIMEOUT);
            }
        }

        self.set_state(BindingState::Injecting);
        let script = ProviderScript::build(&self.config);
        let providers = match timeout(self.config.load_timeout(), frame.attach_script(script)).await
        {
            Ok(Ok(providers)) => providers,
            Ok(Err(cause)) => {
                // Cause stays in the host's log; the caller sees only the
                // generic failure.
                log::error!("wallet provider injection failed: {}", cause);
                self.set_state(BindingState::Failed);
                return InjectionOutcome::failure(ERR_INJECTION_FAILED);
            }
            Err(_) => {
                log::error!("provider script never fired its load callback");
                self.set_state(BindingState::Failed);
                return InjectionOutcome::failure(ERR_INJECTION_FAILED);
            }
        };

        {
            let mut binding = self.binding.lock().unwrap();
            if let Some(bound) = binding.as_mut() {
                bound.state = BindingState::Injected;
                bound.providers = providers.clone();
            }
        }
        log::info!("🌉 wallet bridge injected into {}", src);
        InjectionOutcome::injected(providers)
    }

    pub fn is_injected(&self) -> bool {
        self.binding
            .lock()
            .unwrap()
            .as_ref()
            .map_or(false, |bound| bound.state == BindingState::Injected)
    }

    pub fn get_injected_providers(&self) -> Vec<String> {
        self.binding
            .lock()
            .unwrap()
            .as_ref()
            .map(|bound| bound.providers.clone())
            .unwrap_or_default()
    }

    /// Dispose the host: stop routing and drop the frame binding. Requests
    /// from the old frame go unanswered from here on.
    pub fn cleanup(&self) {
        self.disposed.store(true, Ordering::Relaxed);
        if let Some(handle) = self.router.lock().unwrap().take() {
            handle.abort();
        }
        *self.binding.lock().unwrap() = None;
        log::info!("bridge host disposed");
    }

    fn set_state(&self, state: BindingState) {
        let mut binding = self.binding.lock().unwrap();
        if let Some(bound) = binding.as_mut() {
            bound.state = state;
        }
    }

    fn spawn_router(
        mut mailbox: Mailbox,
        binding: Arc<Mutex<Option<FrameBinding>>>,
        handlers: Arc<MethodHandlers>,
        host_window: WindowHandle,
        host_origin: String,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = mailbox.recv().await {
                let frame = {
                    let binding = binding.lock().unwrap();
                    match binding.as_ref() {
                        Some(bound) if bound.state == BindingState::Injected => {
                            bound.frame.clone()
                        }
                        _ => continue,
                    }
                };

                // Only the bound frame's content window is listened to;
                // anything else gets no handler call and no reply.
                if message.source != frame.content_window().id() {
                    continue;
                }

                let Some(request) = protocol::parse_request(&message.data) else {
                    log::debug!("dropping malformed message from embedded frame");
                    continue;
                };

                let reply = match WalletMethod::parse(&request.method) {
                    Some(method) => match handlers.dispatch(method, &request.params).await {
                        Ok(result) => BridgeMessage::Response {
                            id: request.id,
                            result,
                        },
                        Err(error) => BridgeMessage::Error {
                            id: request.id,
                            error,
                        },
                    },
                    None => BridgeMessage::Error {
                        id: request.id,
                        error: format!("Unsupported method: {}", request.method),
                    },
                };

                let target = reply_target_origin(&frame, &host_origin);
                match serde_json::to_value(&reply) {
                    Ok(data) => frame.content_window().post_message(data, &target, &host_window),
                    Err(e) => log::error!("failed to encode bridge reply: {}", e),
                }
            }
        })
    }
}

/// The concrete origin replies are addressed to: the bound frame's current
/// resolved origin, or the host's own origin when the frame src cannot be
/// parsed. Never the wildcard.
fn reply_target_origin(frame: &EmbeddedFrame, host_origin: &str) -> String {
    origin::resolve_origin(&frame.src()).unwrap_or_else(|| host_origin.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_target_origin_resolves_frame_src() {
        let (parent, _mailbox) = window_channel("https://wallet.svmseek.com");
        let frame = EmbeddedFrame::new("http://localhost:3000/dapp", parent);
        assert_eq!(
            reply_target_origin(&frame, "https://wallet.svmseek.com"),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_reply_target_origin_falls_back_to_host() {
        let (parent, _mailbox) = window_channel("https://wallet.svmseek.com");
        let frame = EmbeddedFrame::new("not a url", parent);
        assert_eq!(
            reply_target_origin(&frame, "https://wallet.svmseek.com"),
            "https://wallet.svmseek.com"
        );
    }
}
