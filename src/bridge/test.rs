//! End-to-end bridge scenarios: host, frame, injected providers and the
//! message channel wired together the way the wallet runs them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::bridge::host::{BridgeHost, ERR_INJECTION_FAILED, ERR_LOAD_TIMEOUT, ERR_UNTRUSTED_ORIGIN};
use crate::bridge::script::GLOBAL_SOLANA;
use crate::config::BridgeConfig;
use crate::prompt::{BlockedRequestPrompt, PromptChannel, RecoveryAction};
use crate::sandbox::frame::EmbeddedFrame;
use crate::sandbox::message::window_channel;
use crate::wallet::WalletStateSource;

const HOST_ORIGIN: &str = "http://localhost:3000";
const MOCK_PUBLIC_KEY: &str = "mock-public-key-123456789";

struct MockWalletState {
    public_key: Option<String>,
}

#[async_trait]
impl WalletStateSource for MockWalletState {
    async fn connected_public_key(&self) -> Option<String> {
        self.public_key.clone()
    }
}

fn testbed(
    src: &str,
    public_key: Option<&str>,
    config: BridgeConfig,
) -> (
    BridgeHost,
    EmbeddedFrame,
    UnboundedReceiver<BlockedRequestPrompt>,
) {
    let wallet = Arc::new(MockWalletState {
        public_key: public_key.map(str::to_string),
    });
    let (prompts, receiver) = PromptChannel::new();
    let host = BridgeHost::new(HOST_ORIGIN, wallet, Arc::new(prompts), config);
    let frame = EmbeddedFrame::new(src, host.window());
    (host, frame, receiver)
}

#[tokio::test]
async fn test_inject_into_allowed_frame() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();

    let outcome = host.inject_wallet_providers(&frame).await;
    assert!(outcome.success);
    assert_eq!(outcome.error, None);
    assert_eq!(
        outcome.injected_providers.unwrap(),
        vec!["solana", "phantom", "svmseek"]
    );

    assert!(host.is_injected());
    assert!(frame.document().is_wallet_injected());
    assert_eq!(
        frame.document().global_names(),
        vec!["phantom.solana", "solana", "svmseek"]
    );
}

#[tokio::test]
async fn test_double_injection_is_idempotent() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();

    let first = host.inject_wallet_providers(&frame).await;
    let second = host.inject_wallet_providers(&frame).await;
    assert!(first.success);
    assert!(second.success);
    assert_eq!(first.injected_providers, second.injected_providers);

    // Three providers, never six.
    assert_eq!(host.get_injected_providers().len(), 3);
    assert_eq!(frame.document().global_names().len(), 3);
}

#[tokio::test]
async fn test_untrusted_origin_blocked_before_any_load() {
    let (host, frame, _prompts) = testbed(
        "https://malicious-site.example",
        Some(MOCK_PUBLIC_KEY),
        BridgeConfig::default(),
    );
    // The frame never even finishes loading; the check must not wait on it.

    let outcome = host.inject_wallet_providers(&frame).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some(ERR_UNTRUSTED_ORIGIN));
    assert!(outcome.error.unwrap().contains("untrusted origin"));

    assert!(!host.is_injected());
    // The document was never touched.
    assert!(!frame.document().is_wallet_injected());
    assert!(frame.document().take_mailbox().is_some());
}

#[tokio::test]
async fn test_frame_load_timeout() {
    let config = BridgeConfig {
        load_timeout_ms: 50,
        ..BridgeConfig::default()
    };
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), config);
    // notify_loaded never fires.

    let outcome = host.inject_wallet_providers(&frame).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some(ERR_LOAD_TIMEOUT));
}

#[tokio::test]
async fn test_denied_script_access_reports_generic_failure() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.set_script_access(false);
    frame.notify_loaded();

    let outcome = host.inject_wallet_providers(&frame).await;
    assert!(!outcome.success);
    // The underlying cause never crosses the boundary.
    assert_eq!(outcome.error.as_deref(), Some(ERR_INJECTION_FAILED));
}

#[tokio::test]
async fn test_second_frame_rejected_while_bound() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);

    let other = EmbeddedFrame::new(HOST_ORIGIN, host.window());
    other.notify_loaded();
    let outcome = host.inject_wallet_providers(&other).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("already bound"));
}

#[tokio::test]
async fn test_connect_round_trip() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);

    let provider = frame.document().provider(GLOBAL_SOLANA).unwrap();
    let key = provider.connect().await.unwrap();
    assert_eq!(key, MOCK_PUBLIC_KEY);
    assert!(provider.is_connected());
    assert_eq!(provider.public_key().as_deref(), Some(MOCK_PUBLIC_KEY));
}

#[tokio::test]
async fn test_connect_without_wallet() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, None, BridgeConfig::default());
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);

    let provider = frame.document().provider(GLOBAL_SOLANA).unwrap();
    let error = provider.connect().await.unwrap_err();
    assert_eq!(error, "No wallet connected to SVMSeek");
    assert!(!provider.is_connected());
}

#[tokio::test]
async fn test_signing_refused_with_prompt() {
    let (host, frame, mut prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);

    let provider = frame.document().provider(GLOBAL_SOLANA).unwrap();
    provider.connect().await.unwrap();

    let error = provider.sign_transaction(json!("AQAB")).await.unwrap_err();
    assert!(error.contains("Open SVMSeek"), "unexpected error: {}", error);

    let prompt = prompts.recv().await.unwrap();
    assert_eq!(prompt.title, "Transaction signing blocked");
    assert!(prompt.actions.contains(&RecoveryAction::OpenWallet));

    // Params never change the answer, and the reply is always an error.
    let error = provider
        .request("signMessage", vec![json!([1, 2, 3]), json!("extra")])
        .await
        .unwrap_err();
    assert!(error.contains("Open SVMSeek"));
    assert!(prompts.recv().await.is_some());

    let error = provider
        .sign_all_transactions(vec![json!("AQAB"), json!("AgAC")])
        .await
        .unwrap_err();
    assert!(error.contains("Open SVMSeek"));
    assert!(prompts.recv().await.is_some());
}

#[tokio::test]
async fn test_unsupported_method_gets_terminating_error() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);

    let provider = frame.document().provider(GLOBAL_SOLANA).unwrap();
    let error = provider.request("eval(...)", vec![]).await.unwrap_err();
    assert_eq!(error, "Unsupported method: eval(...)");
}

#[tokio::test]
async fn test_message_from_unbound_window_is_ignored() {
    let (host, frame, mut prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);

    let request = json!({
        "type": "WALLET_REQUEST",
        "id": "s1",
        "method": "signTransaction",
        "params": ["AQAB"],
    });

    // A window that is not the bound frame gets no handler call.
    let (rogue, _rogue_mailbox) = window_channel(HOST_ORIGIN);
    host.window().post_message(request.clone(), HOST_ORIGIN, &rogue);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(prompts.try_recv().is_err());

    // The same message from the bound frame is handled.
    host.window()
        .post_message(request, HOST_ORIGIN, &frame.content_window());
    assert!(prompts.recv().await.is_some());
}

#[tokio::test]
async fn test_response_posted_to_concrete_frame_origin() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);

    // Navigate to a fresh document and play the embedded page by hand, so
    // the raw reply is observable.
    frame.navigate(HOST_ORIGIN);
    let document = frame.document();
    let mut mailbox = document.take_mailbox().unwrap();

    let request = json!({
        "type": "WALLET_REQUEST",
        "id": "c1",
        "method": "connect",
        "params": [],
    });
    host.window()
        .post_message(request, HOST_ORIGIN, &document.window());

    let reply = mailbox.recv().await.unwrap();
    assert_eq!(reply.target_origin, "http://localhost:3000");
    assert_eq!(
        reply.data,
        json!({
            "type": "WALLET_RESPONSE",
            "id": "c1",
            "result": { "publicKey": MOCK_PUBLIC_KEY },
        })
    );
}

#[tokio::test]
async fn test_malformed_messages_dropped_without_reply() {
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), BridgeConfig::default());
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);

    frame.navigate(HOST_ORIGIN);
    let document = frame.document();
    let mut mailbox = document.take_mailbox().unwrap();

    for bad in [
        json!(null),
        json!("WALLET_REQUEST"),
        json!({ "type": 7 }),
        json!({ "type": "WALLET_REQUEST", "method": "connect" }),
        json!({ "type": "WALLET_REQUEST", "id": 1, "method": "connect" }),
    ] {
        host.window().post_message(bad, HOST_ORIGIN, &document.window());
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(mailbox.try_recv().is_none());
}

#[tokio::test]
async fn test_cleanup_stops_routing() {
    let config = BridgeConfig {
        request_timeout_ms: 100,
        ..BridgeConfig::default()
    };
    let (host, frame, _prompts) = testbed(HOST_ORIGIN, Some(MOCK_PUBLIC_KEY), config);
    frame.notify_loaded();
    assert!(host.inject_wallet_providers(&frame).await.success);
    let provider = frame.document().provider(GLOBAL_SOLANA).unwrap();

    host.cleanup();
    assert!(!host.is_injected());
    assert!(host.get_injected_providers().is_empty());

    let error = provider.request("connect", vec![]).await.unwrap_err();
    assert!(error.contains("timed out"), "unexpected error: {}", error);

    let outcome = host.inject_wallet_providers(&frame).await;
    assert!(!outcome.success);
}
