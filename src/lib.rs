//! Sandboxed dApp wallet-injection bridge for the SVMSeek wallet
//!
//! Exposes a standard wallet-provider surface (`connect`, `disconnect`,
//! `signTransaction`, `signAllTransactions`, `signMessage`) to untrusted
//! pages loaded in an embedded frame, without ever letting those pages
//! produce a signature. Provider calls travel as correlation-id messages
//! over a cross-context channel; injection is gated on an origin
//! allow-list, and every signing method is answered in the trusted wallet
//! UI instead of the embedded page.

pub mod bridge;
pub mod config;
pub mod origin;
pub mod prompt;
pub mod sandbox;
pub mod wallet;

pub use bridge::host::{BridgeHost, InjectionOutcome};
pub use bridge::protocol::{BridgeMessage, WalletMethod};
pub use bridge::provider::WalletProvider;
pub use config::BridgeConfig;
pub use prompt::{BlockedRequestPrompt, PromptChannel, PromptSurface, RecoveryAction};
pub use sandbox::frame::{Document, EmbeddedFrame};
pub use wallet::{ActiveWallet, Wallet, WalletStateSource};
