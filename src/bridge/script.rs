//! Provider script generation and delivery
//!
//! The provider surface is materialized as an in-memory script resource and
//! handed to the embedded document to load, never fetched over the network
//! and never evaluated from a string. Installation is guarded by the
//! document's marker flag so loading the resource twice registers nothing
//! twice; the resource itself is consumed by the load attempt and released
//! as soon as the outcome is known.

use std::sync::Arc;
use std::time::Duration;

use crate::bridge::provider::{ProviderRuntime, WalletProvider};
use crate::config::BridgeConfig;
use crate::sandbox::frame::Document;

/// Global names the providers are registered under inside the document
pub const GLOBAL_SOLANA: &str = "solana";
pub const GLOBAL_PHANTOM_SOLANA: &str = "phantom.solana";
pub const GLOBAL_SVMSEEK: &str = "svmseek";

/// Provider names the host reports after a successful injection
pub const INJECTED_PROVIDERS: [&str; 3] = ["solana", "phantom", "svmseek"];

/// One generated, single-use provider script resource
pub struct ProviderScript {
    request_timeout: Duration,
}

impl ProviderScript {
    /// Generate the script for the current bridge configuration.
    pub fn build(config: &BridgeConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
        }
    }

    fn injected_provider_names() -> Vec<String> {
        INJECTED_PROVIDERS.iter().map(|name| name.to_string()).collect()
    }

    /// Run inside the document: construct the provider runtime, register
    /// the `solana` / `phantom.solana` / `svmseek` globals, and start the
    /// message listener.
    ///
    /// A document that already carries the marker flag gets a logged no-op
    /// that reports the same provider set; no second listener is spawned.
    pub fn install(self, document: &Document) -> Result<Vec<String>, String> {
        if document.is_wallet_injected() {
            log::info!("wallet providers already injected; skipping");
            return Ok(Self::injected_provider_names());
        }

        let mailbox = document
            .take_mailbox()
            .ok_or_else(|| "document inbox already consumed".to_string())?;

        let runtime = ProviderRuntime::new(
            document.window(),
            document.parent(),
            document.origin().to_string(),
            self.request_timeout,
        );
        Arc::clone(&runtime).spawn_pump(mailbox);

        let provider = Arc::new(WalletProvider::new(runtime));
        document.register_provider(GLOBAL_SOLANA, Arc::clone(&provider));
        document.register_provider(GLOBAL_PHANTOM_SOLANA, Arc::clone(&provider));
        document.register_provider(GLOBAL_SVMSEEK, provider);
        document.mark_wallet_injected();

        log::info!(
            "wallet providers injected into document at {}",
            document.origin()
        );
        Ok(Self::injected_provider_names())
    }
}
