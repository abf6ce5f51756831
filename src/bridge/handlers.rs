//! Host-side business logic for each provider method
//!
//! `connect` answers with the wallet's public key; `disconnect` succeeds
//! without touching the real wallet session; every signing method is
//! refused unconditionally and surfaces a prompt steering the user to the
//! trusted wallet UI. The refusal is a security invariant of the bridge:
//! no embedded page may obtain a signature without the user reviewing the
//! operation in a surface the page cannot script.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::bridge::protocol::WalletMethod;
use crate::prompt::{BlockedRequestPrompt, PromptSurface, RecoveryAction};
use crate::wallet::WalletStateSource;

pub const ERR_NO_WALLET: &str = "No wallet connected to SVMSeek";

const REFUSE_SIGN_TRANSACTION: &str = "Transaction signing is not available inside embedded dApps. Open SVMSeek to review and sign this transaction.";
const REFUSE_SIGN_ALL_TRANSACTIONS: &str = "Batch transaction signing is not available inside embedded dApps. Open SVMSeek to review and sign these transactions.";
const REFUSE_SIGN_MESSAGE: &str = "Message signing is not available inside embedded dApps. Open SVMSeek to review and sign this message.";

pub struct MethodHandlers {
    wallet: Arc<dyn WalletStateSource>,
    prompts: Arc<dyn PromptSurface>,
}

impl MethodHandlers {
    pub fn new(wallet: Arc<dyn WalletStateSource>, prompts: Arc<dyn PromptSurface>) -> Self {
        Self { wallet, prompts }
    }

    /// Handle one validated request. Params are accepted for wire
    /// compatibility; no current method reads them.
    pub async fn dispatch(&self, method: WalletMethod, _params: &[Value]) -> Result<Value, String> {
        match method {
            WalletMethod::Connect => self.connect().await,
            WalletMethod::Disconnect => {
                // The dApp only loses its local view; the user's session in
                // the wallet itself stays authenticated.
                log::info!("dApp disconnected from wallet bridge");
                Ok(Value::Bool(true))
            }
            WalletMethod::SignTransaction => {
                self.refuse("Transaction signing blocked", REFUSE_SIGN_TRANSACTION)
                    .await
            }
            WalletMethod::SignAllTransactions => {
                self.refuse("Transaction signing blocked", REFUSE_SIGN_ALL_TRANSACTIONS)
                    .await
            }
            WalletMethod::SignMessage => {
                self.refuse("Message signing blocked", REFUSE_SIGN_MESSAGE).await
            }
        }
    }

    async fn connect(&self) -> Result<Value, String> {
        match self.wallet.connected_public_key().await {
            Some(public_key) => {
                log::info!("dApp connected to wallet {}", public_key);
                Ok(json!({ "publicKey": public_key }))
            }
            None => Err(ERR_NO_WALLET.to_string()),
        }
    }

    async fn refuse(&self, title: &str, explanation: &str) -> Result<Value, String> {
        log::warn!("blocked signing request from embedded dApp: {}", title);
        self.prompts
            .raise(BlockedRequestPrompt {
                title: title.to_string(),
                message: explanation.to_string(),
                actions: vec![
                    RecoveryAction::OpenWallet,
                    RecoveryAction::LearnMore,
                    RecoveryAction::Dismiss,
                ],
            })
            .await;
        Err(explanation.to_string())
    }
}
