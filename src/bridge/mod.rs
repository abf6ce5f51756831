pub mod handlers;
pub mod host;
pub mod protocol;
pub mod provider;
pub mod script;

#[cfg(test)]
pub mod test;

pub use handlers::MethodHandlers;
pub use host::{BridgeHost, InjectionOutcome};
pub use protocol::{BridgeMessage, IncomingRequest, WalletMethod};
pub use provider::WalletProvider;
pub use script::ProviderScript;
