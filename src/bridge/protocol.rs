use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MSG_WALLET_REQUEST: &str = "WALLET_REQUEST";
pub const MSG_WALLET_RESPONSE: &str = "WALLET_RESPONSE";
pub const MSG_WALLET_ERROR: &str = "WALLET_ERROR";

/// Messages exchanged between the injected provider and the bridge host
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    /// Provider-method call from the embedded page
    #[serde(rename = "WALLET_REQUEST")]
    Request {
        id: String,
        method: String,
        #[serde(default)]
        params: Vec<Value>,
    },

    /// Successful reply to one request
    #[serde(rename = "WALLET_RESPONSE")]
    Response { id: String, result: Value },

    /// Failed reply to one request
    #[serde(rename = "WALLET_ERROR")]
    Error { id: String, error: String },
}

/// The provider methods the bridge understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletMethod {
    Connect,
    Disconnect,
    SignTransaction,
    SignAllTransactions,
    SignMessage,
}

impl WalletMethod {
    /// Parse a wire method name. Unknown names stay unknown; the dispatch
    /// site answers them with a terminating error instead of ignoring them.
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "connect" => Some(Self::Connect),
            "disconnect" => Some(Self::Disconnect),
            "signTransaction" => Some(Self::SignTransaction),
            "signAllTransactions" => Some(Self::SignAllTransactions),
            "signMessage" => Some(Self::SignMessage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::SignTransaction => "signTransaction",
            Self::SignAllTransactions => "signAllTransactions",
            Self::SignMessage => "signMessage",
        }
    }
}

/// A shape-validated inbound request
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingRequest {
    pub id: String,
    pub method: String,
    pub params: Vec<Value>,
}

/// Validate an inbound value as a `WALLET_REQUEST`.
///
/// The value must be an object with a string `type` equal to
/// `WALLET_REQUEST` and string `id` and `method` fields; `params` may be
/// absent or an array. Anything else yields `None` and the caller drops the
/// message without side effects.
pub fn parse_request(data: &Value) -> Option<IncomingRequest> {
    let object = data.as_object()?;
    if object.get("type")?.as_str()? != MSG_WALLET_REQUEST {
        return None;
    }
    let id = object.get("id")?.as_str()?.to_string();
    let method = object.get("method")?.as_str()?.to_string();
    let params = match object.get("params") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return None,
    };
    Some(IncomingRequest { id, method, params })
}

/// Validate an inbound value as a `WALLET_RESPONSE` or `WALLET_ERROR`,
/// returning the correlation id and the call outcome.
pub fn parse_reply(data: &Value) -> Option<(String, Result<Value, String>)> {
    let object = data.as_object()?;
    match object.get("type")?.as_str()? {
        MSG_WALLET_RESPONSE => {
            let id = object.get("id")?.as_str()?.to_string();
            let result = object.get("result").cloned().unwrap_or(Value::Null);
            Some((id, Ok(result)))
        }
        MSG_WALLET_ERROR => {
            let id = object.get("id")?.as_str()?.to_string();
            let error = object.get("error")?.as_str()?.to_string();
            Some((id, Err(error)))
        }
        _ => None,
    }
}
