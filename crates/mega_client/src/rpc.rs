//! Read-only contract calls against a Stacks node.

use std::time::Duration;

use async_trait::async_trait;
use mega_core::codec::{self, CodecError};
use mega_core::{ClarityValue, ClientConfig, ContractId, Principal};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;

/// Errors from the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("node returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The node evaluated the call and refused it; `cause` is its message.
    #[error("{cause}")]
    Rejected { cause: String },

    #[error("malformed node response: {0}")]
    Decode(String),

    #[error("could not encode arguments: {0}")]
    Encode(#[from] CodecError),
}

impl RpcError {
    /// The lower-layer message, as the node phrased it when available.
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { cause } => cause.clone(),
            Self::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// One read-only function evaluation, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnlyInvocation {
    pub contract: ContractId,
    pub function_name: String,
    pub arguments: Vec<ClarityValue>,
    /// Principal the call is evaluated as.
    pub sender: Principal,
}

impl ReadOnlyInvocation {
    pub fn with_sender(mut self, sender: Principal) -> Self {
        self.sender = sender;
        self
    }
}

/// Anything that can evaluate a read-only call.
#[async_trait]
pub trait ReadOnlyClient: Send + Sync {
    async fn call_read_only(&self, invocation: &ReadOnlyInvocation) -> Result<ClarityValue, RpcError>;
}

#[derive(Debug, Serialize)]
struct CallReadRequest {
    sender: String,
    arguments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CallReadResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

/// [`ReadOnlyClient`] backed by the node's `call-read` HTTP endpoint.
pub struct HttpReadOnlyClient {
    base_url: String,
    client: Client,
}

impl HttpReadOnlyClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mega-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RpcError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let url = config.resolved_api_url()?;
        Self::new(url, Duration::from_secs(config.timeout_secs)).map_err(ClientError::Rpc)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, invocation: &ReadOnlyInvocation) -> String {
        format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            self.base_url,
            invocation.contract.issuer(),
            invocation.contract.name(),
            invocation.function_name
        )
    }
}

fn request_body(invocation: &ReadOnlyInvocation) -> Result<CallReadRequest, CodecError> {
    let arguments = invocation
        .arguments
        .iter()
        .map(codec::to_hex)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CallReadRequest {
        sender: invocation.sender.to_string(),
        arguments,
    })
}

fn decode_response(response: CallReadResponse) -> Result<ClarityValue, RpcError> {
    if !response.okay {
        return Err(RpcError::Rejected {
            cause: response.cause.unwrap_or_else(|| "unknown cause".to_string()),
        });
    }
    let result = response
        .result
        .ok_or_else(|| RpcError::Decode("okay response without a result".into()))?;
    codec::from_hex(&result).map_err(|e| RpcError::Decode(e.to_string()))
}

#[async_trait]
impl ReadOnlyClient for HttpReadOnlyClient {
    async fn call_read_only(&self, invocation: &ReadOnlyInvocation) -> Result<ClarityValue, RpcError> {
        let url = self.endpoint(invocation);
        let body = request_body(invocation)?;
        debug!(url = %url, sender = %body.sender, "call-read");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| RpcError::Http(e.to_string()))?;

        if !status.is_success() {
            // Some node errors still arrive in the call-read envelope.
            if let Ok(parsed) = serde_json::from_str::<CallReadResponse>(&text) {
                if !parsed.okay {
                    return decode_response(parsed);
                }
            }
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: CallReadResponse =
            serde_json::from_str(&text).map_err(|e| RpcError::Decode(e.to_string()))?;
        decode_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYER: &str = "SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH335";

    fn invocation() -> ReadOnlyInvocation {
        ReadOnlyInvocation {
            contract: format!("{DEPLOYER}.mega").parse().unwrap(),
            function_name: "get-balance".into(),
            arguments: vec![ClarityValue::principal(DEPLOYER).unwrap()],
            sender: DEPLOYER.parse().unwrap(),
        }
    }

    #[test]
    fn endpoint_and_body() {
        let client =
            HttpReadOnlyClient::new("https://api.hiro.so/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "https://api.hiro.so");
        assert_eq!(
            client.endpoint(&invocation()),
            format!("https://api.hiro.so/v2/contracts/call-read/{DEPLOYER}/mega/get-balance")
        );

        let body = serde_json::to_value(request_body(&invocation()).unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "sender": DEPLOYER,
                "arguments": ["0x0516da6b6c4a62ece9fa5a652278baa014ec83df3644"],
            })
        );
    }

    #[test]
    fn decodes_okay_result() {
        let resp: CallReadResponse = serde_json::from_str(
            r#"{"okay":true,"result":"0x070100000000000000000000000000000006"}"#,
        )
        .unwrap();
        assert_eq!(
            decode_response(resp).unwrap(),
            ClarityValue::ok(ClarityValue::uint(6u8))
        );
    }

    #[test]
    fn rejected_call_keeps_node_cause() {
        let resp: CallReadResponse = serde_json::from_str(
            r#"{"okay":false,"cause":"Unchecked(NoSuchContract(\"SP000.mega\"))"}"#,
        )
        .unwrap();
        let err = decode_response(resp).unwrap_err();
        assert!(matches!(err, RpcError::Rejected { .. }));
        assert!(err.message().contains("NoSuchContract"));
    }

    #[test]
    fn okay_without_result_is_a_decode_error() {
        let resp: CallReadResponse = serde_json::from_str(r#"{"okay":true}"#).unwrap();
        assert!(matches!(decode_response(resp), Err(RpcError::Decode(_))));
    }
}
