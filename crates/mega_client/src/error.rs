use mega_core::{ClarityValue, ConfigError, PrincipalError, ValueError};
use tracing::warn;

use crate::facade::{AbiError, QueryError};
use crate::rpc::RpcError;

/// Message the address codec produces for a bad c32check checksum.
pub const CHECKSUM_MISMATCH: &str = "Invalid c32check string: checksum mismatch";

/// Marker the node puts in its cause when a historical lookup hits a block
/// where the contract did not exist yet.
pub const NO_SUCH_CONTRACT: &str = "NoSuchContract";

/// Errors surfaced by [`MegaClient`](crate::MegaClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid Stacks Address: the provided address is not valid")]
    InvalidAddress {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid Block Height: the provided blockHeight is not valid")]
    InvalidBlockHeight {
        #[source]
        source: RpcError,
    },

    /// A response envelope came back with its error branch set.
    #[error("Unexpected error: {value}")]
    QueryFailed { function: String, value: ClarityValue },

    #[error("{0}")]
    Validation(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("{function} returned an unexpected value: {source}")]
    UnexpectedValue {
        function: String,
        #[source]
        source: ValueError,
    },

    #[error(transparent)]
    Rpc(RpcError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Address(PrincipalError),

    #[error(transparent)]
    Config(ConfigError),
}

impl From<ConfigError> for ClientError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::UnknownNetwork(name) => Self::UnknownNetwork(name),
            other => Self::Config(other),
        }
    }
}

/// Which translation rules apply to a method's failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Standard,
    /// Queries evaluated at a past block height.
    Historical,
}

/// A failure below the client, before translation.
#[derive(Debug)]
pub enum LowerError {
    Address(PrincipalError),
    Rpc(RpcError),
    Abi(AbiError),
}

impl From<PrincipalError> for LowerError {
    fn from(e: PrincipalError) -> Self {
        Self::Address(e)
    }
}

impl From<RpcError> for LowerError {
    fn from(e: RpcError) -> Self {
        Self::Rpc(e)
    }
}

impl From<AbiError> for LowerError {
    fn from(e: AbiError) -> Self {
        Self::Abi(e)
    }
}

impl From<QueryError> for LowerError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Abi(e) => Self::Abi(e),
            QueryError::Rpc(e) => Self::Rpc(e),
        }
    }
}

/// Map a lower-layer failure onto the client's error kinds.
///
/// Local address parsing is checked structurally. Transport errors only carry
/// text, so those are matched on the node's message. Anything unrecognised
/// passes through unchanged.
pub fn translate_error(function: &str, scope: ErrorScope, err: LowerError) -> ClientError {
    let translated = match err {
        LowerError::Address(e) if e.is_checksum_mismatch() => ClientError::InvalidAddress {
            source: Box::new(e),
        },
        LowerError::Address(e) => return ClientError::Address(e),
        LowerError::Abi(e) => return ClientError::Abi(e),
        LowerError::Rpc(e) => {
            let message = e.message();
            if message == CHECKSUM_MISMATCH {
                ClientError::InvalidAddress { source: Box::new(e) }
            } else if scope == ErrorScope::Historical && message.contains(NO_SUCH_CONTRACT) {
                ClientError::InvalidBlockHeight { source: e }
            } else {
                return ClientError::Rpc(e);
            }
        }
    };
    warn!(function, error = %translated, "translated lower-layer error");
    translated
}

#[cfg(test)]
mod tests {
    use super::*;
    use mega_core::C32Error;

    fn rejected(cause: &str) -> LowerError {
        LowerError::Rpc(RpcError::Rejected { cause: cause.into() })
    }

    #[test]
    fn checksum_mismatch_from_parsing() {
        let err = translate_error(
            "get-balance",
            ErrorScope::Standard,
            PrincipalError::Address(C32Error::ChecksumMismatch).into(),
        );
        assert!(matches!(err, ClientError::InvalidAddress { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid Stacks Address: the provided address is not valid"
        );
    }

    #[test]
    fn checksum_mismatch_from_transport_message() {
        let err = translate_error("is-extension", ErrorScope::Standard, rejected(CHECKSUM_MISMATCH));
        assert!(matches!(err, ClientError::InvalidAddress { .. }));

        // Only the exact message counts.
        let err = translate_error(
            "is-extension",
            ErrorScope::Standard,
            rejected("error: Invalid c32check string: checksum mismatch"),
        );
        assert!(matches!(err, ClientError::Rpc(_)));
    }

    #[test]
    fn no_such_contract_only_for_historical_queries() {
        let cause = "Unchecked(NoSuchContract(\"SP000.mega\"))";
        let err = translate_error("get-voting-power", ErrorScope::Historical, rejected(cause));
        assert!(matches!(err, ClientError::InvalidBlockHeight { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid Block Height: the provided blockHeight is not valid"
        );

        let err = translate_error("is-delegating", ErrorScope::Standard, rejected(cause));
        assert!(matches!(err, ClientError::Rpc(RpcError::Rejected { .. })));
    }

    #[test]
    fn other_errors_pass_through() {
        let err = translate_error(
            "get-decimals",
            ErrorScope::Historical,
            LowerError::Rpc(RpcError::Status { status: 503, body: "busy".into() }),
        );
        match err {
            ClientError::Rpc(RpcError::Status { status, .. }) => assert_eq!(status, 503),
            other => panic!("unexpected {other:?}"),
        }

        let err = translate_error(
            "get-balance",
            ErrorScope::Standard,
            PrincipalError::InvalidContractId("nope".into()).into(),
        );
        assert!(matches!(err, ClientError::Address(_)));
    }

    #[test]
    fn unknown_network_is_lifted() {
        let err: ClientError = ConfigError::UnknownNetwork("devnet".into()).into();
        assert!(matches!(err, ClientError::UnknownNetwork(ref n) if n == "devnet"));
    }
}
