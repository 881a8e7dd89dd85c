//! Binding of a static contract description to a deployed contract.
//!
//! [`DeployedContract`] turns a function name plus typed arguments into either
//! a [`ReadOnlyInvocation`] for evaluation through a [`ReadOnlyClient`], or a
//! [`CallPayload`] for an external signer. Arguments are checked against the
//! declared ABI before anything leaves this module.

use mega_core::codec::{self, CodecError};
use mega_core::{
    ClarityValue, ContractDescriptor, ContractId, ContractKey, FunctionAbi, FunctionAccess,
    PostCondition, Principal, PrincipalError, StandardPrincipal,
};
use serde::Serialize;
use tracing::debug;

use crate::rpc::{ReadOnlyClient, ReadOnlyInvocation, RpcError};

#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("{contract} has no function named {function:?}")]
    UnknownFunction { contract: String, function: String },

    #[error("{function} is {access:?} and cannot be called this way")]
    NotCallable {
        function: String,
        access: FunctionAccess,
    },

    #[error("{function} takes {expected} arguments, got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {arg} of {function} must be {expected}, got {found}")]
    ArgumentType {
        function: String,
        arg: String,
        expected: String,
        found: String,
    },

    #[error("could not encode arguments of {function}: {source}")]
    Encode {
        function: String,
        #[source]
        source: CodecError,
    },
}

/// Failure of [`DeployedContract::query`].
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// The minimal contract-call description a wallet needs to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPayload {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    /// `0x`-prefixed consensus encodings, in declaration order.
    pub function_args: Vec<String>,
    pub post_conditions: Vec<PostCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip)]
    arguments: Vec<ClarityValue>,
}

impl CallPayload {
    /// The typed arguments behind [`Self::function_args`].
    pub fn arguments(&self) -> &[ClarityValue] {
        &self.arguments
    }

    pub fn with_post_conditions(mut self, post_conditions: Vec<PostCondition>) -> Self {
        self.post_conditions = post_conditions;
        self
    }

    pub fn with_memo(mut self, memo: Option<String>) -> Self {
        self.memo = memo;
        self
    }
}

/// A contract description bound to its on-chain identifier.
#[derive(Debug, Clone)]
pub struct DeployedContract {
    descriptor: &'static ContractDescriptor,
    id: ContractId,
}

impl DeployedContract {
    pub fn new(
        descriptor: &'static ContractDescriptor,
        deployer: StandardPrincipal,
    ) -> Result<Self, PrincipalError> {
        let id = ContractId::new(deployer, descriptor.contract_name.clone())?;
        Ok(Self { descriptor, id })
    }

    /// Bind a registry entry to `deployer`.
    pub fn from_key(key: ContractKey, deployer: StandardPrincipal) -> Result<Self, PrincipalError> {
        Self::new(mega_core::describe(key), deployer)
    }

    pub fn id(&self) -> &ContractId {
        &self.id
    }

    pub fn descriptor(&self) -> &'static ContractDescriptor {
        self.descriptor
    }

    fn checked(
        &self,
        function: &str,
        args: &[ClarityValue],
        allowed: &[FunctionAccess],
    ) -> Result<&'static FunctionAbi, AbiError> {
        let abi = self
            .descriptor
            .function(function)
            .ok_or_else(|| AbiError::UnknownFunction {
                contract: self.id.to_string(),
                function: function.to_string(),
            })?;

        if !allowed.contains(&abi.access) {
            return Err(AbiError::NotCallable {
                function: function.to_string(),
                access: abi.access,
            });
        }

        if abi.args.len() != args.len() {
            return Err(AbiError::Arity {
                function: function.to_string(),
                expected: abi.args.len(),
                found: args.len(),
            });
        }

        for (declared, value) in abi.args.iter().zip(args) {
            if !declared.ty.admits(value) {
                return Err(AbiError::ArgumentType {
                    function: function.to_string(),
                    arg: declared.name.clone(),
                    expected: declared.ty.to_string(),
                    found: value.to_string(),
                });
            }
        }

        Ok(abi)
    }

    /// Prepare a read-only evaluation of `function`, sent as the deployer.
    pub fn read_only(
        &self,
        function: &str,
        args: Vec<ClarityValue>,
    ) -> Result<ReadOnlyInvocation, AbiError> {
        self.checked(function, &args, &[FunctionAccess::ReadOnly, FunctionAccess::Public])?;
        Ok(ReadOnlyInvocation {
            contract: self.id.clone(),
            function_name: function.to_string(),
            arguments: args,
            sender: Principal::Standard(*self.id.issuer()),
        })
    }

    /// Evaluate `function` and hand back whatever the node returned.
    pub async fn query(
        &self,
        rpc: &dyn ReadOnlyClient,
        function: &str,
        args: Vec<ClarityValue>,
    ) -> Result<ClarityValue, QueryError> {
        let invocation = self.read_only(function, args)?;
        debug!(contract = %self.id, function, "read-only query");
        Ok(rpc.call_read_only(&invocation).await?)
    }

    /// Build the payload for a state-changing call. Nothing is sent.
    pub fn call(&self, function: &str, args: Vec<ClarityValue>) -> Result<CallPayload, AbiError> {
        self.checked(function, &args, &[FunctionAccess::Public])?;
        let function_args = args
            .iter()
            .map(codec::to_hex)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| AbiError::Encode {
                function: function.to_string(),
                source,
            })?;
        debug!(contract = %self.id, function, args = function_args.len(), "built call payload");
        Ok(CallPayload {
            contract_address: self.id.issuer().to_string(),
            contract_name: self.id.name().to_string(),
            function_name: function.to_string(),
            function_args,
            post_conditions: Vec::new(),
            memo: None,
            arguments: args,
        })
    }
}
