//! Contract descriptions and value types for the mega-dao contracts on Stacks.

pub mod abi;
pub mod c32;
pub mod codec;
pub mod config;
pub mod logging;
pub mod post_condition;
pub mod principal;
pub mod registry;
pub mod units;
pub mod value;

pub use abi::{ClarityType, ContractDescriptor, FunctionAbi, FunctionAccess, FunctionArg};
pub use c32::C32Error;
pub use codec::CodecError;
pub use config::{ClientConfig, ConfigError, DEFAULT_DEPLOYER, Network, validate_url};
pub use post_condition::{
    AssetInfo, FungibleConditionCode, FungiblePostCondition, PostCondition, PostConditionError,
    create_fungible_post_condition, fungible_post_condition,
};
pub use principal::{
    ContractId, Principal, PrincipalError, StandardPrincipal, get_contract_parts,
    is_full_identifier,
};
pub use registry::{ContractKey, describe, describe_named};
pub use units::{UnitsError, from_base_units, to_base_units};
pub use value::{ClarityValue, ResponseResult, ValueError};
