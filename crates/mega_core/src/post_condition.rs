//! Fungible post-conditions attached to token-moving call payloads.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_DEPLOYER;
use crate::principal::{ContractId, Principal, PrincipalError};
use crate::registry::{self, ContractKey};
use crate::units::{self, UnitsError};

/// Decimals assumed by [`create_fungible_post_condition`] when none are given.
pub const DEFAULT_POST_CONDITION_DECIMALS: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FungibleConditionCode {
    #[default]
    #[serde(rename = "eq")]
    Equal,
    #[serde(rename = "gt")]
    Greater,
    #[serde(rename = "gte")]
    GreaterEqual,
    #[serde(rename = "lt")]
    Less,
    #[serde(rename = "lte")]
    LessEqual,
}

impl fmt::Display for FungibleConditionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "eq",
            Self::Greater => "gt",
            Self::GreaterEqual => "gte",
            Self::Less => "lt",
            Self::LessEqual => "lte",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub contract_address: String,
    pub contract_name: String,
    pub asset_name: String,
}

impl AssetInfo {
    /// The `mega` fungible token at its default deployment.
    pub fn mega() -> Self {
        let token = registry::describe(ContractKey::Token);
        Self {
            contract_address: DEFAULT_DEPLOYER.to_string(),
            contract_name: token.contract_name.clone(),
            asset_name: token_asset_name(),
        }
    }

    /// The `mega` fungible token as deployed at `token`.
    pub fn for_token(token: &ContractId) -> Self {
        Self {
            contract_address: token.issuer().to_string(),
            contract_name: token.name().to_string(),
            asset_name: token_asset_name(),
        }
    }
}

fn token_asset_name() -> String {
    let token = registry::describe(ContractKey::Token);
    token
        .fungible_tokens
        .first()
        .map(|ft| ft.name.clone())
        .unwrap_or_else(|| token.contract_name.clone())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FungiblePostCondition {
    pub principal: Principal,
    pub condition_code: FungibleConditionCode,
    /// Base units, as a decimal string.
    #[serde(with = "amount_string")]
    pub amount: u128,
    pub asset: AssetInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostCondition {
    Fungible(FungiblePostCondition),
}

#[derive(Debug, thiserror::Error)]
pub enum PostConditionError {
    #[error(transparent)]
    Principal(#[from] PrincipalError),

    #[error(transparent)]
    Units(#[from] UnitsError),
}

/// Build the single post-condition guarding a MEGA transfer from `sender`.
///
/// `decimals` defaults to [`DEFAULT_POST_CONDITION_DECIMALS`] and `code` to
/// [`FungibleConditionCode::Equal`]. The asset is the token at its default
/// deployment; use [`fungible_post_condition`] for another deployment.
pub fn create_fungible_post_condition(
    sender: &str,
    amount: Decimal,
    decimals: Option<u32>,
    code: Option<FungibleConditionCode>,
) -> Result<Vec<PostCondition>, PostConditionError> {
    let principal: Principal = sender.parse()?;
    let amount = units::to_base_units(amount, decimals.unwrap_or(DEFAULT_POST_CONDITION_DECIMALS))?;
    Ok(vec![fungible_post_condition(
        principal,
        amount,
        AssetInfo::mega(),
        code.unwrap_or_default(),
    )])
}

/// Post-condition on an amount already in base units.
pub fn fungible_post_condition(
    principal: Principal,
    amount: u128,
    asset: AssetInfo,
    condition_code: FungibleConditionCode,
) -> PostCondition {
    PostCondition::Fungible(FungiblePostCondition {
        principal,
        condition_code,
        amount,
        asset,
    })
}

mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
