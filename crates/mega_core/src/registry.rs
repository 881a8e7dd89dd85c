//! The fixed table of mega-dao contracts.
//!
//! The table is generated from the deployed contracts' ABIs and lives in
//! `data/contracts.json`; it is embedded at compile time and parsed once.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abi::ContractDescriptor;

const CONTRACTS_JSON: &str = include_str!("../data/contracts.json");

static REGISTRY: Lazy<HashMap<ContractKey, ContractDescriptor>> = Lazy::new(|| {
    serde_json::from_str(CONTRACTS_JSON)
        .unwrap_or_else(|e| panic!("embedded contract table is malformed: {e}"))
});

/// The contracts this SDK knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKey {
    Token,
    Dao,
    Vault,
    Submission,
    Voting,
}

impl ContractKey {
    pub const ALL: [ContractKey; 5] = [
        ContractKey::Token,
        ContractKey::Dao,
        ContractKey::Vault,
        ContractKey::Submission,
        ContractKey::Voting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Dao => "dao",
            Self::Vault => "vault",
            Self::Submission => "submission",
            Self::Voting => "voting",
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown contract key: {0:?}")]
pub struct UnknownContract(pub String);

impl FromStr for ContractKey {
    type Err = UnknownContract;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownContract(s.to_string()))
    }
}

/// Typed description of one known contract.
pub fn describe(key: ContractKey) -> &'static ContractDescriptor {
    REGISTRY
        .get(&key)
        .unwrap_or_else(|| panic!("contract table has no entry for {key}"))
}

/// Like [`describe`], keyed by name.
///
/// # Panics
///
/// Panics if `name` is not one of `token`, `dao`, `vault`, `submission`,
/// `voting`. An unknown key is a programming error, not a runtime condition.
pub fn describe_named(name: &str) -> &'static ContractDescriptor {
    match name.parse::<ContractKey>() {
        Ok(key) => describe(key),
        Err(e) => panic!("{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{ClarityType, FunctionAccess};

    #[test]
    fn every_key_has_a_descriptor() {
        for key in ContractKey::ALL {
            let contract = describe(key);
            assert!(!contract.functions.is_empty(), "{key} has no functions");
        }
        assert_eq!(describe(ContractKey::Token).contract_name, "mega");
        assert_eq!(describe(ContractKey::Dao).contract_name, "mega-dao");
        assert_eq!(describe(ContractKey::Vault).contract_name, "mega-vault");
        assert_eq!(describe(ContractKey::Submission).contract_name, "mega-submission-v2");
        assert_eq!(describe(ContractKey::Voting).contract_name, "mega-voting-v2");
    }

    #[test]
    fn transfer_signature_matches_deployment() {
        let transfer = describe(ContractKey::Token).function("transfer").unwrap();
        assert_eq!(transfer.access, FunctionAccess::Public);
        let names: Vec<&str> = transfer.args.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["amount", "sender", "recipient", "memo"]);
        assert_eq!(
            transfer.args[3].ty,
            ClarityType::Optional(Box::new(ClarityType::Buffer { length: 34 }))
        );
    }

    #[test]
    fn storage_is_described() {
        let voting = describe(ContractKey::Voting);
        assert!(voting.map("Proposals").is_some());
        assert!(voting.map("MemberTotalVotes").is_some());

        let token = describe(ContractKey::Token);
        assert_eq!(token.fungible_tokens[0].name, "mega");
        let supply = token.variable("dao-supply").unwrap();
        assert!(supply.is_constant());
        assert_eq!(supply.default_value, Some(serde_json::json!("48000000")));
    }

    #[test]
    fn vote_many_is_capped_at_one_hundred() {
        let vote_many = describe(ContractKey::Voting).function("vote-many").unwrap();
        match &vote_many.args[0].ty {
            ClarityType::List { length, .. } => assert_eq!(*length, 100),
            other => panic!("unexpected type {other}"),
        }
    }

    #[test]
    fn key_round_trips_through_str() {
        for key in ContractKey::ALL {
            assert_eq!(key.as_str().parse::<ContractKey>().unwrap(), key);
        }
        assert!("treasury".parse::<ContractKey>().is_err());
    }

    #[test]
    #[should_panic(expected = "unknown contract key")]
    fn describe_named_panics_on_unknown_key() {
        describe_named("treasury");
    }
}
