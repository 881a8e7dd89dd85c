use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::c32::{self, C32Error, HASH160_LEN};

/// Longest contract name the consensus codec can carry.
pub const CONTRACT_NAME_MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrincipalError {
    #[error(transparent)]
    Address(#[from] C32Error),

    #[error("Invalid contract ID: {0}")]
    InvalidContractId(String),

    #[error("Invalid contract name: {0:?}")]
    InvalidContractName(String),
}

impl PrincipalError {
    /// Whether the failure was a c32check checksum mismatch.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, Self::Address(C32Error::ChecksumMismatch))
    }
}

/// A standard (account) principal: a version byte plus a hash160.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StandardPrincipal {
    version: u8,
    hash160: [u8; HASH160_LEN],
}

impl StandardPrincipal {
    pub fn new(version: u8, hash160: [u8; HASH160_LEN]) -> Result<Self, PrincipalError> {
        if version >= 32 {
            return Err(C32Error::InvalidVersion(version).into());
        }
        Ok(Self { version, hash160 })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn hash160(&self) -> &[u8; HASH160_LEN] {
        &self.hash160
    }

    /// Whether the version byte belongs to a mainnet address.
    pub fn is_mainnet(&self) -> bool {
        matches!(self.version, c32::MAINNET_SINGLE_SIG | c32::MAINNET_MULTI_SIG)
    }
}

impl FromStr for StandardPrincipal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (version, hash160) = c32::c32_address_decode(s)?;
        Self::new(version, hash160)
    }
}

impl fmt::Display for StandardPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = c32::c32_address(self.version, &self.hash160).map_err(|_| fmt::Error)?;
        f.write_str(&address)
    }
}

/// A fully qualified contract identifier: `<issuer>.<contract-name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId {
    issuer: StandardPrincipal,
    name: String,
}

impl ContractId {
    pub fn new(issuer: StandardPrincipal, name: impl Into<String>) -> Result<Self, PrincipalError> {
        let name = name.into();
        validate_contract_name(&name)?;
        Ok(Self { issuer, name })
    }

    pub fn issuer(&self) -> &StandardPrincipal {
        &self.issuer
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for ContractId {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, name) = get_contract_parts(s)?;
        Self::new(address.parse()?, name)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.issuer, self.name)
    }
}

/// Any principal a contract argument can reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Principal {
    Standard(StandardPrincipal),
    Contract(ContractId),
}

impl Principal {
    pub fn as_contract(&self) -> Option<&ContractId> {
        match self {
            Self::Contract(id) => Some(id),
            Self::Standard(_) => None,
        }
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('.') {
            Ok(Self::Contract(s.parse()?))
        } else {
            Ok(Self::Standard(s.parse()?))
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(p) => p.fmt(f),
            Self::Contract(id) => id.fmt(f),
        }
    }
}

impl From<StandardPrincipal> for Principal {
    fn from(p: StandardPrincipal) -> Self {
        Self::Standard(p)
    }
}

impl From<ContractId> for Principal {
    fn from(id: ContractId) -> Self {
        Self::Contract(id)
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(StandardPrincipal);
string_serde!(ContractId);
string_serde!(Principal);

/// Split `<address>.<name>` into its two parts.
pub fn get_contract_parts(identifier: &str) -> Result<(&str, &str), PrincipalError> {
    match identifier.split_once('.') {
        Some((address, name)) if !address.is_empty() && !name.is_empty() && !name.contains('.') => {
            Ok((address, name))
        }
        _ => Err(PrincipalError::InvalidContractId(identifier.to_string())),
    }
}

/// Whether `identifier` has the `<address>.<name>` shape. The address is not
/// checksummed here.
pub fn is_full_identifier(identifier: &str) -> bool {
    identifier.split('.').count() == 2
}

fn validate_contract_name(name: &str) -> Result<(), PrincipalError> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !starts_with_letter || !rest_ok || name.len() > CONTRACT_NAME_MAX_LENGTH {
        return Err(PrincipalError::InvalidContractName(name.to_string()));
    }
    Ok(())
}
