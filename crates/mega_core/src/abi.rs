//! Typed description of a contract's callable surface and storage, in the
//! same JSON shape the Clarity ABI endpoint produces.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::principal::Principal;
use crate::value::{ClarityValue, ResponseResult};

/// A Clarity type signature.
///
/// Primitive types serialize as bare strings (`"uint128"`), composite types
/// as single-key objects (`{"buffer": {"length": 34}}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClarityType {
    #[serde(rename = "uint128")]
    UInt128,
    #[serde(rename = "int128")]
    Int128,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "principal")]
    Principal,
    #[serde(rename = "trait_reference")]
    TraitReference,
    #[serde(rename = "none")]
    None,
    #[serde(rename = "buffer")]
    Buffer { length: u32 },
    #[serde(rename = "string-ascii")]
    StringAscii { length: u32 },
    #[serde(rename = "string-utf8")]
    StringUtf8 { length: u32 },
    #[serde(rename = "optional")]
    Optional(Box<ClarityType>),
    #[serde(rename = "tuple")]
    Tuple(Vec<TupleField>),
    #[serde(rename = "list")]
    List {
        #[serde(rename = "type")]
        item: Box<ClarityType>,
        length: u32,
    },
    #[serde(rename = "response")]
    Response {
        ok: Box<ClarityType>,
        error: Box<ClarityType>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ClarityType,
}

impl ClarityType {
    /// Whether `value` is a valid inhabitant of this type, including length
    /// bounds on buffers, strings and lists.
    pub fn admits(&self, value: &ClarityValue) -> bool {
        match (self, value) {
            (Self::UInt128, ClarityValue::UInt(_)) => true,
            (Self::Int128, ClarityValue::Int(_)) => true,
            (Self::Bool, ClarityValue::Bool(_)) => true,
            (Self::Principal, ClarityValue::Principal(_)) => true,
            (Self::TraitReference, ClarityValue::Principal(Principal::Contract(_))) => true,
            (Self::None, ClarityValue::Optional(None)) => true,
            (Self::Buffer { length }, ClarityValue::Buffer(bytes)) => bytes.len() <= *length as usize,
            (Self::StringAscii { length }, ClarityValue::StringAscii(s)) => {
                s.is_ascii() && s.len() <= *length as usize
            }
            (Self::StringUtf8 { length }, ClarityValue::StringUtf8(s)) => {
                s.chars().count() <= *length as usize
            }
            (Self::Optional(_), ClarityValue::Optional(None)) => true,
            (Self::Optional(inner), ClarityValue::Optional(Some(v))) => inner.admits(v),
            (Self::Tuple(fields), ClarityValue::Tuple(values)) => {
                fields.len() == values.len()
                    && fields
                        .iter()
                        .all(|f| values.get(&f.name).is_some_and(|v| f.ty.admits(v)))
            }
            (Self::List { item, length }, ClarityValue::List(items)) => {
                items.len() <= *length as usize && items.iter().all(|v| item.admits(v))
            }
            (Self::Response { ok, .. }, ClarityValue::Response(ResponseResult::Ok(v))) => ok.admits(v),
            (Self::Response { error, .. }, ClarityValue::Response(ResponseResult::Err(v))) => {
                error.admits(v)
            }
            _ => false,
        }
    }
}

/// Renders the type in Clarity signature syntax, e.g. `(list 100 bool)`.
impl fmt::Display for ClarityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt128 => f.write_str("uint"),
            Self::Int128 => f.write_str("int"),
            Self::Bool => f.write_str("bool"),
            Self::Principal => f.write_str("principal"),
            Self::TraitReference => f.write_str("<trait>"),
            Self::None => f.write_str("none"),
            Self::Buffer { length } => write!(f, "(buff {length})"),
            Self::StringAscii { length } => write!(f, "(string-ascii {length})"),
            Self::StringUtf8 { length } => write!(f, "(string-utf8 {length})"),
            Self::Optional(inner) => write!(f, "(optional {inner})"),
            Self::Tuple(fields) => {
                f.write_str("(tuple")?;
                for field in fields {
                    write!(f, " ({} {})", field.name, field.ty)?;
                }
                f.write_str(")")
            }
            Self::List { item, length } => write!(f, "(list {length} {item})"),
            Self::Response { ok, error } => write!(f, "(response {ok} {error})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionAccess {
    Private,
    Public,
    ReadOnly,
}

impl fmt::Display for FunctionAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Public => f.write_str("public"),
            Self::ReadOnly => f.write_str("read_only"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionArg {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ClarityType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionOutput {
    #[serde(rename = "type")]
    pub ty: ClarityType,
}

/// One callable contract function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionAbi {
    pub name: String,
    pub access: FunctionAccess,
    pub args: Vec<FunctionArg>,
    pub outputs: FunctionOutput,
}

impl FunctionAbi {
    pub fn output_type(&self) -> &ClarityType {
        &self.outputs.ty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableAccess {
    Constant,
    Variable,
}

/// A data variable or constant. `default_value` carries the deployed value
/// of constants and the initial value of variables, when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableAbi {
    pub name: String,
    pub access: VariableAccess,
    #[serde(rename = "type")]
    pub ty: ClarityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl VariableAbi {
    pub fn is_constant(&self) -> bool {
        self.access == VariableAccess::Constant
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapAbi {
    pub name: String,
    pub key: ClarityType,
    pub value: ClarityType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleTokenAbi {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFungibleTokenAbi {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ClarityType,
}

/// Wire form of one contract entry in the embedded table.
#[derive(Debug, Clone, Deserialize)]
struct RawContract {
    contract_name: String,
    clarity_version: String,
    functions: Vec<FunctionAbi>,
    variables: Vec<VariableAbi>,
    maps: Vec<MapAbi>,
    fungible_tokens: Vec<FungibleTokenAbi>,
    non_fungible_tokens: Vec<NonFungibleTokenAbi>,
}

/// Complete typed description of one contract, indexed by Clarity name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawContract")]
pub struct ContractDescriptor {
    pub contract_name: String,
    pub clarity_version: String,
    pub functions: BTreeMap<String, FunctionAbi>,
    pub variables: BTreeMap<String, VariableAbi>,
    pub maps: BTreeMap<String, MapAbi>,
    pub fungible_tokens: Vec<FungibleTokenAbi>,
    pub non_fungible_tokens: Vec<NonFungibleTokenAbi>,
}

impl From<RawContract> for ContractDescriptor {
    fn from(raw: RawContract) -> Self {
        Self {
            contract_name: raw.contract_name,
            clarity_version: raw.clarity_version,
            functions: raw
                .functions
                .into_iter()
                .map(|f| (f.name.clone(), f))
                .collect(),
            variables: raw
                .variables
                .into_iter()
                .map(|v| (v.name.clone(), v))
                .collect(),
            maps: raw.maps.into_iter().map(|m| (m.name.clone(), m)).collect(),
            fungible_tokens: raw.fungible_tokens,
            non_fungible_tokens: raw.non_fungible_tokens,
        }
    }
}

impl ContractDescriptor {
    pub fn function(&self, name: &str) -> Option<&FunctionAbi> {
        self.functions.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableAbi> {
        self.variables.get(name)
    }

    pub fn map(&self, name: &str) -> Option<&MapAbi> {
        self.maps.get(name)
    }

    /// Functions callable through a read-only query (everything but private).
    pub fn callable_functions(&self) -> impl Iterator<Item = &FunctionAbi> {
        self.functions
            .values()
            .filter(|f| f.access != FunctionAccess::Private)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ClarityType {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_primitive_and_composite_types() {
        assert_eq!(parse(json!("uint128")), ClarityType::UInt128);
        assert_eq!(parse(json!("trait_reference")), ClarityType::TraitReference);
        assert_eq!(
            parse(json!({ "optional": { "buffer": { "length": 34 } } })),
            ClarityType::Optional(Box::new(ClarityType::Buffer { length: 34 }))
        );
        let list = parse(json!({
            "list": {
                "type": { "tuple": [
                    { "name": "enabled", "type": "bool" },
                    { "name": "token", "type": "principal" }
                ] },
                "length": 100
            }
        }));
        assert_eq!(list.to_string(), "(list 100 (tuple (enabled bool) (token principal)))");
    }

    #[test]
    fn serializes_back_to_abi_shape() {
        let ty = ClarityType::Response {
            ok: Box::new(ClarityType::StringAscii { length: 4 }),
            error: Box::new(ClarityType::None),
        };
        assert_eq!(
            serde_json::to_value(&ty).unwrap(),
            json!({ "response": { "ok": { "string-ascii": { "length": 4 } }, "error": "none" } })
        );
    }

    #[test]
    fn admits_respects_bounds() {
        let memo = ClarityType::Optional(Box::new(ClarityType::Buffer { length: 34 }));
        assert!(memo.admits(&ClarityValue::none()));
        assert!(memo.admits(&ClarityValue::some(ClarityValue::buffer(vec![0u8; 34]))));
        assert!(!memo.admits(&ClarityValue::some(ClarityValue::buffer(vec![0u8; 35]))));

        let param = ClarityType::StringAscii { length: 34 };
        assert!(param.admits(&ClarityValue::ascii("proposeThreshold")));
        assert!(!param.admits(&ClarityValue::utf8("proposeThreshold")));
        assert!(!param.admits(&ClarityValue::ascii("é")));
    }

    #[test]
    fn trait_reference_needs_contract_principal() {
        let standard = ClarityValue::principal("SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH335").unwrap();
        let contract =
            ClarityValue::principal("SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH335.mega").unwrap();
        assert!(ClarityType::Principal.admits(&standard));
        assert!(ClarityType::Principal.admits(&contract));
        assert!(!ClarityType::TraitReference.admits(&standard));
        assert!(ClarityType::TraitReference.admits(&contract));
    }

    #[test]
    fn tuple_requires_exact_fields() {
        let ty = ClarityType::Tuple(vec![
            TupleField {
                name: "for".into(),
                ty: ClarityType::Bool,
            },
            TupleField {
                name: "delegator".into(),
                ty: ClarityType::Optional(Box::new(ClarityType::Principal)),
            },
        ]);
        let full = ClarityValue::tuple([
            ("for", ClarityValue::from(true)),
            ("delegator", ClarityValue::none()),
        ]);
        let partial = ClarityValue::tuple([("for", ClarityValue::from(true))]);
        assert!(ty.admits(&full));
        assert!(!ty.admits(&partial));
    }
}
