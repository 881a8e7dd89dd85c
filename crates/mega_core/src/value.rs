//! Runtime Clarity values and the response envelope returned by read-only
//! calls.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::principal::{ContractId, Principal, PrincipalError};

/// Tagged success/failure envelope. Exactly one branch is populated; check
/// the tag (or call [`ResponseResult::into_result`]) before using the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResponseResult<T, E> {
    Ok(T),
    Err(E),
}

impl<T, E> ResponseResult<T, E> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
        }
    }

    pub fn as_ref(&self) -> ResponseResult<&T, &E> {
        match self {
            Self::Ok(v) => ResponseResult::Ok(v),
            Self::Err(e) => ResponseResult::Err(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseResult<U, E> {
        match self {
            Self::Ok(v) => ResponseResult::Ok(f(v)),
            Self::Err(e) => ResponseResult::Err(e),
        }
    }

    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> ResponseResult<T, F> {
        match self {
            Self::Ok(v) => ResponseResult::Ok(v),
            Self::Err(e) => ResponseResult::Err(f(e)),
        }
    }
}

impl<T, E> From<Result<T, E>> for ResponseResult<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(e),
        }
    }
}

/// Serialized as `{ "isOk": bool, "value": ... }`.
impl<T: Serialize, E: Serialize> Serialize for ResponseResult<T, E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResponseResult", 2)?;
        match self {
            Self::Ok(v) => {
                state.serialize_field("isOk", &true)?;
                state.serialize_field("value", v)?;
            }
            Self::Err(e) => {
                state.serialize_field("isOk", &false)?;
                state.serialize_field("value", e)?;
            }
        }
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected a {expected} value, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("tuple has no field {0:?}")]
    MissingField(String),
}

/// A Clarity value as passed to or returned from a contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Bool(bool),
    Buffer(Vec<u8>),
    StringAscii(String),
    StringUtf8(String),
    Principal(Principal),
    Optional(Option<Box<ClarityValue>>),
    Response(ResponseResult<Box<ClarityValue>, Box<ClarityValue>>),
    Tuple(BTreeMap<String, ClarityValue>),
    List(Vec<ClarityValue>),
}

impl ClarityValue {
    pub fn uint(n: impl Into<u128>) -> Self {
        Self::UInt(n.into())
    }

    pub fn int(n: impl Into<i128>) -> Self {
        Self::Int(n.into())
    }

    pub fn ascii(s: impl Into<String>) -> Self {
        Self::StringAscii(s.into())
    }

    pub fn utf8(s: impl Into<String>) -> Self {
        Self::StringUtf8(s.into())
    }

    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Buffer(bytes.into())
    }

    /// Parse a standard or contract principal from its string form.
    pub fn principal(s: &str) -> Result<Self, PrincipalError> {
        Ok(Self::Principal(s.parse()?))
    }

    /// Parse a contract principal (`<address>.<name>`), as required by trait
    /// reference arguments.
    pub fn contract(s: &str) -> Result<Self, PrincipalError> {
        let id: ContractId = s.parse()?;
        Ok(Self::Principal(Principal::Contract(id)))
    }

    pub fn some(value: ClarityValue) -> Self {
        Self::Optional(Some(Box::new(value)))
    }

    pub fn none() -> Self {
        Self::Optional(None)
    }

    pub fn optional(value: Option<ClarityValue>) -> Self {
        Self::Optional(value.map(Box::new))
    }

    pub fn ok(value: ClarityValue) -> Self {
        Self::Response(ResponseResult::Ok(Box::new(value)))
    }

    pub fn err(value: ClarityValue) -> Self {
        Self::Response(ResponseResult::Err(Box::new(value)))
    }

    pub fn tuple<K: Into<String>>(fields: impl IntoIterator<Item = (K, ClarityValue)>) -> Self {
        Self::Tuple(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = ClarityValue>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Short Clarity name of the value's kind, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Bool(_) => "bool",
            Self::Buffer(_) => "buff",
            Self::StringAscii(_) => "string-ascii",
            Self::StringUtf8(_) => "string-utf8",
            Self::Principal(_) => "principal",
            Self::Optional(_) => "optional",
            Self::Response(_) => "response",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::Mismatch {
            expected,
            found: self.type_name(),
        }
    }

    pub fn expect_u128(self) -> Result<u128, ValueError> {
        match self {
            Self::UInt(n) => Ok(n),
            other => Err(other.mismatch("uint")),
        }
    }

    pub fn expect_i128(self) -> Result<i128, ValueError> {
        match self {
            Self::Int(n) => Ok(n),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn expect_bool(self) -> Result<bool, ValueError> {
        match self {
            Self::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }

    /// Either string flavour.
    pub fn expect_string(self) -> Result<String, ValueError> {
        match self {
            Self::StringAscii(s) | Self::StringUtf8(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn expect_buffer(self) -> Result<Vec<u8>, ValueError> {
        match self {
            Self::Buffer(b) => Ok(b),
            other => Err(other.mismatch("buff")),
        }
    }

    pub fn expect_principal(self) -> Result<Principal, ValueError> {
        match self {
            Self::Principal(p) => Ok(p),
            other => Err(other.mismatch("principal")),
        }
    }

    pub fn expect_optional(self) -> Result<Option<ClarityValue>, ValueError> {
        match self {
            Self::Optional(v) => Ok(v.map(|b| *b)),
            other => Err(other.mismatch("optional")),
        }
    }

    pub fn expect_response(self) -> Result<ResponseResult<ClarityValue, ClarityValue>, ValueError> {
        match self {
            Self::Response(r) => Ok(r.map(|b| *b).map_err(|b| *b)),
            other => Err(other.mismatch("response")),
        }
    }

    pub fn expect_tuple(self) -> Result<BTreeMap<String, ClarityValue>, ValueError> {
        match self {
            Self::Tuple(fields) => Ok(fields),
            other => Err(other.mismatch("tuple")),
        }
    }

    pub fn expect_list(self) -> Result<Vec<ClarityValue>, ValueError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }
}

/// Remove a named field from a decoded tuple.
pub fn take_field(
    fields: &mut BTreeMap<String, ClarityValue>,
    name: &str,
) -> Result<ClarityValue, ValueError> {
    fields
        .remove(name)
        .ok_or_else(|| ValueError::MissingField(name.to_string()))
}

impl From<bool> for ClarityValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Principal> for ClarityValue {
    fn from(p: Principal) -> Self {
        Self::Principal(p)
    }
}

impl From<ContractId> for ClarityValue {
    fn from(id: ContractId) -> Self {
        Self::Principal(Principal::Contract(id))
    }
}

/// Renders the value in Clarity literal syntax.
impl fmt::Display for ClarityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "u{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Buffer(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::StringAscii(s) => write!(f, "{s:?}"),
            Self::StringUtf8(s) => write!(f, "u{s:?}"),
            Self::Principal(p) => write!(f, "'{p}"),
            Self::Optional(None) => f.write_str("none"),
            Self::Optional(Some(v)) => write!(f, "(some {v})"),
            Self::Response(ResponseResult::Ok(v)) => write!(f, "(ok {v})"),
            Self::Response(ResponseResult::Err(v)) => write!(f, "(err {v})"),
            Self::Tuple(fields) => {
                f.write_str("(tuple")?;
                for (name, value) in fields {
                    write!(f, " ({name} {value})")?;
                }
                f.write_str(")")
            }
            Self::List(items) => {
                f.write_str("(list")?;
                for item in items {
                    write!(f, " {item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// JSON view of a value. 128-bit integers are written as strings so they
/// survive JSON consumers that only have doubles.
impl Serialize for ClarityValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(n) => serializer.collect_str(n),
            Self::UInt(n) => serializer.collect_str(n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Buffer(bytes) => serializer.collect_str(&format_args!("0x{}", hex::encode(bytes))),
            Self::StringAscii(s) | Self::StringUtf8(s) => serializer.serialize_str(s),
            Self::Principal(p) => serializer.collect_str(p),
            Self::Optional(None) => serializer.serialize_none(),
            Self::Optional(Some(v)) => serializer.serialize_some(v),
            Self::Response(r) => r.serialize(serializer),
            Self::Tuple(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractors_check_the_kind() {
        assert_eq!(ClarityValue::uint(7u64).expect_u128().unwrap(), 7);
        let err = ClarityValue::from(true).expect_u128().unwrap_err();
        assert_eq!(
            err,
            ValueError::Mismatch {
                expected: "uint",
                found: "bool"
            }
        );
    }

    #[test]
    fn response_envelope_unwraps() {
        let ok = ClarityValue::ok(ClarityValue::uint(6u8)).expect_response().unwrap();
        assert!(ok.is_ok());
        assert_eq!(ok.into_result().unwrap(), ClarityValue::UInt(6));

        let err = ClarityValue::err(ClarityValue::uint(2509u32))
            .expect_response()
            .unwrap();
        assert!(err.is_err());
        assert_eq!(err.into_result().unwrap_err(), ClarityValue::UInt(2509));
    }

    #[test]
    fn tuple_fields_are_taken_by_name() {
        let mut fields = ClarityValue::tuple([
            ("passed", ClarityValue::from(false)),
            ("votesFor", ClarityValue::uint(10u8)),
        ])
        .expect_tuple()
        .unwrap();
        assert_eq!(take_field(&mut fields, "votesFor").unwrap(), ClarityValue::UInt(10));
        assert_eq!(
            take_field(&mut fields, "votesFor").unwrap_err(),
            ValueError::MissingField("votesFor".into())
        );
    }

    #[test]
    fn display_uses_clarity_syntax() {
        let v = ClarityValue::tuple([
            ("for", ClarityValue::from(true)),
            ("delegator", ClarityValue::none()),
        ]);
        assert_eq!(v.to_string(), "(tuple (delegator none) (for true))");
        assert_eq!(ClarityValue::some(ClarityValue::uint(3u8)).to_string(), "(some u3)");
    }

    #[test]
    fn json_view_stringifies_big_integers() {
        let v = ClarityValue::ok(ClarityValue::UInt(u128::MAX));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["isOk"], true);
        assert_eq!(json["value"], u128::MAX.to_string());
        assert_eq!(serde_json::to_value(ClarityValue::none()).unwrap(), serde_json::Value::Null);
    }
}
