//! Clarity consensus serialization of values.
//!
//! Only used beneath the transport seam and to encode payload arguments;
//! callers above it deal in [`ClarityValue`]s.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::c32::HASH160_LEN;
use crate::principal::{ContractId, Principal, PrincipalError, StandardPrincipal};
use crate::value::{ClarityValue, ResponseResult};

const PREFIX_INT: u8 = 0x00;
const PREFIX_UINT: u8 = 0x01;
const PREFIX_BUFFER: u8 = 0x02;
const PREFIX_TRUE: u8 = 0x03;
const PREFIX_FALSE: u8 = 0x04;
const PREFIX_STANDARD_PRINCIPAL: u8 = 0x05;
const PREFIX_CONTRACT_PRINCIPAL: u8 = 0x06;
const PREFIX_RESPONSE_OK: u8 = 0x07;
const PREFIX_RESPONSE_ERR: u8 = 0x08;
const PREFIX_NONE: u8 = 0x09;
const PREFIX_SOME: u8 = 0x0a;
const PREFIX_LIST: u8 = 0x0b;
const PREFIX_TUPLE: u8 = 0x0c;
const PREFIX_STRING_ASCII: u8 = 0x0d;
const PREFIX_STRING_UTF8: u8 = 0x0e;

/// Deepest nesting the node will accept.
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unknown type prefix 0x{0:02x}")]
    UnknownPrefix(u8),

    #[error("value nested deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("length {0} does not fit the wire format")]
    TooLong(usize),

    #[error("string is not valid {0}")]
    InvalidString(&'static str),

    #[error("invalid principal: {0}")]
    Principal(#[from] PrincipalError),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Serialize a value to its consensus bytes.
pub fn serialize(value: &ClarityValue) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// Serialize a value to `0x`-prefixed hex, the form the node API expects.
pub fn to_hex(value: &ClarityValue) -> Result<String, CodecError> {
    Ok(format!("0x{}", hex::encode(serialize(value)?)))
}

/// Decode exactly one value from `bytes`.
pub fn deserialize(bytes: &[u8]) -> Result<ClarityValue, CodecError> {
    let mut reader = Reader { bytes, pos: 0 };
    let value = reader.read_value(0)?;
    let rest = bytes.len() - reader.pos;
    if rest != 0 {
        return Err(CodecError::TrailingBytes(rest));
    }
    Ok(value)
}

/// Decode a hex string, with or without a `0x` prefix.
pub fn from_hex(s: &str) -> Result<ClarityValue, CodecError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    deserialize(&hex::decode(trimmed)?)
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::TooLong(len))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_standard(out: &mut Vec<u8>, p: &StandardPrincipal) {
    out.push(p.version());
    out.extend_from_slice(p.hash160());
}

fn write_value(out: &mut Vec<u8>, value: &ClarityValue) -> Result<(), CodecError> {
    match value {
        ClarityValue::Int(n) => {
            out.push(PREFIX_INT);
            out.extend_from_slice(&n.to_be_bytes());
        }
        ClarityValue::UInt(n) => {
            out.push(PREFIX_UINT);
            out.extend_from_slice(&n.to_be_bytes());
        }
        ClarityValue::Bool(true) => out.push(PREFIX_TRUE),
        ClarityValue::Bool(false) => out.push(PREFIX_FALSE),
        ClarityValue::Buffer(bytes) => {
            out.push(PREFIX_BUFFER);
            write_len(out, bytes.len())?;
            out.extend_from_slice(bytes);
        }
        ClarityValue::StringAscii(s) => {
            if !s.is_ascii() {
                return Err(CodecError::InvalidString("ascii"));
            }
            out.push(PREFIX_STRING_ASCII);
            write_len(out, s.len())?;
            out.extend_from_slice(s.as_bytes());
        }
        ClarityValue::StringUtf8(s) => {
            out.push(PREFIX_STRING_UTF8);
            write_len(out, s.len())?;
            out.extend_from_slice(s.as_bytes());
        }
        ClarityValue::Principal(Principal::Standard(p)) => {
            out.push(PREFIX_STANDARD_PRINCIPAL);
            write_standard(out, p);
        }
        ClarityValue::Principal(Principal::Contract(id)) => {
            out.push(PREFIX_CONTRACT_PRINCIPAL);
            write_standard(out, id.issuer());
            let name = id.name().as_bytes();
            let len = u8::try_from(name.len()).map_err(|_| CodecError::TooLong(name.len()))?;
            out.push(len);
            out.extend_from_slice(name);
        }
        ClarityValue::Optional(None) => out.push(PREFIX_NONE),
        ClarityValue::Optional(Some(inner)) => {
            out.push(PREFIX_SOME);
            write_value(out, inner)?;
        }
        ClarityValue::Response(ResponseResult::Ok(inner)) => {
            out.push(PREFIX_RESPONSE_OK);
            write_value(out, inner)?;
        }
        ClarityValue::Response(ResponseResult::Err(inner)) => {
            out.push(PREFIX_RESPONSE_ERR);
            write_value(out, inner)?;
        }
        ClarityValue::List(items) => {
            out.push(PREFIX_LIST);
            write_len(out, items.len())?;
            for item in items {
                write_value(out, item)?;
            }
        }
        ClarityValue::Tuple(fields) => {
            out.push(PREFIX_TUPLE);
            write_len(out, fields.len())?;
            // BTreeMap iteration order is the canonical (sorted) field order.
            for (name, field) in fields {
                let len = u8::try_from(name.len()).map_err(|_| CodecError::TooLong(name.len()))?;
                out.push(len);
                out.extend_from_slice(name.as_bytes());
                write_value(out, field)?;
            }
        }
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEnd)?;
        let slice = self.bytes.get(self.pos..end).ok_or(CodecError::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn len(&mut self) -> Result<usize, CodecError> {
        let raw: [u8; 4] = self.take(4)?.try_into().map_err(|_| CodecError::UnexpectedEnd)?;
        Ok(u32::from_be_bytes(raw) as usize)
    }

    fn array16(&mut self) -> Result<[u8; 16], CodecError> {
        self.take(16)?.try_into().map_err(|_| CodecError::UnexpectedEnd)
    }

    fn standard(&mut self) -> Result<StandardPrincipal, CodecError> {
        let version = self.byte()?;
        let hash: [u8; HASH160_LEN] = self
            .take(HASH160_LEN)?
            .try_into()
            .map_err(|_| CodecError::UnexpectedEnd)?;
        Ok(StandardPrincipal::new(version, hash)?)
    }

    fn utf8(&mut self, len: usize, kind: &'static str) -> Result<String, CodecError> {
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidString(kind))
    }

    fn read_value(&mut self, depth: usize) -> Result<ClarityValue, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep);
        }
        let prefix = self.byte()?;
        let value = match prefix {
            PREFIX_INT => ClarityValue::Int(i128::from_be_bytes(self.array16()?)),
            PREFIX_UINT => ClarityValue::UInt(u128::from_be_bytes(self.array16()?)),
            PREFIX_BUFFER => {
                let len = self.len()?;
                ClarityValue::Buffer(self.take(len)?.to_vec())
            }
            PREFIX_TRUE => ClarityValue::Bool(true),
            PREFIX_FALSE => ClarityValue::Bool(false),
            PREFIX_STANDARD_PRINCIPAL => ClarityValue::Principal(Principal::Standard(self.standard()?)),
            PREFIX_CONTRACT_PRINCIPAL => {
                let issuer = self.standard()?;
                let len = self.byte()? as usize;
                let name = self.utf8(len, "contract name")?;
                ClarityValue::Principal(Principal::Contract(ContractId::new(issuer, name)?))
            }
            PREFIX_RESPONSE_OK => ClarityValue::ok(self.read_value(depth + 1)?),
            PREFIX_RESPONSE_ERR => ClarityValue::err(self.read_value(depth + 1)?),
            PREFIX_NONE => ClarityValue::none(),
            PREFIX_SOME => ClarityValue::some(self.read_value(depth + 1)?),
            PREFIX_LIST => {
                let count = self.len()?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            PREFIX_TUPLE => {
                let count = self.len()?;
                let mut fields = BTreeMap::new();
                for _ in 0..count {
                    let name_len = self.byte()? as usize;
                    let name = self.utf8(name_len, "tuple field name")?;
                    let field = self.read_value(depth + 1)?;
                    fields.insert(name, field);
                }
                ClarityValue::Tuple(fields)
            }
            PREFIX_STRING_ASCII => {
                let len = self.len()?;
                let s = self.utf8(len, "ascii")?;
                if !s.is_ascii() {
                    return Err(CodecError::InvalidString("ascii"));
                }
                ClarityValue::StringAscii(s)
            }
            PREFIX_STRING_UTF8 => {
                let len = self.len()?;
                ClarityValue::StringUtf8(self.utf8(len, "utf-8")?)
            }
            other => return Err(CodecError::UnknownPrefix(other)),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYER: &str = "SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH335";
    const DEPLOYER_HASH: &str = "da6b6c4a62ece9fa5a652278baa014ec83df3644";

    #[test]
    fn uint_vector() {
        assert_eq!(
            to_hex(&ClarityValue::uint(5_000_000u64)).unwrap(),
            "0x01000000000000000000000000004c4b40"
        );
    }

    #[test]
    fn principal_vectors() {
        let standard = ClarityValue::principal(DEPLOYER).unwrap();
        assert_eq!(to_hex(&standard).unwrap(), format!("0x0516{DEPLOYER_HASH}"));

        let contract = ClarityValue::principal(&format!("{DEPLOYER}.mega")).unwrap();
        assert_eq!(
            to_hex(&contract).unwrap(),
            format!("0x0616{DEPLOYER_HASH}046d656761")
        );
    }

    #[test]
    fn string_and_optional_vectors() {
        assert_eq!(
            to_hex(&ClarityValue::ascii("mega")).unwrap(),
            "0x0d000000046d656761"
        );
        assert_eq!(to_hex(&ClarityValue::none()).unwrap(), "0x09");
        assert_eq!(
            to_hex(&ClarityValue::some(ClarityValue::from(true))).unwrap(),
            "0x0a03"
        );
    }

    #[test]
    fn tuple_fields_are_sorted() {
        let value = ClarityValue::tuple([
            ("for", ClarityValue::from(true)),
            ("delegator", ClarityValue::none()),
        ]);
        // count=2, "delegator" then "for"
        assert_eq!(
            to_hex(&value).unwrap(),
            "0x0c000000020964656c656761746f720903666f7203"
        );
    }

    #[test]
    fn decodes_read_only_results() {
        let ok_six = from_hex("0x070100000000000000000000000000000006").unwrap();
        assert_eq!(ok_six, ClarityValue::ok(ClarityValue::uint(6u8)));

        let proposal = ClarityValue::some(ClarityValue::tuple([
            ("concluded", ClarityValue::from(false)),
            ("proposer", ClarityValue::principal(DEPLOYER).unwrap()),
            ("votesFor", ClarityValue::uint(42u8)),
        ]));
        let encoded = serialize(&proposal).unwrap();
        assert_eq!(deserialize(&encoded).unwrap(), proposal);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(from_hex("0x01ff"), Err(CodecError::UnexpectedEnd)));
        assert!(matches!(from_hex("0x2a"), Err(CodecError::UnknownPrefix(0x2a))));
        assert!(matches!(from_hex("0x0303"), Err(CodecError::TrailingBytes(1))));
        assert!(matches!(from_hex("zz"), Err(CodecError::Hex(_))));

        let deep = "0a".repeat(MAX_DEPTH + 2) + "09";
        assert!(matches!(from_hex(&deep), Err(CodecError::TooDeep)));
    }
}
