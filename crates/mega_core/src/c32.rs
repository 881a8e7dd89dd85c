//! c32check encoding for Stacks addresses.
//!
//! An address is `S` + one c32 character for the version byte + the c32
//! encoding of `hash160 || checksum`, where the checksum is the first four
//! bytes of `sha256(sha256(version || hash160))`.

use sha2::{Digest, Sha256};
use thiserror::Error;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Version byte of a mainnet single-signature address (`SP...`).
pub const MAINNET_SINGLE_SIG: u8 = 22;
/// Version byte of a mainnet multi-signature address (`SM...`).
pub const MAINNET_MULTI_SIG: u8 = 20;
/// Version byte of a testnet single-signature address (`ST...`).
pub const TESTNET_SINGLE_SIG: u8 = 26;
/// Version byte of a testnet multi-signature address (`SN...`).
pub const TESTNET_MULTI_SIG: u8 = 21;

/// Length of the hash160 carried by every standard address.
pub const HASH160_LEN: usize = 20;

/// Errors produced while decoding c32 / c32check strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum C32Error {
    #[error("Invalid c32 character: {0:?}")]
    InvalidCharacter(char),

    #[error("Invalid c32check string: checksum mismatch")]
    ChecksumMismatch,

    #[error("Invalid c32check string: too short")]
    TooShort,

    #[error("Invalid c32 version byte: {0}")]
    InvalidVersion(u8),

    #[error("Invalid c32 address: missing 'S' prefix")]
    MissingPrefix,

    #[error("Invalid c32 address: expected a {HASH160_LEN}-byte hash, got {0} bytes")]
    InvalidHashLength(usize),
}

/// Map a character to its 5-bit value, accepting the usual lookalikes.
fn c32_digit(ch: char) -> Result<u8, C32Error> {
    let normalized = match ch.to_ascii_uppercase() {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|c| *c as char == normalized)
        .map(|pos| pos as u8)
        .ok_or(C32Error::InvalidCharacter(ch))
}

fn double_sha256_checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(data);
    let first = hasher.finalize();
    let second = Sha256::digest(first);
    [second[0], second[1], second[2], second[3]]
}

/// Encode raw bytes as c32. Leading zero bytes become leading `0` characters.
pub fn c32_encode(data: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(data.len() * 8 / 5 + 1);
    let mut carry: u8 = 0;
    let mut carry_bits: u32 = 0;

    for byte in data.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = byte & ((1u8 << low_bits_to_take) - 1);
        out.push(C32_ALPHABET[((low_bits << carry_bits) + carry) as usize]);

        carry_bits = 8 + carry_bits - 5;
        carry = byte >> (8 - carry_bits);

        if carry_bits >= 5 {
            out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        out.push(C32_ALPHABET[carry as usize]);
    }

    while out.last() == Some(&C32_ALPHABET[0]) {
        out.pop();
    }
    for byte in data {
        if *byte != 0 {
            break;
        }
        out.push(C32_ALPHABET[0]);
    }

    out.iter().rev().map(|b| *b as char).collect()
}

/// Decode a c32 string into raw bytes.
pub fn c32_decode(input: &str) -> Result<Vec<u8>, C32Error> {
    let digits = input.chars().map(c32_digit).collect::<Result<Vec<u8>, _>>()?;
    let leading_zeros = digits.iter().take_while(|d| **d == 0).count();

    let mut result = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for digit in digits.iter().rev() {
        carry += u16::from(*digit) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            result.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }
    if carry_bits > 0 {
        result.push(carry as u8);
    }

    while result.last() == Some(&0) {
        result.pop();
    }
    result.extend(std::iter::repeat_n(0u8, leading_zeros));
    result.reverse();
    Ok(result)
}

/// Encode `data` with a version character and a 4-byte checksum.
pub fn c32check_encode(version: u8, data: &[u8]) -> Result<String, C32Error> {
    if version as usize >= C32_ALPHABET.len() {
        return Err(C32Error::InvalidVersion(version));
    }
    let mut payload = data.to_vec();
    payload.extend_from_slice(&double_sha256_checksum(version, data));

    let mut encoded = String::with_capacity(payload.len() * 8 / 5 + 2);
    encoded.push(C32_ALPHABET[version as usize] as char);
    encoded.push_str(&c32_encode(&payload));
    Ok(encoded)
}

/// Decode a c32check string into its version byte and payload.
pub fn c32check_decode(input: &str) -> Result<(u8, Vec<u8>), C32Error> {
    let mut chars = input.chars();
    let version_char = chars.next().ok_or(C32Error::TooShort)?;
    let rest = chars.as_str();
    if rest.is_empty() {
        return Err(C32Error::TooShort);
    }

    let version = c32_digit(version_char)?;
    let data_with_sum = c32_decode(rest)?;
    if data_with_sum.len() < 4 {
        return Err(C32Error::TooShort);
    }

    let (data, checksum) = data_with_sum.split_at(data_with_sum.len() - 4);
    if double_sha256_checksum(version, data) != checksum {
        return Err(C32Error::ChecksumMismatch);
    }
    Ok((version, data.to_vec()))
}

/// Render a standard Stacks address.
pub fn c32_address(version: u8, hash160: &[u8; HASH160_LEN]) -> Result<String, C32Error> {
    Ok(format!("S{}", c32check_encode(version, hash160)?))
}

/// Parse a standard Stacks address into `(version, hash160)`.
pub fn c32_address_decode(address: &str) -> Result<(u8, [u8; HASH160_LEN]), C32Error> {
    if address.len() <= 5 {
        return Err(C32Error::TooShort);
    }
    let body = address.strip_prefix('S').ok_or(C32Error::MissingPrefix)?;
    let (version, data) = c32check_decode(body)?;
    let hash: [u8; HASH160_LEN] = data
        .as_slice()
        .try_into()
        .map_err(|_| C32Error::InvalidHashLength(data.len()))?;
    Ok((version, hash))
}
