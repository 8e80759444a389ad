//! c32check address encoding.
//!
//! Stacks addresses are `S` + a c32 version character + the c32 encoding of
//! `hash160 || checksum`, where the checksum is the first four bytes of
//! `sha256(sha256(version || hash160))`.

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::clarity::{ClarityError, ClarityResult};

const C32_CHARACTERS: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mainnet single-signature address version (`SP`).
pub const VERSION_MAINNET_SINGLESIG: u8 = 22;
/// Mainnet multi-signature address version (`SM`).
pub const VERSION_MAINNET_MULTISIG: u8 = 20;
/// Testnet single-signature address version (`ST`).
pub const VERSION_TESTNET_SINGLESIG: u8 = 26;
/// Testnet multi-signature address version (`SN`).
pub const VERSION_TESTNET_MULTISIG: u8 = 21;

/// Encode bytes as a c32 string.
pub fn c32_encode(input: &[u8]) -> String {
    let mut result = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u8 = 0;
    let mut carry_bits: u8 = 0;

    for &byte in input.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = byte & ((1u8 << low_bits_to_take) - 1);
        let c32_value = (low_bits << carry_bits) + carry;
        result.push(C32_CHARACTERS[c32_value as usize]);

        carry_bits = (8 + carry_bits) - 5;
        carry = byte >> (8 - carry_bits);

        if carry_bits >= 5 {
            result.push(C32_CHARACTERS[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        result.push(C32_CHARACTERS[carry as usize]);
    }

    // Strip the zero digits produced by the bit packing, then restore one
    // '0' per leading zero byte of the input.
    while result.last() == Some(&C32_CHARACTERS[0]) {
        result.pop();
    }
    for &byte in input {
        if byte != 0 {
            break;
        }
        result.push(C32_CHARACTERS[0]);
    }

    result.iter().rev().map(|&c| c as char).collect()
}

/// Decode a c32 string into bytes.
///
/// Decoding is case-insensitive and accepts the Crockford aliases
/// `O` → `0` and `I`/`L` → `1`.
pub fn c32_decode(input: &str) -> ClarityResult<Vec<u8>> {
    let digits = input
        .chars()
        .map(c32_digit)
        .collect::<ClarityResult<Vec<u8>>>()?;

    let mut result = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u8 = 0;

    for &digit in digits.iter().rev() {
        carry += (digit as u16) << carry_bits;
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
    for &digit in &digits {
        if digit != 0 {
            break;
        }
        result.push(0);
    }

    result.reverse();
    Ok(result)
}

fn c32_digit(c: char) -> ClarityResult<u8> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    C32_CHARACTERS
        .iter()
        .position(|&x| x as char == normalized)
        .map(|p| p as u8)
        .ok_or_else(|| ClarityError::InvalidAddress(format!("invalid c32 character '{}'", c)))
}

fn checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(data);
    let first = hasher.finalize();
    let second = Sha256::digest(first);

    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

/// A decoded Stacks address: version byte and 20-byte hash160.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StacksAddress {
    pub version: u8,
    pub hash160: [u8; 20],
}

impl StacksAddress {
    pub fn new(version: u8, hash160: [u8; 20]) -> ClarityResult<Self> {
        if version >= 32 {
            return Err(ClarityError::InvalidAddress(format!(
                "version {} does not fit in a c32 character",
                version
            )));
        }
        Ok(Self { version, hash160 })
    }

    /// Whether the address belongs to mainnet.
    pub fn is_mainnet(&self) -> bool {
        matches!(
            self.version,
            VERSION_MAINNET_SINGLESIG | VERSION_MAINNET_MULTISIG
        )
    }
}

impl FromStr for StacksAddress {
    type Err = ClarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || s.len() < 5 {
            return Err(ClarityError::InvalidAddress(s.to_string()));
        }
        let rest = s
            .strip_prefix('S')
            .ok_or_else(|| ClarityError::InvalidAddress(format!("'{}' does not start with S", s)))?;

        let version = c32_digit(rest.chars().next().unwrap_or('!'))?;
        let decoded = c32_decode(&rest[1..])?;
        if decoded.len() != 24 {
            return Err(ClarityError::InvalidAddress(format!(
                "'{}' decodes to {} bytes, expected 24",
                s,
                decoded.len()
            )));
        }

        let (hash, check) = decoded.split_at(20);
        if checksum(version, hash) != check {
            return Err(ClarityError::InvalidAddress(format!("bad checksum in '{}'", s)));
        }

        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(hash);
        Self::new(version, hash160)
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = self.hash160.to_vec();
        payload.extend_from_slice(&checksum(self.version, &self.hash160));
        write!(
            f,
            "S{}{}",
            C32_CHARACTERS[self.version as usize] as char,
            c32_encode(&payload)
        )
    }
}
