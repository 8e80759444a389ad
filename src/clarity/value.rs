//! Clarity values and their consensus serialization.

use std::collections::BTreeMap;
use std::fmt;

use crate::clarity::c32::StacksAddress;
use crate::clarity::{ClarityError, ClarityResult};

const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_BOOL_TRUE: u8 = 0x03;
const TYPE_BOOL_FALSE: u8 = 0x04;
const TYPE_PRINCIPAL_STANDARD: u8 = 0x05;
const TYPE_PRINCIPAL_CONTRACT: u8 = 0x06;
const TYPE_RESPONSE_OK: u8 = 0x07;
const TYPE_RESPONSE_ERR: u8 = 0x08;
const TYPE_OPTIONAL_NONE: u8 = 0x09;
const TYPE_OPTIONAL_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

/// Maximum nesting accepted when decoding untrusted node responses.
pub const MAX_DEPTH: usize = 64;

/// A Clarity value as exchanged with a Stacks node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    StandardPrincipal(StacksAddress),
    ContractPrincipal(StacksAddress, String),
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(BTreeMap<String, ClarityValue>),
    StringAscii(String),
    StringUtf8(String),
}

impl ClarityValue {
    pub fn uint(value: impl Into<u128>) -> Self {
        Self::UInt(value.into())
    }

    pub fn string_utf8(value: impl Into<String>) -> Self {
        Self::StringUtf8(value.into())
    }

    /// Parse a principal: either `ST…` or `ST….contract-name`.
    pub fn principal(value: &str) -> ClarityResult<Self> {
        match value.split_once('.') {
            Some((address, name)) => {
                validate_name(name)?;
                Ok(Self::ContractPrincipal(address.parse()?, name.to_string()))
            }
            None => Ok(Self::StandardPrincipal(value.parse()?)),
        }
    }

    pub fn some(value: ClarityValue) -> Self {
        Self::OptionalSome(Box::new(value))
    }

    pub fn ok(value: ClarityValue) -> Self {
        Self::ResponseOk(Box::new(value))
    }

    pub fn err(value: ClarityValue) -> Self {
        Self::ResponseErr(Box::new(value))
    }

    pub fn tuple<K: Into<String>>(fields: impl IntoIterator<Item = (K, ClarityValue)>) -> Self {
        Self::Tuple(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Buffer(_) => "buffer",
            Self::Bool(_) => "bool",
            Self::StandardPrincipal(_) | Self::ContractPrincipal(..) => "principal",
            Self::ResponseOk(_) | Self::ResponseErr(_) => "response",
            Self::OptionalNone | Self::OptionalSome(_) => "optional",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::StringAscii(_) => "string-ascii",
            Self::StringUtf8(_) => "string-utf8",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ClarityError {
        ClarityError::TypeMismatch {
            expected,
            actual: self.type_name(),
        }
    }

    pub fn as_u128(&self) -> ClarityResult<u128> {
        match self {
            Self::UInt(v) => Ok(*v),
            other => Err(other.mismatch("uint")),
        }
    }

    /// Unsigned value narrowed to u64; larger values are a mismatch.
    pub fn as_u64(&self) -> ClarityResult<u64> {
        let v = self.as_u128()?;
        u64::try_from(v).map_err(|_| ClarityError::TypeMismatch {
            expected: "uint within u64",
            actual: "uint",
        })
    }

    pub fn as_bool(&self) -> ClarityResult<bool> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_str(&self) -> ClarityResult<&str> {
        match self {
            Self::StringAscii(s) | Self::StringUtf8(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    /// Principal rendered as a Stacks address string.
    pub fn as_principal(&self) -> ClarityResult<String> {
        match self {
            Self::StandardPrincipal(addr) => Ok(addr.to_string()),
            Self::ContractPrincipal(addr, name) => Ok(format!("{}.{}", addr, name)),
            other => Err(other.mismatch("principal")),
        }
    }

    pub fn as_list(&self) -> ClarityResult<&[ClarityValue]> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn tuple_field(&self, name: &str) -> ClarityResult<&ClarityValue> {
        match self {
            Self::Tuple(fields) => fields
                .get(name)
                .ok_or_else(|| ClarityError::MissingField(name.to_string())),
            other => Err(other.mismatch("tuple")),
        }
    }

    pub fn into_optional(self) -> ClarityResult<Option<ClarityValue>> {
        match self {
            Self::OptionalNone => Ok(None),
            Self::OptionalSome(inner) => Ok(Some(*inner)),
            other => Err(other.mismatch("optional")),
        }
    }

    pub fn into_response(self) -> ClarityResult<Result<ClarityValue, ClarityValue>> {
        match self {
            Self::ResponseOk(inner) => Ok(Ok(*inner)),
            Self::ResponseErr(inner) => Ok(Err(*inner)),
            other => Err(other.mismatch("response")),
        }
    }

    /// Consensus serialization.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.serialize()))
    }

    pub fn from_hex(input: &str) -> ClarityResult<Self> {
        let stripped = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(stripped).map_err(|e| ClarityError::Hex(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    pub fn deserialize(bytes: &[u8]) -> ClarityResult<Self> {
        let mut reader = Reader { bytes, pos: 0 };
        let value = reader.read_value(0)?;
        let remaining = bytes.len() - reader.pos;
        if remaining > 0 {
            return Err(ClarityError::TrailingBytes(remaining));
        }
        Ok(value)
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Int(v) => {
                out.push(TYPE_INT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::UInt(v) => {
                out.push(TYPE_UINT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::Buffer(bytes) => {
                out.push(TYPE_BUFFER);
                write_len(out, bytes.len());
                out.extend_from_slice(bytes);
            }
            Self::Bool(true) => out.push(TYPE_BOOL_TRUE),
            Self::Bool(false) => out.push(TYPE_BOOL_FALSE),
            Self::StandardPrincipal(addr) => {
                out.push(TYPE_PRINCIPAL_STANDARD);
                write_address(out, addr);
            }
            Self::ContractPrincipal(addr, name) => {
                out.push(TYPE_PRINCIPAL_CONTRACT);
                write_address(out, addr);
                write_name(out, name);
            }
            Self::ResponseOk(inner) => {
                out.push(TYPE_RESPONSE_OK);
                inner.write_to(out);
            }
            Self::ResponseErr(inner) => {
                out.push(TYPE_RESPONSE_ERR);
                inner.write_to(out);
            }
            Self::OptionalNone => out.push(TYPE_OPTIONAL_NONE),
            Self::OptionalSome(inner) => {
                out.push(TYPE_OPTIONAL_SOME);
                inner.write_to(out);
            }
            Self::List(items) => {
                out.push(TYPE_LIST);
                write_len(out, items.len());
                for item in items {
                    item.write_to(out);
                }
            }
            Self::Tuple(fields) => {
                // BTreeMap iteration gives the sorted key order Clarity expects.
                out.push(TYPE_TUPLE);
                write_len(out, fields.len());
                for (name, value) in fields {
                    write_name(out, name);
                    value.write_to(out);
                }
            }
            Self::StringAscii(s) => {
                out.push(TYPE_STRING_ASCII);
                write_len(out, s.len());
                out.extend_from_slice(s.as_bytes());
            }
            Self::StringUtf8(s) => {
                out.push(TYPE_STRING_UTF8);
                write_len(out, s.len());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u32).to_be_bytes());
}

fn write_address(out: &mut Vec<u8>, addr: &StacksAddress) {
    out.push(addr.version);
    out.extend_from_slice(&addr.hash160);
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
}

fn validate_name(name: &str) -> ClarityResult<()> {
    if name.is_empty() || name.len() > 128 || !name.is_ascii() {
        return Err(ClarityError::InvalidName(name.to_string()));
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> ClarityResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ClarityError::UnexpectedEof(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> ClarityResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_len(&mut self) -> ClarityResult<usize> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
    }

    fn read_16(&mut self) -> ClarityResult<[u8; 16]> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16)?);
        Ok(buf)
    }

    fn read_address(&mut self) -> ClarityResult<StacksAddress> {
        let version = self.read_u8()?;
        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(self.take(20)?);
        StacksAddress::new(version, hash160)
    }

    fn read_name(&mut self) -> ClarityResult<String> {
        let len = self.read_u8()? as usize;
        let raw = self.take(len)?;
        let name = std::str::from_utf8(raw).map_err(|_| ClarityError::InvalidUtf8)?;
        validate_name(name)?;
        Ok(name.to_string())
    }

    fn read_string(&mut self) -> ClarityResult<String> {
        let len = self.read_len()?;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ClarityError::InvalidUtf8)
    }

    /// Upper bound for pre-allocation: every element needs at least one byte.
    fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.bytes.len() - self.pos)
    }

    fn read_value(&mut self, depth: usize) -> ClarityResult<ClarityValue> {
        if depth > MAX_DEPTH {
            return Err(ClarityError::TooDeep(MAX_DEPTH));
        }

        let prefix = self.read_u8()?;
        let value = match prefix {
            TYPE_INT => ClarityValue::Int(i128::from_be_bytes(self.read_16()?)),
            TYPE_UINT => ClarityValue::UInt(u128::from_be_bytes(self.read_16()?)),
            TYPE_BUFFER => {
                let len = self.read_len()?;
                ClarityValue::Buffer(self.take(len)?.to_vec())
            }
            TYPE_BOOL_TRUE => ClarityValue::Bool(true),
            TYPE_BOOL_FALSE => ClarityValue::Bool(false),
            TYPE_PRINCIPAL_STANDARD => ClarityValue::StandardPrincipal(self.read_address()?),
            TYPE_PRINCIPAL_CONTRACT => {
                let addr = self.read_address()?;
                ClarityValue::ContractPrincipal(addr, self.read_name()?)
            }
            TYPE_RESPONSE_OK => ClarityValue::ok(self.read_value(depth + 1)?),
            TYPE_RESPONSE_ERR => ClarityValue::err(self.read_value(depth + 1)?),
            TYPE_OPTIONAL_NONE => ClarityValue::OptionalNone,
            TYPE_OPTIONAL_SOME => ClarityValue::some(self.read_value(depth + 1)?),
            TYPE_LIST => {
                let count = self.read_len()?;
                let mut items = Vec::with_capacity(self.capacity_hint(count));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            TYPE_TUPLE => {
                let count = self.read_len()?;
                let mut fields = BTreeMap::new();
                for _ in 0..count {
                    let name = self.read_name()?;
                    let value = self.read_value(depth + 1)?;
                    fields.insert(name, value);
                }
                ClarityValue::Tuple(fields)
            }
            TYPE_STRING_ASCII => ClarityValue::StringAscii(self.read_string()?),
            TYPE_STRING_UTF8 => ClarityValue::StringUtf8(self.read_string()?),
            other => return Err(ClarityError::UnknownType(other)),
        };
        Ok(value)
    }
}

impl fmt::Display for ClarityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "u{}", v),
            Self::Buffer(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::Bool(v) => write!(f, "{}", v),
            Self::StandardPrincipal(addr) => write!(f, "'{}", addr),
            Self::ContractPrincipal(addr, name) => write!(f, "'{}.{}", addr, name),
            Self::ResponseOk(inner) => write!(f, "(ok {})", inner),
            Self::ResponseErr(inner) => write!(f, "(err {})", inner),
            Self::OptionalNone => write!(f, "none"),
            Self::OptionalSome(inner) => write!(f, "(some {})", inner),
            Self::List(items) => {
                write!(f, "(list")?;
                for item in items {
                    write!(f, " {}", item)?;
                }
                write!(f, ")")
            }
            Self::Tuple(fields) => {
                write!(f, "(tuple")?;
                for (name, value) in fields {
                    write!(f, " ({} {})", name, value)?;
                }
                write!(f, ")")
            }
            Self::StringAscii(s) => write!(f, "{:?}", s),
            Self::StringUtf8(s) => write!(f, "u{:?}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET_1: &str = "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5";

    #[test]
    fn test_uint_encoding() {
        assert_eq!(
            ClarityValue::uint(1u64).to_hex(),
            "0x0100000000000000000000000000000001"
        );
    }

    #[test]
    fn test_string_utf8_counts_bytes() {
        let value = ClarityValue::string_utf8("hé");
        assert_eq!(value.to_hex(), "0x0e0000000368c3a9");
    }

    #[test]
    fn test_standard_principal_encoding() {
        let value = ClarityValue::principal("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM").unwrap();
        assert_eq!(value.to_hex(), "0x051a6d78de7b0625dfbfc16c3a8a5735f6dc3dc3f2ce");
        assert_eq!(
            value.as_principal().unwrap(),
            "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"
        );
    }

    #[test]
    fn test_contract_principal() {
        let value =
            ClarityValue::principal("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM.guestbook").unwrap();
        let hex = value.to_hex();
        assert!(hex.starts_with("0x061a6d78de"));
        assert!(hex.ends_with("096775657374626f6f6b"));
        assert_eq!(ClarityValue::from_hex(&hex).unwrap(), value);
    }

    #[test]
    fn test_tuple_keys_sorted() {
        let value = ClarityValue::tuple([
            ("likes", ClarityValue::uint(0u64)),
            ("author", ClarityValue::Bool(true)),
        ]);
        let bytes = value.serialize();
        // prefix + count, then the first key must be "author".
        assert_eq!(&bytes[..5], &[0x0c, 0, 0, 0, 2]);
        assert_eq!(bytes[5], 6);
        assert_eq!(&bytes[6..12], b"author");
    }

    #[test]
    fn test_message_tuple_decoding() {
        let message = ClarityValue::some(ClarityValue::tuple([
            ("author", ClarityValue::principal(WALLET_1).unwrap()),
            ("content", ClarityValue::string_utf8("Hello, blockchain world!")),
            ("likes", ClarityValue::uint(3u64)),
            ("timestamp", ClarityValue::uint(42u64)),
        ]));

        let decoded = ClarityValue::from_hex(&message.to_hex()).unwrap();
        let tuple = decoded.into_optional().unwrap().unwrap();
        assert_eq!(tuple.tuple_field("author").unwrap().as_principal().unwrap(), WALLET_1);
        assert_eq!(
            tuple.tuple_field("content").unwrap().as_str().unwrap(),
            "Hello, blockchain world!"
        );
        assert_eq!(tuple.tuple_field("likes").unwrap().as_u64().unwrap(), 3);
        assert!(matches!(
            tuple.tuple_field("missing"),
            Err(ClarityError::MissingField(_))
        ));
    }

    #[test]
    fn test_response_values() {
        assert_eq!(ClarityValue::from_hex("0x0703").unwrap(), ClarityValue::ok(ClarityValue::Bool(true)));

        let err = ClarityValue::err(ClarityValue::uint(2u64));
        let decoded = ClarityValue::from_hex(&err.to_hex()).unwrap();
        assert_eq!(decoded.into_response().unwrap(), Err(ClarityValue::uint(2u64)));
    }

    #[test]
    fn test_none_and_list() {
        assert_eq!(ClarityValue::from_hex("09").unwrap(), ClarityValue::OptionalNone);
        let list = ClarityValue::List(vec![ClarityValue::Int(-1), ClarityValue::Bool(false)]);
        assert_eq!(ClarityValue::from_hex(&list.to_hex()).unwrap(), list);
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert_eq!(ClarityValue::from_hex("0xff"), Err(ClarityError::UnknownType(0xff)));
        assert!(matches!(
            ClarityValue::from_hex("0x0100"),
            Err(ClarityError::UnexpectedEof(_))
        ));
        assert_eq!(ClarityValue::from_hex("0x0303"), Err(ClarityError::TrailingBytes(1)));
        assert!(matches!(ClarityValue::from_hex("zz"), Err(ClarityError::Hex(_))));
        assert_eq!(
            ClarityValue::from_hex("0x0e00000001ff"),
            Err(ClarityError::InvalidUtf8)
        );
    }

    #[test]
    fn test_huge_list_count_does_not_allocate() {
        // Claims u32::MAX elements but carries none.
        assert!(matches!(
            ClarityValue::from_hex("0x0bffffffff"),
            Err(ClarityError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_depth_limit() {
        let mut hex = String::from("0x");
        for _ in 0..(MAX_DEPTH + 2) {
            hex.push_str("0a");
        }
        hex.push_str("09");
        assert_eq!(ClarityValue::from_hex(&hex), Err(ClarityError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_display() {
        let value = ClarityValue::ok(ClarityValue::uint(1u64));
        assert_eq!(value.to_string(), "(ok u1)");
        let liked = ClarityValue::tuple([("liked", ClarityValue::Bool(false))]);
        assert_eq!(liked.to_string(), "(tuple (liked false))");
    }

    #[test]
    fn test_accessor_type_mismatch() {
        let err = ClarityValue::Bool(true).as_u128().unwrap_err();
        assert_eq!(
            err,
            ClarityError::TypeMismatch {
                expected: "uint",
                actual: "bool"
            }
        );
    }
}
