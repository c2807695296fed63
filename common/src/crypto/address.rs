use crate::{
    config::{
        LEGACY_ADDRESS_LEN, NATIVE_ADDRESS_MAX_LEN, NATIVE_ADDRESS_MIN_LEN, PREFIX_ADDRESS,
        PREFIX_LEGACY_ADDRESS,
    },
    serializer::{Reader, ReaderError, Serializer, Writer},
};
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

use super::Hash;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Address '{0}' has an unknown prefix")]
    UnknownPrefix(String),

    #[error("Address '{0}' has an invalid length")]
    InvalidLength(String),

    #[error("Address '{0}' contains invalid characters")]
    InvalidCharacters(String),
}

// Which recognized textual form an address uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    // usdtg1... form
    Native,
    // 0x... form kept for legacy compat
    Legacy,
}

// Canonicalized account identifier.
// The inner string is guaranteed to be in canonical form: construction
// validates, and equality is byte-exact afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    // Parse and canonicalize a textual address.
    // Legacy hex addresses are lowercased; native addresses are accepted
    // as-is since their alphabet is already lowercase.
    pub fn parse(value: &str) -> Result<Self, AddressError> {
        if value.is_empty() {
            return Err(AddressError::Empty);
        }

        if let Some(payload) = value.strip_prefix(PREFIX_ADDRESS) {
            if payload.len() < NATIVE_ADDRESS_MIN_LEN || payload.len() > NATIVE_ADDRESS_MAX_LEN {
                return Err(AddressError::InvalidLength(value.to_string()));
            }

            if !payload
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            {
                return Err(AddressError::InvalidCharacters(value.to_string()));
            }

            return Ok(Self(value.to_string()));
        }

        let lowered = value.to_ascii_lowercase();
        if let Some(payload) = lowered.strip_prefix(PREFIX_LEGACY_ADDRESS) {
            if payload.len() != LEGACY_ADDRESS_LEN {
                return Err(AddressError::InvalidLength(value.to_string()));
            }

            if !payload.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(AddressError::InvalidCharacters(value.to_string()));
            }

            return Ok(Self(lowered));
        }

        Err(AddressError::UnknownPrefix(value.to_string()))
    }

    // Derive a native-form address from a hash.
    // The hex alphabet is a subset of the native alphabet, so the first
    // 52 hex chars of the digest form a valid payload.
    pub fn from_hash(hash: &Hash) -> Self {
        let hex = hash.to_hex();
        Self(format!("{}{}", PREFIX_ADDRESS, &hex[..52]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> AddressKind {
        if self.0.starts_with(PREFIX_ADDRESS) {
            AddressKind::Native
        } else {
            AddressKind::Legacy
        }
    }

    pub fn is_native(&self) -> bool {
        self.kind() == AddressKind::Native
    }
}

// True iff the value parses as one of the recognized forms
pub fn validate_address(value: &str) -> bool {
    Address::parse(value).is_ok()
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serializer for Address {
    fn write(&self, writer: &mut Writer) {
        writer.write_string(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let value = reader.read_string()?;
        Address::parse(&value).map_err(|_| ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        2 + self.0.len()
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'a> Deserialize<'a> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let value = String::deserialize(deserializer)?;
        Address::parse(&value).map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AIRDROP_RESERVE_ADDRESS, BONUS_RESERVE_ADDRESS, BRIDGE_RESERVE_ADDRESS};
    use crate::crypto::hash;

    #[test]
    fn test_native_address() {
        let address = Address::parse("usdtg1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq").unwrap();
        assert!(address.is_native());
    }

    #[test]
    fn test_legacy_address_is_lowercased() {
        let address = Address::parse("0xAB5801A7D398351B8BE11C439E05C5B3259AEC9B").unwrap();
        assert_eq!(address.as_str(), "0xab5801a7d398351b8be11c439e05c5b3259aec9b");
        assert_eq!(address.kind(), AddressKind::Legacy);
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("usdtg1short").is_err());
        assert!(Address::parse("usdtg1UPPERCASEUPPERCASEUPPERCASEUPPER").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzz5801a7d398351b8be11c439e05c5b3259aec9b").is_err());
        assert!(Address::parse("tos1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq").is_err());
    }

    #[test]
    fn test_reserve_addresses_are_valid() {
        assert!(validate_address(AIRDROP_RESERVE_ADDRESS));
        assert!(validate_address(BONUS_RESERVE_ADDRESS));
        assert!(validate_address(BRIDGE_RESERVE_ADDRESS));
    }

    #[test]
    fn test_from_hash_is_valid_and_deterministic() {
        let a = Address::from_hash(&hash(b"wallet"));
        let b = Address::from_hash(&hash(b"wallet"));
        assert_eq!(a, b);
        assert!(validate_address(a.as_str()));
    }

    #[test]
    fn test_serializer_roundtrip() {
        let address = Address::from_hash(&hash(b"roundtrip"));
        let decoded = Address::from_bytes(&address.to_bytes()).unwrap();
        assert_eq!(address, decoded);
    }
}
