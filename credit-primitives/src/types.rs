//! Core identity and proof types
//!
//! All types serialize deterministically (bincode for the journal, hex
//! strings for human-facing formats).

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a hex identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Not valid hex
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Wrong byte length
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Decoded length
        actual: usize,
    },
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(ParseError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Account, asset or ledger identity (20 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address ("no account")
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive a stable address from a human label (last 20 bytes of SHA-256)
    pub fn from_label(label: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(label.as_bytes()).into();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }

    /// Parse from hex (with or without `0x`)
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        decode_fixed::<20>(s).map(Self)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// True for the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

/// 32-byte tag naming the score protocol a proof belongs to
///
/// One registry serves several protocols (credit score, borrow limit); the
/// tag is carried as data so verification is shared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ProtocolTag([u8; 32]);

impl ProtocolTag {
    /// Create from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Tag for a human label, e.g. `"arcx.credit"`
    pub fn from_label(label: &str) -> Self {
        Self(Sha256::digest(label.as_bytes()).into())
    }

    /// Parse from hex
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        decode_fixed::<32>(s).map(Self)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtocolTag({})", self)
    }
}

impl Serialize for ProtocolTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProtocolTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Merkle-backed score assertion (stable wire format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreProof {
    /// Account the score belongs to
    pub account: Address,

    /// Protocol tag (credit score, borrow limit, ...)
    pub protocol: ProtocolTag,

    /// Score value
    pub score: u128,

    /// Sibling hashes from leaf to root
    pub merkle_proof: Vec<[u8; 32]>,
}

impl ScoreProof {
    /// Create a proof
    pub fn new(
        account: Address,
        protocol: ProtocolTag,
        score: u128,
        merkle_proof: Vec<[u8; 32]>,
    ) -> Self {
        Self {
            account,
            protocol,
            score,
            merkle_proof,
        }
    }

    /// Placeholder proof carrying no account
    pub fn empty(protocol: ProtocolTag) -> Self {
        Self::new(Address::ZERO, protocol, 0, Vec::new())
    }

    /// True when the proof names no account
    pub fn is_empty(&self) -> bool {
        self.account.is_zero()
    }
}

/// Caller identity and timestamp for one call
///
/// Time is always supplied by the caller so every operation is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Calling account
    pub caller: Address,

    /// Current time (seconds since Unix epoch)
    pub now: u64,
}

impl CallContext {
    /// Create a context
    pub fn new(caller: Address, now: u64) -> Self {
        Self { caller, now }
    }
}
