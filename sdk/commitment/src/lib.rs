//! Obscura Commitment Engine
//!
//! Keccak-256 commitments and nullifiers over the ledger program's ABI
//! encoding.
//!
//! ```text
//! commitment = keccak256(abi.encode(address recipient, bytes32 secret))
//! nullifier  = keccak256(abi.encode(bytes32 secret, address recipient))
//! ```
//!
//! The two field orders differ on purpose: the ledger program recomputes both
//! with exactly these layouts. The nullifier is bound to whichever recipient
//! the withdrawer supplies, so anyone holding `secret` can derive a valid
//! nullifier for any recipient. The encodings are also symmetric: when
//! `secret == address_word(recipient)` both preimages are the same 64 bytes
//! and the nullifier equals the commitment. A random secret hits this with
//! probability 2^-96. The ledger program is the authority here and this crate
//! reproduces its scheme bit-for-bit.

pub mod commitment;
pub mod error;
pub mod hash;
pub mod nullifier;
pub mod secret;

pub use commitment::{Commitment, commit, generate_commitment, generate_commitment_for};
pub use error::CommitmentError;
pub use hash::{address_word, keccak256};
pub use nullifier::{Nullifier, derive_nullifier};
pub use secret::Secret;

pub use obscura_account::Address;

/// Length of every hash value produced by this crate.
pub const HASH_LEN: usize = 32;

/// Parses a `0x`-prefixed (or bare) 64-character hex string into 32 bytes.
pub(crate) fn parse_hash32(s: &str) -> Result<[u8; HASH_LEN], CommitmentError> {
    let trimmed = s.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if body.len() != HASH_LEN * 2 {
        return Err(CommitmentError::InvalidLength {
            expected: HASH_LEN * 2,
            got: body.len(),
        });
    }

    let mut out = [0u8; HASH_LEN];
    hex::decode_to_slice(body, &mut out)
        .map_err(|_| CommitmentError::InvalidHex(trimmed.to_string()))?;
    Ok(out)
}

/// Implements `Display`/`FromStr`/serde as `0x` hex for a 32-byte newtype.
macro_rules! hash32_newtype {
    ($name:ident) => {
        impl $name {
            pub fn from_bytes(bytes: [u8; $crate::HASH_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $crate::HASH_LEN] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::CommitmentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::parse_hash32(s).map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use hash32_newtype;
