use rand_core::{CryptoRng, OsRng, TryRngCore};

use crate::error::CommitmentError;
use crate::{HASH_LEN, parse_hash32};

/// The 32-byte blinding secret behind a commitment.
///
/// Only ever stored locally; `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; HASH_LEN]);

impl Secret {
    /// Draws a fresh secret from the operating system's CSPRNG.
    pub fn random() -> Result<Self, CommitmentError> {
        let mut bytes = [0u8; HASH_LEN];
        let mut rng = OsRng;
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| CommitmentError::Entropy(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_rng<R: CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; HASH_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        parse_hash32(s).map(Self)
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl serde::Serialize for Secret {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Secret {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Secret::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_secrets_differ() {
        let a = Secret::random().unwrap();
        let b = Secret::random().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn debug_hides_bytes() {
        let s = Secret::from_bytes([0xab; 32]);
        assert_eq!(format!("{:?}", s), "Secret(..)");
    }

    #[test]
    fn hex_roundtrip() {
        let s = Secret::from_bytes([7u8; 32]);
        assert_eq!(Secret::from_hex(&s.to_hex()).unwrap(), s);
    }
}
