//! Keccak-256 and ABI word encoding.

use sha3::{Digest, Keccak256};

use obscura_account::{ADDRESS_LEN, Address};

/// Keccak-256 (the pre-standard padding used by the ledger, not SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// An address as a single ABI word: left-padded with 12 zero bytes.
pub fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[32 - ADDRESS_LEN..].copy_from_slice(address.as_bytes());
    word
}
