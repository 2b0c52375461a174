//! Nullifiers
//!
//! ```text
//! Nullifier = keccak256( secret(32) || pad12 || recipient(20) )
//! ```
//!
//! Field order is the reverse of the commitment's. The two hashes coincide
//! only when `secret == address_word(recipient)`.

use obscura_account::Address;

use crate::hash::{address_word, keccak256};
use crate::secret::Secret;
use crate::{HASH_LEN, hash32_newtype};

/// A nullifier (32 bytes), revealed once at withdrawal
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nullifier(pub [u8; HASH_LEN]);

hash32_newtype!(Nullifier);

/// Derive the nullifier for `secret` paid out to `recipient`.
pub fn derive_nullifier(secret: &Secret, recipient: &Address) -> Nullifier {
    let mut preimage = [0u8; 2 * HASH_LEN];
    preimage[..HASH_LEN].copy_from_slice(secret.as_bytes());
    preimage[HASH_LEN..].copy_from_slice(&address_word(recipient));
    Nullifier(keccak256(&preimage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::commit;

    #[test]
    fn test_nullifier_deterministic() {
        let secret = Secret::from_bytes([1u8; 32]);
        let recipient = Address::from_bytes([2u8; 20]);
        assert_eq!(
            derive_nullifier(&secret, &recipient),
            derive_nullifier(&secret, &recipient)
        );
    }

    #[test]
    fn test_nullifier_differs_from_commitment() {
        // non-zero secret bytes keep the secret distinct from the padded address
        for i in 1..=32u8 {
            let secret = Secret::from_bytes([i; 32]);
            let recipient = Address::from_bytes([i.wrapping_mul(7); 20]);
            assert_ne!(
                derive_nullifier(&secret, &recipient).0,
                commit(&recipient, &secret).0
            );
        }
    }

    #[test]
    fn test_nullifier_equals_commitment_for_padded_address_secret() {
        // Both preimages are identical when the secret is the recipient's ABI word.
        for recipient in [Address::ZERO, Address::from_bytes([0x11; 20])] {
            let secret = Secret::from_bytes(address_word(&recipient));
            assert_eq!(
                derive_nullifier(&secret, &recipient).0,
                commit(&recipient, &secret).0
            );
        }
    }

    #[test]
    fn test_nullifier_follows_supplied_recipient() {
        // Knowing the secret is enough to derive a nullifier for any recipient.
        let secret = Secret::from_bytes([3u8; 32]);
        let a = derive_nullifier(&secret, &Address::from_bytes([4u8; 20]));
        let b = derive_nullifier(&secret, &Address::from_bytes([5u8; 20]));
        assert_ne!(a, b);
    }
}
