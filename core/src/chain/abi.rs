//! Calldata and log layouts of the mixer contract.
//!
//! ```text
//! deposit(bytes32 commitment)                     payable
//! withdraw(bytes32 nullifierHash, address recipient)
//! event Deposit(bytes32 indexed commitment, uint32 leafIndex, uint256 timestamp)
//! ```

use obscura_account::Address;
use obscura_commitment::{Commitment, Nullifier, address_word, keccak256};

use super::{ChainError, ChainEvent, TxHash};

pub const DEPOSIT_SIGNATURE: &str = "deposit(bytes32)";
pub const WITHDRAW_SIGNATURE: &str = "withdraw(bytes32,address)";
pub const DEPOSIT_EVENT_SIGNATURE: &str = "Deposit(bytes32,uint32,uint256)";

pub const DEPOSIT_SELECTOR: [u8; 4] = [0xb2, 0x14, 0xfa, 0xa5];
pub const WITHDRAW_SELECTOR: [u8; 4] = [0x1b, 0x25, 0x8d, 0x50];

/// First four bytes of the signature hash.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// topic0 of a non-anonymous event.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

pub fn encode_deposit(commitment: &Commitment) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&DEPOSIT_SELECTOR);
    data.extend_from_slice(commitment.as_bytes());
    data
}

pub fn encode_withdraw(nullifier: &Nullifier, recipient: &Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&WITHDRAW_SELECTOR);
    data.extend_from_slice(nullifier.as_bytes());
    data.extend_from_slice(&address_word(recipient));
    data
}

/// A decoded `Deposit` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositEvent {
    pub commitment: Commitment,
    pub leaf_index: u32,
    /// Block timestamp in seconds
    pub timestamp: u64,
    pub transaction_hash: Option<TxHash>,
    pub block_number: Option<u64>,
}

pub fn decode_deposit_event(event: &ChainEvent) -> Result<DepositEvent, ChainError> {
    let topic0 = event_topic(DEPOSIT_EVENT_SIGNATURE);
    match event.topics.first() {
        Some(t) if *t == topic0 => {}
        _ => return Err(ChainError::Decode("not a Deposit log".into())),
    }
    let commitment = event
        .topics
        .get(1)
        .map(|t| Commitment(*t))
        .ok_or_else(|| ChainError::Decode("Deposit log without commitment topic".into()))?;

    if event.data.len() < 64 {
        return Err(ChainError::Decode(format!(
            "Deposit log data is {} bytes, expected 64",
            event.data.len()
        )));
    }
    let leaf_word = &event.data[..32];
    let time_word = &event.data[32..64];

    if leaf_word[..28].iter().any(|b| *b != 0) {
        return Err(ChainError::Decode("leafIndex exceeds uint32".into()));
    }
    if time_word[..24].iter().any(|b| *b != 0) {
        return Err(ChainError::Decode("timestamp exceeds u64".into()));
    }

    let mut leaf = [0u8; 4];
    leaf.copy_from_slice(&leaf_word[28..]);
    let mut time = [0u8; 8];
    time.copy_from_slice(&time_word[24..]);

    Ok(DepositEvent {
        commitment,
        leaf_index: u32::from_be_bytes(leaf),
        timestamp: u64::from_be_bytes(time),
        transaction_hash: event.transaction_hash,
        block_number: event.block_number,
    })
}

#[cfg(test)]
pub(crate) fn deposit_log(contract: Address, commitment: Commitment, leaf_index: u32) -> ChainEvent {
    let mut data = vec![0u8; 64];
    data[28..32].copy_from_slice(&leaf_index.to_be_bytes());
    data[56..64].copy_from_slice(&1_700_000_000u64.to_be_bytes());
    ChainEvent {
        address: contract,
        topics: vec![event_topic(DEPOSIT_EVENT_SIGNATURE), commitment.0],
        data,
        transaction_hash: Some(TxHash([leaf_index as u8; 32])),
        block_number: Some(100 + leaf_index as u64),
    }
}
