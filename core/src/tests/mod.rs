mod deposits;
mod swap;

use std::sync::Arc;

use obscura_account::Address;

use crate::ledger::LocalLedger;
use crate::mixer::{DepositLifecycleManager, EventReconciler, MixerSettings};
use mock::MockChain;

pub(crate) const RECIPIENT: &str = "0xAbcd000000000000000000000000000000001234";

pub(crate) fn contract() -> Address {
    Address::from_bytes([0xcc; 20])
}

pub(crate) fn settings() -> MixerSettings {
    MixerSettings::new(contract(), "0.001", 18).unwrap()
}

pub(crate) fn manager(chain: &Arc<MockChain>, ledger: &LocalLedger) -> DepositLifecycleManager<MockChain> {
    DepositLifecycleManager::new(chain.clone(), ledger.clone(), settings())
}

pub(crate) fn reconciler(chain: &Arc<MockChain>, ledger: &LocalLedger) -> EventReconciler<MockChain> {
    EventReconciler::new(chain.clone(), ledger.clone(), settings())
}
