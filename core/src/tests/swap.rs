use num_bigint::BigUint;
use std::sync::Arc;
use std::time::Duration;

use obscura_account::Address;

use super::mock::{MOCK_ROUTER, MockAggregator, MockChain, SIGNER};
use crate::error::{ErrorKind, MixerError};
use crate::ledger::{LocalLedger, SwapStatus};
use crate::swap::tokens::SEPOLIA;
use crate::swap::{
    QuoteDebouncer, QuoteOutcome, SwapExecutor, SwapQuoteAggregator, SwapSettings, TokenAddress,
};
use crate::units::pow10;

type Quotes = SwapQuoteAggregator<MockAggregator, MockChain>;

fn quotes(aggregator: &Arc<MockAggregator>, chain: &Arc<MockChain>) -> Quotes {
    SwapQuoteAggregator::new(
        aggregator.clone(),
        chain.clone(),
        SwapSettings::new(SEPOLIA, "0.000001", 1.5).unwrap(),
    )
}

#[tokio::test]
async fn same_token_fails_before_network() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());

    let err = quotes(&aggregator, &chain)
        .get_quote("ETH", "ETH", "1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(aggregator.calls(), 0);
}

#[tokio::test]
async fn bad_amounts_fail_before_network() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());
    let quotes = quotes(&aggregator, &chain);

    for amount in ["", "0", "-1", "abc", "0.0000009"] {
        let err = quotes.get_quote("ETH", "USDC", amount).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "amount {:?}", amount);
    }
    // exactly at the dust threshold is fine
    assert!(quotes.get_quote("ETH", "USDC", "0.000001").await.is_ok());
    assert_eq!(aggregator.calls(), 1);
}

#[tokio::test]
async fn unknown_token_is_configuration_error() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());

    let err = quotes(&aggregator, &chain)
        .get_quote("ETH", "PEPE", "1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(aggregator.calls(), 0);
}

#[tokio::test]
async fn quote_requires_wallet() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::without_signer());

    let err = quotes(&aggregator, &chain)
        .get_quote("ETH", "USDC", "1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WalletUnavailable);
    assert_eq!(aggregator.calls(), 0);
}

#[tokio::test]
async fn aggregator_failure_is_quote_error() {
    let aggregator = Arc::new(MockAggregator::new());
    aggregator.set_fail(true);
    let chain = Arc::new(MockChain::new());

    let err = quotes(&aggregator, &chain)
        .get_quote("ETH", "USDC", "1")
        .await
        .unwrap_err();
    assert_eq!(err, MixerError::Quote("Insufficient liquidity".into()));
}

#[tokio::test]
async fn quote_resolves_tokens_and_prices() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());

    let quote = quotes(&aggregator, &chain)
        .get_quote("ETH", "USDC", "1")
        .await
        .unwrap();

    let request = &aggregator.requests()[0];
    assert_eq!(request.sell_token, TokenAddress::Native);
    assert_eq!(
        request.buy_token,
        TokenAddress::Contract(Address::parse("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238").unwrap())
    );
    assert_eq!(request.sell_amount, pow10(18));
    assert_eq!(request.taker, SIGNER);

    assert_eq!(quote.expected_output, "2000.0");
    assert_eq!(quote.minimum_received, "1980.0");
    assert!((quote.price_impact_percent - 1.0).abs() < 1e-9);
    assert_eq!(quote.tx_payload.to, MOCK_ROUTER);
    assert_eq!(quote.tx_payload.gas_limit, Some(300_000));
    assert_eq!(quote.tx_payload.data, vec![0x41, 0x55, 0x65, 0xb0]);
}

fn debouncer(
    aggregator: &Arc<MockAggregator>,
    chain: &Arc<MockChain>,
    quiet: Duration,
) -> QuoteDebouncer<MockAggregator, MockChain> {
    QuoteDebouncer::new(Arc::new(quotes(aggregator, chain)), quiet)
}

#[tokio::test]
async fn only_latest_of_two_requests_is_kept() {
    // first request is already waiting on the aggregator when the second arrives
    let aggregator = Arc::new(MockAggregator::with_delay(Duration::from_millis(200)));
    let chain = Arc::new(MockChain::new());
    let debouncer = debouncer(&aggregator, &chain, Duration::from_millis(50));

    let (first, second) = tokio::join!(debouncer.request("ETH", "USDC", "1"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.request("ETH", "USDC", "2").await
    });

    assert_eq!(first.unwrap(), QuoteOutcome::Superseded);
    match second.unwrap() {
        QuoteOutcome::Ready(quote) => assert_eq!(quote.sell_amount, "2"),
        other => panic!("expected a quote, got {:?}", other),
    }
    assert_eq!(debouncer.latest().unwrap().sell_amount, "2");
    assert_eq!(aggregator.calls(), 2);
}

#[tokio::test]
async fn burst_within_quiet_interval_fetches_once() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());
    let debouncer = debouncer(&aggregator, &chain, Duration::from_millis(80));

    let staggered = |delay_ms: u64, amount: &'static str| {
        let debouncer = &debouncer;
        async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            debouncer.request("ETH", "DAI", amount).await
        }
    };

    let (a, b, c) = tokio::join!(staggered(0, "1"), staggered(10, "1.5"), staggered(20, "2"));

    assert_eq!(a.unwrap(), QuoteOutcome::Superseded);
    assert_eq!(b.unwrap(), QuoteOutcome::Superseded);
    assert!(matches!(c.unwrap(), QuoteOutcome::Ready(q) if q.sell_amount == "2"));
    assert_eq!(aggregator.calls(), 1);
}

#[tokio::test]
async fn cancel_supersedes_pending_request() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());
    let debouncer = debouncer(&aggregator, &chain, Duration::from_millis(50));

    let (outcome, _) = tokio::join!(debouncer.request("ETH", "USDC", "1"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.cancel();
    });

    assert_eq!(outcome.unwrap(), QuoteOutcome::Superseded);
    assert_eq!(aggregator.calls(), 0);
    assert!(debouncer.latest().is_none());
}

#[tokio::test]
async fn errors_surface_for_current_request() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());
    let debouncer = debouncer(&aggregator, &chain, Duration::from_millis(5));

    let err = debouncer.request("ETH", "ETH", "1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn execute_submits_payload_verbatim_and_records_swap() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());
    let ledger = LocalLedger::in_memory();
    let quote = quotes(&aggregator, &chain)
        .get_quote("ETH", "USDC", "1")
        .await
        .unwrap();

    let hash = SwapExecutor::new(chain.clone(), ledger.clone())
        .execute(&quote)
        .await
        .unwrap();

    assert_eq!(chain.submissions(), vec![quote.tx_payload.to_request()]);
    assert_eq!(chain.submissions()[0].value, BigUint::default());

    let record = ledger.get_swap(&hash).unwrap().unwrap();
    assert_eq!(record.from_token, "ETH");
    assert_eq!(record.to_token, "USDC");
    assert_eq!(record.from_amount, "1");
    assert_eq!(record.to_amount, "2000.0");
    assert_eq!(record.status, SwapStatus::Completed);
}

#[tokio::test]
async fn reverted_swap_is_not_recorded() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());
    let ledger = LocalLedger::in_memory();
    let quote = quotes(&aggregator, &chain)
        .get_quote("ETH", "USDC", "1")
        .await
        .unwrap();

    chain.set_revert(true);
    let err = SwapExecutor::new(chain.clone(), ledger.clone())
        .execute(&quote)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OnChain);
    assert!(ledger.list_swaps().unwrap().is_empty());
}

#[tokio::test]
async fn execute_requires_wallet() {
    let aggregator = Arc::new(MockAggregator::new());
    let chain = Arc::new(MockChain::new());
    let quote = quotes(&aggregator, &chain)
        .get_quote("ETH", "USDC", "1")
        .await
        .unwrap();

    let walletless = Arc::new(MockChain::without_signer());
    let err = SwapExecutor::new(walletless.clone(), LocalLedger::in_memory())
        .execute(&quote)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WalletUnavailable);
    assert!(walletless.submissions().is_empty());
}
