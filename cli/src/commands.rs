//! Command implementations. Each command loads the config, opens whatever it
//! needs and closes the ledger before returning.

use anyhow::{Context, Result};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use obscura_commitment::Commitment;
use obscura_config::ObscuraConfig;
use obscura_core::chain::RpcConfig;
use obscura_core::swap::supported_symbols;
use obscura_core::{
    DepositLifecycleManager, DepositStatus, EventReconciler, JsonRpcChainClient, LocalLedger,
    MixerResult, MixerSettings, QuoteDebouncer, QuoteOutcome, SwapExecutor, SwapQuote, SwapQuoteAggregator,
    SwapSettings, ZeroExClient, summarize,
};

type Quotes = SwapQuoteAggregator<ZeroExClient, JsonRpcChainClient>;

fn load_config() -> Result<ObscuraConfig> {
    let config = ObscuraConfig::load()?;
    config.validate()?;
    Ok(config)
}

fn open_ledger(config: &ObscuraConfig) -> Result<LocalLedger> {
    LocalLedger::open(&config.database.path)
        .with_context(|| format!("Failed to open ledger at {}", config.database.path))
}

async fn connect(config: &ObscuraConfig) -> Result<Arc<JsonRpcChainClient>> {
    let rpc = RpcConfig::from_network(&config.network)?;
    println!("🔗 Connecting to {}...", rpc.rpc_url);
    Ok(Arc::new(JsonRpcChainClient::connect(rpc).await?))
}

async fn mixer(
    config: &ObscuraConfig,
) -> Result<(DepositLifecycleManager<JsonRpcChainClient>, LocalLedger)> {
    let settings = MixerSettings::from_config(config)?;
    let ledger = open_ledger(config)?;
    let chain = connect(config).await?;
    Ok((
        DepositLifecycleManager::new(chain, ledger.clone(), settings),
        ledger,
    ))
}

/// Close the ledger after an operation. The operation's own error wins; a
/// failed close is only logged then.
fn finish<T>(result: MixerResult<T>, ledger: LocalLedger) -> Result<T> {
    settle(result, ledger.close())
}

fn settle<T>(result: MixerResult<T>, closed: MixerResult<()>) -> Result<T> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e.into()),
        (Err(e), Err(close_err)) => {
            error!("Failed to close ledger: {}", close_err);
            Err(e.into())
        }
    }
}

fn parse_commitment(text: &str) -> Result<Commitment> {
    text.parse::<Commitment>()
        .with_context(|| format!("Invalid commitment: {}", text))
}

pub fn token_list() -> String {
    supported_symbols().collect::<Vec<_>>().join(", ")
}

// ============================================================================
// Mixer
// ============================================================================

pub async fn deposit(amount: &str, recipient: &str) -> Result<()> {
    let config = load_config()?;
    let (manager, ledger) = mixer(&config).await?;

    println!("💸 Depositing {} ETH for {}...", amount, recipient);
    let commitment = finish(manager.deposit(amount, recipient).await, ledger)?;

    println!("✅ Deposit confirmed");
    println!("🔑 Commitment: {}", commitment);
    println!("   Keep the local ledger safe: its secret is the only way to withdraw.");
    Ok(())
}

pub async fn withdraw(commitment: &str) -> Result<()> {
    let commitment = parse_commitment(commitment)?;
    let config = load_config()?;
    let (manager, ledger) = mixer(&config).await?;

    println!("📤 Withdrawing {}...", commitment);
    let tx = finish(manager.withdraw(&commitment).await, ledger)?;

    println!("✅ Withdrawal sent: {}", tx);
    Ok(())
}

pub async fn retry(commitment: &str) -> Result<()> {
    let commitment = parse_commitment(commitment)?;
    let config = load_config()?;
    let (manager, ledger) = mixer(&config).await?;

    match finish(manager.retry_deposit(&commitment).await, ledger)? {
        DepositStatus::Confirmed => println!("✅ Deposit {} is confirmed", commitment),
        DepositStatus::Pending => println!("⏳ Deposit {} is still pending", commitment),
    }
    Ok(())
}

fn reconciler(
    config: &ObscuraConfig,
    chain: Arc<JsonRpcChainClient>,
    ledger: &LocalLedger,
) -> Result<EventReconciler<JsonRpcChainClient>> {
    let settings = MixerSettings::from_config(config)?;
    Ok(EventReconciler::new(chain, ledger.clone(), settings))
}

pub async fn reconcile() -> Result<()> {
    let config = load_config()?;
    let ledger = open_ledger(&config)?;
    let chain = connect(&config).await?;
    let reconciler = reconciler(&config, chain, &ledger)?;

    let report = finish(reconciler.reconcile_once().await, ledger)?;

    if let Some(err) = &report.fetch_error {
        println!("⚠️  Could not fetch deposit events: {}", err);
    }
    println!(
        "🔄 {} pending, {} events seen, {} promoted",
        report.pending,
        report.events_seen,
        report.promoted.len()
    );
    for commitment in &report.promoted {
        println!("   ✅ {}", commitment);
    }
    Ok(())
}

pub async fn watch(interval: Option<u64>) -> Result<()> {
    let config = load_config()?;
    let interval = Duration::from_secs(interval.unwrap_or(config.mixer.reconcile_interval_secs));
    let ledger = open_ledger(&config)?;
    let chain = connect(&config).await?;
    let reconciler = reconciler(&config, chain, &ledger)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping reconciler");
        }
        on_signal.cancel();
    });

    println!("👀 Reconciling every {}s (Ctrl-C to stop)", interval.as_secs());
    reconciler.run(interval, cancel).await;

    ledger.close()?;
    println!("👋 Stopped");
    Ok(())
}

// ============================================================================
// Swaps
// ============================================================================

async fn quote_aggregator(
    config: &ObscuraConfig,
) -> Result<(Arc<Quotes>, Arc<JsonRpcChainClient>)> {
    let settings = SwapSettings::from_config(config)?;
    let aggregator = Arc::new(ZeroExClient::new((&config.swap).into())?);
    let chain = connect(config).await?;
    let quotes = SwapQuoteAggregator::new(aggregator, chain.clone(), settings);
    Ok((Arc::new(quotes), chain))
}

fn print_quote(quote: &SwapQuote) {
    println!("📈 Quote");
    println!(
        "   Sell:             {} {}",
        quote.sell_amount, quote.sell_token
    );
    println!(
        "   Expected output:  {} {}",
        quote.expected_output, quote.buy_token
    );
    println!(
        "   Minimum received: {} {}",
        quote.minimum_received, quote.buy_token
    );
    println!("   Price:            {}", quote.price);
    println!("   Price impact:     {}", quote.price_impact_display());
    if let Some(gas) = quote.tx_payload.gas_limit {
        println!("   Gas limit:        {}", gas);
    }
}

pub async fn quote(sell: &str, buy: &str, amount: &str) -> Result<()> {
    let config = load_config()?;
    let (quotes, _) = quote_aggregator(&config).await?;
    let debouncer = QuoteDebouncer::new(quotes, Duration::from_millis(config.swap.debounce_ms));

    match debouncer.request(sell, buy, amount).await? {
        QuoteOutcome::Ready(quote) => print_quote(&quote),
        QuoteOutcome::Superseded => println!("⏭️  Quote superseded"),
    }
    Ok(())
}

pub async fn swap(sell: &str, buy: &str, amount: &str) -> Result<()> {
    let config = load_config()?;
    let ledger = open_ledger(&config)?;
    let (quotes, chain) = quote_aggregator(&config).await?;

    let quote = quotes.get_quote(sell, buy, amount).await?;
    print_quote(&quote);

    let executor = SwapExecutor::new(chain, ledger.clone());
    println!("🔁 Executing swap...");
    let tx = finish(executor.execute(&quote).await, ledger)?;

    println!("✅ Swap completed: {}", tx);
    Ok(())
}

// ============================================================================
// Ledger
// ============================================================================

fn format_time(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn list() -> Result<()> {
    let config = load_config()?;
    let ledger = open_ledger(&config)?;
    let deposits = ledger.list_deposits()?;
    let swaps = ledger.list_swaps()?;
    ledger.close()?;

    println!("📦 Deposits ({})", deposits.len());
    for record in &deposits {
        let status = match record.status {
            DepositStatus::Pending => "pending",
            DepositStatus::Confirmed => "confirmed",
        };
        println!(
            "   {}  {:>9}  {} ETH -> {}  ({})",
            record.commitment,
            status,
            record.amount,
            record.recipient,
            format_time(record.timestamp)
        );
    }

    println!();
    println!("🔁 Swaps ({})", swaps.len());
    for record in &swaps {
        println!(
            "   {}  {} {} -> {} {}  ({})",
            record.transaction_hash,
            record.from_amount,
            record.from_token,
            record.to_amount,
            record.to_token,
            format_time(record.timestamp)
        );
    }
    Ok(())
}

pub fn stats(json: bool) -> Result<()> {
    let config = load_config()?;
    let ledger = open_ledger(&config)?;
    let summary = finish(summarize(&ledger, config.mixer.native_decimals), ledger)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("📊 Ledger");
    println!("   Deposits:        {}", summary.deposits);
    println!("   Pending:         {}", summary.pending);
    println!("   Confirmed:       {}", summary.confirmed);
    println!("   Total confirmed: {} ETH", summary.total_confirmed);
    println!("   Swaps:           {}", summary.swaps);
    Ok(())
}

pub fn config(mode: Option<&str>) -> Result<()> {
    match mode {
        Some("show") => {
            let config = load_config()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        None => {
            print!("{}", ObscuraConfig::generate_sample());
            if let Some(path) = ObscuraConfig::default_config_path() {
                println!();
                println!("# Save as ./obscura.toml or {}", path.display());
            }
        }
        Some(other) => anyhow::bail!("Unknown config mode: {} (expected 'show')", other),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use obscura_core::MixerError;

    #[test]
    fn operation_error_wins_over_close_error() {
        let err = settle::<()>(
            Err(MixerError::OnChain("execution reverted".into())),
            Err(MixerError::Persistence("flush failed".into())),
        )
        .unwrap_err();
        let text = format!("{:#}", err);
        assert!(text.contains("execution reverted"));
        assert!(!text.contains("flush failed"));
    }

    #[test]
    fn close_error_surfaces_after_success() {
        let err = settle(Ok(7), Err(MixerError::Persistence("flush failed".into()))).unwrap_err();
        assert!(format!("{:#}", err).contains("flush failed"));
        assert_eq!(settle(Ok(7), Ok(())).unwrap(), 7);
    }
}
