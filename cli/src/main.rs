mod commands;

use std::env;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];

    let result = match cmd.as_str() {
        "deposit" => {
            if args.len() < 4 {
                println!("Usage: deposit <amount> <recipient>");
                println!("  amount    - Amount in ETH (e.g. 0.1)");
                println!("  recipient - Address that will receive the withdrawal");
                return;
            }
            commands::deposit(&args[2], &args[3]).await
        }
        "withdraw" => {
            let Some(commitment) = args.get(2) else {
                println!("Usage: withdraw <commitment>");
                return;
            };
            commands::withdraw(commitment).await
        }
        "retry" => {
            let Some(commitment) = args.get(2) else {
                println!("Usage: retry <commitment>");
                return;
            };
            commands::retry(commitment).await
        }
        "reconcile" => commands::reconcile().await,
        "watch" => {
            let interval = match parse_interval(&args[2..]) {
                Ok(interval) => interval,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            };
            commands::watch(interval).await
        }
        "quote" | "swap" => {
            if args.len() < 5 {
                println!("Usage: {} <sell-token> <buy-token> <amount>", cmd);
                println!("  tokens - One of: {}", commands::token_list());
                println!("  amount - Amount of the sell token (e.g. 0.5)");
                return;
            }
            if cmd == "quote" {
                commands::quote(&args[2], &args[3], &args[4]).await
            } else {
                commands::swap(&args[2], &args[3], &args[4]).await
            }
        }
        "list" => commands::list(),
        "stats" => commands::stats(args.iter().any(|a| a == "--json")),
        "config" => commands::config(args.get(2).map(|s| s.as_str())),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Obscura CLI - commitment mixer and token swaps");
    println!();
    println!("USAGE:");
    println!("  obscura <command> [args]");
    println!();
    println!("MIXER COMMANDS:");
    println!("  deposit <amount> <recipient>   Deposit ETH under a fresh commitment");
    println!("  withdraw <commitment>          Withdraw a deposit to its recipient");
    println!("  retry <commitment>             Re-check or re-send a pending deposit");
    println!("  reconcile                      Promote pending deposits seen on chain");
    println!("  watch [--interval <secs>]      Reconcile periodically until Ctrl-C");
    println!();
    println!("SWAP COMMANDS:");
    println!("  quote <sell> <buy> <amount>    Fetch a swap quote");
    println!("  swap <sell> <buy> <amount>     Quote and execute a swap");
    println!();
    println!("LEDGER COMMANDS:");
    println!("  list                           Show local deposits and swaps");
    println!("  stats [--json]                 Show ledger totals");
    println!();
    println!("OTHER COMMANDS:");
    println!("  config [show]                  Print a sample (or the effective) config");
    println!("  help                           Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  obscura deposit 0.1 0xAbcd000000000000000000000000000000001234");
    println!("  obscura quote ETH USDC 0.5");
    println!("  obscura watch --interval 10");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  OBSCURA_CONFIG           Path to obscura.toml");
    println!("  OBSCURA_RPC_URL          JSON-RPC endpoint");
    println!("  OBSCURA_MIXER_CONTRACT   Ledger contract address");
    println!("  OBSCURA_DB_PATH          Local ledger directory");
    println!("  OBSCURA_0X_API_KEY       0x API key");
    println!("  RUST_LOG                 Log level (debug/info/warn/error)");
}

fn parse_interval(args: &[String]) -> anyhow::Result<Option<u64>> {
    let mut interval = None;

    let mut i = 0;
    while i < args.len() {
        if args[i] == "--interval" {
            let value = args
                .get(i + 1)
                .ok_or_else(|| anyhow::anyhow!("--interval needs a value in seconds"))?;
            let secs: u64 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("Interval must be a whole number of seconds"))?;
            if secs == 0 {
                anyhow::bail!("Interval must be greater than 0");
            }
            interval = Some(secs);
            i += 1;
        }
        i += 1;
    }

    Ok(interval)
}
