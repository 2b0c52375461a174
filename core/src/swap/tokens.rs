//! Static token table, keyed by network identifier.

use std::fmt;

use obscura_account::Address;

use crate::error::{MixerError, MixerResult};

pub const MAINNET: &str = "1";
pub const SEPOLIA: &str = "11155111";

/// Placeholder the aggregator uses for the native asset.
pub const NATIVE_SYMBOL: &str = "ETH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAddress {
    Native,
    Contract(Address),
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenAddress::Native => f.write_str(NATIVE_SYMBOL),
            TokenAddress::Contract(address) => write!(f, "{}", address),
        }
    }
}

/// A token resolved for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: &'static str,
    /// Network-specific name shown to users, e.g. "SepoliaETH"
    pub display_symbol: &'static str,
    pub address: TokenAddress,
    pub decimals: u8,
}

struct NetworkOverride {
    network: &'static str,
    address: &'static str,
    symbol: Option<&'static str>,
}

struct TokenEntry {
    symbol: &'static str,
    address: &'static str,
    decimals: u8,
    networks: &'static [NetworkOverride],
}

const TOKENS: &[TokenEntry] = &[
    TokenEntry {
        symbol: "ETH",
        address: NATIVE_SYMBOL,
        decimals: 18,
        networks: &[
            NetworkOverride { network: MAINNET, address: NATIVE_SYMBOL, symbol: None },
            NetworkOverride { network: SEPOLIA, address: NATIVE_SYMBOL, symbol: Some("SepoliaETH") },
        ],
    },
    TokenEntry {
        symbol: "USDC",
        address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        decimals: 6,
        networks: &[
            NetworkOverride { network: MAINNET, address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", symbol: None },
            NetworkOverride { network: SEPOLIA, address: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238", symbol: None },
        ],
    },
    TokenEntry {
        symbol: "USDT",
        address: "0xdAC17F958D2ee523a2206206994597C13D831ec7",
        decimals: 6,
        networks: &[
            NetworkOverride { network: MAINNET, address: "0xdAC17F958D2ee523a2206206994597C13D831ec7", symbol: None },
            NetworkOverride { network: SEPOLIA, address: "0x7169D38820dfd117C3FA1f22a697dBA58d90BA06", symbol: None },
        ],
    },
    TokenEntry {
        symbol: "DAI",
        address: "0x6B175474E89094C44Da98b954EedeAC495271d0F",
        decimals: 18,
        networks: &[
            NetworkOverride { network: MAINNET, address: "0x6B175474E89094C44Da98b954EedeAC495271d0F", symbol: None },
            NetworkOverride { network: SEPOLIA, address: "0x3e622317f8C93f7328350cF0B56d9eD4C620C5d6", symbol: None },
        ],
    },
    TokenEntry {
        symbol: "WBTC",
        address: "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599",
        decimals: 8,
        networks: &[
            NetworkOverride { network: MAINNET, address: "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", symbol: None },
            NetworkOverride { network: SEPOLIA, address: "0x29f2D40B0605204364af54EC677bD022dA425d03", symbol: None },
        ],
    },
];

/// Symbols the table knows about.
pub fn supported_symbols() -> impl Iterator<Item = &'static str> {
    TOKENS.iter().map(|t| t.symbol)
}

/// Resolve `symbol` (case-insensitive) on `network`. Networks without an
/// override use the token's canonical address.
pub fn lookup_token(symbol: &str, network: &str) -> MixerResult<TokenInfo> {
    let entry = TOKENS
        .iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(symbol.trim()))
        .ok_or_else(|| MixerError::Configuration(format!("Unsupported token: {}", symbol)))?;

    let network_override = entry.networks.iter().find(|n| n.network == network);
    let address = network_override.map_or(entry.address, |n| n.address);
    let display_symbol = network_override.and_then(|n| n.symbol).unwrap_or(entry.symbol);

    let address = if address == NATIVE_SYMBOL {
        TokenAddress::Native
    } else {
        TokenAddress::Contract(Address::parse(address).map_err(|e| {
            MixerError::Configuration(format!("bad address for {}: {}", entry.symbol, e))
        })?)
    };

    Ok(TokenInfo {
        symbol: entry.symbol,
        display_symbol,
        address,
        decimals: entry.decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_resolves_on_every_network() {
        for symbol in supported_symbols() {
            for network in [MAINNET, SEPOLIA, "137"] {
                lookup_token(symbol, network).unwrap();
            }
        }
    }

    #[test]
    fn sepolia_overrides() {
        let usdc = lookup_token("USDC", SEPOLIA).unwrap();
        assert_eq!(usdc.decimals, 6);
        assert_eq!(
            usdc.address.to_string(),
            "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"
        );

        let eth = lookup_token("eth", SEPOLIA).unwrap();
        assert_eq!(eth.address, TokenAddress::Native);
        assert_eq!(eth.display_symbol, "SepoliaETH");
        assert_eq!(lookup_token("ETH", MAINNET).unwrap().display_symbol, "ETH");
    }

    #[test]
    fn unknown_network_falls_back_to_canonical() {
        let wbtc = lookup_token("WBTC", "137").unwrap();
        assert_eq!(
            wbtc.address.to_string(),
            "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"
        );
        assert_eq!(wbtc.decimals, 8);
    }

    #[test]
    fn unknown_symbol_is_configuration_error() {
        let err = lookup_token("DOGE", MAINNET).unwrap_err();
        assert!(matches!(err, MixerError::Configuration(_)));
    }
}
