use std::fmt;

/// Proof-of-work family of a coin. Each family needs a different tuning block
/// in the miner configuration, and only CryptoNight coins name an algorithm
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmFamily {
    RandomX,
    CryptoNight { variant: &'static str },
}

impl AlgorithmFamily {
    pub const fn name(&self) -> &'static str {
        match self {
            AlgorithmFamily::RandomX => "RandomX",
            AlgorithmFamily::CryptoNight { .. } => "CryptoNight",
        }
    }
}

impl fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmFamily::RandomX => write!(f, "RandomX"),
            AlgorithmFamily::CryptoNight { variant } => write!(f, "CryptoNight ({variant})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinDefinition {
    pub id: &'static str,
    pub symbol: &'static str,
    pub family: AlgorithmFamily,
    /// Default pool endpoints, most preferred first. Never empty.
    pub pools: &'static [&'static str],
}

impl CoinDefinition {
    pub fn default_pool(&self) -> &'static str {
        self.pools[0]
    }

    /// The pool override when one is given, the preferred default otherwise.
    pub fn resolve_pool<'a>(&self, pool_override: Option<&'a str>) -> &'a str {
        match pool_override {
            Some(pool) if !pool.trim().is_empty() => pool,
            _ => self.default_pool(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported coin: {coin}")]
pub struct UnsupportedCoinError {
    pub coin: String,
}

pub static COIN_CATALOG: &[CoinDefinition] = &[
    CoinDefinition {
        id: "MONERO",
        symbol: "XMR",
        family: AlgorithmFamily::RandomX,
        pools: &[
            "xmr-asia1.nanopool.org:10300",
            "pool.supportxmr.com:3333",
            "xmr.2miners.com:2222",
        ],
    },
    CoinDefinition {
        id: "ARQMA",
        symbol: "ARQ",
        family: AlgorithmFamily::RandomX,
        pools: &["arqma.herominers.com:10641", "arq.pool-pay.com:4441"],
    },
    CoinDefinition {
        id: "LOKI",
        symbol: "OXEN",
        family: AlgorithmFamily::RandomX,
        pools: &["loki.herominers.com:10111", "pool.loki.hashvault.pro:3333"],
    },
    CoinDefinition {
        id: "HAVEN",
        symbol: "XHV",
        family: AlgorithmFamily::CryptoNight {
            variant: "cn-heavy/xhv",
        },
        pools: &["haven.herominers.com:10451", "pool.haven.hashvault.pro:3333"],
    },
    CoinDefinition {
        id: "CONCEAL",
        symbol: "CCX",
        family: AlgorithmFamily::CryptoNight { variant: "cn/ccx" },
        pools: &["conceal.herominers.com:10361", "pool.conceal.network:3333"],
    },
];

/// Case-insensitive lookup by coin id.
pub fn find_coin(coin: &str) -> Result<&'static CoinDefinition, UnsupportedCoinError> {
    let coin = coin.trim();
    COIN_CATALOG
        .iter()
        .find(|def| def.id.eq_ignore_ascii_case(coin))
        .ok_or_else(|| UnsupportedCoinError {
            coin: coin.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique_and_pools_present() {
        let ids: HashSet<_> = COIN_CATALOG.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), COIN_CATALOG.len());
        for coin in COIN_CATALOG {
            assert!(!coin.pools.is_empty(), "{} has no pools", coin.id);
        }
    }

    #[test]
    fn test_find_coin_ignores_case() {
        let coin = find_coin("haven").unwrap();
        assert_eq!(coin.symbol, "XHV");
        assert_eq!(
            coin.family,
            AlgorithmFamily::CryptoNight {
                variant: "cn-heavy/xhv"
            }
        );
    }

    #[test]
    fn test_find_unknown_coin() {
        let err = find_coin("DOGE").unwrap_err();
        assert_eq!(err.coin, "DOGE");
        assert_eq!(err.to_string(), "Unsupported coin: DOGE");
    }

    #[test]
    fn test_resolve_pool_prefers_override() {
        let monero = find_coin("MONERO").unwrap();
        assert_eq!(monero.resolve_pool(None), "xmr-asia1.nanopool.org:10300");
        assert_eq!(monero.resolve_pool(Some("custom:1234")), "custom:1234");
        assert_eq!(monero.resolve_pool(Some("  ")), "xmr-asia1.nanopool.org:10300");
    }
}
