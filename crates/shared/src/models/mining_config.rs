use crate::models::coin::{find_coin, AlgorithmFamily, UnsupportedCoinError};
use serde::{Deserialize, Serialize};

/// Password sent to pools that authenticate by wallet address only.
pub const POOL_PASSWORD_PLACEHOLDER: &str = "x";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolEntry {
    pub url: String,
    pub user: String,
    pub pass: String,
    pub keepalive: bool,
    pub tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RandomXTuning {
    pub init: i32,
    pub mode: String,
    #[serde(rename = "1gb-pages")]
    pub one_gb_pages: bool,
    pub rdmsr: bool,
    pub wrmsr: bool,
    pub numa: bool,
}

impl Default for RandomXTuning {
    fn default() -> Self {
        Self {
            init: -1,
            mode: "auto".to_string(),
            one_gb_pages: false,
            rdmsr: true,
            wrmsr: true,
            numa: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CryptoNightTuning {
    pub enabled: bool,
    pub priority: u32,
}

impl Default for CryptoNightTuning {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 1,
        }
    }
}

/// Algorithm block of the miner configuration. Flattened into the top level
/// object, so a RandomX config carries a `randomx` key and a CryptoNight
/// config carries `algo` plus `cn`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AlgorithmConfig {
    RandomX {
        randomx: RandomXTuning,
    },
    CryptoNight {
        algo: String,
        cn: CryptoNightTuning,
    },
}

impl AlgorithmConfig {
    fn for_family(family: &AlgorithmFamily) -> Self {
        match family {
            AlgorithmFamily::RandomX => AlgorithmConfig::RandomX {
                randomx: RandomXTuning::default(),
            },
            AlgorithmFamily::CryptoNight { variant } => AlgorithmConfig::CryptoNight {
                algo: variant.to_string(),
                cn: CryptoNightTuning::default(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MiningConfig {
    pub pools: Vec<PoolEntry>,
    pub cpu: bool,
    pub opencl: bool,
    pub cuda: bool,
    #[serde(flatten)]
    pub algorithm: AlgorithmConfig,
}

impl MiningConfig {
    pub fn pool_url(&self) -> Option<&str> {
        self.pools.first().map(|pool| pool.url.as_str())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds the miner configuration for `coin`.
///
/// The pool override wins over the coin's default pool. No I/O happens here,
/// so an unknown coin is rejected before anything touches the disk.
pub fn synthesize(
    coin: &str,
    wallet_address: &str,
    pool_url: Option<&str>,
) -> Result<MiningConfig, UnsupportedCoinError> {
    let definition = find_coin(coin)?;
    let pool_url = definition.resolve_pool(pool_url);

    Ok(MiningConfig {
        pools: vec![PoolEntry {
            url: pool_url.to_string(),
            user: wallet_address.to_string(),
            pass: POOL_PASSWORD_PLACEHOLDER.to_string(),
            keepalive: true,
            tls: false,
        }],
        cpu: true,
        opencl: false,
        cuda: false,
        algorithm: AlgorithmConfig::for_family(&definition.family),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coin::COIN_CATALOG;
    use serde_json::Value;

    #[test]
    fn test_every_coin_has_exactly_one_algorithm_block() {
        for coin in COIN_CATALOG {
            let config = synthesize(coin.id, "wallet", None).unwrap();
            let json = serde_json::to_value(&config).unwrap();
            let has_randomx = json.get("randomx").is_some();
            let has_cn = json.get("algo").is_some() && json.get("cn").is_some();
            assert!(has_randomx ^ has_cn, "{} has {json}", coin.id);
            if has_randomx {
                assert!(json.get("algo").is_none());
                assert!(json.get("cn").is_none());
            }
        }
    }

    #[test]
    fn test_synthesize_is_deterministic() {
        let first = synthesize("CONCEAL", "ccx7wallet", Some("pool:1")).unwrap();
        let second = synthesize("CONCEAL", "ccx7wallet", Some("pool:1")).unwrap();
        assert_eq!(
            first.to_json_pretty().unwrap(),
            second.to_json_pretty().unwrap()
        );
    }

    #[test]
    fn test_monero_uses_default_pool_and_randomx() {
        let config = synthesize("MONERO", "4Abc", None).unwrap();
        assert_eq!(config.pool_url(), Some("xmr-asia1.nanopool.org:10300"));

        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("algo").is_none());
        assert_eq!(json["randomx"]["init"], -1);
        assert_eq!(json["randomx"]["mode"], "auto");
        assert_eq!(json["randomx"]["1gb-pages"], false);
        assert_eq!(json["randomx"]["rdmsr"], true);
        assert_eq!(json["randomx"]["wrmsr"], true);
        assert_eq!(json["randomx"]["numa"], true);
    }

    #[test]
    fn test_haven_pool_override() {
        let config = synthesize("HAVEN", "haven1", Some("custom:1234")).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["algo"], "cn-heavy/xhv");
        assert_eq!(json["cn"]["enabled"], true);
        assert_eq!(json["cn"]["priority"], 1);
        assert_eq!(json["pools"][0]["url"], "custom:1234");
        assert!(json.get("randomx").is_none());
    }

    #[test]
    fn test_unknown_coin_rejected() {
        let err = synthesize("DOGE", "D8wallet", None).unwrap_err();
        assert_eq!(err.coin, "DOGE");
    }

    #[test]
    fn test_pool_entry_and_backend_flags() {
        let config = synthesize("LOKI", "L1wallet", None).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        let pools = json["pools"].as_array().unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(
            pools[0],
            serde_json::json!({
                "url": "loki.herominers.com:10111",
                "user": "L1wallet",
                "pass": "x",
                "keepalive": true,
                "tls": false
            })
        );
        assert_eq!(json["cpu"], Value::Bool(true));
        assert_eq!(json["opencl"], Value::Bool(false));
        assert_eq!(json["cuda"], Value::Bool(false));
    }

    #[test]
    fn test_artifact_parses_back() {
        let config = synthesize("HAVEN", "haven1", None).unwrap();
        let text = config.to_json_pretty().unwrap();
        let parsed: MiningConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
