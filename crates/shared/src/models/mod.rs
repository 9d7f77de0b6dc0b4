pub mod coin;
pub mod mining_config;

pub use coin::{find_coin, AlgorithmFamily, CoinDefinition, UnsupportedCoinError, COIN_CATALOG};
pub use mining_config::{synthesize, MiningConfig};
