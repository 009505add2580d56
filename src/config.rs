use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use chia_wallet_sdk::{
    signer::AggSigConstants,
    types::{MAINNET_CONSTANTS, TESTNET11_CONSTANTS},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet11,
}

impl Network {
    pub fn constants(self) -> AggSigConstants {
        match self {
            Self::Mainnet => AggSigConstants::from(&*MAINNET_CONSTANTS),
            Self::Testnet11 => AggSigConstants::from(&*TESTNET11_CONSTANTS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    /// Remote node RPC url. When unset the local full node is used with its
    /// private TLS identity.
    #[serde(default)]
    pub node_url: Option<String>,
    #[serde(default = "default_cert_path")]
    pub cert_path: PathBuf,
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,
    #[serde(default = "default_mnemonic_path")]
    pub mnemonic_path: PathBuf,
    #[serde(default = "default_derivation_count")]
    pub derivation_count: u32,
    #[serde(default = "default_amount")]
    pub default_amount: u64,
    /// Used whenever the node cannot estimate a fee.
    #[serde(default = "default_fee")]
    pub default_fee: u64,
    #[serde(default = "default_fee_target_secs")]
    pub fee_target_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_query_concurrency")]
    pub query_concurrency: usize,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::default(),
            node_url: None,
            cert_path: default_cert_path(),
            key_path: default_key_path(),
            mnemonic_path: default_mnemonic_path(),
            derivation_count: default_derivation_count(),
            default_amount: default_amount(),
            default_fee: default_fee(),
            fee_target_secs: default_fee_target_secs(),
            timeout_secs: default_timeout_secs(),
            query_concurrency: default_query_concurrency(),
            port: default_port(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = app_dir().join("config.toml");

        if let Ok(config) = fs::read_to_string(config_path) {
            Ok(toml::from_str(&config)?)
        } else {
            Ok(Config::default())
        }
    }

    /// The wallet mnemonic, from `SERVER_COIN_MNEMONIC` or the mnemonic file.
    pub fn mnemonic(&self) -> Result<String> {
        if let Ok(mnemonic) = env::var("SERVER_COIN_MNEMONIC") {
            return Ok(mnemonic.trim().to_string());
        }

        let mnemonic = fs::read_to_string(&self.mnemonic_path).with_context(|| {
            format!("could not read mnemonic from {}", self.mnemonic_path.display())
        })?;

        Ok(mnemonic.trim().to_string())
    }
}

fn home_dir() -> PathBuf {
    homedir::my_home()
        .ok()
        .flatten()
        .unwrap_or_else(|| PathBuf::from("."))
}

fn app_dir() -> PathBuf {
    home_dir().join(".server-coin")
}

fn chia_root() -> PathBuf {
    env::var("CHIA_ROOT").map_or_else(|_| home_dir().join(".chia").join("mainnet"), PathBuf::from)
}

fn default_cert_path() -> PathBuf {
    chia_root()
        .join("config")
        .join("ssl")
        .join("full_node")
        .join("private_full_node.crt")
}

fn default_key_path() -> PathBuf {
    chia_root()
        .join("config")
        .join("ssl")
        .join("full_node")
        .join("private_full_node.key")
}

fn default_mnemonic_path() -> PathBuf {
    app_dir().join("mnemonic.txt")
}

fn default_derivation_count() -> u32 {
    100
}

fn default_amount() -> u64 {
    300_000_000
}

fn default_fee() -> u64 {
    100_000
}

fn default_fee_target_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_query_concurrency() -> usize {
    8
}

fn default_port() -> u16 {
    3000
}
