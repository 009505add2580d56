mod config;
mod routes;

use std::{fs, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use chia::protocol::Bytes32;
use chia_wallet_sdk::coinset::{CoinsetClient, FullNodeClient};
use clap::{Parser, Subcommand};
use config::Config;
use routes::{router, App};
use serde_json::json;
use server_coin_registry::{
    CoinsetLedger, KeyWallet, NodeClient, NodeFee, Registry, RegistryConfig,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub type ServerRegistry = Registry<Arc<CoinsetLedger>, KeyWallet<Arc<CoinsetLedger>>, NodeFee>;

#[derive(Parser)]
#[command(author, version, about = "Manage data layer server coins")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Creates a server coin for a data layer store
    AddServer {
        /// Store id (launcher id) to advertise urls for
        #[arg(long)]
        store_id: String,
        /// Url of a mirror, may be repeated
        #[arg(long = "url", required = true)]
        urls: Vec<String>,
        /// Mojos to lock in the server coin
        #[arg(long)]
        amount: Option<u64>,
        /// Fee override in mojos
        #[arg(long)]
        fee: Option<u64>,
    },
    /// Spends a server coin without recreating it
    DeleteServer {
        #[arg(long)]
        coin_id: String,
        /// Fee override in mojos
        #[arg(long)]
        fee: Option<u64>,
    },
    /// Lists the server coins of a data layer store
    GetServers {
        #[arg(long)]
        store_id: String,
    },
    /// Serves server coin lookups over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("INFO,server_coin_registry=DEBUG"))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let registry = connect(&config)?;

    match cli.command {
        Command::AddServer {
            store_id,
            urls,
            amount,
            fee,
        } => {
            let transaction_id = registry
                .create(
                    &parse_hex(&store_id)?,
                    &urls,
                    amount.unwrap_or(config.default_amount),
                    fee,
                )
                .await?;

            print_json(&json!({ "transaction_id": format!("0x{transaction_id}") }))?;
        }
        Command::DeleteServer { coin_id, fee } => {
            let coin_id = parse_bytes32(&coin_id)?;
            let transaction_id = registry.delete(coin_id, fee).await?;

            print_json(&json!({ "transaction_id": format!("0x{transaction_id}") }))?;
        }
        Command::GetServers { store_id } => {
            let servers = registry.query(&parse_hex(&store_id)?).await?;

            print_json(&json!({ "servers": servers }))?;
        }
        Command::Serve => {
            let app = router(App {
                registry: Arc::new(registry),
            });
            let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
            info!("Listening on {}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn node_client(config: &Config) -> Result<NodeClient> {
    if let Some(url) = &config.node_url {
        info!("Using remote node at {url}");
        return Ok(NodeClient::Remote(CoinsetClient::new(url.clone())));
    }

    let cert = fs::read(&config.cert_path)?;
    let key = fs::read_to_string(&config.key_path)?;
    let key = topk8::from_pkcs1_pem(&key).unwrap_or(key);

    Ok(NodeClient::Local(FullNodeClient::new(&cert, key.as_bytes())?))
}

fn connect(config: &Config) -> Result<ServerRegistry> {
    let client = Arc::new(node_client(config)?);

    let ledger = Arc::new(CoinsetLedger::new(client.clone()));
    let wallet = KeyWallet::from_mnemonic(ledger.clone(), &config.mnemonic()?, config.derivation_count)?;
    let fees = NodeFee::new(client, config.default_fee).with_target_secs(config.fee_target_secs);

    Ok(Registry::new(
        ledger,
        wallet,
        fees,
        RegistryConfig {
            timeout: Duration::from_secs(config.timeout_secs),
            query_concurrency: config.query_concurrency,
            constants: config.network.constants(),
        },
    ))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn parse_hex(value: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(value.strip_prefix("0x").unwrap_or(value))?)
}

fn parse_bytes32(value: &str) -> Result<Bytes32> {
    let bytes: [u8; 32] = parse_hex(value)?
        .try_into()
        .map_err(|_| anyhow!("expected 32 bytes, got {value}"))?;

    Ok(Bytes32::new(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_and_bare_hex() {
        assert_eq!(parse_hex("0x0aff").unwrap(), vec![0x0a, 0xff]);
        assert_eq!(parse_hex("0aff").unwrap(), vec![0x0a, 0xff]);
        assert!(parse_hex("0xzz").is_err());
    }

    #[test]
    fn coin_ids_must_be_32_bytes() {
        assert_eq!(
            parse_bytes32(&"ab".repeat(32)).unwrap(),
            Bytes32::new([0xab; 32])
        );
        assert!(parse_bytes32("0xabcd").is_err());
    }

    #[test]
    fn add_server_accepts_repeated_urls() {
        let cli = Cli::parse_from([
            "server-coin",
            "add-server",
            "--store-id",
            "0x00",
            "--url",
            "https://a.example.com",
            "--url",
            "https://b.example.com",
        ]);

        let Command::AddServer { urls, amount, .. } = cli.command else {
            panic!("expected add-server");
        };
        assert_eq!(urls.len(), 2);
        assert_eq!(amount, None);
    }
}
