use std::{path::PathBuf, process::exit, str::FromStr};

use alloy::primitives::{utils::parse_units, Address, U256};
use clap::Parser;
use eyre::{eyre, Result};
use tracing::{error, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::FmtSubscriber;

use dealer_common::types::{DealOutcome, DealRequest, StorageLayout};
use dealer_config::{default_config_path, CliConfig, Config, OverrideMode, ProbeOrder, Strategy};
use dealer_core::DealerBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    enable_tracer()?;

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!(target: "dealer::runner", error = %err);
        exit(1);
    }

    Ok(())
}

fn enable_tracer() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    let request = cli.as_request()?;

    let mut builder = DealerBuilder::new().config(config);
    if cli.no_cache {
        builder = builder.no_cache();
    }

    let mut dealer = builder.build()?;
    let outcome = dealer.deal(&request).await?;

    match outcome {
        DealOutcome::Native => {
            info!(target: "dealer::runner", recipient = %request.recipient, amount = %request.amount, "native balance set");
        }
        DealOutcome::Unchanged => {
            info!(target: "dealer::runner", recipient = %request.recipient, "balance already at the requested amount");
        }
        DealOutcome::Storage(resolved) => {
            info!(
                target: "dealer::runner",
                recipient = %request.recipient,
                amount = %request.amount,
                address = %resolved.address,
                slot = %resolved.slot,
                "token balance set"
            );
        }
    }

    Ok(())
}

#[derive(Parser)]
#[clap(version, about)]
/// Sets native or ERC-20 balances on a local anvil fork
struct Cli {
    /// Token to deal. Omit, or pass the 0xEeee... sentinel, for the native balance.
    #[clap(short, long)]
    token: Option<Address>,
    #[clap(short, long)]
    recipient: Address,
    /// Whole units unless `--decimals` is given.
    #[clap(short, long)]
    amount: String,
    #[clap(short, long)]
    decimals: Option<u8>,
    /// Mapping slot index to start the brute-force search at.
    #[clap(short, long)]
    slot: Option<u64>,
    #[clap(long)]
    storage_type: Option<StorageLayout>,
    #[clap(short, long, env = "DEALER_PROFILE", default_value = "default")]
    profile: String,
    #[clap(long)]
    max_slot: Option<u64>,
    #[clap(long)]
    strategy: Option<Strategy>,
    #[clap(long)]
    probe_order: Option<ProbeOrder>,
    #[clap(long)]
    override_mode: Option<OverrideMode>,
    #[clap(long)]
    rpc_url: Option<String>,
    #[clap(long)]
    cache_path: Option<PathBuf>,
    #[clap(long)]
    no_cache: bool,
    /// Defaults to ~/.dealer/dealer.toml
    #[clap(long, env = "DEALER_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let config_path = self
            .config
            .clone()
            .or_else(default_config_path)
            .ok_or_else(|| eyre!("cannot locate a home directory for the config file"))?;

        Config::from_file(&config_path, &self.profile, &self.as_cli_config()).map_err(|err| {
            eyre!(
                "invalid configuration in {} (profile {}): {err}",
                config_path.display(),
                self.profile
            )
        })
    }

    fn as_cli_config(&self) -> CliConfig {
        CliConfig {
            rpc_url: self.rpc_url.clone(),
            strategy: self.strategy,
            max_slot: self.max_slot,
            cache_path: self.cache_path.clone(),
            probe_order: self.probe_order,
            override_mode: self.override_mode,
        }
    }

    fn as_request(&self) -> Result<DealRequest> {
        let mut request =
            DealRequest::new(self.token, self.recipient, parse_amount(&self.amount, self.decimals)?);
        request.slot = self.slot;
        request.storage_type = self.storage_type;
        request.max_slot = self.max_slot;

        Ok(request)
    }
}

fn parse_amount(amount: &str, decimals: Option<u8>) -> Result<U256> {
    match decimals {
        Some(decimals) => Ok(parse_units(amount, decimals)
            .map_err(|err| eyre!("invalid amount {amount}: {err}"))?
            .get_absolute()),
        None => U256::from_str(amount).map_err(|err| eyre!("invalid amount {amount}: {err}")),
    }
}
