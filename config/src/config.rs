use std::path::{Path, PathBuf};

use dirs::home_dir;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::base::BaseConfig;
use crate::cli::CliConfig;
use crate::types::{OverrideMode, ProbeOrder, Strategy};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rpc_url: String,
    pub strategy: Strategy,
    pub max_slot: u64,
    /// Where solved brute-force slots are kept between runs. `None` keeps
    /// them in memory only.
    pub cache_path: Option<PathBuf>,
    pub probe_order: ProbeOrder,
    pub override_mode: OverrideMode,
}

impl Config {
    /// Layers, lowest precedence first: built-in defaults, the `[default]` and
    /// `[<profile>]` tables of the toml file, `DEALER_*` environment variables,
    /// then command line flags.
    pub fn from_file(
        config_path: &Path,
        profile: &str,
        cli_config: &CliConfig,
    ) -> Result<Self, figment::Error> {
        let base_provider = Serialized::defaults(BaseConfig::default());
        let toml_provider = Toml::file(config_path).nested();
        let env_provider = Env::prefixed("DEALER_").global();
        let cli_provider = cli_config.as_provider();

        Figment::new()
            .merge(base_provider)
            .merge(toml_provider)
            .merge(env_provider)
            .merge(cli_provider)
            .select(profile)
            .extract()
    }

    pub fn to_base_config(&self) -> BaseConfig {
        BaseConfig {
            rpc_url: self.rpc_url.clone(),
            strategy: self.strategy,
            max_slot: self.max_slot,
            cache_path: self.cache_path.clone(),
            probe_order: self.probe_order,
            override_mode: self.override_mode,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        BaseConfig::default().into()
    }
}

impl From<BaseConfig> for Config {
    fn from(base: BaseConfig) -> Self {
        Config {
            rpc_url: base.rpc_url,
            strategy: base.strategy,
            max_slot: base.max_slot,
            cache_path: base.cache_path,
            probe_order: base.probe_order,
            override_mode: base.override_mode,
        }
    }
}

/// `~/.dealer/dealer.toml`
pub fn default_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".dealer").join("dealer.toml"))
}
