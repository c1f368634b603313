use std::default::Default;
use std::path::PathBuf;

use dirs::cache_dir;
use serde::Serialize;

use dealer_common::constants::DEFAULT_MAX_SLOT;

use crate::types::{OverrideMode, ProbeOrder, Strategy};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// The defaults every other configuration source is layered on.
#[derive(Serialize)]
pub struct BaseConfig {
    pub rpc_url: String,
    pub strategy: Strategy,
    pub max_slot: u64,
    pub cache_path: Option<PathBuf>,
    pub probe_order: ProbeOrder,
    pub override_mode: OverrideMode,
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            strategy: Strategy::default(),
            max_slot: DEFAULT_MAX_SLOT,
            cache_path: default_cache_path(),
            probe_order: ProbeOrder::default(),
            override_mode: OverrideMode::default(),
        }
    }
}

/// `<user cache dir>/dealer/slots.json`
pub fn default_cache_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join("dealer").join("slots.json"))
}
