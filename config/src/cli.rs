use std::{collections::HashMap, path::PathBuf};

use figment::{providers::Serialized, value::Value};
use serde::{Deserialize, Serialize};

use crate::types::{OverrideMode, ProbeOrder, Strategy};

/// Cli Config
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CliConfig {
    pub rpc_url: Option<String>,
    pub strategy: Option<Strategy>,
    pub max_slot: Option<u64>,
    pub cache_path: Option<PathBuf>,
    pub probe_order: Option<ProbeOrder>,
    pub override_mode: Option<OverrideMode>,
}

impl CliConfig {
    pub fn as_provider(&self) -> Serialized<HashMap<&str, Value>> {
        let mut user_dict = HashMap::new();

        if let Some(rpc) = &self.rpc_url {
            user_dict.insert("rpc_url", Value::from(rpc.clone()));
        }

        if let Some(strategy) = self.strategy {
            user_dict.insert("strategy", Value::from(strategy.to_string()));
        }

        if let Some(max_slot) = self.max_slot {
            user_dict.insert("max_slot", Value::from(max_slot));
        }

        if let Some(path) = &self.cache_path {
            user_dict.insert(
                "cache_path",
                Value::from(path.to_string_lossy().into_owned()),
            );
        }

        if let Some(order) = self.probe_order {
            user_dict.insert("probe_order", Value::from(order.to_string()));
        }

        if let Some(mode) = self.override_mode {
            user_dict.insert("override_mode", Value::from(mode.to_string()));
        }

        Serialized::globals(user_dict)
    }
}
