use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Slot discovery strategy used for ERC-20 deals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Strategy {
    /// Probe the cells reported by `eth_createAccessList`.
    #[default]
    AccessList,
    /// Walk the Solidity and Vyper mapping layouts slot by slot.
    BruteForce,
}

/// Order in which access list entries are probed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProbeOrder {
    #[default]
    Forward,
    /// Last accessed cell first.
    Reverse,
}

/// How a candidate cell is tested before it is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OverrideMode {
    /// `eth_call` with a state override; nothing is written until a match.
    #[default]
    Transient,
    /// Write the cell, read, and restore on mismatch. For nodes without
    /// `eth_call` state overrides.
    Commit,
}
