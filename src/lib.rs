#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![deny(rustdoc::broken_intra_doc_links)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! # ERC-20 balance forging for local forks.
//!
//! > dealer sets any account's token balance on an anvil fork without knowing the token's storage layout.
//!
//! Native balances go through `anvil_setBalance`. For ERC-20 tokens dealer finds the storage cell backing
//! `balanceOf(recipient)`, either from the cells an `eth_createAccessList` of that call touches or by
//! guessing the mapping's position under the Solidity and Vyper layouts, and writes the requested amount there.
//!
//! ## Quickstart: `prelude`
//!
//! ```no_run
//! # #[allow(unused)]
//! use dealer::prelude::*;
//! ```
//!
//! ## Breakdown of exported dealer modules
//!
//! ### `client`
//!
//! `DealerBuilder` configures a `Dealer` with the fluent builder pattern. `Dealer::deal` forges one
//! balance. The slot caches used by the brute-force search live here as well.
//!
//! ### `config`
//!
//! Layered configuration read from `~/.dealer/dealer.toml`, `DEALER_*` environment variables and flags.
//!
//! ### `rpc`
//!
//! The `TestRpc` trait over the fork's node, with an HTTP implementation and an in-memory mock.
//!
//! ### `types`
//!
//! Requests, outcomes and storage layouts.
//!
//! ### `errors`
//!
//! Errors used across dealer.

pub mod client {
    pub use dealer_core::cache::{FileCache, MemoryCache, SlotCache};
    pub use dealer_core::resolver::{AccessListResolver, LayoutResolver, SlotResolver};
    pub use dealer_core::{deal, Dealer, DealerBuilder};
}

pub mod config {
    pub use dealer_config::{
        default_cache_path, default_config_path, CliConfig, Config, OverrideMode, ProbeOrder,
        Strategy,
    };
}

pub mod rpc {
    pub use dealer_execution::erc20::balance_of;
    pub use dealer_execution::rpc::{http_rpc::HttpRpc, mock_rpc, TestRpc};
}

pub mod types {
    pub use dealer_common::types::*;
}

pub mod errors {
    pub use dealer_common::errors::*;
}

pub mod constants {
    pub use dealer_common::constants::*;
}

pub mod prelude {
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::constants::*;
    pub use crate::errors::*;
    pub use crate::rpc::*;
    pub use crate::types::*;
}
