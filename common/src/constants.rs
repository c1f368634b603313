use alloy::primitives::{address, Address};

/// Placeholder address wallets and aggregators use for the chain's native asset.
pub const NATIVE_TOKEN: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

// Highest mapping slot index the brute-force search tries when a request
// does not bound it.
pub const DEFAULT_MAX_SLOT: u64 = 100;

// Probing the wrong cell can send a token down an expensive path, so calls
// made while searching are capped.
pub const PROBE_GAS_LIMIT: u64 = 1_000_000;
