use std::fmt::Display;

use alloy::primitives::{Address, U256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DealError {
    #[error("could not deal erc20 tokens: cannot find \"balanceOf\" storage slot at {token}, {search}")]
    SlotNotFound { token: Address, search: SlotSearch },
    #[error("balance verification failed for {token}: expected {expected}, found {actual}")]
    Verification {
        token: Address,
        expected: U256,
        actual: U256,
    },
}

/// The search space a resolver exhausted before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSearch {
    AccessList,
    BruteForce { start: u64, max_slot: u64 },
}

impl Display for SlotSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessList => write!(f, "access list exhausted"),
            Self::BruteForce { start, max_slot } => {
                write!(f, "brute-force exhausted mapping slots {start}..={max_slot}")
            }
        }
    }
}

/// Errors from a `balanceOf` call that mean "this candidate is wrong" rather
/// than "the node is unreachable".
#[derive(Debug, Error)]
pub enum EvmError {
    #[error("execution reverted: {0}")]
    Revert(String),
    #[error("could not decode call output: {0}")]
    Decode(String),
    /// The node refused the state override itself, so the call never ran.
    #[error("node does not support eth_call state overrides: {0}")]
    OverridesUnsupported(String),
}

#[derive(Debug, Error)]
#[error("rpc error on method: {method}, message: {error}")]
pub struct RpcError<E: ToString> {
    method: String,
    error: E,
}

impl<E: ToString> RpcError<E> {
    pub fn new(method: &str, err: E) -> Self {
        Self {
            method: method.to_string(),
            error: err,
        }
    }
}
