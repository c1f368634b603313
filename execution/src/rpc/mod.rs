use alloy::eips::{eip2930::AccessListResult, BlockId};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::{state::StateOverride, TransactionRequest};
use async_trait::async_trait;
use eyre::Result;

pub mod http_rpc;
pub mod mock_rpc;

/// Node capabilities a deal needs: plain reads and calls plus the
/// anvil-style cheat methods that mutate a fork.
#[async_trait]
pub trait TestRpc: Send + Clone + Sync + 'static {
    fn new(rpc: &str) -> Result<Self>
    where
        Self: Sized;

    /// Storage cells a call would touch, with the gas it would use.
    async fn create_access_list(
        &self,
        tx: &TransactionRequest,
        block: BlockId,
    ) -> Result<AccessListResult>;

    /// Unset cells read as zero.
    async fn get_storage_at(&self, address: Address, slot: B256, block: BlockId) -> Result<B256>;
    async fn set_storage_at(&self, address: Address, slot: B256, value: B256) -> Result<()>;

    /// `eth_call`, optionally against a transient state override. Reverts and
    /// other execution failures surface as [`dealer_common::errors::EvmError`].
    async fn call(
        &self,
        tx: &TransactionRequest,
        overrides: Option<StateOverride>,
        block: BlockId,
    ) -> Result<Bytes>;

    async fn set_balance(&self, address: Address, amount: U256) -> Result<()>;
}
