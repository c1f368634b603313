use alloy::eips::BlockId;
use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::state::StateOverride;
use async_trait::async_trait;
use eyre::Result;
use tracing::trace;

use dealer_common::errors::EvmError;
use dealer_common::types::{DealRequest, ResolvedSlot};
use dealer_common::utils::u256_to_word;
use dealer_execution::erc20::balance_of;
use dealer_execution::rpc::TestRpc;

pub mod access_list;
pub mod layout;

pub use access_list::AccessListResolver;
pub use layout::LayoutResolver;

/// Finds the cell holding a holder's token balance and leaves the requested
/// amount written there.
#[async_trait]
pub trait SlotResolver<R: TestRpc>: Send + Sync {
    /// On success exactly one cell stays modified. On failure every cell the
    /// resolver touched holds its original value.
    async fn resolve(
        &mut self,
        rpc: &R,
        token: Address,
        request: &DealRequest,
    ) -> Result<ResolvedSlot>;
}

/// `balanceOf(holder)`, with reverts and undecodable output read as `None`.
/// A node refusing the overrides is still an error.
pub(crate) async fn probe_balance<R: TestRpc>(
    rpc: &R,
    token: Address,
    holder: Address,
    overrides: Option<StateOverride>,
) -> Result<Option<U256>> {
    match balance_of(rpc, token, holder, overrides).await {
        Ok(balance) => Ok(Some(balance)),
        Err(err) => match err.downcast_ref::<EvmError>() {
            Some(EvmError::OverridesUnsupported(_)) | None => Err(err),
            Some(_) => {
                trace!(target: "dealer::probe", %token, error = %err, "balanceOf failed");
                Ok(None)
            }
        },
    }
}

pub(crate) fn is_overrides_unsupported(err: &eyre::Report) -> bool {
    matches!(
        err.downcast_ref::<EvmError>(),
        Some(EvmError::OverridesUnsupported(_))
    )
}

/// Writes `amount` into `slot` of `address` and keeps it only if
/// `token.balanceOf(holder)` then reports `amount`.
pub(crate) async fn probe_cell<R: TestRpc>(
    rpc: &R,
    address: Address,
    slot: B256,
    token: Address,
    holder: Address,
    amount: U256,
) -> Result<bool> {
    let original = rpc.get_storage_at(address, slot, BlockId::latest()).await?;
    rpc.set_storage_at(address, slot, u256_to_word(amount)).await?;

    if probe_balance(rpc, token, holder, None).await? == Some(amount) {
        return Ok(true);
    }

    rpc.set_storage_at(address, slot, original).await?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};

    use dealer_common::types::{SlotCandidate, StorageLayout};
    use dealer_execution::rpc::mock_rpc::{MockRpc, MockToken};

    use super::*;

    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const HOLDER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[tokio::test]
    async fn test_probe_cell_restores_on_mismatch() {
        let rpc = MockRpc::default().with_token(TOKEN, MockToken::new(StorageLayout::Solidity, 9));
        let wrong = SlotCandidate::new(StorageLayout::Solidity, 2).cell(HOLDER);
        let before = b256!("00000000000000000000000000000000000000000000000000000000deadbeef");
        rpc.seed_storage(TOKEN, wrong, before);

        let matched = probe_cell(&rpc, TOKEN, wrong, TOKEN, HOLDER, U256::from(5))
            .await
            .unwrap();

        assert!(!matched);
        assert_eq!(rpc.storage(TOKEN, wrong), before);
    }

    #[tokio::test]
    async fn test_probe_cell_keeps_match() {
        let rpc = MockRpc::default().with_token(TOKEN, MockToken::new(StorageLayout::Solidity, 9));
        let cell = SlotCandidate::new(StorageLayout::Solidity, 9).cell(HOLDER);

        let matched = probe_cell(&rpc, TOKEN, cell, TOKEN, HOLDER, U256::from(5))
            .await
            .unwrap();

        assert!(matched);
        assert_eq!(rpc.storage(TOKEN, cell), u256_to_word(U256::from(5)));
    }

    #[tokio::test]
    async fn test_probe_balance_swallows_reverts() {
        let rpc = MockRpc::default();
        let balance = probe_balance(&rpc, TOKEN, HOLDER, None).await.unwrap();

        assert_eq!(balance, None);
    }

    #[tokio::test]
    async fn test_probe_balance_surfaces_rejected_overrides() {
        let rpc = MockRpc::default()
            .with_token(TOKEN, MockToken::new(StorageLayout::Solidity, 9))
            .without_overrides();

        let err = probe_balance(&rpc, TOKEN, HOLDER, Some(StateOverride::default()))
            .await
            .unwrap_err();

        assert!(is_overrides_unsupported(&err));
    }
}
