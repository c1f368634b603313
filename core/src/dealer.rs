use alloy::primitives::{Address, U256};
use eyre::Result;
use tracing::info;

use dealer_common::errors::DealError;
use dealer_common::types::{DealOutcome, DealRequest};
use dealer_execution::erc20::balance_of;
use dealer_execution::rpc::TestRpc;

use crate::resolver::{probe_balance, SlotResolver};

/// Forges `request.recipient`'s balance to exactly `request.amount`.
///
/// Native balances are set directly. ERC-20 balances are written into the
/// token's storage at the cell `resolver` discovers, then read back through
/// `balanceOf`. Overlapping calls for the same token and holder race on the
/// fork's storage and must be serialised by the caller.
pub async fn deal<R: TestRpc>(
    rpc: &R,
    resolver: &mut dyn SlotResolver<R>,
    request: &DealRequest,
) -> Result<DealOutcome> {
    let recipient = request.recipient;
    let amount = request.amount;

    let Some(token) = request.erc20_token() else {
        rpc.set_balance(recipient, amount).await?;
        info!(target: "dealer", %recipient, %amount, "set native balance");
        return Ok(DealOutcome::Native);
    };

    // Any probe "matches" when the balance already equals the target, which
    // would commit a write to an unrelated cell.
    if probe_balance(rpc, token, recipient, None).await? == Some(amount) {
        info!(target: "dealer", %token, %recipient, %amount, "balance already set");
        return Ok(DealOutcome::Unchanged);
    }

    let resolved = resolver.resolve(rpc, token, request).await?;

    let actual = balance_of(rpc, token, recipient, None).await?;
    if actual != amount {
        return Err(DealError::Verification {
            token,
            expected: amount,
            actual,
        }
        .into());
    }

    info!(
        target: "dealer",
        %token,
        %recipient,
        %amount,
        address = %resolved.address,
        slot = %resolved.slot,
        "dealt erc20 balance"
    );

    Ok(DealOutcome::Storage(resolved))
}

/// A node handle paired with the slot discovery strategy used for ERC-20s.
pub struct Dealer<R: TestRpc> {
    rpc: R,
    resolver: Box<dyn SlotResolver<R>>,
}

impl<R: TestRpc> Dealer<R> {
    pub fn new(rpc: R, resolver: Box<dyn SlotResolver<R>>) -> Self {
        Self { rpc, resolver }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub async fn deal(&mut self, request: &DealRequest) -> Result<DealOutcome> {
        deal(&self.rpc, self.resolver.as_mut(), request).await
    }

    pub async fn balance_of(&self, token: Address, holder: Address) -> Result<U256> {
        balance_of(&self.rpc, token, holder, None).await
    }
}

impl<R: TestRpc> std::fmt::Debug for Dealer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dealer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use dealer_common::types::StorageLayout;
    use dealer_execution::rpc::mock_rpc::{MockRpc, MockToken};

    use crate::resolver::AccessListResolver;

    use super::*;

    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const HOLDER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[tokio::test]
    async fn test_ignored_write_fails_verification() {
        let rpc = MockRpc::default()
            .with_token(TOKEN, MockToken::new(StorageLayout::Solidity, 9))
            .drop_writes();
        let mut resolver = AccessListResolver::default();

        let request = DealRequest::erc20(TOKEN, HOLDER, U256::from(100));
        let err = deal(&rpc, &mut resolver, &request).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DealError>(),
            Some(DealError::Verification { token, expected, actual })
                if *token == TOKEN && *expected == U256::from(100) && actual.is_zero()
        ));
        assert_eq!(rpc.storage_writes(), 1);
    }

    #[tokio::test]
    async fn test_matching_balance_is_left_alone() {
        let rpc = MockRpc::default().with_token(TOKEN, MockToken::new(StorageLayout::Solidity, 9));
        rpc.set_token_balance(TOKEN, HOLDER, U256::from(100));
        let mut resolver = AccessListResolver::default();

        let request = DealRequest::erc20(TOKEN, HOLDER, U256::from(100));
        let outcome = deal(&rpc, &mut resolver, &request).await.unwrap();

        assert_eq!(outcome, DealOutcome::Unchanged);
        assert_eq!(rpc.storage_writes(), 0);
    }
}
