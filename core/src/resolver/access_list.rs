use alloy::eips::BlockId;
use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::state::{AccountOverride, StateOverride, StateOverridesBuilder};
use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, trace, warn};

use dealer_common::constants::DEFAULT_MAX_SLOT;
use dealer_common::errors::{DealError, SlotSearch};
use dealer_common::types::{DealRequest, ResolvedSlot};
use dealer_common::utils::u256_to_word;
use dealer_config::{OverrideMode, ProbeOrder};
use dealer_execution::erc20::balance_of_request;
use dealer_execution::rpc::TestRpc;

use crate::slot::CandidateIter;

use super::layout::{search_bounds, sweep};
use super::{is_overrides_unsupported, probe_balance, probe_cell, SlotResolver};

/// Tries every cell `balanceOf(holder)` reads, as reported by
/// `eth_createAccessList`.
///
/// Requests carrying a start slot or layout skip the access list and probe
/// only the layout candidates they allow.
#[derive(Debug, Clone, Copy)]
pub struct AccessListResolver {
    order: ProbeOrder,
    mode: OverrideMode,
    max_slot: u64,
}

impl Default for AccessListResolver {
    fn default() -> Self {
        Self::new(ProbeOrder::default(), OverrideMode::default())
    }
}

impl AccessListResolver {
    pub fn new(order: ProbeOrder, mode: OverrideMode) -> Self {
        Self {
            order,
            mode,
            max_slot: DEFAULT_MAX_SLOT,
        }
    }

    /// Bound for hinted requests that do not set their own `max_slot`.
    pub fn with_max_slot(mut self, max_slot: u64) -> Self {
        self.max_slot = max_slot;
        self
    }

    pub fn mode(&self) -> OverrideMode {
        self.mode
    }

    async fn probe<R: TestRpc>(
        &mut self,
        rpc: &R,
        address: Address,
        slot: B256,
        token: Address,
        holder: Address,
        amount: U256,
    ) -> Result<bool> {
        if self.mode == OverrideMode::Transient {
            let overrides = single_cell_override(address, slot, amount);
            match probe_balance(rpc, token, holder, Some(overrides)).await {
                Ok(balance) if balance == Some(amount) => {
                    rpc.set_storage_at(address, slot, u256_to_word(amount)).await?;
                    return Ok(true);
                }
                Ok(_) => return Ok(false),
                Err(err) if is_overrides_unsupported(&err) => {
                    warn!(
                        target: "dealer::access_list",
                        error = %err,
                        "state overrides rejected, writing cells directly"
                    );
                    self.mode = OverrideMode::Commit;
                }
                Err(err) => return Err(err),
            }
        }

        probe_cell(rpc, address, slot, token, holder, amount).await
    }

    async fn resolve_hinted<R: TestRpc>(
        &self,
        rpc: &R,
        token: Address,
        request: &DealRequest,
    ) -> Result<ResolvedSlot> {
        let (start, max_slot) = search_bounds(request, self.max_slot);
        debug!(
            target: "dealer::access_list",
            %token,
            start,
            max_slot,
            layout = ?request.storage_type,
            "layout hint given, probing layout candidates only"
        );

        let candidates = CandidateIter::new(start, request.storage_type, max_slot);
        sweep(rpc, token, request, candidates)
            .await?
            .ok_or_else(|| {
                DealError::SlotNotFound {
                    token,
                    search: SlotSearch::BruteForce { start, max_slot },
                }
                .into()
            })
    }
}

fn single_cell_override(address: Address, slot: B256, amount: U256) -> StateOverride {
    StateOverridesBuilder::with_capacity(1)
        .append(
            address,
            AccountOverride::default().with_state_diff([(slot, u256_to_word(amount))]),
        )
        .build()
}

#[async_trait]
impl<R: TestRpc> SlotResolver<R> for AccessListResolver {
    async fn resolve(
        &mut self,
        rpc: &R,
        token: Address,
        request: &DealRequest,
    ) -> Result<ResolvedSlot> {
        if request.has_layout_hint() {
            return self.resolve_hinted(rpc, token, request).await;
        }

        let holder = request.recipient;
        let tx = balance_of_request(token, holder);
        let list = rpc.create_access_list(&tx, BlockId::latest()).await?;

        let mut cells: Vec<(Address, B256)> = list
            .access_list
            .0
            .iter()
            .flat_map(|item| item.storage_keys.iter().map(|key| (item.address, *key)))
            .collect();

        if self.order == ProbeOrder::Reverse {
            cells.reverse();
        }

        debug!(
            target: "dealer::access_list",
            %token,
            cells = cells.len(),
            gas_used = %list.gas_used,
            "probing access list"
        );

        for (address, slot) in cells {
            if self
                .probe(rpc, address, slot, token, holder, request.amount)
                .await?
            {
                debug!(target: "dealer::access_list", %token, %address, %slot, "found balance slot");
                return Ok(ResolvedSlot {
                    address,
                    slot,
                    candidate: None,
                });
            }

            trace!(target: "dealer::access_list", %address, %slot, "not the balance slot");
        }

        Err(DealError::SlotNotFound {
            token,
            search: SlotSearch::AccessList,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};

    use dealer_common::types::{SlotCandidate, StorageLayout};
    use dealer_execution::rpc::mock_rpc::{MockRpc, MockToken};

    use super::*;

    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const STORAGE: Address = address!("00000000000000000000000000000000000000aa");
    const HOLDER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const GUARD: B256 = b256!("0000000000000000000000000000000000000000000000000000000000000003");

    fn request(amount: u64) -> DealRequest {
        DealRequest::erc20(TOKEN, HOLDER, U256::from(amount))
    }

    #[tokio::test]
    async fn test_transient_probe_skips_reverting_cells() {
        let rpc = MockRpc::default().with_token(
            TOKEN,
            MockToken::new(StorageLayout::Solidity, 9).guard(GUARD),
        );
        let mut resolver = AccessListResolver::default();

        let resolved = resolver.resolve(&rpc, TOKEN, &request(100)).await.unwrap();

        let cell = SlotCandidate::new(StorageLayout::Solidity, 9).cell(HOLDER);
        assert_eq!(resolved.address, TOKEN);
        assert_eq!(resolved.slot, cell);
        assert_eq!(resolved.candidate, None);
        assert_eq!(rpc.storage_writes(), 1);
        assert_eq!(rpc.storage(TOKEN, GUARD), B256::ZERO);
    }

    #[tokio::test]
    async fn test_resolves_proxy_storage_contract() {
        let rpc = MockRpc::default().with_token(
            TOKEN,
            MockToken::new(StorageLayout::Solidity, 51).storage(STORAGE),
        );
        let mut resolver = AccessListResolver::new(ProbeOrder::Reverse, OverrideMode::Transient);

        let resolved = resolver.resolve(&rpc, TOKEN, &request(7)).await.unwrap();

        assert_eq!(resolved.address, STORAGE);
        assert_eq!(rpc.dirty_cells(TOKEN), vec![]);
        assert_eq!(rpc.dirty_cells(STORAGE), vec![(resolved.slot, u256_to_word(U256::from(7)))]);
    }

    #[tokio::test]
    async fn test_commit_mode_restores_rejected_cells() {
        let rpc = MockRpc::default()
            .with_token(TOKEN, MockToken::new(StorageLayout::Vyper, 3).guard(GUARD))
            .without_overrides();
        let mut resolver = AccessListResolver::new(ProbeOrder::Forward, OverrideMode::Commit);

        let resolved = resolver.resolve(&rpc, TOKEN, &request(100)).await.unwrap();

        assert_eq!(resolved.slot, SlotCandidate::new(StorageLayout::Vyper, 3).cell(HOLDER));
        assert_eq!(rpc.storage(TOKEN, GUARD), B256::ZERO);
        assert_eq!(rpc.dirty_cells(TOKEN).len(), 1);
    }

    #[tokio::test]
    async fn test_transient_mode_falls_back_to_commit_without_override_support() {
        let rpc = MockRpc::default()
            .with_token(TOKEN, MockToken::new(StorageLayout::Vyper, 3).guard(GUARD))
            .without_overrides();
        let mut resolver = AccessListResolver::default();

        let resolved = resolver.resolve(&rpc, TOKEN, &request(100)).await.unwrap();

        assert_eq!(resolved.slot, SlotCandidate::new(StorageLayout::Vyper, 3).cell(HOLDER));
        assert_eq!(resolver.mode(), OverrideMode::Commit);
        assert_eq!(rpc.storage(TOKEN, GUARD), B256::ZERO);
        assert_eq!(rpc.dirty_cells(TOKEN).len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_access_list_leaves_storage_untouched() {
        let rpc = MockRpc::default().with_token(
            TOKEN,
            MockToken::new(StorageLayout::Solidity, 9).guard(GUARD),
        );
        // a set guard makes every balanceOf revert
        rpc.seed_storage(TOKEN, GUARD, B256::with_last_byte(1));
        let mut resolver = AccessListResolver::default();

        let err = resolver.resolve(&rpc, TOKEN, &request(100)).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DealError>(),
            Some(DealError::SlotNotFound {
                search: SlotSearch::AccessList,
                ..
            })
        ));
        assert_eq!(rpc.storage_writes(), 0);
        assert_eq!(rpc.storage(TOKEN, GUARD), B256::with_last_byte(1));
    }

    #[tokio::test]
    async fn test_pinned_request_ignores_access_list() {
        let rpc = MockRpc::default().with_token(TOKEN, MockToken::new(StorageLayout::Vyper, 3));
        let mut resolver = AccessListResolver::default();

        let pinned = request(100).pinned(StorageLayout::Solidity, 7);
        let err = resolver.resolve(&rpc, TOKEN, &pinned).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DealError>(),
            Some(DealError::SlotNotFound {
                search: SlotSearch::BruteForce {
                    start: 7,
                    max_slot: 7
                },
                ..
            })
        ));
        assert!(rpc.dirty_cells(TOKEN).is_empty());

        let pinned = request(100).pinned(StorageLayout::Vyper, 3);
        let resolved = resolver.resolve(&rpc, TOKEN, &pinned).await.unwrap();
        assert_eq!(resolved.candidate, Some(SlotCandidate::new(StorageLayout::Vyper, 3)));
        assert_eq!(rpc.storage_writes(), 2 + 1);
    }
}
