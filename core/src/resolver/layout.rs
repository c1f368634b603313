use alloy::primitives::Address;
use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, info, trace, warn};

use dealer_common::errors::{DealError, SlotSearch};
use dealer_common::types::{DealRequest, ResolvedSlot, SlotCandidate};
use dealer_execution::rpc::TestRpc;

use crate::cache::SlotCache;
use crate::slot::CandidateIter;

use super::{probe_cell, SlotResolver};

/// Guesses the balance mapping's position under the Solidity and Vyper
/// storage layouts, writing and verifying one candidate at a time.
///
/// Solved tokens are remembered in a [`SlotCache`] so the next deal for the
/// same token needs a single probe.
pub struct LayoutResolver {
    cache: Box<dyn SlotCache>,
    max_slot: u64,
}

impl LayoutResolver {
    pub fn new(cache: Box<dyn SlotCache>, max_slot: u64) -> Self {
        Self { cache, max_slot }
    }

    pub fn cache(&self) -> &dyn SlotCache {
        self.cache.as_ref()
    }

    fn remember(&mut self, token: Address, candidate: SlotCandidate) {
        self.cache.put(token, candidate);

        if let Err(err) = self.cache.flush() {
            warn!(target: "dealer::cache", %token, error = %err, "could not persist slot cache");
        }
    }
}

/// First and last mapping index a request allows. The bound never falls below
/// the start slot, so a start past the default bound still gets probed.
pub(crate) fn search_bounds(request: &DealRequest, default_max_slot: u64) -> (u64, u64) {
    let start = request.slot.unwrap_or_default();
    let max_slot = request.max_slot.unwrap_or(default_max_slot).max(start);

    (start, max_slot)
}

/// Write-and-verify each candidate in turn, returning the first that makes
/// `balanceOf` report the requested amount.
pub(crate) async fn sweep<R, I>(
    rpc: &R,
    token: Address,
    request: &DealRequest,
    candidates: I,
) -> Result<Option<ResolvedSlot>>
where
    R: TestRpc,
    I: Iterator<Item = SlotCandidate> + Send,
{
    for candidate in candidates {
        let slot = candidate.cell(request.recipient);
        trace!(target: "dealer::layout", %token, %candidate, %slot, "probing");

        if probe_cell(rpc, token, slot, token, request.recipient, request.amount).await? {
            return Ok(Some(ResolvedSlot {
                address: token,
                slot,
                candidate: Some(candidate),
            }));
        }
    }

    Ok(None)
}

#[async_trait]
impl<R: TestRpc> SlotResolver<R> for LayoutResolver {
    async fn resolve(
        &mut self,
        rpc: &R,
        token: Address,
        request: &DealRequest,
    ) -> Result<ResolvedSlot> {
        let (start, max_slot) = search_bounds(request, self.max_slot);

        // hints and pins override whatever an earlier search remembered
        let cached = self.cache.get(token).filter(|candidate| {
            !request.is_pinned()
                && request.storage_type.map_or(true, |layout| layout == candidate.layout)
                && (start..=max_slot).contains(&candidate.slot)
        });

        if let Some(candidate) = cached {
            if let Some(resolved) = sweep(rpc, token, request, std::iter::once(candidate)).await? {
                debug!(target: "dealer::layout", %token, %candidate, "cached slot still valid");
                return Ok(resolved);
            }

            debug!(target: "dealer::layout", %token, %candidate, "cached slot is stale");
        }

        let candidates = CandidateIter::new(start, request.storage_type, max_slot)
            .filter(move |candidate| Some(*candidate) != cached);

        match sweep(rpc, token, request, candidates).await? {
            Some(resolved) => {
                if let Some(candidate) = resolved.candidate {
                    info!(target: "dealer::layout", %token, %candidate, "found balance slot");
                    self.remember(token, candidate);
                }
                Ok(resolved)
            }
            None => Err(DealError::SlotNotFound {
                token,
                search: SlotSearch::BruteForce { start, max_slot },
            }
            .into()),
        }
    }
}
