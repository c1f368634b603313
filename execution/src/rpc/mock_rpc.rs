use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::eips::eip2930::{AccessList, AccessListItem, AccessListResult};
use alloy::eips::BlockId;
use alloy::primitives::{b256, Address, Bytes, B256, U256};
use alloy::rpc::types::{state::StateOverride, TransactionRequest};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use eyre::Result;

use dealer_common::errors::EvmError;
use dealer_common::types::{SlotCandidate, StorageLayout};
use dealer_common::utils::u256_to_word;

use crate::erc20::IERC20;

use super::TestRpc;

/// EIP-1967 implementation slot, touched by every proxied token call.
const IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// A token the mock node knows how to answer `balanceOf` for.
#[derive(Debug, Clone, Copy)]
pub struct MockToken {
    pub layout: StorageLayout,
    pub slot: u64,
    /// Contract holding the balance mapping. Equal to the token unless it is
    /// an upgradeable proxy over a separate storage contract.
    pub storage: Option<Address>,
    /// A cell read before the balance; any non-zero value makes
    /// `balanceOf` revert.
    pub guard: Option<B256>,
}

impl MockToken {
    pub fn new(layout: StorageLayout, slot: u64) -> Self {
        Self {
            layout,
            slot,
            storage: None,
            guard: None,
        }
    }

    pub fn storage(mut self, storage: Address) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn guard(mut self, guard: B256) -> Self {
        self.guard = Some(guard);
        self
    }

    fn storage_address(&self, token: Address) -> Address {
        self.storage.unwrap_or(token)
    }

    fn balance_cell(&self, holder: Address) -> B256 {
        SlotCandidate::new(self.layout, self.slot).cell(holder)
    }
}

#[derive(Debug, Default)]
struct MockState {
    storage: HashMap<Address, HashMap<B256, B256>>,
    balances: HashMap<Address, U256>,
    tokens: HashMap<Address, MockToken>,
    overrides_disabled: bool,
    writes_dropped: bool,
    storage_writes: usize,
    calls: usize,
}

impl MockState {
    fn read(&self, address: Address, slot: B256, overrides: Option<&StateOverride>) -> B256 {
        let overridden = overrides
            .and_then(|overrides| overrides.get(&address))
            .and_then(|account| account.state_diff.as_ref())
            .and_then(|diff| diff.get(&slot).copied());

        overridden.unwrap_or_else(|| {
            self.storage
                .get(&address)
                .and_then(|cells| cells.get(&slot).copied())
                .unwrap_or_default()
        })
    }

    fn token_call(&self, tx: &TransactionRequest) -> Result<(Address, MockToken, Address), EvmError> {
        let to = tx
            .to
            .and_then(|kind| kind.to().copied())
            .ok_or_else(|| EvmError::Revert("missing call target".to_string()))?;

        let token = self
            .tokens
            .get(&to)
            .copied()
            .ok_or_else(|| EvmError::Revert(format!("no contract at {to}")))?;

        let input = tx.input.input().cloned().unwrap_or_default();
        let call = IERC20::balanceOfCall::abi_decode(&input)
            .map_err(|_| EvmError::Revert("unknown selector".to_string()))?;

        Ok((to, token, call.account))
    }
}

/// In-memory fork that answers ERC-20 `balanceOf` from its own storage the
/// way a compiled token would.
#[derive(Clone, Default)]
pub struct MockRpc {
    state: Arc<Mutex<MockState>>,
}

impl MockRpc {
    pub fn with_token(self, token: Address, config: MockToken) -> Self {
        self.state().tokens.insert(token, config);
        self
    }

    /// Rejects `eth_call` state overrides the way older nodes do.
    pub fn without_overrides(self) -> Self {
        self.state().overrides_disabled = true;
        self
    }

    /// Acknowledges `anvil_setStorageAt` without applying it.
    pub fn drop_writes(self) -> Self {
        self.state().writes_dropped = true;
        self
    }

    /// Seeds a balance straight into the token's mapping.
    pub fn set_token_balance(&self, token: Address, holder: Address, amount: U256) {
        let mut state = self.state();
        let Some(config) = state.tokens.get(&token).copied() else {
            return;
        };

        state
            .storage
            .entry(config.storage_address(token))
            .or_default()
            .insert(config.balance_cell(holder), u256_to_word(amount));
    }

    pub fn seed_storage(&self, address: Address, slot: B256, value: B256) {
        self.state()
            .storage
            .entry(address)
            .or_default()
            .insert(slot, value);
    }

    pub fn storage(&self, address: Address, slot: B256) -> B256 {
        self.state().read(address, slot, None)
    }

    /// Non-zero cells of `address`.
    pub fn dirty_cells(&self, address: Address) -> Vec<(B256, B256)> {
        self.state()
            .storage
            .get(&address)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|(_, value)| !value.is_zero())
                    .map(|(slot, value)| (*slot, *value))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn native_balance(&self, address: Address) -> U256 {
        self.state()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    pub fn storage_writes(&self) -> usize {
        self.state().storage_writes
    }

    pub fn calls(&self) -> usize {
        self.state().calls
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TestRpc for MockRpc {
    fn new(_rpc: &str) -> Result<Self> {
        Ok(MockRpc::default())
    }

    async fn create_access_list(
        &self,
        tx: &TransactionRequest,
        _block: BlockId,
    ) -> Result<AccessListResult> {
        let state = self.state();
        let (token, config, holder) = state.token_call(tx)?;
        let storage = config.storage_address(token);

        let mut items = Vec::new();
        if storage != token {
            items.push(AccessListItem {
                address: token,
                storage_keys: vec![IMPLEMENTATION_SLOT],
            });
        }

        let mut storage_keys: Vec<B256> = config.guard.into_iter().collect();
        storage_keys.push(config.balance_cell(holder));
        items.push(AccessListItem {
            address: storage,
            storage_keys,
        });

        Ok(AccessListResult {
            access_list: AccessList(items),
            gas_used: U256::from(29_000),
            error: None,
        })
    }

    async fn get_storage_at(&self, address: Address, slot: B256, _block: BlockId) -> Result<B256> {
        Ok(self.state().read(address, slot, None))
    }

    async fn set_storage_at(&self, address: Address, slot: B256, value: B256) -> Result<()> {
        let mut state = self.state();
        state.storage_writes += 1;
        if state.writes_dropped {
            return Ok(());
        }

        state
            .storage
            .entry(address)
            .or_default()
            .insert(slot, value);

        Ok(())
    }

    async fn call(
        &self,
        tx: &TransactionRequest,
        overrides: Option<StateOverride>,
        _block: BlockId,
    ) -> Result<Bytes> {
        let mut state = self.state();
        state.calls += 1;

        if overrides.is_some() && state.overrides_disabled {
            return Err(EvmError::OverridesUnsupported(
                "unknown field `stateOverrides`".to_string(),
            )
            .into());
        }

        let (token, config, holder) = state.token_call(tx)?;
        let storage = config.storage_address(token);

        if let Some(guard) = config.guard {
            if !state.read(storage, guard, overrides.as_ref()).is_zero() {
                return Err(EvmError::Revert("guard".to_string()).into());
            }
        }

        let balance = state.read(storage, config.balance_cell(holder), overrides.as_ref());

        Ok(Bytes::copy_from_slice(balance.as_slice()))
    }

    async fn set_balance(&self, address: Address, amount: U256) -> Result<()> {
        self.state().balances.insert(address, amount);
        Ok(())
    }
}
