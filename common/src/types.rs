use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::constants::NATIVE_TOKEN;

/// Compiler convention for turning a mapping key into a storage cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageLayout {
    /// `keccak256(key ++ slot)`
    Solidity,
    /// `keccak256(slot ++ key)`
    Vyper,
}

/// A guess at where a token keeps its `balanceOf` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotCandidate {
    #[serde(rename = "type")]
    pub layout: StorageLayout,
    pub slot: u64,
}

impl SlotCandidate {
    pub fn new(layout: StorageLayout, slot: u64) -> Self {
        Self { layout, slot }
    }

    /// Storage cell holding `holder`'s entry if the mapping lives at this candidate.
    pub fn cell(&self, holder: Address) -> B256 {
        let index = U256::from(self.slot);
        let preimage = match self.layout {
            StorageLayout::Solidity => (holder, index).abi_encode(),
            StorageLayout::Vyper => (index, holder).abi_encode(),
        };

        keccak256(preimage)
    }
}

impl std::fmt::Display for SlotCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.layout, self.slot)
    }
}

/// Parameters of a single `deal` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealRequest {
    /// Token to deal. `None` or the native sentinel sets the native balance.
    pub token: Option<Address>,
    pub recipient: Address,
    pub amount: U256,
    /// Mapping slot index the layout search starts from.
    pub slot: Option<u64>,
    /// Restricts the brute-force search to one layout.
    pub storage_type: Option<StorageLayout>,
    /// Inclusive upper bound of the brute-force search.
    pub max_slot: Option<u64>,
}

impl DealRequest {
    pub fn new(token: Option<Address>, recipient: Address, amount: U256) -> Self {
        Self {
            token,
            recipient,
            amount,
            slot: None,
            storage_type: None,
            max_slot: None,
        }
    }

    pub fn erc20(token: Address, recipient: Address, amount: U256) -> Self {
        Self::new(Some(token), recipient, amount)
    }

    pub fn native(recipient: Address, amount: U256) -> Self {
        Self::new(None, recipient, amount)
    }

    pub fn slot(mut self, slot: u64) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn storage_type(mut self, storage_type: StorageLayout) -> Self {
        self.storage_type = Some(storage_type);
        self
    }

    pub fn max_slot(mut self, max_slot: u64) -> Self {
        self.max_slot = Some(max_slot);
        self
    }

    /// Restricts the search to exactly one candidate.
    ///
    /// Share-based tokens (rebasing liquid staking tokens in particular) can
    /// report the requested balance after a write to a cell that is not their
    /// balance mapping, silently corrupting their accounting. Pinning the known
    /// slot avoids the search for those tokens.
    pub fn pinned(self, layout: StorageLayout, slot: u64) -> Self {
        self.slot(slot).storage_type(layout).max_slot(slot)
    }

    /// Whether the caller narrowed the layout search with a start slot or layout.
    pub fn has_layout_hint(&self) -> bool {
        self.slot.is_some() || self.storage_type.is_some()
    }

    /// Whether exactly one `(layout, slot)` candidate may be probed.
    pub fn is_pinned(&self) -> bool {
        self.storage_type.is_some() && self.slot.is_some() && self.max_slot == self.slot
    }

    /// The ERC-20 token to search, or `None` when the native balance is meant.
    pub fn erc20_token(&self) -> Option<Address> {
        self.token
            .filter(|token| *token != NATIVE_TOKEN && !token.is_zero())
    }
}

/// Where a resolver left the forged balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlot {
    /// Contract whose storage was written. Differs from the token for proxies
    /// that keep balances in a separate storage contract.
    pub address: Address,
    pub slot: B256,
    /// Set when the cell was derived from a layout guess.
    pub candidate: Option<SlotCandidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealOutcome {
    /// The native balance was set directly.
    Native,
    /// `balanceOf` already reported the requested amount, nothing was written.
    Unchanged,
    Storage(ResolvedSlot),
}
