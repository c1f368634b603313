use alloy::eips::BlockId;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::{state::StateOverride, TransactionRequest};
use alloy::sol;
use alloy::sol_types::SolCall;
use eyre::Result;

use dealer_common::constants::PROBE_GAS_LIMIT;
use dealer_common::errors::EvmError;

use crate::rpc::TestRpc;

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

pub fn balance_of_request(token: Address, holder: Address) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(holder)
        .with_to(token)
        .with_input(IERC20::balanceOfCall { account: holder }.abi_encode())
        .with_gas_limit(PROBE_GAS_LIMIT)
}

pub fn decode_balance(output: &Bytes) -> Result<U256, EvmError> {
    IERC20::balanceOfCall::abi_decode_returns(output).map_err(|err| EvmError::Decode(err.to_string()))
}

/// `token.balanceOf(holder)` at the latest block.
pub async fn balance_of<R: TestRpc>(
    rpc: &R,
    token: Address,
    holder: Address,
    overrides: Option<StateOverride>,
) -> Result<U256> {
    let tx = balance_of_request(token, holder);
    let output = rpc.call(&tx, overrides, BlockId::latest()).await?;

    Ok(decode_balance(&output)?)
}
