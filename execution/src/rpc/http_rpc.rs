use alloy::eips::{eip2930::AccessListResult, BlockId};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::ClientBuilder;
use alloy::rpc::types::{state::StateOverride, TransactionRequest};
use alloy::transports::layers::RetryBackoffLayer;
use alloy::transports::RpcError as TransportError;
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::trace;

use dealer_common::errors::{EvmError, RpcError};
use dealer_common::utils::{u256_to_word, word_to_u256};

use super::TestRpc;

/// [`TestRpc`] over JSON-RPC against an anvil-compatible node.
#[derive(Clone)]
pub struct HttpRpc {
    url: String,
    provider: RootProvider,
}

impl HttpRpc {
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TestRpc for HttpRpc {
    fn new(rpc: &str) -> Result<Self> {
        let url = rpc
            .parse()
            .map_err(|err| eyre!("invalid rpc url {rpc}: {err}"))?;

        let client = ClientBuilder::default()
            .layer(RetryBackoffLayer::new(100, 50, 300))
            .http(url);

        Ok(HttpRpc {
            url: rpc.to_string(),
            provider: RootProvider::new(client),
        })
    }

    async fn create_access_list(
        &self,
        tx: &TransactionRequest,
        block: BlockId,
    ) -> Result<AccessListResult> {
        let list = self
            .provider
            .create_access_list(tx)
            .block_id(block)
            .await
            .map_err(|e| RpcError::new("create_access_list", e))?;

        Ok(list)
    }

    async fn get_storage_at(&self, address: Address, slot: B256, block: BlockId) -> Result<B256> {
        let value = self
            .provider
            .get_storage_at(address, word_to_u256(slot))
            .block_id(block)
            .await
            .map_err(|e| RpcError::new("get_storage_at", e))?;

        Ok(u256_to_word(value))
    }

    async fn set_storage_at(&self, address: Address, slot: B256, value: B256) -> Result<()> {
        trace!(target: "dealer::rpc", %address, %slot, %value, "anvil_setStorageAt");

        let ok: bool = self
            .provider
            .raw_request("anvil_setStorageAt".into(), (address, slot, value))
            .await
            .map_err(|e| RpcError::new("set_storage_at", e))?;

        if !ok {
            eyre::bail!("node rejected storage write at {address}, slot {slot}");
        }

        Ok(())
    }

    async fn call(
        &self,
        tx: &TransactionRequest,
        overrides: Option<StateOverride>,
        block: BlockId,
    ) -> Result<Bytes> {
        let with_overrides = overrides.is_some();
        let mut call = self.provider.call(tx.clone()).block(block);
        if let Some(overrides) = overrides {
            call = call.overrides(overrides);
        }

        match call.await {
            Ok(output) => Ok(output),
            Err(TransportError::ErrorResp(payload)) => {
                Err(call_error(payload.code, &payload.message, with_overrides).into())
            }
            Err(err) => Err(RpcError::new("call", err).into()),
        }
    }

    async fn set_balance(&self, address: Address, amount: U256) -> Result<()> {
        let _: () = self
            .provider
            .raw_request("anvil_setBalance".into(), (address, amount))
            .await
            .map_err(|e| RpcError::new("set_balance", e))?;

        Ok(())
    }
}

/// Nodes without `eth_call` overrides reject the extra parameter before
/// executing anything, as method-not-found or invalid-params.
fn call_error(code: i64, message: &str, with_overrides: bool) -> EvmError {
    match code {
        -32601 | -32602 if with_overrides => EvmError::OverridesUnsupported(message.to_string()),
        _ => EvmError::Revert(message.to_string()),
    }
}

impl std::fmt::Debug for HttpRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRpc").field("url", &self.url).finish()
    }
}
