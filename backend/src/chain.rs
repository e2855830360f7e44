//! Chain-aware RPC facade
//!
//! One lazily-built provider per configured chain, plus the HD signer the
//! escrow contract recognizes as its settler. Every outbound call goes
//! through a shared HTTP client with a 30-second deadline; the lobby mutex
//! is never held while any of this runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider, ProviderError};
use ethers::signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer, WalletError};
use ethers::types::{Address, BlockNumber, Bytes, TransactionReceipt, H256, U256};
use thiserror::Error;
use tracing::{info, warn};

use crate::escrow::ChessEscrow;

/// Deadline applied to each outbound RPC request
const RPC_DEADLINE: Duration = Duration::from_secs(30);

/// How long a settlement receipt may take to appear
const RECEIPT_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("no RPC endpoint configured for chain {0}")]
    UnsupportedChain(u64),

    #[error("settler wallet derivation failed: {0}")]
    Wallet(#[from] WalletError),

    #[error("invalid RPC endpoint for chain {chain_id}: {message}")]
    InvalidEndpoint { chain_id: u64, message: String },

    #[error(transparent)]
    Rpc(#[from] ProviderError),

    #[error("contract call failed: {0}")]
    Contract(String),

    #[error("transaction {0:?} dropped without a receipt")]
    ReceiptMissing(H256),

    #[error("timed out waiting for receipt of {0:?}")]
    ReceiptTimeout(H256),
}

pub struct BlockchainClient {
    rpc_urls: HashMap<u64, String>,
    providers: Mutex<HashMap<u64, Arc<Provider<Http>>>>,
    wallet: LocalWallet,
}

impl BlockchainClient {
    /// Derive the settler wallet from the mnemonic and remember the chain
    /// endpoints. No connection is made until a chain is first used.
    pub fn new(mnemonic: &str, rpc_urls: HashMap<u64, String>) -> Result<BlockchainClient, ChainError> {
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(mnemonic)
            .build()?;
        info!(signer = %wallet.address(), "settlement signer derived");

        Ok(BlockchainClient {
            rpc_urls,
            providers: Mutex::new(HashMap::new()),
            wallet,
        })
    }

    /// Address of the HD-derived settler key
    pub fn signer_address(&self) -> Address {
        self.wallet.address()
    }

    /// Chain ids this client can reach
    pub fn configured_chains(&self) -> Vec<u64> {
        self.rpc_urls.keys().copied().collect()
    }

    /// Provider for `chain_id`, built on first use and cached
    pub fn provider(&self, chain_id: u64) -> Result<Arc<Provider<Http>>, ChainError> {
        let url = self
            .rpc_urls
            .get(&chain_id)
            .ok_or(ChainError::UnsupportedChain(chain_id))?;

        let mut cache = self.providers.lock().expect("provider cache poisoned");
        if let Some(provider) = cache.get(&chain_id) {
            return Ok(provider.clone());
        }

        let parsed: reqwest::Url = url.parse().map_err(|e| ChainError::InvalidEndpoint {
            chain_id,
            message: format!("{e}"),
        })?;
        let http = reqwest::Client::builder()
            .timeout(RPC_DEADLINE)
            .build()
            .map_err(|e| ChainError::InvalidEndpoint {
                chain_id,
                message: e.to_string(),
            })?;
        let provider = Arc::new(Provider::new(Http::new_with_client(parsed, http)));
        cache.insert(chain_id, provider.clone());
        Ok(provider)
    }

    pub async fn get_balance(&self, addr: Address, chain_id: u64) -> Result<U256, ChainError> {
        Ok(self.provider(chain_id)?.get_balance(addr, None).await?)
    }

    /// Next nonce including pending transactions
    pub async fn get_pending_nonce(&self, addr: Address, chain_id: u64) -> Result<U256, ChainError> {
        Ok(self
            .provider(chain_id)?
            .get_transaction_count(addr, Some(BlockNumber::Pending.into()))
            .await?)
    }

    /// Submit an already-signed transaction, returning its hash
    pub async fn broadcast_signed(&self, raw_tx: Bytes, chain_id: u64) -> Result<H256, ChainError> {
        let provider = self.provider(chain_id)?;
        let pending = provider.send_raw_transaction(raw_tx).await?;
        Ok(*pending)
    }

    /// Poll until the transaction is mined
    pub async fn wait_for_receipt(
        &self,
        tx_hash: H256,
        chain_id: u64,
    ) -> Result<TransactionReceipt, ChainError> {
        let provider = self.provider(chain_id)?;
        let pending = PendingTransaction::new(tx_hash, provider.as_ref());

        match tokio::time::timeout(RECEIPT_DEADLINE, pending).await {
            Ok(receipt) => receipt?.ok_or(ChainError::ReceiptMissing(tx_hash)),
            Err(_) => Err(ChainError::ReceiptTimeout(tx_hash)),
        }
    }

    /// Build, sign and submit `settleGame(gameId, winner)` on the escrow and
    /// wait for the receipt
    pub async fn settle_game(
        &self,
        chain_id: u64,
        escrow_address: Address,
        game_id: &str,
        winner: Address,
    ) -> Result<TransactionReceipt, ChainError> {
        let provider = self.provider(chain_id)?;
        let signer = self.wallet.clone().with_chain_id(chain_id);
        let client = Arc::new(SignerMiddleware::new((*provider).clone(), signer));
        let contract = ChessEscrow::new(escrow_address, client);

        let call = contract.settle_game(game_id.to_string(), winner);
        let pending = call
            .send()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        let tx_hash = *pending;

        let receipt = match tokio::time::timeout(RECEIPT_DEADLINE, pending).await {
            Ok(mined) => mined?.ok_or(ChainError::ReceiptMissing(tx_hash))?,
            Err(_) => return Err(ChainError::ReceiptTimeout(tx_hash)),
        };
        Ok(receipt)
    }

    /// Probe every configured chain with a head query
    pub async fn validate_connectivity(&self) -> HashMap<u64, bool> {
        let mut results = HashMap::new();
        for chain_id in self.configured_chains() {
            let reachable = match self.provider(chain_id) {
                Ok(provider) => provider.get_block_number().await.is_ok(),
                Err(_) => false,
            };
            if !reachable {
                warn!(chain_id, "RPC endpoint unreachable");
            }
            results.insert(chain_id, reachable);
        }
        results
    }
}
