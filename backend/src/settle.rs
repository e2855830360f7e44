//! Settlement of finished games
//!
//! Checkmate hands the pot to the winner via the escrow's `settleGame`.
//! Requests flow through an unbounded channel into a background worker, so
//! the winning move's HTTP response never waits on the chain. Failures are
//! retried a few times with backoff and then abandoned with an error log;
//! the contract stays the source of truth for funds either way.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, H256};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::chain::BlockchainClient;
use crate::lobby::Lobby;

const MAX_ATTEMPTS: u32 = 3;

/// Payout order produced by the lobby when a game ends in checkmate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequest {
    pub game_id: String,
    pub winner: Address,
    pub chain_id: u64,
}

/// The single chain action the settler performs, behind a seam so tests can
/// observe settlement without a chain
#[async_trait]
pub trait SettlementExecutor: Send + Sync {
    async fn settle(&self, request: &SettlementRequest) -> anyhow::Result<H256>;
}

/// Production executor: signed `settleGame` call through the chain client
pub struct EscrowSettlementExecutor {
    chain: Arc<BlockchainClient>,
    escrow_address: Address,
}

impl EscrowSettlementExecutor {
    pub fn new(chain: Arc<BlockchainClient>, escrow_address: Address) -> EscrowSettlementExecutor {
        EscrowSettlementExecutor {
            chain,
            escrow_address,
        }
    }
}

#[async_trait]
impl SettlementExecutor for EscrowSettlementExecutor {
    async fn settle(&self, request: &SettlementRequest) -> anyhow::Result<H256> {
        let receipt = self
            .chain
            .settle_game(
                request.chain_id,
                self.escrow_address,
                &request.game_id,
                request.winner,
            )
            .await?;
        Ok(receipt.transaction_hash)
    }
}

/// Handle used to enqueue settlements; cheap to clone
#[derive(Clone)]
pub struct Settler {
    tx: mpsc::UnboundedSender<SettlementRequest>,
}

impl Settler {
    /// Spawn the worker task and return the submission handle
    pub fn spawn(executor: Arc<dyn SettlementExecutor>, lobby: Arc<Lobby>) -> Settler {
        let (tx, mut rx) = mpsc::unbounded_channel::<SettlementRequest>();

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                process(executor.as_ref(), &lobby, request).await;
            }
        });

        Settler { tx }
    }

    /// Fire-and-forget from the caller's perspective
    pub fn submit(&self, request: SettlementRequest) {
        if self.tx.send(request).is_err() {
            error!("settlement worker is gone; request dropped");
        }
    }
}

async fn process(executor: &dyn SettlementExecutor, lobby: &Lobby, request: SettlementRequest) {
    for attempt in 1..=MAX_ATTEMPTS {
        match executor.settle(&request).await {
            Ok(tx_hash) => {
                info!(
                    game_id = %request.game_id,
                    winner = %request.winner,
                    tx_hash = %format!("{tx_hash:#x}"),
                    "settlement confirmed"
                );
                lobby.record_settlement_tx(&request.game_id, tx_hash);
                return;
            }
            Err(err) => {
                warn!(
                    game_id = %request.game_id,
                    attempt,
                    error = %err,
                    "settlement attempt failed"
                );
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(Duration::from_secs(1u64 << attempt)).await;
                }
            }
        }
    }

    error!(
        game_id = %request.game_id,
        winner = %request.winner,
        "settlement abandoned after {MAX_ATTEMPTS} attempts; winner can withdraw via the contract"
    );
}
