//! Escrow event poller
//!
//! Drives the lobby from on-chain facts. Every tick reads the chain head,
//! fetches `GameCreated` and `GameJoined` logs for the unseen block range,
//! and reconciles them into the lobby, creations before joins, since a
//! join can only follow its creation in block order. The cursor advances
//! only after the whole range processed cleanly; on any error the same
//! range is retried next tick, which the lobby's idempotent upserts make
//! safe.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::escrow::{EscrowGateway, EscrowLocation};
use crate::lobby::{GameCreation, GameJoin, Lobby};

/// Shared view of the poller for `/health`
#[derive(Default)]
pub struct PollerStatus {
    running: AtomicBool,
    last_processed_block: AtomicU64,
}

impl PollerStatus {
    pub fn snapshot(&self) -> PollerSnapshot {
        PollerSnapshot {
            running: self.running.load(Ordering::Relaxed),
            last_processed_block: self.last_processed_block.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerSnapshot {
    pub running: bool,
    pub last_processed_block: u64,
}

pub struct EventPoller {
    gateway: Arc<dyn EscrowGateway>,
    lobby: Arc<Lobby>,
    escrow: EscrowLocation,
    interval: Duration,
    status: Arc<PollerStatus>,
}

impl EventPoller {
    pub fn new(
        gateway: Arc<dyn EscrowGateway>,
        lobby: Arc<Lobby>,
        escrow: EscrowLocation,
        interval: Duration,
    ) -> EventPoller {
        EventPoller {
            gateway,
            lobby,
            escrow,
            interval,
            status: Arc::new(PollerStatus::default()),
        }
    }

    pub fn status(&self) -> Arc<PollerStatus> {
        self.status.clone()
    }

    /// Run until the task is aborted. Ticks never overlap: the next tick
    /// waits for the previous one to finish.
    pub async fn run(self) {
        let mut cursor = self.initial_cursor().await;
        self.status.running.store(true, Ordering::Relaxed);
        self.status
            .last_processed_block
            .store(cursor, Ordering::Relaxed);
        info!(
            chain_id = self.escrow.chain_id,
            contract = %self.escrow.address,
            from_block = cursor,
            "event poller started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = self.tick(&mut cursor).await {
                warn!(error = %err, last_block = cursor, "poll tick failed; range will retry");
            }
        }
    }

    /// Start from the current head: history before boot is not replayed
    async fn initial_cursor(&self) -> u64 {
        loop {
            match self.gateway.latest_block().await {
                Ok(block) => return block,
                Err(err) => {
                    warn!(error = %err, "could not read chain head; retrying");
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }

    /// One reconciliation pass; advances `cursor` only on full success
    pub(crate) async fn tick(&self, cursor: &mut u64) -> anyhow::Result<()> {
        let head = self.gateway.latest_block().await?;
        if head <= *cursor {
            return Ok(());
        }
        let from = *cursor + 1;
        debug!(from, to = head, "scanning escrow events");

        let created = self.gateway.created_in_range(from, head).await?;
        let joined = self.gateway.joined_in_range(from, head).await?;

        for evt in created {
            // The event omits the optional named opponent; read it back from
            // the contract, degrading to an open game if that fails.
            let opponent = match self.gateway.game_details(&evt.game_id).await {
                Ok(details) => details.and_then(|d| d.opponent),
                Err(err) => {
                    warn!(
                        game_id = %evt.game_id,
                        error = %err,
                        "getGame lookup failed; treating game as open"
                    );
                    None
                }
            };

            self.lobby.upsert_from_creation(GameCreation {
                game_id: evt.game_id,
                creator: evt.creator,
                opponent,
                wager: evt.wager,
                chain_id: self.escrow.chain_id,
                contract_address: self.escrow.address,
                tx_hash: evt.tx_hash,
                block_number: evt.block_number,
            });
        }

        for evt in joined {
            self.lobby.apply_join(GameJoin {
                game_id: evt.game_id,
                joiner: evt.joiner,
                wager: evt.wager,
            });
        }

        *cursor = head;
        self.status
            .last_processed_block
            .store(head, Ordering::Relaxed);
        Ok(())
    }
}
