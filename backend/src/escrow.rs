//! Escrow contract binding
//!
//! The contract is an external fixed interface; only the events and the two
//! functions the server consumes are bound here. Event access goes through
//! the [`EscrowGateway`] trait so the poller can be driven without a chain
//! in tests.

use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, H256, U256};
use std::sync::Arc;

abigen!(
    ChessEscrow,
    r#"[
        struct GameView { string gameId; address creator; address opponent; uint256 wagerAmount; bool settled; address winner }
        event GameCreated(string gameId, bytes32 indexed gameIdHash, address indexed creator, uint256 wagerAmount)
        event GameJoined(string gameId, bytes32 indexed gameIdHash, address indexed joiner, uint256 wagerAmount)
        event GameSettled(bytes32 indexed gameIdHash, address indexed winner, uint256 totalWinnings)
        function getGame(string memory gameId) external view returns (GameView memory)
        function settleGame(string memory gameId, address winner) external
    ]"#
);

/// Where the deployed escrow lives
#[derive(Debug, Clone, Copy)]
pub struct EscrowLocation {
    pub address: Address,
    pub chain_id: u64,
}

/// A `GameCreated` log with its chain coordinates
#[derive(Debug, Clone)]
pub struct CreatedEvent {
    pub game_id: String,
    pub creator: Address,
    pub wager: U256,
    pub block_number: u64,
    pub tx_hash: H256,
}

/// A `GameJoined` log
#[derive(Debug, Clone)]
pub struct JoinedEvent {
    pub game_id: String,
    pub joiner: Address,
    pub wager: U256,
    pub block_number: u64,
}

/// Contract-side details of a game; the creation event does not carry the
/// optional named opponent, so it is read back via `getGame`
#[derive(Debug, Clone, Default)]
pub struct GameDetails {
    pub opponent: Option<Address>,
}

/// Read access to the escrow, as the poller needs it
#[async_trait]
pub trait EscrowGateway: Send + Sync {
    async fn latest_block(&self) -> anyhow::Result<u64>;

    /// `GameCreated` logs in the inclusive block range
    async fn created_in_range(&self, from: u64, to: u64) -> anyhow::Result<Vec<CreatedEvent>>;

    /// `GameJoined` logs in the inclusive block range
    async fn joined_in_range(&self, from: u64, to: u64) -> anyhow::Result<Vec<JoinedEvent>>;

    /// Contract state for one game, `None` when the contract does not know it
    async fn game_details(&self, game_id: &str) -> anyhow::Result<Option<GameDetails>>;
}

/// Live gateway over an RPC provider
pub struct EthersEscrowGateway {
    provider: Arc<Provider<Http>>,
    contract: ChessEscrow<Provider<Http>>,
}

impl EthersEscrowGateway {
    pub fn new(provider: Arc<Provider<Http>>, address: Address) -> EthersEscrowGateway {
        let contract = ChessEscrow::new(address, provider.clone());
        EthersEscrowGateway { provider, contract }
    }
}

#[async_trait]
impl EscrowGateway for EthersEscrowGateway {
    async fn latest_block(&self) -> anyhow::Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    async fn created_in_range(&self, from: u64, to: u64) -> anyhow::Result<Vec<CreatedEvent>> {
        let logs = self
            .contract
            .event::<GameCreatedFilter>()
            .from_block(from)
            .to_block(to)
            .query_with_meta()
            .await?;

        Ok(logs
            .into_iter()
            .map(|(evt, meta)| CreatedEvent {
                game_id: evt.game_id,
                creator: evt.creator,
                wager: evt.wager_amount,
                block_number: meta.block_number.as_u64(),
                tx_hash: meta.transaction_hash,
            })
            .collect())
    }

    async fn joined_in_range(&self, from: u64, to: u64) -> anyhow::Result<Vec<JoinedEvent>> {
        let logs = self
            .contract
            .event::<GameJoinedFilter>()
            .from_block(from)
            .to_block(to)
            .query_with_meta()
            .await?;

        Ok(logs
            .into_iter()
            .map(|(evt, meta)| JoinedEvent {
                game_id: evt.game_id,
                joiner: evt.joiner,
                wager: evt.wager_amount,
                block_number: meta.block_number.as_u64(),
            })
            .collect())
    }

    async fn game_details(&self, game_id: &str) -> anyhow::Result<Option<GameDetails>> {
        let view = self.contract.get_game(game_id.to_string()).call().await?;

        if view.0.is_empty() {
            return Ok(None);
        }
        Ok(Some(GameDetails {
            // The contract stores the zero address for open games
            opponent: (view.2 != Address::zero()).then_some(view.2),
        }))
    }
}
