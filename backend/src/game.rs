//! Game records and lifecycle types
//!
//! A [`Game`] is the server's authoritative view of one escrowed match. It is
//! born from on-chain creation events, advances when the join event lands,
//! and carries the live chess position while the match runs. The chain stays
//! the source of truth for funds; these records are rebuilt from chain
//! history on restart.

use chess_engine::{ChessState, PieceColor};
use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// Lifecycle of an escrowed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameState {
    Created,
    Waiting,
    Started,
    Settled,
}

impl GameState {
    /// States from which a join event may start the game
    pub fn joinable(self) -> bool {
        matches!(self, GameState::Created | GameState::Waiting)
    }
}

/// Chain family the escrow lives on; `Sol` is reserved and unused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkType {
    Evm,
    Sol,
}

/// On-chain provenance of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowInfo {
    pub contract_address: Address,
    pub creation_tx_hash: H256,
    pub creation_block: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_tx_hash: Option<H256>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    /// Creator of the escrow; plays White
    pub owner: Address,
    /// Second player; named at creation for invitations, set on join for
    /// open games. Plays Black.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent: Option<Address>,
    /// Stake each player locked, in wei
    #[serde(with = "wei_string")]
    pub wager: U256,
    pub network_type: NetworkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    pub state: GameState,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chess_state: Option<ChessState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PieceColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow: Option<EscrowInfo>,
}

impl Game {
    pub fn is_participant(&self, addr: Address) -> bool {
        self.owner == addr || self.opponent == Some(addr)
    }

    /// The color `addr` plays in this game: White for the owner, Black for
    /// the opponent
    pub fn color_of(&self, addr: Address) -> Option<PieceColor> {
        if self.owner == addr {
            Some(PieceColor::White)
        } else if self.opponent == Some(addr) {
            Some(PieceColor::Black)
        } else {
            None
        }
    }

    /// Payout address for the recorded winner, once settled by checkmate
    pub fn winner_address(&self) -> Option<Address> {
        match self.winner? {
            PieceColor::White => Some(self.owner),
            PieceColor::Black => self.opponent,
        }
    }

    /// Open games sit in the lobby with no named opponent
    pub fn is_open(&self) -> bool {
        self.state == GameState::Waiting && self.opponent.is_none()
    }
}

/// Counts per lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub created: usize,
    pub waiting: usize,
    pub started: usize,
    pub settled: usize,
    pub total: usize,
}

/// Wei amounts cross the wire as decimal strings; they routinely exceed 2^53
pub mod wei_string {
    use ethers::types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_dec_str(&raw).map_err(serde::de::Error::custom)
    }
}
