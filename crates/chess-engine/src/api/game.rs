//! Game setup

use crate::board::starting_board;
use crate::types::*;

/// Standard starting position: White to move, all castling rights intact,
/// clocks at zero, full-move counter at 1
pub fn initial_position() -> ChessState {
    ChessState {
        board: starting_board(),
        current_player: PieceColor::White,
        move_history: Vec::new(),
        captured_pieces: CapturedPieces::default(),
        game_status: GameStatus::Active,
        winner: None,
        castling_rights: CastlingRights::initial(),
        en_passant_target: None,
        half_move_clock: 0,
        full_move_number: 1,
    }
}
