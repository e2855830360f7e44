//! Board setup

use crate::types::*;

/// Standard starting arrangement, White on rows 6-7, Black on rows 0-1
pub fn starting_board() -> [[Option<Piece>; 8]; 8] {
    use PieceColor::*;
    use PieceType::*;

    let mut board: [[Option<Piece>; 8]; 8] = Default::default();

    let back = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];
    for (col, &piece_type) in back.iter().enumerate() {
        board[0][col] = Some(Piece::new(piece_type, Black));
        board[7][col] = Some(Piece::new(piece_type, White));
    }
    for col in 0..8 {
        board[1][col] = Some(Piece::new(Pawn, Black));
        board[6][col] = Some(Piece::new(Pawn, White));
    }

    board
}
