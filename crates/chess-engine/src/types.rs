//! Core types for the chess rule engine
//!
//! The board is an 8x8 array of optional pieces. Row 0 is Black's back rank,
//! row 7 is White's back rank, so White moves "up" the board (decreasing row).

use serde::{Deserialize, Serialize};

/// Side to move / piece ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
}

impl PieceColor {
    pub fn opposite(self) -> PieceColor {
        match self {
            PieceColor::White => PieceColor::Black,
            PieceColor::Black => PieceColor::White,
        }
    }

    /// Row delta for a pawn push of this color
    pub fn pawn_direction(self) -> i8 {
        match self {
            PieceColor::White => -1,
            PieceColor::Black => 1,
        }
    }

    /// Rank the pawns of this color start on
    pub fn pawn_start_row(self) -> u8 {
        match self {
            PieceColor::White => 6,
            PieceColor::Black => 1,
        }
    }

    /// Rank this color's king and rooks start on
    pub fn back_row(self) -> u8 {
        match self {
            PieceColor::White => 7,
            PieceColor::Black => 0,
        }
    }

    /// Rank a pawn of this color promotes on
    pub fn promotion_row(self) -> u8 {
        match self {
            PieceColor::White => 0,
            PieceColor::Black => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceType {
    #[serde(rename = "K")]
    King,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "R")]
    Rook,
    #[serde(rename = "B")]
    Bishop,
    #[serde(rename = "N")]
    Knight,
    #[serde(rename = "P")]
    Pawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "type")]
    pub piece_type: PieceType,
    pub color: PieceColor,
}

impl Piece {
    pub fn new(piece_type: PieceType, color: PieceColor) -> Piece {
        Piece { piece_type, color }
    }
}

/// Board coordinate, `row` and `col` both in `0..8`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    pub fn new(row: u8, col: u8) -> Square {
        Square { row, col }
    }

    /// Offset by a (row, col) delta, returning `None` off the board
    pub fn offset(self, dr: i8, dc: i8) -> Option<Square> {
        let row = self.row as i8 + dr;
        let col = self.col as i8 + dc;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square::new(row as u8, col as u8))
        } else {
            None
        }
    }
}

/// Castling availability for one side of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideCastling {
    pub king_side: bool,
    pub queen_side: bool,
}

impl SideCastling {
    pub fn all() -> SideCastling {
        SideCastling {
            king_side: true,
            queen_side: true,
        }
    }

    pub fn none() -> SideCastling {
        SideCastling {
            king_side: false,
            queen_side: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white: SideCastling,
    pub black: SideCastling,
}

impl CastlingRights {
    pub fn initial() -> CastlingRights {
        CastlingRights {
            white: SideCastling::all(),
            black: SideCastling::all(),
        }
    }

    pub fn for_color(&self, color: PieceColor) -> SideCastling {
        match color {
            PieceColor::White => self.white,
            PieceColor::Black => self.black,
        }
    }

    pub fn for_color_mut(&mut self, color: PieceColor) -> &mut SideCastling {
        match color {
            PieceColor::White => &mut self.white,
            PieceColor::Black => &mut self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Check,
    Checkmate,
    Stalemate,
    Draw,
}

impl GameStatus {
    /// Checkmate, stalemate and draw end the game
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GameStatus::Checkmate | GameStatus::Stalemate | GameStatus::Draw
        )
    }
}

/// One accepted move, as recorded in the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured: Option<Piece>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceType>,
    pub is_castle: bool,
    pub is_en_passant: bool,
}

/// Pieces each side has taken off the board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPieces {
    pub white: Vec<Piece>,
    pub black: Vec<Piece>,
}

impl CapturedPieces {
    pub fn record(&mut self, by: PieceColor, piece: Piece) {
        match by {
            PieceColor::White => self.white.push(piece),
            PieceColor::Black => self.black.push(piece),
        }
    }
}

/// Complete position plus the bookkeeping needed to continue the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChessState {
    pub board: [[Option<Piece>; 8]; 8],
    pub current_player: PieceColor,
    pub move_history: Vec<MoveRecord>,
    pub captured_pieces: CapturedPieces,
    pub game_status: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PieceColor>,
    pub castling_rights: CastlingRights,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en_passant_target: Option<Square>,
    pub half_move_clock: u32,
    pub full_move_number: u32,
}

impl ChessState {
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq.row as usize][sq.col as usize]
    }

    pub fn set_piece(&mut self, sq: Square, piece: Option<Piece>) {
        self.board[sq.row as usize][sq.col as usize] = piece;
    }

    pub fn is_empty(&self, sq: Square) -> bool {
        self.piece_at(sq).is_none()
    }

    /// Locate the king of `color`, if present
    pub fn king_square(&self, color: PieceColor) -> Option<Square> {
        for row in 0..8u8 {
            for col in 0..8u8 {
                let sq = Square::new(row, col);
                if let Some(piece) = self.piece_at(sq) {
                    if piece.piece_type == PieceType::King && piece.color == color {
                        return Some(sq);
                    }
                }
            }
        }
        None
    }

    /// All squares currently holding a piece of `color`
    pub fn squares_of(&self, color: PieceColor) -> Vec<Square> {
        let mut out = Vec::new();
        for row in 0..8u8 {
            for col in 0..8u8 {
                let sq = Square::new(row, col);
                if self.piece_at(sq).is_some_and(|p| p.color == color) {
                    out.push(sq);
                }
            }
        }
        out
    }
}
