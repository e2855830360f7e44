//! Attack detection
//!
//! Answers "is this square attacked by that color" by scanning outward from
//! the target: knight jumps, king ring, slider rays with blocking, and pawn
//! capture squares. Used by the king-safety filter and by castling
//! generation, so it must not itself consult legality.

use crate::types::*;

use super::knight::KNIGHT_OFFSETS;
use super::sliding::{DIAGONAL, ORTHOGONAL};

/// True when any piece of `by` geometrically attacks `target`
pub fn square_attacked(state: &ChessState, target: Square, by: PieceColor) -> bool {
    pawn_attacks(state, target, by)
        || knight_attacks(state, target, by)
        || slider_attacks(state, target, by, &ORTHOGONAL, PieceType::Rook)
        || slider_attacks(state, target, by, &DIAGONAL, PieceType::Bishop)
        || king_attacks(state, target, by)
}

fn pawn_attacks(state: &ChessState, target: Square, by: PieceColor) -> bool {
    // A pawn attacks diagonally forward, so the attacker sits one rank
    // behind the target relative to its own direction of travel.
    let dr = -by.pawn_direction();
    [-1i8, 1].iter().any(|&dc| {
        target
            .offset(dr, dc)
            .and_then(|sq| state.piece_at(sq))
            .is_some_and(|p| p.color == by && p.piece_type == PieceType::Pawn)
    })
}

fn knight_attacks(state: &ChessState, target: Square, by: PieceColor) -> bool {
    KNIGHT_OFFSETS.iter().any(|&(dr, dc)| {
        target
            .offset(dr, dc)
            .and_then(|sq| state.piece_at(sq))
            .is_some_and(|p| p.color == by && p.piece_type == PieceType::Knight)
    })
}

fn king_attacks(state: &ChessState, target: Square, by: PieceColor) -> bool {
    for dr in -1i8..=1 {
        for dc in -1i8..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            if target
                .offset(dr, dc)
                .and_then(|sq| state.piece_at(sq))
                .is_some_and(|p| p.color == by && p.piece_type == PieceType::King)
            {
                return true;
            }
        }
    }
    false
}

/// Walk each ray until the first occupant; an enemy queen or `slider` there
/// attacks the target, anything else blocks the ray
fn slider_attacks(
    state: &ChessState,
    target: Square,
    by: PieceColor,
    dirs: &[(i8, i8)],
    slider: PieceType,
) -> bool {
    for &(dr, dc) in dirs {
        let mut current = target;
        while let Some(next) = current.offset(dr, dc) {
            match state.piece_at(next) {
                None => current = next,
                Some(occupant) => {
                    if occupant.color == by
                        && (occupant.piece_type == slider
                            || occupant.piece_type == PieceType::Queen)
                    {
                        return true;
                    }
                    break;
                }
            }
        }
    }
    false
}
