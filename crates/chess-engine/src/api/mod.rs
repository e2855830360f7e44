//! Engine entry points: position setup, move queries, move execution

pub mod game;
pub mod moves;
pub mod state;

pub use game::initial_position;
pub use moves::{make_move, valid_moves, MoveOutcome};
pub use state::{has_any_legal_move, is_in_check};
