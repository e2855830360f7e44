//! Wagered-chess coordination server
//!
//! Players lock funds in an on-chain escrow; this server observes those
//! escrow events, materializes game records in memory, adjudicates moves
//! with the chess engine, and on checkmate signs and submits the settlement
//! transaction that releases the pot to the winner.

pub mod api;
pub mod auth;
pub mod chain;
pub mod config;
pub mod error;
pub mod escrow;
pub mod game;
pub mod lobby;
pub mod poller;
pub mod settle;
