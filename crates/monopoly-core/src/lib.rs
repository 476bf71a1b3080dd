//! Monopoly - a property-trading board game engine
//!
//! This crate provides the economy and turn logic for 2-8 players,
//! including:
//! - The standard 40-space board with colour groups, stations and utilities
//! - Ownership, rent, building and mortgage rules
//! - Chance and Community Chest decks
//! - A turn state machine with jail, debts, bankruptcy and trading
//!
//! # Architecture
//!
//! The engine has no I/O. A host sends [`GameAction`]s to a [`Game`] and
//! renders the [`GameEvent`]s that come back, or their narrated text. It
//! can be compiled to:
//! - Native Rust for a terminal or server host
//! - WebAssembly for a browser front end
//!
//! # Modules
//!
//! - [`board`]: Static board, space kinds and distance queries
//! - [`rules`]: Economic constants and house rules
//! - [`estate`]: Ownership ledger, rent and building rules
//! - [`player`]: Player state
//! - [`cards`]: Card decks
//! - [`dice`]: Random and scripted dice
//! - [`game`]: Game state machine
//! - [`trade`]: Cash-for-estate trading

pub mod actions;
pub mod board;
pub mod cards;
pub mod dice;
pub mod estate;
pub mod game;
pub mod player;
pub mod rules;
pub mod trade;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, JailRelease, TradeOffer};
pub use board::{
    Board, BoardError, ColorGroup, Corner, Money, PlayerId, Space, SpaceCategory, SpaceIndex,
    SpaceKind, BOARD_SIZE,
};
pub use cards::{Card, Deck, DeckKind, MoveDirective, Payment, RepairFees};
pub use dice::{Dice, DiceRoll, LoadedDice, RandomDice};
pub use estate::{Buildings, Estate, Estates, MortgageAdvice, MAX_HOUSES};
pub use game::{Creditor, Debt, Game, GameError, GamePhase, GameState, RollOutcome, SetupError};
pub use player::{JailStatus, Player, PlayerColor};
pub use rules::Rules;
pub use trade::TradeState;
