//! Player state.
//!
//! This module contains:
//! - Token colours
//! - Jail status
//! - The Player struct with cash, position, estates and held cards

use crate::board::{Money, PlayerId, SpaceIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Token colour, one per seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Black,
    White,
}

impl PlayerColor {
    /// Get color for a player index
    pub fn for_player(id: PlayerId) -> Self {
        match id % 8 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Green,
            3 => PlayerColor::Yellow,
            4 => PlayerColor::Purple,
            5 => PlayerColor::Orange,
            6 => PlayerColor::Black,
            _ => PlayerColor::White,
        }
    }
}

/// Jail status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JailStatus {
    pub in_jail: bool,
    /// Consecutive turns spent in jail so far (0-3)
    pub turns: u8,
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Seat index (0-7)
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Token colour
    pub color: PlayerColor,
    /// Cash on hand
    pub balance: Money,
    /// Board position (0-39)
    pub position: SpaceIndex,
    /// Estates held, ordered by board index
    pub estates: BTreeSet<SpaceIndex>,
    pub jail: JailStatus,
    /// "Get out of jail free" cards held
    pub jail_cards: u8,
    /// Eliminated players take no further turns
    pub bankrupt: bool,
}

impl Player {
    /// Create a new player on Go
    pub fn new(id: PlayerId, name: String, starting_balance: Money) -> Self {
        Self {
            id,
            name,
            color: PlayerColor::for_player(id),
            balance: starting_balance,
            position: 0,
            estates: BTreeSet::new(),
            jail: JailStatus::default(),
            jail_cards: 0,
            bankrupt: false,
        }
    }

    /// Whether the player can pay an amount from cash
    pub fn can_afford(&self, amount: Money) -> bool {
        self.balance >= amount
    }

    /// Add (or, with a negative amount, remove) cash
    pub fn credit(&mut self, amount: Money) {
        self.balance += amount;
    }

    /// Remove cash. Callers check `can_afford` first.
    pub fn debit(&mut self, amount: Money) {
        debug_assert!(self.can_afford(amount), "balance would go negative");
        self.balance -= amount;
    }

    /// Send to jail at the given index
    pub fn imprison(&mut self, jail: SpaceIndex) {
        self.position = jail;
        self.jail = JailStatus {
            in_jail: true,
            turns: 0,
        };
    }

    /// Leave jail
    pub fn release(&mut self) {
        self.jail = JailStatus::default();
    }

    /// Whether the player is still in the game
    pub fn is_active(&self) -> bool {
        !self.bankrupt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_starts_on_go() {
        let player = Player::new(2, "Carol".to_string(), 1500);
        assert_eq!(player.balance, 1500);
        assert_eq!(player.position, 0);
        assert_eq!(player.color, PlayerColor::Green);
        assert!(player.estates.is_empty());
        assert!(!player.jail.in_jail);
        assert!(player.is_active());
    }

    #[test]
    fn test_colors_cycle_over_eight_seats() {
        assert_eq!(PlayerColor::for_player(7), PlayerColor::White);
        assert_eq!(PlayerColor::for_player(8), PlayerColor::Red);
    }

    #[test]
    fn test_imprison_and_release() {
        let mut player = Player::new(0, "Alice".to_string(), 1500);
        player.position = 30;
        player.jail.turns = 2;
        player.imprison(10);
        assert_eq!(player.position, 10);
        assert_eq!(player.jail, JailStatus { in_jail: true, turns: 0 });

        player.release();
        assert_eq!(player.jail, JailStatus::default());
        assert_eq!(player.position, 10);
    }

    #[test]
    fn test_estates_stay_in_board_order() {
        let mut player = Player::new(0, "Alice".to_string(), 1500);
        for i in [39, 5, 12, 1] {
            player.estates.insert(i);
        }
        assert_eq!(player.estates.iter().copied().collect::<Vec<_>>(), vec![1, 5, 12, 39]);
    }

    #[test]
    fn test_credit_and_debit() {
        let mut player = Player::new(0, "Alice".to_string(), 100);
        assert!(player.can_afford(100));
        assert!(!player.can_afford(101));
        player.debit(40);
        player.credit(15);
        assert_eq!(player.balance, 75);
    }
}
