//! Economic constants and house-rule switches.
//!
//! Everything here has a standard default; a host can override any subset
//! by loading a JSON document (missing fields fall back to the defaults).

use crate::board::Money;
use serde::{Deserialize, Serialize};

/// Rules for a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Cash each player starts with
    pub starting_balance: Money,
    /// Paid every time a player passes or lands on Go
    pub go_bonus: Money,
    /// Rent per station held by the owner
    pub station_rent: Money,
    /// Dice multiplier when the owner holds one utility
    pub utility_single_multiplier: Money,
    /// Dice multiplier when the owner holds both utilities
    pub utility_pair_multiplier: Money,
    /// Roll assumed when estimating utility rent outside a roll
    pub average_roll: u8,
    /// Rent multiplier for a hotel (houses multiply by their count)
    pub hotel_multiplier: Money,
    /// Fee to leave jail before rolling
    pub jail_fine: Money,
    /// Jailed turns after which a player is released unconditionally
    pub max_jail_turns: u8,
    /// Rolling a double releases a jailed player immediately
    pub doubles_release_from_jail: bool,
    /// Fewest players a game can start with
    pub min_players: usize,
    /// Most players a game can start with
    pub max_players: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            starting_balance: 1500,
            go_bonus: 200,
            station_rent: 25,
            utility_single_multiplier: 4,
            utility_pair_multiplier: 10,
            average_roll: 7,
            hotel_multiplier: 5,
            jail_fine: 50,
            max_jail_turns: 3,
            doubles_release_from_jail: true,
            min_players: 2,
            max_players: 8,
        }
    }
}

impl Rules {
    /// Parse rules from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let rules = Rules::from_json(r#"{ "starting_balance": 2000, "jail_fine": 100 }"#)
            .expect("valid rules");
        assert_eq!(rules.starting_balance, 2000);
        assert_eq!(rules.jail_fine, 100);
        assert_eq!(rules.go_bonus, 200);
        assert!(rules.doubles_release_from_jail);
    }

    #[test]
    fn test_rules_json_round_trip() {
        let rules = Rules {
            doubles_release_from_jail: false,
            ..Rules::default()
        };
        let json = serde_json::to_string(&rules).expect("serialize");
        assert_eq!(Rules::from_json(&json).expect("parse"), rules);
    }
}
