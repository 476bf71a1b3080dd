//! Chance and Community Chest cards.
//!
//! This module contains:
//! - Card values and their movement directives
//! - Decks with a draw pile and a discard pile
//! - The two standard decks

use crate::board::{Board, BoardError, Money, SpaceCategory, SpaceIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Which deck a card belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckKind {
    Chance,
    CommunityChest,
}

/// Where a card sends the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirective {
    /// Advance to a board index
    Absolute(SpaceIndex),
    /// Advance to a uniquely-named space
    Named(String),
    /// Advance to the next space of a category
    NearestOf(SpaceCategory),
    /// Move by a number of steps; negative moves backwards and never pays Go
    RelativeSteps(i8),
    /// Go directly to jail
    ToJail,
}

/// Who is on the other side of a card's money
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payment {
    /// The bank
    #[default]
    Bank,
    /// Every other player still in the game, `amount` each
    EachOpponent,
}

/// Per-building assessment ("pay $40 per house, $115 per hotel")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairFees {
    pub per_house: Money,
    pub per_hotel: Money,
}

/// A single card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub description: String,
    /// Received when positive, paid when negative
    pub amount: Money,
    pub payment: Payment,
    pub movement: Option<MoveDirective>,
    /// Kept by the player until used
    pub grants_jail_release: bool,
    pub repairs: Option<RepairFees>,
}

impl Card {
    fn plain(description: &str) -> Self {
        Self {
            description: description.to_string(),
            amount: 0,
            payment: Payment::Bank,
            movement: None,
            grants_jail_release: false,
            repairs: None,
        }
    }

    /// Money from (or to) the bank
    pub fn bank(description: &str, amount: Money) -> Self {
        Self {
            amount,
            ..Self::plain(description)
        }
    }

    /// Money from (or to) each other player
    pub fn each_opponent(description: &str, amount: Money) -> Self {
        Self {
            amount,
            payment: Payment::EachOpponent,
            ..Self::plain(description)
        }
    }

    /// Movement card
    pub fn move_to(description: &str, directive: MoveDirective) -> Self {
        Self {
            movement: Some(directive),
            ..Self::plain(description)
        }
    }

    /// "Get out of jail free"
    pub fn jail_release(description: &str) -> Self {
        Self {
            grants_jail_release: true,
            ..Self::plain(description)
        }
    }

    /// Building repair assessment
    pub fn repairs(description: &str, per_house: Money, per_hotel: Money) -> Self {
        Self {
            repairs: Some(RepairFees {
                per_house,
                per_hotel,
            }),
            ..Self::plain(description)
        }
    }
}

/// A deck: draw pile on top of a discard pile.
///
/// Drawn cards go to the discard pile, except jail-release cards kept by a
/// player, which leave circulation. The discard pile is shuffled back in
/// only when the draw pile runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub kind: DeckKind,
    draw_pile: VecDeque<Card>,
    discard_pile: Vec<Card>,
}

impl Deck {
    /// Create a deck and shuffle it once
    pub fn new<R: Rng>(kind: DeckKind, mut cards: Vec<Card>, rng: &mut R) -> Self {
        cards.shuffle(rng);
        Self {
            kind,
            draw_pile: cards.into(),
            discard_pile: Vec::new(),
        }
    }

    /// Create a deck in the given order, without shuffling
    pub fn stacked(kind: DeckKind, cards: Vec<Card>) -> Self {
        Self {
            kind,
            draw_pile: cards.into(),
            discard_pile: Vec::new(),
        }
    }

    /// The standard Chance deck, shuffled
    pub fn chance<R: Rng>(rng: &mut R) -> Self {
        Self::new(DeckKind::Chance, chance_cards(), rng)
    }

    /// The standard Community Chest deck, shuffled
    pub fn community_chest<R: Rng>(rng: &mut R) -> Self {
        Self::new(DeckKind::CommunityChest, community_chest_cards(), rng)
    }

    /// Take the top card, reshuffling the discard pile in if needed
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<Card> {
        if self.draw_pile.is_empty() {
            let mut recycled = std::mem::take(&mut self.discard_pile);
            recycled.shuffle(rng);
            self.draw_pile = recycled.into();
        }
        self.draw_pile.pop_front()
    }

    /// Put a resolved card on the discard pile
    pub fn discard(&mut self, card: Card) {
        self.discard_pile.push(card);
    }

    /// Cards left to draw before a reshuffle
    pub fn len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draw_pile.is_empty()
    }

    /// Cards waiting on the discard pile
    pub fn discarded(&self) -> usize {
        self.discard_pile.len()
    }

    /// Top card, without drawing it
    pub fn peek(&self) -> Option<&Card> {
        self.draw_pile.front()
    }

    /// Check every named destination exists on the board
    pub fn validate(&self, board: &Board) -> Result<(), BoardError> {
        for card in self.draw_pile.iter().chain(self.discard_pile.iter()) {
            if let Some(MoveDirective::Named(name)) = &card.movement {
                board.index_of(name)?;
            }
        }
        Ok(())
    }
}

/// The 16 standard Chance cards
pub fn chance_cards() -> Vec<Card> {
    use MoveDirective::*;

    vec![
        Card::move_to("Advance to Go. Collect $200", Absolute(0)),
        Card::move_to(
            "Advance to Pentonville Road. If you pass Go, collect $200",
            Named("Pentonville Road".into()),
        ),
        Card::move_to(
            "Advance to Bond Street. If you pass Go, collect $200",
            Named("Bond Street".into()),
        ),
        Card::move_to(
            "Advance token to nearest Utility. If unowned, you may buy it from the Bank",
            NearestOf(SpaceCategory::Utility),
        ),
        Card::move_to(
            "Advance token to the nearest Station. If unowned, you may buy it from the Bank",
            NearestOf(SpaceCategory::Station),
        ),
        Card::bank("Bank pays you dividend of $50", 50),
        Card::jail_release("Get out of Jail Free"),
        Card::move_to("Go Back 3 Spaces", RelativeSteps(-3)),
        Card::move_to("Go to Jail. Do not pass Go, do not collect $200", ToJail),
        Card::repairs(
            "Make general repairs on all your property: For each house pay $25, For each hotel $100",
            25,
            100,
        ),
        Card::bank("Pay poor tax of $15", -15),
        Card::move_to(
            "Take a trip to Kings Cross Station. If you pass Go, collect $200",
            Named("Kings Cross Station".into()),
        ),
        Card::move_to(
            "Take a walk on Vine Street. Advance token to Vine Street",
            Named("Vine Street".into()),
        ),
        Card::each_opponent(
            "You have been elected Chairman of the Board. Pay each player $50",
            -50,
        ),
        Card::bank("Your building loan matures. Collect $150", 150),
        Card::bank("You have won a crossword competition. Collect $100", 100),
    ]
}

/// The 16 standard Community Chest cards
pub fn community_chest_cards() -> Vec<Card> {
    vec![
        Card::move_to("Advance to Go. Collect $200", MoveDirective::Absolute(0)),
        Card::bank("Bank error in your favor. Collect $200", 200),
        Card::bank("Doctor's fees. Pay $50", -50),
        Card::bank("From sale of stock you get $50", 50),
        Card::jail_release("Get Out of Jail Free"),
        Card::move_to(
            "Go to Jail. Do not pass Go, do not collect $200",
            MoveDirective::ToJail,
        ),
        Card::each_opponent(
            "Grand Opera Night. Collect $50 from every player for opening night seats",
            50,
        ),
        Card::bank("Holiday Fund matures. Receive $100", 100),
        Card::bank("Income tax refund. Collect $20", 20),
        Card::each_opponent("It is your birthday. Collect $10 from every player", 10),
        Card::bank("Life insurance matures. Collect $100", 100),
        Card::bank("Hospital Fees. Pay $50", -50),
        Card::bank("School fees. Pay $50", -50),
        Card::bank("Receive $25 consultancy fee", 25),
        Card::repairs(
            "You are assessed for street repairs: Pay $40 per house and $115 per hotel you own",
            40,
            115,
        ),
        Card::bank("You have won second prize in a beauty contest. Collect $10", 10),
    ]
}
