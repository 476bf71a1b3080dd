//! Static board representation.
//!
//! This module contains:
//! - Space categories and colour groups
//! - The immutable 40-space board with a precomputed name index
//! - Circular distance and nearest-space queries used by card movement

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Player identifier (0-7 for an 8-player game)
pub type PlayerId = u8;

/// Index of a space on the board (0-39)
pub type SpaceIndex = u8;

/// Amount of money. Balances are never left negative by the engine.
pub type Money = i64;

/// Number of spaces on a standard board
pub const BOARD_SIZE: usize = 40;

/// Colour groups of properties, in board order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
}

impl ColorGroup {
    /// All colour groups
    pub const ALL: [ColorGroup; 8] = [
        ColorGroup::Brown,
        ColorGroup::LightBlue,
        ColorGroup::Pink,
        ColorGroup::Orange,
        ColorGroup::Red,
        ColorGroup::Yellow,
        ColorGroup::Green,
        ColorGroup::DarkBlue,
    ];
}

/// The four corner spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    /// Start space, pays the Go bonus when passed
    Go,
    /// Jail (or "just visiting")
    Jail,
    /// Nothing happens here
    FreeParking,
    /// Sends the player straight to Jail
    GoToJail,
}

/// What kind of space this is. Together with the colour group this
/// determines all economic behaviour of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpaceKind {
    /// Buildable street in a colour group
    Property(ColorGroup),
    /// Railway station, rent scales with stations held
    Station,
    /// Utility, rent scales with the dice roll
    Utility,
    /// Flat tax paid to the bank (amount is the space price)
    Tax,
    /// Draw from the Chance deck
    Chance,
    /// Draw from the Community Chest deck
    CommunityChest,
    /// One of the four corners
    Corner(Corner),
}

/// Category filter for "nearest" searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpaceCategory {
    Property,
    Station,
    Utility,
    Tax,
    Chance,
    CommunityChest,
    Corner,
}

impl SpaceKind {
    /// The category of this kind, ignoring colour group / corner variant
    pub fn category(&self) -> SpaceCategory {
        match self {
            SpaceKind::Property(_) => SpaceCategory::Property,
            SpaceKind::Station => SpaceCategory::Station,
            SpaceKind::Utility => SpaceCategory::Utility,
            SpaceKind::Tax => SpaceCategory::Tax,
            SpaceKind::Chance => SpaceCategory::Chance,
            SpaceKind::CommunityChest => SpaceCategory::CommunityChest,
            SpaceKind::Corner(_) => SpaceCategory::Corner,
        }
    }

    /// Whether a player can own this space
    pub fn is_purchasable(&self) -> bool {
        matches!(
            self,
            SpaceKind::Property(_) | SpaceKind::Station | SpaceKind::Utility
        )
    }
}

/// A single space on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Display name
    pub name: String,
    /// Category and colour group
    pub kind: SpaceKind,
    /// Purchase price, or the amount due for a tax space
    pub price: Money,
    /// Rent with no buildings (properties only)
    pub base_rent: Money,
}

impl Space {
    /// Create a property in a colour group
    pub fn property(name: &str, group: ColorGroup, price: Money, base_rent: Money) -> Self {
        Self {
            name: name.to_string(),
            kind: SpaceKind::Property(group),
            price,
            base_rent,
        }
    }

    /// Create a railway station
    pub fn station(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SpaceKind::Station,
            price: 200,
            base_rent: 0,
        }
    }

    /// Create a utility
    pub fn utility(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SpaceKind::Utility,
            price: 150,
            base_rent: 0,
        }
    }

    /// Create a tax space
    pub fn tax(name: &str, amount: Money) -> Self {
        Self {
            name: name.to_string(),
            kind: SpaceKind::Tax,
            price: amount,
            base_rent: 0,
        }
    }

    /// Create a space with no economic parameters (cards, corners)
    pub fn plain(name: &str, kind: SpaceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            price: 0,
            base_rent: 0,
        }
    }

    /// Colour group, for properties
    pub fn group(&self) -> Option<ColorGroup> {
        match self.kind {
            SpaceKind::Property(group) => Some(group),
            _ => None,
        }
    }

    /// Mortgage value (half the purchase price)
    pub fn mortgage_value(&self) -> Money {
        self.price / 2
    }

    /// Cost of one house, and of the hotel upgrade (half the purchase price)
    pub fn house_cost(&self) -> Money {
        self.price / 2
    }
}

/// Board configuration errors. These are fatal: they mean the board or a
/// card refers to something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("No space named {0:?} on the board")]
    UnknownSpace(String),

    #[error("Space name {0:?} is shared by several spaces")]
    AmbiguousName(String),

    #[error("Board must have exactly 40 spaces, got {0}")]
    WrongSize(usize),

    #[error("Board has no {0:?} corner")]
    MissingCorner(Corner),

    #[error("No {0:?} space on the board")]
    NoSuchCategory(SpaceCategory),
}

/// The game board: an immutable ring of spaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    spaces: Vec<Space>,
    /// Unique space names to their index
    name_index: HashMap<String, SpaceIndex>,
    /// Names carried by more than one space ("Chance", "Community Chest")
    shared_names: BTreeSet<String>,
    jail: SpaceIndex,
}

impl Board {
    /// Build a board from its spaces, precomputing the name index.
    pub fn new(spaces: Vec<Space>) -> Result<Self, BoardError> {
        if spaces.len() != BOARD_SIZE {
            return Err(BoardError::WrongSize(spaces.len()));
        }
        if spaces[0].kind != SpaceKind::Corner(Corner::Go) {
            return Err(BoardError::MissingCorner(Corner::Go));
        }

        let mut name_index = HashMap::new();
        let mut shared_names = BTreeSet::new();
        for (i, space) in spaces.iter().enumerate() {
            let index = i as SpaceIndex;
            if name_index.insert(space.name.clone(), index).is_some() {
                shared_names.insert(space.name.clone());
            }
        }
        for name in &shared_names {
            name_index.remove(name);
        }

        let jail = spaces
            .iter()
            .position(|s| s.kind == SpaceKind::Corner(Corner::Jail))
            .ok_or(BoardError::MissingCorner(Corner::Jail))? as SpaceIndex;

        Ok(Self {
            spaces,
            name_index,
            shared_names,
            jail,
        })
    }

    /// The standard London board
    pub fn standard() -> Self {
        use ColorGroup::*;

        let spaces = vec![
            Space::plain("Go", SpaceKind::Corner(Corner::Go)),
            Space::property("Old Kent Road", Brown, 60, 2),
            Space::plain("Community Chest", SpaceKind::CommunityChest),
            Space::property("Whitechapel Road", Brown, 60, 4),
            Space::tax("Income Tax", 200),
            Space::station("Kings Cross Station"),
            Space::property("The Angel Islington", LightBlue, 100, 6),
            Space::plain("Chance", SpaceKind::Chance),
            Space::property("Euston Road", LightBlue, 100, 6),
            Space::property("Pentonville Road", LightBlue, 120, 8),
            Space::plain("Jail", SpaceKind::Corner(Corner::Jail)),
            Space::property("Pall Mall", Pink, 140, 10),
            Space::utility("Electric Company"),
            Space::property("Whitehall", Pink, 140, 10),
            Space::property("Northumberland Avenue", Pink, 160, 12),
            Space::station("Marylebone Station"),
            Space::property("Bow Street", Orange, 180, 14),
            Space::plain("Community Chest", SpaceKind::CommunityChest),
            Space::property("Marlborough Street", Orange, 180, 14),
            Space::property("Vine Street", Orange, 200, 16),
            Space::plain("Free Parking", SpaceKind::Corner(Corner::FreeParking)),
            Space::property("Strand", Red, 220, 18),
            Space::plain("Chance", SpaceKind::Chance),
            Space::property("Fleet Street", Red, 220, 18),
            Space::property("Trafalgar Square", Red, 240, 20),
            Space::station("Fenchurch St. Station"),
            Space::property("Leicester Square", Yellow, 260, 22),
            Space::property("Coventry Street", Yellow, 260, 22),
            Space::utility("Water Works"),
            Space::property("Piccadilly", Yellow, 280, 24),
            Space::plain("Go To Jail", SpaceKind::Corner(Corner::GoToJail)),
            Space::property("Regent Street", Green, 300, 26),
            Space::property("Oxford Street", Green, 300, 26),
            Space::plain("Community Chest", SpaceKind::CommunityChest),
            Space::property("Bond Street", Green, 320, 28),
            Space::station("Liverpool St. Station"),
            Space::plain("Chance", SpaceKind::Chance),
            Space::property("Park Lane", DarkBlue, 350, 35),
            Space::tax("Super Tax", 100),
            Space::property("Mayfair", DarkBlue, 400, 50),
        ];

        match Self::new(spaces) {
            Ok(board) => board,
            Err(e) => unreachable!("standard board is well-formed: {e}"),
        }
    }

    /// Number of spaces
    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    /// Always false: a board is never empty
    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// Space at an index (wraps around)
    pub fn space(&self, index: SpaceIndex) -> &Space {
        &self.spaces[usize::from(index) % self.spaces.len()]
    }

    /// All spaces in board order
    pub fn spaces(&self) -> impl Iterator<Item = (SpaceIndex, &Space)> {
        self.spaces
            .iter()
            .enumerate()
            .map(|(i, s)| (i as SpaceIndex, s))
    }

    /// Index of a uniquely-named space.
    ///
    /// Names shared by several spaces are rejected rather than resolved to
    /// an arbitrary one of them.
    pub fn index_of(&self, name: &str) -> Result<SpaceIndex, BoardError> {
        if let Some(&index) = self.name_index.get(name) {
            return Ok(index);
        }
        if self.shared_names.contains(name) {
            return Err(BoardError::AmbiguousName(name.to_string()));
        }
        Err(BoardError::UnknownSpace(name.to_string()))
    }

    /// Index of the Jail corner
    pub fn jail_index(&self) -> SpaceIndex {
        self.jail
    }

    /// Index reached by moving `steps` forward (negative = backward)
    pub fn advance(&self, from: SpaceIndex, steps: i32) -> SpaceIndex {
        let len = self.spaces.len() as i32;
        (i32::from(from) + steps).rem_euclid(len) as SpaceIndex
    }

    /// Forward (clockwise) distance from one space to another
    pub fn forward_distance(&self, from: SpaceIndex, to: SpaceIndex) -> u8 {
        let len = self.spaces.len() as i32;
        (i32::from(to) - i32::from(from)).rem_euclid(len) as u8
    }

    /// Indices of all spaces in a category
    pub fn indices_of(&self, category: SpaceCategory) -> Vec<SpaceIndex> {
        self.spaces()
            .filter(|(_, s)| s.kind.category() == category)
            .map(|(i, _)| i)
            .collect()
    }

    /// First space of a category strictly ahead of `from`, by forward distance
    pub fn nearest_of(
        &self,
        from: SpaceIndex,
        category: SpaceCategory,
    ) -> Result<SpaceIndex, BoardError> {
        self.indices_of(category)
            .into_iter()
            .filter(|&i| i != from)
            .min_by_key(|&i| self.forward_distance(from, i))
            .ok_or(BoardError::NoSuchCategory(category))
    }

    /// Indices of all properties in a colour group
    pub fn group_members(&self, group: ColorGroup) -> Vec<SpaceIndex> {
        self.spaces()
            .filter(|(_, s)| s.kind == SpaceKind::Property(group))
            .map(|(i, _)| i)
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_board_has_40_spaces() {
        let board = Board::standard();
        assert_eq!(board.len(), BOARD_SIZE);
        assert_eq!(board.space(0).name, "Go");
        assert_eq!(board.space(39).name, "Mayfair");
    }

    #[test]
    fn test_space_lookup_wraps() {
        let board = Board::standard();
        assert_eq!(board.space(40).name, "Go");
        assert_eq!(board.space(44).name, "Income Tax");
    }

    #[test]
    fn test_index_of_unique_names() {
        let board = Board::standard();
        assert_eq!(board.index_of("Jail"), Ok(10));
        assert_eq!(board.index_of("Vine Street"), Ok(19));
        assert_eq!(board.index_of("Kings Cross Station"), Ok(5));
        assert_eq!(board.jail_index(), 10);
    }

    #[test]
    fn test_index_of_shared_name_is_ambiguous() {
        let board = Board::standard();
        assert_eq!(
            board.index_of("Chance"),
            Err(BoardError::AmbiguousName("Chance".into()))
        );
        assert_eq!(
            board.index_of("Community Chest"),
            Err(BoardError::AmbiguousName("Community Chest".into()))
        );
    }

    #[test]
    fn test_index_of_unknown_name() {
        let board = Board::standard();
        assert_eq!(
            board.index_of("Boardwalk"),
            Err(BoardError::UnknownSpace("Boardwalk".into()))
        );
    }

    #[test]
    fn test_group_sizes() {
        let board = Board::standard();
        let sizes: Vec<usize> = ColorGroup::ALL
            .iter()
            .map(|g| board.group_members(*g).len())
            .collect();
        assert_eq!(sizes, vec![2, 3, 3, 3, 3, 3, 3, 2]);
        assert_eq!(board.indices_of(SpaceCategory::Station), vec![5, 15, 25, 35]);
        assert_eq!(board.indices_of(SpaceCategory::Utility), vec![12, 28]);
    }

    #[test]
    fn test_nearest_uses_forward_distance() {
        let board = Board::standard();
        assert_eq!(board.nearest_of(7, SpaceCategory::Station), Ok(15));
        assert_eq!(board.nearest_of(36, SpaceCategory::Station), Ok(5));
        assert_eq!(board.nearest_of(22, SpaceCategory::Utility), Ok(28));
        assert_eq!(board.nearest_of(36, SpaceCategory::Utility), Ok(12));
    }

    #[test]
    fn test_advance_wraps_both_ways() {
        let board = Board::standard();
        assert_eq!(board.advance(38, 6), 4);
        assert_eq!(board.advance(2, -3), 39);
        assert_eq!(board.forward_distance(38, 4), 6);
    }

    #[test]
    fn test_new_rejects_wrong_size() {
        let spaces = vec![Space::plain("Go", SpaceKind::Corner(Corner::Go))];
        assert_eq!(Board::new(spaces).err(), Some(BoardError::WrongSize(1)));
    }
}
