//! Estate ownership ledger.
//!
//! Mutable overlay on the purchasable spaces of the board: who owns what,
//! which estates are mortgaged and how many buildings stand on each one.
//! Rent and building rules live here; money moves in the game engine.

use crate::board::{Board, ColorGroup, Money, PlayerId, SpaceCategory, SpaceIndex, SpaceKind};
use crate::game::GameError;
use crate::rules::Rules;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Most houses an estate can carry before it converts to a hotel
pub const MAX_HOUSES: u8 = 4;

/// Buildings on a property. Houses and a hotel never coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Buildings {
    /// 0-4 houses
    Houses(u8),
    /// A hotel (replaces 4 houses)
    Hotel,
}

impl Default for Buildings {
    fn default() -> Self {
        Buildings::Houses(0)
    }
}

impl Buildings {
    /// Development level: 0-4 for houses, 5 for a hotel
    pub fn level(&self) -> u8 {
        match self {
            Buildings::Houses(n) => *n,
            Buildings::Hotel => MAX_HOUSES + 1,
        }
    }

    /// Whether anything is built
    pub fn is_empty(&self) -> bool {
        self.level() == 0
    }

    /// Number of houses (a hotel counts as none)
    pub fn houses(&self) -> u8 {
        match self {
            Buildings::Houses(n) => *n,
            Buildings::Hotel => 0,
        }
    }

    /// Whether this is a hotel
    pub fn is_hotel(&self) -> bool {
        matches!(self, Buildings::Hotel)
    }

    /// One building step up, if possible
    pub fn upgraded(&self) -> Option<Buildings> {
        match self {
            Buildings::Houses(n) if *n < MAX_HOUSES => Some(Buildings::Houses(n + 1)),
            Buildings::Houses(_) => Some(Buildings::Hotel),
            Buildings::Hotel => None,
        }
    }

    /// One building step down, if possible
    pub fn downgraded(&self) -> Option<Buildings> {
        match self {
            Buildings::Houses(0) => None,
            Buildings::Houses(n) => Some(Buildings::Houses(n - 1)),
            Buildings::Hotel => Some(Buildings::Houses(MAX_HOUSES)),
        }
    }

    /// Multiplier applied to base rent
    pub fn rent_multiplier(&self, rules: &Rules) -> Money {
        match self {
            Buildings::Houses(0) => 1,
            Buildings::Houses(n) => Money::from(*n),
            Buildings::Hotel => rules.hotel_multiplier,
        }
    }
}

/// Ownership state of one purchasable space
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estate {
    /// Owning player, or None while the bank holds it
    pub owner: Option<PlayerId>,
    /// Mortgaged estates collect no rent
    pub mortgaged: bool,
    /// Always empty for stations and utilities
    pub buildings: Buildings,
}

/// An estate the owner could mortgage, with the rent it would stop earning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageAdvice {
    pub estate: SpaceIndex,
    /// Cash the mortgage raises
    pub raises: Money,
    /// Rent currently earned per landing (average roll for utilities)
    pub rent_forgone: Money,
}

/// Ledger of every purchasable space, keyed by board index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estates {
    estates: BTreeMap<SpaceIndex, Estate>,
}

impl Estates {
    /// An unowned ledger entry for every purchasable space of the board
    pub fn new(board: &Board) -> Self {
        let estates = board
            .spaces()
            .filter(|(_, s)| s.kind.is_purchasable())
            .map(|(i, _)| (i, Estate::default()))
            .collect();
        Self { estates }
    }

    /// Ledger entry for a space, if it is purchasable
    pub fn get(&self, index: SpaceIndex) -> Option<&Estate> {
        self.estates.get(&index)
    }

    fn get_mut(&mut self, index: SpaceIndex) -> Result<&mut Estate, GameError> {
        self.estates
            .get_mut(&index)
            .ok_or(GameError::NotPurchasable(index))
    }

    /// Iterate all entries in board order
    pub fn iter(&self) -> impl Iterator<Item = (SpaceIndex, &Estate)> {
        self.estates.iter().map(|(i, e)| (*i, e))
    }

    /// Owner of a space, if any
    pub fn owner(&self, index: SpaceIndex) -> Option<PlayerId> {
        self.get(index).and_then(|e| e.owner)
    }

    /// Estates held by a player, in board order
    pub fn owned_by(&self, player: PlayerId) -> Vec<SpaceIndex> {
        self.iter()
            .filter(|(_, e)| e.owner == Some(player))
            .map(|(i, _)| i)
            .collect()
    }

    /// How many spaces of a category a player holds (mortgaged ones included)
    pub fn count_held(&self, board: &Board, player: PlayerId, category: SpaceCategory) -> usize {
        self.iter()
            .filter(|(i, e)| {
                e.owner == Some(player) && board.space(*i).kind.category() == category
            })
            .count()
    }

    /// Whether a player holds every property of a colour group
    pub fn owns_group(&self, board: &Board, player: PlayerId, group: ColorGroup) -> bool {
        let members = board.group_members(group);
        !members.is_empty() && members.iter().all(|i| self.owner(*i) == Some(player))
    }

    fn group_any(&self, board: &Board, group: ColorGroup, f: impl Fn(&Estate) -> bool) -> bool {
        board
            .group_members(group)
            .iter()
            .filter_map(|i| self.get(*i))
            .any(f)
    }

    /// Whether any estate sharing a colour group with `index` carries buildings
    pub fn group_has_buildings(&self, board: &Board, index: SpaceIndex) -> bool {
        match board.space(index).group() {
            Some(group) => self.group_any(board, group, |e| !e.buildings.is_empty()),
            None => false,
        }
    }

    /// Rent owed for landing on a space.
    ///
    /// `dice_total` is the roll that brought the visitor here; when it is
    /// absent the rules' average roll is used for utilities.
    pub fn rent(
        &self,
        board: &Board,
        rules: &Rules,
        index: SpaceIndex,
        dice_total: Option<u8>,
    ) -> Money {
        let Some(estate) = self.get(index) else {
            return 0;
        };
        let Some(owner) = estate.owner else {
            return 0;
        };
        if estate.mortgaged {
            return 0;
        }

        let space = board.space(index);
        match space.kind {
            SpaceKind::Property(_) => space.base_rent * estate.buildings.rent_multiplier(rules),
            SpaceKind::Station => {
                rules.station_rent * self.count_held(board, owner, SpaceCategory::Station) as Money
            }
            SpaceKind::Utility => {
                let roll = Money::from(dice_total.unwrap_or(rules.average_roll));
                let multiplier = if self.count_held(board, owner, SpaceCategory::Utility) >= 2 {
                    rules.utility_pair_multiplier
                } else {
                    rules.utility_single_multiplier
                };
                roll * multiplier
            }
            _ => 0,
        }
    }

    /// Record a new owner (None returns the estate to the bank)
    pub fn set_owner(&mut self, index: SpaceIndex, owner: Option<PlayerId>) -> Result<(), GameError> {
        self.get_mut(index)?.owner = owner;
        Ok(())
    }

    /// Validate one building step on an estate and return its cost
    pub fn check_build(
        &self,
        board: &Board,
        player: PlayerId,
        index: SpaceIndex,
    ) -> Result<Money, GameError> {
        let estate = self.get(index).ok_or(GameError::NotPurchasable(index))?;
        if estate.owner != Some(player) {
            return Err(GameError::NotOwner(index));
        }
        let space = board.space(index);
        let group = space.group().ok_or(GameError::NotBuildable(index))?;
        if !self.owns_group(board, player, group) {
            return Err(GameError::IncompleteGroup(group));
        }
        if self.group_any(board, group, |e| e.mortgaged) {
            return Err(GameError::GroupMortgaged(group));
        }
        if estate.buildings.upgraded().is_none() {
            return Err(GameError::FullyBuilt(index));
        }
        Ok(space.house_cost())
    }

    /// Add one building step. Call `check_build` first.
    pub fn build(&mut self, index: SpaceIndex) -> Result<Buildings, GameError> {
        let estate = self.get_mut(index)?;
        let next = estate.buildings.upgraded().ok_or(GameError::FullyBuilt(index))?;
        estate.buildings = next;
        Ok(next)
    }

    /// Validate selling one building step back to the bank; returns the refund
    pub fn check_sell_building(
        &self,
        board: &Board,
        player: PlayerId,
        index: SpaceIndex,
    ) -> Result<Money, GameError> {
        let estate = self.get(index).ok_or(GameError::NotPurchasable(index))?;
        if estate.owner != Some(player) {
            return Err(GameError::NotOwner(index));
        }
        if estate.buildings.is_empty() {
            return Err(GameError::NoBuildings(index));
        }
        Ok(board.space(index).house_cost() / 2)
    }

    /// Remove one building step
    pub fn sell_building(&mut self, index: SpaceIndex) -> Result<Buildings, GameError> {
        let estate = self.get_mut(index)?;
        let prev = estate
            .buildings
            .downgraded()
            .ok_or(GameError::NoBuildings(index))?;
        estate.buildings = prev;
        Ok(prev)
    }

    /// Validate a mortgage and return the cash it raises
    pub fn check_mortgage(
        &self,
        board: &Board,
        player: PlayerId,
        index: SpaceIndex,
    ) -> Result<Money, GameError> {
        let estate = self.get(index).ok_or(GameError::NotPurchasable(index))?;
        if estate.owner != Some(player) {
            return Err(GameError::NotOwner(index));
        }
        if estate.mortgaged {
            return Err(GameError::AlreadyMortgaged(index));
        }
        if self.group_has_buildings(board, index) {
            return Err(GameError::HasBuildings(index));
        }
        Ok(board.space(index).mortgage_value())
    }

    /// Validate lifting a mortgage and return what it costs
    pub fn check_unmortgage(
        &self,
        board: &Board,
        player: PlayerId,
        index: SpaceIndex,
    ) -> Result<Money, GameError> {
        let estate = self.get(index).ok_or(GameError::NotPurchasable(index))?;
        if estate.owner != Some(player) {
            return Err(GameError::NotOwner(index));
        }
        if !estate.mortgaged {
            return Err(GameError::NotMortgaged(index));
        }
        Ok(board.space(index).mortgage_value())
    }

    /// Set or clear the mortgage flag
    pub fn set_mortgaged(&mut self, index: SpaceIndex, mortgaged: bool) -> Result<(), GameError> {
        self.get_mut(index)?.mortgaged = mortgaged;
        Ok(())
    }

    /// Houses and hotels across a player's portfolio
    pub fn building_inventory(&self, player: PlayerId) -> (u32, u32) {
        self.iter()
            .filter(|(_, e)| e.owner == Some(player))
            .fold((0, 0), |(houses, hotels), (_, e)| {
                (
                    houses + u32::from(e.buildings.houses()),
                    hotels + u32::from(e.buildings.is_hotel()),
                )
            })
    }

    /// Cash a player could raise by selling every building and mortgaging
    /// every estate
    pub fn liquidation_value(&self, board: &Board, player: PlayerId) -> Money {
        self.iter()
            .filter(|(_, e)| e.owner == Some(player))
            .map(|(i, e)| {
                let space = board.space(i);
                let resale = Money::from(e.buildings.level()) * (space.house_cost() / 2);
                let mortgage = if e.mortgaged { 0 } else { space.mortgage_value() };
                resale + mortgage
            })
            .sum()
    }

    /// Estates a player could mortgage right now, least rent forgone per
    /// dollar raised first
    pub fn mortgage_advice(&self, board: &Board, rules: &Rules, player: PlayerId) -> Vec<MortgageAdvice> {
        let mut advice: Vec<MortgageAdvice> = self
            .owned_by(player)
            .into_iter()
            .filter(|i| self.check_mortgage(board, player, *i).is_ok())
            .map(|i| MortgageAdvice {
                estate: i,
                raises: board.space(i).mortgage_value(),
                rent_forgone: self.rent(board, rules, i, None),
            })
            .collect();

        advice.sort_by(|a, b| compare_efficiency(a, b).then(a.estate.cmp(&b.estate)));
        advice
    }

    /// Estates of a player that carry buildings, most developed first
    pub fn developed_by(&self, player: PlayerId) -> Vec<SpaceIndex> {
        let mut developed: Vec<(SpaceIndex, u8)> = self
            .iter()
            .filter(|(_, e)| e.owner == Some(player) && !e.buildings.is_empty())
            .map(|(i, e)| (i, e.buildings.level()))
            .collect();
        developed.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        developed.into_iter().map(|(i, _)| i).collect()
    }

    /// Strip all buildings from a player's estates, returning the resale value
    pub fn clear_buildings(&mut self, board: &Board, player: PlayerId) -> Money {
        let mut refund = 0;
        for (i, estate) in self.estates.iter_mut() {
            if estate.owner == Some(player) {
                refund += Money::from(estate.buildings.level()) * (board.space(*i).house_cost() / 2);
                estate.buildings = Buildings::default();
            }
        }
        refund
    }
}

/// rent_a / raises_a vs rent_b / raises_b without floats
fn compare_efficiency(a: &MortgageAdvice, b: &MortgageAdvice) -> Ordering {
    (a.rent_forgone * b.raises).cmp(&(b.rent_forgone * a.raises))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const OLD_KENT: SpaceIndex = 1;
    const WHITECHAPEL: SpaceIndex = 3;
    const ELECTRIC: SpaceIndex = 12;
    const WATER: SpaceIndex = 28;

    fn setup() -> (Board, Rules, Estates) {
        let board = Board::standard();
        let estates = Estates::new(&board);
        (board, Rules::default(), estates)
    }

    fn give(estates: &mut Estates, player: PlayerId, indices: &[SpaceIndex]) {
        for i in indices {
            estates.set_owner(*i, Some(player)).expect("purchasable");
        }
    }

    #[test]
    fn test_ledger_covers_purchasable_spaces() {
        let (_, _, estates) = setup();
        assert_eq!(estates.iter().count(), 28);
        assert!(estates.get(0).is_none());
        assert!(estates.get(4).is_none());
    }

    #[test]
    fn test_unowned_estate_has_no_rent() {
        let (board, rules, estates) = setup();
        assert_eq!(estates.rent(&board, &rules, OLD_KENT, Some(7)), 0);
    }

    #[test]
    fn test_property_rent_by_level() {
        let (board, rules, mut estates) = setup();
        give(&mut estates, 0, &[OLD_KENT, WHITECHAPEL]);

        let mut rents = vec![estates.rent(&board, &rules, WHITECHAPEL, None)];
        for _ in 0..5 {
            estates.build(WHITECHAPEL).expect("buildable");
            rents.push(estates.rent(&board, &rules, WHITECHAPEL, None));
        }
        assert_eq!(rents, vec![4, 4, 8, 12, 16, 20]);
    }

    #[test]
    fn test_mortgaged_estate_earns_nothing() {
        let (board, rules, mut estates) = setup();
        give(&mut estates, 0, &[5, 15]);
        estates.set_mortgaged(5, true).expect("estate");
        assert_eq!(estates.rent(&board, &rules, 5, None), 0);
        // Mortgaged stations still count towards their siblings' rent
        assert_eq!(estates.rent(&board, &rules, 15, None), 50);
    }

    #[test]
    fn test_station_rent_scales_with_count() {
        let (board, rules, mut estates) = setup();
        let stations = [5, 15, 25, 35];
        for (n, station) in stations.iter().enumerate() {
            give(&mut estates, 1, &[*station]);
            for s in &stations[..=n] {
                assert_eq!(estates.rent(&board, &rules, *s, None), 25 * (n as Money + 1));
            }
        }
    }

    #[test]
    fn test_utility_rent_uses_roll() {
        let (board, rules, mut estates) = setup();
        give(&mut estates, 0, &[ELECTRIC]);
        assert_eq!(estates.rent(&board, &rules, ELECTRIC, Some(9)), 36);
        assert_eq!(estates.rent(&board, &rules, ELECTRIC, None), 28);

        give(&mut estates, 0, &[WATER]);
        assert_eq!(estates.rent(&board, &rules, ELECTRIC, Some(9)), 90);
        assert_eq!(estates.rent(&board, &rules, WATER, None), 70);
    }

    #[test]
    fn test_build_requires_full_group() {
        let (board, _, mut estates) = setup();
        give(&mut estates, 0, &[OLD_KENT]);
        assert_eq!(
            estates.check_build(&board, 0, OLD_KENT),
            Err(GameError::IncompleteGroup(ColorGroup::Brown))
        );

        give(&mut estates, 1, &[WHITECHAPEL]);
        assert_eq!(
            estates.check_build(&board, 0, OLD_KENT),
            Err(GameError::IncompleteGroup(ColorGroup::Brown))
        );

        give(&mut estates, 0, &[WHITECHAPEL]);
        assert_eq!(estates.check_build(&board, 0, OLD_KENT), Ok(30));
    }

    #[test]
    fn test_build_rejected_when_group_mortgaged() {
        let (board, _, mut estates) = setup();
        give(&mut estates, 0, &[OLD_KENT, WHITECHAPEL]);
        estates.set_mortgaged(WHITECHAPEL, true).expect("estate");
        assert_eq!(
            estates.check_build(&board, 0, OLD_KENT),
            Err(GameError::GroupMortgaged(ColorGroup::Brown))
        );
    }

    #[test]
    fn test_stations_are_not_buildable() {
        let (board, _, mut estates) = setup();
        give(&mut estates, 0, &[5, 15, 25, 35]);
        assert_eq!(estates.check_build(&board, 0, 5), Err(GameError::NotBuildable(5)));
    }

    #[test]
    fn test_fifth_building_is_a_hotel() {
        let (board, _, mut estates) = setup();
        give(&mut estates, 0, &[OLD_KENT, WHITECHAPEL]);
        for expected in 1..=MAX_HOUSES {
            assert_eq!(estates.build(OLD_KENT), Ok(Buildings::Houses(expected)));
        }
        assert_eq!(estates.build(OLD_KENT), Ok(Buildings::Hotel));
        assert_eq!(
            estates.check_build(&board, 0, OLD_KENT),
            Err(GameError::FullyBuilt(OLD_KENT))
        );
        assert_eq!(estates.building_inventory(0), (0, 1));
    }

    #[test]
    fn test_mortgage_rejected_with_buildings_in_group() {
        let (board, _, mut estates) = setup();
        give(&mut estates, 0, &[OLD_KENT, WHITECHAPEL]);
        estates.build(OLD_KENT).expect("buildable");
        assert_eq!(
            estates.check_mortgage(&board, 0, WHITECHAPEL),
            Err(GameError::HasBuildings(WHITECHAPEL))
        );

        estates.sell_building(OLD_KENT).expect("has a house");
        assert_eq!(estates.check_mortgage(&board, 0, WHITECHAPEL), Ok(30));
    }

    #[test]
    fn test_sell_hotel_returns_four_houses() {
        let (board, _, mut estates) = setup();
        give(&mut estates, 0, &[OLD_KENT, WHITECHAPEL]);
        for _ in 0..5 {
            estates.build(OLD_KENT).expect("buildable");
        }
        assert_eq!(estates.check_sell_building(&board, 0, OLD_KENT), Ok(15));
        assert_eq!(estates.sell_building(OLD_KENT), Ok(Buildings::Houses(4)));
    }

    #[test]
    fn test_liquidation_value() {
        let (board, _, mut estates) = setup();
        give(&mut estates, 0, &[OLD_KENT, WHITECHAPEL, 5]);
        estates.build(OLD_KENT).expect("buildable");
        estates.build(OLD_KENT).expect("buildable");
        estates.set_mortgaged(5, true).expect("estate");
        // two houses at 15 resale each, two brown mortgages at 30
        assert_eq!(estates.liquidation_value(&board, 0), 30 + 60);
    }

    #[test]
    fn test_mortgage_advice_prefers_low_rent_per_dollar() {
        let (board, rules, mut estates) = setup();
        // Mayfair: 50 rent for 200 raised; Old Kent Road: 2 for 30; station: 25 for 100
        give(&mut estates, 0, &[39, OLD_KENT, 5]);
        let order: Vec<SpaceIndex> = estates
            .mortgage_advice(&board, &rules, 0)
            .iter()
            .map(|a| a.estate)
            .collect();
        assert_eq!(order, vec![OLD_KENT, 5, 39]);
    }
}
