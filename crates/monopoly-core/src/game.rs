//! Core game state machine.
//!
//! This module contains the `GameState` struct, the `Game` engine that owns
//! it together with its dice, and all turn, landing, card and debt logic.

use crate::actions::{GameAction, GameEvent, JailRelease};
use crate::board::{Board, BoardError, ColorGroup, Corner, Money, PlayerId, SpaceIndex, SpaceKind};
use crate::cards::{Card, Deck, DeckKind, MoveDirective, Payment};
use crate::dice::{Dice, DiceRoll, RandomDice};
use crate::estate::{Estates, MortgageAdvice};
use crate::player::Player;
use crate::rules::Rules;
use crate::trade::TradeState;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Turn phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Start of turn, the player must roll (or leave jail first)
    AwaitingRoll,

    /// Token moving and landing effects applying
    Resolving,

    /// Player may buy, build, mortgage, trade, then end the turn
    AwaitingAction,

    /// Player owes more than their cash and must sell or mortgage
    RaisingFunds {
        /// Debts in the order they arose
        debts: Vec<Debt>,
    },

    /// Turn over, next player about to start
    TurnComplete,

    /// Game is over
    Finished { winner: PlayerId },
}

/// Who a debt is owed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Creditor {
    Bank,
    Player(PlayerId),
    /// Every other player still in the game, `per_head` each
    Opponents { per_head: Money },
}

/// An unpaid obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub creditor: Creditor,
    pub amount: Money,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Game is over")]
    GameOver,

    #[error("No player with id {0}")]
    UnknownPlayer(PlayerId),

    #[error("Space {0} cannot be owned")]
    NotPurchasable(SpaceIndex),

    #[error("Nothing to buy here")]
    NoPurchaseOffer,

    #[error("Cannot afford this: need ${needed}, have ${available}")]
    CannotAfford { needed: Money, available: Money },

    #[error("You do not own space {0}")]
    NotOwner(SpaceIndex),

    #[error("Space {0} cannot carry buildings")]
    NotBuildable(SpaceIndex),

    #[error("You do not own every {0:?} property")]
    IncompleteGroup(ColorGroup),

    #[error("A {0:?} property is mortgaged")]
    GroupMortgaged(ColorGroup),

    #[error("Space {0} already has a hotel")]
    FullyBuilt(SpaceIndex),

    #[error("Space {0} has no buildings")]
    NoBuildings(SpaceIndex),

    #[error("Buildings in the colour group of space {0} must be sold first")]
    HasBuildings(SpaceIndex),

    #[error("Space {0} is already mortgaged")]
    AlreadyMortgaged(SpaceIndex),

    #[error("Space {0} is not mortgaged")]
    NotMortgaged(SpaceIndex),

    #[error("You are not in jail")]
    NotInJail,

    #[error("You hold no Get Out of Jail Free card")]
    NoJailCard,

    #[error("Debts must be settled first")]
    DebtOutstanding,

    #[error("No active trade")]
    NoActiveTrade,

    #[error("A trade is already in progress")]
    TradeInProgress,

    #[error("Cannot trade with yourself")]
    TradeWithSelf,

    #[error("Player {0} has no estates to trade")]
    NothingToTrade(PlayerId),

    #[error("Offer must be a positive amount")]
    InvalidOffer,

    #[error("Board configuration error: {0}")]
    Config(#[from] BoardError),
}

/// Errors creating a game
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("Need between {min} and {max} players, got {count}")]
    PlayerCount { count: usize, min: usize, max: usize },

    #[error("max_players is {max}, but at most {limit} seats are supported")]
    SeatLimit { max: usize, limit: usize },

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Result of a dice roll command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub dice: DiceRoll,
    pub total: u8,
    /// Where the player ended up after all landing effects
    pub moved_to: SpaceIndex,
    pub events: Vec<GameEvent>,
}

/// How a charge was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    Paid,
    Deferred,
    Bankrupt,
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Economic constants
    pub rules: Rules,
    /// The game board
    pub board: Board,
    /// Ownership ledger
    pub estates: Estates,
    /// All players, in seat order
    pub players: Vec<Player>,
    /// Current player index
    pub current_player: PlayerId,
    /// Current game phase
    pub phase: GamePhase,
    /// Turn number (starts at 1)
    pub turn_number: u32,
    /// Last dice roll this turn
    pub last_roll: Option<DiceRoll>,
    pub chance: Deck,
    pub community_chest: Deck,
    /// Trade sub-protocol, if one is open
    pub pending_trade: Option<TradeState>,
    /// Space the current player may buy
    pub purchase_offer: Option<SpaceIndex>,
    /// Narrated history of every event
    pub log: Vec<String>,
    /// Seed of the shuffling generator (for deterministic replays)
    rng_seed: u64,
}

impl GameState {
    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(usize::from(id))
    }

    pub(crate) fn player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.get_player(id).ok_or(GameError::UnknownPlayer(id))
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        self.players
            .get_mut(usize::from(id))
            .ok_or(GameError::UnknownPlayer(id))
    }

    /// Seed used for deck shuffles
    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Players still in the game
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.id)
            .collect()
    }

    /// Every other player still in the game
    pub fn active_opponents(&self, player: PlayerId) -> Vec<PlayerId> {
        self.active_players()
            .into_iter()
            .filter(|p| *p != player)
            .collect()
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Finished { .. })
    }

    /// Get the winner if the game is finished
    pub fn get_winner(&self) -> Option<PlayerId> {
        if let GamePhase::Finished { winner } = self.phase {
            Some(winner)
        } else {
            None
        }
    }

    fn sole_survivor(&self) -> Option<PlayerId> {
        match self.active_players().as_slice() {
            [winner] => Some(*winner),
            _ => None,
        }
    }

    fn next_active_after(&self, player: PlayerId) -> PlayerId {
        let count = self.players.len();
        (1..=count)
            .map(|offset| ((usize::from(player) + offset) % count) as PlayerId)
            .find(|id| self.players[usize::from(*id)].is_active())
            .unwrap_or(player)
    }

    /// Total of unpaid debts
    pub fn outstanding_debt(&self) -> Money {
        match &self.phase {
            GamePhase::RaisingFunds { debts } => debts.iter().map(|d| d.amount).sum(),
            _ => 0,
        }
    }

    /// Rent a visitor would owe on a space right now
    pub fn rent_due(&self, index: SpaceIndex) -> Money {
        self.estates.rent(
            &self.board,
            &self.rules,
            index,
            self.last_roll.map(|r| r.total()),
        )
    }

    /// Cash plus everything a player could raise by liquidating
    pub fn net_worth(&self, player: PlayerId) -> Money {
        self.get_player(player).map_or(0, |p| {
            p.balance + self.estates.liquidation_value(&self.board, player)
        })
    }

    /// Estates the player could mortgage, least rent forgone per dollar first
    pub fn mortgage_advice(&self, player: PlayerId) -> Vec<MortgageAdvice> {
        self.estates.mortgage_advice(&self.board, &self.rules, player)
    }

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();

        let Some(p) = self.get_player(player) else {
            return actions;
        };
        if self.is_finished() || !p.is_active() {
            return actions;
        }

        if let Some(TradeState::AwaitingResponse { offer }) = &self.pending_trade {
            if offer.counterparty == player {
                actions.push(GameAction::RespondTrade { accept: true });
                actions.push(GameAction::RespondTrade { accept: false });
            }
        }

        if player != self.current_player {
            return actions;
        }

        match &self.phase {
            GamePhase::AwaitingRoll => {
                actions.push(GameAction::RollDice);
                if p.jail.in_jail {
                    if p.jail_cards > 0 {
                        actions.push(GameAction::UseJailCard);
                    }
                    if p.can_afford(self.rules.jail_fine) {
                        actions.push(GameAction::PayJailFine);
                    }
                }
            }

            GamePhase::AwaitingAction => {
                actions.push(GameAction::EndTurn);

                if let Some(offer) = self.purchase_offer {
                    if p.can_afford(self.board.space(offer).price) {
                        actions.push(GameAction::BuyEstate);
                    }
                }

                for &i in &p.estates {
                    if let Ok(cost) = self.estates.check_build(&self.board, player, i) {
                        if p.can_afford(cost) {
                            actions.push(GameAction::Build(i));
                        }
                    }
                    if self.estates.check_sell_building(&self.board, player, i).is_ok() {
                        actions.push(GameAction::SellBuilding(i));
                    }
                    if self.estates.check_mortgage(&self.board, player, i).is_ok() {
                        actions.push(GameAction::Mortgage(i));
                    }
                    if let Ok(cost) = self.estates.check_unmortgage(&self.board, player, i) {
                        if p.can_afford(cost) {
                            actions.push(GameAction::Unmortgage(i));
                        }
                    }
                }

                match &self.pending_trade {
                    None => {
                        for other in self.active_opponents(player) {
                            if !self.players[usize::from(other)].estates.is_empty() {
                                actions.push(GameAction::StartTrade(other));
                            }
                        }
                    }
                    Some(TradeState::SelectingEstate { counterparty, .. }) => {
                        // Any positive cash amount up to the balance is valid;
                        // suggest the list price as a starting point
                        if p.balance > 0 {
                            for &i in &self.players[usize::from(*counterparty)].estates {
                                if !self.estates.group_has_buildings(&self.board, i) {
                                    actions.push(GameAction::ProposeTrade {
                                        estate: i,
                                        cash: self.board.space(i).price.min(p.balance),
                                    });
                                }
                            }
                        }
                        actions.push(GameAction::CancelTrade);
                    }
                    Some(TradeState::AwaitingResponse { .. }) => {
                        actions.push(GameAction::CancelTrade);
                    }
                }
            }

            GamePhase::RaisingFunds { .. } => {
                for &i in &p.estates {
                    if self.estates.check_sell_building(&self.board, player, i).is_ok() {
                        actions.push(GameAction::SellBuilding(i));
                    }
                    if self.estates.check_mortgage(&self.board, player, i).is_ok() {
                        actions.push(GameAction::Mortgage(i));
                    }
                }
                actions.push(GameAction::DeclareBankruptcy);
            }

            GamePhase::Resolving | GamePhase::TurnComplete | GamePhase::Finished { .. } => {}
        }

        actions
    }

    fn name(&self, id: PlayerId) -> &str {
        self.get_player(id).map_or("Unknown player", |p| p.name.as_str())
    }

    fn space_name(&self, index: SpaceIndex) -> &str {
        &self.board.space(index).name
    }

    /// Human-readable description of an event
    pub fn narrate(&self, event: &GameEvent) -> String {
        match event {
            GameEvent::DiceRolled { player, roll } => format!(
                "{} rolled {} and {} ({})",
                self.name(*player),
                roll.0,
                roll.1,
                roll.total()
            ),
            GameEvent::Moved { player, to, .. } => {
                format!("{} moved to {}", self.name(*player), self.space_name(*to))
            }
            GameEvent::PassedGo { player, bonus } => {
                format!("{} passed Go and collected ${}", self.name(*player), bonus)
            }
            GameEvent::StayedInJail { player, turns } => {
                format!("{} stays in jail (turn {})", self.name(*player), turns)
            }
            GameEvent::ReleasedFromJail { player, how } => {
                let how = match how {
                    JailRelease::RolledDouble => "by rolling a double",
                    JailRelease::ServedTime => "after serving their time",
                    JailRelease::UsedCard => "using a Get Out of Jail Free card",
                    JailRelease::PaidFine => "by paying the fine",
                };
                format!("{} is released from jail {}", self.name(*player), how)
            }
            GameEvent::SentToJail { player } => {
                format!("{} was sent to jail", self.name(*player))
            }
            GameEvent::TaxPaid {
                player,
                space,
                amount,
            } => format!(
                "{} paid ${} in {}",
                self.name(*player),
                amount,
                self.space_name(*space)
            ),
            GameEvent::CardDrawn {
                player,
                deck,
                description,
            } => {
                let deck = match deck {
                    DeckKind::Chance => "Chance",
                    DeckKind::CommunityChest => "Community Chest",
                };
                format!("{} drew {}: {}", self.name(*player), deck, description)
            }
            GameEvent::JailCardGranted { player, .. } => format!(
                "{} received a Get Out of Jail Free card",
                self.name(*player)
            ),
            GameEvent::BankPaid { player, amount } => {
                format!("{} received ${} from the bank", self.name(*player), amount)
            }
            GameEvent::PaidBank { player, amount } => {
                format!("{} paid ${} to the bank", self.name(*player), amount)
            }
            GameEvent::PaidPlayer { from, to, amount } => {
                format!("{} paid ${} to {}", self.name(*from), amount, self.name(*to))
            }
            GameEvent::RentPaid {
                from, to, amount, ..
            } => format!(
                "{} paid ${} in rent to {}",
                self.name(*from),
                amount,
                self.name(*to)
            ),
            GameEvent::RepairsAssessed {
                player,
                houses,
                hotels,
                amount,
            } => format!(
                "{} was assessed ${} for {} houses and {} hotels",
                self.name(*player),
                amount,
                houses,
                hotels
            ),
            GameEvent::PurchaseOffered {
                player,
                estate,
                price,
            } => format!(
                "{} may buy {} for ${}",
                self.name(*player),
                self.space_name(*estate),
                price
            ),
            GameEvent::EstateBought {
                player,
                estate,
                price,
            } => format!(
                "{} bought {} for ${}",
                self.name(*player),
                self.space_name(*estate),
                price
            ),
            GameEvent::BuildingBuilt {
                player,
                estate,
                buildings,
                cost,
            } => {
                let what = if buildings.is_hotel() { "a hotel" } else { "a house" };
                format!(
                    "{} built {} on {} for ${}",
                    self.name(*player),
                    what,
                    self.space_name(*estate),
                    cost
                )
            }
            GameEvent::BuildingSold {
                player,
                estate,
                refund,
                ..
            } => format!(
                "{} sold a building on {} for ${}",
                self.name(*player),
                self.space_name(*estate),
                refund
            ),
            GameEvent::Mortgaged {
                player,
                estate,
                amount,
            } => format!(
                "{} mortgaged {} for ${}",
                self.name(*player),
                self.space_name(*estate),
                amount
            ),
            GameEvent::Unmortgaged {
                player,
                estate,
                amount,
            } => format!(
                "{} unmortgaged {} for ${}",
                self.name(*player),
                self.space_name(*estate),
                amount
            ),
            GameEvent::PaymentShortfall {
                player,
                due,
                balance,
            } => format!(
                "{} owes ${} but has only ${} and must raise funds",
                self.name(*player),
                due,
                balance
            ),
            GameEvent::DebtSettled { player, amount } => {
                format!("{} settled debts of ${}", self.name(*player), amount)
            }
            GameEvent::Bankrupt { player, creditor } => match creditor {
                Creditor::Player(c) => {
                    format!("{} is bankrupt to {}", self.name(*player), self.name(*c))
                }
                _ => format!("{} is bankrupt to the bank", self.name(*player)),
            },
            GameEvent::TradeStarted {
                initiator,
                counterparty,
            } => format!(
                "{} opened a trade with {}",
                self.name(*initiator),
                self.name(*counterparty)
            ),
            GameEvent::TradeProposed { offer } => format!(
                "{} offered ${} to {} for {}",
                self.name(offer.initiator),
                offer.cash,
                self.name(offer.counterparty),
                self.space_name(offer.estate)
            ),
            GameEvent::TradeCompleted { offer } => format!(
                "{} sold {} to {} for ${}",
                self.name(offer.counterparty),
                self.space_name(offer.estate),
                self.name(offer.initiator),
                offer.cash
            ),
            GameEvent::TradeDeclined { offer } => format!(
                "{} declined the offer for {}",
                self.name(offer.counterparty),
                self.space_name(offer.estate)
            ),
            GameEvent::TradeCancelled { initiator } => {
                format!("{} cancelled the trade", self.name(*initiator))
            }
            GameEvent::TurnEnded {
                player,
                next_player,
            } => format!(
                "{} ended their turn; {} is next",
                self.name(*player),
                self.name(*next_player)
            ),
            GameEvent::GameWon { player } => format!("{} wins the game", self.name(*player)),
        }
    }

    /// Narrate a batch of events
    pub fn narrate_all(&self, events: &[GameEvent]) -> Vec<String> {
        events.iter().map(|e| self.narrate(e)).collect()
    }
}

/// The turn engine: owns the game state, the dice and the shuffling
/// generator, and is the only thing that mutates them.
#[derive(Debug, Clone)]
pub struct Game<D: Dice = RandomDice> {
    pub state: GameState,
    dice: D,
    rng: ChaCha8Rng,
}

impl Game<RandomDice> {
    /// Create a game with seeded random dice
    pub fn new(player_names: Vec<String>, rules: Rules, seed: u64) -> Result<Self, SetupError> {
        Self::with_dice(player_names, rules, RandomDice::seeded(seed), seed)
    }

    /// Create a standard game seeded from the thread generator
    pub fn from_entropy(player_names: Vec<String>) -> Result<Self, SetupError> {
        Self::new(player_names, Rules::default(), rand::thread_rng().gen())
    }
}

impl<D: Dice> Game<D> {
    /// Create a game with a custom dice source.
    ///
    /// `seed` drives deck shuffling only.
    pub fn with_dice(
        player_names: Vec<String>,
        rules: Rules,
        dice: D,
        seed: u64,
    ) -> Result<Self, SetupError> {
        let count = player_names.len();
        let seat_limit = usize::from(PlayerId::MAX) + 1;
        if rules.max_players > seat_limit {
            return Err(SetupError::SeatLimit {
                max: rules.max_players,
                limit: seat_limit,
            });
        }
        if count < rules.min_players || count > rules.max_players {
            return Err(SetupError::PlayerCount {
                count,
                min: rules.min_players,
                max: rules.max_players,
            });
        }

        let board = Board::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let chance = Deck::chance(&mut rng);
        let community_chest = Deck::community_chest(&mut rng);
        chance.validate(&board)?;
        community_chest.validate(&board)?;

        let players = player_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let id = PlayerId::try_from(i).map_err(|_| SetupError::SeatLimit {
                    max: rules.max_players,
                    limit: seat_limit,
                })?;
                Ok(Player::new(id, name, rules.starting_balance))
            })
            .collect::<Result<Vec<_>, SetupError>>()?;

        let state = GameState {
            estates: Estates::new(&board),
            board,
            rules,
            players,
            current_player: 0,
            phase: GamePhase::AwaitingRoll,
            turn_number: 1,
            last_roll: None,
            chance,
            community_chest,
            pending_trade: None,
            purchase_offer: None,
            log: Vec::new(),
            rng_seed: seed,
        };

        info!(players = state.players.len(), seed, "new game");

        Ok(Self { state, dice, rng })
    }

    /// The dice source, e.g. to script more rolls
    pub fn dice_mut(&mut self) -> &mut D {
        &mut self.dice
    }

    /// Apply an action to the game state
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();
        match self.dispatch(player, action.clone(), &mut events) {
            Ok(()) => {
                for event in &events {
                    let line = self.state.narrate(event);
                    info!(turn = self.state.turn_number, "{line}");
                    self.state.log.push(line);
                }
                Ok(events)
            }
            Err(e) => {
                debug!(player, ?action, error = %e, "rejected action");
                Err(e)
            }
        }
    }

    fn dispatch(
        &mut self,
        player: PlayerId,
        action: GameAction,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        // Check game not over
        if self.state.is_finished() {
            return Err(GameError::GameOver);
        }
        self.state.player(player)?;

        match action {
            // ==================== Start of Turn ====================
            GameAction::RollDice => self.handle_roll(player, events),

            GameAction::UseJailCard => {
                self.ensure_turn(player)?;
                self.ensure_phase(|p| matches!(p, GamePhase::AwaitingRoll))?;
                let p = self.state.player_mut(player)?;
                if !p.jail.in_jail {
                    return Err(GameError::NotInJail);
                }
                if p.jail_cards == 0 {
                    return Err(GameError::NoJailCard);
                }
                p.jail_cards -= 1;
                p.release();
                events.push(GameEvent::ReleasedFromJail {
                    player,
                    how: JailRelease::UsedCard,
                });
                Ok(())
            }

            GameAction::PayJailFine => {
                self.ensure_turn(player)?;
                self.ensure_phase(|p| matches!(p, GamePhase::AwaitingRoll))?;
                let fine = self.state.rules.jail_fine;
                let p = self.state.player_mut(player)?;
                if !p.jail.in_jail {
                    return Err(GameError::NotInJail);
                }
                if !p.can_afford(fine) {
                    return Err(GameError::CannotAfford {
                        needed: fine,
                        available: p.balance,
                    });
                }
                p.debit(fine);
                p.release();
                events.push(GameEvent::PaidBank {
                    player,
                    amount: fine,
                });
                events.push(GameEvent::ReleasedFromJail {
                    player,
                    how: JailRelease::PaidFine,
                });
                Ok(())
            }

            // ==================== Estate Actions ====================
            GameAction::BuyEstate => self.handle_buy(player, events),
            GameAction::Build(estate) => self.handle_build(player, estate, events),
            GameAction::SellBuilding(estate) => self.handle_sell_building(player, estate, events),
            GameAction::Mortgage(estate) => self.handle_mortgage(player, estate, events),
            GameAction::Unmortgage(estate) => self.handle_unmortgage(player, estate, events),

            // ==================== Trading ====================
            GameAction::StartTrade(counterparty) => {
                self.handle_start_trade(player, counterparty, events)
            }
            GameAction::ProposeTrade { estate, cash } => {
                self.handle_propose_trade(player, estate, cash, events)
            }
            GameAction::RespondTrade { accept } => {
                self.handle_respond_trade(player, accept, events)
            }
            GameAction::CancelTrade => self.handle_cancel_trade(player, events),

            // ==================== Turn Management ====================
            GameAction::DeclareBankruptcy => {
                self.ensure_turn(player)?;
                let creditor = match &self.state.phase {
                    GamePhase::RaisingFunds { debts } => {
                        debts.first().map_or(Creditor::Bank, |d| d.creditor)
                    }
                    _ => return Err(GameError::InvalidPhase),
                };
                self.bankrupt(player, creditor, events)
            }

            GameAction::EndTurn => {
                self.ensure_turn(player)?;
                match self.state.phase {
                    GamePhase::AwaitingAction => {}
                    GamePhase::RaisingFunds { .. } => return Err(GameError::DebtOutstanding),
                    _ => return Err(GameError::InvalidPhase),
                }
                if self.state.pending_trade.take().is_some() {
                    events.push(GameEvent::TradeCancelled { initiator: player });
                }
                self.advance_turn(player, events);
                Ok(())
            }
        }
    }

    // ==================== Command Surface ====================

    /// Roll the dice and resolve the move
    pub fn roll_dice(&mut self, player: PlayerId) -> Result<RollOutcome, GameError> {
        let events = self.apply_action(player, GameAction::RollDice)?;
        // Bankruptcy ends the turn and clears `last_roll`, so read the event
        let dice = events
            .iter()
            .find_map(|e| match e {
                GameEvent::DiceRolled { roll, .. } => Some(*roll),
                _ => None,
            })
            .or(self.state.last_roll)
            .unwrap_or(DiceRoll(0, 0));
        Ok(RollOutcome {
            dice,
            total: dice.total(),
            moved_to: self.state.player(player)?.position,
            events,
        })
    }

    /// Buy the space the current player landed on
    pub fn buy_current_estate(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::BuyEstate)
    }

    /// Add one building step to an estate
    pub fn build(&mut self, player: PlayerId, estate: SpaceIndex) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::Build(estate))
    }

    /// Sell one building step back to the bank
    pub fn sell_building(
        &mut self,
        player: PlayerId,
        estate: SpaceIndex,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::SellBuilding(estate))
    }

    /// Mortgage an estate
    pub fn mortgage(&mut self, player: PlayerId, estate: SpaceIndex) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::Mortgage(estate))
    }

    /// Lift a mortgage
    pub fn unmortgage(
        &mut self,
        player: PlayerId,
        estate: SpaceIndex,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::Unmortgage(estate))
    }

    /// Open a trade with another player
    pub fn start_trade(
        &mut self,
        player: PlayerId,
        counterparty: PlayerId,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::StartTrade(counterparty))
    }

    /// Offer cash for one of the counterparty's estates
    pub fn propose_trade(
        &mut self,
        player: PlayerId,
        estate: SpaceIndex,
        cash: Money,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::ProposeTrade { estate, cash })
    }

    /// Counterparty's answer to the offer
    pub fn respond_trade(&mut self, player: PlayerId, accept: bool) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::RespondTrade { accept })
    }

    /// Abandon the open trade
    pub fn cancel_trade(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::CancelTrade)
    }

    /// Spend a held jail card
    pub fn use_jail_card(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::UseJailCard)
    }

    /// Pay the jail fine
    pub fn pay_jail_fine(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::PayJailFine)
    }

    /// Give up while raising funds
    pub fn declare_bankruptcy(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::DeclareBankruptcy)
    }

    /// End the current turn
    pub fn end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::EndTurn)
    }

    // ==================== Validation ====================

    pub(crate) fn ensure_turn(&self, player: PlayerId) -> Result<(), GameError> {
        if player != self.state.current_player {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    pub(crate) fn ensure_phase(&self, allowed: impl Fn(&GamePhase) -> bool) -> Result<(), GameError> {
        if !allowed(&self.state.phase) {
            return Err(GameError::InvalidPhase);
        }
        Ok(())
    }

    // ==================== Rolling and Movement ====================

    fn handle_roll(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        self.ensure_phase(|p| matches!(p, GamePhase::AwaitingRoll))?;

        let roll = self.dice.roll();
        self.state.last_roll = Some(roll);
        self.state.phase = GamePhase::Resolving;
        events.push(GameEvent::DiceRolled { player, roll });

        let rules = self.state.rules.clone();
        let p = self.state.player_mut(player)?;
        if p.jail.in_jail {
            p.jail.turns += 1;
            let turns = p.jail.turns;
            if roll.is_double() && rules.doubles_release_from_jail {
                p.release();
                events.push(GameEvent::ReleasedFromJail {
                    player,
                    how: JailRelease::RolledDouble,
                });
            } else if turns >= rules.max_jail_turns {
                p.release();
                events.push(GameEvent::ReleasedFromJail {
                    player,
                    how: JailRelease::ServedTime,
                });
            } else {
                events.push(GameEvent::StayedInJail { player, turns });
                self.state.phase = GamePhase::AwaitingAction;
                return Ok(());
            }
        }

        self.move_forward(player, roll.total(), events)?;
        self.resolve_landing(player, events)?;

        if self.state.phase == GamePhase::Resolving {
            self.state.phase = GamePhase::AwaitingAction;
        }
        Ok(())
    }

    /// Step the token forward one space at a time, paying Go on the wrap
    fn move_forward(&mut self, player: PlayerId, steps: u8, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let bonus = self.state.rules.go_bonus;
        let from = self.state.player(player)?.position;

        let mut position = from;
        let mut passed_go = false;
        for _ in 0..steps {
            position = self.state.board.advance(position, 1);
            if position == 0 {
                passed_go = true;
            }
        }

        let p = self.state.player_mut(player)?;
        p.position = position;
        events.push(GameEvent::Moved {
            player,
            from,
            to: position,
        });
        if passed_go {
            p.credit(bonus);
            events.push(GameEvent::PassedGo { player, bonus });
        }
        Ok(())
    }

    fn move_backward(&mut self, player: PlayerId, steps: u8, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let from = self.state.player(player)?.position;
        let to = self.state.board.advance(from, -i32::from(steps));
        self.state.player_mut(player)?.position = to;
        events.push(GameEvent::Moved { player, from, to });
        Ok(())
    }

    fn send_to_jail(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let jail = self.state.board.jail_index();
        self.state.player_mut(player)?.imprison(jail);
        self.state.purchase_offer = None;
        events.push(GameEvent::SentToJail { player });
        Ok(())
    }

    /// Apply the effect of the space the player stands on
    fn resolve_landing(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let index = self.state.player(player)?.position;
        let space = self.state.board.space(index).clone();

        match space.kind {
            SpaceKind::Tax => {
                if self.charge(player, space.price, Creditor::Bank, events)? == Settlement::Paid {
                    events.push(GameEvent::TaxPaid {
                        player,
                        space: index,
                        amount: space.price,
                    });
                }
            }

            SpaceKind::Chance => self.draw_card(player, DeckKind::Chance, events)?,
            SpaceKind::CommunityChest => self.draw_card(player, DeckKind::CommunityChest, events)?,

            SpaceKind::Corner(Corner::GoToJail) => self.send_to_jail(player, events)?,

            SpaceKind::Property(_) | SpaceKind::Station | SpaceKind::Utility => {
                match self.state.estates.owner(index) {
                    None => {
                        self.state.purchase_offer = Some(index);
                        events.push(GameEvent::PurchaseOffered {
                            player,
                            estate: index,
                            price: space.price,
                        });
                    }
                    Some(owner) if owner == player => {}
                    Some(owner) => {
                        let rent = self.state.rent_due(index);
                        if rent > 0
                            && self.charge(player, rent, Creditor::Player(owner), events)?
                                == Settlement::Paid
                        {
                            events.push(GameEvent::RentPaid {
                                from: player,
                                to: owner,
                                estate: index,
                                amount: rent,
                            });
                        }
                    }
                }
            }

            SpaceKind::Corner(_) => {}
        }
        Ok(())
    }

    // ==================== Cards ====================

    fn deck_mut(&mut self, kind: DeckKind) -> &mut Deck {
        match kind {
            DeckKind::Chance => &mut self.state.chance,
            DeckKind::CommunityChest => &mut self.state.community_chest,
        }
    }

    fn draw_card(&mut self, player: PlayerId, kind: DeckKind, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let deck = match kind {
            DeckKind::Chance => &mut self.state.chance,
            DeckKind::CommunityChest => &mut self.state.community_chest,
        };
        let drawn = deck.draw(&mut self.rng);

        // Every card of this deck is held by players
        let Some(card) = drawn else {
            return Ok(());
        };

        events.push(GameEvent::CardDrawn {
            player,
            deck: kind,
            description: card.description.clone(),
        });
        self.apply_card(player, &card, events)?;

        if !card.grants_jail_release {
            self.deck_mut(kind).discard(card);
        }
        Ok(())
    }

    /// Apply a card: jail grant, then movement, then money, then repairs
    pub(crate) fn apply_card(&mut self, player: PlayerId, card: &Card, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        if card.grants_jail_release {
            let p = self.state.player_mut(player)?;
            p.jail_cards += 1;
            events.push(GameEvent::JailCardGranted {
                player,
                held: p.jail_cards,
            });
        }

        if let Some(directive) = &card.movement {
            self.apply_movement(player, directive, events)?;
            if !self.state.player(player)?.is_active() {
                return Ok(());
            }
        }

        if card.amount != 0 {
            match card.payment {
                Payment::Bank if card.amount > 0 => {
                    self.state.player_mut(player)?.credit(card.amount);
                    events.push(GameEvent::BankPaid {
                        player,
                        amount: card.amount,
                    });
                }
                Payment::Bank => {
                    let amount = -card.amount;
                    if self.charge(player, amount, Creditor::Bank, events)? == Settlement::Paid {
                        events.push(GameEvent::PaidBank { player, amount });
                    }
                }
                Payment::EachOpponent if card.amount > 0 => {
                    for other in self.state.active_opponents(player) {
                        if self.charge(other, card.amount, Creditor::Player(player), events)?
                            == Settlement::Paid
                        {
                            events.push(GameEvent::PaidPlayer {
                                from: other,
                                to: player,
                                amount: card.amount,
                            });
                        }
                    }
                }
                Payment::EachOpponent => {
                    let per_head = -card.amount;
                    let opponents = self.state.active_opponents(player);
                    let total = per_head * opponents.len() as Money;
                    let creditor = Creditor::Opponents { per_head };
                    if self.charge(player, total, creditor, events)? == Settlement::Paid {
                        for other in opponents {
                            events.push(GameEvent::PaidPlayer {
                                from: player,
                                to: other,
                                amount: per_head,
                            });
                        }
                    }
                }
            }
        }

        if let Some(fees) = card.repairs {
            if !self.state.player(player)?.is_active() {
                return Ok(());
            }
            let (houses, hotels) = self.state.estates.building_inventory(player);
            let amount = Money::from(houses) * fees.per_house + Money::from(hotels) * fees.per_hotel;
            events.push(GameEvent::RepairsAssessed {
                player,
                houses,
                hotels,
                amount,
            });
            self.charge(player, amount, Creditor::Bank, events)?;
        }

        Ok(())
    }

    /// Card movement goes through the same landing path as a dice move
    fn apply_movement(
        &mut self,
        player: PlayerId,
        directive: &MoveDirective,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        match directive {
            MoveDirective::ToJail => return self.send_to_jail(player, events),
            MoveDirective::RelativeSteps(steps) if *steps < 0 => {
                self.move_backward(player, steps.unsigned_abs(), events)?;
                return self.resolve_landing(player, events);
            }
            _ => {}
        }

        let position = self.state.player(player)?.position;
        let board = &self.state.board;
        let target = match directive {
            // handled above
            MoveDirective::ToJail => return Ok(()),
            MoveDirective::RelativeSteps(steps) => board.advance(position, i32::from(*steps)),
            MoveDirective::Absolute(index) => *index,
            MoveDirective::Named(name) => board.index_of(name)?,
            MoveDirective::NearestOf(category) => board.nearest_of(position, *category)?,
        };

        let steps = self.state.board.forward_distance(position, target);
        self.move_forward(player, steps, events)?;
        self.resolve_landing(player, events)
    }

    // ==================== Estate Actions ====================

    fn handle_buy(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        self.ensure_phase(|p| matches!(p, GamePhase::AwaitingAction))?;

        let position = self.state.player(player)?.position;
        if self.state.purchase_offer != Some(position) || self.state.estates.owner(position).is_some() {
            return Err(GameError::NoPurchaseOffer);
        }

        let price = self.state.board.space(position).price;
        let p = self.state.player_mut(player)?;
        if !p.can_afford(price) {
            return Err(GameError::CannotAfford {
                needed: price,
                available: p.balance,
            });
        }
        p.debit(price);
        p.estates.insert(position);
        self.state.estates.set_owner(position, Some(player))?;
        self.state.purchase_offer = None;

        events.push(GameEvent::EstateBought {
            player,
            estate: position,
            price,
        });
        Ok(())
    }

    fn handle_build(&mut self, player: PlayerId, estate: SpaceIndex, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        self.ensure_phase(|p| matches!(p, GamePhase::AwaitingAction))?;

        let cost = self.state.estates.check_build(&self.state.board, player, estate)?;
        let p = self.state.player_mut(player)?;
        if !p.can_afford(cost) {
            return Err(GameError::CannotAfford {
                needed: cost,
                available: p.balance,
            });
        }
        p.debit(cost);
        let buildings = self.state.estates.build(estate)?;

        events.push(GameEvent::BuildingBuilt {
            player,
            estate,
            buildings,
            cost,
        });
        Ok(())
    }

    fn handle_sell_building(
        &mut self,
        player: PlayerId,
        estate: SpaceIndex,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        self.ensure_phase(|p| {
            matches!(p, GamePhase::AwaitingAction | GamePhase::RaisingFunds { .. })
        })?;

        let refund = self
            .state
            .estates
            .check_sell_building(&self.state.board, player, estate)?;
        let buildings = self.state.estates.sell_building(estate)?;
        self.state.player_mut(player)?.credit(refund);

        events.push(GameEvent::BuildingSold {
            player,
            estate,
            buildings,
            refund,
        });
        self.try_settle(player, events)
    }

    fn handle_mortgage(&mut self, player: PlayerId, estate: SpaceIndex, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        self.ensure_phase(|p| {
            matches!(p, GamePhase::AwaitingAction | GamePhase::RaisingFunds { .. })
        })?;

        let amount = self
            .state
            .estates
            .check_mortgage(&self.state.board, player, estate)?;
        self.state.estates.set_mortgaged(estate, true)?;
        self.state.player_mut(player)?.credit(amount);

        events.push(GameEvent::Mortgaged {
            player,
            estate,
            amount,
        });
        self.try_settle(player, events)
    }

    fn handle_unmortgage(
        &mut self,
        player: PlayerId,
        estate: SpaceIndex,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        self.ensure_phase(|p| matches!(p, GamePhase::AwaitingAction))?;

        let amount = self
            .state
            .estates
            .check_unmortgage(&self.state.board, player, estate)?;
        let p = self.state.player_mut(player)?;
        if !p.can_afford(amount) {
            return Err(GameError::CannotAfford {
                needed: amount,
                available: p.balance,
            });
        }
        p.debit(amount);
        self.state.estates.set_mortgaged(estate, false)?;

        events.push(GameEvent::Unmortgaged {
            player,
            estate,
            amount,
        });
        Ok(())
    }

    // ==================== Debts ====================

    /// Make a player pay an obligation.
    ///
    /// The current player who is short but could cover the amount by
    /// liquidating enters `RaisingFunds`; anyone else is liquidated
    /// automatically. A player who cannot cover it at all goes bankrupt.
    fn charge(
        &mut self,
        debtor: PlayerId,
        amount: Money,
        creditor: Creditor,
        events: &mut Vec<GameEvent>,
    ) -> Result<Settlement, GameError> {
        if amount <= 0 {
            return Ok(Settlement::Paid);
        }

        let on_turn = debtor == self.state.current_player;
        let raising = matches!(self.state.phase, GamePhase::RaisingFunds { .. });
        let balance = self.state.player(debtor)?.balance;

        // Cash already earmarked for open debts is not free
        let earmarked = if on_turn && raising {
            self.state.outstanding_debt()
        } else {
            0
        };

        if balance - earmarked >= amount {
            self.transfer(debtor, amount, creditor)?;
            return Ok(Settlement::Paid);
        }

        if on_turn {
            let due = self.state.outstanding_debt() + amount;
            let reach = balance + self.state.estates.liquidation_value(&self.state.board, debtor);
            if reach >= due {
                let debt = Debt { creditor, amount };
                match &mut self.state.phase {
                    GamePhase::RaisingFunds { debts } => debts.push(debt),
                    phase => *phase = GamePhase::RaisingFunds { debts: vec![debt] },
                }
                events.push(GameEvent::PaymentShortfall {
                    player: debtor,
                    due,
                    balance,
                });
                return Ok(Settlement::Deferred);
            }
            self.bankrupt(debtor, creditor, events)?;
            return Ok(Settlement::Bankrupt);
        }

        self.auto_liquidate(debtor, amount, events)?;
        if self.state.player(debtor)?.can_afford(amount) {
            self.transfer(debtor, amount, creditor)?;
            Ok(Settlement::Paid)
        } else {
            self.bankrupt(debtor, creditor, events)?;
            Ok(Settlement::Bankrupt)
        }
    }

    fn transfer(&mut self, debtor: PlayerId, amount: Money, creditor: Creditor) -> Result<(), GameError> {
        self.state.player_mut(debtor)?.debit(amount);
        match creditor {
            Creditor::Bank => {}
            Creditor::Player(to) => self.state.player_mut(to)?.credit(amount),
            Creditor::Opponents { per_head } => {
                for other in self.state.active_opponents(debtor) {
                    self.state.player_mut(other)?.credit(per_head);
                }
            }
        }
        Ok(())
    }

    /// Pay all outstanding debts once cash covers them
    fn try_settle(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let GamePhase::RaisingFunds { debts } = &self.state.phase else {
            return Ok(());
        };
        let debts = debts.clone();
        let total: Money = debts.iter().map(|d| d.amount).sum();
        if !self.state.player(player)?.can_afford(total) {
            return Ok(());
        }

        for debt in debts {
            self.transfer(player, debt.amount, debt.creditor)?;
            match debt.creditor {
                Creditor::Bank => events.push(GameEvent::PaidBank {
                    player,
                    amount: debt.amount,
                }),
                Creditor::Player(to) => events.push(GameEvent::PaidPlayer {
                    from: player,
                    to,
                    amount: debt.amount,
                }),
                Creditor::Opponents { per_head } => {
                    for to in self.state.active_opponents(player) {
                        events.push(GameEvent::PaidPlayer {
                            from: player,
                            to,
                            amount: per_head,
                        });
                    }
                }
            }
        }

        events.push(GameEvent::DebtSettled {
            player,
            amount: total,
        });
        self.state.phase = GamePhase::AwaitingAction;
        Ok(())
    }

    /// Sell buildings, then mortgage in advice order, until `target` is covered
    fn auto_liquidate(&mut self, player: PlayerId, target: Money, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        while !self.state.player(player)?.can_afford(target) {
            if let Some(&estate) = self.state.estates.developed_by(player).first() {
                let refund = self
                    .state
                    .estates
                    .check_sell_building(&self.state.board, player, estate)?;
                let buildings = self.state.estates.sell_building(estate)?;
                self.state.player_mut(player)?.credit(refund);
                events.push(GameEvent::BuildingSold {
                    player,
                    estate,
                    buildings,
                    refund,
                });
                continue;
            }

            let Some(advice) = self.state.mortgage_advice(player).into_iter().next() else {
                break;
            };
            self.state.estates.set_mortgaged(advice.estate, true)?;
            self.state.player_mut(player)?.credit(advice.raises);
            events.push(GameEvent::Mortgaged {
                player,
                estate: advice.estate,
                amount: advice.raises,
            });
        }
        Ok(())
    }

    /// Eliminate a player, handing their assets to the creditor
    fn bankrupt(&mut self, player: PlayerId, creditor: Creditor, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let refund = self.state.estates.clear_buildings(&self.state.board, player);

        let p = self.state.player_mut(player)?;
        p.credit(refund);
        let cash = p.balance;
        let holdings = std::mem::take(&mut p.estates);
        p.balance = 0;
        p.jail_cards = 0;
        p.bankrupt = true;
        p.release();

        let heir = match creditor {
            Creditor::Player(to) if self.state.player(to).is_ok_and(|h| h.is_active()) => Some(to),
            _ => None,
        };

        match heir {
            Some(to) => {
                for &estate in &holdings {
                    self.state.estates.set_owner(estate, Some(to))?;
                }
                let h = self.state.player_mut(to)?;
                h.credit(cash);
                h.estates.extend(holdings);
            }
            None => {
                for &estate in &holdings {
                    self.state.estates.set_owner(estate, None)?;
                    self.state.estates.set_mortgaged(estate, false)?;
                }
            }
        }

        warn!(player, ?creditor, "player bankrupt");
        events.push(GameEvent::Bankrupt { player, creditor });

        let involved = match &self.state.pending_trade {
            Some(trade) => trade.involves(player),
            None => false,
        };
        if involved {
            self.state.pending_trade = None;
        }

        if let Some(winner) = self.state.sole_survivor() {
            self.state.phase = GamePhase::Finished { winner };
            events.push(GameEvent::GameWon { player: winner });
            return Ok(());
        }

        if player == self.state.current_player {
            self.advance_turn(player, events);
        }
        Ok(())
    }

    // ==================== Turn Management ====================

    fn advance_turn(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) {
        self.state.phase = GamePhase::TurnComplete;
        self.state.pending_trade = None;
        self.state.purchase_offer = None;
        self.state.last_roll = None;

        let next_player = self.state.next_active_after(player);
        self.state.current_player = next_player;
        self.state.turn_number += 1;
        self.state.phase = GamePhase::AwaitingRoll;

        events.push(GameEvent::TurnEnded {
            player,
            next_player,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::LoadedDice;
    use pretty_assertions::assert_eq;

    fn game(rolls: &[(u8, u8)]) -> Game<LoadedDice> {
        Game::with_dice(
            vec!["Alice".into(), "Bob".into()],
            Rules::default(),
            LoadedDice::new(rolls.iter().copied()),
            1,
        )
        .expect("valid setup")
    }

    fn own(game: &mut Game<LoadedDice>, player: PlayerId, estates: &[SpaceIndex]) {
        for &i in estates {
            game.state.estates.set_owner(i, Some(player)).expect("estate");
            game.state.players[usize::from(player)].estates.insert(i);
        }
    }

    #[test]
    fn test_new_game_awaits_first_roll() {
        let game = game(&[]);
        assert_eq!(game.state.phase, GamePhase::AwaitingRoll);
        assert_eq!(game.state.current_player, 0);
        assert!(game.state.players.iter().all(|p| p.balance == 1500));
    }

    #[test]
    fn test_player_count_limits() {
        let too_few = Game::new(vec!["Solo".into()], Rules::default(), 1);
        assert_eq!(
            too_few.err(),
            Some(SetupError::PlayerCount {
                count: 1,
                min: 2,
                max: 8
            })
        );

        let names = (0..9).map(|i| format!("P{i}")).collect();
        assert!(Game::new(names, Rules::default(), 1).is_err());

        let names = (0..8).map(|i| format!("P{i}")).collect();
        assert!(Game::new(names, Rules::default(), 1).is_ok());
    }

    #[test]
    fn test_setup_valid_actions() {
        let game = game(&[]);
        assert_eq!(game.state.valid_actions(0), vec![GameAction::RollDice]);
        assert!(game.state.valid_actions(1).is_empty());
    }

    #[test]
    fn test_out_of_phase_commands_rejected() {
        let mut game = game(&[]);
        let before = game.state.players.clone();

        assert_eq!(game.end_turn(0), Err(GameError::InvalidPhase));
        assert_eq!(game.buy_current_estate(0), Err(GameError::InvalidPhase));
        assert_eq!(game.roll_dice(1).err(), Some(GameError::NotYourTurn));
        assert_eq!(game.apply_action(9, GameAction::RollDice), Err(GameError::UnknownPlayer(9)));

        assert_eq!(game.state.players, before);
        assert_eq!(game.state.phase, GamePhase::AwaitingRoll);
    }

    #[test]
    fn test_roll_moves_and_offers_purchase() {
        let mut game = game(&[(2, 3)]);
        let outcome = game.roll_dice(0).expect("roll");
        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.moved_to, 5);
        assert!(outcome.events.contains(&GameEvent::PurchaseOffered {
            player: 0,
            estate: 5,
            price: 200
        }));
        assert_eq!(game.state.phase, GamePhase::AwaitingAction);

        game.buy_current_estate(0).expect("buy");
        assert_eq!(game.state.players[0].balance, 1300);
        assert_eq!(game.state.estates.owner(5), Some(0));
        assert_eq!(game.buy_current_estate(0), Err(GameError::NoPurchaseOffer));
    }

    #[test]
    fn test_end_turn_advances_player() {
        let mut game = game(&[(2, 3)]);
        game.roll_dice(0).expect("roll");
        let events = game.end_turn(0).expect("end");
        assert_eq!(
            events,
            vec![GameEvent::TurnEnded {
                player: 0,
                next_player: 1
            }]
        );
        assert_eq!(game.state.current_player, 1);
        assert_eq!(game.state.phase, GamePhase::AwaitingRoll);
        assert_eq!(game.state.turn_number, 2);
    }

    #[test]
    fn test_rent_paid_and_narrated() {
        let mut game = game(&[(1, 2)]);
        own(&mut game, 1, &[3]);
        let events = game.roll_dice(0).expect("roll").events;
        assert_eq!(game.state.players[0].balance, 1496);
        assert_eq!(game.state.players[1].balance, 1504);
        let lines = game.state.narrate_all(&events);
        assert_eq!(lines.last().map(String::as_str), Some("Alice paid $4 in rent to Bob"));
        assert_eq!(game.state.log, lines);
    }

    #[test]
    fn test_go_to_jail_corner() {
        let mut game = game(&[(6, 4)]);
        game.state.players[0].position = 20;
        game.roll_dice(0).expect("roll");
        let alice = &game.state.players[0];
        assert_eq!(alice.position, 10);
        assert!(alice.jail.in_jail);
        assert_eq!(game.state.purchase_offer, None);
    }

    #[test]
    fn test_jail_stay_then_double_release() {
        let mut game = game(&[(1, 2), (4, 4)]);
        game.state.players[0].imprison(10);

        let events = game.roll_dice(0).expect("roll").events;
        assert!(events.contains(&GameEvent::StayedInJail { player: 0, turns: 1 }));
        assert_eq!(game.state.players[0].position, 10);
        assert_eq!(game.state.phase, GamePhase::AwaitingAction);

        game.end_turn(0).expect("end");
        game.state.current_player = 0;

        let outcome = game.roll_dice(0).expect("roll");
        assert!(outcome.events.contains(&GameEvent::ReleasedFromJail {
            player: 0,
            how: JailRelease::RolledDouble
        }));
        assert_eq!(outcome.moved_to, 18);
    }

    #[test]
    fn test_jail_card_and_fine() {
        let mut game = game(&[]);
        assert_eq!(game.use_jail_card(0), Err(GameError::NotInJail));

        game.state.players[0].imprison(10);
        assert_eq!(game.use_jail_card(0), Err(GameError::NoJailCard));

        game.state.players[0].jail_cards = 1;
        game.use_jail_card(0).expect("card");
        assert!(!game.state.players[0].jail.in_jail);
        assert_eq!(game.state.players[0].jail_cards, 0);

        game.state.players[0].imprison(10);
        game.pay_jail_fine(0).expect("fine");
        assert_eq!(game.state.players[0].balance, 1450);
        assert!(!game.state.players[0].jail.in_jail);
    }

    #[test]
    fn test_tax_shortfall_enters_raising_funds() {
        let mut game = game(&[(2, 2)]);
        own(&mut game, 0, &[1, 3]);
        game.state.players[0].balance = 150;

        let events = game.roll_dice(0).expect("roll").events;
        assert!(events.contains(&GameEvent::PaymentShortfall {
            player: 0,
            due: 200,
            balance: 150
        }));
        assert_eq!(game.end_turn(0), Err(GameError::DebtOutstanding));

        game.mortgage(0, 1).expect("mortgage");
        assert_eq!(game.state.outstanding_debt(), 200);

        let events = game.mortgage(0, 3).expect("mortgage");
        assert!(events.contains(&GameEvent::DebtSettled { player: 0, amount: 200 }));
        assert_eq!(game.state.players[0].balance, 150 + 30 + 30 - 200);
        assert_eq!(game.state.phase, GamePhase::AwaitingAction);
    }

    #[test]
    fn test_insolvent_player_is_eliminated() {
        let mut game = game(&[(1, 2)]);
        own(&mut game, 1, &[3]);
        own(&mut game, 0, &[5]);
        game.state.players[0].balance = 1;
        game.state.estates.set_mortgaged(5, true).expect("estate");

        let events = game.roll_dice(0).expect("roll").events;
        assert!(events.contains(&GameEvent::Bankrupt {
            player: 0,
            creditor: Creditor::Player(1)
        }));
        assert!(events.contains(&GameEvent::GameWon { player: 1 }));
        assert_eq!(game.state.get_winner(), Some(1));

        // Assets pass to the creditor, mortgage flag intact
        assert_eq!(game.state.estates.owner(5), Some(1));
        assert!(game.state.estates.get(5).is_some_and(|e| e.mortgaged));
        assert_eq!(game.state.players[1].balance, 1501);
        assert_eq!(game.roll_dice(1).err(), Some(GameError::GameOver));
    }

    #[test]
    fn test_bankrupt_player_is_skipped() {
        let mut game = Game::with_dice(
            vec!["Alice".into(), "Bob".into(), "Carol".into()],
            Rules::default(),
            LoadedDice::new([(2, 2)]),
            1,
        )
        .expect("valid setup");
        game.state.players[0].balance = 10;

        let events = game.roll_dice(0).expect("roll").events;
        assert!(events.contains(&GameEvent::Bankrupt {
            player: 0,
            creditor: Creditor::Bank
        }));
        assert_eq!(game.state.current_player, 1);
        assert_eq!(game.state.phase, GamePhase::AwaitingRoll);

        game.state.current_player = 2;
        game.state.phase = GamePhase::AwaitingAction;
        game.end_turn(2).expect("end");
        assert_eq!(game.state.current_player, 1);
    }

    #[test]
    fn test_roll_outcome_survives_bankruptcy() {
        let mut game = Game::with_dice(
            vec!["Alice".into(), "Bob".into(), "Carol".into()],
            Rules::default(),
            LoadedDice::new([(2, 2)]),
            1,
        )
        .expect("valid setup");
        game.state.players[0].balance = 10;

        let outcome = game.roll_dice(0).expect("roll");
        assert_eq!(outcome.dice, DiceRoll(2, 2));
        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.moved_to, 4);
        assert!(game.state.players[0].bankrupt);
        assert_eq!(game.state.current_player, 1);
        assert_eq!(game.state.last_roll, None);
    }

    #[test]
    fn test_rules_beyond_seat_range_rejected() {
        let rules = Rules {
            max_players: 300,
            ..Rules::default()
        };
        let result = Game::new(vec!["Alice".into(), "Bob".into()], rules, 1);
        assert_eq!(
            result.err(),
            Some(SetupError::SeatLimit {
                max: 300,
                limit: 256
            })
        );
    }

    #[test]
    fn test_charge_while_raising_funds_uses_free_cash() {
        let mut game = game(&[]);
        own(&mut game, 0, &[39]);
        game.state.players[0].balance = 500;
        game.state.phase = GamePhase::RaisingFunds {
            debts: vec![Debt {
                creditor: Creditor::Bank,
                amount: 200,
            }],
        };

        let mut events = Vec::new();
        let settled = game
            .charge(0, 100, Creditor::Player(1), &mut events)
            .expect("charge");
        assert_eq!(settled, Settlement::Paid);
        assert!(events.is_empty());
        assert_eq!(game.state.players[0].balance, 400);
        assert_eq!(game.state.players[1].balance, 1600);
        assert_eq!(game.state.outstanding_debt(), 200);

        game.state.players[0].balance = 150;
        let settled = game.charge(0, 100, Creditor::Bank, &mut events).expect("charge");
        assert_eq!(settled, Settlement::Deferred);
        assert_eq!(
            events,
            vec![GameEvent::PaymentShortfall {
                player: 0,
                due: 300,
                balance: 150
            }]
        );
        assert_eq!(game.state.outstanding_debt(), 300);
    }
}
