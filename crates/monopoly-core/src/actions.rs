//! Game actions that players can take.
//!
//! This module defines all possible commands a presentation layer can send
//! to the engine and the events that result from them.

use crate::board::{Money, PlayerId, SpaceIndex};
use crate::cards::DeckKind;
use crate::dice::DiceRoll;
use crate::estate::Buildings;
use crate::game::Creditor;
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Start of Turn ====================
    /// Roll the dice (must be done at start of turn)
    RollDice,
    /// Spend a held "get out of jail free" card before rolling
    UseJailCard,
    /// Pay the jail fine before rolling
    PayJailFine,

    // ==================== Estate Actions ====================
    /// Buy the unowned space the player just landed on
    BuyEstate,
    /// Add a house (or convert four houses to a hotel)
    Build(SpaceIndex),
    /// Sell one building step back to the bank
    SellBuilding(SpaceIndex),
    /// Mortgage an estate for half its price
    Mortgage(SpaceIndex),
    /// Lift a mortgage
    Unmortgage(SpaceIndex),

    // ==================== Trading Actions ====================
    /// Open a trade with another player
    StartTrade(PlayerId),
    /// Offer cash for one of the counterparty's estates
    ProposeTrade { estate: SpaceIndex, cash: Money },
    /// Counterparty accepts or declines the offer
    RespondTrade { accept: bool },
    /// Initiator abandons the trade
    CancelTrade,

    // ==================== Turn Management ====================
    /// Give up while unable to pay a debt
    DeclareBankruptcy,
    /// End your turn
    EndTurn,
}

/// A cash-for-estate offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Player paying cash
    pub initiator: PlayerId,
    /// Player giving up the estate
    pub counterparty: PlayerId,
    pub estate: SpaceIndex,
    pub cash: Money,
}

/// Why a player left jail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JailRelease {
    RolledDouble,
    ServedTime,
    UsedCard,
    PaidFine,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled { player: PlayerId, roll: DiceRoll },

    /// Token moved
    Moved {
        player: PlayerId,
        from: SpaceIndex,
        to: SpaceIndex,
    },

    /// Go bonus collected
    PassedGo { player: PlayerId, bonus: Money },

    /// Player stays in jail this turn
    StayedInJail { player: PlayerId, turns: u8 },

    /// Player left jail
    ReleasedFromJail { player: PlayerId, how: JailRelease },

    /// Player was sent to jail
    SentToJail { player: PlayerId },

    /// Tax paid to the bank
    TaxPaid {
        player: PlayerId,
        space: SpaceIndex,
        amount: Money,
    },

    /// A card was drawn
    CardDrawn {
        player: PlayerId,
        deck: DeckKind,
        description: String,
    },

    /// A jail-release card was kept
    JailCardGranted { player: PlayerId, held: u8 },

    /// Cash from the bank
    BankPaid { player: PlayerId, amount: Money },

    /// Cash to the bank
    PaidBank { player: PlayerId, amount: Money },

    /// Cash between two players (card transfers)
    PaidPlayer {
        from: PlayerId,
        to: PlayerId,
        amount: Money,
    },

    /// Rent changed hands
    RentPaid {
        from: PlayerId,
        to: PlayerId,
        estate: SpaceIndex,
        amount: Money,
    },

    /// Repair assessment charged
    RepairsAssessed {
        player: PlayerId,
        houses: u32,
        hotels: u32,
        amount: Money,
    },

    /// The player may buy the space they landed on
    PurchaseOffered {
        player: PlayerId,
        estate: SpaceIndex,
        price: Money,
    },

    /// Estate bought from the bank
    EstateBought {
        player: PlayerId,
        estate: SpaceIndex,
        price: Money,
    },

    /// A house or hotel was built
    BuildingBuilt {
        player: PlayerId,
        estate: SpaceIndex,
        buildings: Buildings,
        cost: Money,
    },

    /// A building step was sold back
    BuildingSold {
        player: PlayerId,
        estate: SpaceIndex,
        buildings: Buildings,
        refund: Money,
    },

    /// Estate mortgaged
    Mortgaged {
        player: PlayerId,
        estate: SpaceIndex,
        amount: Money,
    },

    /// Mortgage lifted
    Unmortgaged {
        player: PlayerId,
        estate: SpaceIndex,
        amount: Money,
    },

    /// Player cannot pay from cash and must raise funds
    PaymentShortfall {
        player: PlayerId,
        due: Money,
        balance: Money,
    },

    /// Outstanding debts paid after raising funds
    DebtSettled { player: PlayerId, amount: Money },

    /// Player eliminated
    Bankrupt { player: PlayerId, creditor: Creditor },

    /// Trade opened
    TradeStarted {
        initiator: PlayerId,
        counterparty: PlayerId,
    },

    /// Offer made
    TradeProposed { offer: TradeOffer },

    /// Offer accepted and executed
    TradeCompleted { offer: TradeOffer },

    /// Offer declined by the counterparty
    TradeDeclined { offer: TradeOffer },

    /// Trade abandoned before an offer was accepted
    TradeCancelled { initiator: PlayerId },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// A player won the game
    GameWon { player: PlayerId },
}
