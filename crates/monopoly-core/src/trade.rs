//! Cash-for-estate trading between two players.
//!
//! A trade runs inside the initiator's turn in three steps: pick a
//! counterparty, offer cash for one of their estates, and let the
//! counterparty accept or decline. Nothing changes hands until acceptance.

use crate::actions::{GameEvent, TradeOffer};
use crate::board::{Money, PlayerId, SpaceIndex};
use crate::dice::Dice;
use crate::game::{Game, GameError, GamePhase};
use serde::{Deserialize, Serialize};

/// Where an open trade stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    /// Counterparty chosen, waiting for the initiator's offer
    SelectingEstate {
        initiator: PlayerId,
        counterparty: PlayerId,
    },
    /// Offer made, waiting for the counterparty
    AwaitingResponse { offer: TradeOffer },
}

impl TradeState {
    pub fn initiator(&self) -> PlayerId {
        match self {
            TradeState::SelectingEstate { initiator, .. } => *initiator,
            TradeState::AwaitingResponse { offer } => offer.initiator,
        }
    }

    pub fn counterparty(&self) -> PlayerId {
        match self {
            TradeState::SelectingEstate { counterparty, .. } => *counterparty,
            TradeState::AwaitingResponse { offer } => offer.counterparty,
        }
    }

    /// Whether a player is on either side of the trade
    pub fn involves(&self, player: PlayerId) -> bool {
        self.initiator() == player || self.counterparty() == player
    }
}

impl<D: Dice> Game<D> {
    fn ensure_trading_phase(&self) -> Result<(), GameError> {
        self.ensure_phase(|p| matches!(p, GamePhase::AwaitingAction))
    }

    pub(crate) fn handle_start_trade(
        &mut self,
        player: PlayerId,
        counterparty: PlayerId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        self.ensure_trading_phase()?;

        if self.state.pending_trade.is_some() {
            return Err(GameError::TradeInProgress);
        }
        if counterparty == player {
            return Err(GameError::TradeWithSelf);
        }
        let other = self.state.player(counterparty)?;
        if !other.is_active() {
            return Err(GameError::UnknownPlayer(counterparty));
        }
        if other.estates.is_empty() {
            return Err(GameError::NothingToTrade(counterparty));
        }

        self.state.pending_trade = Some(TradeState::SelectingEstate {
            initiator: player,
            counterparty,
        });
        events.push(GameEvent::TradeStarted {
            initiator: player,
            counterparty,
        });
        Ok(())
    }

    /// Check an offer can be executed right now
    fn validate_offer(&self, offer: &TradeOffer) -> Result<(), GameError> {
        if offer.cash <= 0 {
            return Err(GameError::InvalidOffer);
        }
        if self.state.estates.owner(offer.estate) != Some(offer.counterparty) {
            return Err(GameError::NotOwner(offer.estate));
        }
        // Developed groups have to be sold down before they can change hands
        if self
            .state
            .estates
            .group_has_buildings(&self.state.board, offer.estate)
        {
            return Err(GameError::HasBuildings(offer.estate));
        }
        let buyer = self.state.player(offer.initiator)?;
        if !buyer.can_afford(offer.cash) {
            return Err(GameError::CannotAfford {
                needed: offer.cash,
                available: buyer.balance,
            });
        }
        Ok(())
    }

    pub(crate) fn handle_propose_trade(
        &mut self,
        player: PlayerId,
        estate: SpaceIndex,
        cash: Money,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        self.ensure_trading_phase()?;

        let counterparty = match &self.state.pending_trade {
            Some(TradeState::SelectingEstate {
                initiator,
                counterparty,
            }) if *initiator == player => *counterparty,
            Some(_) => return Err(GameError::InvalidPhase),
            None => return Err(GameError::NoActiveTrade),
        };

        let offer = TradeOffer {
            initiator: player,
            counterparty,
            estate,
            cash,
        };
        self.validate_offer(&offer)?;

        self.state.pending_trade = Some(TradeState::AwaitingResponse {
            offer: offer.clone(),
        });
        events.push(GameEvent::TradeProposed { offer });
        Ok(())
    }

    pub(crate) fn handle_respond_trade(
        &mut self,
        player: PlayerId,
        accept: bool,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.ensure_trading_phase()?;

        let offer = match &self.state.pending_trade {
            Some(TradeState::AwaitingResponse { offer }) => offer.clone(),
            _ => return Err(GameError::NoActiveTrade),
        };
        if player != offer.counterparty {
            return Err(GameError::NotYourTurn);
        }

        if !accept {
            self.state.pending_trade = None;
            events.push(GameEvent::TradeDeclined { offer });
            return Ok(());
        }

        // Balances or ownership may have moved since the offer was made
        self.validate_offer(&offer)?;

        self.state.player_mut(offer.initiator)?.debit(offer.cash);
        let seller = self.state.player_mut(offer.counterparty)?;
        seller.credit(offer.cash);
        seller.estates.remove(&offer.estate);
        self.state
            .player_mut(offer.initiator)?
            .estates
            .insert(offer.estate);
        // The mortgage flag travels with the estate
        self.state
            .estates
            .set_owner(offer.estate, Some(offer.initiator))?;

        self.state.pending_trade = None;
        events.push(GameEvent::TradeCompleted { offer });
        Ok(())
    }

    pub(crate) fn handle_cancel_trade(
        &mut self,
        player: PlayerId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        if self.state.pending_trade.take().is_none() {
            return Err(GameError::NoActiveTrade);
        }
        events.push(GameEvent::TradeCancelled { initiator: player });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::LoadedDice;
    use crate::rules::Rules;
    use pretty_assertions::assert_eq;

    const OLD_KENT: SpaceIndex = 1;
    const WHITECHAPEL: SpaceIndex = 3;

    /// Alice to move in AwaitingAction, Bob holding both brown properties
    fn trading_game() -> Game<LoadedDice> {
        let mut game = Game::with_dice(
            vec!["Alice".into(), "Bob".into(), "Carol".into()],
            Rules::default(),
            LoadedDice::default(),
            5,
        )
        .expect("valid setup");
        for i in [OLD_KENT, WHITECHAPEL] {
            game.state.estates.set_owner(i, Some(1)).expect("estate");
            game.state.players[1].estates.insert(i);
        }
        game.state.phase = GamePhase::AwaitingAction;
        game
    }

    #[test]
    fn test_accepted_trade_moves_estate_and_cash() {
        let mut game = trading_game();
        game.start_trade(0, 1).expect("start");
        game.propose_trade(0, OLD_KENT, 100).expect("propose");

        let events = game.respond_trade(1, true).expect("respond");
        assert_eq!(
            events,
            vec![GameEvent::TradeCompleted {
                offer: TradeOffer {
                    initiator: 0,
                    counterparty: 1,
                    estate: OLD_KENT,
                    cash: 100
                }
            }]
        );
        assert_eq!(game.state.estates.owner(OLD_KENT), Some(0));
        assert!(game.state.players[0].estates.contains(&OLD_KENT));
        assert!(!game.state.players[1].estates.contains(&OLD_KENT));
        assert_eq!(game.state.players[0].balance, 1400);
        assert_eq!(game.state.players[1].balance, 1600);
        assert_eq!(game.state.pending_trade, None);
    }

    #[test]
    fn test_mortgage_travels_with_estate() {
        let mut game = trading_game();
        game.state.estates.set_mortgaged(OLD_KENT, true).expect("estate");
        game.start_trade(0, 1).expect("start");
        game.propose_trade(0, OLD_KENT, 10).expect("propose");
        game.respond_trade(1, true).expect("respond");
        assert!(game.state.estates.get(OLD_KENT).is_some_and(|e| e.mortgaged));
    }

    #[test]
    fn test_start_trade_rejections() {
        let mut game = trading_game();
        assert_eq!(game.start_trade(0, 0), Err(GameError::TradeWithSelf));
        assert_eq!(game.start_trade(0, 2), Err(GameError::NothingToTrade(2)));
        assert_eq!(game.start_trade(1, 0), Err(GameError::NotYourTurn));

        game.start_trade(0, 1).expect("start");
        assert_eq!(game.start_trade(0, 1), Err(GameError::TradeInProgress));
    }

    #[test]
    fn test_offer_validation() {
        let mut game = trading_game();
        assert_eq!(
            game.propose_trade(0, OLD_KENT, 50),
            Err(GameError::NoActiveTrade)
        );

        game.start_trade(0, 1).expect("start");
        assert_eq!(game.propose_trade(0, OLD_KENT, 0), Err(GameError::InvalidOffer));
        assert_eq!(game.propose_trade(0, 5, 50), Err(GameError::NotOwner(5)));
        assert_eq!(
            game.propose_trade(0, OLD_KENT, 5000),
            Err(GameError::CannotAfford {
                needed: 5000,
                available: 1500
            })
        );

        game.state.estates.build(WHITECHAPEL).expect("buildable");
        assert_eq!(
            game.propose_trade(0, OLD_KENT, 50),
            Err(GameError::HasBuildings(OLD_KENT))
        );
    }

    #[test]
    fn test_only_counterparty_responds() {
        let mut game = trading_game();
        game.start_trade(0, 1).expect("start");
        assert_eq!(game.respond_trade(1, true), Err(GameError::NoActiveTrade));

        game.propose_trade(0, OLD_KENT, 80).expect("propose");
        assert_eq!(game.respond_trade(0, true), Err(GameError::NotYourTurn));
        assert_eq!(game.respond_trade(2, true), Err(GameError::NotYourTurn));
    }

    #[test]
    fn test_acceptance_rechecks_affordability() {
        let mut game = trading_game();
        game.start_trade(0, 1).expect("start");
        game.propose_trade(0, OLD_KENT, 1000).expect("propose");
        game.state.players[0].balance = 999;

        assert_eq!(
            game.respond_trade(1, true),
            Err(GameError::CannotAfford {
                needed: 1000,
                available: 999
            })
        );
        assert_eq!(game.state.estates.owner(OLD_KENT), Some(1));
    }

    #[test]
    fn test_cancel_and_end_turn_close_trade() {
        let mut game = trading_game();
        assert_eq!(game.cancel_trade(0), Err(GameError::NoActiveTrade));

        game.start_trade(0, 1).expect("start");
        game.cancel_trade(0).expect("cancel");
        assert_eq!(game.state.pending_trade, None);

        game.start_trade(0, 1).expect("start");
        let events = game.end_turn(0).expect("end");
        assert_eq!(events[0], GameEvent::TradeCancelled { initiator: 0 });
        assert_eq!(game.state.pending_trade, None);
    }

    #[test]
    fn test_counterparty_sees_response_actions() {
        let mut game = trading_game();
        game.start_trade(0, 1).expect("start");
        game.propose_trade(0, OLD_KENT, 80).expect("propose");
        assert_eq!(
            game.state.valid_actions(1),
            vec![
                crate::actions::GameAction::RespondTrade { accept: true },
                crate::actions::GameAction::RespondTrade { accept: false },
            ]
        );
    }
}
