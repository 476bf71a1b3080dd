//! Text rendering of the game state.

use monopoly_core::{Buildings, GamePhase, GameState, PlayerId, SpaceKind};
use std::fmt::Write;

/// One-line prompt for the player who has to act
pub fn prompt(state: &GameState, player: PlayerId) -> String {
    match state.get_player(player) {
        Some(p) => format!(
            "[{} ${} @ {}] > ",
            p.name,
            p.balance,
            state.board.space(p.position).name
        ),
        None => "> ".to_string(),
    }
}

pub fn status(state: &GameState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Turn {} - {}", state.turn_number, phase(&state.phase));
    for p in &state.players {
        let marker = if p.id == state.current_player { '*' } else { ' ' };
        if p.bankrupt {
            let _ = writeln!(out, "{marker} {} (bankrupt)", p.name);
            continue;
        }
        let jail = if p.jail.in_jail { " [in jail]" } else { "" };
        let _ = writeln!(
            out,
            "{marker} {:<12} ${:<6} {:<24} estates: {:<2} jail cards: {}{}",
            p.name,
            p.balance,
            state.board.space(p.position).name,
            p.estates.len(),
            p.jail_cards,
            jail
        );
    }
    out
}

fn phase(phase: &GamePhase) -> String {
    match phase {
        GamePhase::AwaitingRoll => "waiting for a roll".to_string(),
        GamePhase::Resolving => "resolving".to_string(),
        GamePhase::AwaitingAction => "actions".to_string(),
        GamePhase::RaisingFunds { debts } => {
            let total: i64 = debts.iter().map(|d| d.amount).sum();
            format!("raising ${total}")
        }
        GamePhase::TurnComplete => "turn complete".to_string(),
        GamePhase::Finished { winner } => format!("finished, player {winner} won"),
    }
}

pub fn board(state: &GameState) -> String {
    let mut out = String::new();
    for (i, space) in state.board.spaces() {
        let _ = write!(out, "{i:>2} {:<24}", space.name);
        if let Some(estate) = state.estates.get(i) {
            let owner = estate
                .owner
                .and_then(|o| state.get_player(o))
                .map_or("-", |p| p.name.as_str());
            let _ = write!(out, " ${:<4} {:<12}", space.price, owner);
            if estate.mortgaged {
                out.push_str(" mortgaged");
            }
            match estate.buildings {
                Buildings::Hotel => out.push_str(" hotel"),
                Buildings::Houses(0) => {}
                Buildings::Houses(n) => {
                    let _ = write!(out, " {n} house(s)");
                }
            }
        } else if space.kind == SpaceKind::Tax {
            let _ = write!(out, " pay ${}", space.price);
        }
        let here: Vec<&str> = state
            .players
            .iter()
            .filter(|p| p.is_active() && p.position == i)
            .map(|p| p.name.as_str())
            .collect();
        if !here.is_empty() {
            let _ = write!(out, "  <- {}", here.join(", "));
        }
        out.push('\n');
    }
    out
}

pub fn advice(state: &GameState, player: PlayerId) -> String {
    let advice = state.mortgage_advice(player);
    if advice.is_empty() {
        return "Nothing to mortgage".to_string();
    }
    advice
        .iter()
        .map(|a| {
            format!(
                "{:<24} raises ${:<4} loses ${} rent",
                state.board.space(a.estate).name,
                a.raises,
                a.rent_forgone
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use monopoly_core::{Game, Rules};

    #[test]
    fn test_status_marks_current_player() {
        let game = Game::new(vec!["Alice".into(), "Bob".into()], Rules::default(), 1)
            .expect("valid setup");
        let text = status(&game.state);
        assert!(text.starts_with("Turn 1 - waiting for a roll"));
        assert!(text.contains("* Alice"));
        assert!(text.contains("  Bob"));
    }

    #[test]
    fn test_board_lists_every_space() {
        let game = Game::new(vec!["Alice".into(), "Bob".into()], Rules::default(), 1)
            .expect("valid setup");
        let text = board(&game.state);
        assert_eq!(text.lines().count(), 40);
        assert!(text.lines().next().is_some_and(|l| l.contains("<- Alice, Bob")));
    }
}
