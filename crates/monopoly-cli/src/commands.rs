//! Console command parsing.

use monopoly_core::{BoardError, GameAction, GameState, Money, PlayerId, SpaceIndex};
use thiserror::Error;

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward an action to the engine
    Play(GameAction),
    Status,
    Board,
    Actions,
    Advice,
    Log,
    Save,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Type a command, or 'help'")]
    Empty,

    #[error("Unknown command '{0}'")]
    Unknown(String),

    #[error("'{0}' needs {1}")]
    MissingArgument(&'static str, &'static str),

    #[error("'{0}' is not an amount")]
    BadAmount(String),

    #[error("No space called '{0}'")]
    UnknownSpace(String),

    #[error("Several spaces are called '{0}', use a board index")]
    AmbiguousSpace(String),

    #[error("No player called '{0}'")]
    UnknownPlayer(String),
}

pub const HELP: &str = "\
Turn:     roll | card | fine | end
Estates:  buy | build <space> | sell <space> | mortgage <space> | unmortgage <space>
Trading:  trade <player> | offer <space> <cash> | accept | decline | cancel
Debts:    bankrupt
Info:     status | board | actions | advice | log | save | help | quit
A <space> is a board index or a name; a <player> is a seat number or a name.";

/// Parse one input line against the current game
pub fn parse(line: &str, state: &GameState) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(CommandError::Empty);
    };
    let rest: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "roll" | "r" => Command::Play(GameAction::RollDice),
        "card" => Command::Play(GameAction::UseJailCard),
        "fine" => Command::Play(GameAction::PayJailFine),
        "end" | "done" => Command::Play(GameAction::EndTurn),
        "buy" | "b" => Command::Play(GameAction::BuyEstate),
        "build" => Command::Play(GameAction::Build(space_arg("build", &rest, state)?)),
        "sell" => Command::Play(GameAction::SellBuilding(space_arg("sell", &rest, state)?)),
        "mortgage" => Command::Play(GameAction::Mortgage(space_arg("mortgage", &rest, state)?)),
        "unmortgage" => {
            Command::Play(GameAction::Unmortgage(space_arg("unmortgage", &rest, state)?))
        }
        "trade" => Command::Play(GameAction::StartTrade(player_arg(&rest, state)?)),
        "offer" => {
            let (cash, space) = rest
                .split_last()
                .ok_or(CommandError::MissingArgument("offer", "a space and an amount"))?;
            if space.is_empty() {
                return Err(CommandError::MissingArgument("offer", "a space and an amount"));
            }
            Command::Play(GameAction::ProposeTrade {
                estate: resolve_space(&space.join(" "), state)?,
                cash: parse_amount(cash)?,
            })
        }
        "accept" | "yes" => Command::Play(GameAction::RespondTrade { accept: true }),
        "decline" | "no" => Command::Play(GameAction::RespondTrade { accept: false }),
        "cancel" => Command::Play(GameAction::CancelTrade),
        "bankrupt" => Command::Play(GameAction::DeclareBankruptcy),
        "status" | "s" => Command::Status,
        "board" => Command::Board,
        "actions" | "?" => Command::Actions,
        "advice" => Command::Advice,
        "log" => Command::Log,
        "save" => Command::Save,
        "help" | "h" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(CommandError::Unknown(verb.to_string())),
    };
    Ok(command)
}

fn space_arg(verb: &'static str, rest: &[&str], state: &GameState) -> Result<SpaceIndex, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument(verb, "a space"));
    }
    resolve_space(&rest.join(" "), state)
}

fn resolve_space(text: &str, state: &GameState) -> Result<SpaceIndex, CommandError> {
    if let Ok(index) = text.parse::<usize>() {
        if index < state.board.len() {
            return Ok(index as SpaceIndex);
        }
        return Err(CommandError::UnknownSpace(text.to_string()));
    }
    let name = state
        .board
        .spaces()
        .map(|(_, s)| s.name.as_str())
        .find(|name| name.eq_ignore_ascii_case(text))
        .unwrap_or(text);
    state.board.index_of(name).map_err(|e| match e {
        BoardError::AmbiguousName(_) => CommandError::AmbiguousSpace(text.to_string()),
        _ => CommandError::UnknownSpace(text.to_string()),
    })
}

fn player_arg(rest: &[&str], state: &GameState) -> Result<PlayerId, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument("trade", "a player"));
    }
    let text = rest.join(" ");
    if let Ok(id) = text.parse::<PlayerId>() {
        if state.get_player(id).is_some() {
            return Ok(id);
        }
    }
    state
        .players
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(&text))
        .map(|p| p.id)
        .ok_or(CommandError::UnknownPlayer(text))
}

fn parse_amount(text: &str) -> Result<Money, CommandError> {
    text.trim_start_matches('$')
        .parse()
        .map_err(|_| CommandError::BadAmount(text.to_string()))
}
