//! Hot-seat console game.
//!
//! Usage: `monopoly <name> <name> [name...]`
//!
//! Environment:
//! - `MONOPOLY_RULES`: path to a JSON rules file
//! - `MONOPOLY_SEED`: seed for dice and decks
//! - `RUST_LOG`: log filter (default `warn`)

use anyhow::{bail, Context};
use monopoly_core::{Game, GameAction, GameState, PlayerId, Rules, TradeState};
use rand::Rng;
use std::io::{self, BufRead, Write};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod view;

use commands::Command;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let names: Vec<String> = std::env::args().skip(1).collect();
    let rules = load_rules()?;
    if names.len() < rules.min_players {
        bail!("usage: monopoly <name> <name> [name...]");
    }

    let seed: u64 = match std::env::var("MONOPOLY_SEED") {
        Ok(s) => s.parse().context("MONOPOLY_SEED must be an integer")?,
        Err(_) => rand::thread_rng().gen(),
    };
    info!(seed, "starting game");

    let mut game = Game::new(names, rules, seed)?;
    println!("{}", view::status(&game.state));
    println!("Type 'help' for commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while !game.state.is_finished() {
        let player = acting_player(&game.state);
        print!("{}", view::prompt(&game.state, player));
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        match commands::parse(&line, &game.state) {
            Ok(Command::Quit) => break,
            Ok(command) => run(&mut game, player, command)?,
            Err(e) => println!("{e}"),
        }
    }

    if let Some(winner) = game.state.get_winner().and_then(|w| game.state.get_player(w)) {
        println!("{} wins!", winner.name);
    }
    Ok(())
}

/// Rules from `MONOPOLY_RULES`, or the standard rules
fn load_rules() -> anyhow::Result<Rules> {
    match std::env::var("MONOPOLY_RULES") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading rules from {path}"))?;
            Rules::from_json(&json).with_context(|| format!("parsing rules in {path}"))
        }
        Err(_) => Ok(Rules::default()),
    }
}

/// The counterparty answers an open offer; otherwise the current player acts
fn acting_player(state: &GameState) -> PlayerId {
    match &state.pending_trade {
        Some(TradeState::AwaitingResponse { offer }) => offer.counterparty,
        _ => state.current_player,
    }
}

fn run(game: &mut Game, player: PlayerId, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Play(action) => play(game, player, action),
        Command::Status => print!("{}", view::status(&game.state)),
        Command::Board => print!("{}", view::board(&game.state)),
        Command::Actions => {
            for action in game.state.valid_actions(player) {
                println!("{action:?}");
            }
        }
        Command::Advice => println!("{}", view::advice(&game.state, player)),
        Command::Log => {
            for line in &game.state.log {
                println!("{line}");
            }
        }
        Command::Save => println!("{}", serde_json::to_string_pretty(&game.state)?),
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn play(game: &mut Game, player: PlayerId, action: GameAction) {
    match game.apply_action(player, action) {
        Ok(events) => {
            for line in game.state.narrate_all(&events) {
                println!("{line}");
            }
        }
        Err(e) => println!("Cannot do that: {e}"),
    }
}
