//! Dice sources.
//!
//! The engine never rolls on its own: it asks a [`Dice`] implementation, so
//! hosts use seeded random dice and tests script exact rolls.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A pair of six-sided dice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll(pub u8, pub u8);

impl DiceRoll {
    /// Sum of both dice
    pub fn total(&self) -> u8 {
        self.0 + self.1
    }

    /// Whether both dice show the same face
    pub fn is_double(&self) -> bool {
        self.0 == self.1
    }
}

/// Anything that can produce a roll of two dice
pub trait Dice {
    fn roll(&mut self) -> DiceRoll;
}

/// Uniform dice driven by a seeded generator
#[derive(Debug, Clone)]
pub struct RandomDice {
    rng: ChaCha8Rng,
}

impl RandomDice {
    /// Dice that replay identically for the same seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Dice seeded from the thread generator
    pub fn from_entropy() -> Self {
        Self::seeded(rand::thread_rng().gen())
    }
}

impl Dice for RandomDice {
    fn roll(&mut self) -> DiceRoll {
        DiceRoll(self.rng.gen_range(1..=6), self.rng.gen_range(1..=6))
    }
}

/// Dice that return a scripted sequence, for tests and replays.
///
/// Once the script runs out every roll is a non-double (1, 2).
#[derive(Debug, Clone, Default)]
pub struct LoadedDice {
    rolls: VecDeque<DiceRoll>,
}

impl LoadedDice {
    pub fn new(rolls: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self {
            rolls: rolls.into_iter().map(|(a, b)| DiceRoll(a, b)).collect(),
        }
    }

    /// Append more rolls to the script
    pub fn push(&mut self, a: u8, b: u8) {
        self.rolls.push_back(DiceRoll(a, b));
    }

    /// Rolls left in the script
    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl Dice for LoadedDice {
    fn roll(&mut self) -> DiceRoll {
        self.rolls.pop_front().unwrap_or(DiceRoll(1, 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_dice_in_range() {
        let mut dice = RandomDice::seeded(7);
        for _ in 0..1000 {
            let roll = dice.roll();
            assert!((1..=6).contains(&roll.0));
            assert!((1..=6).contains(&roll.1));
            assert!((2..=12).contains(&roll.total()));
        }
    }

    #[test]
    fn test_same_seed_same_rolls() {
        let mut a = RandomDice::seeded(42);
        let mut b = RandomDice::seeded(42);
        let rolls_a: Vec<DiceRoll> = (0..20).map(|_| a.roll()).collect();
        let rolls_b: Vec<DiceRoll> = (0..20).map(|_| b.roll()).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    #[test]
    fn test_loaded_dice_follow_script() {
        let mut dice = LoadedDice::new([(3, 3), (6, 5)]);
        assert_eq!(dice.roll(), DiceRoll(3, 3));
        assert!(DiceRoll(3, 3).is_double());
        assert_eq!(dice.roll().total(), 11);
        assert_eq!(dice.remaining(), 0);
        assert_eq!(dice.roll(), DiceRoll(1, 2));
    }
}
