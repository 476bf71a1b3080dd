//! WebAssembly bindings for the game engine.
//!
//! Everything crosses the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::actions::GameAction;
use crate::game::Game;
use crate::rules::Rules;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    game: Game,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game.
    ///
    /// `rules_json` may be empty for the standard rules.
    #[wasm_bindgen(constructor)]
    pub fn new(player_names_json: &str, rules_json: &str, seed: u32) -> Result<WasmGame, JsValue> {
        let player_names: Vec<String> = serde_json::from_str(player_names_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid player names: {}", e)))?;

        let rules = if rules_json.trim().is_empty() {
            Rules::default()
        } else {
            Rules::from_json(rules_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid rules: {}", e)))?
        };

        let game = Game::new(player_names, rules, u64::from(seed))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { game })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.game.state).unwrap_or_else(|_| "{}".to_string())
    }

    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.game.state.current_player
    }

    /// Get valid actions for a specific player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self, player: u8) -> String {
        let actions = self.game.state.valid_actions(player);
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns the narrated events as a JSON array
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.game.apply_action(player, action) {
            Ok(events) => {
                let lines = self.game.state.narrate_all(&events);
                Ok(serde_json::to_string(&lines).unwrap_or_else(|_| "[]".to_string()))
            }
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Full narrated history
    #[wasm_bindgen(js_name = getLog)]
    pub fn get_log(&self) -> String {
        serde_json::to_string(&self.game.state.log).unwrap_or_else(|_| "[]".to_string())
    }

    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.game.state.is_finished()
    }

    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<u8> {
        self.game.state.get_winner()
    }

    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        serde_json::to_string(&self.game.state.phase).unwrap_or_else(|_| "\"Unknown\"".to_string())
    }

    #[wasm_bindgen(js_name = getDiceRoll)]
    pub fn get_dice_roll(&self) -> Option<Vec<u8>> {
        self.game.state.last_roll.map(|r| vec![r.0, r.1])
    }

    /// Get board spaces as JSON (for rendering)
    #[wasm_bindgen(js_name = getBoard)]
    pub fn get_board(&self) -> String {
        let spaces: Vec<_> = self.game.state.board.spaces().map(|(_, s)| s).collect();
        serde_json::to_string(&spaces).unwrap_or_else(|_| "[]".to_string())
    }

    #[wasm_bindgen(js_name = getPlayer)]
    pub fn get_player(&self, player: u8) -> String {
        if let Some(p) = self.game.state.get_player(player) {
            serde_json::to_string(p).unwrap_or_else(|_| "{}".to_string())
        } else {
            "null".to_string()
        }
    }

    /// Mortgage candidates for a player, best first
    #[wasm_bindgen(js_name = getMortgageAdvice)]
    pub fn get_mortgage_advice(&self, player: u8) -> String {
        let advice = self.game.state.mortgage_advice(player);
        serde_json::to_string(&advice).unwrap_or_else(|_| "[]".to_string())
    }
}
