//! Game simulation - the main game loop.
//!
//! This module contains the deterministic game simulation that can be run
//! identically on all clients for lockstep multiplayer, and rewound to a
//! snapshot and re-simulated for rollback.

use glam::Vec3;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strafe_physics::{
    CapsuleShape, ConfigError, MovementEvent, MovementMode, PlayerController, TuningProfile,
};
use thiserror::Error;

use crate::input::PlayerInput;
use crate::level::Level;
use crate::player::{EntityId, Player};

/// Errors that can occur while saving or restoring a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Game simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulation tick rate (ticks per second).
    pub tick_rate: u32,

    /// Movement tuning shared by every player.
    pub profile: TuningProfile,

    /// Mouse sensitivity.
    pub mouse_sensitivity: f32,

    /// Base seed for per-player random streams.
    pub seed: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            profile: TuningProfile::default(),
            mouse_sensitivity: 2.0,
            seed: 0x5eed,
        }
    }
}

impl SimulationConfig {
    /// Get the time step per tick in seconds.
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

/// Everything that changes while the simulation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SimulationSnapshot {
    frame: u64,
    players: Vec<Player>,
    next_entity_id: EntityId,
}

/// The main game simulation.
///
/// This contains all game state and advances it deterministically based on
/// player inputs. For lockstep multiplayer, all clients run the same
/// simulation with the same inputs.
#[derive(Debug)]
pub struct Simulation {
    /// Current frame/tick number.
    pub frame: u64,

    /// Simulation configuration.
    pub config: SimulationConfig,

    /// Current level.
    pub level: Level,

    /// All players in the game.
    pub players: Vec<Player>,

    /// Movement events raised during the last tick.
    pub events: Vec<(EntityId, MovementEvent)>,

    /// Movement physics controller.
    movement_controller: PlayerController,

    /// Next entity ID to assign.
    next_entity_id: EntityId,
}

impl Simulation {
    /// Create a new simulation with the given configuration and level.
    pub fn new(config: SimulationConfig, level: Level) -> Result<Self, ConfigError> {
        let movement_controller = PlayerController::new(config.profile.clone())?;

        Ok(Self {
            frame: 0,
            config,
            level,
            players: Vec::new(),
            events: Vec::new(),
            movement_controller,
            next_entity_id: 1,
        })
    }

    /// Create a simulation with default configuration and test arena.
    pub fn test() -> Self {
        let config = SimulationConfig::default();
        let movement_controller = PlayerController::with_default_profile();

        Self {
            frame: 0,
            config,
            level: Level::test_arena(),
            players: Vec::new(),
            events: Vec::new(),
            movement_controller,
            next_entity_id: 1,
        }
    }

    /// Add a player to the simulation.
    ///
    /// Returns the player's ID.
    pub fn add_player(&mut self, name: &str) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        // Find a spawn point
        let spawn_index = self.players.len() % self.level.player_spawn_count().max(1);
        let spawn = self.level.get_player_spawn(spawn_index);

        let position = spawn.map(|s| s.position).unwrap_or(Vec3::ZERO);
        let facing = spawn.map(|s| s.facing).unwrap_or(0.0);

        let seed = self.config.seed.wrapping_add(id.wrapping_mul(0x9e37_79b9));
        let mut movement = self.movement_controller.spawn(&self.level.collision, position, seed);
        movement.view_angles.y = facing;

        info!("player {id} ({name}) spawned at {position:?}");
        self.players.push(Player::new(id, name.to_string(), movement));
        id
    }

    /// Remove a player from the simulation.
    pub fn remove_player(&mut self, player_id: EntityId) {
        self.players.retain(|p| p.id != player_id);
    }

    /// Get a player by ID.
    pub fn get_player(&self, player_id: EntityId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Get a mutable reference to a player by ID.
    pub fn get_player_mut(&mut self, player_id: EntityId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    /// The movement controller shared by every player.
    pub fn controller(&self) -> &PlayerController {
        &self.movement_controller
    }

    /// Advance the simulation by one tick.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Player inputs indexed by player position in the `players` array
    pub fn tick(&mut self, inputs: &[PlayerInput]) {
        let delta_time = self.config.delta_time();
        let profile = self.movement_controller.profile();
        self.events.clear();

        for (i, player) in self.players.iter_mut().enumerate() {
            // Get input for this player (default if not provided)
            let input = inputs.get(i).cloned().unwrap_or_default();
            let intent = input.to_intent(self.config.mouse_sensitivity);
            let mut events: Vec<MovementEvent> = Vec::new();

            // Ladders are volumes: grab on while pushing into one, let go
            // when leaving it or jumping off.
            let shape = CapsuleShape::new(profile.capsule_radius, player.movement.capsule_half_height);
            let touching = self.level.touches_ladder(player.movement.location, shape);
            match player.movement.mode {
                MovementMode::Ladder if !touching || input.actions.jump => {
                    self.movement_controller.set_on_ladder(
                        &mut player.movement,
                        &self.level.collision,
                        &mut events,
                        false,
                    );
                }
                MovementMode::Walking | MovementMode::Falling if touching && input.movement.forward => {
                    if self.movement_controller.set_on_ladder(
                        &mut player.movement,
                        &self.level.collision,
                        &mut events,
                        true,
                    ) {
                        debug!("player {} grabbed a ladder", player.id);
                    }
                }
                _ => {}
            }

            self.movement_controller.update(
                &mut player.movement,
                &intent,
                &self.level.collision,
                &mut events,
                delta_time,
            );

            self.events.extend(events.into_iter().map(|event| (player.id, event)));
        }

        self.frame += 1;
    }

    /// Toggle noclip for a player. Returns `false` if the player is unknown.
    pub fn set_noclip(&mut self, player_id: EntityId, enabled: bool) -> bool {
        let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) else {
            return false;
        };

        let mut events: Vec<MovementEvent> = Vec::new();
        self.movement_controller
            .set_noclip(&mut player.movement, &self.level.collision, &mut events, enabled);
        self.events.extend(events.into_iter().map(|event| (player_id, event)));
        true
    }

    /// Queue knockback on a player. Returns `false` if the player is unknown.
    pub fn apply_damage(&mut self, player_id: EntityId, damage: f32, direction: Vec3) -> bool {
        let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) else {
            return false;
        };

        self.movement_controller
            .apply_damage_momentum(&mut player.movement, damage, direction, false);
        true
    }

    /// Serialize the mutable game state.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let snapshot = SimulationSnapshot {
            frame: self.frame,
            players: self.players.clone(),
            next_entity_id: self.next_entity_id,
        };
        Ok(bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())?)
    }

    /// Rewind to a state produced by [`Simulation::snapshot`].
    pub fn restore(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        let (snapshot, _): (SimulationSnapshot, usize) =
            bincode::serde::decode_from_slice(data, bincode::config::standard())?;

        debug!("restoring frame {} over frame {}", snapshot.frame, self.frame);
        self.frame = snapshot.frame;
        self.players = snapshot.players;
        self.next_entity_id = snapshot.next_entity_id;
        self.events.clear();
        Ok(())
    }

    /// Get the delta time for this simulation.
    pub fn delta_time(&self) -> f32 {
        self.config.delta_time()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted_inputs() -> Vec<PlayerInput> {
        (0..120)
            .map(|i| {
                let mut input = PlayerInput::default();
                input.movement.forward = i % 2 == 0;
                input.movement.right = i % 3 == 0;
                input.actions.jump = i % 10 == 0;
                input.actions.crouch = (40..60).contains(&i);
                input.mouse_delta = (((i % 7) as f32) - 3.0, 0.0);
                input
            })
            .collect()
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::test();
        assert_eq!(sim.frame, 0);
        assert!(sim.players.is_empty());
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let mut config = SimulationConfig::default();
        config.profile.capsule_radius = 0.0;

        assert!(Simulation::new(config, Level::test_arena()).is_err());
    }

    #[test]
    fn test_add_player() {
        let mut sim = Simulation::test();

        let id = sim.add_player("Player1");
        assert!(id > 0);
        assert_eq!(sim.players.len(), 1);

        let player = sim.get_player(id).unwrap();
        assert_eq!(player.name, "Player1");
        assert!(player.on_ground());
    }

    #[test]
    fn test_tick_advances_frame() {
        let mut sim = Simulation::test();
        sim.add_player("Test");

        sim.tick(&[PlayerInput::default()]);
        assert_eq!(sim.frame, 1);

        sim.tick(&[PlayerInput::default()]);
        assert_eq!(sim.frame, 2);
    }

    #[test]
    fn test_movement_input() {
        let mut sim = Simulation::test();
        let id = sim.add_player("Test");

        let start_pos = sim.get_player(id).unwrap().position();

        // Move forward for several frames
        let mut input = PlayerInput::default();
        input.movement.forward = true;

        for _ in 0..60 {
            sim.tick(&[input.clone()]);
        }

        let player = sim.get_player(id).unwrap();
        let distance = (player.position() - start_pos).length();

        assert!(distance > 100.0, "Player should have moved, distance={}", distance);
        assert!(player.on_ground());
    }

    #[test]
    fn test_jump_raises_events() {
        let mut sim = Simulation::test();
        let id = sim.add_player("Test");

        let mut input = PlayerInput::default();
        input.actions.jump = true;
        sim.tick(&[input]);

        assert!(sim
            .events
            .iter()
            .any(|(player, event)| *player == id && matches!(event, MovementEvent::JumpCue(_))));
        assert!(!sim.get_player(id).unwrap().on_ground());
    }

    #[test]
    fn test_noclip_and_damage_for_unknown_player() {
        let mut sim = Simulation::test();
        assert!(!sim.set_noclip(42, true));
        assert!(!sim.apply_damage(42, 10.0, Vec3::X));
    }

    #[test]
    fn test_noclip_toggle() {
        let mut sim = Simulation::test();
        let id = sim.add_player("Test");

        assert!(sim.set_noclip(id, true));
        assert_eq!(sim.get_player(id).unwrap().mode(), MovementMode::Flying);

        assert!(sim.set_noclip(id, false));
        assert_eq!(sim.get_player(id).unwrap().mode(), MovementMode::Walking);
    }

    #[test]
    fn test_damage_knocks_player_back() {
        let mut sim = Simulation::test();
        let id = sim.add_player("Test");

        assert!(sim.apply_damage(id, 30.0, Vec3::new(0.0, 1.0, 1.0)));
        sim.tick(&[PlayerInput::default()]);

        let player = sim.get_player(id).unwrap();
        assert!(player.movement.velocity.y > 0.0);
        assert!(!player.on_ground());
    }

    #[test]
    fn test_determinism() {
        let inputs = scripted_inputs();

        // First run
        let mut sim1 = Simulation::test();
        sim1.add_player("Test");
        for input in &inputs {
            sim1.tick(&[input.clone()]);
        }

        // Second run
        let mut sim2 = Simulation::test();
        sim2.add_player("Test");
        for input in &inputs {
            sim2.tick(&[input.clone()]);
        }

        // Compare results bit for bit
        assert_eq!(sim1.players, sim2.players);
    }

    #[test]
    fn test_rollback_resimulates_identically() {
        let inputs = scripted_inputs();
        let (before, after) = inputs.split_at(50);

        let mut sim = Simulation::test();
        sim.add_player("Test");
        for input in before {
            sim.tick(&[input.clone()]);
        }

        let saved = sim.snapshot().unwrap();
        for input in after {
            sim.tick(&[input.clone()]);
        }
        let first_players = sim.players.clone();
        let first_frame = sim.frame;

        sim.restore(&saved).unwrap();
        assert_eq!(sim.frame, 50);
        for input in after {
            sim.tick(&[input.clone()]);
        }

        assert_eq!(sim.frame, first_frame);
        assert_eq!(sim.players, first_players);
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let mut sim = Simulation::test();
        assert!(sim.restore(&[0xff, 0xff, 0xff]).is_err());
    }
}
