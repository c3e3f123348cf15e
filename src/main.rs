//! Strafe - headless movement runner.
//!
//! Drives the test arena with scripted input and logs how the character
//! moves. Run with `RUST_LOG=info` (or `debug`/`trace` for the solver's own
//! logging) and an optional scenario name:
//!
//! ```text
//! strafe [bhop|run|crouch|noclip] [seconds]
//! ```

use log::{error, info, warn};
use strafe_game::{Level, MovementEvent, MovementMode, PlayerInput, Simulation, SimulationConfig};
use strafe_physics::TuningProfile;

/// Scripted input pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scenario {
    /// Hold jump and air strafe, alternating sides.
    Bhop,
    /// Run forward along the floor.
    Run,
    /// Crouch walk into the tunnel.
    Crouch,
    /// Fly through the walls.
    Noclip,
}

impl Scenario {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "bhop" => Some(Self::Bhop),
            "run" => Some(Self::Run),
            "crouch" => Some(Self::Crouch),
            "noclip" => Some(Self::Noclip),
            _ => None,
        }
    }

    fn input(self, frame: u64) -> PlayerInput {
        let mut input = PlayerInput::default();
        match self {
            Self::Bhop => {
                input.actions.jump = true;
                if frame < 30 {
                    input.movement.forward = true;
                } else {
                    // Strafe toward the side we turn to.
                    let right = (frame / 40) % 2 == 0;
                    input.movement.right = right;
                    input.movement.left = !right;
                    input.mouse_delta = (if right { 6.0 } else { -6.0 }, 0.0);
                }
            }
            Self::Run => {
                input.movement.forward = true;
                input.actions.sprint = frame % 120 < 60;
            }
            Self::Crouch => {
                input.movement.forward = true;
                input.actions.crouch = true;
            }
            Self::Noclip => {
                input.movement.forward = true;
                input.mouse_delta = (0.0, if frame < 20 { -5.0 } else { 0.0 });
            }
        }
        input
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let scenario = match args.next() {
        Some(name) => Scenario::parse(&name).unwrap_or_else(|| {
            warn!("unknown scenario {name:?}, running bhop");
            Scenario::Bhop
        }),
        None => Scenario::Bhop,
    };
    let seconds: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(5);

    let config = SimulationConfig {
        profile: TuningProfile::classic_bhop(),
        ..SimulationConfig::default()
    };
    let mut simulation = match Simulation::new(config, Level::test_arena()) {
        Ok(simulation) => simulation,
        Err(err) => {
            error!("invalid tuning profile: {err}");
            std::process::exit(1);
        }
    };

    let player_id = simulation.add_player("Player1");
    if scenario == Scenario::Noclip {
        simulation.set_noclip(player_id, true);
    }

    info!("running {scenario:?} for {seconds}s at {} Hz", simulation.config.tick_rate);

    let ticks = u64::from(seconds) * u64::from(simulation.config.tick_rate);
    let mut landings = 0u32;
    let mut top_speed = 0.0f32;

    for _ in 0..ticks {
        let input = scenario.input(simulation.frame);
        simulation.tick(&[input]);

        for (_, event) in &simulation.events {
            match event {
                MovementEvent::LandCue(_) => landings += 1,
                MovementEvent::ModeChanged { from, to } => {
                    info!("frame {}: {from:?} -> {to:?}", simulation.frame);
                }
                _ => {}
            }
        }

        let Some(player) = simulation.get_player(player_id) else {
            break;
        };
        top_speed = top_speed.max(player.speed());

        if simulation.frame % u64::from(simulation.config.tick_rate) == 0 {
            info!(
                "t={}s pos={:.1?} speed={:.1} mode={:?} crouched={}",
                simulation.frame / u64::from(simulation.config.tick_rate),
                player.position(),
                player.speed(),
                player.mode(),
                player.is_crouching()
            );
        }
    }

    if let Some(player) = simulation.get_player(player_id) {
        let on_ladder = player.mode() == MovementMode::Ladder;
        info!(
            "done: {landings} landings, top speed {top_speed:.1}, final speed {:.1}, on ladder {on_ladder}",
            player.speed()
        );
    }
}
