//! Pilot - Control sources for the two vehicles
//!
//! A session picks one `InputSource` per vehicle when it starts and then
//! polls both the same way every tick.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

use crate::race::config::Difficulty;
use crate::race::track::WaypointTrack;
use crate::race::vehicle::{ControlCommand, Steer, Throttle, VehicleState};

/// Produces a control command for one vehicle per tick
pub trait InputSource {
    fn command(&mut self, vehicle: &VehicleState, track: &WaypointTrack, dt: f64) -> ControlCommand;

    /// Checkpoint capture radius for the vehicle this source drives
    fn capture_radius(&self, default: f64) -> f64 {
        default
    }
}

/// Raw key state sampled at tick time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlKeys {
    pub accelerate: bool,
    pub brake: bool,
    pub left: bool,
    pub right: bool,
}

impl ControlKeys {
    /// Opposing keys cancel out
    pub fn to_command(self) -> ControlCommand {
        let throttle = match (self.accelerate, self.brake) {
            (true, false) => Throttle::Accelerate,
            (false, true) => Throttle::Brake,
            _ => Throttle::Coast,
        };
        let steer = match (self.left, self.right) {
            (true, false) => Steer::Left,
            (false, true) => Steer::Right,
            _ => Steer::Straight,
        };
        ControlCommand {
            throttle,
            steer,
            ..ControlCommand::default()
        }
    }
}

/// Shared slot the input layer writes key state into
#[derive(Debug, Clone, Default)]
pub struct KeyboardFeed {
    keys: Rc<Cell<ControlKeys>>,
}

impl KeyboardFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, keys: ControlKeys) {
        self.keys.set(keys);
    }

    pub fn get(&self) -> ControlKeys {
        self.keys.get()
    }

    pub fn release_all(&self) {
        self.keys.set(ControlKeys::default());
    }
}

/// Human driver reading a keyboard feed
pub struct KeyboardInputSource {
    feed: KeyboardFeed,
}

impl KeyboardInputSource {
    pub fn new(feed: KeyboardFeed) -> Self {
        Self { feed }
    }
}

impl InputSource for KeyboardInputSource {
    fn command(&mut self, _vehicle: &VehicleState, _track: &WaypointTrack, _dt: f64) -> ControlCommand {
        self.feed.get().to_command()
    }
}

/// Waypoint-following bot
#[derive(Debug, Clone)]
pub struct AutonomousPilot {
    difficulty: Difficulty,
    /// The aim point is `cursor + lookahead`
    cursor: usize,
}

impl AutonomousPilot {
    pub fn new(difficulty: Difficulty, start_checkpoint: usize) -> Self {
        Self {
            difficulty,
            cursor: start_checkpoint,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Index of the waypoint currently being steered at
    pub fn aim_index(&self, track: &WaypointTrack) -> usize {
        (self.cursor + self.difficulty.lookahead()) % track.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl InputSource for AutonomousPilot {
    fn command(&mut self, vehicle: &VehicleState, track: &WaypointTrack, _dt: f64) -> ControlCommand {
        // The aim point moves on one waypoint at a time
        if track.distance_to(vehicle.position, self.aim_index(track))
            < self.difficulty.advance_threshold()
        {
            self.cursor = track.next_index(self.cursor);
        }

        let aim = track.point(self.aim_index(track));
        ControlCommand {
            throttle: Throttle::Accelerate,
            steer: Steer::Toward {
                heading: vehicle.position.bearing_to(aim),
                multiplier: self.difficulty.steer_multiplier(),
            },
            accel_multiplier: self.difficulty.accel_multiplier(),
        }
    }

    fn capture_radius(&self, _default: f64) -> f64 {
        self.difficulty.advance_threshold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::track::Point;
    use crate::race::vehicle::{Bounds, Identity, Physics, VehicleConfig};

    const BOUNDS: Bounds = Bounds {
        width: 800.0,
        height: 600.0,
    };

    fn bot_vehicle(difficulty: Difficulty, track: &WaypointTrack) -> VehicleState {
        let (position, heading) = track.grid_slot(1);
        VehicleState::new(
            position,
            heading,
            VehicleConfig {
                max_speed: difficulty.max_speed(),
                ..VehicleConfig::default()
            },
            Identity::new("CPU", "#3498db"),
        )
    }

    #[test]
    fn test_keys_to_command() {
        let keys = ControlKeys {
            accelerate: true,
            left: true,
            ..ControlKeys::default()
        };
        let cmd = keys.to_command();
        assert_eq!(cmd.throttle, Throttle::Accelerate);
        assert_eq!(cmd.steer, Steer::Left);

        let all = ControlKeys {
            accelerate: true,
            brake: true,
            left: true,
            right: true,
        };
        assert_eq!(all.to_command(), ControlCommand::default());
    }

    #[test]
    fn test_keyboard_reads_feed_at_poll_time() {
        let track = WaypointTrack::default();
        let vehicle = bot_vehicle(Difficulty::Easy, &track);
        let feed = KeyboardFeed::new();
        let mut source = KeyboardInputSource::new(feed.clone());

        assert_eq!(source.command(&vehicle, &track, 1.0).throttle, Throttle::Coast);
        feed.set(ControlKeys {
            brake: true,
            right: true,
            ..ControlKeys::default()
        });
        let cmd = source.command(&vehicle, &track, 1.0);
        assert_eq!(cmd.throttle, Throttle::Brake);
        assert_eq!(cmd.steer, Steer::Right);
        assert_eq!(source.capture_radius(45.0), 45.0);

        feed.release_all();
        assert_eq!(source.command(&vehicle, &track, 1.0), ControlCommand::default());
    }

    #[test]
    fn test_lookahead_by_difficulty() {
        let track = WaypointTrack::default();
        assert_eq!(AutonomousPilot::new(Difficulty::Easy, 0).aim_index(&track), 1);
        assert_eq!(AutonomousPilot::new(Difficulty::Medium, 0).aim_index(&track), 1);
        assert_eq!(AutonomousPilot::new(Difficulty::Hard, 0).aim_index(&track), 2);
        assert_eq!(AutonomousPilot::new(Difficulty::Hard, 11).aim_index(&track), 1);
    }

    #[test]
    fn test_bot_steers_toward_aim_point() {
        let track = WaypointTrack::default();
        let vehicle = bot_vehicle(Difficulty::Medium, &track);
        let mut pilot = AutonomousPilot::new(Difficulty::Medium, 0);

        let cmd = pilot.command(&vehicle, &track, 1.0);
        let expected = vehicle.position.bearing_to(track.point(1));
        assert_eq!(cmd.throttle, Throttle::Accelerate);
        assert_eq!(
            cmd.steer,
            Steer::Toward {
                heading: expected,
                multiplier: 1.5
            }
        );
        assert_eq!(cmd.accel_multiplier, 1.0);
    }

    #[test]
    fn test_cursor_advances_near_aim_point() {
        let track = WaypointTrack::default();
        let mut vehicle = bot_vehicle(Difficulty::Hard, &track);
        let mut pilot = AutonomousPilot::new(Difficulty::Hard, 0);

        pilot.command(&vehicle, &track, 1.0);
        assert_eq!(pilot.cursor(), 0);
        assert_eq!(pilot.aim_index(&track), 2);

        // Near the skipped-over waypoint: the aim point does not move
        let wp1 = track.point(1);
        vehicle.position = Point::new(wp1.x - 10.0, wp1.y);
        pilot.command(&vehicle, &track, 1.0);
        assert_eq!(pilot.cursor(), 0);

        let wp2 = track.point(2);
        vehicle.position = Point::new(wp2.x - 48.0, wp2.y);
        pilot.command(&vehicle, &track, 1.0);
        assert_eq!(pilot.cursor(), 1);
        assert_eq!(pilot.aim_index(&track), 3);
        assert_eq!(pilot.capture_radius(45.0), 50.0);

        // Easy aims at waypoint 1 and only moves on within 40 of it
        let mut easy = AutonomousPilot::new(Difficulty::Easy, 0);
        vehicle.position = Point::new(wp1.x - 48.0, wp1.y);
        easy.command(&vehicle, &track, 1.0);
        assert_eq!(easy.cursor(), 0);
        vehicle.position = Point::new(wp1.x - 30.0, wp1.y);
        easy.command(&vehicle, &track, 1.0);
        assert_eq!(easy.cursor(), 1);
        assert_eq!(easy.aim_index(&track), 2);
    }

    #[test]
    fn test_bot_is_deterministic() {
        let track = WaypointTrack::default();
        let run = || {
            let mut vehicle = bot_vehicle(Difficulty::Hard, &track);
            let mut pilot = AutonomousPilot::new(Difficulty::Hard, 0);
            let mut trace = Vec::new();
            for _ in 0..600 {
                let cmd = pilot.command(&vehicle, &track, 1.0);
                Physics::integrate(&mut vehicle, &cmd, 1.0, BOUNDS);
                trace.push((vehicle.position, vehicle.heading));
            }
            trace
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_hard_bot_never_brakes() {
        let track = WaypointTrack::default();
        let mut vehicle = bot_vehicle(Difficulty::Hard, &track);
        let mut pilot = AutonomousPilot::new(Difficulty::Hard, 0);
        let friction = vehicle.config.friction;

        for _ in 0..2000 {
            let before = vehicle.speed;
            let cmd = pilot.command(&vehicle, &track, 1.0);
            assert_ne!(cmd.throttle, Throttle::Brake);
            Physics::integrate(&mut vehicle, &cmd, 1.0, BOUNDS);
            assert!(vehicle.speed >= (before * friction).min(vehicle.config.max_speed) - 1e-12);
        }
        assert!((vehicle.speed - vehicle.config.max_speed).abs() < 1e-9);
    }
}
