//! Vehicle - Per-vehicle kinematics, configuration and race progress
//!
//! `Physics::integrate` advances one vehicle by one tick. Progress fields are
//! owned by the progress tracker and never touched here.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::race::track::Point;

/// Reverse speed is limited to this fraction of top speed
pub const REVERSE_SPEED_RATIO: f64 = 0.4;

/// Static driving characteristics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub max_speed: f64,
    /// Speed gained per nominal tick while accelerating
    pub acceleration: f64,
    /// Multiplicative speed decay per nominal tick
    pub friction: f64,
    /// Heading change per nominal tick at full speed
    pub steer_rate: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_speed: 4.0,
            acceleration: 0.12,
            friction: 0.97,
            steer_rate: 0.06,
        }
    }
}

impl VehicleConfig {
    pub fn min_speed(&self) -> f64 {
        -REVERSE_SPEED_RATIO * self.max_speed
    }
}

/// Race progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Last captured waypoint
    pub checkpoint: usize,
    pub laps: u32,
    pub finished: bool,
}

/// Display identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    /// CSS-style colour for the renderer
    pub color: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Complete state for a single vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Point,
    /// Radians, 0 = facing decreasing y, positive turns clockwise on screen
    pub heading: f64,
    /// Signed speed in units per nominal tick
    pub speed: f64,
    pub config: VehicleConfig,
    pub progress: Progress,
    pub identity: Identity,
}

impl VehicleState {
    /// A stationary vehicle on the grid with no progress
    pub fn new(position: Point, heading: f64, config: VehicleConfig, identity: Identity) -> Self {
        Self {
            position,
            heading,
            speed: 0.0,
            config,
            progress: Progress::default(),
            identity,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Throttle {
    Accelerate,
    Brake,
    #[default]
    Coast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Steer {
    #[default]
    Straight,
    Left,
    Right,
    /// Rotate towards an absolute heading at up to `steer_rate * multiplier`
    Toward { heading: f64, multiplier: f64 },
}

/// One tick's worth of driver intent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub throttle: Throttle,
    pub steer: Steer,
    /// Scales acceleration while accelerating
    pub accel_multiplier: f64,
}

impl Default for ControlCommand {
    fn default() -> Self {
        Self {
            throttle: Throttle::Coast,
            steer: Steer::Straight,
            accel_multiplier: 1.0,
        }
    }
}

/// Playfield edges for position clamping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

/// Wrap an angle into (-PI, PI]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Vehicle integration logic
pub struct Physics;

impl Physics {
    /// Advance `state` by `dt` nominal ticks. `dt` must already be clamped
    /// by the caller; negative values are treated as zero.
    pub fn integrate(state: &mut VehicleState, command: &ControlCommand, dt: f64, bounds: Bounds) {
        let dt = dt.max(0.0);
        let cfg = state.config;
        let min_speed = cfg.min_speed();

        // Frame-rate independent decay
        state.speed *= cfg.friction.powf(dt);

        match command.throttle {
            Throttle::Accelerate => {
                let accel = cfg.acceleration * command.accel_multiplier * dt;
                state.speed = (state.speed + accel).min(cfg.max_speed);
            }
            Throttle::Brake => {
                state.speed = (state.speed - cfg.acceleration * dt).max(min_speed);
            }
            Throttle::Coast => {}
        }
        state.speed = state.speed.clamp(min_speed, cfg.max_speed);

        match command.steer {
            Steer::Straight => {}
            Steer::Left | Steer::Right => {
                let authority = if cfg.max_speed > 0.0 {
                    state.speed / cfg.max_speed
                } else {
                    0.0
                };
                let turn = cfg.steer_rate * dt * authority;
                if command.steer == Steer::Left {
                    state.heading -= turn;
                } else {
                    state.heading += turn;
                }
            }
            Steer::Toward { heading, multiplier } => {
                let diff = normalize_angle(heading - state.heading);
                let max_turn = cfg.steer_rate * dt * multiplier;
                state.heading += diff.clamp(-max_turn, max_turn);
            }
        }
        state.heading = normalize_angle(state.heading);

        state.position.x += state.heading.sin() * state.speed * dt;
        state.position.y -= state.heading.cos() * state.speed * dt;

        // Stall at the edges
        state.position.x = state.position.x.clamp(0.0, bounds.width);
        state.position.y = state.position.y.clamp(0.0, bounds.height);
    }
}

/// Compact vehicle state for the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub speed: f64,
    pub lap: u32,
    pub checkpoint: usize,
    pub finished: bool,
}

impl From<&VehicleState> for VehicleSnapshot {
    fn from(state: &VehicleState) -> Self {
        Self {
            x: state.position.x,
            y: state.position.y,
            heading: state.heading,
            speed: state.speed,
            lap: state.progress.laps,
            checkpoint: state.progress.checkpoint,
            finished: state.progress.finished,
        }
    }
}
