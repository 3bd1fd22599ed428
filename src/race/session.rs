//! Session - Race state machine and per-tick pipeline
//!
//! Handles race setup, the tick pipeline and winner detection.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::race::config::{Difficulty, RaceMode, SessionConfig};
use crate::race::pilot::{AutonomousPilot, InputSource, KeyboardFeed, KeyboardInputSource};
use crate::race::progress::{ProgressEvent, ProgressTracker};
use crate::race::track::WaypointTrack;
use crate::race::vehicle::{
    Bounds, ControlCommand, Identity, Physics, VehicleConfig, VehicleSnapshot, VehicleState,
};

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    Running,
    Finished,
}

/// Terminal race outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    pub winner_index: usize,
    pub winner_name: String,
    pub final_laps: [u32; 2],
}

/// Compact race snapshot for the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub status: SessionStatus,
    pub tick: u64,
    pub vehicles: [VehicleSnapshot; 2],
}

/// Complete session state
pub struct RaceSession {
    config: SessionConfig,
    track: Rc<WaypointTrack>,
    feeds: [KeyboardFeed; 2],
    status: SessionStatus,
    mode: RaceMode,
    difficulty: Difficulty,
    vehicles: [VehicleState; 2],
    drivers: Vec<Box<dyn InputSource>>,
    last_timestamp: Option<f64>,
    tick_count: u64,
    result: Option<RaceResult>,
}

impl RaceSession {
    /// Create an idle session. `feeds` are the keyboard slots for vehicle 0 and 1.
    pub fn new(track: Rc<WaypointTrack>, config: SessionConfig, feeds: [KeyboardFeed; 2]) -> Self {
        let vehicles = Self::grid(&track, RaceMode::HumanVsHuman, Difficulty::default());
        Self {
            config,
            track,
            feeds,
            status: SessionStatus::Idle,
            mode: RaceMode::HumanVsHuman,
            difficulty: Difficulty::default(),
            vehicles,
            drivers: Vec::new(),
            last_timestamp: None,
            tick_count: 0,
            result: None,
        }
    }

    /// Fresh vehicles on the grid for the given mode
    fn grid(track: &WaypointTrack, mode: RaceMode, difficulty: Difficulty) -> [VehicleState; 2] {
        let (pos0, heading0) = track.grid_slot(0);
        let (pos1, heading1) = track.grid_slot(1);

        let player_one = VehicleState::new(
            pos0,
            heading0,
            VehicleConfig::default(),
            Identity::new("Player 1", "#e74c3c"),
        );
        let second = match mode {
            RaceMode::HumanVsHuman => VehicleState::new(
                pos1,
                heading1,
                VehicleConfig::default(),
                Identity::new("Player 2", "#3498db"),
            ),
            RaceMode::HumanVsBot => VehicleState::new(
                pos1,
                heading1,
                VehicleConfig {
                    max_speed: difficulty.max_speed(),
                    ..VehicleConfig::default()
                },
                Identity::new(format!("CPU ({})", difficulty.as_str()), "#95a5a6"),
            ),
        };
        [player_one, second]
    }

    /// Reset both vehicles and start racing
    pub fn start(&mut self, mode: RaceMode, difficulty: Difficulty) {
        self.mode = mode;
        self.difficulty = difficulty;
        self.vehicles = Self::grid(&self.track, mode, difficulty);

        let second: Box<dyn InputSource> = match mode {
            RaceMode::HumanVsHuman => Box::new(KeyboardInputSource::new(self.feeds[1].clone())),
            RaceMode::HumanVsBot => Box::new(AutonomousPilot::new(
                difficulty,
                self.vehicles[1].progress.checkpoint,
            )),
        };
        let first: Box<dyn InputSource> =
            Box::new(KeyboardInputSource::new(self.feeds[0].clone()));
        self.drivers = vec![first, second];

        self.last_timestamp = None;
        self.tick_count = 0;
        self.result = None;
        self.status = SessionStatus::Running;
        log::info!("Race started: {:?}, difficulty {}", mode, difficulty.as_str());
    }

    /// Frame clock entry point. Derives dt from the previous timestamp; the
    /// first tick after `start` counts as one nominal frame.
    pub fn tick(&mut self, timestamp_ms: f64) -> Option<RaceSnapshot> {
        if self.status != SessionStatus::Running {
            return None;
        }
        let raw = match self.last_timestamp {
            Some(last) => (timestamp_ms - last) / self.config.nominal_frame_ms,
            None => 1.0,
        };
        self.last_timestamp = Some(timestamp_ms);
        self.step(raw)
    }

    /// Run one tick with a normalized dt (clamped to the configured maximum)
    pub fn step(&mut self, dt: f64) -> Option<RaceSnapshot> {
        if self.status != SessionStatus::Running {
            return None;
        }
        let dt = self.config.clamp_dt(dt);
        let bounds = Bounds {
            width: self.config.width,
            height: self.config.height,
        };

        let commands: Vec<ControlCommand> = self
            .drivers
            .iter_mut()
            .zip(self.vehicles.iter())
            .map(|(driver, vehicle)| driver.command(vehicle, &self.track, dt))
            .collect();

        for (vehicle, command) in self.vehicles.iter_mut().zip(&commands) {
            Physics::integrate(vehicle, command, dt, bounds);
        }

        // Evaluate both before deciding, so a simultaneous finish goes to the lower index
        let mut finishers = [false; 2];
        for (i, vehicle) in self.vehicles.iter_mut().enumerate() {
            let radius = self.drivers[i].capture_radius(self.config.capture_radius);
            let event =
                ProgressTracker::evaluate(vehicle, &self.track, radius, self.config.laps_to_win);
            finishers[i] = event == ProgressEvent::Finished;
        }

        self.tick_count += 1;
        if let Some(winner) = finishers.iter().position(|f| *f) {
            self.finish(winner);
        }
        Some(self.snapshot())
    }

    fn finish(&mut self, winner: usize) {
        let result = RaceResult {
            winner_index: winner,
            winner_name: self.vehicles[winner].identity.name.clone(),
            final_laps: [
                self.vehicles[0].progress.laps,
                self.vehicles[1].progress.laps,
            ],
        };
        log::info!(
            "Race finished after {} ticks, winner: {}",
            self.tick_count,
            result.winner_name
        );
        self.result = Some(result);
        self.status = SessionStatus::Finished;
    }

    /// Get compact snapshot for the renderer
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            status: self.status,
            tick: self.tick_count,
            vehicles: [
                VehicleSnapshot::from(&self.vehicles[0]),
                VehicleSnapshot::from(&self.vehicles[1]),
            ],
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn mode(&self) -> RaceMode {
        self.mode
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn result(&self) -> Option<&RaceResult> {
        self.result.as_ref()
    }

    pub fn vehicles(&self) -> &[VehicleState; 2] {
        &self.vehicles
    }

    pub fn vehicle(&self, index: usize) -> Option<&VehicleState> {
        self.vehicles.get(index)
    }

    pub fn track(&self) -> &WaypointTrack {
        &self.track
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Mutable access for scripted setups
    #[cfg(test)]
    pub(crate) fn vehicles_mut(&mut self) -> &mut [VehicleState; 2] {
        &mut self.vehicles
    }
}
