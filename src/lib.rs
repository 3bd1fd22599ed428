//! Twin Circuit - Two-vehicle waypoint race simulation
//!
//! The `race` module is the simulation core. `run` drives a headless race on
//! the default circuit against a synthetic frame clock.

pub mod race;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ffi::OsString;
use std::path::PathBuf;

use race::vehicle::normalize_angle;
use race::{
    ControlKeys, Difficulty, FrameClock, HostState, RaceHost, RaceMode, RaceResult, RaceSnapshot,
    SessionConfig, SnapshotSink, WaypointTrack,
};

/// Frames after which a headless race is abandoned
const FRAME_LIMIT: u32 = 60 * 60 * 5;

/// Seed for the frame timing jitter
const JITTER_SEED: u64 = 42;

/// Command-line arguments for the headless binary
#[derive(Parser, Debug, Clone)]
#[command(name = "twin-circuit")]
#[command(about = "Headless two-vehicle waypoint race", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Race mode (human-vs-human or human-vs-bot)
    #[arg(long, default_value = "human-vs-bot", value_parser = parse_mode)]
    pub mode: RaceMode,

    /// Bot difficulty (easy, medium, hard); unknown values fall back to medium
    #[arg(long, default_value = "medium", value_parser = parse_difficulty)]
    pub difficulty: Difficulty,

    /// Path to a session config JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_mode(key: &str) -> Result<RaceMode, String> {
    RaceMode::from_key(key).ok_or_else(|| format!("unknown race mode '{}'", key))
}

fn parse_difficulty(key: &str) -> Result<Difficulty, String> {
    Ok(Difficulty::from_key(key))
}

/// Headless run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub mode: RaceMode,
    pub difficulty: Difficulty,
    pub config: SessionConfig,
}

impl RunOptions {
    /// Resolve parsed arguments, loading the config file if one was given
    pub fn from_cli(cli: Cli) -> Result<Self, String> {
        let config = match &cli.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                SessionConfig::from_json(&json)?
            }
            None => SessionConfig::default(),
        };
        Ok(Self {
            mode: cli.mode,
            difficulty: cli.difficulty,
            config,
        })
    }

    /// Parse a full argument list, binary name first
    pub fn from_args<I, T>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;
        Self::from_cli(cli)
    }
}

/// Keys a simple scripted driver would press to chase its next checkpoint
pub fn scripted_keys(snapshot: &RaceSnapshot, track: &WaypointTrack, index: usize) -> ControlKeys {
    let Some(vehicle) = snapshot.vehicles.get(index) else {
        return ControlKeys::default();
    };
    let position = race::Point::new(vehicle.x, vehicle.y);
    let target = track.point(track.next_index(vehicle.checkpoint));
    let diff = normalize_angle(position.bearing_to(target) - vehicle.heading);

    ControlKeys {
        accelerate: true,
        brake: false,
        left: diff < -0.05,
        right: diff > 0.05,
    }
}

/// Logs lap changes and the final result
#[derive(Default)]
struct LogSink {
    laps: [u32; 2],
}

impl SnapshotSink for LogSink {
    fn publish(&mut self, snapshot: &RaceSnapshot) {
        for (i, vehicle) in snapshot.vehicles.iter().enumerate() {
            if vehicle.lap != self.laps[i] {
                self.laps[i] = vehicle.lap;
                log::info!("Vehicle {} on lap {} at tick {}", i, vehicle.lap, snapshot.tick);
            }
        }
    }

    fn finished(&mut self, result: &RaceResult) {
        log::info!("Winner: {} (vehicle {})", result.winner_name, result.winner_index);
    }
}

/// Run a complete headless race and return its result
pub fn run_headless(options: &RunOptions) -> Result<RaceResult, String> {
    let track = WaypointTrack::default();
    let mut host = RaceHost::new(track.clone(), options.config.clone());
    let mut clock = FrameClock::new();
    let mut rng = StdRng::seed_from_u64(JITTER_SEED);
    let frame_ms = options.config.nominal_frame_ms;

    let feeds: Vec<_> = (0..2).filter_map(|i| host.keyboard(i)).collect();
    let humans = match options.mode {
        RaceMode::HumanVsHuman => 2,
        RaceMode::HumanVsBot => 1,
    };

    host.attach_sink(Box::new(LogSink::default()));
    host.start(&mut clock, options.mode, options.difficulty);

    let mut timestamp = 0.0;
    for _ in 0..FRAME_LIMIT {
        if let Some(snapshot) = host.snapshot() {
            for (i, feed) in feeds.iter().take(humans).enumerate() {
                feed.set(scripted_keys(&snapshot, &track, i));
            }
        }

        clock.advance(timestamp);
        if host.state() == HostState::Results {
            break;
        }

        // Mostly steady frames with the odd stall
        timestamp += if rng.gen_bool(0.01) {
            rng.gen_range(100.0..300.0)
        } else {
            frame_ms * rng.gen_range(0.8..1.2)
        };
    }

    let stats = host.stats();
    log::info!(
        "{} ticks processed, avg tick {:.4} ms",
        stats.ticks_processed,
        stats.avg_tick_time_ms
    );

    let result = host.result();
    host.stop();
    result.ok_or_else(|| format!("no winner after {} frames", FRAME_LIMIT))
}

/// Binary entry point
pub fn run(cli: Cli) -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = RunOptions::from_cli(cli)?;
    log::info!(
        "Headless race: {:?}, difficulty {}",
        options.mode,
        options.difficulty.as_str()
    );

    let result = run_headless(&options)?;
    let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::{SessionStatus, VehicleSnapshot};

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("twin-circuit")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_default_options() {
        let options = RunOptions::from_args(args(&[])).unwrap();
        assert_eq!(options.mode, RaceMode::HumanVsBot);
        assert_eq!(options.difficulty, Difficulty::Medium);
        assert_eq!(options.config.laps_to_win, 3);
    }

    #[test]
    fn test_parse_options() {
        let options =
            RunOptions::from_args(args(&["--mode", "2p", "--difficulty", "hard"])).unwrap();
        assert_eq!(options.mode, RaceMode::HumanVsHuman);
        assert_eq!(options.difficulty, Difficulty::Hard);

        let options =
            RunOptions::from_args(args(&["--mode", "human-vs-bot", "--difficulty", "ludicrous"]))
                .unwrap();
        assert_eq!(options.mode, RaceMode::HumanVsBot);
        assert_eq!(options.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let err = RunOptions::from_args(args(&["--mode", "solo"])).unwrap_err();
        assert!(err.contains("unknown race mode 'solo'"));
        assert!(RunOptions::from_args(args(&["--laps", "5"])).is_err());
        assert!(RunOptions::from_args(args(&["--config", "/nonexistent/race.json"])).is_err());
    }

    #[test]
    fn test_config_file_is_loaded() {
        let path = std::env::temp_dir().join("twin_circuit_cli_config.json");
        std::fs::write(&path, r#"{ "laps_to_win": 5, "width": 1024.0 }"#).unwrap();
        let options =
            RunOptions::from_args(args(&["--config", path.to_str().unwrap()])).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(options.config.laps_to_win, 5);
        assert_eq!(options.config.width, 1024.0);
        assert_eq!(options.config.height, 600.0);
    }

    #[test]
    fn test_scripted_keys_turn_toward_checkpoint() {
        let track = WaypointTrack::new(vec![
            crate::race::Point::new(100.0, 300.0),
            crate::race::Point::new(700.0, 300.0),
        ])
        .unwrap();
        let vehicle = |heading: f64| VehicleSnapshot {
            x: 100.0,
            y: 300.0,
            heading,
            speed: 2.0,
            lap: 0,
            checkpoint: 0,
            finished: false,
        };
        let snapshot = |heading: f64| RaceSnapshot {
            status: SessionStatus::Running,
            tick: 0,
            vehicles: [vehicle(heading), vehicle(heading)],
        };

        // Facing north with the target due east
        let keys = scripted_keys(&snapshot(0.0), &track, 0);
        assert!(keys.right && !keys.left && keys.accelerate);

        // Facing east-south-east
        let keys = scripted_keys(&snapshot(2.0), &track, 1);
        assert!(keys.left && !keys.right);

        assert_eq!(scripted_keys(&snapshot(0.0), &track, 5), ControlKeys::default());
    }
}
