//! Config - Session configuration, race modes and bot difficulty presets
//!
//! Everything here is fixed for the lifetime of a session.

use serde::{Deserialize, Serialize};

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Laps required to win
    pub laps_to_win: u32,
    /// Checkpoint capture radius for human-driven vehicles
    pub capture_radius: f64,
    /// Playfield width (x is clamped to [0, width])
    pub width: f64,
    /// Playfield height (y is clamped to [0, height])
    pub height: f64,
    /// Duration of one nominal frame in milliseconds (dt = 1.0)
    pub nominal_frame_ms: f64,
    /// Upper bound for normalized dt, guards against lag spikes
    pub max_dt: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            laps_to_win: 3,
            capture_radius: 45.0,
            width: 800.0,
            height: 600.0,
            nominal_frame_ms: 1000.0 / 60.0,
            max_dt: 3.0,
        }
    }
}

impl SessionConfig {
    /// Parse a (possibly partial) JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Clamp a raw normalized dt into `[0, max_dt]`
    pub fn clamp_dt(&self, dt: f64) -> f64 {
        if dt.is_nan() {
            return 0.0;
        }
        dt.clamp(0.0, self.max_dt)
    }
}

/// Who drives the second vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RaceMode {
    #[default]
    HumanVsHuman,
    HumanVsBot,
}

impl RaceMode {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "human-vs-human" | "pvp" | "2p" => Some(RaceMode::HumanVsHuman),
            "human-vs-bot" | "bot" | "cpu" | "1p" => Some(RaceMode::HumanVsBot),
            _ => None,
        }
    }
}

/// Bot difficulty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Resolve a difficulty key. Unknown keys fall back to Medium.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            other => {
                log::warn!("Unknown difficulty '{}', using medium", other);
                Difficulty::default()
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Bot top speed
    pub fn max_speed(&self) -> f64 {
        match self {
            Difficulty::Easy => 2.8,
            Difficulty::Medium => 3.4,
            Difficulty::Hard => 4.0,
        }
    }

    /// Waypoints between the bot's navigation cursor and its aim point
    pub fn lookahead(&self) -> usize {
        match self {
            Difficulty::Hard => 2,
            _ => 1,
        }
    }

    pub fn steer_multiplier(&self) -> f64 {
        match self {
            Difficulty::Hard => 3.0,
            _ => 1.5,
        }
    }

    pub fn accel_multiplier(&self) -> f64 {
        match self {
            Difficulty::Hard => 2.0,
            _ => 1.0,
        }
    }

    /// Distance at which the bot's navigation cursor moves on
    pub fn advance_threshold(&self) -> f64 {
        match self {
            Difficulty::Hard => 50.0,
            _ => 40.0,
        }
    }
}

impl From<String> for Difficulty {
    fn from(key: String) -> Self {
        Difficulty::from_key(&key)
    }
}
