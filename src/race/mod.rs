//! Race Module
//!
//! Two-vehicle waypoint race: kinematics, checkpoint tracking, the bot
//! opponent and the session state machine. Rendering and input capture live
//! outside and only exchange snapshots and key states with this module.

pub mod clock;
pub mod config;
pub mod host;
pub mod pilot;
pub mod progress;
pub mod session;
pub mod track;
pub mod vehicle;

pub use clock::{FrameClock, TaskStatus, TickHandle};
pub use config::{Difficulty, RaceMode, SessionConfig};
pub use host::{HostState, HostStats, RaceHost, SnapshotSink};
pub use pilot::{AutonomousPilot, ControlKeys, InputSource, KeyboardFeed, KeyboardInputSource};
pub use progress::{ProgressEvent, ProgressTracker};
pub use session::{RaceResult, RaceSession, RaceSnapshot, SessionStatus};
pub use track::{Point, WaypointTrack};
pub use vehicle::{ControlCommand, Physics, Steer, Throttle, VehicleSnapshot, VehicleState};
