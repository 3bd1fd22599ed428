//! Progress - Checkpoint capture and lap counting
//!
//! Capture is a plain proximity test against the *next* waypoint only, so a
//! vehicle advances at most one checkpoint per evaluation. There is no
//! segment-crossing test: a vehicle that cuts inside and never comes within
//! the capture radius of its next waypoint stops making progress until it does.

use crate::race::track::WaypointTrack;
use crate::race::vehicle::VehicleState;

/// What happened to a vehicle's progress this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    None,
    Checkpoint(usize),
    Lap(u32),
    Finished,
}

/// Progress tracking logic
pub struct ProgressTracker;

impl ProgressTracker {
    /// Evaluate one vehicle against the track. Finished vehicles are skipped.
    pub fn evaluate(
        state: &mut VehicleState,
        track: &WaypointTrack,
        capture_radius: f64,
        laps_to_win: u32,
    ) -> ProgressEvent {
        let progress = &mut state.progress;
        if progress.finished {
            return ProgressEvent::None;
        }

        let next = track.next_index(progress.checkpoint);
        if track.distance_to(state.position, next) >= capture_radius {
            return ProgressEvent::None;
        }

        progress.checkpoint = next;
        if next != 0 {
            log::debug!("{} reached checkpoint {}", state.identity.name, next);
            return ProgressEvent::Checkpoint(next);
        }

        progress.laps += 1;
        log::info!("{} completed lap {}", state.identity.name, progress.laps);
        if progress.laps >= laps_to_win {
            progress.finished = true;
            log::info!("{} finished all laps!", state.identity.name);
            return ProgressEvent::Finished;
        }
        ProgressEvent::Lap(progress.laps)
    }
}
