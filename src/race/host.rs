//! Host - Owns the active race and its frame task
//!
//! Wires a `RaceSession` to a `FrameClock`, forwards snapshots to an optional
//! sink and exposes the interface the embedding UI talks to.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use crate::race::clock::{FrameClock, TaskStatus, TickHandle};
use crate::race::config::{Difficulty, RaceMode, SessionConfig};
use crate::race::pilot::KeyboardFeed;
use crate::race::session::{RaceResult, RaceSession, RaceSnapshot, SessionStatus};
use crate::race::track::WaypointTrack;

/// Number of tick timings kept for the rolling average
const TIMING_WINDOW: usize = 60;

/// Consumer of per-tick output (renderer, HUD)
pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &RaceSnapshot);

    /// Called once when a race ends
    fn finished(&mut self, _result: &RaceResult) {}
}

/// Host state as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostState {
    Idle,
    Racing,
    Results,
}

/// Host statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostStats {
    pub ticks_processed: u64,
    pub avg_tick_time_ms: f64,
    pub state: HostState,
}

#[derive(Default)]
struct TickTimings {
    ticks: u64,
    samples: VecDeque<f64>,
}

impl TickTimings {
    fn record(&mut self, ms: f64) {
        self.ticks += 1;
        self.samples.push_back(ms);
        if self.samples.len() > TIMING_WINDOW {
            self.samples.pop_front();
        }
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        }
    }
}

type SharedSink = Rc<RefCell<Option<Box<dyn SnapshotSink>>>>;

/// Main race host
pub struct RaceHost {
    track: Rc<WaypointTrack>,
    config: SessionConfig,
    feeds: [KeyboardFeed; 2],
    sink: SharedSink,
    session: Option<Rc<RefCell<RaceSession>>>,
    handle: Option<TickHandle>,
    timings: Rc<RefCell<TickTimings>>,
}

impl RaceHost {
    pub fn new(track: WaypointTrack, config: SessionConfig) -> Self {
        Self {
            track: Rc::new(track),
            config,
            feeds: [KeyboardFeed::new(), KeyboardFeed::new()],
            sink: Rc::new(RefCell::new(None)),
            session: None,
            handle: None,
            timings: Rc::new(RefCell::new(TickTimings::default())),
        }
    }

    /// Keyboard slot for vehicle `index` (0 or 1)
    pub fn keyboard(&self, index: usize) -> Option<KeyboardFeed> {
        self.feeds.get(index).cloned()
    }

    pub fn attach_sink(&mut self, sink: Box<dyn SnapshotSink>) {
        *self.sink.borrow_mut() = Some(sink);
    }

    pub fn detach_sink(&mut self) -> Option<Box<dyn SnapshotSink>> {
        self.sink.borrow_mut().take()
    }

    /// Start a new race, discarding any previous one first
    pub fn start(&mut self, clock: &mut FrameClock, mode: RaceMode, difficulty: Difficulty) {
        self.stop();

        let mut session =
            RaceSession::new(Rc::clone(&self.track), self.config.clone(), self.feeds.clone());
        session.start(mode, difficulty);
        let session = Rc::new(RefCell::new(session));
        *self.timings.borrow_mut() = TickTimings::default();

        let task_session = Rc::clone(&session);
        let sink = Rc::clone(&self.sink);
        let timings = Rc::clone(&self.timings);
        self.handle = Some(clock.register(move |timestamp| {
            let tick_start = Instant::now();
            let mut session = task_session.borrow_mut();
            let Some(snapshot) = session.tick(timestamp) else {
                return TaskStatus::Done;
            };
            timings
                .borrow_mut()
                .record(tick_start.elapsed().as_secs_f64() * 1000.0);

            if let Some(sink) = sink.borrow_mut().as_mut() {
                sink.publish(&snapshot);
                if let Some(result) = session.result() {
                    sink.finished(result);
                }
            }

            match session.status() {
                SessionStatus::Running => TaskStatus::Continue,
                _ => TaskStatus::Done,
            }
        }));
        self.session = Some(session);
    }

    /// Cancel the frame task and discard the session
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
        if self.session.take().is_some() {
            log::info!("Race stopped");
        }
        for feed in &self.feeds {
            feed.release_all();
        }
    }

    pub fn snapshot(&self) -> Option<RaceSnapshot> {
        self.session.as_ref().map(|s| s.borrow().snapshot())
    }

    pub fn result(&self) -> Option<RaceResult> {
        self.session
            .as_ref()
            .and_then(|s| s.borrow().result().cloned())
    }

    pub fn state(&self) -> HostState {
        match self.session.as_ref().map(|s| s.borrow().status()) {
            None | Some(SessionStatus::Idle) => HostState::Idle,
            Some(SessionStatus::Running) => HostState::Racing,
            Some(SessionStatus::Finished) => HostState::Results,
        }
    }

    pub fn stats(&self) -> HostStats {
        let timings = self.timings.borrow();
        HostStats {
            ticks_processed: timings.ticks,
            avg_tick_time_ms: timings.average(),
            state: self.state(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_active())
    }

    pub fn track(&self) -> &WaypointTrack {
        &self.track
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for RaceHost {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::pilot::ControlKeys;

    #[derive(Default)]
    struct Recorder {
        snapshots: Rc<RefCell<Vec<RaceSnapshot>>>,
        results: Rc<RefCell<Vec<RaceResult>>>,
    }

    impl SnapshotSink for Recorder {
        fn publish(&mut self, snapshot: &RaceSnapshot) {
            self.snapshots.borrow_mut().push(snapshot.clone());
        }

        fn finished(&mut self, result: &RaceResult) {
            self.results.borrow_mut().push(result.clone());
        }
    }

    fn host() -> RaceHost {
        RaceHost::new(WaypointTrack::default(), SessionConfig::default())
    }

    #[test]
    fn test_tick_timings_keep_rolling_window() {
        let mut timings = TickTimings::default();
        for _ in 0..TIMING_WINDOW {
            timings.record(10.0);
        }
        assert_eq!(timings.average(), 10.0);

        // Older samples fall out once the window is full
        for _ in 0..TIMING_WINDOW {
            timings.record(2.0);
        }
        assert_eq!(timings.samples.len(), TIMING_WINDOW);
        assert_eq!(timings.average(), 2.0);
        assert_eq!(timings.ticks, 2 * TIMING_WINDOW as u64);
    }

    #[test]
    fn test_idle_host() {
        let host = host();
        assert_eq!(host.state(), HostState::Idle);
        assert!(host.snapshot().is_none());
        assert!(host.result().is_none());
        assert!(!host.is_running());
        assert_eq!(host.stats().ticks_processed, 0);
    }

    #[test]
    fn test_ticks_without_sink_are_fine() {
        let mut clock = FrameClock::new();
        let mut host = host();
        host.start(&mut clock, RaceMode::HumanVsBot, Difficulty::Medium);
        for i in 0..10 {
            clock.advance(i as f64 * 16.0);
        }
        assert_eq!(host.state(), HostState::Racing);
        assert_eq!(host.snapshot().unwrap().tick, 10);
        assert_eq!(host.stats().ticks_processed, 10);
    }

    #[test]
    fn test_sink_receives_each_tick() {
        let mut clock = FrameClock::new();
        let mut host = host();
        let recorder = Recorder::default();
        let snapshots = Rc::clone(&recorder.snapshots);
        host.attach_sink(Box::new(recorder));

        host.start(&mut clock, RaceMode::HumanVsHuman, Difficulty::Easy);
        for i in 0..5 {
            clock.advance(i as f64 * 16.0);
        }
        assert_eq!(snapshots.borrow().len(), 5);
        assert_eq!(snapshots.borrow()[4].tick, 5);

        assert!(host.detach_sink().is_some());
        clock.advance(100.0);
        assert_eq!(snapshots.borrow().len(), 5);
    }

    #[test]
    fn test_stop_is_immediate() {
        let mut clock = FrameClock::new();
        let mut host = host();
        host.start(&mut clock, RaceMode::HumanVsBot, Difficulty::Hard);
        clock.advance(0.0);
        clock.advance(16.0);

        host.stop();
        assert!(!host.is_running());
        assert_eq!(host.state(), HostState::Idle);
        assert_eq!(clock.active_tasks(), 0);
        clock.advance(32.0);
        assert!(host.snapshot().is_none());
    }

    #[test]
    fn test_restart_cancels_previous_task() {
        let mut clock = FrameClock::new();
        let mut host = host();
        host.start(&mut clock, RaceMode::HumanVsBot, Difficulty::Hard);
        for i in 0..20 {
            clock.advance(i as f64 * 16.0);
        }

        host.start(&mut clock, RaceMode::HumanVsHuman, Difficulty::Easy);
        assert_eq!(clock.active_tasks(), 1);
        assert_eq!(host.snapshot().unwrap().tick, 0);
        clock.advance(400.0);
        assert_eq!(host.snapshot().unwrap().tick, 1);
        assert_eq!(host.stats().ticks_processed, 1);
    }

    #[test]
    fn test_stop_releases_keys() {
        let mut clock = FrameClock::new();
        let mut host = host();
        let keys = host.keyboard(0).unwrap();
        host.start(&mut clock, RaceMode::HumanVsHuman, Difficulty::Easy);
        keys.set(ControlKeys {
            accelerate: true,
            ..ControlKeys::default()
        });
        host.stop();
        assert_eq!(keys.get(), ControlKeys::default());
        assert!(host.keyboard(2).is_none());
    }
}
