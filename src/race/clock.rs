//! Clock - Repeating frame tasks driven by an external timestamp source
//!
//! The embedding frame loop calls `advance` with a monotonically increasing
//! timestamp; every active task runs once per advance. Cancelling a handle
//! takes effect immediately, even for an advance already in progress.

use std::cell::Cell;
use std::rc::Rc;

/// Returned by a task to say whether it wants more frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Continue,
    Done,
}

/// Handle for a registered task
#[derive(Debug, Clone)]
pub struct TickHandle {
    active: Rc<Cell<bool>>,
}

impl TickHandle {
    /// Stop the task. No further invocation happens after this returns.
    pub fn cancel(&self) {
        self.active.set(false);
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

struct FrameTask {
    active: Rc<Cell<bool>>,
    run: Box<dyn FnMut(f64) -> TaskStatus>,
}

/// Single-threaded frame scheduler
#[derive(Default)]
pub struct FrameClock {
    tasks: Vec<FrameTask>,
    last_timestamp: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task to run on every subsequent frame
    pub fn register(&mut self, task: impl FnMut(f64) -> TaskStatus + 'static) -> TickHandle {
        let active = Rc::new(Cell::new(true));
        self.tasks.push(FrameTask {
            active: Rc::clone(&active),
            run: Box::new(task),
        });
        TickHandle { active }
    }

    /// Deliver one frame. Timestamps that go backwards are raised to the last one seen.
    pub fn advance(&mut self, timestamp_ms: f64) {
        let timestamp = match self.last_timestamp {
            Some(last) if timestamp_ms < last => last,
            _ => timestamp_ms,
        };
        self.last_timestamp = Some(timestamp);

        self.tasks.retain_mut(|task| {
            if !task.active.get() {
                return false;
            }
            match (task.run)(timestamp) {
                TaskStatus::Continue => task.active.get(),
                TaskStatus::Done => {
                    task.active.set(false);
                    false
                }
            }
        });
    }

    /// Number of tasks still scheduled
    pub fn active_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| t.active.get()).count()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }
}
