//! Frame-driven scheduling.
//!
//! Everything runs on the host's render thread: one-shot timers measured on
//! the scene clock, and tasks registered to run on every display-refresh tick.
//! Nothing here blocks; a host that stops ticking simply stalls the schedule.

use std::cell::Cell;
use std::rc::Rc;

/// Shared flag checked at the top of every scheduled callback.
///
/// Clones observe the same flag, so a host-side listener holding a clone stops
/// acting the moment the scene is torn down.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// A host-side listener registration that detaches itself when dropped.
///
/// The detach callback owns the listener, which stays alive until it has
/// been unregistered.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.detach.is_some()
    }

    /// Run the detach callback. Later calls do nothing.
    pub fn detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Work the director knows how to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    /// Startup delay elapsed: begin the draw-in.
    BeginDrawing,
    /// Per-tick draw/reveal progression.
    Progress,
}

#[derive(Clone, Copy, Debug)]
struct Timer {
    due: f32,
    task: Task,
}

/// Pending timers plus per-tick registrations.
#[derive(Debug)]
pub struct FrameScheduler {
    timers: Vec<Timer>,
    per_tick: Vec<Task>,
    token: CancelToken,
}

impl FrameScheduler {
    pub fn new(token: CancelToken) -> Self {
        Self {
            timers: Vec::new(),
            per_tick: Vec::new(),
            token,
        }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Fire `task` on the first tick at or after `now + delay`.
    pub fn schedule_after(&mut self, now: f32, delay: f32, task: Task) {
        if self.token.is_cancelled() {
            return;
        }
        self.timers.push(Timer { due: now + delay.max(0.0), task });
    }

    /// Run `task` once per tick until unregistered.
    pub fn register_tick(&mut self, task: Task) {
        if self.token.is_cancelled() || self.per_tick.contains(&task) {
            return;
        }
        self.per_tick.push(task);
    }

    pub fn unregister_tick(&mut self, task: Task) {
        self.per_tick.retain(|t| *t != task);
    }

    /// Remove and return timers due at `now`, in scheduling order.
    pub fn take_due(&mut self, now: f32) -> Vec<Task> {
        if self.token.is_cancelled() {
            return Vec::new();
        }
        let mut due = Vec::new();
        self.timers.retain(|timer| {
            if timer.due <= now {
                due.push(timer.task);
                false
            } else {
                true
            }
        });
        due
    }

    /// Snapshot of the per-tick registrations.
    pub fn tick_tasks(&self) -> Vec<Task> {
        if self.token.is_cancelled() {
            return Vec::new();
        }
        self.per_tick.clone()
    }

    pub fn has_pending(&self) -> bool {
        !self.timers.is_empty() || !self.per_tick.is_empty()
    }

    /// Cancel the token and drop every timer and registration.
    pub fn cancel_all(&mut self) {
        self.token.cancel();
        self.timers.clear();
        self.per_tick.clear();
    }
}
