use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Run state shared between a streaming loop and whoever may stop it.
///
/// Cloning yields another handle to the same state. `stop` wakes a loop that
/// is parked in `wait`.
#[derive(Clone, Debug)]
pub struct LoopControl {
    inner: Arc<(Mutex<LoopState>, Condvar)>,
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopControl {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(LoopState::Idle), Condvar::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopState> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LoopState {
        *self.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Enter `Running`. Returns `false` when a stop was requested before the loop began.
    pub fn begin(&self) -> bool {
        let mut state = self.lock();
        match *state {
            LoopState::Idle | LoopState::Stopped => {
                *state = LoopState::Running;
                true
            }
            LoopState::Running => true,
            LoopState::Stopping => {
                *state = LoopState::Stopped;
                self.inner.1.notify_all();
                false
            }
        }
    }

    /// Request a stop. Safe to call from any thread, any number of times.
    pub fn stop(&self) {
        let mut state = self.lock();
        if matches!(*state, LoopState::Idle | LoopState::Running) {
            *state = LoopState::Stopping;
            self.inner.1.notify_all();
        }
    }

    /// Park for up to `timeout`. Returns `true` if the loop should keep running.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (state, _) = self
            .inner
            .1
            .wait_timeout_while(guard, timeout, |state| *state == LoopState::Running)
            .unwrap_or_else(PoisonError::into_inner);
        *state == LoopState::Running
    }

    /// Mark the loop as finished.
    pub fn finish(&self) {
        let mut state = self.lock();
        *state = LoopState::Stopped;
        self.inner.1.notify_all();
    }

    /// Block until the loop reports `Stopped` or `timeout` passes.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (state, _) = self
            .inner
            .1
            .wait_timeout_while(guard, timeout, |state| *state != LoopState::Stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *state == LoopState::Stopped
    }
}
