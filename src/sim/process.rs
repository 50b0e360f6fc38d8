//! Resumable step sequences
//!
//! A process is a behaviour the owning system advances once per tick. Each step
//! either continues next frame, waits a number of seconds, or finishes. Loop
//! counters and stage markers live on the owning system as plain fields, so the
//! process itself only tracks whether it is attached and how long it is sleeping.

/// What a step asks the scheduler to do next
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Run again next frame
    Continue,
    /// Sleep for this many seconds before the next step
    Wait(f32),
    /// Detach the process
    Done,
}

/// Scheduling state of one process
#[derive(Debug, Clone)]
pub struct Process {
    name: &'static str,
    running: bool,
    wait: f32,
}

impl Process {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: false,
            wait: 0.0,
        }
    }

    /// Attach the process. Returns false if it was already running; a running
    /// process is never attached twice.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        log::trace!("process '{}' started", self.name);
        self.running = true;
        self.wait = 0.0;
        true
    }

    /// Detach the process; stopping a stopped process does nothing
    pub fn stop(&mut self) {
        if self.running {
            log::trace!("process '{}' stopped", self.name);
        }
        self.running = false;
        self.wait = 0.0;
    }

    /// Start from the first step, whether or not it was running
    pub fn restart(&mut self) {
        self.running = true;
        self.wait = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.running
    }

    /// Count down any pending wait. Returns true when the next step should run
    /// this frame.
    pub fn poll(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        if self.wait > 0.0 {
            self.wait -= dt;
            if self.wait > 0.0 {
                return false;
            }
            self.wait = 0.0;
        }
        true
    }

    /// Apply the result of a step
    pub fn resolve(&mut self, step: Step) {
        match step {
            Step::Continue => {}
            Step::Wait(secs) => self.wait = secs.max(0.0),
            Step::Done => self.stop(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
