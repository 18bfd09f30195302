// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

/// Quiet period after the last edit before a save fires.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1600);

/// Single-slot cancellable deadline. Each `schedule` replaces any pending
/// deadline, so a burst of edits yields at most one fire, after the window
/// of input silence has passed. Dropping the gate cancels the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveGate {
    window: Duration,
    deadline: Option<Instant>,
}

impl AutosaveGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true exactly once per scheduled window, when the deadline has
    /// passed; clears the slot on fire.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for AutosaveGate {
    fn default() -> Self {
        Self::new(AUTOSAVE_DEBOUNCE)
    }
}
