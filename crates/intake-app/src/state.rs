// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::TransitionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Edit,
}

/// Shell-visible UI state: which transitions are expanded into edit forms,
/// whether keys feed navigation or the focused field, and the status line.
/// Editing buffers live in per-row editors, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub open_transitions: BTreeSet<TransitionId>,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            open_transitions: BTreeSet::new(),
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    EnterEditMode,
    ExitToNav,
    ToggleTransitionOpen(TransitionId),
    CloseTransition(TransitionId),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TransitionOpened(TransitionId),
    TransitionClosed(TransitionId),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::EnterEditMode => {
                self.mode = AppMode::Edit;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                // Leaving edit mode drops any advisory message so the hint
                // line reflects the new mode.
                self.mode = AppMode::Nav;
                self.status_line = None;
                vec![AppEvent::ModeChanged(self.mode), AppEvent::StatusCleared]
            }
            AppCommand::ToggleTransitionOpen(id) => {
                if self.open_transitions.remove(&id) {
                    vec![AppEvent::TransitionClosed(id)]
                } else {
                    self.open_transitions.insert(id);
                    vec![AppEvent::TransitionOpened(id)]
                }
            }
            AppCommand::CloseTransition(id) => {
                if self.open_transitions.remove(&id) {
                    vec![AppEvent::TransitionClosed(id)]
                } else {
                    Vec::new()
                }
            }
            AppCommand::SetStatus(message) => {
                vec![self.set_status(&message)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn is_open(&self, id: TransitionId) -> bool {
        self.open_transitions.contains(&id)
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
