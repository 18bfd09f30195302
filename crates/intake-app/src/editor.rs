// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::{
    AutosaveGate, QuestionId, QuestionLookup, Transition, TransitionDraft, TransitionField,
    TransitionId, TransitionSubmit,
};

/// Dispatch boundary for transition writes. Implemented by the store adapter
/// and by test doubles; the editor never reaches into storage itself.
pub trait TransitionActions {
    fn update_transition(&mut self, submit: &TransitionSubmit) -> Result<()>;
    fn delete_transition(&mut self, transition_id: TransitionId) -> Result<()>;
}

/// What a tick or key event did, so the shell can refresh or report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Idle,
    Saved,
    Deleted,
}

/// Edit-state holder for one transition row: a draft of the editable fields,
/// the autosave gate coalescing edits into deferred submits, and the
/// delete-confirmation flag. One instance per transition; discarded when the
/// row disappears, which also drops any pending deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEditor {
    transition: Transition,
    question_id: QuestionId,
    draft: TransitionDraft,
    gate: AutosaveGate,
    loading: bool,
    delete_confirm_open: bool,
}

impl TransitionEditor {
    pub fn new(transition: Transition, question_id: QuestionId, window: Duration) -> Self {
        let draft = TransitionDraft::from_transition(&transition);
        Self {
            transition,
            question_id,
            draft,
            gate: AutosaveGate::new(window),
            loading: false,
            delete_confirm_open: false,
        }
    }

    pub fn transition_id(&self) -> TransitionId {
        self.transition.id
    }

    pub fn draft(&self) -> &TransitionDraft {
        &self.draft
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_delete_confirm_open(&self) -> bool {
        self.delete_confirm_open
    }

    pub fn has_changed(&self) -> bool {
        self.draft.has_changed(&self.transition)
    }

    pub fn is_valid(&self) -> bool {
        self.draft.is_valid()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.gate.next_deadline()
    }

    /// Overwrite one edit buffer and (re)arm the autosave gate. Validation
    /// waits until the gate fires.
    pub fn edit(&mut self, field: TransitionField, text: impl Into<String>, now: Instant) {
        self.draft.set_field(field, text);
        self.gate.schedule(now);
    }

    /// Fire the gate if its deadline has passed and run the submit. Call on
    /// every event-loop pass so a quiescent editor still saves on time.
    pub fn tick(&mut self, now: Instant, actions: &mut dyn TransitionActions) -> Result<EditOutcome> {
        if !self.gate.fire_due(now) {
            return Ok(EditOutcome::Idle);
        }
        self.submit(actions)
    }

    /// Dispatch the current draft. Invalid drafts and overlapping submits are
    /// silently skipped; the changed/invalid row markers are the only signal.
    pub fn submit(&mut self, actions: &mut dyn TransitionActions) -> Result<EditOutcome> {
        if self.loading || !self.draft.is_valid() {
            return Ok(EditOutcome::Idle);
        }
        let submit = self.draft.validate(self.transition.id, self.question_id)?;

        self.loading = true;
        let dispatched = actions.update_transition(&submit);
        self.loading = false;
        dispatched?;

        self.rebase_from(&submit);
        Ok(EditOutcome::Saved)
    }

    /// Open the confirmation prompt. Delete never fires from here.
    pub fn request_delete(&mut self) {
        self.delete_confirm_open = true;
    }

    pub fn cancel_delete(&mut self) {
        self.delete_confirm_open = false;
    }

    /// Dispatch the delete after explicit confirmation. A pending autosave is
    /// cancelled first so the delete cannot race a deferred submit.
    pub fn confirm_delete(&mut self, actions: &mut dyn TransitionActions) -> Result<EditOutcome> {
        if !self.delete_confirm_open {
            return Ok(EditOutcome::Idle);
        }
        self.gate.cancel();
        self.delete_confirm_open = false;
        actions.delete_transition(self.transition.id)?;
        Ok(EditOutcome::Deleted)
    }

    /// Explicit teardown: drop any pending deadline without firing.
    pub fn cancel_pending(&mut self) {
        self.gate.cancel();
    }

    /// Adopt a freshly loaded transition as the new change-detection
    /// baseline, keeping the draft as typed.
    pub fn rebase(&mut self, transition: Transition) {
        self.transition = transition;
    }

    fn rebase_from(&mut self, submit: &TransitionSubmit) {
        self.transition.previous = submit.previous;
        self.transition.condition = submit.condition;
        self.transition.variable = submit.variable;
        self.transition.value = submit.value.clone();
    }

    /// One-line summary of the draft: the prerequisite question and, when a
    /// condition clause is set, the comparison. Pure; tolerates unset and
    /// dangling references.
    pub fn describe(&self, questions: &QuestionLookup) -> String {
        describe_draft(&self.draft, questions)
    }
}

/// Description for a stored transition that has no editor yet.
pub fn describe_transition(transition: &Transition, questions: &QuestionLookup) -> String {
    describe_draft(&TransitionDraft::from_transition(transition), questions)
}

fn describe_draft(draft: &TransitionDraft, questions: &QuestionLookup) -> String {
    let previous = match draft.previous.trim().parse::<i64>() {
        Ok(id) => questions.display_name(QuestionId::new(id)),
        Err(_) => "(no question)".to_owned(),
    };
    let mut description = format!("Follows the question \u{201c}{previous}\u{201d}");

    if let Some(condition) = crate::Condition::parse(&draft.condition) {
        let variable = match draft.variable.trim().parse::<i64>() {
            Ok(id) => questions.display_name(QuestionId::new(id)),
            Err(_) => "(no question)".to_owned(),
        };
        description.push_str(&format!(
            " if the answer to \u{201c}{variable}\u{201d} {} \u{201c}{}\u{201d}",
            condition.phrase(),
            draft.value,
        ));
    }

    description
}
