// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{Condition, Question, QuestionId, Transition, TransitionId};

/// The editable fields of a transition, as an explicit finite set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionField {
    Previous,
    Condition,
    Variable,
    Value,
}

impl TransitionField {
    pub const ALL: [Self; 4] = [
        Self::Previous,
        Self::Condition,
        Self::Variable,
        Self::Value,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Previous => "previous",
            Self::Condition => "condition",
            Self::Variable => "variable",
            Self::Value => "value",
        }
    }
}

/// Local edit snapshot of one transition. Fields are raw text buffers; the
/// empty string is the unset sentinel mirroring NULL in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDraft {
    pub previous: String,
    pub condition: String,
    pub variable: String,
    pub value: String,
}

/// Typed update payload produced from a valid draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSubmit {
    pub transition_id: TransitionId,
    pub question_id: QuestionId,
    pub previous: QuestionId,
    pub condition: Option<Condition>,
    pub variable: Option<QuestionId>,
    pub value: Option<String>,
}

impl TransitionDraft {
    pub fn from_transition(transition: &Transition) -> Self {
        Self {
            previous: transition.previous.get().to_string(),
            condition: transition
                .condition
                .map(|condition| condition.as_str().to_owned())
                .unwrap_or_default(),
            variable: transition
                .variable
                .map(|variable| variable.get().to_string())
                .unwrap_or_default(),
            value: transition.value.clone().unwrap_or_default(),
        }
    }

    pub fn field(&self, field: TransitionField) -> &str {
        match field {
            TransitionField::Previous => &self.previous,
            TransitionField::Condition => &self.condition,
            TransitionField::Variable => &self.variable,
            TransitionField::Value => &self.value,
        }
    }

    pub fn set_field(&mut self, field: TransitionField, text: impl Into<String>) {
        let slot = match field {
            TransitionField::Previous => &mut self.previous,
            TransitionField::Condition => &mut self.condition,
            TransitionField::Variable => &mut self.variable,
            TransitionField::Value => &mut self.value,
        };
        *slot = text.into();
    }

    /// True iff any buffer diverges from the stored transition. NULL in the
    /// store and the empty buffer count as equal, so filling in a field of a
    /// previously unconditional transition only registers once text appears.
    pub fn has_changed(&self, transition: &Transition) -> bool {
        buffer_differs(
            &self.previous,
            Some(transition.previous.get().to_string()).as_deref(),
        ) || buffer_differs(
            &self.condition,
            transition.condition.map(Condition::as_str),
        ) || buffer_differs(
            &self.variable,
            transition
                .variable
                .map(|variable| variable.get().to_string())
                .as_deref(),
        ) || buffer_differs(&self.value, transition.value.as_deref())
    }

    /// Validity predicate over the raw buffers: `previous` must name a
    /// question id, and the condition clause must be wholly absent or wholly
    /// present.
    pub fn is_valid(&self) -> bool {
        if parse_question_ref(&self.previous).is_none() {
            return false;
        }

        let condition_unset = self.condition.is_empty();
        let variable_unset = self.variable.is_empty();
        let value_unset = self.value.is_empty();
        if condition_unset && variable_unset && value_unset {
            return true;
        }

        Condition::parse(&self.condition).is_some()
            && parse_question_ref(&self.variable).is_some()
            && !value_unset
    }

    /// Parse the draft into a typed payload, or explain what is wrong.
    pub fn validate(
        &self,
        transition_id: TransitionId,
        question_id: QuestionId,
    ) -> Result<TransitionSubmit> {
        let Some(previous) = parse_question_ref(&self.previous) else {
            bail!("previous question is required -- choose a question and retry");
        };

        if self.condition.is_empty() && self.variable.is_empty() && self.value.is_empty() {
            return Ok(TransitionSubmit {
                transition_id,
                question_id,
                previous,
                condition: None,
                variable: None,
                value: None,
            });
        }

        let Some(condition) = Condition::parse(&self.condition) else {
            bail!(
                "unknown condition {:?} -- choose one of the listed operators",
                self.condition
            );
        };
        let Some(variable) = parse_question_ref(&self.variable) else {
            bail!("condition variable is required -- choose a question and retry");
        };
        if self.value.is_empty() {
            bail!("condition value is required -- enter a comparison value and retry");
        }

        Ok(TransitionSubmit {
            transition_id,
            question_id,
            previous,
            condition: Some(condition),
            variable: Some(variable),
            value: Some(self.value.clone()),
        })
    }
}

fn buffer_differs(buffer: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(stored) => buffer != stored,
        // NULL ≡ "" for change detection only.
        None => !buffer.is_empty(),
    }
}

fn parse_question_ref(buffer: &str) -> Option<QuestionId> {
    let id: i64 = buffer.trim().parse().ok()?;
    (id > 0).then(|| QuestionId::new(id))
}

/// The questions eligible as `previous` or `variable` for a transition into
/// `question_id`: every other question in the script, in script order.
pub fn question_options(questions: &[Question], question_id: QuestionId) -> Vec<&Question> {
    let mut options: Vec<&Question> = questions
        .iter()
        .filter(|question| question.id != question_id)
        .collect();
    options.sort_by_key(|question| (question.position, question.id));
    options
}

#[cfg(test)]
mod tests {
    use super::{TransitionDraft, TransitionField, question_options};
    use crate::{Condition, Question, QuestionId, QuestionKind, ScriptId, Transition, TransitionId};
    use time::OffsetDateTime;

    fn unconditional_transition() -> Transition {
        Transition {
            id: TransitionId::new(5),
            previous: QuestionId::new(2),
            next: QuestionId::new(3),
            condition: None,
            variable: None,
            value: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn question(id: i64, name: &str, position: i32) -> Question {
        Question {
            id: QuestionId::new(id),
            script_id: ScriptId::new(1),
            name: name.to_owned(),
            prompt: String::new(),
            kind: QuestionKind::Text,
            position,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn draft_mirrors_null_fields_as_empty_buffers() {
        let draft = TransitionDraft::from_transition(&unconditional_transition());
        assert_eq!(draft.previous, "2");
        assert_eq!(draft.condition, "");
        assert_eq!(draft.variable, "");
        assert_eq!(draft.value, "");
    }

    #[test]
    fn fresh_draft_has_no_changes() {
        let transition = unconditional_transition();
        let draft = TransitionDraft::from_transition(&transition);
        assert!(!draft.has_changed(&transition));
    }

    #[test]
    fn null_and_empty_buffer_are_equal_for_change_detection() {
        let transition = unconditional_transition();
        let mut draft = TransitionDraft::from_transition(&transition);
        draft.set_field(TransitionField::Condition, "");
        draft.set_field(TransitionField::Value, "");
        assert!(!draft.has_changed(&transition));
    }

    #[test]
    fn any_other_divergence_registers_as_change() {
        let transition = unconditional_transition();

        let mut draft = TransitionDraft::from_transition(&transition);
        draft.set_field(TransitionField::Previous, "7");
        assert!(draft.has_changed(&transition));

        let mut draft = TransitionDraft::from_transition(&transition);
        draft.set_field(TransitionField::Value, "yes");
        assert!(draft.has_changed(&transition));
    }

    #[test]
    fn unconditional_draft_is_valid() {
        let draft = TransitionDraft::from_transition(&unconditional_transition());
        assert!(draft.is_valid());
    }

    #[test]
    fn partial_condition_clause_is_invalid() {
        let transition = unconditional_transition();
        let mut draft = TransitionDraft::from_transition(&transition);
        draft.set_field(TransitionField::Condition, "equals");
        assert!(!draft.is_valid());

        draft.set_field(TransitionField::Variable, "2");
        assert!(!draft.is_valid());

        draft.set_field(TransitionField::Value, "yes");
        assert!(draft.is_valid());
    }

    #[test]
    fn unknown_condition_token_is_invalid() {
        let mut draft = TransitionDraft::from_transition(&unconditional_transition());
        draft.set_field(TransitionField::Condition, "contains");
        draft.set_field(TransitionField::Variable, "2");
        draft.set_field(TransitionField::Value, "yes");
        assert!(!draft.is_valid());
    }

    #[test]
    fn missing_previous_is_invalid_and_actionable() {
        let mut draft = TransitionDraft::from_transition(&unconditional_transition());
        draft.set_field(TransitionField::Previous, "");
        assert!(!draft.is_valid());

        let error = draft
            .validate(TransitionId::new(5), QuestionId::new(3))
            .expect_err("empty previous should fail");
        assert!(error.to_string().contains("previous question is required"));
    }

    #[test]
    fn valid_draft_parses_into_typed_payload() {
        let mut draft = TransitionDraft::from_transition(&unconditional_transition());
        draft.set_field(TransitionField::Condition, "equals");
        draft.set_field(TransitionField::Variable, "2");
        draft.set_field(TransitionField::Value, "yes");

        let submit = draft
            .validate(TransitionId::new(5), QuestionId::new(3))
            .expect("valid draft");
        assert_eq!(submit.previous, QuestionId::new(2));
        assert_eq!(submit.condition, Some(Condition::Equals));
        assert_eq!(submit.variable, Some(QuestionId::new(2)));
        assert_eq!(submit.value.as_deref(), Some("yes"));
    }

    #[test]
    fn question_options_exclude_destination_and_follow_script_order() {
        let questions = vec![
            question(3, "Outcome", 2),
            question(1, "Name", 0),
            question(2, "Tenancy", 1),
        ];

        let options = question_options(&questions, QuestionId::new(3));
        let names: Vec<&str> = options.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Tenancy"]);
    }
}
