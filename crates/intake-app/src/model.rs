// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::ids::*;

/// Comparison operator applied to a referenced question's answer and a
/// literal value. Stored by token; rendered by phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Condition {
    pub const ALL: [Self; 6] = [
        Self::Equals,
        Self::NotEquals,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThan => "less_than",
            Self::LessThanOrEqual => "less_than_or_equal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "equals" => Some(Self::Equals),
            "not_equals" => Some(Self::NotEquals),
            "greater_than" => Some(Self::GreaterThan),
            "greater_than_or_equal" => Some(Self::GreaterThanOrEqual),
            "less_than" => Some(Self::LessThan),
            "less_than_or_equal" => Some(Self::LessThanOrEqual),
            _ => None,
        }
    }

    pub const fn phrase(self) -> &'static str {
        match self {
            Self::Equals => "is equal to",
            Self::NotEquals => "is not equal to",
            Self::GreaterThan => "is greater than",
            Self::GreaterThanOrEqual => "is at least",
            Self::LessThan => "is less than",
            Self::LessThanOrEqual => "is at most",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    Text,
    Email,
    Number,
    Date,
    YesNo,
    Choice,
}

impl QuestionKind {
    pub const ALL: [Self; 6] = [
        Self::Text,
        Self::Email,
        Self::Number,
        Self::Date,
        Self::YesNo,
        Self::Choice,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Number => "number",
            Self::Date => "date",
            Self::YesNo => "yes_no",
            Self::Choice => "choice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "email" => Some(Self::Email),
            "number" => Some(Self::Number),
            "date" => Some(Self::Date),
            "yes_no" => Some(Self::YesNo),
            "choice" => Some(Self::Choice),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Number => "number",
            Self::Date => "date",
            Self::YesNo => "yes/no",
            Self::Choice => "choice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub script_id: ScriptId,
    pub name: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub position: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A conditional edge from one question to another. `condition`, `variable`,
/// and `value` are set together or not at all; an unconditional transition
/// always follows `previous`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: TransitionId,
    pub previous: QuestionId,
    pub next: QuestionId,
    pub condition: Option<Condition>,
    pub variable: Option<QuestionId>,
    pub value: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Read-side question index keyed by id, used by the description renderer
/// and option derivation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionLookup {
    names: BTreeMap<QuestionId, String>,
}

impl QuestionLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_questions<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Self {
        let mut lookup = Self::new();
        for question in questions {
            lookup.insert(question.id, question.name.clone());
        }
        lookup
    }

    pub fn insert(&mut self, id: QuestionId, name: String) {
        self.names.insert(id, name);
    }

    pub fn name(&self, id: QuestionId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Display name for a question, falling back to a numeric reference for
    /// ids that are no longer present.
    pub fn display_name(&self, id: QuestionId) -> String {
        match self.name(id) {
            Some(name) => name.to_owned(),
            None => format!("question #{}", id.get()),
        }
    }

    pub fn contains(&self, id: QuestionId) -> bool {
        self.names.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
