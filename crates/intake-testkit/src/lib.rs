// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use intake_app::{Condition, QuestionKind};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::macros::datetime;

const SCRIPT_TOPICS: [&str; 10] = [
    "Patient Intake",
    "Warranty Claim",
    "Customer Onboarding",
    "Exit Interview",
    "Incident Report",
    "Volunteer Signup",
    "Product Feedback",
    "Housing Application",
    "Insurance Quote",
    "Event Registration",
];

const QUESTION_SUBJECTS: [&str; 14] = [
    "full name",
    "email address",
    "phone number",
    "date of birth",
    "preferred contact time",
    "household size",
    "annual income",
    "referral source",
    "appointment date",
    "policy number",
    "street address",
    "employer name",
    "emergency contact",
    "membership tier",
];

const YES_NO_SUBJECTS: [&str; 8] = [
    "a returning customer",
    "over 18",
    "currently insured",
    "a homeowner",
    "available on weekends",
    "interested in updates",
    "filing for the first time",
    "using a screen reader",
];

const CHOICE_VALUES: [&str; 8] = [
    "yes", "no", "maybe", "weekly", "monthly", "gold", "silver", "bronze",
];

const QUESTION_KINDS: [QuestionKind; 6] = [
    QuestionKind::Text,
    QuestionKind::Email,
    QuestionKind::Number,
    QuestionKind::Date,
    QuestionKind::YesNo,
    QuestionKind::Choice,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFixture {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionFixture {
    pub name: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub position: i32,
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Deterministic survey-domain faker. The same seed always yields the same
/// sequence, so fixtures stay stable across runs.
#[derive(Debug, Clone)]
pub struct ScriptFaker {
    rng: DeterministicRng,
    seed: u64,
    serial: u64,
}

impl ScriptFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            serial: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn script(&mut self) -> ScriptFixture {
        self.serial += 1;
        let topic = self.pick(&SCRIPT_TOPICS);
        ScriptFixture {
            name: format!("{topic} {}-{}", self.seed, self.serial),
        }
    }

    pub fn question(&mut self, position: i32) -> QuestionFixture {
        let kind = QUESTION_KINDS[self.rng.int_n(QUESTION_KINDS.len())];
        self.question_of_kind(kind, position)
    }

    pub fn question_of_kind(&mut self, kind: QuestionKind, position: i32) -> QuestionFixture {
        let (name, prompt) = match kind {
            QuestionKind::YesNo => {
                let subject = self.pick(&YES_NO_SUBJECTS);
                (
                    format!("Are you {subject}?"),
                    format!("Answer yes or no: are you {subject}?"),
                )
            }
            _ => {
                let subject = self.pick(&QUESTION_SUBJECTS);
                (
                    format!("What is your {subject}?"),
                    format!("Please enter your {subject}."),
                )
            }
        };
        QuestionFixture {
            name,
            prompt,
            kind,
            position,
        }
    }

    pub fn condition(&mut self) -> Condition {
        Condition::ALL[self.rng.int_n(Condition::ALL.len())]
    }

    pub fn comparison_value(&mut self) -> String {
        if self.rng.bool() {
            self.pick(&CHOICE_VALUES).to_owned()
        } else {
            self.rng.int_n(100).to_string()
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("intake.db");
    Ok((dir, db_path))
}

/// A stable timestamp for fixture entities, so assertions on rendered or
/// serialized dates never depend on the wall clock.
pub fn fixture_datetime() -> OffsetDateTime {
    datetime!(2026-02-19 12:34:56 UTC)
}

pub fn question_kinds() -> &'static [QuestionKind] {
    &QUESTION_KINDS
}

#[cfg(test)]
mod tests {
    use super::ScriptFaker;

    #[test]
    fn same_seed_yields_same_sequence() {
        let mut first = ScriptFaker::new(42);
        let mut second = ScriptFaker::new(42);

        for position in 0..8 {
            assert_eq!(first.script(), second.script());
            assert_eq!(first.question(position), second.question(position));
            assert_eq!(first.condition(), second.condition());
            assert_eq!(first.comparison_value(), second.comparison_value());
        }
    }

    #[test]
    fn zero_seed_is_normalized() {
        let faker = ScriptFaker::new(0);
        assert_ne!(faker.seed(), 0);
    }
}
