// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use intake_app::{
    Question, QuestionId, Script, ScriptId, Transition, TransitionActions, TransitionId,
    TransitionSubmit,
};
use intake_db::{NewTransition, Store};

/// Bridges the editor shell to the SQLite store for one selected script.
pub struct DbRuntime<'a> {
    store: &'a Store,
    script_id: ScriptId,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store, script_id: ScriptId) -> Self {
        Self { store, script_id }
    }
}

impl TransitionActions for DbRuntime<'_> {
    fn update_transition(&mut self, submit: &TransitionSubmit) -> Result<()> {
        self.store.update_transition(submit)
    }

    fn delete_transition(&mut self, transition_id: TransitionId) -> Result<()> {
        self.store.delete_transition(transition_id)
    }
}

impl intake_tui::AppRuntime for DbRuntime<'_> {
    fn load_script(&mut self) -> Result<Script> {
        self.store.get_script(self.script_id)
    }

    fn load_questions(&mut self) -> Result<Vec<Question>> {
        self.store.list_questions(self.script_id)
    }

    fn load_transitions(&mut self) -> Result<Vec<Transition>> {
        self.store.list_transitions(self.script_id)
    }

    fn create_transition(
        &mut self,
        previous: QuestionId,
        next: QuestionId,
    ) -> Result<TransitionId> {
        self.store.create_transition(&NewTransition {
            previous,
            next,
            condition: None,
            variable: None,
            value: None,
        })
    }
}
