// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use intake_app::{
    Condition, Question, QuestionId, QuestionKind, QuestionLookup, Script, ScriptId, Transition,
    TransitionId, TransitionSubmit,
};
use rusqlite::{Connection, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

pub const APP_NAME: &str = "intake";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("scripts", &["id", "name", "created_at", "updated_at"]),
    (
        "questions",
        &[
            "id",
            "script_id",
            "name",
            "prompt",
            "kind",
            "position",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "transitions",
        &[
            "id",
            "previous_question_id",
            "next_question_id",
            "condition",
            "variable_question_id",
            "value",
            "created_at",
            "updated_at",
        ],
    ),
];

struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_scripts_name",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_scripts_name ON scripts (name);",
    },
    RequiredIndex {
        name: "idx_questions_script_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_questions_script_id ON questions (script_id);",
    },
    RequiredIndex {
        name: "idx_questions_script_position",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_questions_script_position ON questions (script_id, position);",
    },
    RequiredIndex {
        name: "idx_transitions_previous_question_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_transitions_previous_question_id ON transitions (previous_question_id);",
    },
    RequiredIndex {
        name: "idx_transitions_next_question_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_transitions_next_question_id ON transitions (next_question_id);",
    },
    RequiredIndex {
        name: "idx_transitions_variable_question_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_transitions_variable_question_id ON transitions (variable_question_id);",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScript {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub script_id: ScriptId,
    pub name: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateQuestion {
    pub name: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransition {
    pub previous: QuestionId,
    pub next: QuestionId,
    pub condition: Option<Condition>,
    pub variable: Option<QuestionId>,
    pub value: Option<String>,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;
        Ok(())
    }

    /// Populate an empty store with a faked script so the editor has
    /// something to show. Intended for the in-memory demo mode.
    pub fn seed_demo_data(&self) -> Result<ScriptId> {
        let mut faker = intake_testkit::ScriptFaker::new(42);

        let script = faker.script();
        let script_id = self.create_script(&NewScript { name: script.name })?;

        let mut question_ids = Vec::new();
        for position in 0..5 {
            let fixture = if position == 2 {
                faker.question_of_kind(QuestionKind::YesNo, position)
            } else {
                faker.question(position)
            };
            let question_id = self.create_question(&NewQuestion {
                script_id,
                name: fixture.name,
                prompt: fixture.prompt,
                kind: fixture.kind,
                position: fixture.position,
            })?;
            question_ids.push(question_id);
        }

        for window in question_ids.windows(2) {
            self.create_transition(&NewTransition {
                previous: window[0],
                next: window[1],
                condition: None,
                variable: None,
                value: None,
            })?;
        }

        // One conditional edge keyed off the yes/no question.
        self.create_transition(&NewTransition {
            previous: question_ids[2],
            next: question_ids[4],
            condition: Some(Condition::Equals),
            variable: Some(question_ids[2]),
            value: Some("yes".to_owned()),
        })?;

        Ok(script_id)
    }

    pub fn create_script(&self, new_script: &NewScript) -> Result<ScriptId> {
        if new_script.name.trim().is_empty() {
            bail!("script name must not be empty -- provide a name and retry");
        }
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "INSERT INTO scripts (name, created_at, updated_at) VALUES (?, ?, ?)",
                params![new_script.name, now, now],
            )
            .with_context(|| format!("insert script {:?}", new_script.name))?;
        Ok(ScriptId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_script(&self, script_id: ScriptId) -> Result<Script> {
        self.conn
            .query_row(
                "
                SELECT id, name, created_at, updated_at
                FROM scripts
                WHERE id = ?
                ",
                params![script_id.get()],
                |row| {
                    let created_at_raw: String = row.get(2)?;
                    let updated_at_raw: String = row.get(3)?;
                    Ok(Script {
                        id: ScriptId::new(row.get(0)?),
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
                    })
                },
            )
            .with_context(|| format!("load script {}", script_id.get()))
    }

    pub fn list_scripts(&self) -> Result<Vec<Script>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, name, created_at, updated_at
                FROM scripts
                ORDER BY name ASC, id ASC
                ",
            )
            .context("prepare scripts query")?;
        let rows = stmt
            .query_map([], |row| {
                let created_at_raw: String = row.get(2)?;
                let updated_at_raw: String = row.get(3)?;
                Ok(Script {
                    id: ScriptId::new(row.get(0)?),
                    name: row.get(1)?,
                    created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                    updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query scripts")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect scripts")
    }

    pub fn rename_script(&self, script_id: ScriptId, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            bail!("script name must not be empty -- provide a name and retry");
        }
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "UPDATE scripts SET name = ?, updated_at = ? WHERE id = ?",
                params![name, now, script_id.get()],
            )
            .context("rename script")?;
        if rows_affected == 0 {
            bail!(
                "script {} not found -- choose an existing script and retry",
                script_id.get()
            );
        }
        Ok(())
    }

    /// Hard delete; questions and their transitions cascade.
    pub fn delete_script(&self, script_id: ScriptId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM scripts WHERE id = ?", params![script_id.get()])
            .context("delete script")?;
        if rows_affected == 0 {
            bail!(
                "script {} not found -- choose an existing script and retry",
                script_id.get()
            );
        }
        Ok(())
    }

    pub fn create_question(&self, new_question: &NewQuestion) -> Result<QuestionId> {
        if new_question.name.trim().is_empty() {
            bail!("question name must not be empty -- provide a name and retry");
        }
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO questions (
                  script_id, name, prompt, kind, position, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_question.script_id.get(),
                    new_question.name,
                    new_question.prompt,
                    new_question.kind.as_str(),
                    new_question.position,
                    now,
                    now,
                ],
            )
            .context("insert question")?;
        Ok(QuestionId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_question(&self, question_id: QuestionId) -> Result<Question> {
        self.conn
            .query_row(
                "
                SELECT id, script_id, name, prompt, kind, position, created_at, updated_at
                FROM questions
                WHERE id = ?
                ",
                params![question_id.get()],
                question_from_row,
            )
            .with_context(|| format!("load question {}", question_id.get()))
    }

    pub fn list_questions(&self, script_id: ScriptId) -> Result<Vec<Question>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, script_id, name, prompt, kind, position, created_at, updated_at
                FROM questions
                WHERE script_id = ?
                ORDER BY position ASC, id ASC
                ",
            )
            .context("prepare questions query")?;
        let rows = stmt
            .query_map(params![script_id.get()], question_from_row)
            .context("query questions")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect questions")
    }

    pub fn update_question(&self, question_id: QuestionId, update: &UpdateQuestion) -> Result<()> {
        if update.name.trim().is_empty() {
            bail!("question name must not be empty -- provide a name and retry");
        }
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE questions
                SET name = ?, prompt = ?, kind = ?, position = ?, updated_at = ?
                WHERE id = ?
                ",
                params![
                    update.name,
                    update.prompt,
                    update.kind.as_str(),
                    update.position,
                    now,
                    question_id.get(),
                ],
            )
            .context("update question")?;
        if rows_affected == 0 {
            bail!(
                "question {} not found -- choose an existing question and retry",
                question_id.get()
            );
        }
        Ok(())
    }

    /// Hard delete; transitions referencing the question cascade.
    pub fn delete_question(&self, question_id: QuestionId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM questions WHERE id = ?",
                params![question_id.get()],
            )
            .context("delete question")?;
        if rows_affected == 0 {
            bail!(
                "question {} not found -- choose an existing question and retry",
                question_id.get()
            );
        }
        Ok(())
    }

    pub fn question_lookup(&self, script_id: ScriptId) -> Result<QuestionLookup> {
        let questions = self.list_questions(script_id)?;
        Ok(QuestionLookup::from_questions(&questions))
    }

    pub fn create_transition(&self, new_transition: &NewTransition) -> Result<TransitionId> {
        validate_clause(
            new_transition.condition,
            new_transition.variable,
            new_transition.value.as_deref(),
        )?;
        let script_id = self.question_script(new_transition.next)?;
        self.ensure_same_script(script_id, new_transition.previous, "previous question")?;
        if let Some(variable) = new_transition.variable {
            self.ensure_same_script(script_id, variable, "condition variable")?;
        }

        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO transitions (
                  previous_question_id, next_question_id, condition,
                  variable_question_id, value, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_transition.previous.get(),
                    new_transition.next.get(),
                    new_transition.condition.map(Condition::as_str),
                    new_transition.variable.map(QuestionId::get),
                    new_transition.value,
                    now,
                    now,
                ],
            )
            .context("insert transition")?;
        Ok(TransitionId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_transition(&self, transition_id: TransitionId) -> Result<Transition> {
        self.conn
            .query_row(
                "
                SELECT
                  id, previous_question_id, next_question_id, condition,
                  variable_question_id, value, created_at, updated_at
                FROM transitions
                WHERE id = ?
                ",
                params![transition_id.get()],
                transition_from_row,
            )
            .with_context(|| format!("load transition {}", transition_id.get()))
    }

    /// Transitions leading into one destination question, creation order.
    pub fn list_transitions_into(&self, question_id: QuestionId) -> Result<Vec<Transition>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  id, previous_question_id, next_question_id, condition,
                  variable_question_id, value, created_at, updated_at
                FROM transitions
                WHERE next_question_id = ?
                ORDER BY id ASC
                ",
            )
            .context("prepare transitions query")?;
        let rows = stmt
            .query_map(params![question_id.get()], transition_from_row)
            .context("query transitions")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect transitions")
    }

    pub fn list_transitions(&self, script_id: ScriptId) -> Result<Vec<Transition>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  t.id, t.previous_question_id, t.next_question_id, t.condition,
                  t.variable_question_id, t.value, t.created_at, t.updated_at
                FROM transitions t
                JOIN questions q ON q.id = t.next_question_id
                WHERE q.script_id = ?
                ORDER BY t.id ASC
                ",
            )
            .context("prepare script transitions query")?;
        let rows = stmt
            .query_map(params![script_id.get()], transition_from_row)
            .context("query script transitions")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect script transitions")
    }

    pub fn update_transition(&self, submit: &TransitionSubmit) -> Result<()> {
        validate_clause(submit.condition, submit.variable, submit.value.as_deref())?;
        let current = self.get_transition(submit.transition_id)?;
        let script_id = self.question_script(current.next)?;
        self.ensure_same_script(script_id, submit.previous, "previous question")?;
        if let Some(variable) = submit.variable {
            self.ensure_same_script(script_id, variable, "condition variable")?;
        }

        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE transitions
                SET
                  previous_question_id = ?,
                  condition = ?,
                  variable_question_id = ?,
                  value = ?,
                  updated_at = ?
                WHERE id = ?
                ",
                params![
                    submit.previous.get(),
                    submit.condition.map(Condition::as_str),
                    submit.variable.map(QuestionId::get),
                    submit.value,
                    now,
                    submit.transition_id.get(),
                ],
            )
            .context("update transition")?;
        if rows_affected == 0 {
            bail!(
                "transition {} not found -- reload the script and retry",
                submit.transition_id.get()
            );
        }
        Ok(())
    }

    pub fn delete_transition(&self, transition_id: TransitionId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM transitions WHERE id = ?",
                params![transition_id.get()],
            )
            .context("delete transition")?;
        if rows_affected == 0 {
            bail!(
                "transition {} not found -- reload the script and retry",
                transition_id.get()
            );
        }
        Ok(())
    }

    fn question_script(&self, question_id: QuestionId) -> Result<ScriptId> {
        self.conn
            .query_row(
                "SELECT script_id FROM questions WHERE id = ?",
                params![question_id.get()],
                |row| Ok(ScriptId::new(row.get(0)?)),
            )
            .with_context(|| {
                format!(
                    "question {} not found -- choose an existing question and retry",
                    question_id.get()
                )
            })
    }

    fn ensure_same_script(
        &self,
        script_id: ScriptId,
        question_id: QuestionId,
        role: &str,
    ) -> Result<()> {
        let other = self.question_script(question_id)?;
        if other != script_id {
            bail!(
                "{role} {} belongs to script {}, not script {} -- choose a question from the same script",
                question_id.get(),
                other.get(),
                script_id.get()
            );
        }
        Ok(())
    }
}

/// The condition clause is all-or-nothing; a partial clause never reaches
/// the database.
fn validate_clause(
    condition: Option<Condition>,
    variable: Option<QuestionId>,
    value: Option<&str>,
) -> Result<()> {
    let set = [condition.is_some(), variable.is_some(), value.is_some()];
    if set.iter().any(|present| *present) && !set.iter().all(|present| *present) {
        bail!(
            "condition, variable, and value must be set together -- fill in the whole clause or clear it"
        );
    }
    Ok(())
}

fn question_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Question> {
    let kind_raw: String = row.get(4)?;
    let kind = QuestionKind::parse(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown question kind {kind_raw}"),
            )),
        )
    })?;

    let created_at_raw: String = row.get(6)?;
    let updated_at_raw: String = row.get(7)?;

    Ok(Question {
        id: QuestionId::new(row.get(0)?),
        script_id: ScriptId::new(row.get(1)?),
        name: row.get(2)?,
        prompt: row.get(3)?,
        kind,
        position: row.get(5)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

fn transition_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transition> {
    let condition_raw: Option<String> = row.get(3)?;
    let condition = condition_raw
        .as_deref()
        .map(|raw| {
            Condition::parse(raw).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("unknown condition {raw}"),
                    )),
                )
            })
        })
        .transpose()?;

    let variable_raw: Option<i64> = row.get(4)?;
    let created_at_raw: String = row.get(6)?;
    let updated_at_raw: String = row.get(7)?;

    Ok(Transition {
        id: TransitionId::new(row.get(0)?),
        previous: QuestionId::new(row.get(1)?),
        next: QuestionId::new(row.get(2)?),
        condition,
        variable: variable_raw.map(QuestionId::new),
        value: row.get(5)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("INTAKE_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set INTAKE_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("intake.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use an intake-compatible database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = OffsetDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Ok(value);
    }

    if let Ok(value) = OffsetDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}
