// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use intake_app::{
    AppCommand, AppMode, AppState, Condition, EditOutcome, Question, QuestionId, QuestionLookup,
    Script, Transition, TransitionActions, TransitionEditor, TransitionField, TransitionId,
    describe_transition, question_options,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

const CLOSED_MARK: &str = "▸";
const OPEN_MARK: &str = "▾";

/// Everything the shell needs from the outside world. `TransitionActions`
/// carries the editor dispatch boundary; the load methods feed the view.
pub trait AppRuntime: TransitionActions {
    fn load_script(&mut self) -> Result<Script>;
    fn load_questions(&mut self) -> Result<Vec<Question>>;
    fn load_transitions(&mut self) -> Result<Vec<Transition>>;
    fn create_transition(&mut self, previous: QuestionId, next: QuestionId)
    -> Result<TransitionId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    script_name: String,
    questions: Vec<Question>,
    lookup: QuestionLookup,
    transitions: Vec<Transition>,
    editors: BTreeMap<TransitionId, TransitionEditor>,
    selected: usize,
    field_cursor: usize,
    help_visible: bool,
    status_token: u64,
    autosave_window: Duration,
}

impl Default for ViewData {
    fn default() -> Self {
        Self {
            script_name: String::new(),
            questions: Vec::new(),
            lookup: QuestionLookup::new(),
            transitions: Vec::new(),
            editors: BTreeMap::new(),
            selected: 0,
            field_cursor: 0,
            help_visible: false,
            status_token: 0,
            autosave_window: intake_app::AUTOSAVE_DEBOUNCE,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    autosave_window: Duration,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        autosave_window,
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);
        tick_editors(state, runtime, &mut view_data, &internal_tx, Instant::now());

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(poll_timeout(&view_data, Instant::now())).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(state: &mut AppState, view_data: &ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

/// Fire every due autosave gate. Called on each loop pass, so a quiescent
/// editor still saves when its window elapses.
fn tick_editors<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    now: Instant,
) {
    let ids: Vec<TransitionId> = view_data.editors.keys().copied().collect();
    let mut saved = false;
    for id in ids {
        let outcome = match view_data.editors.get_mut(&id) {
            Some(editor) => editor.tick(now, runtime),
            None => continue,
        };
        match outcome {
            Ok(EditOutcome::Saved) => saved = true,
            Ok(_) => {}
            Err(error) => {
                emit_status(state, view_data, internal_tx, format!("save failed: {error}"));
            }
        }
    }

    if saved {
        if let Err(error) = refresh_view_data(state, runtime, view_data) {
            emit_status(state, view_data, internal_tx, format!("reload failed: {error}"));
        } else {
            emit_status(state, view_data, internal_tx, "saved");
        }
    }
}

/// The input poll sleeps at most until the earliest pending autosave
/// deadline, so debounced saves do not wait for the next keypress.
fn poll_timeout(view_data: &ViewData, now: Instant) -> Duration {
    let mut timeout = POLL_INTERVAL;
    for editor in view_data.editors.values() {
        if let Some(deadline) = editor.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(now));
        }
    }
    timeout
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn refresh_view_data<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    let script = runtime.load_script()?;
    let questions = runtime.load_questions()?;
    let transitions = runtime.load_transitions()?;

    view_data.script_name = script.name;
    view_data.lookup = QuestionLookup::from_questions(&questions);
    view_data.questions = questions;

    let live: BTreeSet<TransitionId> = transitions.iter().map(|t| t.id).collect();
    view_data.editors.retain(|id, _| live.contains(id));
    for transition in &transitions {
        if let Some(editor) = view_data.editors.get_mut(&transition.id) {
            editor.rebase(transition.clone());
        }
    }

    let stale: Vec<TransitionId> = state
        .open_transitions
        .iter()
        .copied()
        .filter(|id| !live.contains(id))
        .collect();
    for id in stale {
        state.dispatch(AppCommand::CloseTransition(id));
    }

    view_data.transitions = transitions;
    if view_data.selected >= view_data.transitions.len() {
        view_data.selected = view_data.transitions.len().saturating_sub(1);
    }
    Ok(())
}

fn selected_transition_id(view_data: &ViewData) -> Option<TransitionId> {
    view_data
        .transitions
        .get(view_data.selected)
        .map(|transition| transition.id)
}

fn ensure_editor(view_data: &mut ViewData, id: TransitionId) {
    if view_data.editors.contains_key(&id) {
        return;
    }
    if let Some(transition) = view_data
        .transitions
        .iter()
        .find(|transition| transition.id == id)
        .cloned()
    {
        let question_id = transition.next;
        let window = view_data.autosave_window;
        view_data
            .editors
            .insert(id, TransitionEditor::new(transition, question_id, window));
    }
}

/// Returns true when the app should quit.
fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }

    if let Some(id) = selected_transition_id(view_data)
        && view_data
            .editors
            .get(&id)
            .is_some_and(TransitionEditor::is_delete_confirm_open)
    {
        handle_delete_confirm_key(state, runtime, view_data, internal_tx, id, key);
        return false;
    }

    match state.mode {
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
        AppMode::Edit => {
            handle_edit_key(state, runtime, view_data, internal_tx, key);
            false
        }
    }
}

fn handle_delete_confirm_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: TransitionId,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            let outcome = view_data
                .editors
                .get_mut(&id)
                .map(|editor| editor.confirm_delete(runtime));
            match outcome {
                Some(Ok(EditOutcome::Deleted)) => {
                    view_data.editors.remove(&id);
                    state.dispatch(AppCommand::CloseTransition(id));
                    if state.mode == AppMode::Edit {
                        state.dispatch(AppCommand::ExitToNav);
                    }
                    if let Err(error) = refresh_view_data(state, runtime, view_data) {
                        emit_status(state, view_data, internal_tx, format!("reload failed: {error}"));
                    } else {
                        emit_status(state, view_data, internal_tx, "transition deleted");
                    }
                }
                Some(Err(error)) => {
                    emit_status(state, view_data, internal_tx, format!("delete failed: {error}"));
                }
                _ => {}
            }
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            if let Some(editor) = view_data.editors.get_mut(&id) {
                editor.cancel_delete();
            }
        }
        _ => {}
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => {
            // Teardown cancels pending deadlines instead of firing them.
            for editor in view_data.editors.values_mut() {
                editor.cancel_pending();
            }
            return true;
        }
        KeyCode::Char('j') | KeyCode::Down => move_selection(view_data, 1),
        KeyCode::Char('k') | KeyCode::Up => move_selection(view_data, -1),
        KeyCode::Enter | KeyCode::Char('o') => toggle_selected(state, view_data),
        KeyCode::Char('e') => {
            if let Some(id) = selected_transition_id(view_data)
                && state.is_open(id)
            {
                ensure_editor(view_data, id);
                view_data.field_cursor = 0;
                state.dispatch(AppCommand::EnterEditMode);
            } else {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "open a transition first -- press enter on a row",
                );
            }
        }
        KeyCode::Char('d') => {
            if let Some(id) = selected_transition_id(view_data)
                && state.is_open(id)
            {
                ensure_editor(view_data, id);
                if let Some(editor) = view_data.editors.get_mut(&id) {
                    editor.request_delete();
                }
            } else {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "open a transition first -- press enter on a row",
                );
            }
        }
        KeyCode::Char('a') => add_transition(state, runtime, view_data, internal_tx),
        KeyCode::Char('r') => {
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("reload failed: {error}"));
            } else {
                emit_status(state, view_data, internal_tx, "reloaded");
            }
        }
        KeyCode::Char('?') => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn handle_edit_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(id) = selected_transition_id(view_data) else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    if !state.is_open(id) || !view_data.editors.contains_key(&id) {
        state.dispatch(AppCommand::ExitToNav);
        return;
    }
    let field = TransitionField::ALL[view_data.field_cursor];

    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Tab | KeyCode::Down => {
            view_data.field_cursor = (view_data.field_cursor + 1) % TransitionField::ALL.len();
        }
        KeyCode::BackTab | KeyCode::Up => {
            let len = TransitionField::ALL.len();
            view_data.field_cursor = (view_data.field_cursor + len - 1) % len;
        }
        KeyCode::Enter => save_now(state, runtime, view_data, internal_tx, id),
        KeyCode::Left | KeyCode::Right => {
            let delta: isize = if key.code == KeyCode::Left { -1 } else { 1 };
            let Some(options) = cycle_options_for(view_data, id, field) else {
                return;
            };
            let current = match view_data.editors.get(&id) {
                Some(editor) => editor.draft().field(field).to_owned(),
                None => return,
            };
            let next = cycle_token(&options, &current, delta);
            if let Some(editor) = view_data.editors.get_mut(&id) {
                editor.edit(field, next, Instant::now());
            }
        }
        KeyCode::Char(c) => {
            if let Some(editor) = view_data.editors.get_mut(&id) {
                let mut buffer = editor.draft().field(field).to_owned();
                buffer.push(c);
                editor.edit(field, buffer, Instant::now());
            }
        }
        KeyCode::Backspace => {
            if let Some(editor) = view_data.editors.get_mut(&id) {
                let mut buffer = editor.draft().field(field).to_owned();
                buffer.pop();
                editor.edit(field, buffer, Instant::now());
            }
        }
        _ => {}
    }
}

/// Manual save: flush the pending deadline and submit right away. Invalid
/// drafts stay local, but the manual path says so on the status line.
fn save_now<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: TransitionId,
) {
    let outcome = view_data.editors.get_mut(&id).map(|editor| {
        editor.cancel_pending();
        editor.submit(runtime)
    });
    match outcome {
        Some(Ok(EditOutcome::Saved)) => {
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("reload failed: {error}"));
            } else {
                emit_status(state, view_data, internal_tx, "saved");
            }
        }
        Some(Ok(_)) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                "not saved -- previous is required and the condition clause must be complete or empty",
            );
        }
        Some(Err(error)) => {
            emit_status(state, view_data, internal_tx, format!("save failed: {error}"));
        }
        None => {}
    }
}

fn move_selection(view_data: &mut ViewData, delta: isize) {
    if view_data.transitions.is_empty() {
        return;
    }
    let len = view_data.transitions.len() as isize;
    let next = (view_data.selected as isize + delta).rem_euclid(len);
    view_data.selected = next as usize;
}

fn toggle_selected(state: &mut AppState, view_data: &mut ViewData) {
    let Some(id) = selected_transition_id(view_data) else {
        return;
    };
    if !state.is_open(id) {
        ensure_editor(view_data, id);
        view_data.field_cursor = 0;
    }
    // Closing keeps the editor; a hidden row still autosaves its draft.
    state.dispatch(AppCommand::ToggleTransitionOpen(id));
}

fn add_transition<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.questions.len() < 2 {
        emit_status(
            state,
            view_data,
            internal_tx,
            "add at least two questions before linking them",
        );
        return;
    }

    let next = selected_transition_id(view_data)
        .and_then(|id| {
            view_data
                .transitions
                .iter()
                .find(|transition| transition.id == id)
        })
        .map(|transition| transition.next)
        .unwrap_or_else(|| view_data.questions[view_data.questions.len() - 1].id);
    let previous = question_options(&view_data.questions, next)
        .first()
        .map(|question| question.id);
    let Some(previous) = previous else {
        emit_status(state, view_data, internal_tx, "no source question available");
        return;
    };

    match runtime.create_transition(previous, next) {
        Ok(id) => {
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("reload failed: {error}"));
                return;
            }
            if let Some(position) = view_data
                .transitions
                .iter()
                .position(|transition| transition.id == id)
            {
                view_data.selected = position;
            }
            ensure_editor(view_data, id);
            view_data.field_cursor = 0;
            if !state.is_open(id) {
                state.dispatch(AppCommand::ToggleTransitionOpen(id));
            }
            emit_status(state, view_data, internal_tx, "transition added");
        }
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("add failed: {error}"));
        }
    }
}

fn cycle_options_for(
    view_data: &ViewData,
    id: TransitionId,
    field: TransitionField,
) -> Option<Vec<String>> {
    let next = view_data
        .transitions
        .iter()
        .find(|transition| transition.id == id)?
        .next;
    match field {
        TransitionField::Previous => Some(
            question_options(&view_data.questions, next)
                .iter()
                .map(|question| question.id.get().to_string())
                .collect(),
        ),
        TransitionField::Condition => Some(condition_tokens()),
        TransitionField::Variable => Some(
            std::iter::once(String::new())
                .chain(
                    view_data
                        .questions
                        .iter()
                        .map(|question| question.id.get().to_string()),
                )
                .collect(),
        ),
        TransitionField::Value => None,
    }
}

fn condition_tokens() -> Vec<String> {
    std::iter::once(String::new())
        .chain(
            Condition::ALL
                .iter()
                .map(|condition| condition.as_str().to_owned()),
        )
        .collect()
}

fn cycle_token(options: &[String], current: &str, delta: isize) -> String {
    if options.is_empty() {
        return current.to_owned();
    }
    let len = options.len() as isize;
    let position = options
        .iter()
        .position(|option| option == current)
        .map(|position| position as isize)
        .unwrap_or(-1);
    let next = (position + delta).rem_euclid(len) as usize;
    options[next].clone()
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let header = Paragraph::new(format!("script: {}", view_data.script_name))
        .block(Block::default().title("intake").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let body = Paragraph::new(render_rows_text(state, view_data))
        .block(Block::default().title("transitions").borders(Borders::ALL));
    frame.render_widget(body, layout[1]);

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    let confirm_open = selected_transition_id(view_data).is_some_and(|id| {
        view_data
            .editors
            .get(&id)
            .is_some_and(TransitionEditor::is_delete_confirm_open)
    });
    if confirm_open {
        let area = centered_rect(48, 24, frame.area());
        frame.render_widget(Clear, area);
        let confirm = Paragraph::new(delete_overlay_text()).block(
            Block::default()
                .title("delete transition")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(confirm, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_rows_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.transitions.is_empty() {
        return "no transitions yet -- press a to add one".to_owned();
    }

    let mut lines = Vec::new();
    for (index, transition) in view_data.transitions.iter().enumerate() {
        let selected = index == view_data.selected;
        let cursor = if selected { "> " } else { "  " };
        let editor = view_data.editors.get(&transition.id);
        let description = match editor {
            Some(editor) => editor.describe(&view_data.lookup),
            None => describe_transition(transition, &view_data.lookup),
        };
        let marker = row_marker(editor);

        if state.is_open(transition.id) {
            lines.push(format!("{cursor}{OPEN_MARK} {description}{marker}"));
            if let Some(editor) = editor {
                for (field_index, field) in TransitionField::ALL.iter().enumerate() {
                    let focus = if selected
                        && state.mode == AppMode::Edit
                        && field_index == view_data.field_cursor
                    {
                        ">"
                    } else {
                        " "
                    };
                    lines.push(format!(
                        "   {focus} {:<9} {}",
                        format!("{}:", field.label()),
                        field_display(editor, *field, &view_data.lookup),
                    ));
                }
                lines.push("     [e] edit  [enter] save now  [d] delete  [o] hide".to_owned());
            }
        } else {
            lines.push(format!("{cursor}{CLOSED_MARK} {description}{marker}"));
        }
    }
    lines.join("\n")
}

fn row_marker(editor: Option<&TransitionEditor>) -> &'static str {
    match editor {
        Some(editor) if !editor.is_valid() => "  [invalid]",
        Some(editor) if editor.has_changed() => "  [unsaved]",
        _ => "",
    }
}

fn field_display(
    editor: &TransitionEditor,
    field: TransitionField,
    lookup: &QuestionLookup,
) -> String {
    let raw = editor.draft().field(field);
    match field {
        TransitionField::Previous | TransitionField::Variable => {
            match raw.trim().parse::<i64>() {
                Ok(id) => format!("{raw} ({})", lookup.display_name(QuestionId::new(id))),
                Err(_) if raw.is_empty() => "(unset)".to_owned(),
                Err(_) => raw.to_owned(),
            }
        }
        TransitionField::Condition => {
            if raw.is_empty() {
                "(always)".to_owned()
            } else {
                raw.to_owned()
            }
        }
        TransitionField::Value => {
            if raw.is_empty() {
                "(unset)".to_owned()
            } else {
                raw.to_owned()
            }
        }
    }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(line) = &state.status_line {
        return line.clone();
    }
    if view_data.help_visible {
        return "press any key to close help".to_owned();
    }
    match state.mode {
        AppMode::Nav => {
            "j/k move  enter open/close  e edit  a add  d delete  r reload  ? help  q quit"
                .to_owned()
        }
        AppMode::Edit => {
            "type to edit  tab next field  left/right choose  enter save  esc back".to_owned()
        }
    }
}

fn delete_overlay_text() -> &'static str {
    "delete this transition?\n\n[y] delete  [n] keep"
}

fn help_overlay_text() -> String {
    [
        "navigation",
        "  j / k       move between transitions",
        "  enter / o   open or close the selected row",
        "  e           edit the open row's fields",
        "  a           add a transition",
        "  d           delete the open row (asks first)",
        "  r           reload from the database",
        "  q           quit",
        "",
        "editing",
        "  tab / shift-tab   next / previous field",
        "  left / right      cycle questions or operators",
        "  typing            edit the field text",
        "  enter             save immediately",
        "  esc               back to navigation",
        "",
        "edits save on their own after a short pause;",
        "incomplete fields are kept locally until they are valid",
    ]
    .join("\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, ViewData, condition_tokens, cycle_token, handle_key_event,
        poll_timeout, refresh_view_data, render_rows_text, status_text, tick_editors,
    };
    use anyhow::Result;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use intake_app::{
        AUTOSAVE_DEBOUNCE, AppCommand, AppMode, AppState, Condition, Question, QuestionId,
        QuestionKind, Script, ScriptId, Transition, TransitionActions, TransitionId,
        TransitionSubmit,
    };
    use intake_testkit::fixture_datetime;
    use std::sync::mpsc::{self, Sender};
    use std::time::{Duration, Instant};

    #[derive(Debug)]
    struct TestRuntime {
        script: Script,
        questions: Vec<Question>,
        transitions: Vec<Transition>,
        updates: Vec<TransitionSubmit>,
        deletes: Vec<TransitionId>,
        next_id: i64,
        fail_update: bool,
    }

    impl TestRuntime {
        fn with_two_transitions() -> Self {
            let questions = vec![
                sample_question(1, "Full name", 0),
                sample_question(2, "Is the repair urgent?", 1),
                sample_question(3, "Outcome", 2),
            ];
            let transitions = vec![
                sample_transition(5, 1, 2),
                sample_transition(6, 2, 3),
            ];
            Self {
                script: Script {
                    id: ScriptId::new(1),
                    name: "Repair Intake".to_owned(),
                    created_at: fixture_datetime(),
                    updated_at: fixture_datetime(),
                },
                questions,
                transitions,
                updates: Vec::new(),
                deletes: Vec::new(),
                next_id: 7,
                fail_update: false,
            }
        }
    }

    fn sample_question(id: i64, name: &str, position: i32) -> Question {
        Question {
            id: QuestionId::new(id),
            script_id: ScriptId::new(1),
            name: name.to_owned(),
            prompt: name.to_owned(),
            kind: QuestionKind::Text,
            position,
            created_at: fixture_datetime(),
            updated_at: fixture_datetime(),
        }
    }

    fn sample_transition(id: i64, previous: i64, next: i64) -> Transition {
        Transition {
            id: TransitionId::new(id),
            previous: QuestionId::new(previous),
            next: QuestionId::new(next),
            condition: None,
            variable: None,
            value: None,
            created_at: fixture_datetime(),
            updated_at: fixture_datetime(),
        }
    }

    impl TransitionActions for TestRuntime {
        fn update_transition(&mut self, submit: &TransitionSubmit) -> Result<()> {
            if self.fail_update {
                anyhow::bail!("store unavailable");
            }
            let Some(transition) = self
                .transitions
                .iter_mut()
                .find(|transition| transition.id == submit.transition_id)
            else {
                anyhow::bail!("transition {} not found", submit.transition_id.get());
            };
            transition.previous = submit.previous;
            transition.condition = submit.condition;
            transition.variable = submit.variable;
            transition.value = submit.value.clone();
            self.updates.push(submit.clone());
            Ok(())
        }

        fn delete_transition(&mut self, transition_id: TransitionId) -> Result<()> {
            self.transitions
                .retain(|transition| transition.id != transition_id);
            self.deletes.push(transition_id);
            Ok(())
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_script(&mut self) -> Result<Script> {
            Ok(self.script.clone())
        }

        fn load_questions(&mut self) -> Result<Vec<Question>> {
            Ok(self.questions.clone())
        }

        fn load_transitions(&mut self) -> Result<Vec<Transition>> {
            Ok(self.transitions.clone())
        }

        fn create_transition(
            &mut self,
            previous: QuestionId,
            next: QuestionId,
        ) -> Result<TransitionId> {
            let id = TransitionId::new(self.next_id);
            self.next_id += 1;
            self.transitions
                .push(sample_transition(id.get(), previous.get(), next.get()));
            Ok(id)
        }
    }

    fn setup() -> (AppState, TestRuntime, ViewData, Sender<InternalEvent>) {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::with_two_transitions();
        let mut view_data = ViewData::default();
        refresh_view_data(&mut state, &mut runtime, &mut view_data).expect("initial load");
        // The receiver is dropped; status-clear sends are ignored in tests.
        let (tx, _rx) = mpsc::channel();
        (state, runtime, view_data, tx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        codes: &[KeyCode],
    ) -> bool {
        let mut quit = false;
        for code in codes {
            quit = handle_key_event(state, runtime, view_data, tx, key(*code));
        }
        quit
    }

    #[test]
    fn initial_load_renders_closed_descriptions() {
        let (state, _runtime, view_data, _tx) = setup();

        assert_eq!(view_data.transitions.len(), 2);
        let text = render_rows_text(&state, &view_data);
        assert!(text.contains("Follows the question \u{201c}Full name\u{201d}"));
        assert!(text.contains("Follows the question \u{201c}Is the repair urgent?\u{201d}"));
        assert!(!text.contains("previous:"));
    }

    #[test]
    fn toggling_a_row_shows_and_hides_the_form() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Enter]);
        assert!(state.is_open(TransitionId::new(5)));
        let text = render_rows_text(&state, &view_data);
        assert!(text.contains("previous:"));
        assert!(text.contains("value:"));

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Enter]);
        assert!(!state.is_open(TransitionId::new(5)));
        assert!(!render_rows_text(&state, &view_data).contains("previous:"));
    }

    #[test]
    fn typed_edits_autosave_after_quiet_window() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Enter,
                KeyCode::Char('e'),
                KeyCode::Backspace,
                KeyCode::Char('3'),
            ],
        );
        assert_eq!(state.mode, AppMode::Edit);
        assert!(runtime.updates.is_empty());

        tick_editors(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            Instant::now() + AUTOSAVE_DEBOUNCE,
        );
        assert_eq!(runtime.updates.len(), 1);
        assert_eq!(runtime.updates[0].previous, QuestionId::new(3));
        assert_eq!(state.status_line.as_deref(), Some("saved"));
    }

    #[test]
    fn hidden_row_still_autosaves_its_draft() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Enter,
                KeyCode::Char('e'),
                KeyCode::Backspace,
                KeyCode::Char('3'),
                KeyCode::Esc,
                KeyCode::Enter,
            ],
        );
        assert!(!state.is_open(TransitionId::new(5)));
        assert!(runtime.updates.is_empty());

        tick_editors(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            Instant::now() + AUTOSAVE_DEBOUNCE,
        );
        assert_eq!(runtime.updates.len(), 1);
    }

    #[test]
    fn incomplete_clause_is_kept_local_and_marked() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        // Cycle the condition field to an operator without variable or value.
        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Enter,
                KeyCode::Char('e'),
                KeyCode::Tab,
                KeyCode::Right,
            ],
        );

        tick_editors(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            Instant::now() + AUTOSAVE_DEBOUNCE * 2,
        );
        assert!(runtime.updates.is_empty());
        assert!(render_rows_text(&state, &view_data).contains("[invalid]"));
    }

    #[test]
    fn enter_in_edit_mode_saves_immediately() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Enter,
                KeyCode::Char('e'),
                KeyCode::Backspace,
                KeyCode::Char('3'),
                KeyCode::Enter,
            ],
        );
        assert_eq!(runtime.updates.len(), 1);
        assert_eq!(runtime.updates[0].previous, QuestionId::new(3));
    }

    #[test]
    fn delete_asks_for_confirmation_first() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[KeyCode::Enter, KeyCode::Char('d'), KeyCode::Char('n')],
        );
        assert!(runtime.deletes.is_empty());
        assert_eq!(runtime.transitions.len(), 2);

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[KeyCode::Char('d'), KeyCode::Char('y')],
        );
        assert_eq!(runtime.deletes, vec![TransitionId::new(5)]);
        assert_eq!(view_data.transitions.len(), 1);
        assert!(!state.is_open(TransitionId::new(5)));
    }

    #[test]
    fn confirmed_delete_wins_over_pending_autosave() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Enter,
                KeyCode::Char('e'),
                KeyCode::Backspace,
                KeyCode::Char('3'),
                KeyCode::Esc,
                KeyCode::Char('d'),
                KeyCode::Char('y'),
            ],
        );

        tick_editors(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            Instant::now() + AUTOSAVE_DEBOUNCE * 2,
        );
        assert!(runtime.updates.is_empty());
        assert_eq!(runtime.deletes, vec![TransitionId::new(5)]);
    }

    #[test]
    fn adding_a_transition_opens_it_for_editing() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('a')]);
        assert_eq!(view_data.transitions.len(), 3);
        let new_id = TransitionId::new(7);
        assert!(state.is_open(new_id));
        assert!(view_data.editors.contains_key(&new_id));
        assert_eq!(state.status_line.as_deref(), Some("transition added"));
    }

    #[test]
    fn quit_cancels_pending_autosave_deadlines() {
        let (mut state, mut runtime, mut view_data, tx) = setup();

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Enter,
                KeyCode::Char('e'),
                KeyCode::Char('0'),
                KeyCode::Esc,
            ],
        );
        let quit = press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('q')]);
        assert!(quit);
        assert!(
            view_data
                .editors
                .values()
                .all(|editor| editor.next_deadline().is_none())
        );
    }

    #[test]
    fn poll_timeout_is_bounded_by_earliest_deadline() {
        let (mut state, mut runtime, mut view_data, tx) = setup();
        let now = Instant::now();

        assert_eq!(poll_timeout(&view_data, now), Duration::from_millis(120));

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[KeyCode::Enter, KeyCode::Char('e'), KeyCode::Char('0')],
        );
        // Far from the deadline the ambient interval wins.
        assert_eq!(poll_timeout(&view_data, now), Duration::from_millis(120));
        // Near the deadline the remaining window wins. Anchor on the gate's
        // own deadline so elapsed wall time cannot skew the bound.
        let deadline = view_data
            .editors
            .get(&TransitionId::new(5))
            .and_then(|editor| editor.next_deadline())
            .expect("pending deadline");
        let near = deadline - Duration::from_millis(50);
        assert_eq!(poll_timeout(&view_data, near), Duration::from_millis(50));
        // Past the deadline the timeout saturates to zero.
        assert_eq!(
            poll_timeout(&view_data, deadline + Duration::from_millis(1)),
            Duration::ZERO
        );
    }

    #[test]
    fn failed_dispatch_reports_on_status_line_and_keeps_draft() {
        let (mut state, mut runtime, mut view_data, tx) = setup();
        runtime.fail_update = true;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Enter,
                KeyCode::Char('e'),
                KeyCode::Backspace,
                KeyCode::Char('3'),
            ],
        );
        tick_editors(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            Instant::now() + AUTOSAVE_DEBOUNCE,
        );

        assert!(runtime.updates.is_empty());
        let status = state.status_line.clone().unwrap_or_default();
        assert!(status.contains("save failed"));
        assert!(
            view_data
                .editors
                .get(&TransitionId::new(5))
                .is_some_and(|editor| editor.has_changed())
        );
    }

    #[test]
    fn condition_tokens_cycle_through_unset_and_operators() {
        let tokens = condition_tokens();
        assert_eq!(tokens[0], "");
        assert_eq!(tokens.len(), 1 + Condition::ALL.len());

        let next = cycle_token(&tokens, "", 1);
        assert_eq!(next, "equals");
        let wrapped = cycle_token(&tokens, tokens.last().expect("tokens"), 1);
        assert_eq!(wrapped, "");
        let back = cycle_token(&tokens, "", -1);
        assert_eq!(back, tokens[tokens.len() - 1]);
    }

    #[test]
    fn status_line_falls_back_to_mode_hints() {
        let (mut state, _runtime, view_data, _tx) = setup();

        assert!(status_text(&state, &view_data).contains("q quit"));
        state.dispatch(AppCommand::SetStatus("saved".to_owned()));
        assert_eq!(status_text(&state, &view_data), "saved");
        state.dispatch(AppCommand::ClearStatus);
        state.dispatch(AppCommand::EnterEditMode);
        assert!(status_text(&state, &view_data).contains("esc back"));
    }
}
