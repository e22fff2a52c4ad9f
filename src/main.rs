use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod api;
mod app;
mod auth;
mod config;
mod diagram;
mod error;
mod events;
mod formatter;
mod markdown;
mod stats;
mod store;
mod syntax;
#[cfg(test)]
mod testing;
mod ui;

use api::ApiClient;
use app::{Action, App, AppMode, LineEdit, LinePurpose, PasswordStep};
use config::Config;
use events::{AppEvent, EventHandler};
use store::ClientStore;

/// Terminal client for the NL-SQL service
#[derive(Parser, Debug)]
#[command(name = "nlsql", version, about, long_about = None)]
struct Args {
    /// Base URL of the REST API
    #[arg(long, env = "NLSQL_API_URL")]
    api_url: Option<String>,

    /// Log filter (RUST_LOG wins when set)
    #[arg(long)]
    log_level: Option<String>,

    /// Config file to read instead of the default one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the config file
    #[arg(long)]
    save_config: bool,
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logger(config: &Config) -> Result<()> {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let path = config.log_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer)
        .init();

    info!("Logging to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .with_overrides(args.api_url.clone(), args.log_level.clone());

    if args.save_config {
        match &args.config {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
    }

    init_logger(&config)?;
    info!("Using API at {}", config.api_url);

    let store = ClientStore::open(ClientStore::default_path()?).shared();
    let backend = Arc::new(ApiClient::new(config.api_url.clone(), store.clone()));

    // Create app state
    let mut app = App::new(backend, store);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    let events = EventHandler::default();

    // The start-up guard check may hit the network; show a frame first.
    app.loading = true;
    terminal.draw(|f| ui::render(f, app))?;
    app.start().await;
    app.loading = false;

    loop {
        if app.pending.is_some() {
            // One frame with the loading indicator, then the request
            app.loading = true;
            terminal.draw(|f| ui::render(f, app))?;
            app.run_pending().await;
            continue;
        }

        terminal.draw(|f| ui::render(f, app))?;

        if let AppEvent::Key(key) = events.next()? {
            if handle_key(app, key) {
                return Ok(());
            }
        }
    }
}

/// Routes a key press. Returns true when the user asked to quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return true;
    }

    // Overlays take the keyboard first
    if app.confirm.is_some() {
        handle_confirm_input(app, key.code);
        return false;
    }
    if app.line_edit.is_some() {
        handle_line_input(app, key.code);
        return false;
    }
    if app.metadata.pending_description.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => app.queue(Action::AcceptGeneratedDescription),
            KeyCode::Char('n') | KeyCode::Esc => app.metadata.pending_description = None,
            _ => {}
        }
        return false;
    }
    if app.metadata.editor.is_some() {
        handle_editor_input(app, key);
        return false;
    }

    match app.mode {
        AppMode::Login | AppMode::Register => handle_login_input(app, key.code),
        AppMode::Databases => handle_databases_input(app, key.code),
        AppMode::DatabaseForm => {
            handle_form_input(app, key.code);
            false
        }
        AppMode::Sessions => {
            handle_sessions_input(app, key.code);
            false
        }
        AppMode::Query => {
            handle_query_input(app, key);
            false
        }
        AppMode::Schema => {
            handle_schema_input(app, key.code);
            false
        }
        AppMode::Relationships => {
            match key.code {
                KeyCode::Up => app.metadata.relationship_step(false),
                KeyCode::Down => app.metadata.relationship_step(true),
                KeyCode::Char('r') => app.queue(Action::Navigate(AppMode::Relationships)),
                KeyCode::Esc => app.queue(Action::Navigate(AppMode::Databases)),
                _ => {}
            }
            false
        }
        AppMode::ErDiagram => {
            handle_diagram_input(app, key.code);
            false
        }
        AppMode::Dashboard => {
            match key.code {
                KeyCode::Char('r') => app.queue(Action::Navigate(AppMode::Dashboard)),
                KeyCode::Esc => app.queue(Action::Navigate(AppMode::Databases)),
                _ => {}
            }
            false
        }
        AppMode::Profile => {
            handle_profile_input(app, key.code);
            false
        }
    }
}

fn handle_confirm_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_pending(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_pending(false),
        _ => {}
    }
}

fn handle_line_input(app: &mut App, key: KeyCode) {
    let Some(edit) = app.line_edit.as_mut() else {
        return;
    };
    match key {
        KeyCode::Char(c) => edit.value.push(c),
        KeyCode::Backspace => {
            edit.value.pop();
        }
        KeyCode::Esc => {
            let purpose = edit.purpose;
            app.line_edit = None;
            if matches!(purpose, LinePurpose::Otp | LinePurpose::NewPassword) {
                app.profile.password_step = PasswordStep::Idle;
            }
        }
        KeyCode::Enter => {
            if let Some(action) = app.line_edit.take().and_then(LineEdit::into_action) {
                app.queue(action);
            }
        }
        _ => {}
    }
}

fn handle_editor_input(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.metadata.editor = None,
        KeyCode::Char('s') if ctrl => {
            if let Some(text) = app.metadata.editor_text() {
                app.queue(Action::SaveDescription(text));
            }
        }
        _ => {
            if let Some(editor) = app.metadata.editor.as_mut() {
                editor.input(key);
            }
        }
    }
}

fn handle_login_input(app: &mut App, key: KeyCode) -> bool {
    let register = app.mode == AppMode::Register;
    match key {
        KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::Down => app.login.next_field(register),
        KeyCode::BackTab | KeyCode::Up => app.login.prev_field(register),
        KeyCode::F(2) => {
            app.mode = if register { AppMode::Login } else { AppMode::Register };
            app.login.field = Default::default();
            app.clear_error();
        }
        KeyCode::Enter => app.queue(if register { Action::Register } else { Action::Login }),
        KeyCode::Char(c) => app.login.input_char(c),
        KeyCode::Backspace => app.login.delete_char(),
        _ => {}
    }
    false
}

fn handle_databases_input(app: &mut App, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') => return true,
        KeyCode::Up => app.databases.up(),
        KeyCode::Down => app.databases.down(),
        KeyCode::Enter => app.queue(Action::SelectDatabase),
        KeyCode::Char('n') => app.new_database(),
        KeyCode::Char('e') => app.queue(Action::EditDatabase),
        KeyCode::Char('d') => app.queue(Action::DeleteDatabase),
        KeyCode::Char('t') => app.queue(Action::TestConnection),
        KeyCode::Char('m') => app.queue(Action::ExtractMetadata),
        KeyCode::Char('b') => app.queue(Action::UpdateEmbeddings),
        KeyCode::Char('r') => app.queue(Action::Navigate(AppMode::Databases)),
        KeyCode::Char('L') => app.queue(Action::Logout),
        KeyCode::Char(c) => {
            if let Some(target) = screen_shortcut(c) {
                app.queue(Action::Navigate(target));
            }
        }
        _ => {}
    }
    false
}

fn screen_shortcut(c: char) -> Option<AppMode> {
    Some(match c {
        's' => AppMode::Sessions,
        'c' => AppMode::Schema,
        'l' => AppMode::Relationships,
        'x' => AppMode::ErDiagram,
        'h' => AppMode::Dashboard,
        'p' => AppMode::Profile,
        _ => return None,
    })
}

fn handle_form_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Esc => {
            app.clear_error();
            app.mode = AppMode::Databases;
        }
        KeyCode::Tab | KeyCode::Down => app.database_form.next_field(),
        KeyCode::BackTab | KeyCode::Up => app.database_form.prev_field(),
        KeyCode::Enter => app.queue(Action::SubmitDatabaseForm),
        KeyCode::Char(c) => app.database_form.input_char(c),
        KeyCode::Backspace => app.database_form.delete_char(),
        _ => {}
    }
}

fn handle_sessions_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Up => app.sessions.up(),
        KeyCode::Down => app.sessions.down(),
        KeyCode::Enter => app.queue(Action::OpenSession),
        KeyCode::Char('n') => app.line_edit = Some(LineEdit::new(LinePurpose::NewSession, "")),
        KeyCode::Char('r') => {
            if let Some(session) = app.sessions.current() {
                app.line_edit = Some(LineEdit::new(LinePurpose::RenameSession, session.title.clone()));
            }
        }
        KeyCode::Char('d') => app.queue(Action::DeleteSession),
        KeyCode::Esc => app.queue(Action::Navigate(AppMode::Databases)),
        _ => {}
    }
}

fn handle_query_input(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if app.query.generated.is_some() {
        match key.code {
            KeyCode::Char('r') if ctrl => app.queue(Action::ExecuteSql),
            KeyCode::Char('d') if ctrl => app.query.discard(),
            KeyCode::Char('f') if ctrl => app.query.pretty_sql = !app.query.pretty_sql,
            KeyCode::Esc => app.query.discard(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.query.history_focus = false;
            app.queue(Action::Navigate(AppMode::Sessions));
            return;
        }
        KeyCode::Tab => {
            app.query.history_focus = !app.query.history_focus;
            return;
        }
        KeyCode::Char('f') if ctrl => {
            app.query.pretty_sql = !app.query.pretty_sql;
            return;
        }
        _ => {}
    }

    if app.query.history_focus {
        match key.code {
            KeyCode::Up => app.query.history_up(),
            KeyCode::Down => app.query.history_down(),
            KeyCode::Enter => app.query.show_history(),
            KeyCode::Char('d') => app.queue(Action::DeleteQuery),
            _ => {}
        }
    } else if ctrl && key.code == KeyCode::Char('s') {
        app.queue(Action::SubmitPrompt);
    } else {
        app.query.prompt.input(key);
    }
}

fn handle_schema_input(app: &mut App, key: KeyCode) {
    let view = &mut app.metadata;

    if view.filter_active {
        match key {
            KeyCode::Esc => view.clear_filter(),
            KeyCode::Enter => view.toggle_expand(),
            KeyCode::Up => view.up(),
            KeyCode::Down => view.down(),
            _ => view.handle_filter_input(key),
        }
        return;
    }

    match key {
        KeyCode::Esc if view.show_hits => view.show_hits = false,
        KeyCode::Esc => app.queue(Action::Navigate(AppMode::Databases)),
        KeyCode::Char('/') => view.activate_filter(),
        KeyCode::Up => view.up(),
        KeyCode::Down => view.down(),
        KeyCode::Enter => view.toggle_expand(),
        KeyCode::Char('e') => view.start_edit(),
        KeyCode::Char('g') => app.queue(Action::GenerateDescription),
        KeyCode::Char('?') => app.line_edit = Some(LineEdit::new(LinePurpose::Search, "")),
        KeyCode::Char('r') => app.queue(Action::Navigate(AppMode::Schema)),
        _ => {}
    }
}

fn handle_diagram_input(app: &mut App, key: KeyCode) {
    let view = &mut app.diagram;
    match key {
        KeyCode::Left => view.pan(-1, 0),
        KeyCode::Right => view.pan(1, 0),
        KeyCode::Up => view.pan(0, -1),
        KeyCode::Down => view.pan(0, 1),
        KeyCode::Char('+') | KeyCode::Char('=') => view.zoom_in(),
        KeyCode::Char('-') => view.zoom_out(),
        KeyCode::Char('f') => view.fit(),
        KeyCode::Tab => view.select_next(true),
        KeyCode::BackTab => view.select_next(false),
        KeyCode::Char('r') => app.queue(Action::Navigate(AppMode::ErDiagram)),
        KeyCode::Esc => app.queue(Action::Navigate(AppMode::Databases)),
        _ => {}
    }
}

fn handle_profile_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('e') => {
            let email = app.profile.user.as_ref().map(|u| u.email.clone()).unwrap_or_default();
            app.line_edit = Some(LineEdit::new(LinePurpose::Email, email));
        }
        KeyCode::Char('p') => app.queue(Action::RequestPasswordChange),
        KeyCode::Char('r') => app.queue(Action::Navigate(AppMode::Profile)),
        KeyCode::Esc => app.queue(Action::Navigate(AppMode::Databases)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app_with;
    use crate::testing::FakeBackend;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn login_keys_fill_the_form_and_queue_login() {
        let (mut app, _backend) = app_with(FakeBackend::default());
        for c in "ana".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Tab));
        for c in "secret".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Enter));

        assert_eq!(app.login.username, "ana");
        assert_eq!(app.login.password, "secret");
        assert_eq!(app.pending, Some(Action::Login));
    }

    #[test]
    fn quit_keys() {
        let (mut app, _backend) = app_with(FakeBackend::default());
        assert!(handle_key(&mut app, ctrl('c')));
        app.mode = AppMode::Databases;
        assert!(handle_key(&mut app, press(KeyCode::Char('q'))));
        app.mode = AppMode::Sessions;
        assert!(!handle_key(&mut app, press(KeyCode::Char('q'))));
    }

    #[test]
    fn delete_goes_through_confirmation() {
        let (mut app, _backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Sessions;

        handle_key(&mut app, press(KeyCode::Char('d')));
        assert_eq!(app.confirm, Some(Action::DeleteSession));
        // keys other than y/n are swallowed by the prompt
        handle_key(&mut app, press(KeyCode::Down));
        assert!(app.pending.is_none());

        handle_key(&mut app, press(KeyCode::Char('y')));
        assert_eq!(app.pending, Some(Action::DeleteSession));
    }

    #[test]
    fn line_edit_collects_text_then_queues() {
        let (mut app, _backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Sessions;

        handle_key(&mut app, press(KeyCode::Char('n')));
        for c in "Revenue".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Enter));

        assert!(app.line_edit.is_none());
        assert_eq!(app.pending, Some(Action::CreateSession("Revenue".to_string())));
    }

    #[test]
    fn cancelling_the_code_prompt_resets_password_change() {
        let (mut app, _backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Profile;
        app.profile.password_step = PasswordStep::AwaitingOtp;
        app.line_edit = Some(LineEdit::new(LinePurpose::Otp, ""));

        handle_key(&mut app, press(KeyCode::Esc));

        assert!(app.line_edit.is_none());
        assert_eq!(app.profile.password_step, PasswordStep::Idle);
    }

    #[test]
    fn prompt_typing_and_submit() {
        let (mut app, _backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Query;
        for c in "count orders".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        assert_eq!(app.query.prompt_text(), "count orders");

        handle_key(&mut app, ctrl('s'));
        assert_eq!(app.pending, Some(Action::SubmitPrompt));
    }

    #[test]
    fn database_shortcuts_navigate() {
        let (mut app, _backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Databases;
        handle_key(&mut app, press(KeyCode::Char('x')));
        assert_eq!(app.pending, Some(Action::Navigate(AppMode::ErDiagram)));
    }
}
