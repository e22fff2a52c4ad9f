use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{Action, App, AppMode, PasswordStep};

mod browser;
mod dashboard;
mod databases;
mod diagram;
mod login;
mod profile;
mod query;
mod sessions;

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    // Main content area
    match app.mode {
        AppMode::Login | AppMode::Register => login::render_login(f, app, chunks[0]),
        AppMode::Databases => databases::render_databases(f, app, chunks[0]),
        AppMode::DatabaseForm => databases::render_database_form(f, app, chunks[0]),
        AppMode::Sessions => sessions::render_sessions(f, app, chunks[0]),
        AppMode::Query => query::render_query(f, app, chunks[0]),
        AppMode::Schema => {
            let main_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(chunks[0]);

            browser::render_browser(f, app, main_chunks[0]);
            browser::render_details(f, app, main_chunks[1]);
        }
        AppMode::Relationships => browser::render_relationships(f, app, chunks[0]),
        AppMode::ErDiagram => diagram::render_diagram(f, app, chunks[0]),
        AppMode::Dashboard => dashboard::render_dashboard(f, app, chunks[0]),
        AppMode::Profile => profile::render_profile(f, app, chunks[0]),
    }

    render_status_bar(f, app, chunks[1]);

    // Overlays, topmost last
    let area = f.area();
    if let Some(editor) = &app.metadata.editor {
        render_editor(f, editor, area);
    }
    if let Some(pending) = &app.metadata.pending_description {
        render_popup(
            f,
            "Generated description",
            vec![
                Line::from(pending.text.clone()),
                Line::from(""),
                Line::from(Span::styled(
                    "y: save | n/Esc: discard",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
            Color::Green,
        );
    }
    if let Some(edit) = &app.line_edit {
        let shown = if edit.purpose.is_secret() {
            "*".repeat(edit.value.chars().count())
        } else {
            edit.value.clone()
        };
        render_popup(
            f,
            edit.purpose.label(),
            vec![
                Line::from(format!("{}_", shown)),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter: confirm | Esc: cancel",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
            Color::Cyan,
        );
    }
    if let Some(action) = &app.confirm {
        render_popup(
            f,
            "Confirm",
            vec![
                Line::from(action.describe()),
                Line::from(""),
                Line::from(Span::styled("y: yes | n: no", Style::default().fg(Color::DarkGray))),
            ],
            Color::Yellow,
        );
    }
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let mode_text = app.mode.title();

    let status_text = if app.loading {
        let what = match &app.pending {
            Some(Action::Navigate(target)) if target.is_protected() => "Checking session...",
            None => "Checking session...",
            Some(_) => "Working...",
        };
        format!(" {} | {} ", mode_text, what)
    } else if let Some(err) = &app.error_message {
        format!(" {} | ERROR: {} ", mode_text, err)
    } else if let Some(info) = &app.info_message {
        format!(" {} | {} ", mode_text, info)
    } else {
        format!(" {} | {} ", mode_text, key_hints(app))
    };

    let status_style = if app.error_message.is_some() && !app.loading {
        Style::default().fg(Color::Red).bg(Color::Black)
    } else if app.info_message.is_some() {
        Style::default().fg(Color::Green).bg(Color::Black)
    } else {
        Style::default().fg(Color::Cyan).bg(Color::Black)
    };

    let status = Paragraph::new(status_text)
        .style(status_style)
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

fn key_hints(app: &App) -> &'static str {
    match app.mode {
        AppMode::Login => "Tab:next field | Enter:login | F2:register | Esc:quit",
        AppMode::Register => "Tab:next field | Enter:register | F2:login | Esc:quit",
        AppMode::Databases => {
            "↑↓:navigate | Enter:select | n:new | e:edit | d:delete | t:test | m:metadata | b:embeddings | s:sessions | L:logout | q:quit"
        }
        AppMode::DatabaseForm => "Tab:next field | Space:toggle SSL | Enter:save | Esc:back",
        AppMode::Sessions => "↑↓:navigate | Enter:open | n:new | r:rename | d:delete | Esc:back",
        AppMode::Query => {
            if app.query.generated.is_some() {
                "Ctrl+R:run SQL | Ctrl+D:discard | Ctrl+F:toggle format | Esc:back"
            } else if app.query.history_focus {
                "↑↓:history | Enter:show | d:delete | Tab:prompt | Esc:back"
            } else {
                "Ctrl+S:generate SQL | Tab:history | Esc:back"
            }
        }
        AppMode::Schema => {
            if app.metadata.filter_active {
                "Type to filter | Enter:expand | Esc:clear filter"
            } else {
                "↑↓:navigate | Enter:expand | /:filter | e:edit | g:generate | ?:search | Esc:back"
            }
        }
        AppMode::Relationships => "↑↓:navigate | Esc:back",
        AppMode::ErDiagram => "←↑↓→:pan | +/-:zoom | f:fit | Tab:next table | Esc:back",
        AppMode::Dashboard => "r:refresh | Esc:back",
        AppMode::Profile => match app.profile.password_step {
            PasswordStep::Idle => "e:change email | p:change password | Esc:back",
            _ => "Finish the password change in the input box | Esc:back",
        },
    }
}

fn render_editor(f: &mut Frame, editor: &tui_textarea::TextArea<'static>, area: Rect) {
    let popup = centered_rect(70, 50, area);
    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Edit description (Ctrl+S: save | Esc: cancel)")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(popup);
    f.render_widget(block, popup);
    f.render_widget(editor, inner);
}

fn render_popup(f: &mut Frame, title: &str, lines: Vec<Line>, color: Color) {
    let area = f.area();
    let popup = centered_rect(60, 25, area);
    f.render_widget(Clear, popup);
    let body = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        );
    f.render_widget(body, popup);
}

pub(crate) fn render_input_field(
    f: &mut Frame,
    label: &str,
    value: &str,
    is_selected: bool,
    area: Rect,
) {
    let style = if is_selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let border_style = if is_selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };

    let input = Paragraph::new(value.to_string())
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(label.to_string()),
        );

    f.render_widget(input, area);
}

pub(crate) fn panel(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title.into())
        .border_style(Style::default().fg(Color::Cyan))
}

pub(crate) fn selected_style(selected: bool) -> Style {
    if selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

/// First row to draw so that `selected` stays inside a window of `height` rows.
pub(crate) fn scroll_offset(selected: usize, height: usize) -> usize {
    if height == 0 || selected < height {
        0
    } else {
        selected + 1 - height
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
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
        .split(vertical[1])[1]
}
