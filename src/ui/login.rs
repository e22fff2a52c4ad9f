use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::render_input_field;
use crate::app::{App, AppMode, LoginField};

pub fn render_login(f: &mut Frame, app: &App, area: Rect) {
    let register = app.mode == AppMode::Register;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(if register { 3 } else { 0 }),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let heading = if register {
        "Create an account"
    } else {
        "Sign in to NL-SQL"
    };
    let title = Paragraph::new(heading)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(title, chunks[0]);

    let form = &app.login;
    render_input_field(
        f,
        "Username",
        &form.username,
        form.field == LoginField::Username,
        chunks[1],
    );

    if register {
        render_input_field(
            f,
            "Email",
            &form.email,
            form.field == LoginField::Email,
            chunks[2],
        );
    }

    let masked_password = "*".repeat(form.password.chars().count());
    render_input_field(
        f,
        "Password",
        &masked_password,
        form.field == LoginField::Password,
        chunks[3],
    );

    let switch = if register {
        "F2: back to sign in"
    } else {
        "F2: create an account"
    };
    let instructions = Paragraph::new(vec![
        Line::from("Tab/Shift+Tab: Next/Previous field | Enter: Submit | Esc: Quit"),
        Line::from(Span::styled(switch, Style::default().fg(Color::DarkGray))),
    ])
    .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[4]);
}
