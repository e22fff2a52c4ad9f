use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::panel;
use crate::app::{App, PasswordStep};

pub fn render_profile(f: &mut Frame, app: &App, area: Rect) {
    let label = |text: &str| Span::styled(format!("{:<14}", text), Style::default().fg(Color::Yellow));

    let mut lines = match &app.profile.user {
        Some(user) => {
            let full_name = format!("{} {}", user.first_name, user.last_name).trim().to_string();
            vec![
                Line::from(Span::styled(
                    user.username.clone(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(vec![label("Email"), Span::raw(user.email.clone())]),
                Line::from(vec![
                    label("Name"),
                    Span::raw(if full_name.is_empty() { "-".to_string() } else { full_name }),
                ]),
            ]
        }
        None => vec![Line::from(Span::styled(
            "Profile not loaded",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let step = match app.profile.password_step {
        PasswordStep::Idle => "e: change email | p: change password",
        PasswordStep::AwaitingOtp => "Password change: enter the code sent to your email",
        PasswordStep::AwaitingPassword => "Password change: choose a new password",
    };
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(step, Style::default().fg(Color::DarkGray))));

    f.render_widget(Paragraph::new(lines).block(panel("Profile")), area);
}
