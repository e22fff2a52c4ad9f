use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::{panel, render_input_field, scroll_offset, selected_style};
use crate::api::models::ConnectionStatus;
use crate::app::{App, FormField};

pub fn render_databases(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let active = app.selected_database().map(|d| d.id);
    let list = &app.databases;

    if list.items.is_empty() {
        let empty = Paragraph::new("\n  No databases yet.\n\n  Press 'n' to add a connection.")
            .style(Style::default().fg(Color::DarkGray))
            .block(panel("Databases"));
        f.render_widget(empty, chunks[0]);
    } else {
        let height = chunks[0].height.saturating_sub(2) as usize;
        let offset = scroll_offset(list.selected, height);
        let items: Vec<ListItem> = list
            .items
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(i, db)| {
                let marker = if Some(db.id) == active { "● " } else { "  " };
                ListItem::new(format!("{}{}", marker, db.name)).style(selected_style(i == list.selected))
            })
            .collect();

        let title = format!("Databases ({}/{})", list.selected + 1, list.items.len());
        f.render_widget(List::new(items).block(panel(title)), chunks[0]);
    }

    let Some(db) = list.current() else {
        f.render_widget(Paragraph::new("").block(panel("Details")), chunks[1]);
        return;
    };

    let status_color = match db.connection_status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Disconnected => Color::DarkGray,
        ConnectionStatus::Error => Color::Red,
    };
    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<16}", label), Style::default().fg(Color::Yellow)),
            Span::raw(value),
        ])
    };
    let mut lines = vec![
        Line::from(Span::styled(
            db.name.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        field("Type", db.database_type.clone()),
        field("Host", format!("{}:{}", db.host, db.port)),
        field("Database", db.database_name.clone()),
        field("Username", db.username.clone()),
        field("SSL", if db.ssl_enabled { "on" } else { "off" }.to_string()),
        Line::from(vec![
            Span::styled(format!("{:<16}", "Status"), Style::default().fg(Color::Yellow)),
            Span::styled(db.connection_status.label(), Style::default().fg(status_color)),
        ]),
        field(
            "Metadata",
            db.last_metadata_update
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never extracted".to_string()),
        ),
    ];
    if let Some(description) = db.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(Line::from(""));
        lines.push(Line::from(description.to_string()));
    }
    if Some(db.id) == active {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Selected. s: sessions | c: schema | l: relationships | x: ER diagram | h: dashboard | p: profile",
            Style::default().fg(Color::DarkGray),
        )));
    }

    f.render_widget(Paragraph::new(lines).block(panel("Details")), chunks[1]);
}

pub fn render_database_form(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.database_form;
    let mut constraints = vec![Constraint::Length(2)];
    constraints.extend(FormField::ALL.iter().map(|_| Constraint::Length(3)));
    constraints.push(Constraint::Min(0));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints)
        .split(area);

    let heading = if form.editing.is_some() {
        "Edit database connection"
    } else {
        "New database connection"
    };
    let title = Paragraph::new(heading)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(title, chunks[0]);

    for (i, field) in FormField::ALL.iter().enumerate() {
        let label = if *field == FormField::Password && form.editing.is_some() {
            "Password (leave empty to keep)"
        } else {
            field.label()
        };
        render_input_field(f, label, &form.value(*field), form.field == *field, chunks[i + 1]);
    }
}
