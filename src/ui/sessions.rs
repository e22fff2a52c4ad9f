use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use super::{panel, scroll_offset, selected_style};
use crate::app::App;

pub fn render_sessions(f: &mut Frame, app: &App, area: Rect) {
    let scope = app
        .selected_database()
        .map(|d| format!("Sessions for {}", d.name))
        .unwrap_or_else(|| "All sessions".to_string());
    let list = &app.sessions;

    if list.items.is_empty() {
        let empty = Paragraph::new("\n  No sessions yet.\n\n  Press 'n' to start one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(panel(scope));
        f.render_widget(empty, area);
        return;
    }

    let height = area.height.saturating_sub(2) as usize;
    let offset = scroll_offset(list.selected, height);
    let items: Vec<ListItem> = list
        .items
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, session)| {
            let marker = if Some(session.id) == list.active { "▶ " } else { "  " };
            let updated = session
                .updated_at
                .or(session.created_at)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let content = format!(
                "{}{:<40} {:>4} queries  {}  {}",
                marker,
                session.title,
                session.query_count,
                session.database_name.as_deref().unwrap_or("-"),
                updated
            );
            ListItem::new(content).style(selected_style(i == list.selected))
        })
        .collect();

    let title = format!("{} ({}/{})", scope, list.selected + 1, list.items.len());
    f.render_widget(List::new(items).block(panel(title)), area);
}
