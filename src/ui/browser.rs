use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::{panel, scroll_offset, selected_style};
use crate::api::models::SearchHit;
use crate::app::{App, MetadataItem};

pub fn render_browser(f: &mut Frame, app: &App, area: Rect) {
    let view = &app.metadata;

    // Split area into filter input and browser list
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filter input
            Constraint::Min(0),    // Browser list
        ])
        .split(area);

    let filter_text = if view.filter_active {
        format!(" Filter: {}_", view.filter_input)
    } else {
        " Press '/' to filter".to_string()
    };

    let filter_style = if view.filter_active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let filter_widget = Paragraph::new(filter_text).style(filter_style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if view.filter_active { Color::Yellow } else { Color::Cyan })),
    );
    f.render_widget(filter_widget, chunks[0]);

    let visible = view.visible_items();
    let height = chunks[1].height.saturating_sub(2) as usize;

    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .skip(scroll_offset(view.selected, height))
        .take(height)
        .map(|(pos, item)| {
            let content = match *item {
                MetadataItem::Table(t) => {
                    let table = &view.tables[t];
                    let arrow = if view.expanded.contains(&table.id) { "▾" } else { "▸" };
                    format!("{} {}", arrow, table.qualified_name())
                }
                MetadataItem::Column(t, c) => {
                    let column = &view.tables[t].columns[c];
                    let key = if column.is_primary_key {
                        "PK "
                    } else if column.is_foreign_key {
                        "FK "
                    } else {
                        "   "
                    };
                    format!("    {}{} : {}", key, column.name, column.data_type)
                }
            };
            ListItem::new(content).style(selected_style(pos == view.selected))
        })
        .collect();

    let title = if view.filter_active && !view.filter_input.is_empty() {
        format!("Schema ({} shown / {} tables)", visible.len(), view.tables.len())
    } else {
        format!("Schema ({} tables)", view.tables.len())
    };

    f.render_widget(List::new(items).block(panel(title)), chunks[1]);
}

pub fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let view = &app.metadata;
    if view.show_hits {
        render_search_hits(f, &view.hits, area);
        return;
    }

    match view.current() {
        None => {
            let help = Paragraph::new("Select a table to view its structure\n\nKeyboard shortcuts:\n  ↑/↓ - Navigate\n  Enter - Expand/collapse\n  / - Filter by name\n  e - Edit description\n  g - Generate description\n  ? - Semantic search\n  Esc - Back")
                .block(panel("Details"));
            f.render_widget(help, area);
        }
        Some(MetadataItem::Column(t, c)) => {
            let table = &view.tables[t];
            let column = &table.columns[c];
            let flag = |on: bool| if on { "yes" } else { "no" };
            let lines = vec![
                Line::from(Span::styled(
                    format!("{}.{}", table.qualified_name(), column.name),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("Type:         {}", column.data_type)),
                Line::from(format!("Nullable:     {}", flag(column.is_nullable))),
                Line::from(format!("Primary key:  {}", flag(column.is_primary_key))),
                Line::from(format!("Foreign key:  {}", flag(column.is_foreign_key))),
                Line::from(""),
                description_line(column.description.as_deref()),
            ];
            f.render_widget(
                Paragraph::new(lines).wrap(Wrap { trim: false }).block(panel("Column")),
                area,
            );
        }
        Some(MetadataItem::Table(t)) => {
            let table = &view.tables[t];
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(6), Constraint::Min(0)])
                .split(area);

            let rows = table
                .row_count
                .map(|n| format!("{} rows", n))
                .unwrap_or_else(|| "row count unknown".to_string());
            let summary = vec![
                Line::from(Span::styled(
                    format!("{} ({}, {})", table.qualified_name(), table.table_type, rows),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                description_line(table.description.as_deref()),
            ];
            f.render_widget(
                Paragraph::new(summary).wrap(Wrap { trim: false }).block(panel("Table")),
                chunks[0],
            );

            let header = Row::new(vec!["Column", "Type", "Nullable", "Key", "Description"])
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                .bottom_margin(1);

            let rows: Vec<Row> = table
                .columns
                .iter()
                .map(|col| {
                    let key = match (col.is_primary_key, col.is_foreign_key) {
                        (true, _) => "PK",
                        (false, true) => "FK",
                        _ => "",
                    };
                    Row::new(vec![
                        col.name.clone(),
                        col.data_type.clone(),
                        if col.is_nullable { "YES" } else { "NO" }.to_string(),
                        key.to_string(),
                        col.description.clone().unwrap_or_else(|| "-".to_string()),
                    ])
                })
                .collect();

            let table_widget = Table::new(
                rows,
                [
                    Constraint::Percentage(22),
                    Constraint::Percentage(18),
                    Constraint::Percentage(10),
                    Constraint::Percentage(6),
                    Constraint::Percentage(44),
                ],
            )
            .header(header)
            .block(panel("Table Structure"));

            f.render_widget(table_widget, chunks[1]);
        }
    }
}

fn description_line(description: Option<&str>) -> Line<'static> {
    match description.filter(|d| !d.trim().is_empty()) {
        Some(text) => Line::from(text.to_string()),
        None => Line::from(Span::styled(
            "No description. Press 'e' to write one or 'g' to generate it.",
            Style::default().fg(Color::DarkGray),
        )),
    }
}

fn render_search_hits(f: &mut Frame, hits: &[SearchHit], area: Rect) {
    let items: Vec<ListItem> = hits
        .iter()
        .map(|hit| {
            let (label, score, description) = match hit {
                SearchHit::Table {
                    name,
                    schema,
                    description,
                    score,
                    ..
                } => (format!("table  {}.{}", schema, name), *score, description),
                SearchHit::Column {
                    name,
                    table_name,
                    schema,
                    data_type,
                    description,
                    score,
                    ..
                } => (
                    format!("column {}.{}.{} ({})", schema, table_name, name, data_type),
                    *score,
                    description,
                ),
            };
            let mut lines = vec![Line::from(vec![
                Span::styled(format!("{:>5.2} ", score), Style::default().fg(Color::Green)),
                Span::raw(label),
            ])];
            if let Some(text) = description.as_deref().filter(|d| !d.is_empty()) {
                lines.push(Line::from(Span::styled(
                    format!("      {}", text),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    f.render_widget(
        List::new(items).block(panel(format!("Search results ({}) - Esc to close", hits.len()))),
        area,
    );
}

pub fn render_relationships(f: &mut Frame, app: &App, area: Rect) {
    let view = &app.metadata;
    if view.relationships.is_empty() {
        let empty = Paragraph::new("No foreign-key relationships found. Extract metadata from the databases screen first.")
            .style(Style::default().fg(Color::DarkGray))
            .block(panel("Relationships"));
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["From", "To", "Type"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let height = area.height.saturating_sub(4) as usize;
    let rows: Vec<Row> = view
        .relationships
        .iter()
        .enumerate()
        .skip(scroll_offset(view.relationship_selected, height))
        .take(height)
        .map(|(i, rel)| {
            Row::new(vec![
                format!("{}.{}.{}", rel.from_schema, rel.from_table, rel.from_column),
                format!("{}.{}.{}", rel.to_schema, rel.to_table, rel.to_column),
                rel.relationship_type.clone(),
            ])
            .style(selected_style(i == view.relationship_selected))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(42),
            Constraint::Percentage(42),
            Constraint::Percentage(16),
        ],
    )
    .header(header)
    .block(panel(format!("Relationships ({})", view.relationships.len())));

    f.render_widget(table, area);
}
