use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::{panel, scroll_offset, selected_style};
use crate::app::{App, ShownResult};
use crate::formatter::SqlFormatter;
use crate::markdown;
use crate::syntax;

pub fn render_query(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(columns[0]);

    render_prompt(f, app, chunks[0]);
    if app.query.generated.is_some() {
        render_generated(f, app, chunks[1]);
    } else {
        render_results(f, app, chunks[1]);
    }
    render_history(f, app, columns[1]);
}

fn render_prompt(f: &mut Frame, app: &App, area: Rect) {
    let session = app
        .query
        .session
        .as_ref()
        .map(|s| s.title.clone())
        .unwrap_or_else(|| "No session".to_string());
    let database = app
        .query
        .database
        .as_ref()
        .map(|d| d.name.clone())
        .unwrap_or_else(|| "no database".to_string());

    let focused = !app.query.history_focus && app.query.generated.is_none();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{} @ {} (Ctrl+S to generate SQL)", session, database))
        .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::Cyan }));

    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.query.prompt_text().is_empty() && focused {
        let help = Paragraph::new("Ask a question about your data, e.g. \"top 10 customers by revenue\"")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: false });
        f.render_widget(help, inner);
    } else {
        f.render_widget(&app.query.prompt, inner);
    }
}

fn sql_lines(sql: &str, pretty: bool) -> Vec<Line<'static>> {
    if pretty {
        syntax::highlight(&SqlFormatter::new().format(sql))
    } else {
        syntax::highlight(sql)
    }
}

fn render_generated(f: &mut Frame, app: &App, area: Rect) {
    let Some(generated) = &app.query.generated else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            generated.prompt.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
    ];
    lines.extend(sql_lines(&generated.sql, app.query.pretty_sql));
    if !generated.explanation.trim().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Explanation",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.extend(generated.explanation.lines().map(|l| Line::from(l.to_string())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Ctrl+R: run this SQL | Ctrl+D: discard | Ctrl+F: toggle formatting",
        Style::default().fg(Color::DarkGray),
    )));

    let generated_panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Generated SQL")
                .border_style(Style::default().fg(Color::Green)),
        );
    f.render_widget(generated_panel, area);
}

fn render_results(f: &mut Frame, app: &App, area: Rect) {
    let Some(result) = &app.query.result else {
        let help = Paragraph::new("No query results yet.\n\nDescribe what you want above; the generated SQL is shown for review before it runs.")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: false })
            .block(panel("Results"));
        f.render_widget(help, area);
        return;
    };

    let sql = sql_lines(&result.sql, app.query.pretty_sql);
    let sql_height = (sql.len() as u16 + 2).min(area.height / 2).max(3);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(sql_height), Constraint::Min(0)])
        .split(area);

    f.render_widget(
        Paragraph::new(sql).wrap(Wrap { trim: false }).block(panel("SQL")),
        chunks[0],
    );
    render_result_table(f, result, chunks[1]);
}

fn render_result_table(f: &mut Frame, result: &ShownResult, area: Rect) {
    if !result.success {
        let message = result.status.clone().unwrap_or_else(|| "Query failed".to_string());
        let failed = Paragraph::new(format!("Query failed: {}", message))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false })
            .block(panel("Results"));
        f.render_widget(failed, area);
        return;
    }

    if result.rows.is_empty() || result.columns.is_empty() {
        let empty = Paragraph::new("Query executed successfully. No rows returned.")
            .style(Style::default().fg(Color::Green))
            .block(panel("Results"));
        f.render_widget(empty, area);
        return;
    }

    // Create table header
    let header = Row::new(result.columns.clone())
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = result
        .rows
        .iter()
        .map(|row| {
            Row::new(row.iter().map(|cell| match cell {
                Some(value) => Span::raw(value.clone()),
                None => Span::styled("NULL", Style::default().fg(Color::DarkGray)),
            }))
        })
        .collect();

    let col_count = result.columns.len() as u16;
    let constraints: Vec<Constraint> = (0..col_count)
        .map(|_| Constraint::Percentage(100 / col_count))
        .collect();

    let mut title = format!("Results ({} rows)", result.rows.len());
    if let Some(secs) = result.execution_time {
        title.push_str(&format!(" in {:.3}s", secs));
    }

    let table = Table::new(rows, constraints).header(header).block(panel(title));
    f.render_widget(table, area);
}

fn render_history(f: &mut Frame, app: &App, area: Rect) {
    let queries = app.query.queries();
    let border = if app.query.history_focus { Color::Yellow } else { Color::Cyan };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("History ({})", queries.len()))
        .border_style(Style::default().fg(border));

    if queries.is_empty() {
        f.render_widget(
            Paragraph::new("No queries in this session yet.")
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let height = chunks[0].height.saturating_sub(2) as usize;
    let selected = app.query.history_selected;
    let items: Vec<ListItem> = queries
        .iter()
        .enumerate()
        .skip(scroll_offset(selected, height))
        .take(height)
        .map(|(i, query)| {
            let mark = if query.success {
                Span::styled("✓ ", Style::default().fg(Color::Green))
            } else {
                Span::styled("✗ ", Style::default().fg(Color::Red))
            };
            let prompt: String = query.prompt.lines().next().unwrap_or_default().to_string();
            ListItem::new(Line::from(vec![mark, Span::styled(prompt, selected_style(i == selected))]))
        })
        .collect();
    f.render_widget(List::new(items).block(block), chunks[0]);

    // Preview of the highlighted entry
    if let Some(query) = queries.get(selected) {
        let summary = markdown::summarize(&query.response);
        let color = if summary.has_error { Color::Red } else { Color::White };
        let title = if summary.row_count > 0 {
            format!("Preview ({} rows)", summary.row_count)
        } else {
            "Preview".to_string()
        };
        let preview = Paragraph::new(summary.preview)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: false })
            .block(panel(title));
        f.render_widget(preview, chunks[1]);
    }
}
