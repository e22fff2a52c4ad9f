use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Paragraph, Row, Table},
    Frame,
};

use super::panel;
use crate::app::App;
use crate::stats::DashboardStats;

pub fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let Some(stats) = &app.dashboard else {
        let empty = Paragraph::new("Press 'r' to load the dashboard.")
            .style(Style::default().fg(Color::DarkGray))
            .block(panel("Dashboard"));
        f.render_widget(empty, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Percentage(45),
            Constraint::Min(0),
        ])
        .split(area);

    render_counters(f, stats, rows[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);
    render_activity(f, stats, charts[0]);
    render_kinds(f, stats, charts[1]);

    render_usage(f, stats, rows[2]);
}

fn render_counters(f: &mut Frame, stats: &DashboardStats, area: Rect) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let counters = [
        ("Databases", stats.databases.to_string()),
        ("Sessions", stats.sessions.to_string()),
        ("Queries", format!("{} ({} ok)", stats.queries, stats.successful)),
        ("Success rate", format!("{:.1}%", stats.success_rate())),
    ];
    for ((label, value), cell) in counters.into_iter().zip(cells.iter()) {
        let widget = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )))
        .block(panel(label));
        f.render_widget(widget, *cell);
    }
}

fn render_activity(f: &mut Frame, stats: &DashboardStats, area: Rect) {
    let bars: Vec<Bar> = stats
        .activity
        .iter()
        .map(|(day, count)| {
            Bar::default()
                .value(*count)
                .label(Line::from(day.format("%m-%d").to_string()))
        })
        .collect();

    let chart = BarChart::default()
        .block(panel("Queries per day"))
        .data(BarGroup::default().bars(&bars))
        .bar_width(6)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, area);
}

fn render_kinds(f: &mut Frame, stats: &DashboardStats, area: Rect) {
    let bars: Vec<Bar> = stats
        .kinds
        .iter()
        .map(|(kind, count)| {
            Bar::default()
                .value(*count)
                .label(Line::from(kind.label()))
        })
        .collect();

    let chart = BarChart::default()
        .block(panel("Statement kinds"))
        .data(BarGroup::default().bars(&bars))
        .bar_width(9)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Green))
        .value_style(Style::default().fg(Color::Black).bg(Color::Green));
    f.render_widget(chart, area);
}

fn render_usage(f: &mut Frame, stats: &DashboardStats, area: Rect) {
    let totals = &stats.usage_totals;
    let title = format!(
        "Token usage, last 7 days: {} prompt + {} completion = {} total",
        totals.prompt, totals.completion, totals.total
    );

    if stats.usage.is_empty() {
        let empty = Paragraph::new("No token usage recorded.")
            .style(Style::default().fg(Color::DarkGray))
            .block(panel(title));
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["Time", "Model", "Prompt", "Completion", "Total", "Query"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    // newest first on screen
    let rows: Vec<Row> = stats
        .usage
        .iter()
        .rev()
        .map(|u| {
            Row::new(vec![
                u.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                u.model.clone(),
                u.prompt_tokens.to_string(),
                u.completion_tokens.to_string(),
                u.total_tokens.to_string(),
                u.query_text.clone().unwrap_or_default(),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(panel(title));
    f.render_widget(table, area);
}
