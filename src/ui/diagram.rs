use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Rectangle},
        Paragraph, Wrap,
    },
    Frame,
};

use super::panel;
use crate::app::App;
use crate::diagram::Diagram;

pub fn render_diagram(f: &mut Frame, app: &App, area: Rect) {
    let view = &app.diagram;

    if let Some(error) = &view.error {
        let message = Paragraph::new(format!("{}\n\nPress 'r' to reload.", error))
            .style(Style::default().fg(Color::Red))
            .block(panel("ER Diagram"));
        f.render_widget(message, area);
        return;
    }

    let Some(diagram) = view.diagram.as_ref().filter(|d| !d.nodes.is_empty()) else {
        let empty = Paragraph::new("No tables to draw. Extract metadata for this database first.")
            .style(Style::default().fg(Color::DarkGray))
            .block(panel("ER Diagram"));
        f.render_widget(empty, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(area);

    let viewport = view.viewport;
    let selected = view.selected_node;
    let canvas = Canvas::default()
        .block(panel(format!(
            "ER Diagram ({} tables, {} relationships)",
            diagram.nodes.len(),
            diagram.edges.len()
        )))
        .marker(Marker::Braille)
        .x_bounds(viewport.x_bounds())
        .y_bounds(viewport.y_bounds())
        .paint(move |ctx| {
            for edge in &diagram.edges {
                let (Some(source), Some(target)) = (diagram.node(&edge.source), diagram.node(&edge.target)) else {
                    continue;
                };
                let (x1, y1) = source.anchor(edge.source_side);
                let (x2, y2) = target.anchor(edge.target_side);
                ctx.draw(&CanvasLine {
                    x1,
                    y1: -y1,
                    x2,
                    y2: -y2,
                    color: Color::DarkGray,
                });
            }
            ctx.layer();

            for (i, node) in diagram.nodes.iter().enumerate() {
                let color = if i == selected { Color::Yellow } else { Color::Cyan };
                ctx.draw(&Rectangle {
                    x: node.x,
                    y: -(node.y + node.height),
                    width: node.width,
                    height: node.height,
                    color,
                });
            }
            ctx.layer();

            for (i, node) in diagram.nodes.iter().enumerate() {
                let style = if i == selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                ctx.print(
                    node.x + node.width * 0.05,
                    -(node.y + node.height * 0.15),
                    Line::from(Span::styled(node.label.clone(), style)),
                );
            }
        });
    f.render_widget(canvas, chunks[0]);

    render_selected_table(f, diagram, selected, chunks[1]);
}

fn render_selected_table(f: &mut Frame, diagram: &Diagram, selected: usize, area: Rect) {
    let Some(node) = diagram.nodes.get(selected) else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("{}.{}", node.schema, node.label),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
    ];
    if !node.description.is_empty() {
        lines.push(Line::from(Span::styled(
            node.description.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));
    for column in &node.columns {
        let key = if column.is_primary_key {
            Span::styled("PK ", Style::default().fg(Color::Yellow))
        } else if column.is_foreign_key {
            Span::styled("FK ", Style::default().fg(Color::Magenta))
        } else {
            Span::raw("   ")
        };
        lines.push(Line::from(vec![
            key,
            Span::raw(column.name.clone()),
            Span::styled(format!(" {}", column.data_type), Style::default().fg(Color::DarkGray)),
        ]));
    }

    let links: Vec<Line> = diagram
        .edges
        .iter()
        .filter(|e| e.source == node.id || e.target == node.id)
        .map(|e| {
            let other = if e.source == node.id { &e.target } else { &e.source };
            let name = diagram.node(other).map(|n| n.label.as_str()).unwrap_or(other.as_str());
            let arrow = if e.source == node.id { "→" } else { "←" };
            Line::from(format!("{} {} {}", arrow, name, e.label))
        })
        .collect();
    if !links.is_empty() {
        lines.push(Line::from(""));
        lines.extend(links);
    }

    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(panel("Table")),
        area,
    );
}
