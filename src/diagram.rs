//! ER diagram layout: normalizes the backend payload into positioned nodes
//! and edges with connection sides picked from the relative node positions.

use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_NODE_WIDTH: f64 = 220.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 200.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DiagramError {
    #[error("Invalid ER diagram data format")]
    InvalidFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// Handle identifier as the backend and web client name it.
    pub fn handle_id(self, target: bool) -> String {
        let base = match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        };
        if target {
            format!("{}-target", base)
        } else {
            base.to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiagramColumn {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "data_type", rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNode {
    pub id: String,
    pub label: String,
    pub schema: String,
    pub description: String,
    pub columns: Vec<DiagramColumn>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DiagramNode {
    /// Midpoint of the given side, in diagram coordinates (y grows down).
    pub fn anchor(&self, side: Side) -> (f64, f64) {
        match side {
            Side::Top => (self.x + self.width / 2.0, self.y),
            Side::Right => (self.x + self.width, self.y + self.height / 2.0),
            Side::Bottom => (self.x + self.width / 2.0, self.y + self.height),
            Side::Left => (self.x, self.y + self.height / 2.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub relationship_type: Option<String>,
    pub source_side: Side,
    pub target_side: Side,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

/// Picks the sides an edge leaves its source and enters its target, from the
/// angle between the two node positions.
pub fn choose_sides(source: (f64, f64), target: (f64, f64)) -> (Side, Side) {
    let angle = (target.1 - source.1).atan2(target.0 - source.0).to_degrees();
    if angle > -45.0 && angle <= 45.0 {
        (Side::Right, Side::Left)
    } else if angle > 45.0 && angle <= 135.0 {
        (Side::Bottom, Side::Top)
    } else if angle > 135.0 || angle <= -135.0 {
        (Side::Left, Side::Right)
    } else {
        (Side::Top, Side::Bottom)
    }
}

impl Diagram {
    /// Accepts the diagram either at the top level or nested under
    /// `diagram_data`.
    pub fn from_payload(payload: &Value) -> Result<Self, DiagramError> {
        let body = if has_graph(payload) {
            payload
        } else if has_graph(&payload["diagram_data"]) {
            &payload["diagram_data"]
        } else {
            return Err(DiagramError::InvalidFormat);
        };

        let nodes: Vec<DiagramNode> = body["nodes"]
            .as_array()
            .map(|nodes| nodes.iter().enumerate().map(|(i, n)| parse_node(i, n)).collect())
            .unwrap_or_default();

        let edges = body["edges"]
            .as_array()
            .map(|edges| {
                edges
                    .iter()
                    .enumerate()
                    .map(|(i, e)| parse_edge(i, e, &nodes))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { nodes, edges })
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// `(min_x, min_y, max_x, max_y)` over all nodes.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.nodes.iter().fold(None, |acc, n| {
            let (x0, y0, x1, y1) = (n.x, n.y, n.x + n.width, n.y + n.height);
            Some(match acc {
                None => (x0, y0, x1, y1),
                Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
            })
        })
    }
}

fn has_graph(value: &Value) -> bool {
    value["nodes"].is_array() && value["edges"].is_array()
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| *v != 0.0)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_node(index: usize, node: &Value) -> DiagramNode {
    let data = &node["data"];
    let id = text(&node["id"]).unwrap_or_else(|| format!("node-{}", index));
    let columns = data["columns"]
        .as_array()
        .map(|cols| {
            cols.iter()
                .filter_map(|c| serde_json::from_value(c.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    DiagramNode {
        label: text(&data["label"]).unwrap_or_else(|| id.clone()),
        schema: text(&data["schema"]).unwrap_or_default(),
        description: text(&data["description"]).unwrap_or_default(),
        columns,
        x: node["position"]["x"].as_f64().unwrap_or(0.0),
        y: node["position"]["y"].as_f64().unwrap_or(0.0),
        width: number(&node["width"]).unwrap_or(DEFAULT_NODE_WIDTH),
        height: number(&node["height"]).unwrap_or(DEFAULT_NODE_HEIGHT),
        id,
    }
}

fn parse_edge(index: usize, edge: &Value, nodes: &[DiagramNode]) -> DiagramEdge {
    let source = text(&edge["source"]).unwrap_or_default();
    let target = text(&edge["target"]).unwrap_or_default();

    let position = |id: &str| nodes.iter().find(|n| n.id == id).map(|n| (n.x, n.y));
    let (source_side, target_side) = match (position(&source), position(&target)) {
        (Some(s), Some(t)) => choose_sides(s, t),
        _ => (Side::Right, Side::Left),
    };

    DiagramEdge {
        id: text(&edge["id"]).unwrap_or_else(|| format!("edge-{}-{}-{}", source, target, index)),
        label: text(&edge["label"])
            .or_else(|| text(&edge["data"]["label"]))
            .unwrap_or_default(),
        relationship_type: text(&edge["data"]["relationship_type"]),
        source,
        target,
        source_side,
        target_side,
    }
}

/// Visible window over the diagram, in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            width: 1000.0,
            height: 600.0,
        }
    }
}

impl Viewport {
    const MIN_SPAN: f64 = 50.0;

    /// Frames every node with `padding` as a fraction of the diagram size.
    pub fn fit(diagram: &Diagram, padding: f64) -> Self {
        match diagram.bounds() {
            None => Self::default(),
            Some((x0, y0, x1, y1)) => {
                let w = (x1 - x0).max(Self::MIN_SPAN);
                let h = (y1 - y0).max(Self::MIN_SPAN);
                Self {
                    center_x: (x0 + x1) / 2.0,
                    center_y: (y0 + y1) / 2.0,
                    width: w * (1.0 + padding),
                    height: h * (1.0 + padding),
                }
            }
        }
    }

    /// `factor > 1` zooms in.
    pub fn zoom(&mut self, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        self.width = (self.width / factor).max(Self::MIN_SPAN);
        self.height = (self.height / factor).max(Self::MIN_SPAN);
    }

    /// Pans by a fraction of the visible span.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center_x += dx * self.width;
        self.center_y += dy * self.height;
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        [
            self.center_x - self.width / 2.0,
            self.center_x + self.width / 2.0,
        ]
    }

    /// Canvas y bounds. The canvas y axis points up, so diagram y is negated
    /// before plotting.
    pub fn y_bounds(&self) -> [f64; 2] {
        [
            -self.center_y - self.height / 2.0,
            -self.center_y + self.height / 2.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "nodes": [
                {
                    "id": "public.orders",
                    "position": {"x": 0, "y": 0},
                    "data": {"label": "orders", "schema": "public", "columns": [
                        {"name": "id", "type": "integer", "is_primary_key": true},
                        {"name": "customer_id", "type": "integer", "is_foreign_key": true}
                    ]},
                    "width": 220,
                    "height": 88
                },
                {
                    "id": "public.customers",
                    "position": {"x": 400, "y": 0},
                    "data": {"label": "customers", "schema": "public", "columns": []}
                },
                {
                    "id": "public.items",
                    "position": {"x": 0, "y": 300},
                    "data": {"label": "items"}
                }
            ],
            "edges": [
                {"id": "e-2-5", "source": "public.orders", "target": "public.customers",
                 "label": "customer_id → id"},
                {"source": "public.items", "target": "public.orders",
                 "data": {"label": "order_id → id", "relationship_type": "many_to_one"}},
                {"source": "public.orders", "target": "public.items"},
                {"source": "public.orders", "target": "public.ghost"}
            ],
            "metadata": {"database_id": 1}
        })
    }

    #[test]
    fn accepts_direct_and_nested_payloads() {
        let direct = Diagram::from_payload(&payload()).unwrap();
        let nested = Diagram::from_payload(&json!({ "diagram_data": payload() })).unwrap();
        assert_eq!(direct, nested);
        assert_eq!(direct.nodes.len(), 3);
        assert_eq!(
            Diagram::from_payload(&json!({ "nodes": [] })),
            Err(DiagramError::InvalidFormat)
        );
    }

    #[test]
    fn nodes_fill_defaults() {
        let diagram = Diagram::from_payload(&payload()).unwrap();
        let orders = diagram.node("public.orders").unwrap();
        assert_eq!(orders.height, 88.0);
        assert_eq!(orders.columns.len(), 2);
        assert!(orders.columns[0].is_primary_key);
        assert_eq!(orders.columns[1].data_type, "integer");

        let customers = diagram.node("public.customers").unwrap();
        assert_eq!(customers.width, DEFAULT_NODE_WIDTH);
        assert_eq!(customers.height, DEFAULT_NODE_HEIGHT);
    }

    #[test]
    fn edges_pick_sides_and_labels() {
        let diagram = Diagram::from_payload(&payload()).unwrap();
        let e = &diagram.edges;

        assert_eq!((e[0].source_side, e[0].target_side), (Side::Right, Side::Left));
        assert_eq!(e[0].label, "customer_id → id");

        assert_eq!(e[1].id, "edge-public.items-public.orders-1");
        assert_eq!((e[1].source_side, e[1].target_side), (Side::Top, Side::Bottom));
        assert_eq!(e[1].label, "order_id → id");
        assert_eq!(e[1].relationship_type.as_deref(), Some("many_to_one"));

        assert_eq!((e[2].source_side, e[2].target_side), (Side::Bottom, Side::Top));
        assert_eq!(e[2].label, "");

        // unknown target
        assert_eq!((e[3].source_side, e[3].target_side), (Side::Right, Side::Left));
    }

    #[test]
    fn side_boundaries() {
        assert_eq!(choose_sides((0.0, 0.0), (-10.0, 0.0)), (Side::Left, Side::Right));
        assert_eq!(choose_sides((0.0, 0.0), (10.0, 10.0)), (Side::Right, Side::Left));
        assert_eq!(choose_sides((0.0, 0.0), (-10.0, -10.0)), (Side::Left, Side::Right));
        assert_eq!(choose_sides((0.0, 0.0), (0.0, -10.0)), (Side::Top, Side::Bottom));
        assert_eq!(Side::Top.handle_id(true), "top-target");
    }

    #[test]
    fn fit_covers_all_nodes() {
        let diagram = Diagram::from_payload(&payload()).unwrap();
        let view = Viewport::fit(&diagram, 0.5);
        let [x0, x1] = view.x_bounds();
        assert!(x0 < 0.0 && x1 > 620.0);
        let [y0, y1] = view.y_bounds();
        assert!(y0 < -500.0 && y1 > 0.0);
    }

    #[test]
    fn zoom_and_pan() {
        let mut view = Viewport::default();
        view.zoom(2.0);
        assert_eq!(view.width, 500.0);
        view.pan(0.1, 0.0);
        assert_eq!(view.center_x, 50.0);
    }
}
