use tracing::warn;

use crate::app::App;
use crate::diagram::{Diagram, Viewport};
use crate::error::{ApiError, ApiResult};

const FIT_PADDING: f64 = 0.5;
const ZOOM_STEP: f64 = 1.25;
const PAN_STEP: f64 = 0.1;

#[derive(Debug, Clone, Default)]
pub struct DiagramView {
    pub diagram: Option<Diagram>,
    /// Shown in place of the diagram when the payload could not be read.
    pub error: Option<String>,
    pub viewport: Viewport,
    pub selected_node: usize,
}

impl DiagramView {
    pub fn fit(&mut self) {
        if let Some(diagram) = &self.diagram {
            self.viewport = Viewport::fit(diagram, FIT_PADDING);
        }
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom(1.0 / ZOOM_STEP);
    }

    pub fn pan(&mut self, dx: i8, dy: i8) {
        self.viewport.pan(f64::from(dx) * PAN_STEP, f64::from(dy) * PAN_STEP);
    }

    pub fn node_count(&self) -> usize {
        self.diagram.as_ref().map_or(0, |d| d.nodes.len())
    }

    /// Cycles the highlighted table and centers the view on it.
    pub fn select_next(&mut self, forward: bool) {
        let len = self.node_count();
        if len == 0 {
            return;
        }
        self.selected_node = if forward {
            (self.selected_node + 1) % len
        } else {
            (self.selected_node + len - 1) % len
        };
        if let Some(node) = self.diagram.as_ref().and_then(|d| d.nodes.get(self.selected_node)) {
            self.viewport.center_x = node.x + node.width / 2.0;
            self.viewport.center_y = node.y + node.height / 2.0;
        }
    }
}

impl App {
    pub async fn load_diagram(&mut self) -> ApiResult<()> {
        let database_id = self
            .selected_database()
            .map(|d| d.id)
            .ok_or_else(|| ApiError::Validation("Select a database first".to_string()))?;

        let payload = self.backend().er_diagram(database_id).await?;
        self.diagram = DiagramView::default();
        match Diagram::from_payload(&payload) {
            Ok(diagram) => {
                self.diagram.diagram = Some(diagram);
                self.diagram.fit();
            }
            Err(e) => {
                warn!("ER diagram for database {}: {}", database_id, e);
                self.diagram.error = Some(e.to_string());
            }
        }
        Ok(())
    }
}
