use std::collections::HashSet;

use crossterm::event::KeyCode;
use tracing::info;
use tui_textarea::TextArea;

use crate::api::models::{MetadataKind, Relationship, SearchHit, TableMetadata};
use crate::app::{step, App};
use crate::error::{ApiError, ApiResult};

/// One row of the schema browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataItem {
    Table(usize),
    /// Table index, column index.
    Column(usize, usize),
}

/// An AI-written description awaiting the user's approval.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDescription {
    pub kind: MetadataKind,
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct MetadataView {
    pub tables: Vec<TableMetadata>,
    pub expanded: HashSet<i64>,
    pub selected: usize,

    // Filter state
    pub filter_input: String,
    pub filter_active: bool,

    pub hits: Vec<SearchHit>,
    pub show_hits: bool,

    pub editor: Option<TextArea<'static>>,
    pub pending_description: Option<PendingDescription>,

    pub relationships: Vec<Relationship>,
    pub relationship_selected: usize,
}

impl MetadataView {
    pub fn activate_filter(&mut self) {
        self.filter_active = true;
    }

    pub fn clear_filter(&mut self) {
        self.filter_input.clear();
        self.filter_active = false;
        self.selected = 0;
    }

    pub fn handle_filter_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char(c) => self.filter_input.push(c),
            KeyCode::Backspace => {
                self.filter_input.pop();
            }
            _ => {}
        }
        self.selected = 0;
    }

    /// Rows to display. Tables match the filter on their qualified name; a
    /// table whose name misses still shows with the columns that match.
    pub fn visible_items(&self) -> Vec<MetadataItem> {
        let filter = self.filter_input.to_lowercase();
        let filtering = self.filter_active && !filter.is_empty();
        let mut items = Vec::new();

        for (t, table) in self.tables.iter().enumerate() {
            let table_hit = !filtering || table.qualified_name().to_lowercase().contains(&filter);
            let column_hits: Vec<usize> = table
                .columns
                .iter()
                .enumerate()
                .filter(|(_, c)| filtering && c.name.to_lowercase().contains(&filter))
                .map(|(i, _)| i)
                .collect();

            if !table_hit && column_hits.is_empty() {
                continue;
            }
            items.push(MetadataItem::Table(t));

            if self.expanded.contains(&table.id) {
                items.extend((0..table.columns.len()).map(|c| MetadataItem::Column(t, c)));
            } else {
                items.extend(column_hits.into_iter().map(|c| MetadataItem::Column(t, c)));
            }
        }
        items
    }

    pub fn up(&mut self) {
        self.selected = step(self.selected, self.visible_items().len(), false);
    }

    pub fn down(&mut self) {
        self.selected = step(self.selected, self.visible_items().len(), true);
    }

    pub fn relationship_step(&mut self, down: bool) {
        self.relationship_selected = step(self.relationship_selected, self.relationships.len(), down);
    }

    pub fn current(&self) -> Option<MetadataItem> {
        self.visible_items().get(self.selected).copied()
    }

    pub fn toggle_expand(&mut self) {
        let Some(item) = self.current() else {
            return;
        };
        let t = match item {
            MetadataItem::Table(t) | MetadataItem::Column(t, _) => t,
        };
        let id = self.tables[t].id;
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
        // keep the cursor on the table row
        if let Some(pos) = self.visible_items().iter().position(|i| *i == MetadataItem::Table(t)) {
            self.selected = pos;
        }
    }

    /// Kind, id and current description of the highlighted row.
    pub fn target(&self) -> Option<(MetadataKind, i64, String)> {
        match self.current()? {
            MetadataItem::Table(t) => {
                let table = &self.tables[t];
                Some((MetadataKind::Table, table.id, table.description.clone().unwrap_or_default()))
            }
            MetadataItem::Column(t, c) => {
                let column = &self.tables[t].columns[c];
                Some((MetadataKind::Column, column.id, column.description.clone().unwrap_or_default()))
            }
        }
    }

    pub fn start_edit(&mut self) {
        if let Some((_, _, description)) = self.target() {
            let mut editor = TextArea::from(description.lines().map(str::to_string).collect::<Vec<_>>());
            editor.move_cursor(tui_textarea::CursorMove::Bottom);
            editor.move_cursor(tui_textarea::CursorMove::End);
            self.editor = Some(editor);
        }
    }

    pub fn editor_text(&self) -> Option<String> {
        self.editor.as_ref().map(|e| e.lines().join("\n"))
    }

    fn apply_description(&mut self, kind: MetadataKind, id: i64, text: &str) {
        for table in self.tables.iter_mut() {
            match kind {
                MetadataKind::Table if table.id == id => {
                    table.description = Some(text.to_string());
                }
                MetadataKind::Column => {
                    for column in table.columns.iter_mut().filter(|c| c.id == id) {
                        column.description = Some(text.to_string());
                    }
                }
                _ => {}
            }
        }
    }
}

impl App {
    fn metadata_database(&self) -> ApiResult<i64> {
        self.selected_database()
            .map(|d| d.id)
            .ok_or_else(|| ApiError::Validation("Select a database first".to_string()))
    }

    pub async fn load_schema(&mut self) -> ApiResult<()> {
        let database_id = self.metadata_database()?;
        let tables = self.backend().schema(database_id).await?;
        info!("Loaded {} tables for database {}", tables.len(), database_id);
        self.metadata.tables = tables;
        self.metadata.expanded.clear();
        self.metadata.selected = 0;
        self.metadata.show_hits = false;
        Ok(())
    }

    pub async fn load_relationships(&mut self) -> ApiResult<()> {
        let database_id = self.metadata_database()?;
        self.metadata.relationships = self.backend().relationships(database_id).await?;
        self.metadata.relationship_selected = 0;
        Ok(())
    }

    pub async fn search_metadata(&mut self, text: &str) -> ApiResult<()> {
        let database_id = self.metadata_database()?;
        let mut hits = self.backend().search_metadata(database_id, text).await?;
        hits.sort_by(|a, b| hit_score(b).total_cmp(&hit_score(a)));
        if hits.is_empty() {
            self.set_info(format!("No matches for \"{}\"", text));
        }
        self.metadata.hits = hits;
        self.metadata.show_hits = true;
        Ok(())
    }

    pub async fn save_description(&mut self, text: &str) -> ApiResult<()> {
        let database_id = self.metadata_database()?;
        let Some((kind, id, _)) = self.metadata.target() else {
            return Ok(());
        };
        self.backend()
            .update_description(database_id, kind, id, text)
            .await?;
        self.metadata.apply_description(kind, id, text);
        self.metadata.editor = None;
        self.set_info("Description saved");
        Ok(())
    }

    pub async fn generate_description(&mut self) -> ApiResult<()> {
        let database_id = self.metadata_database()?;
        let Some((kind, id, _)) = self.metadata.target() else {
            return Ok(());
        };
        let text = self.backend().generate_description(database_id, kind, id).await?;
        self.metadata.pending_description = Some(PendingDescription { kind, id, text });
        Ok(())
    }

    pub async fn accept_generated_description(&mut self) -> ApiResult<()> {
        let database_id = self.metadata_database()?;
        let Some(pending) = self.metadata.pending_description.take() else {
            return Ok(());
        };
        let saved = self
            .backend()
            .update_description(database_id, pending.kind, pending.id, &pending.text)
            .await;
        if let Err(e) = saved {
            // let the user retry without regenerating
            self.metadata.pending_description = Some(pending);
            return Err(e);
        }
        self.metadata.apply_description(pending.kind, pending.id, &pending.text);
        self.set_info("Description saved");
        Ok(())
    }
}

fn hit_score(hit: &SearchHit) -> f64 {
    match hit {
        SearchHit::Table { score, .. } | SearchHit::Column { score, .. } => *score,
    }
}
