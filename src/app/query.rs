use tracing::{info, warn};
use tui_textarea::TextArea;

use crate::api::models::{Database, NewQuery, Query, QueryResult, QueryUpdate, Session};
use crate::app::{step, App};
use crate::error::{ApiError, ApiResult};
use crate::markdown::{self, ParsedResults};

const SQL_GENERATION_ERROR: &str = "SQL_GENERATION_ERROR";
const SQL_EXECUTION_ERROR: &str = "SQL_EXECUTION_ERROR";

/// SQL waiting for the user to run or discard it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSql {
    pub prompt: String,
    pub sql: String,
    pub explanation: String,
}

/// Result table shown under the prompt, fresh from execution or re-parsed
/// from a stored response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShownResult {
    pub sql: String,
    pub success: bool,
    pub status: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub execution_time: Option<f64>,
}

impl ShownResult {
    fn from_execution(sql: &str, result: &QueryResult) -> Self {
        Self {
            sql: sql.to_string(),
            success: result.success,
            status: Some(result.status.clone()),
            columns: result.columns.clone(),
            rows: result
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|v| match v {
                            serde_json::Value::Null => None,
                            serde_json::Value::String(s) => Some(s.clone()),
                            other => Some(other.to_string()),
                        })
                        .collect()
                })
                .collect(),
            execution_time: result.execution_time,
        }
    }

    fn from_parsed(sql: String, parsed: ParsedResults) -> Self {
        Self {
            sql,
            success: parsed.success,
            status: parsed.status,
            columns: parsed.columns,
            rows: parsed.rows,
            execution_time: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryView {
    pub session: Option<Session>,
    pub database: Option<Database>,
    pub prompt: TextArea<'static>,
    pub generated: Option<GeneratedSql>,
    /// Stored query created at generation time, updated once the SQL runs.
    pub pending_query: Option<i64>,
    pub result: Option<ShownResult>,
    pub history_selected: usize,
    pub history_focus: bool,
    pub pretty_sql: bool,
}

impl QueryView {
    pub fn prompt_text(&self) -> String {
        self.prompt.lines().join("\n")
    }

    pub fn set_prompt(&mut self, text: &str) {
        self.prompt = TextArea::from(text.lines().map(str::to_string).collect::<Vec<_>>());
    }

    pub fn clear_prompt(&mut self) {
        self.prompt = TextArea::default();
    }

    pub fn queries(&self) -> &[Query] {
        self.session.as_ref().map(|s| s.queries.as_slice()).unwrap_or(&[])
    }

    pub fn history_up(&mut self) {
        self.history_selected = step(self.history_selected, self.queries().len(), false);
    }

    pub fn history_down(&mut self) {
        self.history_selected = step(self.history_selected, self.queries().len(), true);
    }

    /// Re-parses the highlighted query's stored response into the result
    /// panel. Stored `generated_sql` wins over SQL found in the markdown.
    pub fn show_history(&mut self) {
        let Some(query) = self.queries().get(self.history_selected) else {
            return;
        };
        let parsed = markdown::parse_results(&query.response);
        let sql = query
            .generated_sql
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(parsed.sql);

        self.result = Some(match parsed.results {
            Some(results) => ShownResult::from_parsed(sql, results),
            None => ShownResult {
                sql,
                success: query.success,
                status: query.error.clone(),
                ..Default::default()
            },
        });
    }

    /// Drops the generated SQL without running it.
    pub fn discard(&mut self) {
        self.generated = None;
    }
}

impl App {
    /// Reloads the active session and the database it belongs to.
    pub async fn reload_session(&mut self) -> ApiResult<()> {
        let Some(id) = self.sessions.active else {
            return Err(ApiError::Validation("Open a session first".to_string()));
        };
        let session = self.backend().get_session(id).await?;

        let cached = self.query.database.as_ref().map(|d| d.id);
        if session.database_id.is_some() && session.database_id != cached {
            self.query.database = match session.database_id {
                Some(db_id) => match self.backend().get_database(db_id).await {
                    Ok(database) => Some(database),
                    Err(e) if e.is_auth() => return Err(e),
                    Err(e) => {
                        warn!("Could not load database {} for session {}: {}", db_id, id, e);
                        None
                    }
                },
                None => None,
            };
        }

        let count = session.queries.len();
        self.query.session = Some(session);
        self.query.history_selected = self.query.history_selected.min(count.saturating_sub(1));
        Ok(())
    }

    /// Generates SQL for the prompt and stores it as a new query so the
    /// attempt shows up in history even if it is never executed.
    pub async fn submit_prompt(&mut self) -> ApiResult<()> {
        let prompt = self.query.prompt_text().trim().to_string();
        if prompt.is_empty() {
            return Ok(());
        }
        let Some(session_id) = self.query.session.as_ref().map(|s| s.id) else {
            return Err(ApiError::Validation("Open a session first".to_string()));
        };

        let session = self.backend().get_session(session_id).await?;
        let Some(database_id) = session.database_id else {
            return Err(ApiError::Validation(
                "No database associated with this session".to_string(),
            ));
        };

        match self.backend().generate_sql(&prompt, database_id).await {
            Ok(generation) => {
                let sql = markdown::clean_sql(&generation.sql_query);
                let response = markdown::generated_response(&sql, &generation.explanation);
                let stored = self
                    .backend()
                    .add_query(
                        session_id,
                        &NewQuery {
                            prompt: prompt.clone(),
                            response,
                            success: true,
                            error_type: None,
                            error: None,
                            generated_sql: Some(sql.clone()),
                            explanation: Some(generation.explanation.clone()),
                        },
                    )
                    .await?;
                info!("Generated SQL for query {}", stored.id);

                self.query.pending_query = Some(stored.id);
                self.query.generated = Some(GeneratedSql {
                    prompt,
                    sql,
                    explanation: generation.explanation,
                });
                self.query.result = None;
                self.query.clear_prompt();
                self.reload_session().await
            }
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                let message = format!("Error: {}", e.detail());
                warn!("SQL generation failed: {}", e);
                self.backend()
                    .add_query(
                        session_id,
                        &NewQuery {
                            prompt,
                            response: message.clone(),
                            success: false,
                            error_type: Some(SQL_GENERATION_ERROR.to_string()),
                            error: Some(message.clone()),
                            generated_sql: None,
                            explanation: None,
                        },
                    )
                    .await?;
                self.query.clear_prompt();
                self.reload_session().await?;
                self.set_error(message);
                Ok(())
            }
        }
    }

    /// Runs the generated SQL and records the outcome on the pending query,
    /// or on a new query when there is none.
    pub async fn execute_generated(&mut self) -> ApiResult<()> {
        let Some(generated) = self.query.generated.clone() else {
            return Ok(());
        };
        let Some(session_id) = self.query.session.as_ref().map(|s| s.id) else {
            return Ok(());
        };
        let session = self.backend().get_session(session_id).await?;
        let Some(database_id) = session.database_id else {
            return Err(ApiError::Validation(
                "No database associated with this session".to_string(),
            ));
        };

        let sql = generated.sql.as_str();
        let (response, success, error, shown) = match self.backend().execute_sql(database_id, sql).await {
            Ok(result) => {
                info!("Executed query: {}", result.status);
                let error = (!result.success).then(|| result.status.clone());
                (
                    markdown::executed_response(sql, &result),
                    result.success,
                    error,
                    ShownResult::from_execution(sql, &result),
                )
            }
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!("SQL execution failed: {}", e);
                let detail = e.detail();
                let shown = ShownResult {
                    sql: sql.to_string(),
                    success: false,
                    status: Some(detail.clone()),
                    ..Default::default()
                };
                (markdown::failed_response(sql, &detail), false, Some(detail), shown)
            }
        };
        let error_type = (!success).then(|| SQL_EXECUTION_ERROR.to_string());

        // The pending id is dropped only once the update lands, so a retry
        // after a failed update does not store the query twice.
        match self.query.pending_query {
            Some(query_id) => {
                self.backend()
                    .update_query(
                        session_id,
                        query_id,
                        &QueryUpdate {
                            response: Some(response),
                            success: Some(success),
                            error_type: Some(error_type),
                            error: Some(error.clone()),
                            generated_sql: Some(sql.to_string()),
                        },
                    )
                    .await?;
                self.query.pending_query = None;
            }
            None => {
                self.backend()
                    .add_query(
                        session_id,
                        &NewQuery {
                            prompt: generated.prompt.clone(),
                            response,
                            success,
                            error_type,
                            error: error.clone(),
                            generated_sql: Some(sql.to_string()),
                            explanation: Some(generated.explanation.clone()),
                        },
                    )
                    .await?;
            }
        }

        self.query.generated = None;
        self.query.result = Some(shown);
        match error {
            Some(error) => self.set_error(format!("Query failed: {}", error)),
            None => self.clear_error(),
        }
        self.reload_session().await
    }

    pub async fn delete_selected_query(&mut self) -> ApiResult<()> {
        let Some(session_id) = self.query.session.as_ref().map(|s| s.id) else {
            return Ok(());
        };
        let Some(query_id) = self.query.queries().get(self.query.history_selected).map(|q| q.id) else {
            return Ok(());
        };
        self.backend().delete_query(session_id, query_id).await?;
        if self.query.pending_query == Some(query_id) {
            self.query.pending_query = None;
            self.query.generated = None;
        }
        self.reload_session().await
    }
}
