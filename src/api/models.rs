use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

/// A database connection as the backend reports it. The password is write-only
/// and never comes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_database_type")]
    pub database_type: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_metadata_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub connection_status: ConnectionStatus,
}

fn default_database_type() -> String {
    "postgresql".to_string()
}

/// Create/update payload for a database connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabasePayload {
    pub name: String,
    pub description: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub ssl_enabled: bool,
}

/// Reference to the database a session is created against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseRef {
    pub id: i64,
    pub name: String,
}

impl From<&Database> for DatabaseRef {
    fn from(db: &Database) -> Self {
        Self {
            id: db.id,
            name: db.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetadataExtraction {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub changes: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub database_id: Option<i64>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub query_count: usize,
    // Only present on the detail endpoint
    #[serde(default)]
    pub queries: Vec<Query>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Query {
    pub id: i64,
    pub prompt: String,
    #[serde(default)]
    pub response: String,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub generated_sql: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Body for appending a query to a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewQuery {
    pub prompt: String,
    pub response: String,
    pub success: bool,
    pub error_type: Option<String>,
    pub error: Option<String>,
    pub generated_sql: Option<String>,
    pub explanation: Option<String>,
}

/// Partial update of a stored query. `None` fields are left untouched; the
/// double option lets a caller clear a field explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_sql: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SqlGeneration {
    #[serde(default)]
    pub sql_query: String,
    #[serde(default)]
    pub explanation: String,
}

/// Result of running SQL on the backend. Rows carry raw JSON cells.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub error_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnMetadata {
    pub id: i64,
    pub name: String,
    pub data_type: String,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableMetadata {
    pub id: i64,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    pub table_name: String,
    #[serde(default)]
    pub table_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

fn default_schema() -> String {
    "public".to_string()
}

impl TableMetadata {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub from_schema: String,
    pub from_table: String,
    pub from_column: String,
    pub to_schema: String,
    pub to_table: String,
    pub to_column: String,
    pub relationship_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchHit {
    Table {
        id: i64,
        name: String,
        schema: String,
        #[serde(default)]
        description: Option<String>,
        score: f64,
    },
    Column {
        id: i64,
        name: String,
        table_name: String,
        schema: String,
        data_type: String,
        #[serde(default)]
        description: Option<String>,
        score: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataKind {
    Table,
    Column,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedDescription {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl LoginResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access: self.access.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detail {
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OtpVerification {
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PasswordChanged {
    #[serde(default)]
    pub detail: String,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenUsage {
    pub id: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    #[serde(default)]
    pub model: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub query_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenUsageResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<TokenUsage>,
    #[serde(default)]
    pub error: Option<String>,
}
