mod client;
pub mod models;

pub use client::ApiClient;

use async_trait::async_trait;

use crate::error::ApiResult;
use models::*;

/// Everything the client asks of the REST backend.
#[async_trait]
pub trait Backend: Send + Sync {
    // Auth and profile
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse>;
    async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<()>;
    async fn refresh_access(&self, refresh: &str) -> ApiResult<String>;
    async fn me(&self) -> ApiResult<UserInfo>;
    async fn update_email(&self, email: &str) -> ApiResult<UserInfo>;
    async fn request_password_change(&self) -> ApiResult<Detail>;
    async fn verify_otp(&self, otp: &str) -> ApiResult<OtpVerification>;
    async fn set_new_password(&self, new_password: &str) -> ApiResult<PasswordChanged>;

    // Sessions and their queries
    async fn list_sessions(&self, database_id: Option<i64>) -> ApiResult<Vec<Session>>;
    async fn get_session(&self, session_id: i64) -> ApiResult<Session>;
    async fn create_session(&self, title: &str, database: &DatabaseRef) -> ApiResult<Session>;
    async fn rename_session(&self, session_id: i64, title: &str) -> ApiResult<Session>;
    async fn delete_session(&self, session_id: i64) -> ApiResult<()>;
    async fn add_query(&self, session_id: i64, query: &NewQuery) -> ApiResult<Query>;
    async fn update_query(&self, session_id: i64, query_id: i64, update: &QueryUpdate) -> ApiResult<Query>;
    async fn delete_query(&self, session_id: i64, query_id: i64) -> ApiResult<()>;

    // Database connections
    async fn list_databases(&self) -> ApiResult<Vec<Database>>;
    async fn get_database(&self, database_id: i64) -> ApiResult<Database>;
    async fn create_database(&self, payload: &DatabasePayload) -> ApiResult<Database>;
    async fn update_database(&self, database_id: i64, payload: &DatabasePayload) -> ApiResult<Database>;
    async fn delete_database(&self, database_id: i64) -> ApiResult<()>;
    async fn test_connection(&self, database_id: i64) -> ApiResult<ConnectionTest>;
    async fn extract_metadata(&self, database_id: i64) -> ApiResult<MetadataExtraction>;
    async fn update_embeddings(&self, database_id: i64) -> ApiResult<MetadataExtraction>;

    // Metadata
    async fn schema(&self, database_id: i64) -> ApiResult<Vec<TableMetadata>>;
    async fn relationships(&self, database_id: i64) -> ApiResult<Vec<Relationship>>;
    async fn search_metadata(&self, database_id: i64, text: &str) -> ApiResult<Vec<SearchHit>>;
    async fn update_description(
        &self,
        database_id: i64,
        kind: MetadataKind,
        id: i64,
        description: &str,
    ) -> ApiResult<()>;
    async fn generate_description(&self, database_id: i64, kind: MetadataKind, id: i64) -> ApiResult<String>;
    async fn er_diagram(&self, database_id: i64) -> ApiResult<serde_json::Value>;

    // NL to SQL
    async fn generate_sql(&self, prompt: &str, database_id: i64) -> ApiResult<SqlGeneration>;
    async fn execute_sql(&self, database_id: i64, sql: &str) -> ApiResult<QueryResult>;

    // Stats
    async fn token_usage(&self, days: Option<u32>, limit: Option<u32>) -> ApiResult<Vec<TokenUsage>>;
}
