//! In-process stand-in for the REST backend used by the unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::api::models::*;
use crate::api::Backend;
use crate::auth::jwt::encode_for_test;
use crate::error::{ApiError, ApiResult};

const FAR_FUTURE: i64 = 4_000_000_000;

pub fn valid_token() -> String {
    encode_for_test(&json!({ "exp": FAR_FUTURE, "user_id": 1, "username": "ana" }))
}

pub fn refreshed_token() -> String {
    encode_for_test(&json!({ "exp": FAR_FUTURE, "user_id": 1, "jti": "refreshed" }))
}

pub fn expired_token() -> String {
    encode_for_test(&json!({ "exp": 1_000, "user_id": 1 }))
}

#[derive(Debug, Clone, Copy)]
pub enum FailWith {
    Network,
    Unauthorized,
    Validation,
    Server,
}

impl FailWith {
    fn error(self) -> ApiError {
        match self {
            FailWith::Network => ApiError::Network("connection refused".to_string()),
            FailWith::Unauthorized => ApiError::Unauthorized("Token is invalid or expired".to_string()),
            FailWith::Validation => ApiError::Validation("Invalid input".to_string()),
            FailWith::Server => ApiError::Server {
                status: 500,
                message: "boom".to_string(),
            },
        }
    }
}

#[derive(Default)]
struct Inner {
    calls: Vec<&'static str>,
    failures: HashMap<&'static str, FailWith>,
    next_id: i64,
    databases: Vec<Database>,
    sessions: Vec<Session>,
    generation: Option<SqlGeneration>,
    execution: Option<QueryResult>,
    schema: Vec<TableMetadata>,
    relationships: Vec<Relationship>,
    diagram: Value,
    usage: Vec<TokenUsage>,
    query_updates: Vec<(i64, i64, QueryUpdate)>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn session_mut(&mut self, session_id: i64) -> ApiResult<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| ApiError::NotFound(format!("session {}", session_id)))
    }
}

#[derive(Default)]
pub struct FakeBackend {
    inner: Mutex<Inner>,
}

pub fn database(id: i64, name: &str) -> Database {
    Database {
        id,
        name: name.to_string(),
        description: None,
        database_type: "postgresql".to_string(),
        host: "db.local".to_string(),
        port: 5432,
        database_name: name.to_string(),
        username: "app".to_string(),
        ssl_enabled: false,
        created_at: None,
        updated_at: None,
        last_metadata_update: None,
        connection_status: ConnectionStatus::Disconnected,
    }
}

pub fn session(id: i64, title: &str, database_id: i64) -> Session {
    Session {
        id,
        title: title.to_string(),
        database_id: Some(database_id),
        database_name: None,
        created_at: None,
        updated_at: None,
        query_count: 0,
        queries: Vec::new(),
    }
}

pub fn query(id: i64, prompt: &str, response: &str) -> Query {
    Query {
        id,
        prompt: prompt.to_string(),
        response: response.to_string(),
        success: true,
        error_type: None,
        error: None,
        generated_sql: None,
        explanation: None,
        created_at: None,
    }
}

impl FakeBackend {
    fn enter(&self, name: &'static str) -> ApiResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls.push(name);
        let failure = inner.failures.get(name).copied();
        match failure {
            Some(fail) => Err(fail.error()),
            None => Ok(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn calls(&self, name: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == name).count()
    }

    pub fn fail(&self, name: &'static str, with: FailWith) {
        self.lock().failures.insert(name, with);
    }

    pub fn recover(&self, name: &'static str) {
        self.lock().failures.remove(name);
    }

    pub fn with_databases(self, databases: Vec<Database>) -> Self {
        self.lock().databases = databases;
        self
    }

    pub fn with_sessions(self, sessions: Vec<Session>) -> Self {
        self.lock().sessions = sessions;
        self
    }

    pub fn with_schema(self, schema: Vec<TableMetadata>) -> Self {
        self.lock().schema = schema;
        self
    }

    pub fn with_relationships(self, relationships: Vec<Relationship>) -> Self {
        self.lock().relationships = relationships;
        self
    }

    pub fn with_diagram(self, diagram: Value) -> Self {
        self.lock().diagram = diagram;
        self
    }

    pub fn with_usage(self, usage: Vec<TokenUsage>) -> Self {
        self.lock().usage = usage;
        self
    }

    pub fn set_generation(&self, sql: &str, explanation: &str) {
        self.lock().generation = Some(SqlGeneration {
            sql_query: sql.to_string(),
            explanation: explanation.to_string(),
        });
    }

    pub fn set_execution(&self, result: QueryResult) {
        self.lock().execution = Some(result);
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.lock().sessions.clone()
    }

    pub fn databases(&self) -> Vec<Database> {
        self.lock().databases.clone()
    }

    pub fn schema_snapshot(&self) -> Vec<TableMetadata> {
        self.lock().schema.clone()
    }

    pub fn query_updates(&self) -> Vec<(i64, i64, QueryUpdate)> {
        self.lock().query_updates.clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let _inner = self.enter("login")?;
        if password != "secret" {
            return Err(ApiError::Unauthorized("Invalid credentials.".to_string()));
        }
        Ok(LoginResponse {
            access: valid_token(),
            refresh: "refresh-token".to_string(),
            username: Some(username.to_string()),
            email: None,
        })
    }

    async fn register(&self, _username: &str, _email: &str, _password: &str) -> ApiResult<()> {
        self.enter("register").map(|_| ())
    }

    async fn refresh_access(&self, _refresh: &str) -> ApiResult<String> {
        let _inner = self.enter("refresh_access")?;
        Ok(refreshed_token())
    }

    async fn me(&self) -> ApiResult<UserInfo> {
        let _inner = self.enter("me")?;
        Ok(UserInfo {
            id: 1,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        })
    }

    async fn update_email(&self, email: &str) -> ApiResult<UserInfo> {
        let _inner = self.enter("update_email")?;
        Ok(UserInfo {
            id: 1,
            username: "ana".to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        })
    }

    async fn request_password_change(&self) -> ApiResult<Detail> {
        let _inner = self.enter("request_password_change")?;
        Ok(Detail {
            detail: "OTP sent to your email.".to_string(),
        })
    }

    async fn verify_otp(&self, otp: &str) -> ApiResult<OtpVerification> {
        let _inner = self.enter("verify_otp")?;
        if otp != "123456" {
            return Err(ApiError::Validation("Invalid OTP. Please try again.".to_string()));
        }
        Ok(OtpVerification {
            detail: "OTP verified successfully.".to_string(),
            token: Some("reset".to_string()),
        })
    }

    async fn set_new_password(&self, _new_password: &str) -> ApiResult<PasswordChanged> {
        let _inner = self.enter("set_new_password")?;
        Ok(PasswordChanged {
            detail: "Password changed successfully.".to_string(),
            access: refreshed_token(),
            refresh: "new-refresh".to_string(),
        })
    }

    async fn list_sessions(&self, database_id: Option<i64>) -> ApiResult<Vec<Session>> {
        let inner = self.enter("list_sessions")?;
        Ok(inner
            .sessions
            .iter()
            .filter(|s| database_id.is_none() || s.database_id == database_id)
            .map(|s| Session {
                queries: Vec::new(),
                query_count: s.queries.len(),
                ..s.clone()
            })
            .collect())
    }

    async fn get_session(&self, session_id: i64) -> ApiResult<Session> {
        let mut inner = self.enter("get_session")?;
        let found = inner.session_mut(session_id)?.clone();
        Ok(found)
    }

    async fn create_session(&self, title: &str, database: &DatabaseRef) -> ApiResult<Session> {
        let mut inner = self.enter("create_session")?;
        let id = inner.next_id();
        let mut created = session(id, title, database.id);
        created.database_name = Some(database.name.clone());
        inner.sessions.insert(0, created.clone());
        Ok(created)
    }

    async fn rename_session(&self, session_id: i64, title: &str) -> ApiResult<Session> {
        let mut inner = self.enter("rename_session")?;
        let session = inner.session_mut(session_id)?;
        session.title = title.to_string();
        Ok(session.clone())
    }

    async fn delete_session(&self, session_id: i64) -> ApiResult<()> {
        let mut inner = self.enter("delete_session")?;
        inner.session_mut(session_id)?;
        inner.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn add_query(&self, session_id: i64, new: &NewQuery) -> ApiResult<Query> {
        let mut inner = self.enter("add_query")?;
        let id = inner.next_id();
        let stored = Query {
            id,
            prompt: new.prompt.clone(),
            response: new.response.clone(),
            success: new.success,
            error_type: new.error_type.clone(),
            error: new.error.clone(),
            generated_sql: new.generated_sql.clone(),
            explanation: new.explanation.clone(),
            created_at: Some(chrono::Utc::now()),
        };
        let session = inner.session_mut(session_id)?;
        session.queries.push(stored.clone());
        session.query_count = session.queries.len();
        Ok(stored)
    }

    async fn update_query(&self, session_id: i64, query_id: i64, update: &QueryUpdate) -> ApiResult<Query> {
        let mut inner = self.enter("update_query")?;
        inner.query_updates.push((session_id, query_id, update.clone()));
        let session = inner.session_mut(session_id)?;
        let stored = session
            .queries
            .iter_mut()
            .find(|q| q.id == query_id)
            .ok_or_else(|| ApiError::NotFound(format!("query {}", query_id)))?;
        if let Some(response) = &update.response {
            stored.response = response.clone();
        }
        if let Some(success) = update.success {
            stored.success = success;
        }
        if let Some(error_type) = &update.error_type {
            stored.error_type = error_type.clone();
        }
        if let Some(error) = &update.error {
            stored.error = error.clone();
        }
        if let Some(sql) = &update.generated_sql {
            stored.generated_sql = Some(sql.clone());
        }
        Ok(stored.clone())
    }

    async fn delete_query(&self, session_id: i64, query_id: i64) -> ApiResult<()> {
        let mut inner = self.enter("delete_query")?;
        let session = inner.session_mut(session_id)?;
        session.queries.retain(|q| q.id != query_id);
        session.query_count = session.queries.len();
        Ok(())
    }

    async fn list_databases(&self) -> ApiResult<Vec<Database>> {
        let inner = self.enter("list_databases")?;
        Ok(inner.databases.clone())
    }

    async fn get_database(&self, database_id: i64) -> ApiResult<Database> {
        let inner = self.enter("get_database")?;
        inner
            .databases
            .iter()
            .find(|d| d.id == database_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("database {}", database_id)))
    }

    async fn create_database(&self, payload: &DatabasePayload) -> ApiResult<Database> {
        let mut inner = self.enter("create_database")?;
        let id = inner.next_id();
        let mut created = database(id, &payload.name);
        created.host = payload.host.clone();
        created.port = payload.port;
        created.database_name = payload.database_name.clone();
        created.username = payload.username.clone();
        inner.databases.push(created.clone());
        Ok(created)
    }

    async fn update_database(&self, database_id: i64, payload: &DatabasePayload) -> ApiResult<Database> {
        let mut inner = self.enter("update_database")?;
        let db = inner
            .databases
            .iter_mut()
            .find(|d| d.id == database_id)
            .ok_or_else(|| ApiError::NotFound(format!("database {}", database_id)))?;
        db.name = payload.name.clone();
        db.host = payload.host.clone();
        db.port = payload.port;
        db.database_name = payload.database_name.clone();
        db.username = payload.username.clone();
        Ok(db.clone())
    }

    async fn delete_database(&self, database_id: i64) -> ApiResult<()> {
        let mut inner = self.enter("delete_database")?;
        inner.databases.retain(|d| d.id != database_id);
        Ok(())
    }

    async fn test_connection(&self, _database_id: i64) -> ApiResult<ConnectionTest> {
        let _inner = self.enter("test_connection")?;
        Ok(ConnectionTest {
            success: true,
            message: "Connection successful".to_string(),
        })
    }

    async fn extract_metadata(&self, _database_id: i64) -> ApiResult<MetadataExtraction> {
        let _inner = self.enter("extract_metadata")?;
        Ok(MetadataExtraction {
            success: true,
            message: "Metadata extracted".to_string(),
            changes: Value::Null,
        })
    }

    async fn update_embeddings(&self, _database_id: i64) -> ApiResult<MetadataExtraction> {
        let _inner = self.enter("update_embeddings")?;
        Ok(MetadataExtraction {
            success: true,
            message: "Embeddings updated".to_string(),
            changes: Value::Null,
        })
    }

    async fn schema(&self, _database_id: i64) -> ApiResult<Vec<TableMetadata>> {
        let inner = self.enter("schema")?;
        Ok(inner.schema.clone())
    }

    async fn relationships(&self, _database_id: i64) -> ApiResult<Vec<Relationship>> {
        let inner = self.enter("relationships")?;
        Ok(inner.relationships.clone())
    }

    async fn search_metadata(&self, _database_id: i64, text: &str) -> ApiResult<Vec<SearchHit>> {
        let inner = self.enter("search_metadata")?;
        let needle = text.to_lowercase();
        Ok(inner
            .schema
            .iter()
            .filter(|t| t.table_name.to_lowercase().contains(&needle))
            .map(|t| SearchHit::Table {
                id: t.id,
                name: t.table_name.clone(),
                schema: t.schema_name.clone(),
                description: t.description.clone(),
                score: 5.0,
            })
            .collect())
    }

    async fn update_description(
        &self,
        _database_id: i64,
        kind: MetadataKind,
        id: i64,
        description: &str,
    ) -> ApiResult<()> {
        let mut inner = self.enter("update_description")?;
        for table in inner.schema.iter_mut() {
            match kind {
                MetadataKind::Table if table.id == id => {
                    table.description = Some(description.to_string());
                }
                MetadataKind::Column => {
                    for column in table.columns.iter_mut().filter(|c| c.id == id) {
                        column.description = Some(description.to_string());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn generate_description(&self, _database_id: i64, kind: MetadataKind, id: i64) -> ApiResult<String> {
        let _inner = self.enter("generate_description")?;
        Ok(format!("Generated description for {:?} {}", kind, id))
    }

    async fn er_diagram(&self, _database_id: i64) -> ApiResult<Value> {
        let inner = self.enter("er_diagram")?;
        Ok(inner.diagram.clone())
    }

    async fn generate_sql(&self, _prompt: &str, _database_id: i64) -> ApiResult<SqlGeneration> {
        let inner = self.enter("generate_sql")?;
        Ok(inner.generation.clone().unwrap_or(SqlGeneration {
            sql_query: "SELECT 1".to_string(),
            explanation: String::new(),
        }))
    }

    async fn execute_sql(&self, _database_id: i64, _sql: &str) -> ApiResult<QueryResult> {
        let inner = self.enter("execute_sql")?;
        Ok(inner.execution.clone().unwrap_or_default())
    }

    async fn token_usage(&self, _days: Option<u32>, _limit: Option<u32>) -> ApiResult<Vec<TokenUsage>> {
        let inner = self.enter("token_usage")?;
        Ok(inner.usage.clone())
    }
}
