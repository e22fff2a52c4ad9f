//! HTTP implementation of [`Backend`] on top of `reqwest`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error};

use super::models::*;
use super::Backend;
use crate::error::{self, ApiError, ApiResult};
use crate::store::{self, SharedStore};

const DATABASES: &str = "/api/databases/databases";

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: SharedStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: SharedStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request carrying the access token currently in the store, read fresh
    /// on every call.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.anonymous(method, path);
        let token = store::lock(&self.store).access_token().map(str::to_string);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);
        self.http.request(method, url).header("Accept", "application/json")
    }

    async fn send_raw(&self, builder: RequestBuilder) -> ApiResult<(StatusCode, String)> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let (status, body) = self.send_raw(builder).await?;
        if !status.is_success() {
            error!("Request failed with HTTP {}: {}", status, body);
            return Err(ApiError::from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to decode response: {:?}\nraw body: {}", e, body);
            ApiError::Decode(e.to_string())
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> ApiResult<()> {
        let (status, body) = self.send_raw(builder).await?;
        if !status.is_success() {
            error!("Request failed with HTTP {}: {}", status, body);
            return Err(ApiError::from_response(status, &body));
        }
        Ok(())
    }
}

fn database_path(database_id: i64, action: &str) -> String {
    if action.is_empty() {
        format!("{}/{}/", DATABASES, database_id)
    } else {
        format!("{}/{}/{}/", DATABASES, database_id, action)
    }
}

/// Re-labels HTTP failures of the SQL endpoints so the UI can tell them apart.
fn sql_error(err: ApiError, generation: bool, body_type: Option<String>) -> ApiError {
    match err {
        ApiError::Validation(message) | ApiError::Server { message, .. } | ApiError::NotFound(message) => {
            if generation {
                ApiError::SqlGeneration {
                    error_type: body_type.unwrap_or_else(|| "generation_error".to_string()),
                    message,
                }
            } else {
                ApiError::SqlExecution {
                    error_type: body_type.unwrap_or_else(|| "execution_error".to_string()),
                    message,
                }
            }
        }
        other => other,
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let builder = self
            .anonymous(Method::POST, "/api/user/login/")
            .json(&json!({ "username": username, "password": password }));
        self.send(builder).await
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<()> {
        let builder = self
            .anonymous(Method::POST, "/api/user/register/")
            .json(&json!({ "username": username, "email": email, "password": password }));
        self.send_empty(builder).await
    }

    async fn refresh_access(&self, refresh: &str) -> ApiResult<String> {
        #[derive(serde::Deserialize)]
        struct Refreshed {
            access: String,
        }

        let builder = self
            .anonymous(Method::POST, "/api/token/refresh/")
            .json(&json!({ "refresh": refresh }));
        let refreshed: Refreshed = self.send(builder).await?;
        Ok(refreshed.access)
    }

    async fn me(&self) -> ApiResult<UserInfo> {
        self.send(self.request(Method::GET, "/api/user/me/")).await
    }

    async fn update_email(&self, email: &str) -> ApiResult<UserInfo> {
        let builder = self
            .request(Method::PATCH, "/api/user/me/")
            .json(&json!({ "email": email }));
        self.send(builder).await
    }

    async fn request_password_change(&self) -> ApiResult<Detail> {
        self.send(self.request(Method::POST, "/api/user/request-password-change/"))
            .await
    }

    async fn verify_otp(&self, otp: &str) -> ApiResult<OtpVerification> {
        let builder = self
            .request(Method::POST, "/api/user/verify-otp/")
            .json(&json!({ "otp": otp }));
        self.send(builder).await
    }

    async fn set_new_password(&self, new_password: &str) -> ApiResult<PasswordChanged> {
        let builder = self
            .request(Method::POST, "/api/user/set-new-password/")
            .json(&json!({ "new_password": new_password }));
        self.send(builder).await
    }

    async fn list_sessions(&self, database_id: Option<i64>) -> ApiResult<Vec<Session>> {
        let mut builder = self.request(Method::GET, "/api/sessions/");
        if let Some(id) = database_id {
            builder = builder.query(&[("database_id", id)]);
        }
        self.send(builder).await
    }

    async fn get_session(&self, session_id: i64) -> ApiResult<Session> {
        let path = format!("/api/sessions/{}/", session_id);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn create_session(&self, title: &str, database: &DatabaseRef) -> ApiResult<Session> {
        let builder = self
            .request(Method::POST, "/api/sessions/")
            .json(&json!({ "title": title, "database": database }));
        self.send(builder).await
    }

    async fn rename_session(&self, session_id: i64, title: &str) -> ApiResult<Session> {
        let path = format!("/api/sessions/{}/", session_id);
        let builder = self
            .request(Method::PATCH, &path)
            .json(&json!({ "title": title }));
        self.send(builder).await
    }

    async fn delete_session(&self, session_id: i64) -> ApiResult<()> {
        let path = format!("/api/sessions/{}/", session_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn add_query(&self, session_id: i64, query: &NewQuery) -> ApiResult<Query> {
        let path = format!("/api/sessions/{}/queries/", session_id);
        self.send(self.request(Method::POST, &path).json(query)).await
    }

    async fn update_query(&self, session_id: i64, query_id: i64, update: &QueryUpdate) -> ApiResult<Query> {
        let path = format!("/api/sessions/{}/queries/{}/", session_id, query_id);
        self.send(self.request(Method::PATCH, &path).json(update)).await
    }

    async fn delete_query(&self, session_id: i64, query_id: i64) -> ApiResult<()> {
        let path = format!("/api/sessions/{}/queries/{}/", session_id, query_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn list_databases(&self) -> ApiResult<Vec<Database>> {
        let path = format!("{}/", DATABASES);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn get_database(&self, database_id: i64) -> ApiResult<Database> {
        self.send(self.request(Method::GET, &database_path(database_id, "")))
            .await
    }

    async fn create_database(&self, payload: &DatabasePayload) -> ApiResult<Database> {
        let path = format!("{}/", DATABASES);
        self.send(self.request(Method::POST, &path).json(payload)).await
    }

    async fn update_database(&self, database_id: i64, payload: &DatabasePayload) -> ApiResult<Database> {
        let builder = self
            .request(Method::PATCH, &database_path(database_id, ""))
            .json(payload);
        self.send(builder).await
    }

    async fn delete_database(&self, database_id: i64) -> ApiResult<()> {
        self.send_empty(self.request(Method::DELETE, &database_path(database_id, "")))
            .await
    }

    async fn test_connection(&self, database_id: i64) -> ApiResult<ConnectionTest> {
        let path = database_path(database_id, "test_connection");
        self.send(self.request(Method::POST, &path)).await
    }

    async fn extract_metadata(&self, database_id: i64) -> ApiResult<MetadataExtraction> {
        let path = database_path(database_id, "extract_metadata");
        self.send(self.request(Method::POST, &path)).await
    }

    async fn update_embeddings(&self, database_id: i64) -> ApiResult<MetadataExtraction> {
        let path = database_path(database_id, "update_embeddings");
        self.send(self.request(Method::POST, &path)).await
    }

    async fn schema(&self, database_id: i64) -> ApiResult<Vec<TableMetadata>> {
        let path = database_path(database_id, "schema");
        self.send(self.request(Method::GET, &path)).await
    }

    async fn relationships(&self, database_id: i64) -> ApiResult<Vec<Relationship>> {
        let path = database_path(database_id, "relationships");
        self.send(self.request(Method::GET, &path)).await
    }

    async fn search_metadata(&self, database_id: i64, text: &str) -> ApiResult<Vec<SearchHit>> {
        let path = database_path(database_id, "search");
        let builder = self.request(Method::GET, &path).query(&[("q", text)]);
        self.send(builder).await
    }

    async fn update_description(
        &self,
        database_id: i64,
        kind: MetadataKind,
        id: i64,
        description: &str,
    ) -> ApiResult<()> {
        let path = database_path(database_id, "update_description");
        let builder = self
            .request(Method::POST, &path)
            .json(&json!({ "type": kind, "id": id, "description": description }));
        self.send_empty(builder).await
    }

    async fn generate_description(&self, database_id: i64, kind: MetadataKind, id: i64) -> ApiResult<String> {
        let path = database_path(database_id, "generate_description");
        let builder = self
            .request(Method::POST, &path)
            .json(&json!({ "type": kind, "id": id }));
        let generated: GeneratedDescription = self.send(builder).await?;
        if !generated.success {
            return Err(ApiError::Validation(
                generated
                    .message
                    .unwrap_or_else(|| "Description generation failed".to_string()),
            ));
        }
        Ok(generated.description)
    }

    async fn er_diagram(&self, database_id: i64) -> ApiResult<serde_json::Value> {
        let path = database_path(database_id, "er_diagram");
        self.send(self.request(Method::GET, &path)).await
    }

    async fn generate_sql(&self, prompt: &str, database_id: i64) -> ApiResult<SqlGeneration> {
        let builder = self
            .request(Method::POST, "/api/llm/generate-sql/")
            .json(&json!({ "query": prompt, "database_id": database_id }));
        let (status, body) = self.send_raw(builder).await?;
        if !status.is_success() {
            error!("SQL generation failed with HTTP {}: {}", status, body);
            let err = ApiError::from_response(status, &body);
            return Err(sql_error(err, true, error::error_type(&body)));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn execute_sql(&self, database_id: i64, sql: &str) -> ApiResult<QueryResult> {
        let path = database_path(database_id, "execute_query");
        let builder = self
            .request(Method::POST, &path)
            .json(&json!({ "query": sql }));
        let (status, body) = self.send_raw(builder).await?;
        if !status.is_success() {
            error!("SQL execution failed with HTTP {}: {}", status, body);
            let err = ApiError::from_response(status, &body);
            return Err(sql_error(err, false, error::error_type(&body)));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn token_usage(&self, days: Option<u32>, limit: Option<u32>) -> ApiResult<Vec<TokenUsage>> {
        let mut params = Vec::new();
        if let Some(days) = days {
            params.push(("days", days));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit));
        }
        let builder = self
            .request(Method::GET, "/api/user/token-usage/")
            .query(&params);
        let usage: TokenUsageResponse = self.send(builder).await?;
        if !usage.success {
            return Err(ApiError::Server {
                status: 200,
                message: usage
                    .error
                    .unwrap_or_else(|| "Token usage unavailable".to_string()),
            });
        }
        Ok(usage.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ClientStore;

    #[test]
    fn database_paths() {
        assert_eq!(database_path(7, ""), "/api/databases/databases/7/");
        assert_eq!(database_path(7, "er_diagram"), "/api/databases/databases/7/er_diagram/");
    }

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/", ClientStore::in_memory().shared());
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/api/sessions/"), "http://localhost:8000/api/sessions/");
    }

    #[test]
    fn bearer_token_is_read_per_request() {
        let store = ClientStore::in_memory().shared();
        let client = ApiClient::new("http://localhost:8000", store.clone());

        let req = client.request(Method::GET, "/api/user/me/").build().unwrap();
        assert!(req.headers().get("authorization").is_none());

        store::lock(&store).set_access_token("abc".into()).unwrap();
        let req = client.request(Method::GET, "/api/user/me/").build().unwrap();
        assert_eq!(req.headers().get("authorization").unwrap(), "Bearer abc");
    }

    #[test]
    fn sql_errors_keep_backend_error_type() {
        let err = sql_error(
            ApiError::Validation("No schema".into()),
            true,
            Some("missing_schema".into()),
        );
        assert_eq!(err.error_type(), Some("missing_schema"));

        let err = sql_error(ApiError::Unauthorized("expired".into()), false, None);
        assert!(err.is_auth());
    }
}
