use tracing::info;

use crate::api::models::{Database, DatabasePayload};
use crate::app::{step, App, AppMode};
use crate::error::{ApiError, ApiResult};
use crate::store;

#[derive(Debug, Clone, Default)]
pub struct DatabaseList {
    pub items: Vec<Database>,
    pub selected: usize,
}

impl DatabaseList {
    pub fn up(&mut self) {
        self.selected = step(self.selected, self.items.len(), false);
    }

    pub fn down(&mut self) {
        self.selected = step(self.selected, self.items.len(), true);
    }

    pub fn current(&self) -> Option<&Database> {
        self.items.get(self.selected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Description,
    Host,
    Port,
    DatabaseName,
    Username,
    Password,
    Ssl,
}

impl FormField {
    pub const ALL: [FormField; 8] = [
        FormField::Name,
        FormField::Description,
        FormField::Host,
        FormField::Port,
        FormField::DatabaseName,
        FormField::Username,
        FormField::Password,
        FormField::Ssl,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Name => "Display name",
            FormField::Description => "Description",
            FormField::Host => "Host",
            FormField::Port => "Port",
            FormField::DatabaseName => "Database name",
            FormField::Username => "Username",
            FormField::Password => "Password",
            FormField::Ssl => "SSL",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

/// Create/edit form for a database connection. The password is only held
/// here; it is never read back from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseForm {
    pub field: FormField,
    /// Id of the database being edited; `None` creates a new one.
    pub editing: Option<i64>,
    pub name: String,
    pub description: String,
    pub host: String,
    pub port: String,
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub ssl_enabled: bool,
}

impl Default for DatabaseForm {
    fn default() -> Self {
        Self {
            field: FormField::Name,
            editing: None,
            name: String::new(),
            description: String::new(),
            host: "localhost".to_string(),
            port: "5432".to_string(),
            database_name: String::new(),
            username: String::new(),
            password: String::new(),
            ssl_enabled: false,
        }
    }
}

impl DatabaseForm {
    pub fn for_edit(database: &Database) -> Self {
        Self {
            field: FormField::Name,
            editing: Some(database.id),
            name: database.name.clone(),
            description: database.description.clone().unwrap_or_default(),
            host: database.host.clone(),
            port: database.port.to_string(),
            database_name: database.database_name.clone(),
            username: database.username.clone(),
            password: String::new(),
            ssl_enabled: database.ssl_enabled,
        }
    }

    pub fn next_field(&mut self) {
        let i = (self.field.index() + 1) % FormField::ALL.len();
        self.field = FormField::ALL[i];
    }

    pub fn prev_field(&mut self) {
        let len = FormField::ALL.len();
        let i = (self.field.index() + len - 1) % len;
        self.field = FormField::ALL[i];
    }

    fn field_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Name => Some(&mut self.name),
            FormField::Description => Some(&mut self.description),
            FormField::Host => Some(&mut self.host),
            FormField::Port => Some(&mut self.port),
            FormField::DatabaseName => Some(&mut self.database_name),
            FormField::Username => Some(&mut self.username),
            FormField::Password => Some(&mut self.password),
            FormField::Ssl => None,
        }
    }

    pub fn input_char(&mut self, c: char) {
        if self.field == FormField::Ssl {
            if c == ' ' {
                self.ssl_enabled = !self.ssl_enabled;
            }
            return;
        }
        if self.field == FormField::Port && !c.is_ascii_digit() {
            return;
        }
        if let Some(value) = self.field_mut() {
            value.push(c);
        }
    }

    pub fn delete_char(&mut self) {
        if let Some(value) = self.field_mut() {
            value.pop();
        }
    }

    pub fn value(&self, field: FormField) -> String {
        match field {
            FormField::Name => self.name.clone(),
            FormField::Description => self.description.clone(),
            FormField::Host => self.host.clone(),
            FormField::Port => self.port.clone(),
            FormField::DatabaseName => self.database_name.clone(),
            FormField::Username => self.username.clone(),
            FormField::Password => "*".repeat(self.password.chars().count()),
            FormField::Ssl => (if self.ssl_enabled { "[x]" } else { "[ ]" }).to_string(),
        }
    }

    /// Checks required fields in form order and builds the request body.
    /// Editing may leave the password empty to keep the stored one.
    pub fn validate(&self) -> Result<DatabasePayload, String> {
        let required = [
            (&self.name, "Display name is required"),
            (&self.host, "Host is required"),
            (&self.port, "Port is required"),
            (&self.database_name, "Database name is required"),
            (&self.username, "Username is required"),
        ];
        for (value, message) in required {
            if value.trim().is_empty() {
                return Err(message.to_string());
            }
        }
        let port: u16 = match self.port.trim().parse() {
            Ok(port) if port > 0 => port,
            _ => return Err("Port must be a number between 1 and 65535".to_string()),
        };
        if self.editing.is_none() && self.password.is_empty() {
            return Err("Password is required".to_string());
        }

        Ok(DatabasePayload {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            host: self.host.trim().to_string(),
            port,
            database_name: self.database_name.trim().to_string(),
            username: self.username.trim().to_string(),
            password: (!self.password.is_empty()).then(|| self.password.clone()),
            ssl_enabled: self.ssl_enabled,
        })
    }
}

impl App {
    pub async fn load_databases(&mut self) -> ApiResult<()> {
        let items = self.backend().list_databases().await?;
        let selected_id = self.selected_database().map(|d| d.id);
        self.databases.selected = selected_id
            .and_then(|id| items.iter().position(|d| d.id == id))
            .unwrap_or(0)
            .min(items.len().saturating_sub(1));
        self.databases.items = items;
        Ok(())
    }

    /// Remembers the highlighted database as the working database.
    pub fn select_database(&mut self) -> ApiResult<()> {
        let Some(database) = self.databases.current().cloned() else {
            return Ok(());
        };
        info!("Selected database {} ({})", database.name, database.id);
        let name = database.name.clone();
        store::lock(self.store())
            .select_database(Some(database))
            .map_err(|e| ApiError::Decode(format!("Could not save selection: {}", e)))?;
        self.sessions = Default::default();
        self.query = Default::default();
        self.metadata = Default::default();
        self.diagram = Default::default();
        self.set_info(format!("Using database {}", name));
        Ok(())
    }

    pub fn new_database(&mut self) {
        self.database_form = DatabaseForm::default();
        self.mode = AppMode::DatabaseForm;
    }

    pub fn edit_selected_database(&mut self) {
        if let Some(database) = self.databases.current() {
            self.database_form = DatabaseForm::for_edit(database);
            self.mode = AppMode::DatabaseForm;
        }
    }

    /// Validates and sends the form. The form keeps its contents on any
    /// failure; on success it is reset and the list is shown again.
    pub async fn submit_database_form(&mut self) -> ApiResult<()> {
        let payload = self.database_form.validate().map_err(ApiError::Validation)?;

        let saved = match self.database_form.editing {
            Some(id) => self.backend().update_database(id, &payload).await?,
            None => self.backend().create_database(&payload).await?,
        };
        info!("Saved database {} ({})", saved.name, saved.id);

        let is_selected = self.selected_database().is_some_and(|d| d.id == saved.id);
        if is_selected {
            store::lock(self.store())
                .select_database(Some(saved.clone()))
                .map_err(|e| ApiError::Decode(format!("Could not save selection: {}", e)))?;
        }

        match self.databases.items.iter_mut().find(|d| d.id == saved.id) {
            Some(existing) => *existing = saved,
            None => {
                self.databases.items.push(saved);
                self.databases.selected = self.databases.items.len() - 1;
            }
        }

        self.database_form = DatabaseForm::default();
        self.mode = AppMode::Databases;
        self.set_info("Database saved");
        Ok(())
    }

    pub async fn delete_database(&mut self) -> ApiResult<()> {
        let Some(id) = self.databases.current().map(|d| d.id) else {
            return Ok(());
        };
        self.backend().delete_database(id).await?;
        info!("Deleted database {}", id);

        self.databases.items.retain(|d| d.id != id);
        self.databases.selected = self
            .databases
            .selected
            .min(self.databases.items.len().saturating_sub(1));

        if self.selected_database().is_some_and(|d| d.id == id) {
            store::lock(self.store())
                .select_database(None)
                .map_err(|e| ApiError::Decode(format!("Could not save selection: {}", e)))?;
        }
        self.set_info("Database deleted");
        Ok(())
    }

    pub async fn test_connection(&mut self) -> ApiResult<()> {
        let Some(id) = self.databases.current().map(|d| d.id) else {
            return Ok(());
        };
        let outcome = self.backend().test_connection(id).await?;
        if outcome.success {
            self.set_info(outcome.message);
        } else {
            self.set_error(outcome.message);
        }
        self.load_databases().await
    }

    pub async fn extract_metadata(&mut self) -> ApiResult<()> {
        let Some(id) = self.databases.current().map(|d| d.id) else {
            return Ok(());
        };
        let outcome = self.backend().extract_metadata(id).await?;
        info!("Metadata extraction for {}: {}", id, outcome.message);
        if outcome.success {
            self.set_info(outcome.message);
        } else {
            self.set_error(outcome.message);
        }
        Ok(())
    }

    pub async fn update_embeddings(&mut self) -> ApiResult<()> {
        let Some(id) = self.databases.current().map(|d| d.id) else {
            return Ok(());
        };
        let outcome = self.backend().update_embeddings(id).await?;
        if outcome.success {
            self.set_info(outcome.message);
        } else {
            self.set_error(outcome.message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app_with;
    use crate::testing::{database, FailWith, FakeBackend};

    fn filled_form() -> DatabaseForm {
        DatabaseForm {
            name: "Shop".to_string(),
            host: "db.internal".to_string(),
            database_name: "shop".to_string(),
            username: "reader".to_string(),
            password: "pw".to_string(),
            ..DatabaseForm::default()
        }
    }

    #[test]
    fn validation_order() {
        let mut form = DatabaseForm {
            host: String::new(),
            ..DatabaseForm::default()
        };
        assert_eq!(form.validate().unwrap_err(), "Display name is required");
        form.name = "x".to_string();
        assert_eq!(form.validate().unwrap_err(), "Host is required");
        form.host = "h".to_string();
        assert_eq!(form.validate().unwrap_err(), "Database name is required");
        form.database_name = "d".to_string();
        assert_eq!(form.validate().unwrap_err(), "Username is required");
        form.username = "u".to_string();
        assert_eq!(form.validate().unwrap_err(), "Password is required");
        form.port = "70000".to_string();
        assert_eq!(
            form.validate().unwrap_err(),
            "Port must be a number between 1 and 65535"
        );
    }

    #[test]
    fn edit_form_may_omit_password() {
        let form = DatabaseForm::for_edit(&database(7, "shop"));
        let payload = form.validate().unwrap();
        assert_eq!(payload.password, None);
        assert_eq!(payload.port, 5432);
    }

    #[test]
    fn port_field_takes_digits_only() {
        let mut form = DatabaseForm {
            field: FormField::Port,
            port: String::new(),
            ..DatabaseForm::default()
        };
        for c in "54a32".chars() {
            form.input_char(c);
        }
        assert_eq!(form.port, "5432");
        form.field = FormField::Ssl;
        form.input_char(' ');
        assert!(form.ssl_enabled);
    }

    #[tokio::test]
    async fn failed_create_keeps_the_form() {
        let (mut app, backend) = app_with(FakeBackend::default());
        backend.fail("create_database", FailWith::Validation);
        app.mode = AppMode::DatabaseForm;
        app.database_form = filled_form();

        app.queue(crate::app::Action::SubmitDatabaseForm);
        app.run_pending().await;

        assert_eq!(app.mode, AppMode::DatabaseForm);
        assert_eq!(app.database_form, filled_form());
        assert_eq!(app.error_message.as_deref(), Some("Invalid input"));
    }

    #[tokio::test]
    async fn invalid_form_keeps_contents_without_calling_backend() {
        let (mut app, backend) = app_with(FakeBackend::default());
        app.mode = AppMode::DatabaseForm;
        let mut form = filled_form();
        form.username.clear();
        app.database_form = form.clone();

        app.queue(crate::app::Action::SubmitDatabaseForm);
        app.run_pending().await;

        assert_eq!(app.database_form, form);
        assert_eq!(backend.calls("create_database"), 0);
        assert_eq!(app.error_message.as_deref(), Some("Username is required"));
    }

    #[tokio::test]
    async fn successful_create_resets_form() {
        let (mut app, backend) = app_with(FakeBackend::default());
        app.mode = AppMode::DatabaseForm;
        app.database_form = filled_form();

        app.submit_database_form().await.unwrap();

        assert_eq!(app.mode, AppMode::Databases);
        assert_eq!(app.database_form, DatabaseForm::default());
        assert_eq!(backend.databases().len(), 1);
        assert_eq!(app.databases.current().map(|d| d.name.as_str()), Some("Shop"));
    }

    #[tokio::test]
    async fn editing_selected_database_refreshes_snapshot() {
        let (mut app, _backend) = app_with(FakeBackend::default().with_databases(vec![database(3, "old")]));
        app.load_databases().await.unwrap();
        app.select_database().unwrap();

        app.edit_selected_database();
        app.database_form.name = "renamed".to_string();
        app.submit_database_form().await.unwrap();

        assert_eq!(app.selected_database().map(|d| d.name), Some("renamed".to_string()));
    }

    #[tokio::test]
    async fn deleting_selected_database_clears_snapshot() {
        let (mut app, backend) =
            app_with(FakeBackend::default().with_databases(vec![database(1, "a"), database(2, "b")]));
        app.load_databases().await.unwrap();
        app.databases.selected = 1;
        app.select_database().unwrap();

        app.delete_database().await.unwrap();

        assert!(app.selected_database().is_none());
        assert_eq!(app.databases.items.len(), 1);
        assert_eq!(app.databases.selected, 0);
        assert_eq!(backend.databases().len(), 1);
    }

    #[tokio::test]
    async fn maintenance_actions_report_backend_message() {
        let (mut app, backend) = app_with(FakeBackend::default().with_databases(vec![database(1, "a")]));
        app.load_databases().await.unwrap();

        app.test_connection().await.unwrap();
        assert_eq!(app.info_message.as_deref(), Some("Connection successful"));
        app.extract_metadata().await.unwrap();
        assert_eq!(app.info_message.as_deref(), Some("Metadata extracted"));
        app.update_embeddings().await.unwrap();
        assert_eq!(app.info_message.as_deref(), Some("Embeddings updated"));
        assert_eq!(backend.calls("list_databases"), 2);
    }
}
