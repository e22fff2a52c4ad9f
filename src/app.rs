use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::models::Database;
use crate::api::Backend;
use crate::auth::{self, Authorization};
use crate::error::{ApiError, ApiResult};
use crate::store::{self, SharedStore};

mod dashboard;
mod databases;
mod diagram;
mod login;
mod metadata;
mod profile;
mod query;
mod sessions;

pub use databases::{DatabaseForm, DatabaseList, FormField};
pub use diagram::DiagramView;
pub use login::{LoginField, LoginForm};
pub use metadata::{MetadataItem, MetadataView, PendingDescription};
pub use profile::{PasswordStep, ProfileView};
pub use query::{QueryView, ShownResult};
pub use sessions::SessionList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Login,
    Register,
    Databases,
    DatabaseForm,
    Sessions,
    Query,
    Schema,
    Relationships,
    ErDiagram,
    Dashboard,
    Profile,
}

impl AppMode {
    /// Screens that need a signed-in user.
    pub fn is_protected(self) -> bool {
        !matches!(self, AppMode::Login | AppMode::Register)
    }

    /// Screens that only make sense for the selected database.
    pub fn needs_database(self) -> bool {
        matches!(
            self,
            AppMode::Schema | AppMode::Relationships | AppMode::ErDiagram
        )
    }

    pub fn title(self) -> &'static str {
        match self {
            AppMode::Login => "LOGIN",
            AppMode::Register => "REGISTER",
            AppMode::Databases => "DATABASES",
            AppMode::DatabaseForm => "DATABASE FORM",
            AppMode::Sessions => "SESSIONS",
            AppMode::Query => "QUERY",
            AppMode::Schema => "SCHEMA",
            AppMode::Relationships => "RELATIONSHIPS",
            AppMode::ErDiagram => "ER DIAGRAM",
            AppMode::Dashboard => "DASHBOARD",
            AppMode::Profile => "PROFILE",
        }
    }
}

/// Work that talks to the backend. Key handlers queue one, the event loop
/// draws a frame with the loading indicator and then runs it.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(AppMode),
    Login,
    Register,
    Logout,
    SelectDatabase,
    SubmitDatabaseForm,
    EditDatabase,
    DeleteDatabase,
    TestConnection,
    ExtractMetadata,
    UpdateEmbeddings,
    OpenSession,
    CreateSession(String),
    RenameSession(String),
    DeleteSession,
    SubmitPrompt,
    ExecuteSql,
    DeleteQuery,
    Search(String),
    SaveDescription(String),
    GenerateDescription,
    AcceptGeneratedDescription,
    UpdateEmail(String),
    RequestPasswordChange,
    VerifyOtp(String),
    SetNewPassword(String),
}

impl Action {
    /// Destructive actions ask for a y/n confirmation first.
    pub fn needs_confirmation(&self) -> bool {
        matches!(
            self,
            Action::DeleteDatabase | Action::DeleteSession | Action::DeleteQuery | Action::Logout
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Action::DeleteDatabase => "Delete this database connection?",
            Action::DeleteSession => "Delete this session and all its queries?",
            Action::DeleteQuery => "Delete this query?",
            Action::Logout => "Sign out?",
            _ => "Continue?",
        }
    }
}

/// What a one-line input box is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePurpose {
    NewSession,
    RenameSession,
    Search,
    Email,
    Otp,
    NewPassword,
}

impl LinePurpose {
    pub fn label(self) -> &'static str {
        match self {
            LinePurpose::NewSession => "New session title",
            LinePurpose::RenameSession => "Rename session",
            LinePurpose::Search => "Search metadata",
            LinePurpose::Email => "New email",
            LinePurpose::Otp => "One-time code from your email",
            LinePurpose::NewPassword => "New password",
        }
    }

    pub fn is_secret(self) -> bool {
        matches!(self, LinePurpose::NewPassword)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineEdit {
    pub purpose: LinePurpose,
    pub value: String,
}

impl LineEdit {
    pub fn new(purpose: LinePurpose, value: impl Into<String>) -> Self {
        Self {
            purpose,
            value: value.into(),
        }
    }

    /// The action to queue when the input is confirmed, if the value is usable.
    pub fn into_action(self) -> Option<Action> {
        let value = self.value.trim().to_string();
        if value.is_empty() && self.purpose != LinePurpose::NewSession {
            return None;
        }
        Some(match self.purpose {
            LinePurpose::NewSession => Action::CreateSession(value),
            LinePurpose::RenameSession => Action::RenameSession(value),
            LinePurpose::Search => Action::Search(value),
            LinePurpose::Email => Action::UpdateEmail(value),
            LinePurpose::Otp => Action::VerifyOtp(value),
            LinePurpose::NewPassword => Action::SetNewPassword(self.value),
        })
    }
}

pub struct App {
    pub mode: AppMode,
    backend: Arc<dyn Backend>,
    store: SharedStore,

    pub pending: Option<Action>,
    pub confirm: Option<Action>,
    pub line_edit: Option<LineEdit>,
    pub loading: bool,

    pub login: LoginForm,
    pub databases: DatabaseList,
    pub database_form: DatabaseForm,
    pub sessions: SessionList,
    pub query: QueryView,
    pub metadata: MetadataView,
    pub diagram: DiagramView,
    pub dashboard: Option<crate::stats::DashboardStats>,
    pub profile: ProfileView,

    // UI state
    pub error_message: Option<String>,
    pub info_message: Option<String>,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, store: SharedStore) -> Self {
        Self {
            mode: AppMode::Login,
            backend,
            store,
            pending: None,
            confirm: None,
            line_edit: None,
            loading: false,
            login: LoginForm::default(),
            databases: DatabaseList::default(),
            database_form: DatabaseForm::default(),
            sessions: SessionList::default(),
            query: QueryView::default(),
            metadata: MetadataView::default(),
            diagram: DiagramView::default(),
            dashboard: None,
            profile: ProfileView::default(),
            error_message: None,
            info_message: None,
        }
    }

    pub fn set_error(&mut self, msg: String) {
        self.info_message = None;
        self.error_message = Some(msg);
    }

    pub fn set_info(&mut self, msg: impl Into<String>) {
        self.error_message = None;
        self.info_message = Some(msg.into());
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
        self.info_message = None;
    }

    pub fn selected_database(&self) -> Option<Database> {
        store::lock(&self.store).selected_database().cloned()
    }

    pub fn is_signed_in(&self) -> bool {
        store::lock(&self.store).access_token().is_some()
    }

    /// Queues `action`, routing destructive ones through the confirmation prompt.
    pub fn queue(&mut self, action: Action) {
        if action.needs_confirmation() {
            self.confirm = Some(action);
        } else {
            self.pending = Some(action);
        }
    }

    pub fn confirm_pending(&mut self, accepted: bool) {
        if let Some(action) = self.confirm.take() {
            if accepted {
                self.pending = Some(action);
            }
        }
    }

    /// Runs the queued action, if any. Failures land in the status bar; an
    /// authentication failure sends the user back to the login screen.
    pub async fn run_pending(&mut self) {
        let Some(action) = self.pending.take() else {
            return;
        };
        debug!("Running {:?}", action);
        self.loading = true;
        if self.needs_guard(&action) {
            if let Authorization::Unauthorized(reason) =
                auth::authorize(&self.store, self.backend.as_ref(), auth::now()).await
            {
                info!("Redirecting to login: {}", reason);
                self.loading = false;
                self.return_to_login(reason);
                return;
            }
        }
        let result = self.dispatch(action).await;
        self.loading = false;
        if let Err(e) = result {
            self.report(e);
        }
    }

    /// Actions queued from a protected screen go through the session check.
    /// Navigation runs its own; signing out needs none.
    fn needs_guard(&self, action: &Action) -> bool {
        self.mode.is_protected() && !matches!(action, Action::Navigate(_) | Action::Logout)
    }

    async fn dispatch(&mut self, action: Action) -> ApiResult<()> {
        match action {
            Action::Navigate(target) => {
                self.navigate(target).await;
                Ok(())
            }
            Action::Login => self.login().await,
            Action::Register => self.register().await,
            Action::Logout => {
                self.logout();
                Ok(())
            }
            Action::SelectDatabase => self.select_database(),
            Action::SubmitDatabaseForm => self.submit_database_form().await,
            Action::EditDatabase => {
                self.edit_selected_database();
                Ok(())
            }
            Action::DeleteDatabase => self.delete_database().await,
            Action::TestConnection => self.test_connection().await,
            Action::ExtractMetadata => self.extract_metadata().await,
            Action::UpdateEmbeddings => self.update_embeddings().await,
            Action::OpenSession => self.open_selected_session().await,
            Action::CreateSession(title) => self.create_session(&title).await,
            Action::RenameSession(title) => self.rename_session(&title).await,
            Action::DeleteSession => self.delete_session().await,
            Action::SubmitPrompt => self.submit_prompt().await,
            Action::ExecuteSql => self.execute_generated().await,
            Action::DeleteQuery => self.delete_selected_query().await,
            Action::Search(text) => self.search_metadata(&text).await,
            Action::SaveDescription(text) => self.save_description(&text).await,
            Action::GenerateDescription => self.generate_description().await,
            Action::AcceptGeneratedDescription => self.accept_generated_description().await,
            Action::UpdateEmail(email) => self.update_email(&email).await,
            Action::RequestPasswordChange => self.request_password_change().await,
            Action::VerifyOtp(otp) => self.verify_otp(&otp).await,
            Action::SetNewPassword(password) => self.set_new_password(&password).await,
        }
    }

    pub fn report(&mut self, err: ApiError) {
        warn!("Request failed: {}", err);
        if err.is_auth() {
            // Tokens stay for the next guarded request
            self.show_login(err.detail());
        } else {
            self.set_error(err.to_string());
        }
    }

    /// Drops the stored tokens and shows the login screen with `reason`.
    pub fn return_to_login(&mut self, reason: String) {
        if let Err(e) = store::lock(&self.store).clear() {
            warn!("Could not clear client state: {}", e);
        }
        self.show_login(reason);
    }

    fn show_login(&mut self, reason: String) {
        self.login.password.clear();
        self.mode = AppMode::Login;
        self.set_error(reason);
    }

    /// Checks the session before showing a protected screen, then loads the
    /// screen's data. The current screen stays up when loading fails.
    pub async fn navigate(&mut self, target: AppMode) {
        if target.is_protected() {
            match auth::authorize(&self.store, self.backend.as_ref(), auth::now()).await {
                Authorization::Authorized => {}
                Authorization::Unauthorized(reason) => {
                    info!("Redirecting to login: {}", reason);
                    self.return_to_login(reason);
                    return;
                }
            }
        }

        if target.needs_database() && self.selected_database().is_none() {
            self.set_error("Select a database first".to_string());
            return;
        }

        let loaded = match target {
            AppMode::Databases => self.load_databases().await,
            AppMode::Sessions => self.load_sessions().await,
            AppMode::Query => self.reload_session().await,
            AppMode::Schema => self.load_schema().await,
            AppMode::Relationships => self.load_relationships().await,
            AppMode::ErDiagram => self.load_diagram().await,
            AppMode::Dashboard => self.load_dashboard().await,
            AppMode::Profile => self.load_profile().await,
            AppMode::DatabaseForm | AppMode::Login | AppMode::Register => Ok(()),
        };

        match loaded {
            Ok(()) => {
                self.clear_error();
                self.mode = target;
            }
            Err(e) => self.report(e),
        }
    }

    /// Screen shown after start-up: the database list when a session survives
    /// in the store, the login form otherwise.
    pub async fn start(&mut self) {
        if self.is_signed_in() {
            self.navigate(AppMode::Databases).await;
        }
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub(crate) fn store(&self) -> &SharedStore {
        &self.store
    }
}

/// Moves a list cursor one step, clamped to `len`.
pub fn step(selected: usize, len: usize, down: bool) -> usize {
    if len == 0 {
        0
    } else if down {
        (selected + 1).min(len - 1)
    } else {
        selected.saturating_sub(1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::models::TokenPair;
    use crate::store::ClientStore;
    use crate::testing::{self, FailWith, FakeBackend};

    pub fn signed_in_store() -> SharedStore {
        let mut store = ClientStore::in_memory();
        store
            .set_tokens(&TokenPair {
                access: testing::valid_token(),
                refresh: "refresh-token".to_string(),
            })
            .unwrap();
        store.shared()
    }

    pub fn app_with(backend: FakeBackend) -> (App, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let app = App::new(backend.clone(), signed_in_store());
        (app, backend)
    }

    #[tokio::test]
    async fn protected_navigation_without_token_goes_to_login() {
        let backend = Arc::new(FakeBackend::default());
        let mut app = App::new(backend.clone(), ClientStore::in_memory().shared());
        app.mode = AppMode::Register;

        app.navigate(AppMode::Databases).await;

        assert_eq!(app.mode, AppMode::Login);
        assert_eq!(app.error_message.as_deref(), Some("Not signed in"));
        assert_eq!(backend.calls("list_databases"), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_loading_screen() {
        let backend = Arc::new(FakeBackend::default().with_databases(vec![testing::database(1, "shop")]));
        let mut store = ClientStore::in_memory();
        store
            .set_tokens(&TokenPair {
                access: testing::expired_token(),
                refresh: "refresh-token".to_string(),
            })
            .unwrap();
        let mut app = App::new(backend.clone(), store.shared());

        app.navigate(AppMode::Databases).await;

        assert_eq!(app.mode, AppMode::Databases);
        assert_eq!(backend.calls("refresh_access"), 1);
        assert_eq!(app.databases.items.len(), 1);
        assert_eq!(
            store::lock(app.store()).access_token(),
            Some(testing::refreshed_token().as_str())
        );
    }

    #[tokio::test]
    async fn unauthorized_response_shows_login_but_keeps_tokens() {
        let (mut app, backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Dashboard;
        backend.fail("list_databases", FailWith::Unauthorized);

        app.queue(Action::Navigate(AppMode::Databases));
        app.run_pending().await;

        assert_eq!(app.mode, AppMode::Login);
        assert!(app.error_message.is_some());
        assert!(!app.loading);
        assert_eq!(store::lock(app.store()).refresh_token(), Some("refresh-token"));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_screen_actions() {
        let backend = FakeBackend::default()
            .with_databases(vec![testing::database(1, "shop")])
            .with_sessions(vec![testing::session(10, "orders", 1)]);
        let (mut app, backend) = app_with(backend);
        app.open_session(10).await;
        assert_eq!(app.mode, AppMode::Query);

        store::lock(app.store())
            .set_access_token(testing::expired_token())
            .unwrap();
        backend.set_generation("SELECT 1", "");
        app.query.set_prompt("one");

        app.queue(Action::SubmitPrompt);
        app.run_pending().await;

        assert_eq!(app.mode, AppMode::Query);
        assert_eq!(backend.calls("refresh_access"), 1);
        assert!(app.query.generated.is_some());
        let state = store::lock(app.store());
        assert_eq!(state.refresh_token(), Some("refresh-token"));
        assert_eq!(state.access_token(), Some(testing::refreshed_token().as_str()));
    }

    #[tokio::test]
    async fn failed_refresh_before_an_action_goes_to_login() {
        let (mut app, backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Databases;
        store::lock(app.store())
            .set_access_token(testing::expired_token())
            .unwrap();
        backend.fail("refresh_access", FailWith::Unauthorized);

        app.queue(Action::TestConnection);
        app.run_pending().await;

        assert_eq!(app.mode, AppMode::Login);
        assert!(!app.is_signed_in());
        assert!(!app.loading);
        assert_eq!(backend.calls("refresh_access"), 1);
    }

    #[tokio::test]
    async fn other_failures_keep_the_screen() {
        let (mut app, backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Profile;
        backend.fail("list_sessions", FailWith::Server);

        app.queue(Action::Navigate(AppMode::Sessions));
        app.run_pending().await;

        assert_eq!(app.mode, AppMode::Profile);
        assert_eq!(app.error_message.as_deref(), Some("Server error 500: boom"));
        assert!(app.is_signed_in());
    }

    #[tokio::test]
    async fn database_screens_need_a_selection() {
        let (mut app, backend) = app_with(FakeBackend::default());
        app.mode = AppMode::Databases;

        app.navigate(AppMode::Schema).await;

        assert_eq!(app.mode, AppMode::Databases);
        assert_eq!(app.error_message.as_deref(), Some("Select a database first"));
        assert_eq!(backend.calls("schema"), 0);
    }

    #[tokio::test]
    async fn destructive_actions_wait_for_confirmation() {
        let (mut app, _backend) = app_with(FakeBackend::default());
        app.queue(Action::Logout);
        assert!(app.pending.is_none());

        app.confirm_pending(false);
        assert!(app.confirm.is_none());
        assert!(app.pending.is_none());

        app.queue(Action::Logout);
        app.confirm_pending(true);
        app.run_pending().await;
        assert!(!app.is_signed_in());
        assert_eq!(app.mode, AppMode::Login);
    }

    #[test]
    fn line_edit_maps_to_actions() {
        assert_eq!(
            LineEdit::new(LinePurpose::RenameSession, "  Revenue  ").into_action(),
            Some(Action::RenameSession("Revenue".to_string()))
        );
        assert_eq!(LineEdit::new(LinePurpose::Search, "   ").into_action(), None);
        assert_eq!(
            LineEdit::new(LinePurpose::NewSession, "").into_action(),
            Some(Action::CreateSession(String::new()))
        );
    }

    #[test]
    fn step_clamps() {
        assert_eq!(step(0, 0, true), 0);
        assert_eq!(step(2, 3, true), 2);
        assert_eq!(step(0, 3, false), 0);
        assert_eq!(step(1, 3, true), 2);
    }
}
