use tracing::info;

use crate::app::{App, AppMode};
use crate::error::{ApiError, ApiResult};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Email,
    Password,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub field: LoginField,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// Tab order; the email field only exists on the register screen.
    pub fn next_field(&mut self, register: bool) {
        self.field = match (self.field, register) {
            (LoginField::Username, true) => LoginField::Email,
            (LoginField::Username, false) => LoginField::Password,
            (LoginField::Email, _) => LoginField::Password,
            (LoginField::Password, _) => LoginField::Username,
        };
    }

    pub fn prev_field(&mut self, register: bool) {
        self.field = match (self.field, register) {
            (LoginField::Username, _) => LoginField::Password,
            (LoginField::Email, _) => LoginField::Username,
            (LoginField::Password, true) => LoginField::Email,
            (LoginField::Password, false) => LoginField::Username,
        };
    }

    fn field_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::Username => &mut self.username,
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn input_char(&mut self, c: char) {
        self.field_mut().push(c);
    }

    pub fn delete_char(&mut self) {
        self.field_mut().pop();
    }

    fn validate(&self, register: bool) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("Username is required".to_string());
        }
        if register && self.email.trim().is_empty() {
            return Err("Email is required".to_string());
        }
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(())
    }
}

impl App {
    pub async fn login(&mut self) -> ApiResult<()> {
        self.login.validate(false).map_err(ApiError::Validation)?;

        let response = self
            .backend()
            .login(self.login.username.trim(), &self.login.password)
            .await?;
        store::lock(self.store())
            .set_tokens(&response.tokens())
            .map_err(|e| ApiError::Decode(format!("Could not save session: {}", e)))?;
        info!("Signed in as {}", self.login.username.trim());

        self.login.password.clear();
        self.navigate(AppMode::Databases).await;
        Ok(())
    }

    /// Creates the account, then signs in with the same credentials.
    pub async fn register(&mut self) -> ApiResult<()> {
        self.login.validate(true).map_err(ApiError::Validation)?;

        self.backend()
            .register(
                self.login.username.trim(),
                self.login.email.trim(),
                &self.login.password,
            )
            .await?;
        info!("Registered {}", self.login.username.trim());
        self.login().await
    }

    pub fn logout(&mut self) {
        info!("Signing out");
        self.databases = Default::default();
        self.sessions = Default::default();
        self.query = Default::default();
        self.metadata = Default::default();
        self.diagram = Default::default();
        self.dashboard = None;
        self.profile = Default::default();
        self.return_to_login("Signed out".to_string());
    }
}
