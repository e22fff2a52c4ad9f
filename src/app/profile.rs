use tracing::info;

use crate::api::models::{TokenPair, UserInfo};
use crate::app::{App, LineEdit, LinePurpose};
use crate::error::{ApiError, ApiResult};
use crate::store;

/// Where the user is in the emailed-code password change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordStep {
    #[default]
    Idle,
    AwaitingOtp,
    AwaitingPassword,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileView {
    pub user: Option<UserInfo>,
    pub password_step: PasswordStep,
}

impl App {
    pub async fn load_profile(&mut self) -> ApiResult<()> {
        self.profile.user = Some(self.backend().me().await?);
        Ok(())
    }

    pub async fn update_email(&mut self, email: &str) -> ApiResult<()> {
        if !email.contains('@') {
            return Err(ApiError::Validation("Enter a valid email address".to_string()));
        }
        let user = self.backend().update_email(email).await?;
        info!("Email updated for {}", user.username);
        self.profile.user = Some(user);
        self.set_info("Email updated");
        Ok(())
    }

    pub async fn request_password_change(&mut self) -> ApiResult<()> {
        let sent = self.backend().request_password_change().await?;
        self.profile.password_step = PasswordStep::AwaitingOtp;
        self.line_edit = Some(LineEdit::new(LinePurpose::Otp, ""));
        self.set_info(sent.detail);
        Ok(())
    }

    pub async fn verify_otp(&mut self, otp: &str) -> ApiResult<()> {
        if self.profile.password_step != PasswordStep::AwaitingOtp {
            return Err(ApiError::Validation("Request a code first".to_string()));
        }
        let verified = match self.backend().verify_otp(otp).await {
            Ok(verified) => verified,
            Err(e) => {
                // let the user type the code again
                self.line_edit = Some(LineEdit::new(LinePurpose::Otp, ""));
                return Err(e);
            }
        };
        self.profile.password_step = PasswordStep::AwaitingPassword;
        self.line_edit = Some(LineEdit::new(LinePurpose::NewPassword, ""));
        self.set_info(verified.detail);
        Ok(())
    }

    /// Final step; the backend answers with a fresh token pair that replaces
    /// the stored one.
    pub async fn set_new_password(&mut self, password: &str) -> ApiResult<()> {
        if self.profile.password_step != PasswordStep::AwaitingPassword {
            return Err(ApiError::Validation("Verify the code first".to_string()));
        }
        let changed = self.backend().set_new_password(password).await?;
        store::lock(self.store())
            .set_tokens(&TokenPair {
                access: changed.access,
                refresh: changed.refresh,
            })
            .map_err(|e| ApiError::Decode(format!("Could not save session: {}", e)))?;
        info!("Password changed");
        self.profile.password_step = PasswordStep::Idle;
        self.set_info(changed.detail);
        Ok(())
    }
}
