use tracing::{info, warn};

use super::jwt;
use crate::api::Backend;
use crate::store::{self, SharedStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Authorized,
    Unauthorized(String),
}

/// Checks the stored access token before a protected screen is shown. An
/// expired token is refreshed once through the backend; the new access token
/// is written back to the store.
pub async fn authorize(store: &SharedStore, backend: &dyn Backend, now: i64) -> Authorization {
    let (access, refresh) = {
        let guard = store::lock(store);
        (
            guard.access_token().map(str::to_string),
            guard.refresh_token().map(str::to_string),
        )
    };

    let Some(access) = access else {
        return Authorization::Unauthorized("Not signed in".to_string());
    };

    let claims = match jwt::decode_claims(&access) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Token decode error: {}", e);
            return Authorization::Unauthorized("Invalid token format".to_string());
        }
    };

    if !claims.is_expired(now) {
        return Authorization::Authorized;
    }

    let Some(refresh) = refresh else {
        return Authorization::Unauthorized("No refresh token found".to_string());
    };

    info!("Access token expired, refreshing");
    match backend.refresh_access(&refresh).await {
        Ok(new_access) => {
            if let Err(e) = store::lock(store).set_access_token(new_access) {
                warn!("Could not persist refreshed token: {}", e);
            }
            Authorization::Authorized
        }
        Err(e) => {
            warn!("Token refresh error: {}", e);
            Authorization::Unauthorized(format!("Failed to refresh authentication token: {}", e.detail()))
        }
    }
}
