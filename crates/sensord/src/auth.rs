//! Login, logout and session restore.

use crate::error::ApiError;
use crate::state::AppState;
use axum::http::{header, HeaderMap};
use sensor_common::Account;
use tracing::{debug, info};

/// Username carried by the session cookie, if any
pub fn cookie_user(state: &AppState, headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| state.cookie.read(v))
}

/// Restore the logged-in account from the cookie. The name must still exist
/// in the credential store.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Account, ApiError> {
    let username = cookie_user(state, headers).ok_or(ApiError::Unauthorized)?;
    let book = state.load_accounts().await;
    match book.find(&username) {
        Some(account) => Ok(account.clone()),
        None => {
            debug!("Session cookie for unknown user {}", username);
            Err(ApiError::Unauthorized)
        }
    }
}

pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Account, ApiError> {
    let account = current_user(state, headers).await?;
    if account.is_admin() {
        Ok(account)
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Plain credential comparison against the member sheet
pub async fn login(state: &AppState, username: &str, password: &str) -> Result<Account, ApiError> {
    let book = state.load_accounts().await;
    if book.is_empty() {
        return Err(ApiError::Unavailable("Database Error".to_string()));
    }
    match book.authenticate(username, password) {
        Some(account) => {
            info!("  Login: {} ({})", account.username, account.role);
            Ok(account.clone())
        }
        None => {
            info!("  Login failed for {}", username);
            Err(ApiError::BadCredentials)
        }
    }
}
