use std::sync::Arc;

use chrono::DateTime;
use tracing::{debug, error};

use crate::clients::UserDirectory;
use crate::error::AppError;
use crate::models::LocalUser;
use crate::security::TokenVerifier;

pub const TOKEN_NOT_PROVIDED: &str = "Token not provided";
pub const INVALID_TOKEN_OR_UNKNOWN_USER: &str = "Invalid token or user not signed up";

/// Admission gate run in front of protected routes: verifies the forwarded
/// bearer token and resolves its subject to a signed-up user.
///
/// Verification failures and unknown-user failures collapse into one client
/// message so the response never reveals which check rejected the caller.
pub struct AuthGuard {
    verifier: Arc<dyn TokenVerifier>,
    users: Arc<dyn UserDirectory>,
}

impl AuthGuard {
    pub fn new(verifier: Arc<dyn TokenVerifier>, users: Arc<dyn UserDirectory>) -> Self {
        Self { verifier, users }
    }

    /// Authenticate a forwarded-authorization header value of the form
    /// `"<scheme> <token>"`.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<LocalUser, AppError> {
        let raw = header
            .ok_or_else(|| AppError::Unauthenticated(TOKEN_NOT_PROVIDED.to_string()))?;
        let token = raw.split_whitespace().nth(1).ok_or_else(|| {
            AppError::Unauthenticated(INVALID_TOKEN_OR_UNKNOWN_USER.to_string())
        })?;

        let claims = match self.verifier.verify(token).await {
            Ok(claims) => claims,
            Err(e) => {
                error!("Invalid token: {e:#}");
                return Err(AppError::Unauthenticated(
                    INVALID_TOKEN_OR_UNKNOWN_USER.to_string(),
                ));
            }
        };

        if let Some(issued_at) = DateTime::from_timestamp(claims.iat, 0) {
            debug!("Token issued at {} ({})", issued_at, claims.iat);
        }
        if let Some(expires_at) = DateTime::from_timestamp(claims.exp, 0) {
            debug!("Token expires at {} ({})", expires_at, claims.exp);
        }

        match self.users.read_user(&claims.sub).await {
            Ok(user) => Ok(user),
            Err(e) => {
                error!("User not signed up: {e:#}");
                Err(AppError::Unauthenticated(
                    INVALID_TOKEN_OR_UNKNOWN_USER.to_string(),
                ))
            }
        }
    }
}
