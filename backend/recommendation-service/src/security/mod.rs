pub mod guard;
pub mod oidc;

pub use guard::AuthGuard;
pub use oidc::{OidcVerifier, TokenVerifier};

#[cfg(test)]
pub use oidc::MockTokenVerifier;
