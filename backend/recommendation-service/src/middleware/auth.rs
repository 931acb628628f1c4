use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use crate::models::LocalUser;
use crate::security::AuthGuard;

/// Header a fronting reverse proxy populates with the original caller's
/// credential.
pub const FORWARDED_AUTHORIZATION: &str = "X-Forwarded-Authorization";

/// The authenticated caller, available to handlers behind [`AuthMiddleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub LocalUser);

/// Authentication middleware wrapping [`AuthGuard`]. Composed per route; a
/// route without it stays open.
pub struct AuthMiddleware {
    guard: Arc<AuthGuard>,
}

impl AuthMiddleware {
    pub fn new(guard: Arc<AuthGuard>) -> Self {
        Self { guard }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            guard: self.guard.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    guard: Arc<AuthGuard>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let guard = self.guard.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get(FORWARDED_AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .map(str::to_owned);

            let user = guard.authenticate(header.as_deref()).await?;
            req.extensions_mut().insert(CurrentUser(user));

            service.call(req).await
        })
    }
}

impl FromRequest for CurrentUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<CurrentUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(actix_web::error::ErrorUnauthorized(
                "User not authenticated",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn user() -> LocalUser {
        LocalUser {
            subject_id: "subject-1".to_string(),
            name: "Jane Poster".to_string(),
            email: "jane@example.com".to_string(),
        }
    }

    #[actix_web::test]
    async fn extracts_current_user_from_extensions() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(CurrentUser(user()));

        let extracted = CurrentUser::extract(&req).await.unwrap();
        assert_eq!(extracted.0.subject_id, "subject-1");
    }

    #[actix_web::test]
    async fn extraction_fails_without_authenticated_user() {
        let req = TestRequest::default().to_http_request();
        assert!(CurrentUser::extract(&req).await.is_err());
    }
}
