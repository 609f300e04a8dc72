/// HTTP middleware for review-service
///
/// Bearer tokens are HS256 JWTs issued by identity-service. Valid claims are
/// stored in request extensions; the [`AuthUser`] and [`AdminUser`]
/// extractors decide per route whether a caller is required.
use crate::error::AppError;
use crate::models::Actor;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

/// Claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    fn from_claim(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// Authenticated caller, stored in request extensions after auth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        match self.role {
            Role::Admin => Actor::Admin(self.id),
            Role::User => Actor::User(self.id),
        }
    }
}

/// Authenticated caller with the admin role
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

impl AdminUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

/// Decode and verify a bearer token
pub fn validate_token(secret: &str, token: &str) -> Result<AuthUser, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    let id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID".to_string()))?;

    Ok(AuthUser {
        id,
        role: Role::from_claim(&data.claims.role),
    })
}

/// Validates `Authorization: Bearer` when present. Anonymous requests pass
/// through; route extractors reject them where a caller is required.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    secret: Arc<str>,
}

impl JwtAuthMiddleware {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    secret: Arc<str>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let secret = self.secret.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .map(|h| h.to_str().unwrap_or_default().to_string());

            if let Some(header) = header {
                let token = header.strip_prefix("Bearer ").ok_or_else(|| {
                    AppError::Unauthorized("Invalid Authorization scheme".to_string())
                })?;
                let user = validate_token(&secret, token)?;
                req.extensions_mut().insert(user);
            }

            service.call(req).await
        })
    }
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()).into()),
        )
    }
}

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = match req.extensions().get::<AuthUser>().copied() {
            None => Err(AppError::Unauthorized("Authentication required".to_string()).into()),
            Some(user) if user.role == Role::Admin => Ok(AdminUser(user)),
            Some(_) => Err(AppError::Forbidden("Admin privileges required".to_string()).into()),
        };
        ready(result)
    }
}
