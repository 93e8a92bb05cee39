use super::service;
use crate::modules::user::{
    self,
    repository::{Role, User},
};
use crate::types::Context;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

pub const TOKEN_HEADER: &str = "x-jwt";

/// Attaches the user named by a valid `x-jwt` token to the request
/// extensions. Never rejects: a missing header, a bad token or an unknown
/// user all leave the request unauthenticated.
pub async fn attach_user(State(ctx): State<Arc<Context>>, mut req: Request, next: Next) -> Response {
    if let Some(token) = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|header| header.to_str().ok())
    {
        if let Ok(claims) = service::verify_token(&ctx.auth.jwt_secret, token) {
            if let Ok(Some(user)) =
                user::repository::find_by_id(&ctx.db_conn.pool, claims.id).await
            {
                req.extensions_mut().insert(user);
            }
        }
    }

    next.run(req).await
}

fn attached_user(parts: &Parts) -> Result<User, Response> {
    parts.extensions.get::<User>().cloned().ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid session token" })),
        )
            .into_response()
    })
}

fn role_gate(user: User, role: Role) -> Result<User, Response> {
    if user.role != role {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Forbidden" })),
        )
            .into_response());
    }

    Ok(user)
}

#[derive(Serialize, Clone)]
pub struct Auth {
    pub user: User,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        attached_user(parts).map(|user| Self { user })
    }
}

#[derive(Serialize, Clone)]
pub struct ClientAuth {
    pub user: User,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientAuth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        attached_user(parts)
            .and_then(|user| role_gate(user, Role::Client))
            .map(|user| Self { user })
    }
}

#[derive(Serialize, Clone)]
pub struct OwnerAuth {
    pub user: User,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OwnerAuth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        attached_user(parts)
            .and_then(|user| role_gate(user, Role::Owner))
            .map(|user| Self { user })
    }
}

#[derive(Serialize, Clone)]
pub struct DriverAuth {
    pub user: User,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for DriverAuth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        attached_user(parts)
            .and_then(|user| role_gate(user, Role::Driver))
            .map(|user| Self { user })
    }
}
