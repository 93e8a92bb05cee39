use super::{repository, service};
use crate::{
    modules::{notification, user},
    types::Context,
    utils,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct SignUpPayload {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    role: user::repository::Role,
}

async fn sign_up(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<SignUpPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!("Failed to start database transaction: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Sign up failed" })),
            );
        }
    };

    match user::repository::find_by_email(&mut *tx, payload.email.clone().to_lowercase()).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "There is a user with that email already" })),
            )
        }
        Ok(None) => (),
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Sign up failed" })),
            )
        }
    };

    let password = match service::hash_password(&payload.password) {
        Ok(password) => password,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Sign up failed" })),
            )
        }
    };

    let created_user = match user::repository::create(
        &mut *tx,
        user::repository::CreateUserPayload {
            email: payload.email.to_lowercase(),
            password,
            role: payload.role,
        },
    )
    .await
    {
        Ok(created_user) => created_user,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Sign up failed" })),
            )
        }
    };

    let verification =
        match repository::create_for_user(&mut *tx, created_user.id.clone()).await {
            Ok(verification) => verification,
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Sign up failed" })),
                )
            }
        };

    if let Err(err) = tx.commit().await {
        tracing::error!("Failed to commit database transaction: {}", err);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Sign up failed" })),
        );
    }

    // Notification failing to send is insignificant here; the user can
    // request another code by editing their profile.
    tokio::spawn(notification::service::send(
        ctx.clone(),
        notification::service::Notification::email_verification_requested(
            created_user.clone(),
            verification.code,
        ),
    ));

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created successfully",
            "id": created_user.id
        })),
    )
}

#[derive(Deserialize, Validate)]
pub struct SignInPayload {
    #[validate(email)]
    email: String,
    password: String,
}

async fn sign_in(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<SignInPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    // Unknown email and wrong password intentionally share one response.
    let rejection = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Invalid credentials" })),
    );

    let found_user = match user::repository::find_by_email(
        &ctx.db_conn.pool,
        payload.email.to_lowercase(),
    )
    .await
    {
        Ok(Some(found_user)) => found_user,
        Ok(None) => return rejection,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Sign in failed" })),
            )
        }
    };

    match service::verify_password(&payload.password, &found_user.password) {
        Ok(true) => (),
        Ok(false) => return rejection,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Sign in failed" })),
            )
        }
    };

    match service::sign_token(&ctx.auth.jwt_secret, found_user.id) {
        Ok(token) => (StatusCode::OK, Json(json!({ "token": token }))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Sign in failed" })),
        ),
    }
}

#[derive(Deserialize, Validate)]
pub struct VerifyEmailPayload {
    #[validate(length(min = 1))]
    code: String,
}

async fn verify_email(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<VerifyEmailPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!("Failed to start database transaction: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to verify email" })),
            );
        }
    };

    let verification = match repository::find_by_code(&mut *tx, payload.code).await {
        Ok(Some(verification)) => verification,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Verification not found" })),
            )
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to verify email" })),
            )
        }
    };

    if user::repository::update_by_id(
        &mut *tx,
        verification.user_id.clone(),
        user::repository::UpdateUserPayload {
            email: None,
            password: None,
            is_verified: Some(true),
        },
    )
    .await
    .is_err()
    {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to verify email" })),
        );
    }

    // The code is one-time; consuming it deletes the row.
    if repository::delete_by_id(&mut *tx, verification.id).await.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to verify email" })),
        );
    }

    match tx.commit().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Email verified successfully" })),
        ),
        Err(err) => {
            tracing::error!("Failed to commit database transaction: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to verify email" })),
            )
        }
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/verify-email", post(verify_email))
}
