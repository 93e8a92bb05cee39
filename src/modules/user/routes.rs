use super::repository;
use crate::{
    modules::{auth, auth::middleware::Auth, notification},
    types::Context,
    utils,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

async fn me(auth: Auth) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(auth.user)))
}

async fn get_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    _: Auth,
) -> impl IntoResponse {
    match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(found_user)) => (StatusCode::OK, Json(json!(found_user))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch user" })),
        ),
    }
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfilePayload {
    #[validate(email)]
    email: Option<String>,
    #[validate(length(min = 8))]
    password: Option<String>,
}

async fn update_profile(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Json(payload): Json<UpdateProfilePayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    let err = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Could not update profile" })),
    );

    let password = match payload.password {
        Some(password) => match auth::service::hash_password(&password) {
            Ok(password) => Some(password),
            Err(_) => return err,
        },
        None => None,
    };

    let email = payload.email.map(|email| email.to_lowercase());
    let email_changed = email.is_some();

    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(error) => {
            tracing::error!("Failed to start database transaction: {}", error);
            return err;
        }
    };

    if repository::update_by_id(
        &mut *tx,
        auth.user.id.clone(),
        repository::UpdateUserPayload {
            email: email.clone(),
            password,
            // A new address has to be proven all over again.
            is_verified: email_changed.then_some(false),
        },
    )
    .await
    .is_err()
    {
        return err;
    }

    let verification = if email_changed {
        match auth::repository::create_for_user(&mut *tx, auth.user.id.clone()).await {
            Ok(verification) => Some(verification),
            Err(_) => return err,
        }
    } else {
        None
    };

    if let Err(error) = tx.commit().await {
        tracing::error!("Failed to commit database transaction: {}", error);
        return err;
    }

    if let Some(verification) = verification {
        let mut updated_user = auth.user.clone();
        updated_user.email = email.unwrap_or(updated_user.email);

        tokio::spawn(notification::service::send(
            ctx.clone(),
            notification::service::Notification::email_verification_requested(
                updated_user,
                verification.code,
            ),
        ));
    }

    (
        StatusCode::OK,
        Json(json!({ "message": "Profile updated successfully" })),
    )
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/me", get(me).patch(update_profile))
        .route("/:id", get(get_by_id))
}
