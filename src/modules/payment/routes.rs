use super::repository;
use crate::{
    modules::{
        auth::middleware::{Auth, OwnerAuth},
        restaurant,
    },
    types::Context,
    utils,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

const PROMOTION_DAYS: i64 = 7;

#[derive(Deserialize, Validate)]
pub struct CreatePaymentPayload {
    #[validate(length(min = 1))]
    transaction_id: String,
    #[validate(length(min = 1))]
    restaurant_id: String,
}

async fn create(
    State(ctx): State<Arc<Context>>,
    auth: OwnerAuth,
    Json(payload): Json<CreatePaymentPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    let promoted_restaurant = match restaurant::repository::find_by_id(
        &ctx.db_conn.pool,
        payload.restaurant_id.clone(),
    )
    .await
    {
        Ok(Some(promoted_restaurant)) => promoted_restaurant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Restaurant not found" })),
            )
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Could not create payment" })),
            )
        }
    };

    if promoted_restaurant.owner_id != auth.user.id {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You are not allowed to do this" })),
        );
    }

    let err = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Could not create payment" })),
    );

    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(error) => {
            tracing::error!("Failed to start database transaction: {}", error);
            return err;
        }
    };

    let promoted_until = Utc::now().naive_utc() + Duration::days(PROMOTION_DAYS);

    if restaurant::repository::set_promotion(
        &mut *tx,
        promoted_restaurant.id.clone(),
        promoted_until,
    )
    .await
    .is_err()
    {
        return err;
    }

    let payment = match repository::create(
        &mut *tx,
        repository::CreatePaymentPayload {
            transaction_id: payload.transaction_id,
            user_id: auth.user.id,
            restaurant_id: promoted_restaurant.id,
        },
    )
    .await
    {
        Ok(payment) => payment,
        Err(_) => return err,
    };

    match tx.commit().await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Payment recorded!",
                "id": payment.id,
                "promoted_until": promoted_until
            })),
        ),
        Err(error) => {
            tracing::error!("Failed to commit database transaction: {}", error);
            err
        }
    }
}

async fn list(State(ctx): State<Arc<Context>>, auth: Auth) -> impl IntoResponse {
    match repository::find_by_user_id(&ctx.db_conn.pool, auth.user.id).await {
        Ok(payments) => (StatusCode::OK, Json(json!(payments))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Could not load payments" })),
        ),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new().route("/", get(list).post(create))
}
