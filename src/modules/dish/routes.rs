use super::repository;
use crate::{
    modules::{auth::middleware::OwnerAuth, restaurant},
    types::Context,
    utils,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
    Json, Router,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

/// Loads the dish's restaurant and rejects callers who don't own it.
async fn owned_dish(
    ctx: &Context,
    id: String,
    owner_id: &str,
) -> Result<repository::Dish, (StatusCode, Json<serde_json::Value>)> {
    let dish = match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(dish)) => dish,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Dish not found" })),
            ))
        }
        Err(_) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch dish" })),
            ))
        }
    };

    match restaurant::repository::find_by_id(&ctx.db_conn.pool, dish.restaurant_id.clone()).await {
        Ok(Some(owning_restaurant)) if owning_restaurant.owner_id == owner_id => Ok(dish),
        Ok(_) => Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can't do that" })),
        )),
        Err(_) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch dish" })),
        )),
    }
}

#[derive(Deserialize, Validate)]
pub struct CreateDishPayload {
    #[validate(length(min = 1))]
    restaurant_id: String,
    #[validate(length(min = 1))]
    name: String,
    #[validate(length(min = 1))]
    description: String,
    price: BigDecimal,
    photo: Option<String>,
    #[serde(default)]
    options: Vec<repository::DishOption>,
}

async fn create(
    State(ctx): State<Arc<Context>>,
    auth: OwnerAuth,
    Json(payload): Json<CreateDishPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    let owning_restaurant = match restaurant::repository::find_by_id(
        &ctx.db_conn.pool,
        payload.restaurant_id.clone(),
    )
    .await
    {
        Ok(Some(owning_restaurant)) => owning_restaurant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Restaurant not found" })),
            )
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Dish creation failed" })),
            )
        }
    };

    if owning_restaurant.owner_id != auth.user.id {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can't do that" })),
        );
    }

    match repository::create(
        &ctx.db_conn.pool,
        repository::CreateDishPayload {
            restaurant_id: payload.restaurant_id,
            name: payload.name,
            description: payload.description,
            price: payload.price,
            photo: payload.photo,
            options: payload.options,
        },
    )
    .await
    {
        Ok(dish) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Dish created!",
                "id": dish.id
            })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Dish creation failed" })),
        ),
    }
}

#[derive(Deserialize)]
pub struct UpdateDishPayload {
    name: Option<String>,
    description: Option<String>,
    price: Option<BigDecimal>,
    photo: Option<String>,
    options: Option<Vec<repository::DishOption>>,
}

async fn update_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    auth: OwnerAuth,
    Json(payload): Json<UpdateDishPayload>,
) -> impl IntoResponse {
    let dish = match owned_dish(&ctx, id, &auth.user.id).await {
        Ok(dish) => dish,
        Err(response) => return response,
    };

    match repository::update_by_id(
        &ctx.db_conn.pool,
        dish.id,
        repository::UpdateDishPayload {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            photo: payload.photo,
            options: payload.options,
        },
    )
    .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Dish updated successfully" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to update dish" })),
        ),
    }
}

async fn delete_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    auth: OwnerAuth,
) -> impl IntoResponse {
    let dish = match owned_dish(&ctx, id, &auth.user.id).await {
        Ok(dish) => dish,
        Err(response) => return response,
    };

    match repository::delete_by_id(&ctx.db_conn.pool, dish.id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Dish deleted successfully" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to delete dish" })),
        ),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/", post(create))
        .route("/:id", patch(update_by_id).delete(delete_by_id))
}
