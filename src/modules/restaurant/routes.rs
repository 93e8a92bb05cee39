use super::repository;
use crate::{
    modules::{auth::middleware::OwnerAuth, category, dish},
    types::Context,
    utils::{self, pagination::Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct CreateRestaurantPayload {
    #[validate(length(min = 1))]
    name: String,
    #[validate(length(min = 1))]
    address: String,
    #[validate(length(min = 1))]
    cover_image: String,
    #[validate(length(min = 1))]
    category_name: String,
}

async fn create(
    State(ctx): State<Arc<Context>>,
    auth: OwnerAuth,
    Json(payload): Json<CreateRestaurantPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    let err = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Restaurant creation failed" })),
    );

    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(error) => {
            tracing::error!("Failed to start database transaction: {}", error);
            return err;
        }
    };

    let category =
        match category::repository::find_or_create_by_name(&mut *tx, payload.category_name).await {
            Ok(category) => category,
            Err(_) => return err,
        };

    let restaurant = match repository::create(
        &mut *tx,
        repository::CreateRestaurantPayload {
            name: payload.name,
            address: payload.address,
            cover_image: payload.cover_image,
            category_id: category.id,
            owner_id: auth.user.id,
        },
    )
    .await
    {
        Ok(restaurant) => restaurant,
        Err(_) => return err,
    };

    match tx.commit().await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Restaurant created!",
                "id": restaurant.id
            })),
        ),
        Err(error) => {
            tracing::error!("Failed to commit database transaction: {}", error);
            err
        }
    }
}

async fn list(
    State(ctx): State<Arc<Context>>,
    pagination: Pagination,
) -> impl IntoResponse {
    match repository::find_many(
        &ctx.db_conn.pool,
        pagination,
        repository::Filters::default(),
    )
    .await
    {
        Ok(paginated_restaurants) => (StatusCode::OK, Json(json!(paginated_restaurants))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch restaurants" })),
        ),
    }
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: String,
}

async fn search(
    State(ctx): State<Arc<Context>>,
    pagination: Pagination,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    match repository::find_many(
        &ctx.db_conn.pool,
        pagination,
        repository::Filters {
            search: Some(query.q),
            category_id: None,
        },
    )
    .await
    {
        Ok(paginated_restaurants) => (StatusCode::OK, Json(json!(paginated_restaurants))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to search restaurants" })),
        ),
    }
}

async fn mine(State(ctx): State<Arc<Context>>, auth: OwnerAuth) -> impl IntoResponse {
    match repository::find_by_owner_id(&ctx.db_conn.pool, auth.user.id).await {
        Ok(restaurants) => (StatusCode::OK, Json(json!(restaurants))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch restaurants" })),
        ),
    }
}

async fn get_by_id(Path(id): Path<String>, State(ctx): State<Arc<Context>>) -> impl IntoResponse {
    let restaurant = match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(restaurant)) => restaurant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Restaurant not found" })),
            )
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch restaurant" })),
            )
        }
    };

    let menu =
        match dish::repository::find_by_restaurant_id(&ctx.db_conn.pool, restaurant.id.clone())
            .await
        {
            Ok(menu) => menu,
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to fetch restaurant" })),
                )
            }
        };

    (
        StatusCode::OK,
        Json(json!({
            "restaurant": restaurant,
            "menu": menu
        })),
    )
}

#[derive(Deserialize)]
pub struct UpdateRestaurantPayload {
    name: Option<String>,
    address: Option<String>,
    cover_image: Option<String>,
    category_name: Option<String>,
}

async fn update_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    auth: OwnerAuth,
    Json(payload): Json<UpdateRestaurantPayload>,
) -> impl IntoResponse {
    let restaurant = match repository::find_by_id(&ctx.db_conn.pool, id.clone()).await {
        Ok(Some(restaurant)) => restaurant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Restaurant not found" })),
            )
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to update restaurant" })),
            )
        }
    };

    if restaurant.owner_id != auth.user.id {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can't edit a restaurant that you don't own" })),
        );
    }

    let err = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to update restaurant" })),
    );

    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(error) => {
            tracing::error!("Failed to start database transaction: {}", error);
            return err;
        }
    };

    let category_id = match payload.category_name {
        Some(category_name) => {
            match category::repository::find_or_create_by_name(&mut *tx, category_name).await {
                Ok(category) => Some(category.id),
                Err(_) => return err,
            }
        }
        None => None,
    };

    if repository::update_by_id(
        &mut *tx,
        restaurant.id,
        repository::UpdateRestaurantPayload {
            name: payload.name,
            address: payload.address,
            cover_image: payload.cover_image,
            category_id,
        },
    )
    .await
    .is_err()
    {
        return err;
    }

    match tx.commit().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Restaurant updated successfully" })),
        ),
        Err(error) => {
            tracing::error!("Failed to commit database transaction: {}", error);
            err
        }
    }
}

async fn delete_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    auth: OwnerAuth,
) -> impl IntoResponse {
    let restaurant = match repository::find_by_id(&ctx.db_conn.pool, id.clone()).await {
        Ok(Some(restaurant)) => restaurant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Restaurant not found" })),
            )
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to delete restaurant" })),
            )
        }
    };

    if restaurant.owner_id != auth.user.id {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can't edit a restaurant that you don't own" })),
        );
    }

    match repository::delete_by_id(&ctx.db_conn.pool, restaurant.id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Restaurant deleted successfully" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to delete restaurant" })),
        ),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/mine", get(mine))
        .route("/:id", get(get_by_id).patch(update_by_id).delete(delete_by_id))
}
