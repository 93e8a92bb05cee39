use super::{
    events::{OrderEvent, OrderEventKind},
    repository::{self, Order, OrderItemOption, OrderStatus},
    service,
};
use crate::{
    modules::{
        auth::middleware::{Auth, ClientAuth, DriverAuth, OwnerAuth},
        restaurant,
        user::repository::{Role, User},
    },
    types::Context,
    utils::{self, pagination::Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, put},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;
use validator::Validate;

#[derive(Deserialize, Serialize)]
pub struct OrderItemPayload {
    dish_id: String,
    #[serde(default)]
    options: Vec<OrderItemOption>,
}

#[derive(Deserialize, Validate)]
pub struct CreateOrderPayload {
    #[validate(length(min = 1))]
    restaurant_id: String,
    #[validate(length(min = 1))]
    items: Vec<OrderItemPayload>,
}

async fn create(
    State(ctx): State<Arc<Context>>,
    auth: ClientAuth,
    Json(payload): Json<CreateOrderPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    match service::create_order(
        ctx.clone(),
        service::CreateOrderPayload {
            customer_id: auth.user.id,
            restaurant_id: payload.restaurant_id,
            items: payload
                .items
                .into_iter()
                .map(|item| service::ItemSelection {
                    dish_id: item.dish_id,
                    options: item.options,
                })
                .collect(),
        },
    )
    .await
    {
        Ok(order) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Order created!",
                "id": order.id,
                "total": order.total
            })),
        ),
        Err(service::CreateOrderError::RestaurantNotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Restaurant not found" })),
        ),
        Err(service::CreateOrderError::DishNotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Dish not found" })),
        ),
        Err(service::CreateOrderError::UnexpectedError) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Order creation failed" })),
        ),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<OrderStatus>,
}

async fn list(
    State(ctx): State<Arc<Context>>,
    pagination: Pagination,
    Query(query): Query<ListQuery>,
    auth: Auth,
) -> impl IntoResponse {
    let filters = match auth.user.role {
        Role::Client => repository::Filters {
            customer_id: Some(auth.user.id),
            status: query.status,
            ..Default::default()
        },
        Role::Driver => repository::Filters {
            driver_id: Some(auth.user.id),
            status: query.status,
            ..Default::default()
        },
        Role::Owner => repository::Filters {
            restaurant_owner_id: Some(auth.user.id),
            status: query.status,
            ..Default::default()
        },
    };

    match repository::find_many(&ctx.db_conn.pool, pagination, filters).await {
        Ok(paginated_orders) => (StatusCode::OK, Json(json!(paginated_orders))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch orders" })),
        ),
    }
}

fn is_participant(order: &Order, restaurant_owner_id: &str, user: &User) -> bool {
    order.customer_id == user.id
        || order.driver_id.as_deref() == Some(user.id.as_str())
        || restaurant_owner_id == user.id
}

/// Loads an order together with the id of the owner of its restaurant.
async fn find_order_with_owner(
    ctx: &Context,
    id: String,
) -> Result<(Order, String), (StatusCode, Json<serde_json::Value>)> {
    let order = match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Order not found" })),
            ))
        }
        Err(_) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch order" })),
            ))
        }
    };

    match restaurant::repository::find_by_id(&ctx.db_conn.pool, order.restaurant_id.clone()).await
    {
        Ok(Some(ordered_restaurant)) => Ok((order, ordered_restaurant.owner_id)),
        _ => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch order" })),
        )),
    }
}

async fn get_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    auth: Auth,
) -> impl IntoResponse {
    let (order, restaurant_owner_id) = match find_order_with_owner(&ctx, id).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    if !is_participant(&order, &restaurant_owner_id, &auth.user) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can't see that" })),
        );
    }

    let items = match repository::find_items_by_order_id(&ctx.db_conn.pool, order.id.clone()).await
    {
        Ok(items) => items,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch order" })),
            )
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "order": order,
            "items": items
        })),
    )
}

#[derive(Deserialize)]
pub struct UpdateStatusPayload {
    status: OrderStatus,
}

async fn update_status(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Json(payload): Json<UpdateStatusPayload>,
) -> impl IntoResponse {
    let (order, restaurant_owner_id) = match find_order_with_owner(&ctx, id).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    if !is_participant(&order, &restaurant_owner_id, &auth.user) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can't see that" })),
        );
    }

    let editor = if auth.user.role == Role::Owner && restaurant_owner_id == auth.user.id {
        Some(service::Editor::RestaurantOwner)
    } else if auth.user.role == Role::Driver
        && order.driver_id.as_deref() == Some(auth.user.id.as_str())
    {
        Some(service::Editor::AssignedDriver)
    } else {
        None
    };

    let allowed = editor
        .map(|editor| service::allowed_transition(editor, payload.status))
        .unwrap_or(false);

    if !allowed {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can't do that" })),
        );
    }

    let updated_order =
        match repository::update_status(&ctx.db_conn.pool, order.id, payload.status).await {
            Ok(Some(updated_order)) => updated_order,
            _ => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to update order" })),
                )
            }
        };

    ctx.order_events.publish(OrderEvent {
        kind: OrderEventKind::Updated,
        order: updated_order.clone(),
        restaurant_owner_id,
    });

    (
        StatusCode::OK,
        Json(json!({
            "message": "Order updated successfully",
            "status": updated_order.status
        })),
    )
}

async fn accept(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    auth: DriverAuth,
) -> impl IntoResponse {
    let (order, restaurant_owner_id) = match find_order_with_owner(&ctx, id).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    if order.driver_id.is_some() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "This order already has a driver" })),
        );
    }

    let claimed_order =
        match repository::assign_driver(&ctx.db_conn.pool, order.id, auth.user.id).await {
            Ok(Some(claimed_order)) => claimed_order,
            Ok(None) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "This order already has a driver" })),
                )
            }
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to accept order" })),
                )
            }
        };

    ctx.order_events.publish(OrderEvent {
        kind: OrderEventKind::Updated,
        order: claimed_order.clone(),
        restaurant_owner_id,
    });

    (
        StatusCode::OK,
        Json(json!({ "message": "Order accepted" })),
    )
}

fn sse_response(
    rx: broadcast::Receiver<OrderEvent>,
    filter: impl Fn(&OrderEvent) -> bool + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = futures::stream::unfold((rx, filter), |(mut rx, filter)| async move {
        loop {
            match rx.recv().await {
                Ok(event) if filter(&event) => {
                    return Some((Event::default().json_data(&event), (rx, filter)));
                }
                Ok(_) => continue,
                // A lagged subscriber skips what it missed and goes on.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Order event subscriber lagged; skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn pending_feed_filter(owner_id: &str, event: &OrderEvent) -> bool {
    event.kind == OrderEventKind::Created && event.restaurant_owner_id == owner_id
}

fn cooked_feed_filter(event: &OrderEvent) -> bool {
    event.kind == OrderEventKind::Updated && event.order.status == OrderStatus::Cooked
}

fn order_feed_filter(order_id: &str, event: &OrderEvent) -> bool {
    event.kind == OrderEventKind::Updated && event.order.id == order_id
}

/// New orders for the caller's restaurants.
async fn pending_feed(State(ctx): State<Arc<Context>>, auth: OwnerAuth) -> impl IntoResponse {
    let owner_id = auth.user.id;
    sse_response(ctx.order_events.subscribe(), move |event| {
        pending_feed_filter(&owner_id, event)
    })
}

/// Orders that just became ready for pickup, for any driver.
async fn cooked_feed(State(ctx): State<Arc<Context>>, _: DriverAuth) -> impl IntoResponse {
    sse_response(ctx.order_events.subscribe(), cooked_feed_filter)
}

/// Status updates of one order, for its participants only.
async fn order_feed(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    auth: Auth,
) -> Response {
    let (order, restaurant_owner_id) = match find_order_with_owner(&ctx, id).await {
        Ok(found) => found,
        Err(response) => return response.into_response(),
    };

    if !is_participant(&order, &restaurant_owner_id, &auth.user) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can't see that" })),
        )
            .into_response();
    }

    let order_id = order.id;
    sse_response(ctx.order_events.subscribe(), move |event| {
        order_feed_filter(&order_id, event)
    })
    .into_response()
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/feed/pending", get(pending_feed))
        .route("/feed/cooked", get(cooked_feed))
        .route("/:id", get(get_by_id).patch(update_status))
        .route("/:id/accept", put(accept))
        .route("/:id/feed", get(order_feed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn event(kind: OrderEventKind, status: OrderStatus, owner_id: &str) -> OrderEvent {
        OrderEvent {
            kind,
            order: Order {
                id: "order-1".to_string(),
                customer_id: "customer-1".to_string(),
                driver_id: None,
                restaurant_id: "restaurant-1".to_string(),
                status,
                total: BigDecimal::from(25),
                created_at: chrono::Utc::now().naive_utc(),
                updated_at: None,
            },
            restaurant_owner_id: owner_id.to_string(),
        }
    }

    #[test]
    fn pending_feed_only_passes_created_events_of_the_callers_restaurants() {
        let mine = event(OrderEventKind::Created, OrderStatus::Pending, "owner-1");
        let someone_elses = event(OrderEventKind::Created, OrderStatus::Pending, "owner-2");
        let update = event(OrderEventKind::Updated, OrderStatus::Cooking, "owner-1");

        assert!(pending_feed_filter("owner-1", &mine));
        assert!(!pending_feed_filter("owner-1", &someone_elses));
        assert!(!pending_feed_filter("owner-1", &update));
    }

    #[test]
    fn cooked_feed_only_passes_updates_that_reached_cooked() {
        assert!(cooked_feed_filter(&event(
            OrderEventKind::Updated,
            OrderStatus::Cooked,
            "owner-1"
        )));
        assert!(!cooked_feed_filter(&event(
            OrderEventKind::Updated,
            OrderStatus::Cooking,
            "owner-1"
        )));
        assert!(!cooked_feed_filter(&event(
            OrderEventKind::Created,
            OrderStatus::Cooked,
            "owner-1"
        )));
    }

    #[test]
    fn order_feed_only_passes_updates_of_that_order() {
        let update = event(OrderEventKind::Updated, OrderStatus::Cooking, "owner-1");

        assert!(order_feed_filter("order-1", &update));
        assert!(!order_feed_filter("order-2", &update));
        assert!(!order_feed_filter(
            "order-1",
            &event(OrderEventKind::Created, OrderStatus::Pending, "owner-1")
        ));
    }

    #[test]
    fn an_order_needs_at_least_one_item() {
        let empty: CreateOrderPayload = serde_json::from_value(serde_json::json!({
            "restaurant_id": "restaurant-1",
            "items": []
        }))
        .unwrap();
        assert!(empty.validate().is_err());

        let filled: CreateOrderPayload = serde_json::from_value(serde_json::json!({
            "restaurant_id": "restaurant-1",
            "items": [{ "dish_id": "dish-1" }]
        }))
        .unwrap();
        assert!(filled.validate().is_ok());
    }

    #[test]
    fn participants_are_the_customer_the_assigned_driver_and_the_owner() {
        let user = |id: &str, role: Role| User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            password: "hash".to_string(),
            role,
            is_verified: true,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: None,
        };

        let mut order = event(OrderEventKind::Created, OrderStatus::Pending, "owner-1").order;
        order.driver_id = Some("driver-1".to_string());

        assert!(is_participant(
            &order,
            "owner-1",
            &user("customer-1", Role::Client)
        ));
        assert!(is_participant(
            &order,
            "owner-1",
            &user("driver-1", Role::Driver)
        ));
        assert!(is_participant(
            &order,
            "owner-1",
            &user("owner-1", Role::Owner)
        ));
        assert!(!is_participant(
            &order,
            "owner-1",
            &user("somebody-else", Role::Client)
        ));
    }
}
