use crate::utils::pagination::{Paginated, Pagination};
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgExecutor};
use ulid::Ulid;

type Result<T> = std::result::Result<T, Error>;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Cooking,
    Cooked,
    PickedUp,
    Delivered,
}

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub driver_id: Option<String>,
    pub restaurant_id: String,
    pub status: OrderStatus,
    pub total: BigDecimal,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

/// The customer's pick for one dish option, e.g. `{"name": "Size",
/// "choice": "L"}` or just `{"name": "Extra cheese"}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItemOption {
    pub name: String,
    pub choice: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub dish_id: String,
    pub options: Json<Vec<OrderItemOption>>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

pub struct CreateOrderPayload {
    pub customer_id: String,
    pub restaurant_id: String,
    pub total: BigDecimal,
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub async fn create<'e, E: PgExecutor<'e>>(e: E, payload: CreateOrderPayload) -> Result<Order> {
    sqlx::query_as::<_, Order>(
        "
        INSERT INTO orders (id, customer_id, restaurant_id, total)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.customer_id)
    .bind(payload.restaurant_id)
    .bind(payload.total)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while creating an order: {}", err);
        Error::UnexpectedError
    })
}

pub async fn create_item<'e, E: PgExecutor<'e>>(
    e: E,
    order_id: String,
    dish_id: String,
    options: Vec<OrderItemOption>,
) -> Result<OrderItem> {
    sqlx::query_as::<_, OrderItem>(
        "
        INSERT INTO order_items (id, order_id, dish_id, options)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(&order_id)
    .bind(dish_id)
    .bind(Json(options))
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while creating an item for order {}: {}",
            order_id,
            err
        );
        Error::UnexpectedError
    })
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<Option<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(&id)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching order with id {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn find_items_by_order_id<'e, E: PgExecutor<'e>>(
    e: E,
    order_id: String,
) -> Result<Vec<OrderItem>> {
    sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at",
    )
    .bind(&order_id)
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while fetching items of order {}: {}",
            order_id,
            err
        );
        Error::UnexpectedError
    })
}

#[derive(Default)]
pub struct Filters {
    pub customer_id: Option<String>,
    pub driver_id: Option<String>,
    pub restaurant_owner_id: Option<String>,
    pub status: Option<OrderStatus>,
}

pub async fn find_many<'e, E: PgExecutor<'e> + Copy>(
    e: E,
    pagination: Pagination,
    filters: Filters,
) -> Result<Paginated<Order>> {
    let items = sqlx::query_as::<_, Order>(
        "
        SELECT * FROM orders
        WHERE
            ($3::varchar IS NULL OR customer_id = $3)
            AND ($4::varchar IS NULL OR driver_id = $4)
            AND ($5::varchar IS NULL OR restaurant_id IN (
                SELECT id FROM restaurants WHERE owner_id = $5
            ))
            AND ($6::order_status IS NULL OR status = $6)
        ORDER BY created_at DESC
        LIMIT $1
        OFFSET $2
        ",
    )
    .bind(pagination.limit())
    .bind(pagination.offset())
    .bind(&filters.customer_id)
    .bind(&filters.driver_id)
    .bind(&filters.restaurant_owner_id)
    .bind(filters.status)
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while fetching orders: {}", err);
        Error::UnexpectedError
    })?;

    let total = sqlx::query_scalar::<_, i64>(
        "
        SELECT COUNT(id) FROM orders
        WHERE
            ($1::varchar IS NULL OR customer_id = $1)
            AND ($2::varchar IS NULL OR driver_id = $2)
            AND ($3::varchar IS NULL OR restaurant_id IN (
                SELECT id FROM restaurants WHERE owner_id = $3
            ))
            AND ($4::order_status IS NULL OR status = $4)
        ",
    )
    .bind(&filters.customer_id)
    .bind(&filters.driver_id)
    .bind(&filters.restaurant_owner_id)
    .bind(filters.status)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while counting orders: {}", err);
        Error::UnexpectedError
    })?;

    Ok(Paginated::new(
        items,
        total as u32,
        pagination.page,
        pagination.per_page,
    ))
}

pub async fn update_status<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    status: OrderStatus,
) -> Result<Option<Order>> {
    sqlx::query_as::<_, Order>(
        "
        UPDATE orders SET
            status = $1,
            updated_at = NOW()
        WHERE id = $2
        RETURNING *
        ",
    )
    .bind(status)
    .bind(&id)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while updating status of order {}: {}",
            id,
            err
        );
        Error::UnexpectedError
    })
}

/// Claims the order for a driver. Yields `None` when another driver got
/// there first; the guard and the write are one statement.
pub async fn assign_driver<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    driver_id: String,
) -> Result<Option<Order>> {
    sqlx::query_as::<_, Order>(
        "
        UPDATE orders SET
            driver_id = $1,
            updated_at = NOW()
        WHERE id = $2 AND driver_id IS NULL
        RETURNING *
        ",
    )
    .bind(driver_id)
    .bind(&id)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while assigning a driver to order {}: {}",
            id,
            err
        );
        Error::UnexpectedError
    })
}
