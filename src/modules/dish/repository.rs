use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgExecutor};
use ulid::Ulid;

type Result<T> = std::result::Result<T, Error>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DishOptionChoice {
    pub name: String,
    pub extra: Option<BigDecimal>,
}

/// One configurable aspect of a dish, priced either flat (`extra`) or per
/// selected choice.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DishOption {
    pub name: String,
    pub extra: Option<BigDecimal>,
    pub choices: Option<Vec<DishOptionChoice>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Dish {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub photo: Option<String>,
    pub options: Json<Vec<DishOption>>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

pub struct CreateDishPayload {
    pub restaurant_id: String,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub photo: Option<String>,
    pub options: Vec<DishOption>,
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub async fn create<'e, E: PgExecutor<'e>>(e: E, payload: CreateDishPayload) -> Result<Dish> {
    sqlx::query_as::<_, Dish>(
        "
        INSERT INTO dishes (id, restaurant_id, name, description, price, photo, options)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.restaurant_id)
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.price)
    .bind(payload.photo)
    .bind(Json(payload.options))
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while creating a dish: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<Option<Dish>> {
    sqlx::query_as::<_, Dish>("SELECT * FROM dishes WHERE id = $1")
        .bind(&id)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching dish with id {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn find_by_restaurant_id<'e, E: PgExecutor<'e>>(
    e: E,
    restaurant_id: String,
) -> Result<Vec<Dish>> {
    sqlx::query_as::<_, Dish>(
        "SELECT * FROM dishes WHERE restaurant_id = $1 ORDER BY created_at",
    )
    .bind(&restaurant_id)
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while fetching dishes for restaurant {}: {}",
            restaurant_id,
            err
        );
        Error::UnexpectedError
    })
}

pub struct UpdateDishPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub photo: Option<String>,
    pub options: Option<Vec<DishOption>>,
}

pub async fn update_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    payload: UpdateDishPayload,
) -> Result<()> {
    sqlx::query(
        "
        UPDATE dishes SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            price = COALESCE($3, price),
            photo = COALESCE($4, photo),
            options = COALESCE($5, options),
            updated_at = NOW()
        WHERE id = $6
        ",
    )
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.price)
    .bind(payload.photo)
    .bind(payload.options.map(Json))
    .bind(&id)
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!("Error occurred while updating dish with id {}: {}", id, err);
        Error::UnexpectedError
    })
}

pub async fn delete_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<()> {
    sqlx::query("DELETE FROM dishes WHERE id = $1")
        .bind(&id)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!("Error occurred while deleting dish with id {}: {}", id, err);
            Error::UnexpectedError
        })
}
