use crate::utils::pagination::{Paginated, Pagination};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use ulid::Ulid;

type Result<T> = std::result::Result<T, Error>;

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub address: String,
    pub cover_image: String,
    pub category_id: Option<String>,
    pub owner_id: String,
    pub is_promoted: bool,
    pub promoted_until: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

pub struct CreateRestaurantPayload {
    pub name: String,
    pub address: String,
    pub cover_image: String,
    pub category_id: String,
    pub owner_id: String,
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub async fn create<'e, E: PgExecutor<'e>>(
    e: E,
    payload: CreateRestaurantPayload,
) -> Result<Restaurant> {
    sqlx::query_as::<_, Restaurant>(
        "
        INSERT INTO restaurants (id, name, address, cover_image, category_id, owner_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.name)
    .bind(payload.address)
    .bind(payload.cover_image)
    .bind(payload.category_id)
    .bind(payload.owner_id)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while creating a restaurant: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<Option<Restaurant>> {
    sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE id = $1")
        .bind(&id)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while fetching restaurant with id {}: {}",
                id,
                err
            );
            Error::UnexpectedError
        })
}

#[derive(Deserialize, Default)]
pub struct Filters {
    pub search: Option<String>,
    pub category_id: Option<String>,
}

/// Promoted restaurants sort ahead of the rest; that is what the promotion
/// buys.
pub async fn find_many<'e, E: PgExecutor<'e> + Copy>(
    e: E,
    pagination: Pagination,
    filters: Filters,
) -> Result<Paginated<Restaurant>> {
    let items = sqlx::query_as::<_, Restaurant>(
        "
        SELECT * FROM restaurants
        WHERE
            name ILIKE CONCAT('%', COALESCE($3, name), '%')
            AND ($4::varchar IS NULL OR category_id = $4)
        ORDER BY is_promoted DESC, created_at DESC
        LIMIT $1
        OFFSET $2
        ",
    )
    .bind(pagination.limit())
    .bind(pagination.offset())
    .bind(&filters.search)
    .bind(&filters.category_id)
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while fetching restaurants: {}", err);
        Error::UnexpectedError
    })?;

    let total = sqlx::query_scalar::<_, i64>(
        "
        SELECT COUNT(id) FROM restaurants
        WHERE
            name ILIKE CONCAT('%', COALESCE($1, name), '%')
            AND ($2::varchar IS NULL OR category_id = $2)
        ",
    )
    .bind(&filters.search)
    .bind(&filters.category_id)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while counting restaurants: {}", err);
        Error::UnexpectedError
    })?;

    Ok(Paginated::new(
        items,
        total as u32,
        pagination.page,
        pagination.per_page,
    ))
}

pub async fn find_by_owner_id<'e, E: PgExecutor<'e>>(
    e: E,
    owner_id: String,
) -> Result<Vec<Restaurant>> {
    sqlx::query_as::<_, Restaurant>(
        "SELECT * FROM restaurants WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(&owner_id)
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while fetching restaurants owned by {}: {}",
            owner_id,
            err
        );
        Error::UnexpectedError
    })
}

pub struct UpdateRestaurantPayload {
    pub name: Option<String>,
    pub address: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<String>,
}

pub async fn update_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    payload: UpdateRestaurantPayload,
) -> Result<()> {
    sqlx::query(
        "
        UPDATE restaurants SET
            name = COALESCE($1, name),
            address = COALESCE($2, address),
            cover_image = COALESCE($3, cover_image),
            category_id = COALESCE($4, category_id),
            updated_at = NOW()
        WHERE id = $5
        ",
    )
    .bind(payload.name)
    .bind(payload.address)
    .bind(payload.cover_image)
    .bind(payload.category_id)
    .bind(&id)
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!(
            "Error occurred while updating restaurant with id {}: {}",
            id,
            err
        );
        Error::UnexpectedError
    })
}

pub async fn delete_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<()> {
    sqlx::query("DELETE FROM restaurants WHERE id = $1")
        .bind(&id)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!(
                "Error occurred while deleting restaurant with id {}: {}",
                id,
                err
            );
            Error::UnexpectedError
        })
}

pub async fn set_promotion<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    promoted_until: NaiveDateTime,
) -> Result<()> {
    sqlx::query(
        "
        UPDATE restaurants SET
            is_promoted = TRUE,
            promoted_until = $1,
            updated_at = NOW()
        WHERE id = $2
        ",
    )
    .bind(promoted_until)
    .bind(&id)
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!(
            "Error occurred while promoting restaurant with id {}: {}",
            id,
            err
        );
        Error::UnexpectedError
    })
}

/// Both promotion fields reset in the one statement so the pair is never
/// observed half-cleared.
pub async fn clear_promotion<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<()> {
    sqlx::query(
        "
        UPDATE restaurants SET
            is_promoted = FALSE,
            promoted_until = NULL,
            updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(&id)
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!(
            "Error occurred while unpromoting restaurant with id {}: {}",
            id,
            err
        );
        Error::UnexpectedError
    })
}

pub async fn find_promoted<'e, E: PgExecutor<'e>>(e: E) -> Result<Vec<Restaurant>> {
    sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE is_promoted = TRUE")
        .fetch_all(e)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while fetching promoted restaurants: {}",
                err
            );
            Error::UnexpectedError
        })
}
