use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use ulid::Ulid;

type Result<T> = std::result::Result<T, Error>;

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub cover_image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Serialize, Clone, Debug, sqlx::FromRow)]
pub struct CategoryWithRestaurantCount {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub cover_image: Option<String>,
    pub restaurant_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Categories are created implicitly: naming one on a restaurant fetches it
/// by slug or inserts it. The no-op conflict update makes RETURNING yield
/// the existing row.
pub async fn find_or_create_by_name<'e, E: PgExecutor<'e>>(e: E, name: String) -> Result<Category> {
    let slug = slugify(&name);

    sqlx::query_as::<_, Category>(
        "
        INSERT INTO categories (id, name, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug) DO UPDATE SET name = categories.name
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(name.trim())
    .bind(&slug)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while fetching or creating category with slug {}: {}",
            slug,
            err
        );
        Error::UnexpectedError
    })
}

pub async fn find_by_slug<'e, E: PgExecutor<'e>>(e: E, slug: String) -> Result<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
        .bind(&slug)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while fetching category with slug {}: {}",
                slug,
                err
            );
            Error::UnexpectedError
        })
}

pub async fn find_many_with_count<'e, E: PgExecutor<'e>>(
    e: E,
) -> Result<Vec<CategoryWithRestaurantCount>> {
    sqlx::query_as::<_, CategoryWithRestaurantCount>(
        "
        SELECT
            categories.*,
            COUNT(restaurants.id) AS restaurant_count
        FROM categories
        LEFT JOIN restaurants ON restaurants.category_id = categories.id
        GROUP BY categories.id
        ORDER BY categories.name
        ",
    )
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while fetching categories: {}", err);
        Error::UnexpectedError
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes_spaces() {
        assert_eq!(slugify("Fast Food"), "fast-food");
        assert_eq!(slugify("  Korean BBQ  "), "korean-bbq");
        assert_eq!(slugify("pizza"), "pizza");
    }
}
