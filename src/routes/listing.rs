use std::time::Instant;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use metrics::{histogram, increment_counter};
use serde::Serialize;
use serde_json::json;
use sqlx::{types::Json as Jsonb, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::{is_valid_category, is_valid_condition, ListingCard, ListingDetail, CATEGORIES},
    error::ApiError,
    lifecycle::ListingStatus,
    search::{self, ListingFilter, ListingQuery, PageRequest, SortKey},
    storage::allowed_extension,
    util::fetch_owned_listing,
    AppState,
};
use crate::{auth::AuthUser, entities::Listing};

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<ListingCard>,
    pub pagination: Pagination,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<ListingsResponse>, ApiError> {
    increment_counter!("exchange_listings_search");

    let filter = ListingFilter::from_query(&query);
    let sort = SortKey::parse(query.sort.as_deref());
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());

    let start = Instant::now();
    let listings = search::page_query(&filter, sort, page)
        .build_query_as::<ListingCard>()
        .fetch_all(&state.pool)
        .await?;
    histogram!("exchange_query", start.elapsed(), "type" => "search_listings");

    let start = Instant::now();
    let total: i64 = search::count_query(&filter)
        .build()
        .fetch_one(&state.pool)
        .await?
        .try_get(0)?;
    histogram!("exchange_query", start.elapsed(), "type" => "search_listings_count");

    Ok(Json(ListingsResponse {
        listings,
        pagination: Pagination {
            page: page.page,
            limit: page.limit,
            total,
            total_pages: page.total_pages(total),
        },
    }))
}

const DETAIL_SELECT: &str = "SELECT l.id, l.seller_id, l.title, l.description, l.price, \
     l.category, l.condition_status, l.exchange_point_id, l.images, l.status, l.views, \
     l.created_at, l.updated_at, \
     u.name AS seller_name, u.email AS seller_email, u.net_id AS seller_net_id, \
     u.profile_picture AS seller_picture, u.is_verified AS seller_verified, \
     ep.name AS exchange_point_name, ep.location AS exchange_point_location, \
     ep.description AS exchange_point_description \
     FROM listings l \
     JOIN users u ON l.seller_id = u.id \
     LEFT JOIN exchange_points ep ON l.exchange_point_id = ep.id \
     WHERE l.id = $1";

/// Single listing view. Each fetch bumps the view counter exactly once, with
/// a relative update so concurrent fetches don't lose increments.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingDetail>, ApiError> {
    increment_counter!("exchange_listing_detail");

    let bumped = sqlx::query("UPDATE listings SET views = views + 1 WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if bumped == 0 {
        return Err(ApiError::NotFound("Listing not found"));
    }

    let listing = sqlx::query_as::<_, ListingDetail>(DETAIL_SELECT)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("Listing not found"))?;

    Ok(Json(listing))
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn category_in_set(value: &str) -> Result<(), ValidationError> {
    if is_valid_category(value) {
        Ok(())
    } else {
        Err(invalid("category", "Invalid category"))
    }
}

fn condition_in_set(value: &str) -> Result<(), ValidationError> {
    if is_valid_condition(value) {
        Ok(())
    } else {
        Err(invalid("condition_status", "Invalid condition"))
    }
}

fn status_in_set(value: &str) -> Result<(), ValidationError> {
    if ListingStatus::parse(value).is_some() {
        Ok(())
    } else {
        Err(invalid("status", "Invalid status"))
    }
}

#[derive(Debug, Validate)]
struct CreateListing {
    #[validate(length(min = 3, max = 100, message = "Title must be 3-100 characters"))]
    title: String,
    #[validate(length(min = 10, max = 2000, message = "Description must be 10-2000 characters"))]
    description: String,
    #[validate(range(min = 0.01, message = "Price must be greater than 0"))]
    price: f64,
    #[validate(custom = "category_in_set")]
    category: String,
    #[validate(custom = "condition_in_set")]
    condition_status: String,
}

#[derive(Debug, Default, Validate)]
struct UpdateListing {
    #[validate(length(min = 3, max = 100, message = "Title must be 3-100 characters"))]
    title: Option<String>,
    #[validate(length(min = 10, max = 2000, message = "Description must be 10-2000 characters"))]
    description: Option<String>,
    // Marking down to free is allowed once the listing exists.
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    price: Option<f64>,
    #[validate(custom = "category_in_set")]
    category: Option<String>,
    #[validate(custom = "condition_in_set")]
    condition_status: Option<String>,
    #[validate(custom = "status_in_set")]
    status: Option<String>,
    exchange_point_id: Option<Uuid>,
}

/// Text fields and image parts pulled out of a multipart body. Empty text
/// values count as absent, matching how browser forms submit untouched
/// inputs.
#[derive(Debug, Default)]
struct ListingForm {
    title: Option<String>,
    description: Option<String>,
    price: Option<String>,
    category: Option<String>,
    condition_status: Option<String>,
    status: Option<String>,
    exchange_point_id: Option<String>,
    images: Vec<(Bytes, &'static str)>,
}

async fn read_listing_form(mut multipart: Multipart) -> Result<ListingForm, ApiError> {
    let mut form = ListingForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };

        if name == "images" {
            let ext = field
                .file_name()
                .and_then(allowed_extension)
                .ok_or_else(|| {
                    ApiError::field(
                        "images",
                        "Only image files (jpeg, jpg, png, webp) are allowed",
                    )
                })?;
            form.images.push((field.bytes().await?, ext));
            continue;
        }

        let value = field.text().await?;
        let value = (!value.is_empty()).then_some(value);
        match name.as_str() {
            "title" => form.title = value,
            "description" => form.description = value,
            "price" => form.price = value,
            "category" => form.category = value,
            "condition_status" => form.condition_status = value,
            "status" => form.status = value,
            "exchange_point_id" => form.exchange_point_id = value,
            _ => {}
        }
    }

    Ok(form)
}

fn parse_price(raw: Option<String>) -> Result<Option<f64>, ApiError> {
    raw.map(|s| {
        s.parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| ApiError::field("price", "Price must be a number"))
    })
    .transpose()
}

async fn active_exchange_point_exists(id: Uuid, state: &AppState) -> Result<bool, ApiError> {
    let found = sqlx::query("SELECT id FROM exchange_points WHERE id = $1 AND is_active = TRUE")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    Ok(found.is_some())
}

async fn store_images(
    images: Vec<(Bytes, &'static str)>,
    state: &AppState,
) -> Result<Vec<String>, ApiError> {
    let mut urls = Vec::with_capacity(images.len());
    for (data, ext) in images {
        urls.push(state.images.upload(data, ext).await?);
    }
    Ok(urls)
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_listing_form(multipart).await?;

    // Missing fields funnel into the same validation messages as
    // out-of-range ones.
    let payload = CreateListing {
        title: form.title.unwrap_or_default(),
        description: form.description.unwrap_or_default(),
        price: parse_price(form.price)?.unwrap_or_default(),
        category: form.category.unwrap_or_default(),
        condition_status: form.condition_status.unwrap_or_default(),
    };
    payload.validate()?;

    if form.images.is_empty() {
        return Err(ApiError::field("images", "At least one image is required"));
    }

    let exchange_point_id = form
        .exchange_point_id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ApiError::field("exchange_point_id", "Exchange point is required"))?;
    if !active_exchange_point_exists(exchange_point_id, &state).await? {
        return Err(ApiError::field("exchange_point_id", "Invalid exchange point"));
    }

    let images = store_images(form.images, &state).await?;
    let id = Uuid::new_v4();

    let listing = sqlx::query_as::<_, Listing>(
        "INSERT INTO listings (id, seller_id, title, description, price, category, \
         condition_status, exchange_point_id, images, status, views, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active', 0, NOW(), NOW()) \
         RETURNING *",
    )
    .bind(id)
    .bind(user.id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(&payload.category)
    .bind(&payload.condition_status)
    .bind(exchange_point_id)
    .bind(Jsonb(images))
    .fetch_one(&state.pool)
    .await?;

    increment_counter!("exchange_listing_created");
    info!("listing {} created by {}", listing.id, user.net_id);

    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Listing>, ApiError> {
    let existing = fetch_owned_listing(id, user.id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound("Listing not found or unauthorized"))?;

    let form = read_listing_form(multipart).await?;

    let exchange_point_id = form
        .exchange_point_id
        .as_deref()
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| ApiError::field("exchange_point_id", "Invalid exchange point"))
        })
        .transpose()?;

    let payload = UpdateListing {
        title: form.title,
        description: form.description,
        price: parse_price(form.price)?,
        category: form.category,
        condition_status: form.condition_status,
        status: form.status,
        exchange_point_id,
    };
    payload.validate()?;

    if let Some(point) = payload.exchange_point_id {
        if !active_exchange_point_exists(point, &state).await? {
            return Err(ApiError::field("exchange_point_id", "Invalid exchange point"));
        }
    }

    if existing.images.0.is_empty() && form.images.is_empty() {
        return Err(ApiError::field("images", "At least one image is required"));
    }
    let new_images = store_images(form.images, &state).await?;

    let mut qb = QueryBuilder::<Postgres>::new("UPDATE listings SET updated_at = NOW()");
    if let Some(title) = payload.title {
        qb.push(", title = ");
        qb.push_bind(title);
    }
    if let Some(description) = payload.description {
        qb.push(", description = ");
        qb.push_bind(description);
    }
    if let Some(price) = payload.price {
        qb.push(", price = ");
        qb.push_bind(price);
    }
    if let Some(category) = payload.category {
        qb.push(", category = ");
        qb.push_bind(category);
    }
    if let Some(condition) = payload.condition_status {
        qb.push(", condition_status = ");
        qb.push_bind(condition);
    }
    if let Some(status) = payload.status {
        qb.push(", status = ");
        qb.push_bind(status);
    }
    if let Some(point) = payload.exchange_point_id {
        qb.push(", exchange_point_id = ");
        qb.push_bind(point);
    }
    if !new_images.is_empty() {
        // Appended with a relative jsonb merge so two concurrent updates to
        // the same listing both land their images.
        qb.push(", images = images || ");
        qb.push_bind(Jsonb(new_images));
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb.build().execute(&state.pool).await?;

    let updated = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    fetch_owned_listing(id, user.id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound("Listing not found or unauthorized"))?;

    // Favorites referencing the listing go with it via the FK cascade.
    sqlx::query("DELETE FROM listings WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    info!("listing {id} deleted by {}", user.net_id);

    Ok(Json(json!({ "message": "Listing deleted successfully" })))
}

#[allow(clippy::unused_async)]
pub async fn categories() -> Json<&'static [crate::entities::CategoryMeta]> {
    Json(CATEGORIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_boundaries() {
        let valid = CreateListing {
            title: "Mini fridge".to_owned(),
            description: "Compact fridge, works perfectly.".to_owned(),
            price: 0.01,
            category: "furniture".to_owned(),
            condition_status: "good".to_owned(),
        };
        assert!(valid.validate().is_ok());

        let short_title = CreateListing { title: "ab".to_owned(), ..copy(&valid) };
        assert!(short_title.validate().is_err());

        let free = CreateListing { price: 0.0, ..copy(&valid) };
        assert!(free.validate().is_err());

        let bad_category = CreateListing { category: "weapons".to_owned(), ..copy(&valid) };
        assert!(bad_category.validate().is_err());

        let bad_condition = CreateListing { condition_status: "mint".to_owned(), ..copy(&valid) };
        assert!(bad_condition.validate().is_err());
    }

    #[test]
    fn update_accepts_price_zero_and_partial_fields() {
        let update = UpdateListing { price: Some(0.0), ..UpdateListing::default() };
        assert!(update.validate().is_ok());

        let update = UpdateListing { price: Some(-1.0), ..UpdateListing::default() };
        assert!(update.validate().is_err());

        let update = UpdateListing { status: Some("reserved".to_owned()), ..UpdateListing::default() };
        assert!(update.validate().is_ok());

        let update = UpdateListing { status: Some("archived".to_owned()), ..UpdateListing::default() };
        assert!(update.validate().is_err());

        // Nothing supplied is fine; the handler still refreshes updated_at.
        assert!(UpdateListing::default().validate().is_ok());
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price(Some("19.99".to_owned())).unwrap(), Some(19.99));
        assert_eq!(parse_price(None).unwrap(), None);
        assert!(parse_price(Some("abc".to_owned())).is_err());
        assert!(parse_price(Some("inf".to_owned())).is_err());
    }

    fn copy(payload: &CreateListing) -> CreateListing {
        CreateListing {
            title: payload.title.clone(),
            description: payload.description.clone(),
            price: payload.price,
            category: payload.category.clone(),
            condition_status: payload.condition_status.clone(),
        }
    }
}
