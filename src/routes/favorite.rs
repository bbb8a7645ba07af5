use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use metrics::increment_counter;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::FavoriteListing,
    error::{is_unique_violation, ApiError},
    AppState,
};

const FAVORITES_SELECT: &str = "SELECT l.id, l.seller_id, l.title, l.description, l.price, \
     l.category, l.condition_status, l.exchange_point_id, l.images, l.status, l.views, \
     l.created_at, l.updated_at, \
     u.name AS seller_name, u.net_id AS seller_net_id, u.profile_picture AS seller_picture, \
     ep.name AS exchange_point_name, ep.location AS exchange_point_location, \
     f.created_at AS favorited_at \
     FROM favorites f \
     JOIN listings l ON f.listing_id = l.id \
     JOIN users u ON l.seller_id = u.id \
     LEFT JOIN exchange_points ep ON l.exchange_point_id = ep.id \
     WHERE f.user_id = $1 \
     ORDER BY f.created_at DESC";

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<FavoriteListing>>, ApiError> {
    let favorites = sqlx::query_as::<_, FavoriteListing>(FAVORITES_SELECT)
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(favorites))
}

#[derive(Debug, Serialize)]
pub struct FavoriteCheck {
    #[serde(rename = "isFavorited")]
    pub is_favorited: bool,
}

pub async fn check(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<FavoriteCheck>, ApiError> {
    let is_favorited: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND listing_id = $2)",
    )
    .bind(user.id)
    .bind(listing_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(FavoriteCheck { is_favorited }))
}

pub async fn add(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let listing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_optional(&state.pool)
        .await?;
    if listing.is_none() {
        return Err(ApiError::NotFound("Listing not found"));
    }

    let id = Uuid::new_v4();
    let inserted = sqlx::query(
        "INSERT INTO favorites (id, user_id, listing_id, created_at) VALUES ($1, $2, $3, NOW())",
    )
    .bind(id)
    .bind(user.id)
    .bind(listing_id)
    .execute(&state.pool)
    .await;

    match inserted {
        Ok(_) => {
            increment_counter!("exchange_favorite_added");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": "Added to favorites", "id": id })),
            ))
        }
        // The unique (user_id, listing_id) constraint decides the loser of a
        // concurrent double-add.
        Err(err) if is_unique_violation(&err) => {
            Err(ApiError::Conflict("Listing already in favorites"))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND listing_id = $2")
        .bind(user.id)
        .bind(listing_id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if removed == 0 {
        return Err(ApiError::NotFound("Favorite not found"));
    }

    Ok(Json(json!({ "message": "Removed from favorites" })))
}
