use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{error::ApiError, AppState};

pub mod exchange_point;
pub mod favorite;
pub mod listing;
pub mod user;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/me", get(user::me))
        .route("/api/listings", get(listing::list).post(listing::create))
        .route("/api/listings/meta/categories", get(listing::categories))
        .route(
            "/api/listings/:id",
            get(listing::get).put(listing::update).delete(listing::delete),
        )
        .route(
            "/api/users/profile",
            get(user::profile).put(user::update_profile),
        )
        .route("/api/users/listings", get(user::own_listings))
        .route("/api/users/:id", get(user::public_profile))
        .route("/api/exchange-points", get(exchange_point::list))
        .route(
            "/api/exchange-points/grouped/zones",
            get(exchange_point::grouped_by_zone),
        )
        .route("/api/exchange-points/:id", get(exchange_point::get))
        .route("/api/favorites", get(favorite::list))
        .route("/api/favorites/check/:listing_id", get(favorite::check))
        .route(
            "/api/favorites/:listing_id",
            post(favorite::add).delete(favorite::remove),
        )
}

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(json!({
        "status": "ok",
        "message": "Campus Exchange API is running",
        "database": "connected",
    })))
}
