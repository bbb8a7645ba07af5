use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::{OwnListing, PublicUser, User},
    error::ApiError,
    lifecycle::ListingStatus,
    storage::allowed_extension,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub total_listings: i64,
    pub active_listings: i64,
}

pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, net_id, name, profile_picture, bio, is_verified, created_at, \
         updated_at FROM users WHERE id = $1",
    )
    .bind(auth.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    let total_listings: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM listings WHERE seller_id = $1")
            .bind(auth.id)
            .fetch_one(&state.pool)
            .await?;

    let active_listings: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM listings WHERE seller_id = $1 AND status = 'active'",
    )
    .bind(auth.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ProfileResponse { user, total_listings, active_listings }))
}

#[derive(Debug, Default, Deserialize)]
pub struct OwnListingsQuery {
    pub status: Option<String>,
}

/// The seller sees their own listings in every status; `status` narrows to
/// one of them.
pub async fn own_listings(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OwnListingsQuery>,
) -> Result<Json<Vec<OwnListing>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            ListingStatus::parse(s).ok_or(ApiError::field("status", "Invalid status"))
        })
        .transpose()?;

    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT l.id, l.seller_id, l.title, l.description, l.price, l.category, \
         l.condition_status, l.exchange_point_id, l.images, l.status, l.views, \
         l.created_at, l.updated_at, ep.name AS exchange_point_name \
         FROM listings l \
         LEFT JOIN exchange_points ep ON l.exchange_point_id = ep.id \
         WHERE l.seller_id = ",
    );
    qb.push_bind(auth.id);
    if let Some(status) = status {
        qb.push(" AND l.status = ");
        qb.push_bind(status.as_str());
    }
    qb.push(" ORDER BY l.created_at DESC");

    let listings = qb
        .build_query_as::<OwnListing>()
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(listings))
}

#[derive(Debug, Default, Validate)]
struct UpdateProfile {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    bio: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<User>, ApiError> {
    let mut payload = UpdateProfile::default();
    let mut picture: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };
        match name.as_str() {
            "name" => {
                let value = field.text().await?;
                payload.name = (!value.is_empty()).then_some(value);
            }
            "bio" => payload.bio = Some(field.text().await?),
            "profile_picture" => {
                let ext = field
                    .file_name()
                    .and_then(allowed_extension)
                    .ok_or_else(|| {
                        ApiError::field("profile_picture", "Only image files are allowed")
                    })?;
                let data = field.bytes().await?;
                picture = Some(state.images.upload(data, ext).await?);
            }
            _ => {}
        }
    }
    payload.validate()?;

    if payload.name.is_none() && payload.bio.is_none() && picture.is_none() {
        return Err(ApiError::BadRequest("No updates provided"));
    }

    let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");
    if let Some(name) = payload.name {
        qb.push(", name = ");
        qb.push_bind(name);
    }
    if let Some(bio) = payload.bio {
        qb.push(", bio = ");
        qb.push_bind(bio);
    }
    if let Some(picture) = picture {
        qb.push(", profile_picture = ");
        qb.push_bind(picture);
    }
    qb.push(" WHERE id = ");
    qb.push_bind(auth.id);
    qb.build().execute(&state.pool).await?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, net_id, name, profile_picture, bio, is_verified, created_at, \
         updated_at FROM users WHERE id = $1",
    )
    .bind(auth.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(user))
}

#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    pub listings: Vec<OwnListing>,
}

/// Public profile: no email, and only a preview of active listings.
pub async fn public_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let user = sqlx::query_as::<_, PublicUser>(
        "SELECT id, net_id, name, profile_picture, bio, is_verified, created_at \
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    let listings = sqlx::query_as::<_, OwnListing>(
        "SELECT l.id, l.seller_id, l.title, l.description, l.price, l.category, \
         l.condition_status, l.exchange_point_id, l.images, l.status, l.views, \
         l.created_at, l.updated_at, ep.name AS exchange_point_name \
         FROM listings l \
         LEFT JOIN exchange_points ep ON l.exchange_point_id = ep.id \
         WHERE l.seller_id = $1 AND l.status = 'active' \
         ORDER BY l.created_at DESC \
         LIMIT 6",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(PublicProfileResponse { user, listings }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: AuthUser,
}

#[allow(clippy::unused_async)]
pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse { user: auth })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_boundaries() {
        let ok = UpdateProfile {
            name: Some("Jane Doe".to_owned()),
            bio: Some(String::new()),
        };
        assert!(ok.validate().is_ok());

        let short_name = UpdateProfile { name: Some("J".to_owned()), bio: None };
        assert!(short_name.validate().is_err());

        let long_bio = UpdateProfile { name: None, bio: Some("x".repeat(501)) };
        assert!(long_bio.validate().is_err());
    }
}
