use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub condition_status: String,
    pub exchange_point_id: Option<Uuid>,
    pub images: Json<Vec<String>>,
    pub status: String,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Search result row, denormalized with the seller and exchange point
/// display fields the marketplace grid needs.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ListingCard {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub condition_status: String,
    pub exchange_point_id: Option<Uuid>,
    pub images: Json<Vec<String>>,
    pub status: String,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seller_name: String,
    pub seller_net_id: String,
    pub seller_picture: Option<String>,
    pub exchange_point_name: Option<String>,
    pub exchange_point_location: Option<String>,
}

/// Single-listing view, with the extra seller/exchange point detail the
/// listing page shows.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ListingDetail {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub condition_status: String,
    pub exchange_point_id: Option<Uuid>,
    pub images: Json<Vec<String>>,
    pub status: String,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seller_name: String,
    pub seller_email: String,
    pub seller_net_id: String,
    pub seller_picture: Option<String>,
    pub seller_verified: bool,
    pub exchange_point_name: Option<String>,
    pub exchange_point_location: Option<String>,
    pub exchange_point_description: Option<String>,
}

/// Owner-scoped row. Any status is visible to the seller themselves.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OwnListing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub condition_status: String,
    pub exchange_point_id: Option<Uuid>,
    pub images: Json<Vec<String>>,
    pub status: String,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub exchange_point_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FavoriteListing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub condition_status: String,
    pub exchange_point_id: Option<Uuid>,
    pub images: Json<Vec<String>>,
    pub status: String,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seller_name: String,
    pub seller_net_id: String,
    pub seller_picture: Option<String>,
    pub exchange_point_name: Option<String>,
    pub exchange_point_location: Option<String>,
    pub favorited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExchangePoint {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub net_id: String,
    pub name: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public profile projection. No email.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub net_id: String,
    pub name: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryMeta {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

pub const CATEGORIES: &[CategoryMeta] = &[
    CategoryMeta { id: "textbooks", name: "Textbooks", icon: "📚" },
    CategoryMeta { id: "electronics", name: "Electronics", icon: "💻" },
    CategoryMeta { id: "furniture", name: "Furniture", icon: "🪑" },
    CategoryMeta { id: "clothing", name: "Clothing", icon: "👕" },
    CategoryMeta { id: "sports", name: "Sports & Outdoors", icon: "⚽" },
    CategoryMeta { id: "tickets", name: "Tickets & Events", icon: "🎟️" },
    CategoryMeta { id: "transportation", name: "Transportation", icon: "🚲" },
    CategoryMeta { id: "housing", name: "Housing & Sublease", icon: "🏠" },
    CategoryMeta { id: "services", name: "Services", icon: "🔧" },
    CategoryMeta { id: "other", name: "Other", icon: "📦" },
];

pub const CONDITIONS: &[&str] = &["new", "like_new", "good", "fair", "poor"];

pub fn is_valid_category(value: &str) -> bool {
    CATEGORIES.iter().any(|c| c.id == value)
}

pub fn is_valid_condition(value: &str) -> bool {
    CONDITIONS.contains(&value)
}
