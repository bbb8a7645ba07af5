#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use moka::future::Cache;
pub use sqlx::PgPool;

use entities::ExchangePoint;
use storage::ImageStore;

pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod lifecycle;
pub mod routes;
pub mod search;
pub mod storage;
pub mod util;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub images: Arc<dyn ImageStore>,
    // Exchange points are static reference data, so the active set is cached.
    pub exchange_points_cache: Cache<(), Vec<ExchangePoint>>,
}
