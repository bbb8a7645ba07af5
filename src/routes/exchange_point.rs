use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{entities::ExchangePoint, error::ApiError, AppState};

async fn active_points(state: &AppState) -> Result<Vec<ExchangePoint>, ApiError> {
    state
        .exchange_points_cache
        .try_get_with((), async {
            sqlx::query_as::<_, ExchangePoint>(
                "SELECT * FROM exchange_points WHERE is_active = TRUE ORDER BY name ASC",
            )
            .fetch_all(&state.pool)
            .await
        })
        .await
        .map_err(|err| ApiError::cached(&err))
}

pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExchangePoint>>, ApiError> {
    Ok(Json(active_points(&state).await?))
}

#[derive(Debug, Serialize)]
pub struct ExchangePointDetail {
    #[serde(flatten)]
    pub point: ExchangePoint,
    pub active_listings: i64,
}

/// Any point resolves here, active or not: retired points stay valid display
/// references for the listings that still name them.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExchangePointDetail>, ApiError> {
    let point = sqlx::query_as::<_, ExchangePoint>(
        "SELECT * FROM exchange_points WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound("Exchange point not found"))?;

    let active_listings: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM listings WHERE exchange_point_id = $1 AND status = 'active'",
    )
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ExchangePointDetail { point, active_listings }))
}

/// Points without a zone group under "Other".
fn group_by_zone(points: Vec<ExchangePoint>) -> BTreeMap<String, Vec<ExchangePoint>> {
    let mut grouped: BTreeMap<String, Vec<ExchangePoint>> = BTreeMap::new();
    for point in points {
        let zone = point.zone.clone().unwrap_or_else(|| String::from("Other"));
        grouped.entry(zone).or_default().push(point);
    }
    grouped
}

pub async fn grouped_by_zone(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Vec<ExchangePoint>>>, ApiError> {
    let points = active_points(&state).await?;
    Ok(Json(group_by_zone(points)))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn point(name: &str, zone: Option<&str>) -> ExchangePoint {
        ExchangePoint {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            location: "Campus".to_owned(),
            description: None,
            zone: zone.map(ToOwned::to_owned),
            latitude: None,
            longitude: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn groups_by_zone_and_defaults_missing_to_other() {
        let grouped = group_by_zone(vec![
            point("Union", Some("Central Campus")),
            point("Grainger", Some("Engineering Campus")),
            point("Library", Some("Central Campus")),
            point("Coffee Row", None),
        ]);

        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped["Central Campus"].len(), 2);
        assert_eq!(grouped["Engineering Campus"].len(), 1);
        assert_eq!(grouped["Other"].len(), 1);
    }

    #[test]
    fn name_order_is_preserved_within_a_zone() {
        // active_points comes back name-sorted; grouping must keep it.
        let grouped = group_by_zone(vec![
            point("Illini Union", Some("Central Campus")),
            point("Main Library", Some("Central Campus")),
        ]);
        let names: Vec<&str> = grouped["Central Campus"]
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["Illini Union", "Main Library"]);
    }
}
