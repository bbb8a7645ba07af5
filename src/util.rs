use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::Listing;

/// Fetches a listing only when `seller_id` owns it. A miss means "not found
/// or not yours", and callers answer 404 either way so existence does not
/// leak.
pub async fn fetch_owned_listing(
    id: Uuid,
    seller_id: Uuid,
    db: &PgPool,
) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1 AND seller_id = $2")
        .bind(id)
        .bind(seller_id)
        .fetch_optional(db)
        .await
}

/// NetID is the local part of the institutional email address.
pub fn net_id_from_email(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_id_is_the_local_part() {
        assert_eq!(net_id_from_email("jdoe2@illinois.edu"), "jdoe2");
        assert_eq!(net_id_from_email("no-at-sign"), "no-at-sign");
        assert_eq!(net_id_from_email("a@b@c"), "a");
    }
}
