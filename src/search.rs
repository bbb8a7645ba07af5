//! Listing search: filter parsing and query composition.
//!
//! Every optional filter is folded into one [`ListingFilter`] value first,
//! and a single translation step maps that value onto both the paged result
//! query and the count query. Keeping one predicate source is what makes the
//! reported `total` agree with the rows a walk over all pages would return.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::entities::Listing;

pub const DEFAULT_PAGE_SIZE: i64 = 12;

/// Raw query-string inputs. Numeric fields arrive as strings on purpose:
/// unparseable numbers mean "no filter", not a 400.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub condition: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub exchange_point: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    /// Exact match on the raw value. An unknown category matches no rows,
    /// it does not error.
    pub category: Option<String>,
    /// Membership match. Applied identically to the page and count queries.
    pub conditions: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// `None` = filter absent. `Some(empty)` = the parameter was supplied
    /// but held no valid ids, which can match nothing.
    pub exchange_points: Option<Vec<Uuid>>,
    pub search: Option<String>,
}

impl ListingFilter {
    pub fn from_query(query: &ListingQuery) -> Self {
        let conditions = query
            .condition
            .as_deref()
            .map(split_csv)
            .unwrap_or_default();

        let exchange_points = query.exchange_point.as_deref().map(|raw| {
            split_csv(raw)
                .iter()
                .filter_map(|s| Uuid::parse_str(s).ok())
                .collect()
        });

        Self {
            category: query.category.clone().filter(|s| !s.is_empty()),
            conditions,
            min_price: parse_price(query.min_price.as_deref()),
            max_price: parse_price(query.max_price.as_deref()),
            exchange_points,
            search: query.search.clone().filter(|s| !s.is_empty()),
        }
    }

    /// Reference semantics of the SQL predicate, over a fully loaded row.
    /// The search endpoint itself never pulls the whole table through this;
    /// it exists so the query translation can be checked against a plain
    /// in-memory filter.
    pub fn matches(&self, listing: &Listing) -> bool {
        if listing.status != "active" {
            return false;
        }
        if let Some(category) = &self.category {
            if listing.category != *category {
                return false;
            }
        }
        if !self.conditions.is_empty() && !self.conditions.contains(&listing.condition_status) {
            return false;
        }
        if let Some(min) = self.min_price {
            if listing.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if listing.price > max {
                return false;
            }
        }
        if let Some(points) = &self.exchange_points {
            match listing.exchange_point_id {
                Some(id) if points.contains(&id) => {}
                _ => return false,
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_title = listing.title.to_lowercase().contains(&term);
            let in_description = listing.description.to_lowercase().contains(&term);
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
}

impl SortKey {
    /// Unknown sort values fall back to newest-first, like an absent one.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("oldest") => Self::Oldest,
            Some("price_low") => Self::PriceLow,
            Some("price_high") => Self::PriceHigh,
            _ => Self::Newest,
        }
    }

    pub const fn order_clause(self) -> &'static str {
        match self {
            Self::Newest => "l.created_at DESC",
            Self::Oldest => "l.created_at ASC",
            Self::PriceLow => "l.price ASC",
            Self::PriceHigh => "l.price DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page, limit }
    }

    pub const fn offset(self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub const fn total_pages(self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

const PAGE_SELECT: &str = "SELECT l.id, l.seller_id, l.title, l.description, l.price, \
     l.category, l.condition_status, l.exchange_point_id, l.images, l.status, l.views, \
     l.created_at, l.updated_at, \
     u.name AS seller_name, u.net_id AS seller_net_id, u.profile_picture AS seller_picture, \
     ep.name AS exchange_point_name, ep.location AS exchange_point_location \
     FROM listings l \
     JOIN users u ON l.seller_id = u.id \
     LEFT JOIN exchange_points ep ON l.exchange_point_id = ep.id \
     WHERE l.status = 'active'";

const COUNT_SELECT: &str = "SELECT COUNT(*) FROM listings l WHERE l.status = 'active'";

/// Paged result query, joined with the seller and exchange point display
/// fields.
pub fn page_query(
    filter: &ListingFilter,
    sort: SortKey,
    page: PageRequest,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(PAGE_SELECT);
    push_predicate(&mut qb, filter);
    qb.push(" ORDER BY ");
    qb.push(sort.order_clause());
    qb.push(" LIMIT ");
    qb.push_bind(page.limit);
    qb.push(" OFFSET ");
    qb.push_bind(page.offset());
    qb
}

/// Count query over the same predicate, with no joins. The predicate only
/// touches `listings` columns, so dropping the joins cannot change the count.
pub fn count_query(filter: &ListingFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(COUNT_SELECT);
    push_predicate(&mut qb, filter);
    qb
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, filter: &ListingFilter) {
    if let Some(category) = &filter.category {
        qb.push(" AND l.category = ");
        qb.push_bind(category.clone());
    }

    if !filter.conditions.is_empty() {
        qb.push(" AND l.condition_status IN (");
        let mut values = qb.separated(", ");
        for condition in &filter.conditions {
            values.push_bind(condition.clone());
        }
        values.push_unseparated(")");
    }

    if let Some(min) = filter.min_price {
        qb.push(" AND l.price >= ");
        qb.push_bind(min);
    }

    if let Some(max) = filter.max_price {
        qb.push(" AND l.price <= ");
        qb.push_bind(max);
    }

    match &filter.exchange_points {
        None => {}
        // The parameter was present but nothing in it was a valid id.
        Some(ids) if ids.is_empty() => {
            qb.push(" AND FALSE");
        }
        Some(ids) => {
            qb.push(" AND l.exchange_point_id IN (");
            let mut values = qb.separated(", ");
            for id in ids {
                values.push_bind(*id);
            }
            values.push_unseparated(")");
        }
    }

    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (l.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR l.description ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite())
}

/// Escapes LIKE metacharacters so the search term is a literal substring
/// match rather than a pattern.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::types::Json;

    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ListingQuery {
        let mut q = ListingQuery::default();
        for (key, value) in pairs {
            let value = Some((*value).to_owned());
            match *key {
                "category" => q.category = value,
                "condition" => q.condition = value,
                "min_price" => q.min_price = value,
                "max_price" => q.max_price = value,
                "exchange_point" => q.exchange_point = value,
                "search" => q.search = value,
                "sort" => q.sort = value,
                "page" => q.page = value,
                "limit" => q.limit = value,
                other => panic!("unknown key {other}"),
            }
        }
        q
    }

    fn listing() -> Listing {
        let now = Utc::now();
        Listing {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            title: "Calculus Textbook".to_owned(),
            description: "Barely used, some highlighting inside.".to_owned(),
            price: 45.0,
            category: "textbooks".to_owned(),
            condition_status: "like_new".to_owned(),
            exchange_point_id: Some(Uuid::new_v4()),
            images: Json(vec!["/uploads/listings/a.jpg".to_owned()]),
            status: "active".to_owned(),
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn predicate_of(sql: &str) -> &str {
        let start = sql.find("WHERE ").expect("query has a WHERE clause");
        let end = sql.find(" ORDER BY").unwrap_or(sql.len());
        &sql[start..end]
    }

    #[test]
    fn empty_query_parses_to_empty_filter() {
        let filter = ListingFilter::from_query(&ListingQuery::default());
        assert_eq!(filter, ListingFilter::default());
    }

    #[test]
    fn condition_splits_on_commas() {
        let q = query(&[("condition", "good,fair,")]);
        let filter = ListingFilter::from_query(&q);
        assert_eq!(filter.conditions, vec!["good", "fair"]);
    }

    #[test]
    fn invalid_prices_are_treated_as_absent() {
        let q = query(&[("min_price", "abc"), ("max_price", "NaN")]);
        let filter = ListingFilter::from_query(&q);
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, None);

        let q = query(&[("min_price", "10"), ("max_price", "24.99")]);
        let filter = ListingFilter::from_query(&q);
        assert_eq!(filter.min_price, Some(10.0));
        assert_eq!(filter.max_price, Some(24.99));
    }

    #[test]
    fn invalid_exchange_point_ids_cannot_match() {
        let q = query(&[("exchange_point", "not-a-uuid,also-bad")]);
        let filter = ListingFilter::from_query(&q);
        assert_eq!(filter.exchange_points, Some(vec![]));

        let sql = count_query(&filter).into_sql();
        assert!(sql.contains("AND FALSE"), "got: {sql}");
    }

    #[test]
    fn page_and_count_share_the_same_predicate() {
        let ep = Uuid::new_v4();
        let q = query(&[
            ("category", "electronics"),
            ("condition", "new,like_new"),
            ("min_price", "5"),
            ("max_price", "250"),
            ("exchange_point", &ep.to_string()),
            ("search", "charger"),
        ]);
        let filter = ListingFilter::from_query(&q);

        let page_sql = page_query(&filter, SortKey::Newest, PageRequest { page: 1, limit: 12 })
            .into_sql();
        let count_sql = count_query(&filter).into_sql();

        assert_eq!(predicate_of(&page_sql), predicate_of(&count_sql));
    }

    #[test]
    fn sort_clauses() {
        assert_eq!(SortKey::parse(None), SortKey::Newest);
        assert_eq!(SortKey::parse(Some("bogus")), SortKey::Newest);
        assert_eq!(SortKey::parse(Some("oldest")), SortKey::Oldest);
        assert_eq!(SortKey::parse(Some("price_low")), SortKey::PriceLow);
        assert_eq!(SortKey::parse(Some("price_high")), SortKey::PriceHigh);

        let filter = ListingFilter::default();
        let sql = page_query(&filter, SortKey::PriceHigh, PageRequest { page: 1, limit: 12 })
            .into_sql();
        assert!(sql.contains("ORDER BY l.price DESC"), "got: {sql}");
    }

    #[test]
    fn pagination_math() {
        let page = PageRequest::from_raw(None, None);
        assert_eq!(page, PageRequest { page: 1, limit: 12 });
        assert_eq!(page.offset(), 0);

        let page = PageRequest::from_raw(Some("3"), Some("20"));
        assert_eq!(page.offset(), 40);

        // Garbage and out-of-range input falls back to the defaults.
        let page = PageRequest::from_raw(Some("zero"), Some("-4"));
        assert_eq!(page, PageRequest { page: 1, limit: 12 });

        // A 3-item result set fits one page regardless of the page asked for.
        let page = PageRequest::from_raw(Some("999"), None);
        assert_eq!(page.total_pages(3), 1);
        assert_eq!(page.offset(), 11976);

        assert_eq!(PageRequest { page: 1, limit: 12 }.total_pages(0), 0);
        assert_eq!(PageRequest { page: 1, limit: 12 }.total_pages(24), 2);
        assert_eq!(PageRequest { page: 1, limit: 12 }.total_pages(25), 3);
    }

    #[test]
    fn matcher_applies_all_filters() {
        let mut l = listing();
        let q = query(&[
            ("category", "textbooks"),
            ("condition", "like_new,good"),
            ("min_price", "40"),
            ("max_price", "50"),
            ("search", "CALCULUS"),
        ]);
        let filter = ListingFilter::from_query(&q);
        assert!(filter.matches(&l));

        l.price = 39.99;
        assert!(!filter.matches(&l));
        l.price = 45.0;

        l.condition_status = "poor".to_owned();
        assert!(!filter.matches(&l));
        l.condition_status = "like_new".to_owned();

        l.status = "sold".to_owned();
        assert!(!filter.matches(&l));
    }

    #[test]
    fn search_matches_description_too() {
        let l = listing();
        let filter = ListingFilter::from_query(&query(&[("search", "highlighting")]));
        assert!(filter.matches(&l));

        let filter = ListingFilter::from_query(&query(&[("search", "snowboard")]));
        assert!(!filter.matches(&l));
    }

    #[test]
    fn empty_price_range_matches_nothing() {
        let l = listing();
        let filter = ListingFilter::from_query(&query(&[
            ("min_price", "10"),
            ("max_price", "5"),
        ]));
        assert!(!filter.matches(&l));
    }

    #[test]
    fn exchange_point_membership() {
        let l = listing();
        let id = l.exchange_point_id.unwrap();

        let raw = format!("{id},{}", Uuid::new_v4());
        let filter = ListingFilter::from_query(&query(&[("exchange_point", &raw)]));
        assert!(filter.matches(&l));

        let other = Uuid::new_v4().to_string();
        let filter = ListingFilter::from_query(&query(&[("exchange_point", &other)]));
        assert!(!filter.matches(&l));
    }

    #[test]
    fn like_escaping_keeps_search_literal() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("like_new"), "like\\_new");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    /// The in-memory mirror and the count agree on an arbitrary fleet of
    /// listings; `total` is page-independent by construction since the count
    /// query carries no LIMIT/OFFSET.
    #[test]
    fn filter_total_matches_independent_count() {
        let mut rows = Vec::new();
        for (i, price) in [5.0, 15.0, 25.0, 35.0, 45.0].iter().enumerate() {
            let mut l = listing();
            l.price = *price;
            l.condition_status = if i % 2 == 0 { "good" } else { "poor" }.to_owned();
            if i == 4 {
                l.status = "inactive".to_owned();
            }
            rows.push(l);
        }

        let filter = ListingFilter::from_query(&query(&[
            ("condition", "good"),
            ("min_price", "10"),
        ]));

        let total = rows.iter().filter(|l| filter.matches(l)).count();
        assert_eq!(total, 1); // 25.0/good; 45.0/good is inactive, 15.0/35.0 are poor
    }
}
