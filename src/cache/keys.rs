//! Cache Key Registry
//!
//! Deterministic cache keys for every cached resource, and the TTL classes
//! each endpoint picks from. Keys are logical: the cache service adds the
//! namespace prefix.

use crate::catalog::{ListQuery, SortField, SortOrder};

// == TTL Classes ==
/// Time-to-live classes in seconds, chosen per endpoint by staleness tolerance.
pub mod ttl {
    /// Storefront lists and counts
    pub const SHORT: u64 = 60;
    /// Product detail pages
    pub const MEDIUM: u64 = 300;
    pub const LONG: u64 = 1800;
    pub const VERY_LONG: u64 = 3600;
}

// == Invalidation Patterns ==
/// Every cached product list page.
pub const PRODUCTS_LIST_PATTERN: &str = "products:list:*";

/// Every cached product count.
pub const PRODUCTS_COUNT_PATTERN: &str = "products:count:*";

/// Category segment used when no category filter applies.
const ALL_CATEGORIES: &str = "all";

/// Escapes glob metacharacters (and the escape character itself) so `raw`
/// only ever matches itself inside a pattern.
pub fn escape_glob(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '*' => out.push_str("%2A"),
            '?' => out.push_str("%3F"),
            '[' => out.push_str("%5B"),
            ']' => out.push_str("%5D"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes the characters that carry meaning in keys and glob patterns, so
/// distinct category strings never produce the same key segment.
fn escape_segment(raw: &str) -> String {
    escape_glob(raw).replace(':', "%3A")
}

fn category_segment(category: Option<&str>) -> String {
    match category {
        Some(c) => escape_segment(c),
        None => ALL_CATEGORIES.to_string(),
    }
}

// == Product Keys ==
/// Key for one page of the product list.
///
/// `Some("all")` and `None` share a key: "all" is the storefront's spelling of
/// "no filter".
pub fn list_key(page: u32, limit: u32, category: Option<&str>) -> String {
    format!(
        "products:list:page:{}:limit:{}:category:{}",
        page,
        limit,
        category_segment(category)
    )
}

/// List key extended with the sort order.
pub fn sorted_list_key(
    page: u32,
    limit: u32,
    category: Option<&str>,
    sort_by: SortField,
    sort_order: SortOrder,
) -> String {
    format!(
        "{}:sort:{}:{}",
        list_key(page, limit, category),
        sort_by,
        sort_order
    )
}

/// Key for a normalized list query.
pub fn query_key(query: &ListQuery) -> String {
    sorted_list_key(
        query.page,
        query.limit,
        query.category.as_deref(),
        query.sort_by,
        query.sort_order,
    )
}

pub fn count_key(category: Option<&str>) -> String {
    format!("products:count:category:{}", category_segment(category))
}

pub fn detail_key(id: &str) -> String {
    format!("products:detail:{}", escape_segment(id))
}

// == User Keys ==
pub fn user_profile_key(user_id: &str) -> String {
    format!("user:profile:{}", escape_segment(user_id))
}

pub fn user_preferences_key(user_id: &str) -> String {
    format!("user:preferences:{}", escape_segment(user_id))
}

// == Analytics Keys ==
pub fn popular_products_key() -> &'static str {
    "analytics:popular:products"
}

pub fn view_count_key(product_id: &str) -> String {
    format!("analytics:views:{}", escape_segment(product_id))
}
