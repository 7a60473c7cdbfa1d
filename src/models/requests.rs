//! Request DTOs for the catalog API
//!
//! Raw query and body shapes, and their validation into domain types.

use serde::Deserialize;

use crate::catalog::{
    ListQuery, NewProduct, SortField, SortOrder, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use crate::error::AppError;

/// Query string of `GET /api/products`. Everything arrives as text and is
/// normalized by [`ListParams::into_query`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

fn parse_number(name: &str, raw: Option<&str>, default: u32) -> Result<u32, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse::<i64>()
            .map(|n| n.clamp(0, u32::MAX as i64) as u32)
            .map_err(|_| AppError::InvalidRequest(format!("{} must be an integer", name))),
    }
}

impl ListParams {
    /// Applies defaults and bounds: page >= 1, limit in 1..=50, empty or
    /// "all" category means no filter. Unknown sort values are rejected.
    pub fn into_query(self) -> Result<ListQuery, AppError> {
        let page = parse_number("page", self.page.as_deref(), 1)?.max(1);
        let limit = parse_number("limit", self.limit.as_deref(), DEFAULT_PAGE_SIZE)?
            .clamp(1, MAX_PAGE_SIZE);

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && c != "all");

        let sort_by = match self.sort_by.as_deref() {
            Some(raw) if !raw.is_empty() => raw
                .parse::<SortField>()
                .map_err(AppError::InvalidRequest)?,
            _ => SortField::default(),
        };
        let sort_order = match self.sort_order.as_deref() {
            Some(raw) if !raw.is_empty() => raw
                .parse::<SortOrder>()
                .map_err(AppError::InvalidRequest)?,
            _ => SortOrder::default(),
        };

        Ok(ListQuery {
            page,
            limit,
            category,
            sort_by,
            sort_order,
        })
    }
}

/// Query string of `GET /api/products/count`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountParams {
    pub category: Option<String>,
}

impl CountParams {
    pub fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "all")
    }
}

/// Body of `POST /api/products`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: Option<serde_json::Value>,
}

/// `digits` or `digits.d` or `digits.dd`.
fn is_valid_price(price: &str) -> bool {
    let (whole, fraction) = match price.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (price, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    digits(whole) && fraction.map_or(true, |f| digits(f) && f.len() <= 2)
}

fn is_http_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
        && !url.contains(char::is_whitespace)
}

/// Stock may arrive as a JSON number or a numeric string.
fn parse_stock(raw: Option<&serde_json::Value>) -> Result<i32, String> {
    let value = match raw {
        None | Some(serde_json::Value::Null) => return Ok(0),
        Some(v) => v,
    };
    let number = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| "stock must be an integer".to_string())
}

impl CreateProductRequest {
    /// Validates the request data
    ///
    /// Returns every problem found, joined, or the product to persist.
    pub fn validate(self) -> Result<NewProduct, AppError> {
        let mut problems = Vec::new();

        let name = self.name.trim().to_string();
        if name.is_empty() {
            problems.push("name cannot be empty".to_string());
        }

        let price = self.price.trim().to_string();
        if !is_valid_price(&price) {
            problems.push("Invalid price format".to_string());
        }

        if let Some(url) = self.image_url.as_deref() {
            if !is_http_url(url) {
                problems.push("imageUrl must be an http(s) URL".to_string());
            }
        }

        let stock = parse_stock(self.stock.as_ref()).unwrap_or_else(|e| {
            problems.push(e);
            0
        });

        if !problems.is_empty() {
            return Err(AppError::InvalidRequest(problems.join("; ")));
        }

        Ok(NewProduct {
            name,
            description: self.description,
            category: self.category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            price,
            image_url: self.image_url,
            stock,
        })
    }
}

/// Body of `POST /api/contact`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("name cannot be empty".to_string());
        }
        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
        if !well_formed {
            return Some("email is not valid".to_string());
        }
        if self.message.trim().is_empty() {
            return Some("message cannot be empty".to_string());
        }
        None
    }
}
