//! Product Repository
//!
//! The data layer the cache sits in front of. Handlers only reach it through
//! [`ProductRepository`]; fetch results become cache entries.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::catalog::{ListFilters, ListQuery, NewProduct, Pagination, Product, ProductListing, SortField, SortOrder};
use crate::error::Result;

// == Repository Trait ==
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// One filtered, sorted page of products.
    async fn list(&self, query: &ListQuery) -> Result<ProductListing>;

    /// Number of products, optionally within one category.
    async fn count(&self, category: Option<&str>) -> Result<u64>;

    async fn find(&self, id: &str) -> Result<Option<Product>>;

    async fn create(&self, product: NewProduct) -> Result<Product>;
}

// == In-Memory Catalog ==
/// Vector-backed repository used when no database is attached.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    /// Catalog preloaded with the storefront's starter products.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let seed = [
            ("Eco Bottle 500ml", "Reusable, BPA-free bottle.", "bottles", "15.00", "Eco+500ml", 24, 3),
            ("Tritan Sports Jug", "Large, robust and made for workouts.", "jugs", "22.00", "Sports+Jug", 8, 2),
            ("Insulated Flask", "Keeps drinks cold or hot for 12h.", "flasks", "29.90", "Flask", 12, 1),
        ];

        let products = seed
            .into_iter()
            .enumerate()
            .map(|(i, (name, description, category, price, image, stock, age_days))| Product {
                id: format!("prod-{:04}", i + 1),
                name: name.to_string(),
                description: Some(description.to_string()),
                category: Some(category.to_string()),
                price: price.to_string(),
                image_url: Some(format!("https://via.placeholder.com/160?text={}", image)),
                stock,
                created_at: now - Duration::days(age_days),
            })
            .collect();

        Self::with_products(products)
    }
}

fn in_category(product: &Product, category: Option<&str>) -> bool {
    match category {
        Some(wanted) => product.category.as_deref() == Some(wanted),
        None => true,
    }
}

fn compare(a: &Product, b: &Product, field: SortField) -> Ordering {
    match field {
        SortField::Price => a
            .price_value()
            .partial_cmp(&b.price_value())
            .unwrap_or(Ordering::Equal),
        SortField::Name => a.name.cmp(&b.name),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl ProductRepository for InMemoryCatalog {
    async fn list(&self, query: &ListQuery) -> Result<ProductListing> {
        let products = self.products.read().await;

        let mut matching: Vec<&Product> = products
            .iter()
            .filter(|p| in_category(p, query.category.as_deref()))
            .collect();

        matching.sort_by(|a, b| {
            let ord = compare(a, b, query.sort_by).then_with(|| a.id.cmp(&b.id));
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset())
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(ProductListing {
            products: page,
            pagination: Pagination::new(query.page, query.limit, total),
            filters: ListFilters::from(query),
        })
    }

    async fn count(&self, category: Option<&str>) -> Result<u64> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| in_category(p, category)).count() as u64)
    }

    async fn find(&self, id: &str) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, product: NewProduct) -> Result<Product> {
        let mut products = self.products.write().await;
        let created = Product {
            id: format!("prod-{:04}", products.len() + 1),
            name: product.name,
            description: product.description,
            category: product.category,
            price: product.price,
            image_url: product.image_url,
            stock: product.stock,
            created_at: Utc::now(),
        };
        products.push(created.clone());
        Ok(created)
    }
}
