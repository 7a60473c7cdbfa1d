//! Catalog Module
//!
//! Product data model and the repository interface the cache fronts.

mod model;
mod repository;

pub use model::{
    ListFilters, ListQuery, NewProduct, Pagination, Product, ProductListing, SortField, SortOrder,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use repository::{InMemoryCatalog, ProductRepository};
