//! API Handlers
//!
//! HTTP request handlers for the catalog endpoints. Every limited handler
//! checks its limiter first and returns a rejection untouched. Anything
//! answered after admission, errors included, carries the rate-limit headers.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::info;

use crate::cache::{keys, ttl, CacheOptions, CacheService, Cached};
use crate::catalog::{InMemoryCatalog, ProductRepository};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, StoreBackend};
use crate::error::{AppError, Result};
use crate::models::{
    ContactRequest, ContactResponse, CountParams, CountResponse, CreateProductRequest,
    HealthResponse, ListParams, StatsResponse,
};
use crate::ratelimit::{
    apply_rate_limit_headers, with_rate_limit, RateLimitOutcome, RateLimiter, RateLimiters,
};
use crate::store::{MemoryStore, StoreClient};

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Browser and CDN caching policy for catalog reads.
pub const CATALOG_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=120";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StoreClient>,
    pub cache: Arc<CacheService>,
    pub limiters: Arc<RateLimiters>,
    pub catalog: Arc<dyn ProductRepository>,
    /// Bearer token accepted for writes; `None` rejects every write
    pub admin_token: Option<String>,
    /// Set when the in-process backend is in use, for the cleanup task
    pub memory_store: Option<Arc<MemoryStore>>,
    /// Prometheus handle behind `/metrics`
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wires the cache service and limiters over an existing store client.
    pub fn new(
        store: Arc<StoreClient>,
        catalog: Arc<dyn ProductRepository>,
        config: &Config,
    ) -> Self {
        Self {
            cache: Arc::new(CacheService::new(
                store.clone(),
                config.cache_prefix.clone(),
                config.default_ttl,
            )),
            limiters: Arc::new(RateLimiters::new(store.clone(), &config.cache_prefix)),
            store,
            catalog,
            admin_token: config.admin_token.clone(),
            memory_store: None,
            metrics: None,
        }
    }

    /// Serves `handle` at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// State backed by an in-process store driven by `clock`.
    pub fn with_memory_store(clock: Arc<dyn Clock>, config: &Config) -> Self {
        let memory = Arc::new(MemoryStore::new(clock.clone()));
        let store = Arc::new(StoreClient::with_backend(memory.clone(), clock));

        let mut state = Self::new(store, Arc::new(InMemoryCatalog::seeded()), config);
        state.memory_store = Some(memory);
        state
    }

    /// Creates a new AppState from configuration.
    ///
    /// With the remote backend and no credentials the service still starts,
    /// with caching and rate limiting disabled.
    pub fn from_config(config: &Config) -> Self {
        match config.backend {
            StoreBackend::Memory => Self::with_memory_store(Arc::new(SystemClock), config),
            StoreBackend::Redis => {
                let store = StoreClient::initialize(
                    config.redis_url.as_deref(),
                    config.redis_token.as_deref(),
                );
                Self::new(
                    Arc::new(store),
                    Arc::new(InMemoryCatalog::seeded()),
                    config,
                )
            }
        }
    }
}

/// JSON body plus cache policy and `X-Cache` headers.
fn cached_response<T: Serialize>(result: Cached<T>) -> Response {
    let status = if result.cached { "HIT" } else { "MISS" };
    let mut response = Json(result.data).into_response();

    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CATALOG_CACHE_CONTROL),
    );
    headers.insert(X_CACHE, HeaderValue::from_static(status));

    response
}

fn authorize(headers: &HeaderMap, admin_token: Option<&str>) -> Result<()> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match (admin_token, presented) {
        (Some(expected), Some(given)) if !expected.is_empty() && expected == given => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| AppError::InvalidRequest(e.to_string()))
}

/// Runs `handler` once `limiter` admits the request and stamps the
/// rate-limit headers on whatever it answers, errors included.
///
/// `handler` is a lazy future: nothing in it runs for a rejected request.
async fn rate_limited<Fut>(headers: &HeaderMap, limiter: &RateLimiter, handler: Fut) -> Response
where
    Fut: Future<Output = Result<Response>>,
{
    let rate_headers = match with_rate_limit(headers, limiter).await {
        RateLimitOutcome::Admitted(h) => h,
        RateLimitOutcome::Rejected(response) => return response,
    };

    let mut response = handler.await.unwrap_or_else(IntoResponse::into_response);
    apply_rate_limit_headers(&mut response, rate_headers);
    response
}

fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

/// Handler for GET /api/products
///
/// The query string is validated only after the limiter counted the request.
pub async fn list_products(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Response {
    rate_limited(&headers, &state.limiters.read, list_page(&state, query)).await
}

async fn list_page(
    state: &AppState,
    query: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Response> {
    let query = query_params(query)?.into_query()?;
    let key = keys::query_key(&query);
    let catalog = state.catalog.clone();

    let result = state
        .cache
        .with_cache(
            &key,
            || async move { catalog.list(&query).await },
            &CacheOptions::ttl(ttl::SHORT),
        )
        .await?;

    Ok(cached_response(result))
}

/// Handler for GET /api/products/count
pub async fn count_products(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: std::result::Result<Query<CountParams>, QueryRejection>,
) -> Response {
    rate_limited(&headers, &state.limiters.read, product_count(&state, query)).await
}

async fn product_count(
    state: &AppState,
    query: std::result::Result<Query<CountParams>, QueryRejection>,
) -> Result<Response> {
    let params = query_params(query)?;
    let category = params.category().map(str::to_string);
    let key = keys::count_key(category.as_deref());
    let catalog = state.catalog.clone();

    let result = state
        .cache
        .with_cache(
            &key,
            || async move {
                let count = catalog.count(category.as_deref()).await?;
                Ok::<_, AppError>(CountResponse { category, count })
            },
            &CacheOptions::ttl(ttl::SHORT),
        )
        .await?;

    Ok(cached_response(result))
}

/// Handler for GET /api/products/:id
///
/// Unknown ids answer 404 and leave nothing in the cache.
pub async fn get_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    rate_limited(&headers, &state.limiters.read, product_detail(&state, id)).await
}

async fn product_detail(state: &AppState, id: String) -> Result<Response> {
    let key = keys::detail_key(&id);
    let catalog = state.catalog.clone();

    let result = state
        .cache
        .with_cache(
            &key,
            || async move {
                catalog
                    .find(&id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("product '{}'", id)))
            },
            &CacheOptions::ttl(ttl::MEDIUM),
        )
        .await?;

    Ok(cached_response(result))
}

/// Handler for POST /api/products
///
/// The body is parsed only after the limiter admitted the request, so
/// malformed payloads still count against the write budget.
pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    rate_limited(
        &headers,
        &state.limiters.write,
        insert_product(&state, &headers, body),
    )
    .await
}

async fn insert_product(state: &AppState, headers: &HeaderMap, body: Bytes) -> Result<Response> {
    authorize(headers, state.admin_token.as_deref())?;

    let request: CreateProductRequest = parse_body(&body)?;
    let product = state.catalog.create(request.validate()?).await?;

    let opts = CacheOptions::default();
    let lists = state
        .cache
        .invalidate_pattern(keys::PRODUCTS_LIST_PATTERN, &opts)
        .await;
    let counts = state
        .cache
        .invalidate_pattern(keys::PRODUCTS_COUNT_PATTERN, &opts)
        .await;
    info!(
        id = %product.id,
        "Product created, {} list and {} count entries invalidated",
        lists, counts
    );

    Ok((StatusCode::CREATED, Json(product)).into_response())
}

/// Handler for POST /api/contact
pub async fn contact(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    rate_limited(&headers, &state.limiters.contact, submit_contact(body)).await
}

async fn submit_contact(body: Bytes) -> Result<Response> {
    let request: ContactRequest = parse_body(&body)?;
    if let Some(error_msg) = request.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }
    info!(email = %request.email.trim(), "Contact message received");

    Ok(Json(ContactResponse { success: true }).into_response())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let stats = async {
        let body = StatsResponse::new(state.cache.stats(), state.store.availability());
        Ok::<_, AppError>(Json(body).into_response())
    };
    rate_limited(&headers, &state.limiters.general, stats).await
}

/// Handler for GET /metrics
///
/// Prometheus text exposition; 404 when no recorder was installed.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::NotFound("metrics are not enabled".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; version=0.0.4"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        ],
        handle.render(),
    )
        .into_response())
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_availability(state.store.availability()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Product, ProductListing};
    use crate::clock::ManualClock;
    use std::time::Duration;

    const TOKEN: &str = "secret";

    fn test_state() -> (AppState, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        let config = Config {
            admin_token: Some(TOKEN.to_string()),
            ..Config::default()
        };
        (AppState::with_memory_store(Arc::new(clock.clone()), &config), clock)
    }

    fn admin_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", TOKEN)).unwrap(),
        );
        headers
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn list(state: &AppState) -> Response {
        list_products(
            State(state.clone()),
            HeaderMap::new(),
            Ok(Query(ListParams::default())),
        )
        .await
    }

    #[tokio::test]
    async fn test_list_miss_then_hit() {
        let (state, _) = test_state();

        let first = list(&state).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-cache"], "MISS");
        assert_eq!(first.headers()["cache-control"], CATALOG_CACHE_CONTROL);
        assert_eq!(first.headers()["x-ratelimit-limit"], "100");

        let second = list(&state).await;
        assert_eq!(second.headers()["x-cache"], "HIT");
        assert_eq!(second.headers()["x-ratelimit-remaining"], "98");

        let listing: ProductListing = body_json(second).await;
        assert_eq!(listing.pagination.total, 3);
    }

    #[tokio::test]
    async fn test_list_expires_after_short_ttl() {
        let (state, clock) = test_state();

        list(&state).await;
        clock.advance(Duration::from_secs(ttl::SHORT));

        assert_eq!(list(&state).await.headers()["x-cache"], "MISS");
    }

    #[tokio::test]
    async fn test_invalid_sort_is_bad_request() {
        let (state, _) = test_state();
        let params = ListParams {
            sort_by: Some("rating".to_string()),
            ..ListParams::default()
        };

        let response = list_products(State(state), HeaderMap::new(), Ok(Query(params))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "99");
    }

    #[tokio::test]
    async fn test_repeated_query_key_is_counted_then_rejected() {
        let (state, _) = test_state();
        let uri: axum::http::Uri = "/api/products?page=1&page=2".parse().unwrap();
        let query = Query::<ListParams>::try_from_uri(&uri);
        assert!(query.is_err());

        let response = list_products(State(state.clone()), HeaderMap::new(), query).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-ratelimit-limit"], "100");
        let body: serde_json::Value = body_json(response).await;
        assert!(body["error"].as_str().is_some());

        let next = list(&state).await;
        assert_eq!(next.headers()["x-ratelimit-remaining"], "98");
    }

    #[tokio::test]
    async fn test_get_product_and_missing_product() {
        let (state, _) = test_state();

        let found =
            get_product(State(state.clone()), HeaderMap::new(), Path("prod-0002".into())).await;
        let product: Product = body_json(found).await;
        assert_eq!(product.name, "Tritan Sports Jug");

        for _ in 0..2 {
            let missing =
                get_product(State(state.clone()), HeaderMap::new(), Path("nope".into())).await;
            assert_eq!(missing.status(), StatusCode::NOT_FOUND);
            assert!(missing.headers().contains_key("x-ratelimit-remaining"));
        }
        assert_eq!(state.cache.stats().misses, 3);
    }

    #[tokio::test]
    async fn test_count_products() {
        let (state, _) = test_state();
        let params = CountParams {
            category: Some("flasks".to_string()),
        };

        let response = count_products(State(state), HeaderMap::new(), Ok(Query(params))).await;
        let body: CountResponse = body_json(response).await;

        assert_eq!(body.count, 1);
        assert_eq!(body.category.as_deref(), Some("flasks"));
    }

    #[tokio::test]
    async fn test_create_requires_token() {
        let (state, _) = test_state();
        let body = Bytes::from_static(br#"{"name":"Cup","price":"5.00"}"#);

        let response = create_product(State(state), HeaderMap::new(), body).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
    }

    #[tokio::test]
    async fn test_create_invalidates_lists_and_counts() {
        let (state, _) = test_state();
        list(&state).await;
        count_products(
            State(state.clone()),
            HeaderMap::new(),
            Ok(Query(CountParams::default())),
        )
        .await;

        let body = Bytes::from_static(br#"{"name":"Cup","price":"5.00","category":"cups"}"#);
        let created = create_product(State(state.clone()), admin_headers(), body).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(created.headers()["x-ratelimit-limit"], "10");

        let after = list(&state).await;
        assert_eq!(after.headers()["x-cache"], "MISS");
        let listing: ProductListing = body_json(after).await;
        assert_eq!(listing.pagination.total, 4);
        assert_eq!(state.cache.stats().invalidations, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_body() {
        let (state, _) = test_state();

        let response =
            create_product(State(state), admin_headers(), Bytes::from_static(b"{")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key("x-ratelimit-reset"));
    }

    #[tokio::test]
    async fn test_contact_limited_to_five_per_minute() {
        let (state, clock) = test_state();
        let body = Bytes::from_static(br#"{"name":"Ana","email":"ana@example.com","message":"Hi"}"#);

        for _ in 0..RateLimiters::CONTACT_LIMIT {
            let response = contact(State(state.clone()), HeaderMap::new(), body.clone()).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let rejected = contact(State(state.clone()), HeaderMap::new(), body.clone()).await;
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);

        clock.advance(Duration::from_secs(61));
        let again = contact(State(state), HeaderMap::new(), body).await;
        assert_eq!(again.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_degraded_mode_serves_uncached() {
        let store = Arc::new(StoreClient::initialize(None, None));
        let state = AppState::new(store, Arc::new(InMemoryCatalog::seeded()), &Config::default());

        for _ in 0..2 {
            let response = list(&state).await;
            assert_eq!(response.headers()["x-cache"], "MISS");
            assert!(response.headers().get("x-ratelimit-limit").is_none());
        }

        let health = health_handler(State(state)).await;
        assert_eq!(health.status, "degraded");
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (state, _) = test_state();
        list(&state).await;
        list(&state).await;

        let body: serde_json::Value = body_json(stats_handler(State(state), HeaderMap::new()).await).await;

        assert_eq!(body["hits"], 1);
        assert_eq!(body["misses"], 1);
        assert_eq!(body["store"]["backend"], "memory");
    }

    #[tokio::test]
    async fn test_metrics_handler_without_recorder() {
        let (state, _) = test_state();

        let result = metrics_handler(State(state)).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_authorize() {
        assert!(authorize(&admin_headers(), Some(TOKEN)).is_ok());
        assert!(authorize(&admin_headers(), Some("other")).is_err());
        assert!(authorize(&admin_headers(), None).is_err());
        assert!(authorize(&HeaderMap::new(), Some(TOKEN)).is_err());
    }
}
