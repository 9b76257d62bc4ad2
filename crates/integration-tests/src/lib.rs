//! Integration test harness for HerHouse.
//!
//! Tests drive the full storefront router in-process against
//! [`MockBackend`], an in-memory stand-in for the hosted backend's REST and
//! auth APIs. Nothing outside the test process is needed.
//!
//! ```rust,ignore
//! let app = TestApp::spawn().await;
//! let zara = app.backend.add_user("zara@example.pk", Some("Zara"));
//! app.sign_in(&zara).await;
//!
//! let page = app.get("/").await;
//! assert!(page.body.contains("Welcome back, Zara"));
//! ```

#![allow(clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use herhouse_core::Money;
use herhouse_storefront::config::{BackendConfig, StorefrontConfig};
use herhouse_storefront::middleware::session::SESSION_COOKIE_NAME;
use herhouse_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

/// `Accept` value the storefront sends when it wants exactly one row.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// First `created_at` handed out to seeded rows (2024-01-01T00:00:00Z).
const EPOCH_SECONDS: i64 = 1_704_067_200;

// =============================================================================
// Mock backend
// =============================================================================

/// A user the mock auth API will sign in.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    /// Authorization code that completes this user's sign-in.
    pub code: String,
}

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Value>>,
    inserts: HashMap<String, usize>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
    race_profile_insert: bool,
    users: HashMap<String, Value>,
    revoked: Vec<String>,
    clock: i64,
}

impl Tables {
    /// Give a row an `id` and `created_at` unless it already has them.
    /// Later rows are always newer.
    fn stamp(&mut self, mut row: Value) -> Value {
        self.clock += 1;
        let created_at = chrono::DateTime::from_timestamp(EPOCH_SECONDS + self.clock, 0)
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();

        if let Some(fields) = row.as_object_mut() {
            fields
                .entry("id")
                .or_insert_with(|| json!(Uuid::new_v4()));
            fields.entry("created_at").or_insert_with(|| json!(created_at));
        }
        row
    }

    fn table(&mut self, table: &str) -> &mut Vec<Value> {
        self.rows.entry(table.to_string()).or_default()
    }
}

/// In-memory backend serving `/rest/v1/*` and `/auth/v1/*`.
///
/// Supports the subset of the REST API the storefront uses: `eq.` filters,
/// `order=col.desc`, `limit`, single-object responses, inserts and patches.
/// Row-level security is not modelled.
#[derive(Clone)]
pub struct MockBackend {
    url: Url,
    tables: Arc<Mutex<Tables>>,
}

impl MockBackend {
    /// Serve the mock on an ephemeral local port.
    pub async fn start() -> Self {
        let tables = Arc::new(Mutex::new(Tables::default()));
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");

        let mock = Self {
            url: Url::parse(&format!("http://{addr}")).expect("mock backend URL"),
            tables,
        };

        let router = Router::new()
            .route("/rest/v1/", get(|| async { Json(json!([])) }))
            .route(
                "/rest/v1/{table}",
                get(rest_select).post(rest_insert).patch(rest_update),
            )
            .route("/auth/v1/token", post(auth_token))
            .route("/auth/v1/logout", post(auth_logout))
            .with_state(mock.clone());

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("mock backend server");
        });

        mock
    }

    /// Base URL to configure the storefront with.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("mock backend state poisoned")
    }

    /// Register an auth user.
    pub fn add_user(&self, email: &str, full_name: Option<&str>) -> TestUser {
        let user = TestUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            code: format!("code-{}", Uuid::new_v4().simple()),
        };
        let record = json!({
            "id": user.id,
            "email": email,
            "user_metadata": { "full_name": full_name },
        });
        self.lock().users.insert(user.code.clone(), record);
        user
    }

    /// Insert a row directly, bypassing uniqueness checks.
    pub fn insert(&self, table: &str, row: Value) -> Value {
        let mut tables = self.lock();
        let row = tables.stamp(row);
        tables.table(table).push(row.clone());
        row
    }

    /// Seed the profile for `user`.
    pub fn seed_profile(&self, user: &TestUser, role: &str, extra: Value) -> Value {
        let mut row = json!({
            "user_id": user.id,
            "email": user.email,
            "full_name": user.email.split('@').next().unwrap_or_default(),
            "role": role,
        });
        merge(&mut row, extra);
        self.insert("profiles", row)
    }

    /// Seed a product listed by `host_id`. Approved at PKR 1,000 unless
    /// `extra` says otherwise.
    pub fn seed_product(&self, host_id: &Value, title: &str, extra: Value) -> Value {
        let mut row = json!({
            "her_host_id": host_id,
            "title": title,
            "price": 1000,
            "status": "approved",
        });
        merge(&mut row, extra);
        self.insert("products", row)
    }

    /// Seed an order.
    pub fn seed_order(&self, customer_id: &Value, host_id: &Value, total: i64) -> Value {
        let number = self.lock().clock + 1;
        self.insert(
            "orders",
            json!({
                "order_number": format!("HH-{number:04}"),
                "customer_id": customer_id,
                "her_host_id": host_id,
                "total_amount": total,
                "status": "pending",
                "shipping_address": "House 12, Gulberg, Lahore",
                "phone": "03001234567",
            }),
        )
    }

    /// Every row of `table`, in insertion order.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().rows.get(table).cloned().unwrap_or_default()
    }

    /// The row of `table` whose `id` is `id`.
    #[must_use]
    pub fn row(&self, table: &str, id: &Value) -> Option<Value> {
        self.rows(table).into_iter().find(|row| row.get("id") == Some(id))
    }

    /// Inserts the storefront made into `table` through the REST API.
    #[must_use]
    pub fn insert_count(&self, table: &str) -> usize {
        self.lock().inserts.get(table).copied().unwrap_or_default()
    }

    /// Make every read of `table` fail with a server error.
    pub fn fail_reads(&self, table: &str) {
        self.lock().failing_reads.insert(table.to_string());
    }

    /// Make every write to `table` fail with a server error.
    pub fn fail_writes(&self, table: &str) {
        self.lock().failing_writes.insert(table.to_string());
    }

    /// The next profile insert loses a race: a concurrent bootstrap writes
    /// the row first and the insert is rejected as a duplicate.
    pub fn race_next_profile_insert(&self) {
        self.lock().race_profile_insert = true;
    }

    /// Access tokens revoked through `/auth/v1/logout`.
    #[must_use]
    pub fn revoked_tokens(&self) -> Vec<String> {
        self.lock().revoked.clone()
    }
}

/// Overlay the fields of `extra` onto `row`.
fn merge(row: &mut Value, extra: Value) {
    if let (Some(row), Value::Object(extra)) = (row.as_object_mut(), extra) {
        row.extend(extra);
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

fn simulated_failure() -> Response {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "XX000",
        "simulated backend failure",
    )
}

/// Text form of a column value as it appears in an `eq.` filter.
fn filter_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn matches_filters(row: &Value, params: &[(String, String)]) -> bool {
    params
        .iter()
        .filter(|(column, _)| !matches!(column.as_str(), "select" | "order" | "limit"))
        .all(|(column, condition)| {
            condition
                .strip_prefix("eq.")
                .is_some_and(|expected| filter_text(row.get(column)).as_deref() == Some(expected))
        })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;

    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(O::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Apply `order` and `limit` query parameters.
fn order_and_limit(rows: &mut Vec<Value>, params: &[(String, String)]) {
    if let Some((_, order)) = params.iter().find(|(key, _)| key == "order") {
        let columns: Vec<(String, bool)> = order
            .split(',')
            .map(|part| match part.strip_suffix(".desc") {
                Some(column) => (column.to_string(), true),
                None => (part.trim_end_matches(".asc").to_string(), false),
            })
            .collect();

        rows.sort_by(|a, b| {
            columns
                .iter()
                .map(|(column, desc)| {
                    let ordering = compare_values(a.get(column), b.get(column));
                    if *desc { ordering.reverse() } else { ordering }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    if let Some(limit) = params
        .iter()
        .find(|(key, _)| key == "limit")
        .and_then(|(_, limit)| limit.parse::<usize>().ok())
    {
        rows.truncate(limit);
    }
}

fn wants_single(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .is_some_and(|accept| accept == SINGLE_OBJECT)
}

/// Respond with `rows`, or with exactly one row when the caller asked for it.
fn respond_rows(rows: Vec<Value>, headers: &HeaderMap) -> Response {
    if !wants_single(headers) {
        return Json(rows).into_response();
    }
    if rows.len() != 1 {
        return api_error(
            StatusCode::NOT_ACCEPTABLE,
            "PGRST116",
            "JSON object requested, multiple (or no) rows returned",
        );
    }
    rows.into_iter()
        .next()
        .map_or_else(|| StatusCode::NOT_ACCEPTABLE.into_response(), |row| Json(row).into_response())
}

async fn rest_select(
    State(mock): State<MockBackend>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let tables = mock.lock();
    if tables.failing_reads.contains(&table) {
        return simulated_failure();
    }

    let mut rows: Vec<Value> = tables
        .rows
        .get(&table)
        .map(|rows| {
            rows.iter()
                .filter(|row| matches_filters(row, &params))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    drop(tables);

    order_and_limit(&mut rows, &params);
    respond_rows(rows, &headers)
}

async fn rest_insert(
    State(mock): State<MockBackend>,
    Path(table): Path<String>,
    Json(row): Json<Value>,
) -> Response {
    let mut tables = mock.lock();
    if tables.failing_writes.contains(&table) {
        return simulated_failure();
    }

    if table == "profiles" {
        if std::mem::take(&mut tables.race_profile_insert) {
            let winner = tables.stamp(row);
            tables.table("profiles").push(winner);
            return api_error(
                StatusCode::CONFLICT,
                "23505",
                "duplicate key value violates unique constraint \"profiles_user_id_key\"",
            );
        }

        let user_id = row.get("user_id").cloned();
        if tables
            .table("profiles")
            .iter()
            .any(|existing| existing.get("user_id") == user_id.as_ref())
        {
            return api_error(
                StatusCode::CONFLICT,
                "23505",
                "duplicate key value violates unique constraint \"profiles_user_id_key\"",
            );
        }
    }

    let row = tables.stamp(row);
    tables.table(&table).push(row.clone());
    *tables.inserts.entry(table).or_default() += 1;

    (StatusCode::CREATED, Json(row)).into_response()
}

async fn rest_update(
    State(mock): State<MockBackend>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    Json(changes): Json<Value>,
) -> Response {
    let mut tables = mock.lock();
    if tables.failing_writes.contains(&table) {
        return simulated_failure();
    }

    let Some(row) = tables
        .table(&table)
        .iter_mut()
        .find(|row| matches_filters(row, &params))
    else {
        return api_error(
            StatusCode::NOT_ACCEPTABLE,
            "PGRST116",
            "JSON object requested, multiple (or no) rows returned",
        );
    };

    merge(row, changes);
    Json(row.clone()).into_response()
}

async fn auth_token(
    State(mock): State<MockBackend>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let code = params
        .get("grant_type")
        .filter(|grant| *grant == "pkce")
        .and_then(|_| body.get("auth_code"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let user = code
        .as_ref()
        .and_then(|code| mock.lock().users.get(code).cloned());

    match (code, user) {
        (Some(code), Some(user)) => Json(json!({
            "access_token": format!("access-{code}"),
            "refresh_token": format!("refresh-{code}"),
            "token_type": "bearer",
            "expires_in": 3600,
            "user": user,
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid code" })),
        )
            .into_response(),
    }
}

async fn auth_logout(State(mock): State<MockBackend>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        mock.lock().revoked.push(token.to_string());
    }
    StatusCode::NO_CONTENT
}

// =============================================================================
// Storefront under test
// =============================================================================

/// Distinct client address per app, so the sign-in rate limit never spans
/// tests.
static NEXT_CLIENT: AtomicU8 = AtomicU8::new(1);

/// A rendered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    /// Redirect target, panicking if this is not a redirect.
    #[must_use]
    pub fn redirect_target(&self) -> &str {
        assert!(
            self.status.is_redirection(),
            "expected redirect, got {}",
            self.status
        );
        self.location.as_deref().expect("redirect without Location")
    }
}

/// The storefront router wired to a fresh [`MockBackend`], with a browser
/// style cookie jar holding the session cookie.
pub struct TestApp {
    pub backend: MockBackend,
    router: Router,
    cookie: Mutex<Option<String>>,
    client_ip: IpAddr,
}

impl TestApp {
    /// Start with the default test configuration.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Start with a configuration adjusted by `configure`.
    pub async fn spawn_with(configure: impl FnOnce(&mut StorefrontConfig)) -> Self {
        let backend = MockBackend::start().await;
        let mut config = test_config(backend.url());
        configure(&mut config);

        let state = AppState::new(config).expect("application state");
        let client = NEXT_CLIENT.fetch_add(1, Ordering::Relaxed);

        Self {
            backend,
            router: herhouse_storefront::app(state),
            cookie: Mutex::new(None),
            client_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, client)),
        }
    }

    /// `GET uri`.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("GET request");
        self.send(request).await
    }

    /// `POST uri` with a URL-encoded form body.
    pub async fn post_form(&self, uri: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("POST request");
        self.send(request).await
    }

    async fn send(&self, mut request: Request<Body>) -> TestResponse {
        let headers = request.headers_mut();
        if let Ok(ip) = HeaderValue::from_str(&self.client_ip.to_string()) {
            headers.insert("x-forwarded-for", ip);
        }
        if let Some(cookie) = self.cookie.lock().expect("cookie jar").clone()
            && let Ok(value) = HeaderValue::from_str(&cookie)
        {
            headers.insert(header::COOKIE, value);
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let prefix = format!("{SESSION_COOKIE_NAME}=");
        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            if let Some(pair) = set_cookie
                .to_str()
                .ok()
                .and_then(|value| value.split(';').next())
                .filter(|pair| pair.starts_with(&prefix))
            {
                // An emptied cookie means the session was deleted
                *self.cookie.lock().expect("cookie jar") =
                    (pair.len() > prefix.len()).then(|| pair.to_string());
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Run the OAuth sign-in round trip for `user`.
    ///
    /// Returns the callback response.
    pub async fn sign_in(&self, user: &TestUser) -> TestResponse {
        let login = self.get("/auth/login").await;
        let authorize = Url::parse(login.redirect_target()).expect("authorize URL");
        let state = query_param(&authorize, "redirect_to")
            .and_then(|redirect_to| Url::parse(&redirect_to).ok())
            .and_then(|callback| query_param(&callback, "state"))
            .expect("state in redirect_to");

        self.get(&format!("/auth/callback?code={}&state={state}", user.code))
            .await
    }

    /// Sign out through the logout route.
    pub async fn sign_out(&self) -> TestResponse {
        self.post_form("/auth/logout", &[]).await
    }

    /// Forget the session cookie, as a new browser would.
    pub fn clear_cookies(&self) {
        *self.cookie.lock().expect("cookie jar") = None;
    }
}

/// First value of query parameter `name`.
#[must_use]
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Storefront configuration pointing at `backend_url`.
#[must_use]
pub fn test_config(backend_url: &Url) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        backend: BackendConfig {
            url: backend_url.clone(),
            anon_key: SecretString::from("test-anon-key".to_string()),
        },
        oauth_provider: "google".to_string(),
        referral_reward: Money::from_rupees(100),
        catalog_cache_ttl: Duration::from_secs(60),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}
