//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                 - Home (signed out) or role dashboard
//! GET  /health                           - Liveness check
//! GET  /health/ready                     - Readiness check (backend reachable)
//!
//! # Products
//! GET  /products?q=&category=            - Approved product listing
//! GET  /products/{id}?quantity=          - Product detail with pricing
//! POST /products/{id}/cart               - Add to cart (notification only)
//!
//! # Profile
//! POST /profile                          - Update own profile
//!
//! # Admin (requires admin role)
//! POST /admin/profiles/{id}/approve      - Approve a profile
//! POST /admin/products/{id}/approve      - Approve a product
//! POST /admin/products/{id}/reject       - Reject a product
//!
//! # Auth (rate limited)
//! GET  /auth/login                       - Start OAuth sign-in
//! GET  /auth/callback                    - Finish OAuth sign-in
//! POST /auth/logout                      - Sign out
//! ```

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod home;
pub mod products;
pub mod profile;

use axum::{
    Router,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::auth_rate_limiter;
use crate::models::{Flash, take_flashes};
use crate::state::AppState;

/// Page-wide data every full page template renders.
pub struct PageChrome {
    pub flashes: Vec<Flash>,
    pub signed_in: bool,
}

impl PageChrome {
    /// Take pending flashes from the session.
    pub async fn load(session: &Session, signed_in: bool) -> Self {
        Self {
            flashes: take_flashes(session).await,
            signed_in,
        }
    }

    /// Add a flash raised while handling this request.
    pub fn push(&mut self, flash: Flash) {
        self.flashes.push(flash);
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the admin moderation routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles/{id}/approve", post(admin::approve_profile))
        .route("/products/{id}/approve", post(admin::approve_product))
        .route("/products/{id}/reject", post(admin::reject_product))
}

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/products/{id}/cart", post(products::add_to_cart))
        .route("/profile", post(profile::update))
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
}
