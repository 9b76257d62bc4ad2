//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use herhouse_core::catalog::{ListingFilter, categories};
use herhouse_core::pricing::Availability;
use herhouse_core::{Product, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{Flash, push_flash};
use crate::routes::PageChrome;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Product summary for cards and tables.
#[derive(Clone)]
pub struct ProductCard {
    pub id: String,
    pub title: String,
    pub category: String,
    pub image: Option<String>,
    /// Price for a single unit after any sale.
    pub price: String,
    /// Base price, shown struck through when a sale applies.
    pub original_price: Option<String>,
    pub featured: bool,
    pub status: &'static str,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        let quote = product.pricing().quote(1);
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            category: product.category.clone().unwrap_or_default(),
            image: product.image_urls().first().cloned(),
            price: quote.final_unit.to_string(),
            original_price: quote
                .shows_original()
                .then(|| quote.base_unit.to_string()),
            featured: product.featured(),
            status: product.moderation().as_str(),
        }
    }
}

/// Seller block on the product page.
pub struct SellerView {
    pub name: String,
    pub city: Option<String>,
    pub verified: bool,
}

/// Everything the product page shows about price and stock.
pub struct PurchaseView {
    pub quantity: u32,
    pub unit_price: String,
    pub original_unit_price: Option<String>,
    pub total: String,
    pub original_total: Option<String>,
    pub bulk_applies: bool,
    /// "Buy N+ for PKR X each" when bulk pricing exists.
    pub bulk_hint: Option<String>,
    pub bulk_savings: Option<String>,
    pub availability: Option<String>,
    pub purchasable: bool,
    pub can_decrease: bool,
    pub can_increase: bool,
}

impl PurchaseView {
    fn new(product: &Product, requested: Option<u32>) -> Self {
        let pricing = product.pricing();
        let availability = Availability::from_stock(product.stock_quantity);
        let quantity = availability.clamp_quantity(requested);
        let quote = pricing.quote(quantity);

        Self {
            quantity,
            unit_price: quote.final_unit.to_string(),
            original_unit_price: (quote.final_unit != quote.base_unit)
                .then(|| quote.base_unit.to_string()),
            total: quote.total().to_string(),
            original_total: quote
                .shows_original()
                .then(|| quote.original_total().to_string()),
            bulk_applies: quote.bulk_applies,
            bulk_hint: pricing.bulk_price.map(|bulk| {
                format!("Buy {}+ for {bulk} each", pricing.bulk_threshold())
            }),
            bulk_savings: quote.bulk_savings().as_ref().map(ToString::to_string),
            availability: availability.label(),
            purchasable: availability.purchasable(),
            can_decrease: quantity > 1,
            can_increase: availability.can_increase(quantity),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub chrome: PageChrome,
    pub products: Vec<ProductCard>,
    pub categories: Vec<String>,
    pub search: String,
    pub category: String,
    pub total: usize,
}

/// Product detail query parameters.
///
/// The quantity stays raw so a malformed value falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub quantity: Option<String>,
}

/// Parse a requested quantity, ignoring anything that is not a whole number.
fn requested_quantity(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|value| value.trim().parse().ok())
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub chrome: PageChrome,
    pub product: ProductCard,
    pub description: String,
    pub images: Vec<String>,
    pub details: Vec<(&'static str, String)>,
    pub purchase: PurchaseView,
    pub seller: Option<SellerView>,
}

/// Product not found template.
#[derive(Template, WebTemplate)]
#[template(path = "products/not_found.html")]
pub struct ProductNotFoundTemplate {
    pub chrome: PageChrome,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display product listing page.
///
/// The approved listing is fetched (or read from cache) once; search and
/// category narrow it in memory.
#[instrument(skip(state, session, context))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(context): OptionalAuth,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let mut chrome = PageChrome::load(&session, context.is_some()).await;
    let filter = ListingFilter::new(query.q.as_deref(), query.category.as_deref());

    let products = match state.catalog().approved_products().await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load products");
            chrome.push(Flash::error("Error", "Failed to load products"));
            std::sync::Arc::default()
        }
    };

    let matching: Vec<ProductCard> = filter
        .apply(&products)
        .into_iter()
        .map(ProductCard::from)
        .collect();

    ProductsIndexTemplate {
        chrome,
        total: matching.len(),
        products: matching,
        categories: categories(&products),
        search: filter.search().to_owned(),
        category: filter.category.as_param().to_owned(),
    }
}

/// Display product detail page.
#[instrument(skip(state, session, context, query))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(context): OptionalAuth,
    Path(id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Response {
    let mut chrome = PageChrome::load(&session, context.is_some()).await;
    let token = context.as_ref().map(|c| c.access_token());

    let detail = match id.parse::<ProductId>() {
        Ok(id) => state.catalog().product_detail(id, token).await,
        Err(_) => {
            chrome.push(Flash::error("Error", "Product not found"));
            return (StatusCode::NOT_FOUND, ProductNotFoundTemplate { chrome }).into_response();
        }
    };

    let detail = match detail {
        Ok(detail) => detail,
        Err(e) => {
            if !e.is_not_found() {
                tracing::error!(error = %e, "Failed to load product");
            }
            chrome.push(Flash::error("Error", "Product not found"));
            return (StatusCode::NOT_FOUND, ProductNotFoundTemplate { chrome }).into_response();
        }
    };

    let product = &detail.product;
    let details = [
        ("Category", product.category.clone()),
        ("Brand", product.brand.clone()),
        ("Size", product.size.clone()),
        ("Color", product.color.clone()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.filter(|v| !v.is_empty()).map(|v| (label, v)))
    .collect();

    let seller = detail.host.as_ref().map(|host| SellerView {
        name: host.storefront_name().to_owned(),
        city: host.city.clone(),
        verified: host.approved(),
    });

    ProductShowTemplate {
        chrome,
        product: ProductCard::from(product),
        description: product.description.clone().unwrap_or_default(),
        images: product.image_urls().to_vec(),
        details,
        purchase: PurchaseView::new(product, requested_quantity(query.quantity.as_deref())),
        seller,
    }
    .into_response()
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub quantity: Option<String>,
}

/// Add a product to the cart.
///
/// There is no persisted cart yet: the handler validates the product and
/// quantity and confirms with a notification.
#[instrument(skip(state, session, context, form))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(context): OptionalAuth,
    Path(id): Path<String>,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        push_flash(&session, Flash::error("Error", "Product not found")).await;
        return Redirect::to("/products").into_response();
    };
    let back = format!("/products/{product_id}");

    let Some(context) = context else {
        push_flash(
            &session,
            Flash::error("Sign in required", "Please sign in to add items to cart"),
        )
        .await;
        return Redirect::to(&back).into_response();
    };

    let detail = match state
        .catalog()
        .product_detail(product_id, Some(context.access_token()))
        .await
    {
        Ok(detail) => detail,
        Err(e) => {
            if !e.is_not_found() {
                tracing::error!(error = %e, "Failed to load product for cart");
            }
            push_flash(&session, Flash::error("Error", "Product not found")).await;
            return Redirect::to("/products").into_response();
        }
    };

    let product = &detail.product;
    let availability = Availability::from_stock(product.stock_quantity);
    if !availability.purchasable() {
        push_flash(&session, Flash::error("Out of stock", "This product is out of stock")).await;
        return Redirect::to(&back).into_response();
    }

    let quantity = availability.clamp_quantity(requested_quantity(form.quantity.as_deref()));
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[
            ("product_id", back.as_str()),
            ("quantity", quantity.to_string().as_str()),
        ]),
    );
    push_flash(
        &session,
        Flash::success(
            "Added to Cart",
            format!("{quantity}x {} added to cart", product.title),
        ),
    )
    .await;

    Redirect::to(&format!("{back}?quantity={quantity}")).into_response()
}
