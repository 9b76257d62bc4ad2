//! Public product listing, detail pricing and add-to-cart.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use herhouse_integration_tests::TestApp;
use serde_json::{Value, json};

/// An approved host with a storefront name.
fn seed_host(app: &TestApp) -> Value {
    let host = app.backend.add_user("sana@example.pk", Some("Sana"));
    app.backend.seed_profile(
        &host,
        "her_host",
        json!({ "is_approved": true, "store_name": "Sana Closet", "city": "Lahore" }),
    )
}

#[tokio::test]
async fn test_listing_shows_only_approved_products() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    app.backend
        .seed_product(&host["id"], "Lawn Suit", json!({ "category": "Clothing" }));
    app.backend.seed_product(
        &host["id"],
        "Gold Jhumkas",
        json!({ "category": "Jewellery", "status": "pending" }),
    );
    app.backend.seed_product(
        &host["id"],
        "Velvet Shawl",
        json!({ "category": "Clothing", "status": "rejected" }),
    );

    let page = app.get("/products").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Lawn Suit"));
    assert!(!page.body.contains("Gold Jhumkas"));
    assert!(!page.body.contains("Velvet Shawl"));
    assert!(page.body.contains("1 product<"));
}

#[tokio::test]
async fn test_listing_search_matches_title_and_description() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    app.backend.seed_product(&host["id"], "Lawn Suit", json!({}));
    app.backend.seed_product(
        &host["id"],
        "Summer Set",
        json!({ "description": "Three piece LAWN with dupatta" }),
    );
    app.backend.seed_product(&host["id"], "Silk Scarf", json!({}));

    let page = app.get("/products?q=lawn").await;
    assert!(page.body.contains("Lawn Suit"));
    assert!(page.body.contains("Summer Set"));
    assert!(!page.body.contains("Silk Scarf"));
    assert!(page.body.contains("2 products"));
}

#[tokio::test]
async fn test_listing_category_filter() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    app.backend
        .seed_product(&host["id"], "Lawn Suit", json!({ "category": "Clothing" }));
    app.backend
        .seed_product(&host["id"], "Gold Jhumkas", json!({ "category": "Jewellery" }));

    let page = app.get("/products?category=Jewellery").await;
    assert!(page.body.contains("Gold Jhumkas"));
    assert!(!page.body.contains("Lawn Suit"));
    // Every category stays selectable
    assert!(page.body.contains(r#"<option value="Clothing">"#));

    let all = app.get("/products?category=all").await;
    assert!(all.body.contains("Gold Jhumkas"));
    assert!(all.body.contains("Lawn Suit"));
}

#[tokio::test]
async fn test_listing_with_no_matches() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    app.backend.seed_product(&host["id"], "Lawn Suit", json!({}));

    let page = app.get("/products?q=kurta").await;
    assert!(page.body.contains("No products found"));
    assert!(page.body.contains("0 products"));
}

#[tokio::test]
async fn test_listing_failure_flashes_error() {
    let app = TestApp::spawn().await;
    app.backend.fail_reads("products");

    let page = app.get("/products").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Failed to load products"));
    assert!(page.body.contains("No products found"));
}

#[tokio::test]
async fn test_detail_applies_bulk_pricing() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app.backend.seed_product(
        &host["id"],
        "Lawn Suit",
        json!({
            "category": "Clothing",
            "brand": "Gul Ahmed",
            "sale_price": 800,
            "bulk_price": 600,
            "bulk_quantity": 5,
            "stock_quantity": 7,
        }),
    );
    let id = product["id"].as_str().unwrap();

    let single = app.get(&format!("/products/{id}")).await;
    assert_eq!(single.status, StatusCode::OK);
    assert!(single.body.contains("PKR 800"));
    assert!(single.body.contains("PKR 1,000"));
    assert!(single.body.contains("Buy 5+ for PKR 600 each"));
    assert!(single.body.contains("7 available"));
    assert!(single.body.contains("Gul Ahmed"));
    assert!(!single.body.contains("Bulk discount"));

    let bulk = app.get(&format!("/products/{id}?quantity=5")).await;
    assert!(bulk.body.contains("PKR 3,000"));
    assert!(bulk.body.contains("Bulk discount: you save PKR 1,000"));
}

#[tokio::test]
async fn test_detail_clamps_quantity_to_stock() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app
        .backend
        .seed_product(&host["id"], "Lawn Suit", json!({ "stock_quantity": 3 }));
    let id = product["id"].as_str().unwrap();

    let page = app.get(&format!("/products/{id}?quantity=50")).await;
    assert!(page.body.contains(r#"<input type="hidden" name="quantity" value="3">"#));
    assert!(page.body.contains("PKR 3,000"));
    assert!(!page.body.contains("Increase quantity"));
}

#[tokio::test]
async fn test_detail_ignores_malformed_quantity() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app
        .backend
        .seed_product(&host["id"], "Lawn Suit", json!({ "stock_quantity": 3 }));
    let id = product["id"].as_str().unwrap();

    for quantity in ["-1", "abc", "99999999999", ""] {
        let page = app.get(&format!("/products/{id}?quantity={quantity}")).await;
        assert_eq!(page.status, StatusCode::OK, "quantity={quantity}");
        assert!(
            page.body.contains(r#"<input type="hidden" name="quantity" value="1">"#),
            "quantity={quantity}"
        );
    }
}

#[tokio::test]
async fn test_dearer_bulk_price_shows_no_discount() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app.backend.seed_product(
        &host["id"],
        "Lawn Suit",
        json!({ "sale_price": 500, "bulk_price": 700, "bulk_quantity": 2 }),
    );
    let id = product["id"].as_str().unwrap();

    let page = app.get(&format!("/products/{id}?quantity=2")).await;
    assert!(page.body.contains("PKR 1,400"));
    assert!(!page.body.contains("Bulk discount"));
}

#[tokio::test]
async fn test_detail_shows_verified_seller() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app.backend.seed_product(&host["id"], "Lawn Suit", json!({}));
    let id = product["id"].as_str().unwrap();

    let page = app.get(&format!("/products/{id}")).await;
    assert!(page.body.contains("Sold by"));
    assert!(page.body.contains("Sana Closet"));
    assert!(page.body.contains("Lahore"));
    assert!(page.body.contains("Verified Host"));
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = TestApp::spawn().await;

    let missing = app
        .get("/products/6f1c1b1e-52a4-4d0c-9d3f-0a9b7e1c2d3e")
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.body.contains("Product Not Found"));

    let malformed = app.get("/products/not-a-product").await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);
    assert!(malformed.body.contains("Product Not Found"));
}

#[tokio::test]
async fn test_pending_product_is_not_found() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app
        .backend
        .seed_product(&host["id"], "Lawn Suit", json!({ "status": "pending" }));
    let id = product["id"].as_str().unwrap();

    let page = app.get(&format!("/products/{id}")).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_to_cart_requires_sign_in() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app.backend.seed_product(&host["id"], "Lawn Suit", json!({}));
    let id = product["id"].as_str().unwrap();

    let response = app
        .post_form(&format!("/products/{id}/cart"), &[("quantity", "2")])
        .await;
    assert_eq!(response.redirect_target(), format!("/products/{id}"));

    let page = app.get(response.redirect_target()).await;
    assert!(page.body.contains("Please sign in to add items to cart"));
}

#[tokio::test]
async fn test_add_to_cart_confirms_quantity() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app
        .backend
        .seed_product(&host["id"], "Lawn Suit", json!({ "stock_quantity": 10 }));
    let id = product["id"].as_str().unwrap();
    let shopper = app.backend.add_user("amina@example.pk", Some("Amina"));
    app.sign_in(&shopper).await;

    let response = app
        .post_form(&format!("/products/{id}/cart"), &[("quantity", "2")])
        .await;
    assert_eq!(
        response.redirect_target(),
        format!("/products/{id}?quantity=2")
    );

    let page = app.get(response.redirect_target()).await;
    assert!(page.body.contains("Added to Cart"));
    assert!(page.body.contains("2x Lawn Suit added to cart"));
}

#[tokio::test]
async fn test_add_to_cart_with_malformed_quantity_adds_one() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app.backend.seed_product(&host["id"], "Lawn Suit", json!({}));
    let id = product["id"].as_str().unwrap();
    let shopper = app.backend.add_user("amina@example.pk", Some("Amina"));
    app.sign_in(&shopper).await;

    let response = app
        .post_form(&format!("/products/{id}/cart"), &[("quantity", "lots")])
        .await;
    assert_eq!(
        response.redirect_target(),
        format!("/products/{id}?quantity=1")
    );

    let page = app.get(response.redirect_target()).await;
    assert!(page.body.contains("1x Lawn Suit added to cart"));
}

#[tokio::test]
async fn test_out_of_stock_cannot_be_added() {
    let app = TestApp::spawn().await;
    let host = seed_host(&app);
    let product = app
        .backend
        .seed_product(&host["id"], "Lawn Suit", json!({ "stock_quantity": 0 }));
    let id = product["id"].as_str().unwrap();
    let shopper = app.backend.add_user("amina@example.pk", Some("Amina"));
    app.sign_in(&shopper).await;

    let detail = app.get(&format!("/products/{id}")).await;
    assert!(detail.body.contains("Out of Stock"));

    let response = app
        .post_form(&format!("/products/{id}/cart"), &[("quantity", "1")])
        .await;
    let page = app.get(response.redirect_target()).await;
    assert!(page.body.contains("This product is out of stock"));
}
