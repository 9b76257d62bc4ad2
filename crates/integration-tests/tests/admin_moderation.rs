//! Admin approval of profiles and moderation of products.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use herhouse_integration_tests::TestApp;
use serde_json::{Value, json};

/// Sign in as a fresh admin.
async fn sign_in_admin(app: &TestApp) -> Value {
    let admin = app.backend.add_user("admin@herhouse.pk", Some("Admin"));
    let profile = app
        .backend
        .seed_profile(&admin, "admin", json!({ "is_approved": true }));
    app.sign_in(&admin).await;
    profile
}

/// A host waiting on approval.
fn seed_pending_host(app: &TestApp) -> Value {
    let host = app.backend.add_user("sana@example.pk", Some("Sana"));
    app.backend.seed_profile(
        &host,
        "her_host",
        json!({ "full_name": "Sana Malik", "store_name": "Sana Closet" }),
    )
}

#[tokio::test]
async fn test_dashboard_lists_pending_items_and_stats() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);
    let customer = app.backend.add_user("amina@example.pk", Some("Amina"));
    let customer = app.backend.seed_profile(&customer, "her_customer", json!({}));
    app.backend.seed_product(
        &host["id"],
        "Gold Jhumkas",
        json!({ "status": "pending", "category": "Jewellery" }),
    );
    app.backend.seed_product(&host["id"], "Lawn Suit", json!({}));
    app.backend.seed_order(&customer["id"], &host["id"], 2_500);
    app.backend.seed_order(&customer["id"], &host["id"], 10_000);
    sign_in_admin(&app).await;

    let page = app.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Admin Dashboard"));
    assert!(page.body.contains("Sana Malik"));
    assert!(page.body.contains("Sana Closet"));
    assert!(page.body.contains(&format!(
        "/admin/profiles/{}/approve",
        host["id"].as_str().unwrap()
    )));
    assert!(page.body.contains("Gold Jhumkas"));
    assert!(page.body.contains("PKR 12,500"));
    // Pending host plus pending product
    assert!(page.body.contains(
        r#"<span class="stat__label">Pending Approvals</span><span class="stat__value">2</span>"#
    ));
    assert!(page.body.contains(
        r#"<span class="stat__label">Total Users</span><span class="stat__value">3</span>"#
    ));
}

#[tokio::test]
async fn test_approve_profile() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);
    sign_in_admin(&app).await;
    let action = format!("/admin/profiles/{}/approve", host["id"].as_str().unwrap());

    let before = app.get("/").await;
    assert!(before.body.contains(&action));

    let response = app.post_form(&action, &[]).await;
    assert_eq!(response.redirect_target(), "/");
    assert_eq!(
        app.backend.row("profiles", &host["id"]).unwrap()["is_approved"],
        true
    );

    let after = app.get("/").await;
    assert!(after.body.contains("Profile has been approved successfully"));
    assert!(!after.body.contains(&action));
    assert!(after.body.contains("No profiles awaiting approval."));
}

#[tokio::test]
async fn test_approve_product_refreshes_public_listing() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);
    let product = app
        .backend
        .seed_product(&host["id"], "Gold Jhumkas", json!({ "status": "pending" }));
    sign_in_admin(&app).await;

    let listing = app.get("/products").await;
    assert!(!listing.body.contains("Gold Jhumkas"));

    let response = app
        .post_form(
            &format!("/admin/products/{}/approve", product["id"].as_str().unwrap()),
            &[],
        )
        .await;
    assert_eq!(response.redirect_target(), "/");
    assert_eq!(
        app.backend.row("products", &product["id"]).unwrap()["status"],
        "approved"
    );

    let page = app.get("/").await;
    assert!(page.body.contains("Product has been approved successfully"));
    assert!(page.body.contains("No products awaiting moderation."));

    let listing = app.get("/products").await;
    assert!(listing.body.contains("Gold Jhumkas"));
}

#[tokio::test]
async fn test_reject_product() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);
    let product = app
        .backend
        .seed_product(&host["id"], "Gold Jhumkas", json!({ "status": "pending" }));
    sign_in_admin(&app).await;
    app.get("/").await;

    app.post_form(
        &format!("/admin/products/{}/reject", product["id"].as_str().unwrap()),
        &[],
    )
    .await;

    assert_eq!(
        app.backend.row("products", &product["id"]).unwrap()["status"],
        "rejected"
    );
    let page = app.get("/").await;
    assert!(page.body.contains("Product has been rejected"));
    assert!(page.body.contains("No products awaiting moderation."));
}

#[tokio::test]
async fn test_failed_moderation_keeps_item_pending() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);
    let product = app
        .backend
        .seed_product(&host["id"], "Gold Jhumkas", json!({ "status": "pending" }));
    sign_in_admin(&app).await;
    app.get("/").await;
    app.backend.fail_writes("products");

    let action = format!("/admin/products/{}/reject", product["id"].as_str().unwrap());
    let response = app.post_form(&action, &[]).await;
    assert_eq!(response.redirect_target(), "/");

    let page = app.get("/").await;
    assert!(page.body.contains("Failed to reject product"));
    assert!(page.body.contains(&action));
    assert_eq!(
        app.backend.row("products", &product["id"]).unwrap()["status"],
        "pending"
    );
}

#[tokio::test]
async fn test_reload_after_moderation_refetches() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);
    sign_in_admin(&app).await;
    app.get("/").await;

    app.post_form(
        &format!("/admin/profiles/{}/approve", host["id"].as_str().unwrap()),
        &[],
    )
    .await;
    let after = app.get("/").await;
    assert!(after.body.contains("No profiles awaiting approval."));

    let newcomer = app.backend.add_user("hina@example.pk", Some("Hina"));
    let newcomer = app.backend.seed_profile(
        &newcomer,
        "her_supplier",
        json!({ "full_name": "Hina Qureshi" }),
    );
    let reloaded = app.get("/").await;
    assert!(reloaded.body.contains("Hina Qureshi"));
    assert!(reloaded.body.contains(&format!(
        "/admin/profiles/{}/approve",
        newcomer["id"].as_str().unwrap()
    )));
}

#[tokio::test]
async fn test_concurrent_moderation_keeps_both_changes() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);
    let first = app
        .backend
        .seed_product(&host["id"], "Gold Jhumkas", json!({ "status": "pending" }));
    let second = app
        .backend
        .seed_product(&host["id"], "Velvet Shawl", json!({ "status": "pending" }));
    sign_in_admin(&app).await;
    let before = app.get("/").await;
    assert!(before.body.contains("Gold Jhumkas"));
    assert!(before.body.contains("Velvet Shawl"));

    let first_action = format!("/admin/products/{}/reject", first["id"].as_str().unwrap());
    let second_action = format!("/admin/products/{}/approve", second["id"].as_str().unwrap());
    tokio::join!(
        app.post_form(&first_action, &[]),
        app.post_form(&second_action, &[]),
    );

    let page = app.get("/").await;
    assert!(!page.body.contains(&first_action));
    assert!(!page.body.contains(&second_action));
    assert!(page.body.contains("No products awaiting moderation."));
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);
    let customer = app.backend.add_user("amina@example.pk", Some("Amina"));
    app.backend.seed_profile(&customer, "her_customer", json!({}));
    app.sign_in(&customer).await;

    let response = app
        .post_form(
            &format!("/admin/profiles/{}/approve", host["id"].as_str().unwrap()),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.backend.row("profiles", &host["id"]).unwrap().get("is_approved"),
        None
    );
}

#[tokio::test]
async fn test_signed_out_moderation_redirects_to_login() {
    let app = TestApp::spawn().await;
    let host = seed_pending_host(&app);

    let response = app
        .post_form(
            &format!("/admin/profiles/{}/approve", host["id"].as_str().unwrap()),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.redirect_target(), "/auth/login");
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let app = TestApp::spawn().await;
    sign_in_admin(&app).await;

    let response = app.post_form("/admin/products/not-an-id/approve", &[]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
