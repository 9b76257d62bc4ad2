//! First sign-in profile bootstrap, end to end through the root page.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use herhouse_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_first_sign_in_creates_customer_profile() {
    let app = TestApp::spawn().await;
    let amina = app.backend.add_user("amina@example.pk", Some("Amina Khan"));

    let callback = app.sign_in(&amina).await;
    assert_eq!(callback.redirect_target(), "/");

    let page = app.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Welcome back, Amina Khan"));

    let profiles = app.backend.rows("profiles");
    assert_eq!(profiles.len(), 1);
    let profile = &profiles[0];
    assert_eq!(profile["user_id"], json!(amina.id));
    assert_eq!(profile["email"], "amina@example.pk");
    assert_eq!(profile["full_name"], "Amina Khan");
    assert_eq!(profile["role"], "her_customer");
}

#[tokio::test]
async fn test_profile_resolution_is_idempotent() {
    let app = TestApp::spawn().await;
    let amina = app.backend.add_user("amina@example.pk", Some("Amina Khan"));
    app.sign_in(&amina).await;

    app.get("/").await;
    app.get("/").await;
    app.get("/").await;

    assert_eq!(app.backend.insert_count("profiles"), 1);
    assert_eq!(app.backend.rows("profiles").len(), 1);
}

#[tokio::test]
async fn test_existing_profile_is_not_recreated() {
    let app = TestApp::spawn().await;
    let sana = app.backend.add_user("sana@example.pk", Some("Sana"));
    app.backend
        .seed_profile(&sana, "her_customer", json!({ "full_name": "Sana Malik" }));
    app.sign_in(&sana).await;

    let page = app.get("/").await;
    assert!(page.body.contains("Welcome back, Sana Malik"));
    assert_eq!(app.backend.insert_count("profiles"), 0);
}

#[tokio::test]
async fn test_concurrent_bootstrap_uses_winning_row() {
    let app = TestApp::spawn().await;
    let amina = app.backend.add_user("amina@example.pk", Some("Amina Khan"));
    app.backend.race_next_profile_insert();
    app.sign_in(&amina).await;

    let page = app.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Welcome back, Amina Khan"));
    assert!(!page.body.contains("Profile Error"));

    // Only the concurrent writer's row exists
    assert_eq!(app.backend.rows("profiles").len(), 1);
    assert_eq!(app.backend.insert_count("profiles"), 0);
}

#[tokio::test]
async fn test_full_name_defaults_to_email_local_part() {
    let app = TestApp::spawn().await;
    let user = app.backend.add_user("noor.fatima@example.pk", None);
    app.sign_in(&user).await;

    let page = app.get("/").await;
    assert!(page.body.contains("Welcome back, noor.fatima"));
    assert_eq!(app.backend.rows("profiles")[0]["full_name"], "noor.fatima");
}

#[tokio::test]
async fn test_fetch_failure_shows_setting_up_notice() {
    let app = TestApp::spawn().await;
    let amina = app.backend.add_user("amina@example.pk", Some("Amina Khan"));
    app.backend.fail_reads("profiles");
    app.sign_in(&amina).await;

    let page = app.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Setting up your profile..."));
    assert!(page.body.contains("Profile Error"));
    assert!(page.body.contains("Failed to fetch user profile"));
    assert_eq!(app.backend.insert_count("profiles"), 0);
}

#[tokio::test]
async fn test_create_failure_flashes_profile_error() {
    let app = TestApp::spawn().await;
    let amina = app.backend.add_user("amina@example.pk", Some("Amina Khan"));
    app.backend.fail_writes("profiles");
    app.sign_in(&amina).await;

    let page = app.get("/").await;
    assert!(page.body.contains("Setting up your profile..."));
    assert!(page.body.contains("Failed to create user profile"));
}

#[tokio::test]
async fn test_profile_update_applies_non_blank_fields() {
    let app = TestApp::spawn().await;
    let sana = app.backend.add_user("sana@example.pk", Some("Sana"));
    let profile = app.backend.seed_profile(
        &sana,
        "her_host",
        json!({ "is_approved": true, "city": "Karachi", "store_name": "Sana's Closet" }),
    );
    app.sign_in(&sana).await;

    let response = app
        .post_form(
            "/profile",
            &[
                ("full_name", "Sana Malik"),
                ("phone", "03001234567"),
                ("city", ""),
                ("store_name", "  "),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/");

    let row = app.backend.row("profiles", &profile["id"]).unwrap();
    assert_eq!(row["full_name"], "Sana Malik");
    assert_eq!(row["phone"], "03001234567");
    assert_eq!(row["city"], "Karachi");
    assert_eq!(row["store_name"], "Sana's Closet");

    let page = app.get("/").await;
    assert!(page.body.contains("Profile Updated"));
}

#[tokio::test]
async fn test_profile_update_requires_sign_in() {
    let app = TestApp::spawn().await;

    let response = app.post_form("/profile", &[("full_name", "Nobody")]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response.redirect_target().starts_with("/auth/login"));
}
