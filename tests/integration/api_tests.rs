use super::*;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::ServiceExt;
use serde_json::json;

const ITEM_URL: &str = "https://shop.example/item";

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(app.router(), Method::GET, "/health", &[], None).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "pricedrop-watcher");
    Ok(())
}

#[tokio::test]
async fn test_product_routes_require_session() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    for (method, uri) in [
        (Method::GET, "/api/products"),
        (Method::POST, "/api/products"),
        (Method::DELETE, "/api/products/abc"),
        (Method::GET, "/api/products/abc/history"),
    ] {
        let response = make_request(app.router(), method, uri, &[], None).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(read_json(response).await?["error"], "Not authenticated");
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_session_token_rejected() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(
        app.router(),
        Method::GET,
        "/api/products",
        &[bearer("not-a-real-token")],
        None,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_session_cookie_is_accepted() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(
        app.router(),
        Method::GET,
        "/api/products",
        &[("cookie", format!("sb-access-token={}", token_for("user-a")))],
        None,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await?, json!([]));
    Ok(())
}

#[tokio::test]
async fn test_add_product_then_re_add_updates() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.scraper.set_price(ITEM_URL, "Widget", "19.99");
    let auth = [bearer(&token_for("user-a"))];

    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &auth,
        Some(json!({ "url": ITEM_URL })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let created = read_json(response).await?;
    assert_eq!(created["success"], true);
    assert_eq!(created["message"], "Product added successfully!");
    assert_eq!(created["product"]["name"], "Widget");
    assert_eq!(created["product"]["current_price"], json!(19.99));
    assert_eq!(created["product"]["currency"], "USD");

    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &auth,
        Some(json!({ "url": ITEM_URL })),
    )
    .await?;
    let updated = read_json(response).await?;
    assert_eq!(updated["message"], "Product updated with latest price!");
    assert_eq!(updated["product"]["id"], created["product"]["id"]);

    let response = make_request(app.router(), Method::GET, "/api/products", &auth, None).await?;
    let listed = read_json(response).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_search_url_rejected_before_scraping() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &[bearer(&token_for("user-a"))],
        Some(json!({ "url": "https://www.amazon.com/s?k=headphones" })),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await?;
    assert!(body["error"].as_str().unwrap_or_default().contains("search or listing page"));
    assert_eq!(app.scraper.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_url_rejected() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &[bearer(&token_for("user-a"))],
        Some(json!({ "url": "  " })),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await?["error"], "URL is required");
    Ok(())
}

#[tokio::test]
async fn test_missing_url_field_rejected() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &[bearer(&token_for("user-a"))],
        Some(json!({})),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await?, json!({ "error": "URL is required" }));
    assert_eq!(app.scraper.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_body_gets_json_error() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/products")
        .header("authorization", format!("Bearer {}", token_for("user-a")))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let response = app.router().oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await?["error"], "Invalid request body");

    // No content type at all
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/products")
        .header("authorization", format!("Bearer {}", token_for("user-a")))
        .body(Body::from(r#"{"url":"https://shop.example/item"}"#))?;
    let response = app.router().oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await?["error"], "Invalid request body");
    Ok(())
}

#[tokio::test]
async fn test_unextractable_page_is_unprocessable() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &[bearer(&token_for("user-a"))],
        Some(json!({ "url": "https://shop.example/unknown" })),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        read_json(response).await?["error"],
        "Could not extract product information from this URL"
    );
    Ok(())
}

#[tokio::test]
async fn test_non_numeric_price_is_rejected() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.scraper.set_page(
        ITEM_URL,
        ScrapedProduct {
            name: Some("Widget".to_string()),
            price: Some(ScrapedPrice::Unparseable("Call for price".to_string())),
            currency: None,
            image_url: None,
        },
    );

    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &[bearer(&token_for("user-a"))],
        Some(json!({ "url": ITEM_URL })),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(response).await?["error"], "Invalid price detected");
    Ok(())
}

#[tokio::test]
async fn test_delete_by_other_user_has_no_effect() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.scraper.set_price(ITEM_URL, "Widget", "19.99");

    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &[bearer(&token_for("user-a"))],
        Some(json!({ "url": ITEM_URL })),
    )
    .await?;
    let product_id = read_json(response).await?["product"]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let uri = format!("/api/products/{}", product_id);
    let response = make_request(
        app.router(),
        Method::DELETE,
        &uri,
        &[bearer(&token_for("user-b"))],
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await?["error"], "Product not found");
    assert_eq!(app.db.count_products().await?, 1);

    let response = make_request(
        app.router(),
        Method::DELETE,
        &uri,
        &[bearer(&token_for("user-a"))],
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await?["success"], true);
    assert_eq!(app.db.count_products().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_history_is_owner_scoped_and_ordered() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    let owner = [bearer(&token_for("user-a"))];

    app.scraper.set_price(ITEM_URL, "Widget", "19.99");
    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &owner,
        Some(json!({ "url": ITEM_URL })),
    )
    .await?;
    let product_id = read_json(response).await?["product"]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    app.scraper.set_price(ITEM_URL, "Widget", "17.50");
    make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &owner,
        Some(json!({ "url": ITEM_URL })),
    )
    .await?;

    let uri = format!("/api/products/{}/history", product_id);
    let response = make_request(app.router(), Method::GET, &uri, &owner, None).await?;
    let history = read_json(response).await?;
    let prices: Vec<f64> = history
        .as_array()
        .map(|rows| rows.iter().filter_map(|row| row["price"].as_f64()).collect())
        .unwrap_or_default();
    assert_eq!(prices, vec![19.99, 17.50]);

    let response = make_request(
        app.router(),
        Method::GET,
        &uri,
        &[bearer(&token_for("user-b"))],
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await?, json!([]));
    Ok(())
}
