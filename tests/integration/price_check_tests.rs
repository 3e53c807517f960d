use super::*;
use axum::http::{Method, StatusCode};
use serde_json::json;

const CRON_PATH: &str = "/api/cron/check-prices";

async fn add_as(app: &TestApp, user_id: &str, url: &str) -> anyhow::Result<Value> {
    let response = make_request(
        app.router(),
        Method::POST,
        "/api/products",
        &[bearer(&token_for(user_id))],
        Some(json!({ "url": url })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(read_json(response).await?["product"].clone())
}

async fn trigger(app: &TestApp) -> anyhow::Result<Value> {
    let response = make_request(app.router(), Method::POST, CRON_PATH, &[bearer(CRON_SECRET)], None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

#[tokio::test]
async fn test_cron_requires_secret() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(app.router(), Method::POST, CRON_PATH, &[], None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await?, json!({ "error": "Unauthorized" }));

    let response = make_request(
        app.router(),
        Method::POST,
        CRON_PATH,
        &[bearer("wrong-secret")],
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A valid user session is not the cron secret
    let response = make_request(
        app.router(),
        Method::POST,
        CRON_PATH,
        &[bearer(&token_for("user-a"))],
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_cron_get_reports_availability() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let response = make_request(app.router(), Method::GET, CRON_PATH, &[], None).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await?,
        json!({ "message": "Price check endpoint is working. Use POST to trigger." })
    );
    Ok(())
}

#[tokio::test]
async fn test_cron_with_no_products() -> anyhow::Result<()> {
    let app = create_test_app().await?;

    let body = trigger(&app).await?;

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "No products to check");
    assert_eq!(
        body["results"],
        json!({ "total": 0, "updated": 0, "failed": 0, "priceChanges": 0, "alertsSent": 0 })
    );
    Ok(())
}

#[tokio::test]
async fn test_price_drop_end_to_end() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.auth.add_user("user-a", "owner@example.com");

    app.scraper.set_price("https://shop.example/item", "Widget", "19.99");
    let product = add_as(&app, "user-a", "https://shop.example/item").await?;
    let product_id = product["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(app.db.count_observations(&product_id).await?, 1);

    app.scraper.set_price("https://shop.example/item", "Widget", "14.99");
    let body = trigger(&app).await?;

    assert_eq!(body["message"], "Price check completed");
    assert_eq!(
        body["results"],
        json!({ "total": 1, "updated": 1, "failed": 0, "priceChanges": 1, "alertsSent": 1 })
    );

    let history = app.db.price_history(&product_id, "user-a").await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].price.to_string(), "14.99");

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "owner@example.com");
    assert_eq!(sent[0].1.product_name, "Widget");
    assert_eq!(sent[0].1.old_price.to_string(), "19.99");
    assert_eq!(sent[0].1.new_price.to_string(), "14.99");
    Ok(())
}

#[tokio::test]
async fn test_batch_counts_and_alert_rules() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.auth.add_user("user-a", "a@example.com");
    app.auth.add_user("user-b", "b@example.com");

    app.scraper.set_price("https://shop.example/drop", "Drop", "50.00");
    app.scraper.set_price("https://shop.example/rise", "Rise", "10.00");
    app.scraper.set_price("https://shop.example/same", "Same", "5.00");
    app.scraper.set_price("https://shop.example/gone", "Gone", "8.00");
    add_as(&app, "user-a", "https://shop.example/drop").await?;
    add_as(&app, "user-b", "https://shop.example/rise").await?;
    add_as(&app, "user-a", "https://shop.example/same").await?;
    add_as(&app, "user-b", "https://shop.example/gone").await?;

    app.scraper.set_price("https://shop.example/drop", "Drop", "45.00");
    app.scraper.set_price("https://shop.example/rise", "Rise", "12.00");
    app.scraper.set_price("https://shop.example/same", "Same", "5.0");
    app.scraper.set_page("https://shop.example/gone", ScrapedProduct::default());

    let results = trigger(&app).await?["results"].clone();

    assert_eq!(results["total"], 4);
    assert_eq!(results["updated"], 3);
    assert_eq!(results["failed"], 1);
    assert_eq!(results["priceChanges"], 2);
    assert_eq!(results["alertsSent"], 1);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "a@example.com");
    Ok(())
}

#[tokio::test]
async fn test_overlapping_triggers_record_one_drop() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.auth.add_user("user-a", "owner@example.com");

    app.scraper.set_price("https://shop.example/item", "Widget", "19.99");
    let product = add_as(&app, "user-a", "https://shop.example/item").await?;
    let product_id = product["id"].as_str().unwrap_or_default().to_string();

    app.scraper.set_price("https://shop.example/item", "Widget", "14.99");
    app.scraper.set_delay(std::time::Duration::from_millis(200));

    // CLI/scheduler path and HTTP path fire together
    let (direct, over_http) = tokio::join!(app.state.price_checker.run(), trigger(&app));
    let direct = direct?.results;
    let over_http = over_http?["results"].clone();

    assert_eq!(direct.price_changes + over_http["priceChanges"].as_u64().unwrap_or(0) as usize, 1);
    assert_eq!(app.notifier.sent().len(), 1);
    assert_eq!(app.db.count_observations(&product_id).await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_batch_refreshes_cached_listing() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    let owner = [bearer(&token_for("user-a"))];

    app.scraper.set_price("https://shop.example/item", "Widget", "19.99");
    add_as(&app, "user-a", "https://shop.example/item").await?;

    // Prime the listing cache
    let response = make_request(app.router(), Method::GET, "/api/products", &owner, None).await?;
    assert_eq!(read_json(response).await?[0]["current_price"], json!(19.99));

    app.scraper.set_price("https://shop.example/item", "Widget", "9.99");
    trigger(&app).await?;

    let response = make_request(app.router(), Method::GET, "/api/products", &owner, None).await?;
    assert_eq!(read_json(response).await?[0]["current_price"], json!(9.99));
    Ok(())
}
