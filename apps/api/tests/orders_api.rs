//! Order placement through the HTTP API.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{address, TestApp};

#[tokio::test]
async fn test_order_total_uses_price_at_order_time() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let ids = app.menu(&admin, &[("Margherita", 850), ("Tiramisù", 600)]).await;
    let user = app.register("luca@example.com").await;

    let (status, body) = app
        .post(
            "/v1/me/orders",
            Some(&user),
            json!({
                "order": {
                    "comments": "No basil",
                    "order_items": [
                        { "product_id": ids[0], "quantity": 2 },
                        { "product_id": ids[1], "quantity": 1 },
                    ],
                },
                "delivery_address": address(10),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["order"]["total_price"], 2 * 850 + 600);
    assert_eq!(body["order"]["status"], "AWAITING");
    assert_eq!(body["order"]["order_items"].as_array().unwrap().len(), 2);
    let order_id = body["order"]["id"].as_i64().unwrap();

    let (status, _) = app
        .patch(
            &format!("/v1/admin/products/{}", ids[0]),
            Some(&admin),
            json!({ "price_cents": 1500 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/v1/me/orders/{}", order_id), Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["total_price"], 2 * 850 + 600);
    assert_eq!(body["order"]["order_items"][0]["product_price_cents"], 850);

    let mail = app.wait_for_mail(1).await;
    assert_eq!(mail[0].to, "luca@example.com");
    assert!(mail[0].body.contains("Corso Buenos Aires, 10, 20124, Milano"));
}

#[tokio::test]
async fn test_duplicate_order_items_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let ids = app.menu(&admin, &[("Diavola", 950)]).await;
    let user = app.register("dup@example.com").await;

    let (status, body) = app
        .post(
            "/v1/me/orders",
            Some(&user),
            json!({
                "order": {
                    "order_items": [
                        { "product_id": ids[0], "quantity": 1 },
                        { "product_id": ids[0], "quantity": 2 },
                    ],
                },
                "delivery_address": address(1),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["code"], 422);
    assert_eq!(body["detail"]["errors"][0]["field"], "order_items");
    assert_eq!(body["detail"]["errors"][0]["message"], "Order items must be unique.");
}

#[tokio::test]
async fn test_oversized_quantity_is_unprocessable() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let ids = app.menu(&admin, &[("Capricciosa", 999_999)]).await;
    let user = app.register("bulk@example.com").await;

    let (status, body) = app
        .post(
            "/v1/me/orders",
            Some(&user),
            json!({
                "order": { "order_items": [{ "product_id": ids[0], "quantity": i64::MAX / 2 }] },
                "delivery_address": address(1),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["errors"][0]["field"], "order_items[0].quantity");

    let (status, body) = app
        .post(
            "/v1/admin/products",
            Some(&admin),
            json!({ "name": "Oro", "price_cents": 1_000_000, "category_id": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["errors"][0]["field"], "price_cents");
}

#[tokio::test]
async fn test_missing_products_named() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let ids = app.menu(&admin, &[("Marinara", 700)]).await;
    let user = app.register("ghost@example.com").await;

    let (status, body) = app
        .post(
            "/v1/me/orders",
            Some(&user),
            json!({
                "order": {
                    "order_items": [
                        { "product_id": ids[0], "quantity": 1 },
                        { "product_id": 999, "quantity": 1 },
                    ],
                },
                "delivery_address": address(1),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"]["message"], "Products with ids '{999}' do not exist.");

    // Nothing was persisted, not even the address.
    let (_, addresses) = app.get("/v1/me/addresses", Some(&user)).await;
    assert_eq!(addresses.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_orders_sorted_by_total_and_address_deduplicated() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let ids = app.menu(&admin, &[("Calzone", 1100), ("Acqua", 150)]).await;
    let user = app.register("sorter@example.com").await;

    for (product, quantity) in [(ids[1], 1), (ids[0], 2), (ids[1], 4)] {
        let (status, _) = app
            .post(
                "/v1/me/orders",
                Some(&user),
                json!({
                    "order": { "order_items": [{ "product_id": product, "quantity": quantity }] },
                    "delivery_address": address(5),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app.get("/v1/me/orders?sort=-total_price", Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    let totals: Vec<i64> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["order"]["total_price"].as_i64().unwrap())
        .collect();
    assert_eq!(totals, vec![2200, 600, 150]);

    let (_, addresses) = app.get("/v1/me/addresses", Some(&user)).await;
    assert_eq!(addresses.as_array().unwrap().len(), 1);

    let (status, body) = app.get("/v1/me/orders?sort=price", Some(&user)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["errors"][0]["field"], "sort");
    assert!(body["detail"]["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("'price'"));
}

#[tokio::test]
async fn test_deleted_address_leaves_order_without_address() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let ids = app.menu(&admin, &[("Supplì", 300)]).await;
    let user = app.register("mover@example.com").await;

    let (_, created) = app
        .post(
            "/v1/me/orders",
            Some(&user),
            json!({
                "order": { "order_items": [{ "product_id": ids[0], "quantity": 3 }] },
                "delivery_address": address(7),
            }),
        )
        .await;
    let order_id = created["order"]["id"].as_i64().unwrap();
    let address_id = created["delivery_address"]["id"].as_i64().unwrap();

    let (status, _) = app
        .delete(&format!("/v1/me/addresses/{}", address_id), Some(&user))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/v1/me/orders/{}", order_id), Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["delivery_address"].is_null());
    assert!(body["order"]["address_id"].is_null());
    assert_eq!(body["order"]["total_price"], 900);
}

#[tokio::test]
async fn test_orders_are_private() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let ids = app.menu(&admin, &[("Cannolo", 400)]).await;
    let owner = app.register("owner@example.com").await;
    let other = app.register("other@example.com").await;

    let (_, created) = app
        .post(
            "/v1/me/orders",
            Some(&owner),
            json!({
                "order": { "order_items": [{ "product_id": ids[0], "quantity": 1 }] },
                "delivery_address": address(2),
            }),
        )
        .await;
    let order_id = created["order"]["id"].as_i64().unwrap();

    let (status, _) = app.get(&format!("/v1/me/orders/{}", order_id), Some(&other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = app.get("/v1/me/orders", Some(&other)).await;
    assert_eq!(page["total"], 0);
}
