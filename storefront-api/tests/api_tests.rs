//! Router-level tests: requests go through axum, the service layer, the
//! cache and the in-memory origin.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use storefront_api::extractors::{USER_ID_HEADER, USER_ROLE_HEADER};
use storefront_api::{create_api_router, ApiConfig, AppState};
use storefront_storage::{CacheLayer, CachePolicy, CacheStore, InMemoryCacheStore};
use storefront_test_utils::{seed_catalog, InMemoryCatalog, Seeded};
use tower::ServiceExt;

struct Harness {
    app: Router,
    origin: Arc<InMemoryCatalog>,
    store: Arc<InMemoryCacheStore>,
    seeded: Seeded,
}

async fn harness() -> Harness {
    let origin = Arc::new(InMemoryCatalog::new());
    let seeded = seed_catalog(origin.as_ref()).await.unwrap();
    let store = Arc::new(InMemoryCacheStore::new());
    let dyn_store: Arc<dyn CacheStore> = store.clone();
    let cache = CacheLayer::new(dyn_store, CachePolicy::default());
    let app = create_api_router(AppState::new(origin.clone(), cache), &ApiConfig::default());
    Harness {
        app,
        origin,
        store,
        seeded,
    }
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn get_as(&self, uri: &str, user: &storefront_test_utils::User) -> (StatusCode, Value) {
        let request = Request::get(uri)
            .header(USER_ID_HEADER, user.id.to_string())
            .header(USER_ROLE_HEADER, user.role.as_str())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn write(
        &self,
        method: &str,
        uri: &str,
        user: Option<&storefront_test_utils::User>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder
                .header(USER_ID_HEADER, user.id.to_string())
                .header(USER_ROLE_HEADER, user.role.as_str());
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let h = harness().await;
    let uri = format!("/api/v1/products/{}", h.seeded.product("Lamp").id);

    let reads_before = h.origin.origin_reads();
    let (status, first) = h.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["cached"], false);
    assert_eq!(first["message"], "Product retrieved successfully");

    let (_, second) = h.get(&uri).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["message"], "Product retrieved from cache");
    assert_eq!(first["data"], second["data"]);
    assert_eq!(h.origin.origin_reads() - reads_before, 1);
}

#[tokio::test]
async fn price_update_is_visible_on_next_read() {
    let h = harness().await;
    let uri = format!("/api/v1/products/{}", h.seeded.product("Lamp").id);
    let (_, before) = h.get(&uri).await;
    assert_eq!(before["data"]["price"], 10.0);

    let (status, _) = h.write("PATCH", &uri, None, json!({ "price": 20.0 })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = h.get(&uri).await;
    assert_eq!(after["cached"], false);
    assert_eq!(after["data"]["price"], 20.0);
}

#[tokio::test]
async fn product_write_purges_filtered_listing() {
    let h = harness().await;
    let uri = format!("/api/v1/products?categoryId={}", h.seeded.lighting.id);

    let (_, listing) = h.get(&uri).await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 2);
    let (_, cached) = h.get(&uri).await;
    assert_eq!(cached["cached"], true);

    let (status, created) = h
        .write(
            "POST",
            "/api/v1/products",
            None,
            json!({
                "name": "Bulb",
                "description": "Warm white",
                "image": "https://img.example/bulb.png",
                "price": 2.5,
                "stock": 100,
                "categoryId": h.seeded.lighting.id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["name"], "Bulb");

    let (_, refreshed) = h.get(&uri).await;
    assert_eq!(refreshed["cached"], false);
    assert_eq!(refreshed["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn equivalent_queries_share_a_cache_entry() {
    let h = harness().await;
    let (_, first) = h.get("/api/v1/products?search=LAMP&maxPrice=10.00").await;
    assert_eq!(first["cached"], false);

    // Same filter: different order, case, spelling of the number and an
    // explicit default skip.
    let (_, second) = h
        .get("/api/v1/products?skip=0&maxPrice=10&search=%20lamp")
        .await;
    assert_eq!(second["cached"], true);
    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
async fn reviews_require_product_filter() {
    let h = harness().await;
    let (status, body) = h.get("/api/v1/reviews").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "MISSING_FIELD");
}

#[tokio::test]
async fn only_author_may_edit_review() {
    let h = harness().await;
    let lamp = h.seeded.product("Lamp").id;

    let (status, created) = h
        .write(
            "POST",
            "/api/v1/reviews",
            Some(&h.seeded.buyer),
            json!({ "productId": lamp, "rating": 4, "review": "Bright enough" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/reviews/{}", created["data"]["id"].as_str().unwrap());

    let (status, body) = h
        .write("PATCH", &uri, Some(&h.seeded.admin), json!({ "rating": 1 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = h
        .write("PATCH", &uri, Some(&h.seeded.buyer), json!({ "rating": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rating"], 2);

    let (_, listing) = h.get(&format!("/api/v1/reviews?productId={}", lamp)).await;
    assert_eq!(listing["data"][0]["rating"], 2);
}

#[tokio::test]
async fn writes_need_an_acting_user() {
    let h = harness().await;
    let lamp = h.seeded.product("Lamp").id;
    let (status, body) = h
        .write(
            "POST",
            "/api/v1/orders",
            None,
            json!({ "items": [{ "productId": lamp, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn order_refreshes_cached_stock() {
    let h = harness().await;
    let kettle = h.seeded.product("Kettle").id;
    let product_uri = format!("/api/v1/products/{}", kettle);
    let (_, before) = h.get(&product_uri).await;
    assert_eq!(before["data"]["stock"], 10);

    let (status, order) = h
        .write(
            "POST",
            "/api/v1/orders",
            Some(&h.seeded.buyer),
            json!({ "items": [{ "productId": kettle, "quantity": 2 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["data"]["total"], 80.0);
    assert_eq!(order["data"]["status"], "pending");

    let (_, after) = h.get(&product_uri).await;
    assert_eq!(after["cached"], false);
    assert_eq!(after["data"]["stock"], 8);

    let order_uri = format!("/api/v1/orders/{}", order["data"]["id"].as_str().unwrap());
    let (status, _) = h.get_as(&order_uri, &h.seeded.buyer).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.get_as(&order_uri, &h.seeded.admin).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn repeated_order_lines_cannot_overdraw_stock() {
    let h = harness().await;
    let kettle = h.seeded.product("Kettle").id;
    let (status, body) = h
        .write(
            "POST",
            "/api/v1/orders",
            Some(&h.seeded.buyer),
            json!({ "items": [
                { "productId": kettle, "quantity": 6 },
                { "productId": kettle, "quantity": 6 },
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "STATE_CONFLICT");

    // The origin keeps serving and the stock is untouched.
    let (status, product) = h.get(&format!("/api/v1/products/{}", kettle)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["data"]["stock"], 10);
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
    let h = harness().await;
    let (status, body) = h.get("/api/v1/products/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let h = harness().await;
    let (status, body) = h
        .get("/api/v1/products/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ENTITY_NOT_FOUND");
}

#[tokio::test]
async fn cache_outage_falls_back_to_origin() {
    let h = harness().await;
    let uri = format!("/api/v1/products/{}", h.seeded.product("Lantern").id);
    h.store.set_offline(true);

    for _ in 0..2 {
        let (status, body) = h.get(&uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cached"], false);
        assert_eq!(body["data"]["name"], "Lantern");
    }

    // Writes still succeed with the backend down.
    let (status, _) = h.write("PATCH", &uri, None, json!({ "stock": 3 })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, health) = h.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["details"]["cache"]["backend"], "memory");
}

#[tokio::test]
async fn readiness_reports_cache_stats() {
    let h = harness().await;
    let uri = format!("/api/v1/categories/{}", h.seeded.kitchen.id);
    h.get(&uri).await;
    h.get(&uri).await;

    let (status, health) = h.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let cache = &health["details"]["cache"];
    assert_eq!(cache["backend"], "memory");
    assert_eq!(cache["stats"]["hits"], 1);
    assert_eq!(cache["stats"]["entryCount"], 1);
    assert_eq!(cache["tags"], 1);
    assert_eq!(cache["tracked_keys"], 1);
}
