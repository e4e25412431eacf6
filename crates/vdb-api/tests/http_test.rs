//! HTTP surface integration tests (§6.1), driven with `actix_web::test`
//! against an in-process `App` built the same way `main.rs` wires it,
//! minus the real TCP listener.

use actix_web::{test, web, App};
use serde_json::json;

use vdb_api::routes;
use vdb_api::state::AppState;
use vdb_common::Settings;

fn state(settings: Settings) -> web::Data<AppState> {
    // `#[actix_web::test]` already runs inside a tokio runtime; reuse its
    // handle instead of spinning up a second one per test.
    web::Data::new(AppState::new(settings, tokio::runtime::Handle::current()))
}

#[actix_web::test]
async fn create_library_document_chunk_then_query() {
    let data = state(Settings::default());
    let app = test::init_service(App::new().app_data(data.clone()).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/libraries")
        .set_json(json!({"name": "lib", "embedding_dimension": 3}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let lib: serde_json::Value = test::read_body_json(resp).await;
    let library_id = lib["id"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/libraries/{library_id}/documents"))
        .set_json(json!({"title": "doc"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let doc: serde_json::Value = test::read_body_json(resp).await;
    let document_id = doc["id"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/documents/{document_id}/chunks"))
        .set_json(json!({"text": "hello world", "embedding": [1.0, 0.0, 0.0]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/libraries/{library_id}/index:build"))
        .set_json(json!({"index_type": "brute_force"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 202);

    // The build runs on a background thread; poll status until it publishes.
    for _ in 0..50 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/libraries/{library_id}/index:status"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status: serde_json::Value = test::read_body_json(resp).await;
        if !status["stale"].as_bool().unwrap() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/libraries/{library_id}/query"))
        .set_json(json!({"query_embedding": [1.0, 0.0, 0.0], "k": 1}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let results: Vec<serde_json::Value> = test::read_body_json(resp).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["text"], "hello world");
}

#[actix_web::test]
async fn dimension_mismatch_returns_400() {
    let data = state(Settings::default());
    let app = test::init_service(App::new().app_data(data.clone()).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/libraries")
        .set_json(json!({"name": "lib", "embedding_dimension": 4}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let lib: serde_json::Value = test::read_body_json(resp).await;
    let library_id = lib["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/libraries/{library_id}/documents"))
        .set_json(json!({"title": "doc"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let doc: serde_json::Value = test::read_body_json(resp).await;
    let document_id = doc["id"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/documents/{document_id}/chunks"))
        .set_json(json!({"text": "bad", "embedding": [0.1, 0.2, 0.3]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn missing_library_returns_404() {
    let data = state(Settings::default());
    let app = test::init_service(App::new().app_data(data.clone()).configure(routes::configure)).await;

    let req = test::TestRequest::get().uri("/api/v1/libraries/does-not-exist").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn follower_rejects_writes_with_403() {
    let mut settings = Settings::default();
    settings.node_role = vdb_common::config::NodeRole::Follower;
    let data = state(settings);
    let app = test::init_service(App::new().app_data(data.clone()).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/libraries")
        .set_json(json!({"name": "lib", "embedding_dimension": 3}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn cascade_delete_then_get_returns_404_for_everything() {
    let data = state(Settings::default());
    let app = test::init_service(App::new().app_data(data.clone()).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/libraries")
        .set_json(json!({"name": "lib", "embedding_dimension": 3}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let lib: serde_json::Value = test::read_body_json(resp).await;
    let library_id = lib["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/libraries/{library_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/libraries/{library_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
