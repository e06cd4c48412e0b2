//! HTTP-level tests for the browser API
//!
//! Requests are sent straight into the router with `tower::ServiceExt::oneshot`.

#![cfg(feature = "server")]

mod helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use wmb_browser::api::{create_browser_router, BrowserState};
use wmb_browser::session::create_session_store;
use wmb_browser::BrowserConfig;

use helpers::demo_pipeline;

fn app() -> axum::Router {
    let config = BrowserConfig {
        public_base_url: "https://wmb.test/".to_string(),
        max_panels: 4,
        ..BrowserConfig::default()
    };
    create_browser_router(BrowserState {
        sessions: create_session_store(),
        pipeline: Arc::new(demo_pipeline()),
        config: Arc::new(config),
    })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

async fn send(app: &axum::Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn create_session(app: &axum::Router, body: Value) -> (String, Value) {
    let resp = send(app, json_request("POST", "/api/sessions", body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    let id = json["session"]["id"].as_str().unwrap().to_string();
    (id, json)
}

#[tokio::test]
async fn test_health_and_catalog() {
    let app = app();

    let resp = send(&app, get("/api/health")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["translator"], false);

    let json = body_json(send(&app, get("/api/catalog")).await).await;
    let datasets = json["datasets"].as_array().unwrap();
    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[1]["plot_types"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_add_delete_and_download_layout() {
    let app = app();
    let (id, _) = create_session(&app, json!({})).await;

    let text = "cemba_cell,categorical_scatter,l1_tsne,CellSubClass\n\
                not a spec\n\
                higlass,multi_cell_type_1d,cell_types=CA3 Glut,region=Gad1";
    let resp = send(
        &app,
        json_request("POST", &format!("/api/sessions/{}/panels", id), json!({"text": text})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome = body_json(resp).await;
    assert_eq!(outcome["added"], json!(["1-0", "1-2"]));
    assert_eq!(outcome["failures"][0]["line_idx"], 1);
    assert_eq!(outcome["patch"]["ops"][0]["op"], "append");
    assert_eq!(outcome["patch"]["ops"][1]["record"]["width"], "full");

    let resp = send(&app, get(&format!("/api/sessions/{}/layout", id))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("attachment"));
    let layout = String::from_utf8(body_bytes(resp).await).unwrap();
    assert_eq!(
        layout,
        "cemba_cell,categorical_scatter,l1_tsne,CellSubClass\n\
         higlass,multi_cell_type_1d,cell_types=CA3 Glut,region=Gad1"
    );

    let resp = send(
        &app,
        json_request("POST", &format!("/api/sessions/{}/delete", id), json!({"keys": ["1-0"]})),
    )
    .await;
    let patch = body_json(resp).await;
    assert_eq!(patch["ops"], json!([{"op": "remove_at", "position": 0}]));

    let snapshot = body_json(send(&app, get(&format!("/api/sessions/{}", id))).await).await;
    assert_eq!(snapshot["panels"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["layout"]["1-2"]["string"], "higlass,multi_cell_type_1d,cell_types=CA3 Glut,region=Gad1");
}

#[tokio::test]
async fn test_share_url_reloads_same_layout() {
    let app = app();
    let layout = "?cemba_cell,categorical_scatter,l1_tsne,CellClass\
                  ?higlass,loop_zoom_in,cell_type=Sst%20Gaba,region1=Rorb";
    let (id, created) = create_session(&app, json!({"layout": layout})).await;
    assert_eq!(created["outcome"]["added"].as_array().unwrap().len(), 2);

    let share = body_json(send(&app, get(&format!("/api/sessions/{}/share", id))).await).await;
    let url = share["url"].as_str().unwrap();
    assert!(url.starts_with("https://wmb.test/?"));
    let query = url.trim_start_matches("https://wmb.test/");
    assert_eq!(query, layout);

    let (_, reloaded) = create_session(&app, json!({"layout": query})).await;
    assert_eq!(reloaded["session"]["layout"], created["session"]["layout"]);
}

#[tokio::test]
async fn test_replace_and_ceiling() {
    let app = app();
    let line = "cemba_cell,categorical_scatter,l1_tsne,CellClass";
    let text = vec![line; 6].join("\n");
    let (id, _) = create_session(&app, json!({})).await;

    let outcome = body_json(
        send(
            &app,
            json_request("POST", &format!("/api/sessions/{}/panels", id), json!({"text": text})),
        )
        .await,
    )
    .await;
    assert_eq!(outcome["added"].as_array().unwrap().len(), 4);
    assert_eq!(outcome["truncated"], true);

    let resp = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/sessions/{}/panels/1-3", id),
            json!({"text": "cemba_cell,continuous_scatter,l1_umap,mCHFrac"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let patch = body_json(resp).await;
    assert_eq!(patch["ops"][0]["op"], "replace");
    assert_eq!(patch["ops"][0]["position"], 3);

    let resp = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/sessions/{}/panels/1-3", id),
            json!({"text": "cemba_cell"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = send(
        &app,
        json_request("PUT", &format!("/api/sessions/{}/panels/7-7", id), json!({"text": line})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_session_and_teardown() {
    let app = app();
    let missing = uuid::Uuid::new_v4();
    let resp = send(&app, get(&format!("/api/sessions/{}", missing))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_json(resp).await["error"].as_str().unwrap().contains("not found"));

    let (id, _) = create_session(&app, json!({})).await;
    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/sessions/{}", id))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, delete).await.status(), StatusCode::NO_CONTENT);
    let resp = send(&app, get(&format!("/api/sessions/{}", id))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
        &app,
        json_request("POST", &format!("/api/sessions/{}/delete", missing), json!({})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_session_body_handling() {
    let app = app();

    let empty = Request::builder()
        .method("POST")
        .uri("/api/sessions")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, empty).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert!(json.get("outcome").is_none());

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/sessions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"layout": "?cemba_cell,categorical_scatter"#))
        .unwrap();
    let resp = send(&app, malformed).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp)
        .await["error"]
        .as_str()
        .unwrap()
        .contains("Invalid session request"));

    let wrong_type = json_request("POST", "/api/sessions", json!({"fallback": "yes"}));
    assert_eq!(send(&app, wrong_type).await.status(), StatusCode::BAD_REQUEST);
}
