//! HTTP integration tests.
//!
//! Drive the full router in-process:
//! - `/_siteship/*` - deploy API
//! - everything else - site serving

#[path = "common.rs"]
mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use common::{TEST_TIMEOUT, TestSite};
use siteship::blob::UploadTarget;
use siteship::serve::{IMMUTABLE_CACHE_CONTROL, REVALIDATE_CACHE_CONTROL, RouteConfig};
use siteship::server::router;

/// Uploads through a minted URL and returns the new blob id.
async fn upload(site: &TestSite, body: &'static str, content_type: &str) -> String {
    let minted = site.json(Method::POST, "/_siteship/upload-url", &json!({})).await;
    assert_eq!(minted.status, StatusCode::OK);
    let target: UploadTarget = minted.json();
    let path = Url::parse(&target.url).unwrap().path().to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    let uploaded = site.send(request).await;
    assert_eq!(uploaded.status, StatusCode::OK, "{}", uploaded.text());
    uploaded.json::<Value>()["blob_id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn upsert(site: &TestSite, path: &str, blob_id: &str, content_type: &str) -> Value {
    let res = site
        .json(
            Method::PUT,
            "/_siteship/assets",
            &json!({
                "path": path,
                "blob_id": blob_id,
                "content_type": content_type,
                "deployment_id": "d1",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());
    res.json()
}

// =============================================================================
// Deploy API
// =============================================================================

#[tokio::test]
async fn test_health_returns_json() {
    let site = TestSite::new().await;
    let res = site.get("/_siteship/health").await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.header("content-type").unwrap().contains("application/json"));
    let body: Value = res.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_full_commit_flow_over_api() {
    let site = TestSite::new().await;

    let index = upload(&site, "<h1>hello</h1>", "text/html; charset=utf-8").await;
    let script = upload(&site, "console.log(1)", "application/javascript").await;
    assert!(upsert(&site, "/index.html", &index, "text/html; charset=utf-8").await["old_blob_id"].is_null());
    upsert(&site, "/assets/app-9fK2xQ.js", &script, "application/javascript").await;

    let finalized = site
        .json(Method::POST, "/_siteship/finalize", &json!({ "deployment_id": "d1" }))
        .await;
    assert_eq!(finalized.status, StatusCode::OK);
    assert_eq!(finalized.json::<Value>()["stale_blob_ids"], json!([]));

    let published = site
        .json(Method::POST, "/_siteship/deployment", &json!({ "deployment_id": "d1" }))
        .await;
    assert_eq!(published.status, StatusCode::OK);

    let current: Value = site.get("/_siteship/deployment").await.json();
    assert_eq!(current["current_deployment_id"], "d1");

    let page = site.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.text(), "<h1>hello</h1>");
    assert_eq!(page.header("etag"), Some(format!("\"{index}\"").as_str()));
    assert_eq!(page.header("cache-control"), Some(REVALIDATE_CACHE_CONTROL));

    let js = site.get("/assets/app-9fK2xQ.js").await;
    assert_eq!(js.header("cache-control"), Some(IMMUTABLE_CACHE_CONTROL));
    assert_eq!(js.header("content-type"), Some("application/javascript"));
}

#[tokio::test]
async fn test_redeploy_returns_displaced_and_stale_blobs() {
    let site = TestSite::new().await;
    let old_index = site.seed("/index.html", "v1", "text/html").await;
    let old_about = site.seed("/about.txt", "about", "text/plain").await;

    let new_index = upload(&site, "v2", "text/html").await;
    let res = upsert(&site, "/index.html", &new_index, "text/html").await;
    assert_eq!(res["old_blob_id"], old_index.as_str());

    let finalized = site
        .json(Method::POST, "/_siteship/finalize", &json!({ "deployment_id": "d1" }))
        .await;
    assert_eq!(
        finalized.json::<Value>()["stale_blob_ids"],
        json!([old_about.as_str()])
    );

    let removed = site
        .request(Method::DELETE, &format!("/_siteship/blobs/{old_about}"), &[])
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    assert_eq!(site.get("/about.txt").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_token_is_single_use() {
    let site = TestSite::new().await;
    let target: UploadTarget = site
        .json(Method::POST, "/_siteship/upload-url", &json!({}))
        .await
        .json();
    let path = Url::parse(&target.url).unwrap().path().to_string();
    assert!(target.url.starts_with(common::TEST_BASE_URL));

    let first = site.request(Method::POST, &path, &[]).await;
    assert_eq!(first.status, StatusCode::OK);

    let second = site.request(Method::POST, &path, &[]).await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);
    assert!(second.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_unknown_upload_token_is_forbidden() {
    let site = TestSite::new().await;
    let res = site
        .request(Method::POST, "/_siteship/upload/not-a-token", &[])
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upsert_rejects_bad_input() {
    let site = TestSite::new().await;

    let bad_blob = site
        .json(
            Method::PUT,
            "/_siteship/assets",
            &json!({
                "path": "/x.txt",
                "blob_id": "../../etc/passwd",
                "content_type": "text/plain",
                "deployment_id": "d1",
            }),
        )
        .await;
    assert_eq!(bad_blob.status, StatusCode::BAD_REQUEST);

    let blob = upload(&site, "x", "text/plain").await;
    let empty_path = site
        .json(
            Method::PUT,
            "/_siteship/assets",
            &json!({
                "path": "",
                "blob_id": blob,
                "content_type": "text/plain",
                "deployment_id": "d1",
            }),
        )
        .await;
    assert_eq!(empty_path.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        empty_path.json::<Value>()["error"],
        "invalid request: path cannot be empty"
    );
}

#[tokio::test]
async fn test_delete_missing_blob_is_no_content() {
    let site = TestSite::new().await;
    let res = site
        .request(
            Method::DELETE,
            "/_siteship/blobs/7b1f3c2e-9a4d-4e8b-b6f0-2c5d8e1a3f47",
            &[],
        )
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_lookup_and_list() {
    let site = TestSite::new().await;
    let blob = site.seed("/index.html", "x", "text/html").await;
    site.seed("/a.css", "a", "text/css").await;
    site.seed("/b.css", "b", "text/css").await;

    let found = site.get("/_siteship/assets/lookup?path=/index.html").await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.json::<Value>()["blob_id"], blob.as_str());

    let missing = site.get("/_siteship/assets/lookup?path=/nope").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["error"], "not found: /nope");

    let listed: Value = site.get("/_siteship/assets?limit=2").await.json();
    let paths: Vec<_> = listed["assets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["/index.html", "/a.css"]);
}

#[tokio::test]
async fn test_deployment_is_null_before_publish() {
    let site = TestSite::new().await;
    let res = site.get("/_siteship/deployment").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json::<Value>(), Value::Null);
}

#[tokio::test]
async fn test_events_start_with_current_deployment() {
    let site = TestSite::new().await;
    site.state
        .notifier
        .publish(&"d9".into())
        .await
        .unwrap();

    let app = router(site.state.clone(), TEST_TIMEOUT);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/_siteship/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: deployment"), "{text}");
    assert!(text.contains("\"current_deployment_id\":\"d9\""), "{text}");
}

// =============================================================================
// Site serving
// =============================================================================

#[tokio::test]
async fn test_empty_site_serves_bootstrap_page() {
    let site = TestSite::new().await;
    let res = site.get("/").await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.header("content-type").unwrap().starts_with("text/html"));
    assert!(res.text().contains("siteship deploy"));
}

#[tokio::test]
async fn test_spa_route_falls_back_to_index() {
    let site = TestSite::new().await;
    site.seed("/index.html", "<div id=app>", "text/html").await;

    let res = site.get("/settings/profile").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text(), "<div id=app>");

    let missing = site.get("/missing.png").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.text(), "Not Found");
}

#[tokio::test]
async fn test_if_none_match_returns_not_modified() {
    let site = TestSite::new().await;
    let blob = site.seed("/index.html", "<h1>x</h1>", "text/html").await;
    let etag = format!("\"{blob}\"");

    let res = site
        .request(Method::GET, "/", &[("if-none-match", etag.as_str())])
        .await;
    assert_eq!(res.status, StatusCode::NOT_MODIFIED);
    assert!(res.body.is_empty());
    assert_eq!(res.header("etag"), Some(etag.as_str()));
    assert_eq!(res.header("cache-control"), Some(REVALIDATE_CACHE_CONTROL));

    let stale = site
        .request(Method::GET, "/", &[("if-none-match", "\"something-else\"")])
        .await;
    assert_eq!(stale.status, StatusCode::OK);
}

#[tokio::test]
async fn test_head_has_headers_without_body() {
    let site = TestSite::new().await;
    site.seed("/index.html", "0123456789", "text/html").await;

    let res = site.request(Method::HEAD, "/index.html", &[]).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.is_empty());
    assert_eq!(res.header("content-length"), Some("10"));
    assert!(res.header("etag").is_some());
}

#[tokio::test]
async fn test_other_methods_are_not_allowed() {
    let site = TestSite::new().await;
    site.seed("/index.html", "x", "text/html").await;

    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let res = site.request(method.clone(), "/index.html", &[]).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(res.header("allow"), Some("GET, HEAD"));
    }
}

#[tokio::test]
async fn test_path_is_percent_decoded_and_query_ignored() {
    let site = TestSite::new().await;
    site.seed("/files/read me.txt", "hello", "text/plain").await;

    let res = site.get("/files/read%20me.txt?v=3").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text(), "hello");
}

#[tokio::test]
async fn test_path_prefix_is_stripped() {
    let site = TestSite::with_routes(RouteConfig {
        path_prefix: "/app".to_string(),
        spa_fallback: true,
    })
    .await;
    site.seed("/index.html", "root", "text/html").await;
    site.seed("/logo.svg", "<svg/>", "image/svg+xml").await;

    assert_eq!(site.get("/app/").await.text(), "root");
    assert_eq!(site.get("/app/logo.svg").await.text(), "<svg/>");
    assert_eq!(site.get("/app/dashboard").await.text(), "root");
}

#[tokio::test]
async fn test_dangling_reference_is_server_error() {
    let site = TestSite::new().await;
    let blob = site.seed("/index.html", "x", "text/html").await;
    site.state.blobs.delete(&blob).await.unwrap();

    let res = site.get("/").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}
