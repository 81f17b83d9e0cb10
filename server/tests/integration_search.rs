use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use catalog_core::{Catalog, FixtureSource, RawRecord};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::{build_app, AppConfig};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

const GAME_URL: &str = "https://play.google.com/store/apps/details?id=com.example.game";

fn app_with(config: AppConfig, source: FixtureSource) -> (Router, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::open(dir.path().join("catalog")).unwrap());
    (build_app(catalog, source, config), dir)
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap_or(Value::Null) };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn scrape(body: Value) -> Request<Body> {
    Request::post("/api/games/scrape")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn listing(title: &str, description: &str, genres: &[&str]) -> Value {
    json!({ "title": title, "description": description, "genres": genres, "rating": "4.2" })
}

#[tokio::test]
async fn scrape_then_search_ranks_results() {
    let (app, _dir) = app_with(AppConfig::default(), FixtureSource::new());

    let (status, doc) = call(&app, scrape(json!({
        "url": GAME_URL,
        "record": listing("Space Raiders", "an epic space shooter game", &["Action"]),
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["title"], "Space Raiders");
    let raiders = doc["id"].as_u64().unwrap();

    let (status, _) = call(&app, scrape(json!({
        "url": "https://play.google.com/store/apps/details?id=com.example.farm",
        "record": listing("Space Farm", "relaxing farm", &["Casual"]),
    }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(&app, get("/api/games/search?query=space%20shooter")).await;
    assert_eq!(status, StatusCode::OK);
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"].as_u64(), Some(raiders));
    assert_eq!(arr[0]["matched_terms"], 2);
    assert_eq!(arr[1]["matched_terms"], 1);

    let (_, json) = call(&app, get("/api/games/search?query=space&limit=1")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = call(&app, get("/api/games/search?query=%20%20")).await;
    assert_eq!(json, json!([]));
    let (_, json) = call(&app, get("/api/games/search")).await;
    assert_eq!(json, json!([]));

    let (_, json) = call(&app, get("/api/games")).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, json) = call(&app, get(&format!("/api/games/{raiders}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["categories"], json!(["Action"]));
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let (app, _dir) = app_with(AppConfig::default(), FixtureSource::new());

    let (status, json) = call(&app, scrape(json!({ "url": "https://example.com/app", "record": listing("X", "y", &[]) }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("invalid source url"));

    let (status, _) = call(&app, scrape(json!({ "url": GAME_URL }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = call(&app, get("/api/games/424242")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = call(&app, get("/api/games")).await;
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn scrape_without_record_uses_fixture_source() {
    let mut source = FixtureSource::new();
    source.insert(
        GAME_URL,
        RawRecord {
            title: Some("Space Raiders".into()),
            description: Some("an epic space shooter game".into()),
            categories: vec!["Action".into()],
            ..RawRecord::default()
        },
    );
    let (app, _dir) = app_with(AppConfig::default(), source);
    let (status, doc) = call(&app, scrape(json!({ "url": GAME_URL }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["url"], format!("{GAME_URL}&hl=en"));
}

#[tokio::test]
async fn admin_token_guards_ingestion() {
    let config = AppConfig { admin_token: Some("s3cret".into()), cors_allow_origin: None };
    let (app, _dir) = app_with(config, FixtureSource::new());
    let body = json!({ "url": GAME_URL, "record": listing("Space Raiders", "space shooter", &["Action"]) });

    let (status, _) = call(&app, scrape(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut req = scrape(body);
    req.headers_mut().insert("x-admin-token", "s3cret".parse().unwrap());
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn keyword_statistics() {
    let (app, _dir) = app_with(AppConfig::default(), FixtureSource::new());
    for (id, title, desc, genre) in [
        ("com.a", "Space Raiders", "space shooter", "Action"),
        ("com.b", "Star Shooter", "arcade shooter", "Action"),
        ("com.c", "Farm Days", "farm", "Casual"),
    ] {
        let url = format!("https://play.google.com/store/apps/details?id={id}");
        let (status, _) = call(&app, scrape(json!({ "url": url, "record": listing(title, desc, &[genre]) }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = call(&app, get("/api/statistics/top-keywords")).await;
    assert_eq!(status, StatusCode::OK);
    let top = json.as_array().unwrap();
    assert_eq!(top[0]["count"], 2);
    assert!(top.iter().any(|k| k["term"] == "action" && k["count"] == 2));

    let (status, json) = call(&app, get("/api/statistics/top-keywords-by-genre")).await;
    assert_eq!(status, StatusCode::OK);
    let groups = json.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["category"], "Action");
}
