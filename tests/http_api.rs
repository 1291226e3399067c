mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::{spawn_upstream, Route, GA_FEED};
use clap::Parser;
use serde_json::{json, Value};
use wx_dashboard::alerts::Point;
use wx_dashboard::cache::TtlCache;
use wx_dashboard::open_meteo::Units;
use wx_dashboard::{
    air_quality_cache_key, alerts_cache_key, configure, weather_cache_key, AppState, Args,
};

const ATL: Point = Point {
    lat: 33.75,
    lon: -84.39,
};

fn args() -> Args {
    Args::parse_from(["wx-dashboard", "--feed-url", "http://127.0.0.1:9/alerts.atom"])
}

fn seeded(entries: &[(String, Value)]) -> web::Data<AppState> {
    let mut cache = TtlCache::new();
    for (key, value) in entries {
        cache.set(key.clone(), value.clone(), 60_000);
    }
    web::Data::new(AppState::with_cache(args(), cache).unwrap())
}

#[actix_web::test]
async fn weather_is_served_from_cache() {
    let key = weather_cache_key(ATL, Units::Metric);
    let data = seeded(&[(key, json!({ "current": { "temperature_2m": 21.5 } }))]);
    let app = test::init_service(App::new().app_data(data).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/weather?lat=33.7491&lon=-84.3903&units=metric")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["current"]["temperature_2m"], 21.5);
}

#[actix_web::test]
async fn air_quality_is_served_from_cache() {
    let data = seeded(&[(air_quality_cache_key(ATL), json!({ "current": { "us_aqi": 42 } }))]);
    let app = test::init_service(App::new().app_data(data).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/air-quality?lat=33.75&lon=-84.39")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["current"]["us_aqi"], 42);
}

#[actix_web::test]
async fn alerts_cache_hit_skips_feeds() {
    let feeds = args().feed_urls;
    let cached = json!({ "state": "GA", "count": 0, "items": [] });
    let data = seeded(&[(alerts_cache_key("GA", ATL, &feeds), cached)]);
    let app = test::init_service(App::new().app_data(data).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/alerts?state=ga&lat=33.75&lon=-84.39")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 0);
}

#[actix_web::test]
async fn nocache_bypasses_cache_and_surfaces_feed_failure() {
    let feeds = args().feed_urls;
    let cached = json!({ "state": "GA", "count": 0, "items": [] });
    let data = seeded(&[(alerts_cache_key("GA", ATL, &feeds), cached)]);
    let app = test::init_service(App::new().app_data(data).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/alerts?state=GA&lat=33.75&lon=-84.39&nocache=1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("transport"));
}

#[actix_web::test]
async fn head_returns_length_without_body() {
    let key = weather_cache_key(ATL, Units::Imperial);
    let data = seeded(&[(key, json!({ "ok": true }))]);
    let app = test::init_service(App::new().app_data(data).configure(configure)).await;

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri("/api/weather?lat=33.75&lon=-84.39")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(body.is_empty());
}

#[actix_web::test]
async fn health_reports_ok() {
    let data = seeded(&[]);
    let app = test::init_service(App::new().app_data(data).configure(configure)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn nocache_refetch_is_written_back_to_cache() {
    let base = spawn_upstream(vec![Route::ok("/alerts.atom", GA_FEED)]).await;
    let feed_url = format!("{base}/alerts.atom");
    let args = Args::parse_from(["wx-dashboard", "--feed-url", feed_url.as_str()]);
    let key = alerts_cache_key("GA", ATL, &args.feed_urls);

    let mut cache = TtlCache::new();
    cache.set(key.clone(), json!({ "state": "GA", "count": 0, "items": [] }), 60_000);
    let data = web::Data::new(AppState::with_cache(args, cache).unwrap());
    let app =
        test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/alerts?state=GA&lat=33.75&lon=-84.39&nocache=true")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["id"], "urn:oid:stub.ga.1");

    let stored = data.cache.lock().await.get(&key).expect("refetch cached");
    assert_eq!(stored["count"], 1);
    assert_eq!(stored["items"][0]["id"], "urn:oid:stub.ga.1");

    let req = test::TestRequest::get()
        .uri("/api/alerts?state=GA&lat=33.75&lon=-84.39")
        .to_request();
    let cached: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cached["fetchedAt"], body["fetchedAt"]);
}
