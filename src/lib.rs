use actix_web::{
    get,
    http::{header, Method},
    route, web, HttpRequest, HttpResponse, Responder,
};
use chrono::Utc;
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

pub mod alerts;
pub mod atom;
pub mod cache;
pub mod error;
pub mod feed;
pub mod geocode;
pub mod open_meteo;
pub mod polygon;

use alerts::{aggregate, Point};
use cache::TtlCache;
use error::Result;
use feed::{FeedClient, DEFAULT_FEED_URLS};
use open_meteo::Units;

const DEFAULT_USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (broadcast weather dashboard)"
);

#[derive(Parser, Debug, Clone)]
#[clap(about, version)]
pub struct Args {
    #[clap(short, long, default_value = "127.0.0.1")]
    pub ip: String,

    #[clap(short, long, default_value = "3000")]
    pub port: u16,

    #[clap(long, default_value = "GA")]
    pub default_state: String,

    #[clap(long, default_value = "33.749", allow_negative_numbers = true)]
    pub default_lat: f64,

    #[clap(long, default_value = "-84.388", allow_negative_numbers = true)]
    pub default_lon: f64,

    /// Forecast cache lifetime, seconds
    #[clap(long, default_value = "300")]
    pub weather_ttl: u64,

    /// Air quality cache lifetime, seconds
    #[clap(long, default_value = "900")]
    pub air_quality_ttl: u64,

    /// Alerts cache lifetime, seconds
    #[clap(long, default_value = "60")]
    pub alerts_ttl: u64,

    #[clap(long = "feed-url", default_values = DEFAULT_FEED_URLS)]
    pub feed_urls: Vec<String>,

    #[clap(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

pub struct AppState {
    pub config: Args,
    pub cache: Mutex<TtlCache<Value>>,
    pub feeds: FeedClient,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Args) -> Result<Self> {
        Self::with_cache(config, TtlCache::new())
    }

    pub fn with_cache(config: Args, cache: TtlCache<Value>) -> Result<Self> {
        let feeds = FeedClient::new(&config.user_agent)?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            config,
            cache: Mutex::new(cache),
            feeds,
            http,
        })
    }

    /// Query coordinates, or the configured default point when either is
    /// missing or not a finite number.
    fn point(&self, lat: Option<&str>, lon: Option<&str>) -> Point {
        match (parse_finite(lat), parse_finite(lon)) {
            (Some(lat), Some(lon)) => Point { lat, lon },
            _ => Point {
                lat: self.config.default_lat,
                lon: self.config.default_lon,
            },
        }
    }

    fn state(&self, raw: Option<&str>) -> String {
        match raw.map(str::trim) {
            Some(code) if !code.is_empty() => code.to_uppercase(),
            _ => self.config.default_state.trim().to_uppercase(),
        }
    }

    async fn cached(&self, key: &str) -> Option<Value> {
        let hit = self.cache.lock().await.get(key);
        debug!(key, hit = hit.is_some(), "cache lookup");
        hit
    }

    async fn store(&self, key: String, value: Value, ttl_secs: u64) {
        let ttl_ms = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        self.cache.lock().await.set(key, value, ttl_ms);
    }
}

fn parse_finite(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

fn is_truthy(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("1") | Some("true"))
}

pub fn alerts_cache_key(state: &str, point: Point, feed_urls: &[String]) -> String {
    format!(
        "alerts:{state}:{:.2},{:.2}:{}",
        point.lat,
        point.lon,
        feed_urls.join("|")
    )
}

pub fn weather_cache_key(point: Point, units: Units) -> String {
    format!("weather:{:.2},{:.2}:{}", point.lat, point.lon, units.as_str())
}

pub fn air_quality_cache_key(point: Point) -> String {
    format!("air:{:.2},{:.2}", point.lat, point.lon)
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    pub state: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub nocache: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PointQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub units: Option<String>,
}

#[route("/api/alerts", method = "GET", method = "HEAD")]
async fn get_alerts(
    query: web::Query<AlertsQuery>,
    app_data: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let state = app_data.state(query.state.as_deref());
    let point = app_data.point(query.lat.as_deref(), query.lon.as_deref());
    let feed_urls = &app_data.config.feed_urls;
    let key = alerts_cache_key(&state, point, feed_urls);

    if !is_truthy(query.nocache.as_deref()) {
        if let Some(body) = app_data.cached(&key).await {
            return Ok(create_response(&req, &body));
        }
    }

    let documents = app_data.feeds.fetch_all(feed_urls).await?;
    let result = aggregate(&documents, &state, point, Utc::now());
    let body = serde_json::to_value(&result)?;

    app_data
        .store(key, body.clone(), app_data.config.alerts_ttl)
        .await;

    Ok(create_response(&req, &body))
}

#[route("/api/weather", method = "GET", method = "HEAD")]
async fn get_weather(
    query: web::Query<PointQuery>,
    app_data: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let point = app_data.point(query.lat.as_deref(), query.lon.as_deref());
    let units = Units::parse(query.units.as_deref());
    let key = weather_cache_key(point, units);

    if let Some(body) = app_data.cached(&key).await {
        return Ok(create_response(&req, &body));
    }

    let url = open_meteo::forecast_url(point.lat, point.lon, units);
    let body = open_meteo::fetch_json(&app_data.http, &url).await?;
    app_data
        .store(key, body.clone(), app_data.config.weather_ttl)
        .await;

    Ok(create_response(&req, &body))
}

#[route("/api/air-quality", method = "GET", method = "HEAD")]
async fn get_air_quality(
    query: web::Query<PointQuery>,
    app_data: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let point = app_data.point(query.lat.as_deref(), query.lon.as_deref());
    let key = air_quality_cache_key(point);

    if let Some(body) = app_data.cached(&key).await {
        return Ok(create_response(&req, &body));
    }

    let url = open_meteo::air_quality_url(point.lat, point.lon);
    let body = open_meteo::fetch_json(&app_data.http, &url).await?;
    app_data
        .store(key, body.clone(), app_data.config.air_quality_ttl)
        .await;

    Ok(create_response(&req, &body))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Registers every route on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_alerts)
        .service(get_weather)
        .service(get_air_quality)
        .service(health);
}

fn create_response(req: &HttpRequest, body: &Value) -> HttpResponse {
    let body = body.to_string();

    let mut response = HttpResponse::Ok();
    response.insert_header((header::CONTENT_TYPE, "application/json"));

    if req.method() == Method::HEAD {
        response
            .insert_header((header::CONTENT_LENGTH, body.len()))
            .finish()
    } else {
        response.body(body)
    }
}
