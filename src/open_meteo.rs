//! Forecast and air-quality pass-through to Open-Meteo.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, Result};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,is_day,precipitation,weather_code,cloud_cover,pressure_msl,wind_speed_10m,wind_direction_10m,wind_gusts_10m";
const HOURLY_FIELDS: &str = "temperature_2m,precipitation_probability,weather_code,wind_speed_10m";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max,sunrise,sunset";
const AIR_QUALITY_FIELDS: &str = "us_aqi,pm2_5,pm10,ozone,nitrogen_dioxide,carbon_monoxide";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Imperial,
    Metric,
}

impl Units {
    /// Anything other than `metric` is treated as imperial.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("metric") => Units::Metric,
            _ => Units::Imperial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }

    fn query(&self) -> &'static str {
        match self {
            Units::Imperial => {
                "temperature_unit=fahrenheit&wind_speed_unit=mph&precipitation_unit=inch"
            }
            Units::Metric => "temperature_unit=celsius&wind_speed_unit=kmh&precipitation_unit=mm",
        }
    }
}

pub fn forecast_url(lat: f64, lon: f64, units: Units) -> String {
    format!(
        "{FORECAST_URL}?latitude={lat}&longitude={lon}&current={CURRENT_FIELDS}&hourly={HOURLY_FIELDS}&daily={DAILY_FIELDS}&{units}&timezone=auto&forecast_days=7",
        units = units.query()
    )
}

pub fn air_quality_url(lat: f64, lon: f64) -> String {
    format!("{AIR_QUALITY_URL}?latitude={lat}&longitude={lon}&current={AIR_QUALITY_FIELDS}&timezone=auto")
}

pub async fn fetch_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    debug!(url, "fetching upstream json");
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        warn!(url, status = status.as_u16(), "upstream returned an error status");
        return Err(AppError::Upstream(format!("{url} returned HTTP {status}")));
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| AppError::Upstream(format!("{url} returned invalid JSON: {e}")))
}
