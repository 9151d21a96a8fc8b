/// Weatherbit Daily Forecast API Client
///
/// Retrieves the multi-day forecast for the configured coordinates and
/// converts each `data[]` entry into a `ForecastDay`.
///
/// API Documentation: https://www.weatherbit.io/api/weather-forecast-16-day

use serde::Deserialize;
use std::thread;

use crate::config::{Config, HttpConfig};
use crate::logging::DebugLog;
use crate::model::{ForecastDay, ForecastError};

// ============================================================================
// Weatherbit API Response Structures
// ============================================================================

/// Daily forecast response from Weatherbit
#[derive(Debug, Deserialize)]
pub struct WeatherbitForecastResponse {
    pub data: Vec<WeatherbitDay>,
}

/// Single forecast day
#[derive(Debug, Deserialize)]
pub struct WeatherbitDay {
    pub datetime: String,  // "YYYY-MM-DD"
    pub max_temp: f64,
    pub weather: WeatherbitWeather,
}

#[derive(Debug, Deserialize)]
pub struct WeatherbitWeather {
    pub description: String,
}

// ============================================================================
// Source abstraction
// ============================================================================

/// Anything that can produce the forecast for one run.
pub trait ForecastSource {
    fn fetch_forecast(&self) -> Result<Vec<ForecastDay>, ForecastError>;
}

// ============================================================================
// Query construction and parsing
// ============================================================================

/// Query parameters for the daily forecast request, in request order.
///
/// Values are left unescaped here; reqwest form-encodes them when the
/// request is built. A coordinate that was never set is omitted so the API
/// rejects the request instead of answering for 0,0.
pub fn query_params(config: &Config) -> Vec<(&'static str, String)> {
    let f = &config.forecast;
    let mut params = Vec::with_capacity(5);
    if let Some(lat) = f.latitude {
        params.push(("lat", lat.to_string()));
    }
    if let Some(lon) = f.longitude {
        params.push(("lon", lon.to_string()));
    }
    params.push(("key", f.api_key.clone()));
    params.push(("days", f.days.to_string()));
    if let Some(units) = &f.units {
        params.push(("units", units.clone()));
    }
    params
}

/// Decodes a Weatherbit response body into forecast days, in API order.
///
/// Descriptions are lowercased here so every consumer sees one spelling.
pub fn parse_forecast_response(body: &str) -> Result<Vec<ForecastDay>, ForecastError> {
    let response: WeatherbitForecastResponse =
        serde_json::from_str(body).map_err(|e| ForecastError::Parse(e.to_string()))?;

    Ok(response
        .data
        .into_iter()
        .map(|d| ForecastDay {
            date: d.datetime,
            max_temp: d.max_temp,
            condition: d.weather.description.to_lowercase(),
        })
        .collect())
}

// ============================================================================
// API Client
// ============================================================================

pub struct WeatherbitClient<'a> {
    client: reqwest::blocking::Client,
    url: String,
    params: Vec<(&'static str, String)>,
    http: HttpConfig,
    debug: &'a DebugLog,
}

impl<'a> WeatherbitClient<'a> {
    pub fn new(config: &Config, debug: &'a DebugLog) -> Result<Self, ForecastError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.http.timeout())
            .build()
            .map_err(|e| ForecastError::Fetch(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            url: config.forecast.base_url.clone(),
            params: query_params(config),
            http: config.http.clone(),
            debug,
        })
    }

    /// Issues the GET, retrying connect failures and timeouts only.
    fn get_body(&self) -> Result<String, ForecastError> {
        let mut attempt = 0;
        loop {
            let request = self
                .client
                .get(&self.url)
                .query(&self.params)
                .header("Accept", "application/json");
            match request.send() {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(ForecastError::Fetch(format!("HTTP error: {}", status)));
                    }
                    return response
                        .text()
                        .map_err(|e| ForecastError::Fetch(format!("Failed to read response: {}", e)));
                }
                Err(e) if is_transient(&e) && attempt < self.http.max_retries => {
                    attempt += 1;
                    self.debug.warn(&format!(
                        "Forecast request failed ({}); retry {}/{}",
                        e, attempt, self.http.max_retries
                    ));
                    thread::sleep(self.http.backoff(attempt));
                }
                Err(e) => return Err(ForecastError::Fetch(format!("Request failed: {}", e))),
            }
        }
    }
}

impl ForecastSource for WeatherbitClient<'_> {
    fn fetch_forecast(&self) -> Result<Vec<ForecastDay>, ForecastError> {
        let body = self.get_body()?;
        parse_forecast_response(&body)
    }
}

/// Connect failures and timeouts are worth another attempt; anything else is not.
pub(crate) fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

// ============================================================================
// Tests
// ============================================================================
