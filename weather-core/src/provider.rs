//! weatherstack `current` endpoint client.

use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Deserializer, de};

use crate::{
    config::ProviderConfig,
    error::{Error, Result},
    model::{WeatherObservation, WeatherRequest},
};

pub const DEFAULT_BASE_URL: &str = "http://api.weatherstack.com";

#[derive(Debug, Clone)]
pub struct WeatherstackClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherstackClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            api_key: config.key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Fetch the current observation for `request.location`.
    ///
    /// Any non-success status, provider error envelope or incomplete
    /// payload is an error; there is no "no data" result.
    pub async fn fetch_current(&self, request: &WeatherRequest) -> Result<WeatherObservation> {
        let url = format!("{}/current", self.base_url);

        let mut query = vec![
            ("access_key", self.api_key.clone()),
            ("query", request.location.clone()),
        ];
        if let Some(date) = request.historical_date {
            query.push(("historical_date", date.format("%Y-%m-%d").to_string()));
        }
        query.push(("units", "m".to_string()));

        tracing::debug!(
            location = %request.location,
            historical_date = ?request.historical_date,
            "requesting current weather from weatherstack"
        );

        // The request url carries `access_key`, keep it out of errors.
        let res = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| Error::Http(e.without_url()))?;

        if !status.is_success() {
            return Err(Error::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let observation = parse_observation(&body)?;
        tracing::info!(
            location = %request.location,
            date = %observation.date,
            time = %observation.observation_time,
            temperature = observation.temperature,
            "fetched observation"
        );

        Ok(observation)
    }
}

/// Map a weatherstack `current` response body into a [`WeatherObservation`].
pub fn parse_observation(body: &str) -> Result<WeatherObservation> {
    if body.trim().is_empty() {
        return Err(Error::MalformedPayload("empty response body".into()));
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::MalformedPayload(format!("invalid JSON: {e}")))?;

    // weatherstack reports API failures with a 200 and this envelope.
    if value.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
        let envelope: WsErrorEnvelope = serde_json::from_value(value)
            .map_err(|e| Error::MalformedPayload(format!("unreadable error envelope: {e}")))?;
        return Err(Error::Provider {
            code: envelope.error.code,
            kind: envelope.error.kind,
            info: envelope.error.info,
        });
    }

    let parsed: WsResponse =
        serde_json::from_value(value).map_err(|e| Error::MalformedPayload(e.to_string()))?;

    let localtime = parse_localtime(&parsed.location.localtime)?;
    let current = parsed.current;

    Ok(WeatherObservation {
        date: localtime.date(),
        observation_time: localtime.time(),
        epoc_time: parsed.location.localtime_epoch,
        temperature: current.temperature,
        wind_speed: current.wind_speed,
        wind_degree: current.wind_degree,
        wind_dir: current.wind_dir,
        pressure: current.pressure,
        feelslike: current.feelslike,
        uv_index: current.uv_index,
        visibility: current.visibility,
    })
}

fn parse_localtime(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| Error::MalformedPayload(format!("bad `location.localtime` '{raw}': {e}")))
}

#[derive(Debug, Deserialize)]
struct WsLocation {
    localtime: String,
    localtime_epoch: i64,
}

#[derive(Debug, Deserialize)]
struct WsCurrent {
    temperature: f64,
    wind_speed: f64,
    #[serde(deserialize_with = "whole_number")]
    wind_degree: i32,
    wind_dir: String,
    pressure: f64,
    feelslike: f64,
    #[serde(deserialize_with = "whole_number")]
    uv_index: i32,
    visibility: f64,
}

#[derive(Debug, Deserialize)]
struct WsResponse {
    location: WsLocation,
    current: WsCurrent,
}

#[derive(Debug, Deserialize)]
struct WsError {
    code: i64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct WsErrorEnvelope {
    error: WsError,
}

/// Accepts `5` as well as `5.0`, rejects `5.5`.
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.fract() != 0.0 || raw < f64::from(i32::MIN) || raw > f64::from(i32::MAX) {
        return Err(de::Error::custom(format!("expected a whole number, got {raw}")));
    }
    Ok(raw as i32)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "request": { "type": "City", "query": "Poole, United Kingdom", "unit": "m" },
            "location": {
                "name": "Poole",
                "country": "United Kingdom",
                "localtime": "2024-06-01 14:05",
                "localtime_epoch": 1717250700
            },
            "current": {
                "observation_time": "01:05 PM",
                "temperature": 20,
                "wind_speed": 15,
                "wind_degree": 240,
                "wind_dir": "WSW",
                "pressure": 1016,
                "feelslike": 19,
                "uv_index": 5,
                "visibility": 10
            }
        })
    }

    #[test]
    fn maps_every_field() {
        let obs = parse_observation(&sample().to_string()).unwrap();

        assert_eq!(obs.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(obs.observation_time, NaiveTime::from_hms_opt(14, 5, 0).unwrap());
        assert_eq!(obs.epoc_time, 1717250700);
        assert_eq!(obs.temperature, 20.0);
        assert_eq!(obs.wind_speed, 15.0);
        assert_eq!(obs.wind_degree, 240);
        assert_eq!(obs.wind_dir, "WSW");
        assert_eq!(obs.pressure, 1016.0);
        assert_eq!(obs.feelslike, 19.0);
        assert_eq!(obs.uv_index, 5);
        assert_eq!(obs.visibility, 10.0);
    }

    #[test]
    fn accepts_localtime_with_seconds() {
        let mut payload = sample();
        payload["location"]["localtime"] = json!("2024-06-01 14:05:30");

        let obs = parse_observation(&payload.to_string()).unwrap();
        assert_eq!(obs.observation_time, NaiveTime::from_hms_opt(14, 5, 30).unwrap());
    }

    #[test]
    fn missing_current_field_is_rejected() {
        let mut payload = sample();
        payload["current"].as_object_mut().unwrap().remove("wind_dir");

        let err = parse_observation(&payload.to_string()).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
        assert!(err.to_string().contains("wind_dir"));
    }

    #[test]
    fn flat_current_without_location_is_rejected() {
        let payload = json!({ "current": { "temperature": 20 } });

        let err = parse_observation(&payload.to_string()).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn null_value_is_rejected() {
        let mut payload = sample();
        payload["current"]["temperature"] = serde_json::Value::Null;

        assert!(parse_observation(&payload.to_string()).is_err());
    }

    #[test]
    fn bad_localtime_is_rejected() {
        let mut payload = sample();
        payload["location"]["localtime"] = json!("yesterday");

        let err = parse_observation(&payload.to_string()).unwrap_err();
        assert!(err.to_string().contains("location.localtime"));
    }

    #[test]
    fn empty_body_is_rejected() {
        let err = parse_observation("  ").unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn error_envelope_becomes_provider_error() {
        let payload = json!({
            "success": false,
            "error": {
                "code": 101,
                "type": "invalid_access_key",
                "info": "You have not supplied a valid API Access Key."
            }
        });

        match parse_observation(&payload.to_string()).unwrap_err() {
            Error::Provider { code, kind, .. } => {
                assert_eq!(code, 101);
                assert_eq!(kind, "invalid_access_key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncate_body_caps_long_bodies() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn whole_number_fields_accept_float_form() {
        let mut payload = sample();
        payload["current"]["uv_index"] = json!(5.0);
        payload["current"]["wind_degree"] = json!(240.0);

        let obs = parse_observation(&payload.to_string()).unwrap();
        assert_eq!(obs.uv_index, 5);
        assert_eq!(obs.wind_degree, 240);
    }

    #[test]
    fn fractional_uv_index_is_rejected() {
        let mut payload = sample();
        payload["current"]["uv_index"] = json!(5.5);

        let err = parse_observation(&payload.to_string()).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
        assert!(err.to_string().contains("whole number"));
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_access_key() {
        // Nothing listens on port 1.
        let mut config = ProviderConfig::new("SUPERSECRETKEY");
        config.base_url = "http://127.0.0.1:1".into();
        let client = WeatherstackClient::from_config(&config).unwrap();

        let request = WeatherRequest {
            location: "Poole".into(),
            historical_date: None,
        };
        let err = client.fetch_current(&request).await.unwrap_err();

        assert!(matches!(err, Error::Http(_)));
        let msg = format!("{err} {err:?}");
        assert!(!msg.contains("SUPERSECRETKEY"), "key leaked: {msg}");
    }
}
