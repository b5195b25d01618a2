use chrono::{NaiveDate, NaiveTime};

#[derive(Debug, Clone)]
pub struct WeatherRequest {
    pub location: String,
    /// Sent as `historical_date`; `None` asks for the live observation only.
    pub historical_date: Option<NaiveDate>,
}

/// One normalized weatherstack reading, as stored in `weather_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub date: NaiveDate,
    /// Local time of day at the observed location.
    pub observation_time: NaiveTime,
    pub epoc_time: i64,
    pub temperature: f64,
    pub wind_speed: f64,
    pub wind_degree: i32,
    pub wind_dir: String,
    pub pressure: f64,
    pub feelslike: f64,
    pub uv_index: i32,
    pub visibility: f64,
}

/// An observation together with the surrogate key the database gave it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObservation {
    pub id: i64,
    pub observation: WeatherObservation,
}
