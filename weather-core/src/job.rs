use chrono::{Local, NaiveDate};

use crate::{
    config::Config,
    error::Result,
    model::{WeatherObservation, WeatherRequest},
    provider::WeatherstackClient,
    store,
};

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub id: i64,
    pub observation: WeatherObservation,
}

/// Build the request for today's run from config.
pub fn request_for(config: &Config, today: NaiveDate) -> WeatherRequest {
    WeatherRequest {
        location: config.weatherstack.location.clone(),
        historical_date: config.weatherstack.historical_date.then_some(today),
    }
}

/// Fetch the current observation and store it as one row.
///
/// The database is only touched once the fetch has produced a complete record.
pub async fn run(config: &Config) -> Result<RunReport> {
    run_on(config, Local::now().date_naive()).await
}

pub async fn run_on(config: &Config, today: NaiveDate) -> Result<RunReport> {
    let client = WeatherstackClient::from_config(&config.weatherstack)?;
    let request = request_for(config, today);

    let observation = client.fetch_current(&request).await?;
    let id = store::persist(&config.db, &observation).await?;

    Ok(RunReport { id, observation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, ProviderConfig};

    fn config(historical_date: bool) -> Config {
        let mut weatherstack = ProviderConfig::new("KEY");
        weatherstack.location = "Bournemouth".into();
        weatherstack.historical_date = historical_date;

        Config {
            weatherstack,
            db: DatabaseConfig::from_url("sqlite::memory:"),
        }
    }

    #[test]
    fn request_uses_configured_location() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let request = request_for(&config(false), today);

        assert_eq!(request.location, "Bournemouth");
        assert_eq!(request.historical_date, None);
    }

    #[test]
    fn request_carries_today_when_historical_date_enabled() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let request = request_for(&config(true), today);

        assert_eq!(request.historical_date, Some(today));
    }
}
