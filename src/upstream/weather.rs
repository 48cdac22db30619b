//! Current-conditions lookup for the weather overlay.

use crate::error::FrameError;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Current conditions at a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weather {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: i64,
    /// WMO weather interpretation code.
    pub code: i32,
}

impl Weather {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.code)
    }

    /// Temperature and humidity line shown under the icon.
    pub fn summary(&self) -> String {
        format!("{:.1}°C  {}%", self.temperature, self.humidity)
    }
}

/// WMO codes collapsed into the categories the overlay can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Showers,
    SnowShowers,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => WeatherCondition::Clear,
            1..=3 => WeatherCondition::Cloudy,
            45 | 48 => WeatherCondition::Fog,
            51 | 53 | 55 | 56 | 57 => WeatherCondition::Drizzle,
            61 | 63 | 65 | 66 | 67 => WeatherCondition::Rain,
            71 | 73 | 75 | 77 => WeatherCondition::Snow,
            80..=82 => WeatherCondition::Showers,
            85 | 86 => WeatherCondition::SnowShowers,
            95 | 96 | 99 => WeatherCondition::Thunderstorm,
            _ => WeatherCondition::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Showers => "Showers",
            WeatherCondition::SnowShowers => "Snow Showers",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Unknown => "Unknown",
        }
    }

    /// Codepoint in the Material Symbols icon font.
    pub fn glyph(self) -> char {
        let code = match self {
            WeatherCondition::Clear => 0xe430,
            WeatherCondition::Cloudy => 0xe2bd,
            WeatherCondition::Fog => 0xe818,
            WeatherCondition::Drizzle => 0xe798,
            WeatherCondition::Rain => 0xf176,
            WeatherCondition::Snow => 0xe2cd,
            WeatherCondition::Showers => 0xf1ad,
            WeatherCondition::SnowShowers => 0xeb3b,
            WeatherCondition::Thunderstorm => 0xebdb,
            WeatherCondition::Unknown => 0xe887,
        };
        char::from_u32(code).unwrap_or('?')
    }
}

/// Source of current conditions. Called from the blocking pool.
pub trait WeatherProvider: Send + Sync {
    fn current(&self, latitude: f64, longitude: f64) -> Result<Weather, FrameError>;
}

/// Open-Meteo forecast API client.
pub struct OpenMeteo {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    weather_code: i32,
}

impl From<CurrentBlock> for Weather {
    fn from(block: CurrentBlock) -> Self {
        Weather {
            temperature: block.temperature_2m,
            humidity: block.relative_humidity_2m.round() as i64,
            code: block.weather_code,
        }
    }
}

impl OpenMeteo {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FrameError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

fn parse_forecast(body: &str) -> Result<Weather, FrameError> {
    let parsed: ForecastResponse = serde_json::from_str(body)
        .map_err(|e| FrameError::Upstream(format!("malformed weather response: {e}")))?;
    Ok(parsed.current.into())
}

impl WeatherProvider for OpenMeteo {
    fn current(&self, latitude: f64, longitude: f64) -> Result<Weather, FrameError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,weather_code".to_string(),
                ),
            ])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FrameError::Upstream(format!(
                "weather api returned status {}",
                status.as_u16()
            )));
        }
        parse_forecast(&response.text()?)
    }
}
