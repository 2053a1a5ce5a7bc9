// reqwest-backed implementations of the source capabilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use super::parse::{parse_color_list, parse_generated, parse_palette_list};
use super::{ColorListSource, FetchError, PaletteGenerator, PaletteListSource};
use crate::color::{Color, Palette};

/// Model name sent to the palette generator.
const GENERATOR_MODEL: &str = "default";

// ---------------------------------------------------------------------------
// Shared request plumbing
// ---------------------------------------------------------------------------

/// One endpoint plus an HTTP client whose requests give up after `timeout`.
#[derive(Debug, Clone)]
struct Endpoint {
    http: reqwest::Client,
    url: String,
}

impl Endpoint {
    fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    async fn get_json(&self) -> Result<Value, FetchError> {
        self.send(self.http.get(&self.url)).await
    }

    async fn post_json(&self, body: &Value) -> Result<Value, FetchError> {
        self.send(self.http.post(&self.url).json(body)).await
    }

    /// Perform the request and decode a 200 response as JSON. Every failure
    /// is logged here so callers only see the typed error.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, FetchError> {
        let result = request_json(request).await;
        match &result {
            Ok(_) => debug!(url = %self.url, "fetched"),
            Err(e) => warn!(url = %self.url, error = %e, "source request failed"),
        }
        result
    }
}

async fn request_json(request: reqwest::RequestBuilder) -> Result<Value, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.json::<Value>().await?)
}

/// Log a parse failure with the endpoint it came from.
fn log_malformed<T>(url: &str, result: Result<T, FetchError>) -> Result<T, FetchError> {
    if let Err(e) = &result {
        warn!(url = %url, error = %e, "source returned an unexpected body");
    }
    result
}

// ---------------------------------------------------------------------------
// Color list (GitHub language colors)
// ---------------------------------------------------------------------------

/// `GET` a mapping of identifier to `{ "color": "#RRGGBB" }`.
#[derive(Debug, Clone)]
pub struct HttpColorList {
    endpoint: Endpoint,
}

impl HttpColorList {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            endpoint: Endpoint::new(url, timeout)?,
        })
    }
}

#[async_trait]
impl ColorListSource for HttpColorList {
    async fn fetch_colors(&self) -> Result<Vec<Color>, FetchError> {
        let body = self.endpoint.get_json().await?;
        log_malformed(&self.endpoint.url, parse_color_list(&body))
    }
}

// ---------------------------------------------------------------------------
// Palette list (nice-color-palettes)
// ---------------------------------------------------------------------------

/// `GET` an array of hex-string arrays.
#[derive(Debug, Clone)]
pub struct HttpPaletteList {
    endpoint: Endpoint,
}

impl HttpPaletteList {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            endpoint: Endpoint::new(url, timeout)?,
        })
    }
}

#[async_trait]
impl PaletteListSource for HttpPaletteList {
    async fn fetch_palettes(&self) -> Result<Vec<Palette>, FetchError> {
        let body = self.endpoint.get_json().await?;
        log_malformed(&self.endpoint.url, parse_palette_list(&body))
    }
}

// ---------------------------------------------------------------------------
// Generator (colormind)
// ---------------------------------------------------------------------------

/// `POST {"model": "default"}` and read back `result` RGB triples.
#[derive(Debug, Clone)]
pub struct HttpPaletteGenerator {
    endpoint: Endpoint,
}

impl HttpPaletteGenerator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            endpoint: Endpoint::new(url, timeout)?,
        })
    }
}

#[async_trait]
impl PaletteGenerator for HttpPaletteGenerator {
    async fn generate(&self) -> Result<Palette, FetchError> {
        let request = serde_json::json!({ "model": GENERATOR_MODEL });
        let body = self.endpoint.post_json(&request).await?;
        log_malformed(&self.endpoint.url, parse_generated(&body))
    }
}
