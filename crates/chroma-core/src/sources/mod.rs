// Remote color-data providers.
//
// Each source performs exactly one HTTP round trip and parses the body into
// validated colors. Failures come back as `FetchError` values; nothing is
// retried and no partial data escapes a failed call.

pub mod http;
pub mod parse;

use async_trait::async_trait;
use thiserror::Error;

use crate::color::{Color, Palette};

pub use http::{HttpColorList, HttpPaletteGenerator, HttpPaletteList};

/// Maximum colors kept from the color-list provider.
pub const MAX_COLORS: usize = 15;

/// Maximum palettes kept from the palette-list provider.
pub const MAX_PALETTES: usize = 3;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Can fetch a flat list of colors.
#[async_trait]
pub trait ColorListSource: Send + Sync {
    async fn fetch_colors(&self) -> Result<Vec<Color>, FetchError>;
}

/// Can fetch a list of ready-made palettes.
#[async_trait]
pub trait PaletteListSource: Send + Sync {
    async fn fetch_palettes(&self) -> Result<Vec<Palette>, FetchError>;
}

/// Can generate a single fresh palette.
#[async_trait]
pub trait PaletteGenerator: Send + Sync {
    async fn generate(&self) -> Result<Palette, FetchError>;
}
