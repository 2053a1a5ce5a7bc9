// Defensive JSON parsing for provider responses.
//
// A single bad record is skipped, never fatal. Only a body whose top-level
// shape is wrong turns into `FetchError::Malformed`.

use serde_json::Value;
use tracing::debug;

use super::{FetchError, MAX_COLORS, MAX_PALETTES};
use crate::color::{Color, Palette, PALETTE_SIZE};

/// Parse the color-list body: `{ "<id>": { "color": "#RRGGBB", ... }, ... }`.
///
/// Walks entries in provider order and stops after [`MAX_COLORS`] valid
/// colors.
pub fn parse_color_list(body: &Value) -> Result<Vec<Color>, FetchError> {
    let entries = body
        .as_object()
        .ok_or_else(|| FetchError::Malformed("expected a JSON object of entries".into()))?;

    let mut colors = Vec::new();
    for (id, info) in entries {
        if colors.len() >= MAX_COLORS {
            break;
        }
        match info.get("color").and_then(Value::as_str).map(Color::parse) {
            Some(Ok(color)) => colors.push(color),
            Some(Err(_)) => debug!(id = %id, "skipping entry with invalid color"),
            None => {}
        }
    }
    Ok(colors)
}

/// Parse the palette-list body: an array of arrays of hex strings.
///
/// An entry survives only if it has at least five items and the first five are
/// all valid colors. At most [`MAX_PALETTES`] palettes are kept.
pub fn parse_palette_list(body: &Value) -> Result<Vec<Palette>, FetchError> {
    let entries = body
        .as_array()
        .ok_or_else(|| FetchError::Malformed("expected a JSON array of palettes".into()))?;

    let palettes = entries
        .iter()
        .filter_map(palette_from_entry)
        .take(MAX_PALETTES)
        .collect();
    Ok(palettes)
}

fn palette_from_entry(entry: &Value) -> Option<Palette> {
    let items = entry.as_array()?;
    if items.len() < PALETTE_SIZE {
        return None;
    }
    let colors = items[..PALETTE_SIZE]
        .iter()
        .map(|item| item.as_str().and_then(|s| Color::parse(s).ok()))
        .collect::<Option<Vec<Color>>>()?;
    Palette::from_leading(&colors).ok()
}

/// Parse the generator body: `{ "result": [[r, g, b], ...] }`.
///
/// Channels are clamped to `0..=255`. Triples that aren't three numbers are
/// skipped; fewer than five usable colors is a malformed response.
pub fn parse_generated(body: &Value) -> Result<Palette, FetchError> {
    let triples = body
        .get("result")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Malformed("missing `result` array".into()))?;

    let colors: Vec<Color> = triples
        .iter()
        .filter_map(color_from_triple)
        .take(PALETTE_SIZE)
        .collect();

    Palette::from_leading(&colors).map_err(|e| FetchError::Malformed(e.to_string()))
}

fn color_from_triple(value: &Value) -> Option<Color> {
    match value.as_array()?.as_slice() {
        [r, g, b] => Some(Color::from_channels(r.as_f64()?, g.as_f64()?, b.as_f64()?)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
