// Color and palette types plus the brightness transform.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of colors in a palette.
pub const PALETTE_SIZE: usize = 5;

const BRIGHTER_FACTOR: f64 = 1.3;
const DARKER_FACTOR: f64 = 0.7;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("invalid color `{0}`: expected #RRGGBB")]
    InvalidHex(String),

    #[error("palette needs 5 colors, got {0}")]
    TooFewColors(usize),

    #[error("unknown direction `{0}`: expected `brighter` or `darker`")]
    UnknownDirection(String),
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// A 24-bit RGB color. Always rendered as `#RRGGBB` with uppercase digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` string. Surrounding whitespace is ignored and hex
    /// digits may be either case; anything else is rejected.
    pub fn parse(s: &str) -> Result<Self, ColorError> {
        let trimmed = s.trim();
        let invalid = || ColorError::InvalidHex(s.to_string());

        if trimmed.len() != 7 {
            return Err(invalid());
        }
        let digits = trimmed.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Build a color from loosely-typed channel values, clamping each to
    /// `0..=255` and truncating any fractional part.
    pub fn from_channels(r: f64, g: f64, b: f64) -> Self {
        Self::new(clamp_channel(r), clamp_channel(g), clamp_channel(b))
    }

    /// Canonical `#RRGGBB` representation.
    pub fn hex(&self) -> String {
        self.to_string()
    }

    /// Scale every channel by `direction`'s factor.
    pub fn adjusted(&self, direction: Direction) -> Self {
        let factor = direction.factor();
        Self::from_channels(
            f64::from(self.r) * factor,
            f64::from(self.g) * factor,
            f64::from(self.b) * factor,
        )
    }
}

fn clamp_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0) as u8
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Exactly five colors in the order the source returned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Palette([Color; PALETTE_SIZE]);

impl Palette {
    pub const fn new(colors: [Color; PALETTE_SIZE]) -> Self {
        Self(colors)
    }

    /// Build a palette from the first five entries of `colors`.
    pub fn from_leading(colors: &[Color]) -> Result<Self, ColorError> {
        let leading: [Color; PALETTE_SIZE] = colors
            .get(..PALETTE_SIZE)
            .and_then(|s| s.try_into().ok())
            .ok_or(ColorError::TooFewColors(colors.len()))?;
        Ok(Self(leading))
    }

    pub fn colors(&self) -> &[Color] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<Color> {
        self.0.to_vec()
    }

    /// Hex strings joined by a single space.
    pub fn to_hex_line(&self) -> String {
        join_hex(&self.0)
    }
}

impl TryFrom<Vec<Color>> for Palette {
    type Error = ColorError;

    fn try_from(colors: Vec<Color>) -> Result<Self, Self::Error> {
        Self::from_leading(&colors)
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_line())
    }
}

/// Render colors as space-separated hex codes.
pub fn join_hex(colors: &[Color]) -> String {
    colors.iter().map(Color::hex).collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Brightness transform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Brighter,
    Darker,
}

impl Direction {
    fn factor(self) -> f64 {
        match self {
            Direction::Brighter => BRIGHTER_FACTOR,
            Direction::Darker => DARKER_FACTOR,
        }
    }
}

impl FromStr for Direction {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brighter" => Ok(Direction::Brighter),
            "darker" => Ok(Direction::Darker),
            _ => Err(ColorError::UnknownDirection(s.to_string())),
        }
    }
}

/// Brighten or darken each color. Entries that don't parse as a color are
/// returned untouched, so the output always lines up with the input.
pub fn adjust_colors<S: AsRef<str>>(colors: &[S], direction: Direction) -> Vec<String> {
    colors
        .iter()
        .map(|raw| {
            let raw = raw.as_ref();
            match Color::parse(raw) {
                Ok(color) => color.adjusted(direction).hex(),
                Err(_) => raw.to_string(),
            }
        })
        .collect()
}

/// Remove repeated colors, keeping the first occurrence of each.
pub fn dedup_preserving_order(colors: impl IntoIterator<Item = Color>) -> Vec<Color> {
    let mut out: Vec<Color> = Vec::new();
    for color in colors {
        if !out.contains(&color) {
            out.push(color);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_upper_and_lower_case() {
        assert_eq!(Color::parse("#FF5733").unwrap(), Color::new(0xFF, 0x57, 0x33));
        assert_eq!(Color::parse("#ff5733").unwrap(), Color::new(0xFF, 0x57, 0x33));
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(Color::parse("  #00ff00\n").unwrap().hex(), "#00FF00");
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        for bad in ["", "#", "FF5733", "#FF573", "#FF57331", "#GG0000", "not-a-color", "#12 456"] {
            assert!(Color::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parse_rejects_multibyte_input_of_right_length() {
        // Seven bytes, but not seven ASCII chars.
        assert!(Color::parse("#ÿÿÿ").is_err());
    }

    #[test]
    fn display_is_uppercase_with_hash() {
        assert_eq!(Color::new(10, 171, 255).to_string(), "#0AABFF");
    }

    #[test]
    fn from_channels_clamps_and_truncates() {
        assert_eq!(Color::from_channels(300.0, -5.0, 127.9), Color::new(255, 0, 127));
        assert_eq!(Color::from_channels(f64::NAN, 1.0, 2.0), Color::new(0, 1, 2));
    }

    #[test]
    fn palette_takes_leading_five() {
        let colors: Vec<Color> = (1..=6).map(|i| Color::new(i, i, i)).collect();
        let palette = Palette::from_leading(&colors).unwrap();
        assert_eq!(palette.colors(), &colors[..5]);
    }

    #[test]
    fn palette_rejects_short_input() {
        let colors = vec![Color::new(0, 0, 0); 4];
        assert_eq!(Palette::try_from(colors), Err(ColorError::TooFewColors(4)));
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("Brighter".parse::<Direction>().unwrap(), Direction::Brighter);
        assert_eq!("darker".parse::<Direction>().unwrap(), Direction::Darker);
        assert!("sideways".parse::<Direction>().is_err());
    }

    // -- adjust_colors --

    #[test]
    fn brighter_scales_and_clamps() {
        let out = adjust_colors(&["#646464", "#C8C8C8"], Direction::Brighter);
        // 100 * 1.3 = 130 (0x82); 200 * 1.3 = 260 -> 255
        assert_eq!(out, vec!["#828282", "#FFFFFF"]);
    }

    #[test]
    fn darker_scales_and_truncates() {
        let out = adjust_colors(&["#FF0A01"], Direction::Darker);
        // 255 * 0.7 = 178.5 -> 178 (0xB2); 10 * 0.7 = 7; 1 * 0.7 = 0
        assert_eq!(out, vec!["#B20700"]);
    }

    #[test]
    fn adjust_empty_is_empty() {
        let empty: [&str; 0] = [];
        assert!(adjust_colors(&empty, Direction::Brighter).is_empty());
        assert!(adjust_colors(&empty, Direction::Darker).is_empty());
    }

    #[test]
    fn adjust_passes_invalid_entries_through() {
        assert_eq!(
            adjust_colors(&["not-a-color"], Direction::Brighter),
            vec!["not-a-color"]
        );
        let out = adjust_colors(&["#000000", "oops", "#FFFFFF"], Direction::Darker);
        assert_eq!(out, vec!["#000000", "oops", "#B2B2B2"]);
    }

    #[test]
    fn brighter_then_darker_stays_well_formed() {
        for value in [0u8, 1, 17, 99, 128, 196, 254, 255] {
            let input = Color::new(value, 255 - value, value / 2).hex();
            let bright = adjust_colors(&[input.as_str()], Direction::Brighter);
            let back = adjust_colors(&bright, Direction::Darker);
            for s in bright.iter().chain(back.iter()) {
                assert_eq!(s.len(), 7);
                assert!(Color::parse(s).is_ok(), "{s} should stay a valid color");
            }
        }
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let a = Color::new(1, 1, 1);
        let b = Color::new(2, 2, 2);
        let c = Color::new(3, 3, 3);
        assert_eq!(dedup_preserving_order([b, a, b, c, a]), vec![b, a, c]);
        assert!(dedup_preserving_order(Vec::new()).is_empty());
    }
}
