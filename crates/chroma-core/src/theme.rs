// Theme tags and the built-in palette table used when every source is down.

use std::fmt;
use std::str::FromStr;

use crate::color::{Color, Palette};

/// Category used to pick a thematically fitting palette.
///
/// Declaration order matters: [`Theme::position`] feeds the deterministic
/// palette index in the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Education,
    BankFinance,
    Games,
    Health,
    Food,
    Technology,
    Fashion,
    Nature,
}

impl Theme {
    pub const ALL: [Theme; 8] = [
        Theme::Education,
        Theme::BankFinance,
        Theme::Games,
        Theme::Health,
        Theme::Food,
        Theme::Technology,
        Theme::Fashion,
        Theme::Nature,
    ];

    /// Zero-based index in [`Theme::ALL`].
    pub fn position(self) -> usize {
        self as usize
    }

    /// Machine name, as users type it.
    pub fn name(self) -> &'static str {
        match self {
            Theme::Education => "education",
            Theme::BankFinance => "bank_finance",
            Theme::Games => "games",
            Theme::Health => "health",
            Theme::Food => "food",
            Theme::Technology => "technology",
            Theme::Fashion => "fashion",
            Theme::Nature => "nature",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Education => "Education",
            Theme::BankFinance => "Bank / Finance",
            Theme::Games => "Games",
            Theme::Health => "Health",
            Theme::Food => "Food",
            Theme::Technology => "Technology",
            Theme::Fashion => "Fashion",
            Theme::Nature => "Nature",
        }
    }

    /// Hard-coded palette served when no remote source answers. Names
    /// outside [`Theme`] fail to parse, so there's no fallback for them.
    pub fn builtin_palette(self) -> Palette {
        let hex = match self {
            Theme::Education => [0x1E3A8A, 0x3B82F6, 0xFBBF24, 0xF3F4F6, 0x10B981],
            Theme::BankFinance => [0x0B3D91, 0x1F6F50, 0xC9A227, 0xE5E7EB, 0x111827],
            Theme::Games => [0x7C3AED, 0xEC4899, 0x22D3EE, 0xFACC15, 0x0F172A],
            Theme::Health => [0x0EA5E9, 0x14B8A6, 0xF0FDFA, 0x84CC16, 0xEF4444],
            Theme::Food => [0xDC2626, 0xF97316, 0xFDE68A, 0x65A30D, 0x78350F],
            Theme::Technology => [0x0F172A, 0x2563EB, 0x06B6D4, 0x94A3B8, 0xF8FAFC],
            Theme::Fashion => [0x111111, 0xF5F5F4, 0xBE185D, 0xD6B88A, 0x6B7280],
            Theme::Nature => [0x14532D, 0x4D7C0F, 0xA3E635, 0x92400E, 0x7DD3FC],
        };
        palette_from_rgb(hex)
    }
}

fn palette_from_rgb(values: [u32; 5]) -> Palette {
    Palette::new(values.map(|v| {
        let [_, r, g, b] = v.to_be_bytes();
        Color::new(r, g, b)
    }))
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a name isn't one of the eight themes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme `{0}`")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|t| t.name() == s.trim())
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}
