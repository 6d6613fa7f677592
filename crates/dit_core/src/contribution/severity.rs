//! Commit-count to color-intensity mapping.

use serde::{Deserialize, Serialize};

/// Discrete heat-map intensity, ordered from empty to darkest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Level1,
    Level2,
    Level3,
    Level4,
    Level5Plus,
}

impl Severity {
    /// Numeric level, `0` for `None` up to `5` for `Level5Plus`.
    pub fn level(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Level1 => 1,
            Self::Level2 => 2,
            Self::Level3 => 3,
            Self::Level4 => 4,
            Self::Level5Plus => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Level1 => "level1",
            Self::Level2 => "level2",
            Self::Level3 => "level3",
            Self::Level4 => "level4",
            Self::Level5Plus => "level5_plus",
        }
    }
}

/// Maps a day's commit count to its severity bucket.
///
/// Total over `i64`: negative counts clamp to `None`, five or more commits
/// saturate at `Level5Plus`.
pub fn bucket_for(count: i64) -> Severity {
    match count {
        i64::MIN..=0 => Severity::None,
        1 => Severity::Level1,
        2 => Severity::Level2,
        3 => Severity::Level3,
        4 => Severity::Level4,
        _ => Severity::Level5Plus,
    }
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`, uppercase.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Fill colors for severity levels 1..=5. `None` cells are left unfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    levels: [Rgb; 5],
}

impl Palette {
    pub const GREEN: Palette = Palette {
        levels: [
            Rgb::new(235, 251, 238),
            Rgb::new(178, 242, 187),
            Rgb::new(105, 219, 124),
            Rgb::new(64, 192, 87),
            Rgb::new(47, 158, 68),
        ],
    };

    pub const fn new(levels: [Rgb; 5]) -> Self {
        Self { levels }
    }

    pub fn color_for(&self, severity: Severity) -> Option<Rgb> {
        match severity.level() {
            0 => None,
            level => Some(self.levels[usize::from(level) - 1]),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::GREEN
    }
}
