//! Flash pixel classification
//!
//! A flash is the transient warm overlay (red, orange or pink) that a
//! prototype paints over its hotspots. Classification is a colour and alpha
//! envelope, never an exact colour match, and every threshold is a field so
//! the policy can be tuned without touching the detector.

use serde::{Deserialize, Serialize};

/// Inclusive channel range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub min: u8,
    pub max: u8,
}

impl ChannelRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One colour band of the multi-band rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBand {
    pub red: ChannelRange,
    pub green: ChannelRange,
    pub blue: ChannelRange,
    /// Band-specific alpha minimum, never below the policy floor
    pub min_alpha: u8,
}

impl ColorBand {
    #[inline]
    fn matches(&self, r: u8, g: u8, b: u8, a: u8) -> bool {
        a >= self.min_alpha
            && self.red.contains(r)
            && self.green.contains(g)
            && self.blue.contains(b)
    }
}

/// Strategy deciding whether a pixel belongs to a flash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlashPolicy {
    /// High red, low green, low blue, mostly opaque.
    ///
    /// A pixel matches when `r > min_red && g < max_green && b < max_blue && a > alpha_floor`.
    Simple {
        min_red: u8,
        max_green: u8,
        max_blue: u8,
        alpha_floor: u8,
    },
    /// Any of several red/orange/pink bands, including translucent overlays.
    ///
    /// `alpha_floor` is applied before any band: `a <= alpha_floor` never matches.
    MultiBand { alpha_floor: u8, bands: Vec<ColorBand> },
}

impl Default for FlashPolicy {
    fn default() -> Self {
        Self::simple()
    }
}

impl FlashPolicy {
    /// The plain high-red rule (`r > 150, g < 80, b < 80, a > 128`)
    pub fn simple() -> Self {
        FlashPolicy::Simple {
            min_red: 150,
            max_green: 80,
            max_blue: 80,
            alpha_floor: 128,
        }
    }

    /// Dark, medium and light red/orange/pink bands plus a translucent band
    pub fn multi_band() -> Self {
        FlashPolicy::MultiBand {
            alpha_floor: 40,
            bands: vec![
                // dark red
                ColorBand {
                    red: ChannelRange::new(120, 200),
                    green: ChannelRange::new(0, 60),
                    blue: ChannelRange::new(0, 60),
                    min_alpha: 128,
                },
                // medium red / orange
                ColorBand {
                    red: ChannelRange::new(200, 255),
                    green: ChannelRange::new(0, 140),
                    blue: ChannelRange::new(0, 100),
                    min_alpha: 128,
                },
                // light red / pink
                ColorBand {
                    red: ChannelRange::new(220, 255),
                    green: ChannelRange::new(100, 190),
                    blue: ChannelRange::new(120, 200),
                    min_alpha: 128,
                },
                // translucent overlay over a light background
                ColorBand {
                    red: ChannelRange::new(180, 255),
                    green: ChannelRange::new(0, 110),
                    blue: ChannelRange::new(0, 110),
                    min_alpha: 41,
                },
            ],
        }
    }

    /// The alpha value at or below which nothing is a flash pixel
    pub fn alpha_floor(&self) -> u8 {
        match self {
            FlashPolicy::Simple { alpha_floor, .. } => *alpha_floor,
            FlashPolicy::MultiBand { alpha_floor, .. } => *alpha_floor,
        }
    }

    #[inline]
    pub fn is_flash_pixel(&self, r: u8, g: u8, b: u8, a: u8) -> bool {
        if a <= self.alpha_floor() {
            return false;
        }
        match self {
            FlashPolicy::Simple {
                min_red,
                max_green,
                max_blue,
                ..
            } => r > *min_red && g < *max_green && b < *max_blue,
            FlashPolicy::MultiBand { bands, .. } => {
                bands.iter().any(|band| band.matches(r, g, b, a))
            }
        }
    }

    /// Classify the pixel at `index` (pixel index, not byte offset) of a flat RGBA buffer
    #[inline]
    pub fn is_flash_at(&self, rgba: &[u8], index: usize) -> bool {
        let offset = index * 4;
        match rgba.get(offset..offset + 4) {
            Some(px) => self.is_flash_pixel(px[0], px[1], px[2], px[3]),
            None => false,
        }
    }
}
