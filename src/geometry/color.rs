// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Volume colors

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGB color of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(0xff, 0, 0);
    pub const LIGHT_GRAY: Color = Color::new(0xcc, 0xcc, 0xcc);
    /// Used when a color column cannot be read
    pub const FALLBACK: Color = Color::new(0x99, 0x99, 0x99);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgb_f32(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Color plus the transparency digit (0-9) of a color column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAlpha {
    pub color: Color,
    pub alpha: u8,
}

impl ColorAlpha {
    /// Parse `[#]rrggbb[a]`. Unreadable input is reported and mapped to
    /// [`Color::FALLBACK`] with no transparency.
    pub fn parse(text: &str) -> Self {
        match crate::io::parser::parse_color(text) {
            Some(([r, g, b], alpha)) => Self {
                color: Color::new(r, g, b),
                alpha: alpha.unwrap_or(0),
            },
            None => {
                log::error!("Could not convert the color '{}' to an RGBa group", text);
                Self {
                    color: Color::FALLBACK,
                    alpha: 0,
                }
            }
        }
    }

    /// Transparency in percent, as used by the render backends
    pub fn transparency(&self) -> u8 {
        self.alpha.saturating_mul(10)
    }
}

impl fmt::Display for ColorAlpha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alpha > 0 {
            write!(f, "{}{}", self.color, self.alpha)
        } else {
            write!(f, "{}", self.color)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_alpha() {
        let c = ColorAlpha::parse("cccccc9");
        assert_eq!(c.color, Color::LIGHT_GRAY);
        assert_eq!(c.alpha, 9);
        assert_eq!(c.transparency(), 90);
        assert_eq!(c.to_string(), "cccccc9");
    }

    #[test]
    fn test_bad_color_falls_back() {
        let c = ColorAlpha::parse("blue");
        assert_eq!(c.color, Color::FALLBACK);
        assert_eq!(c.alpha, 0);
    }
}
