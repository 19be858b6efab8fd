//! Vector and color values

/// Three component vector used for transforms
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Linear RGBA color, each channel in `0.0..=1.0`
///
/// Persisted as an `RRGGBBAA` hex string, so channels carry 8 bits of
/// precision through a save/load cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit channels
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Quantize the color to 8-bit channels
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Parse `RRGGBB` or `RRGGBBAA`, with an optional leading `#`
    ///
    /// Alpha defaults to opaque when only six digits are given.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return None;
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok();
        let alpha = if hex.len() == 8 { channel(3)? } else { 0xFF };
        Some(Self::from_rgba8(channel(0)?, channel(1)?, channel(2)?, alpha))
    }

    /// Format as an upper-case `RRGGBBAA` string
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        format!("{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_round_trip() {
        let color = Color::from_hex("FF8000C0").unwrap();
        assert_eq!(color.to_rgba8(), [0xFF, 0x80, 0x00, 0xC0]);
        assert_eq!(color.to_hex(), "FF8000C0");
    }

    #[test]
    fn test_color_hex_variants() {
        assert_eq!(Color::from_hex("#00ff00").unwrap().to_hex(), "00FF00FF");
        assert!(Color::from_hex("12345").is_none());
        assert!(Color::from_hex("GG0000FF").is_none());
    }
}
