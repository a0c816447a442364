pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (straight, not premultiplied).
    pub a: u8,
}

impl Rgba8 {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque color from RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Return the same color with alpha scaled by `factor` in [0,1].
    pub fn with_alpha_factor(self, factor: f64) -> Self {
        let a = (f64::from(self.a) * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

/// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` color string.
///
/// Returns `None` for anything else; callers substitute their documented
/// default rather than failing (persisted styles are untrusted input).
pub fn parse_hex_color(s: &str) -> Option<Rgba8> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Option<u8> {
        u8::from_str_radix(pair, 16).ok()
    }

    match s.len() {
        3 => {
            let nib = |i: usize| -> Option<u8> {
                let v = u8::from_str_radix(&s[i..i + 1], 16).ok()?;
                Some(v * 17)
            };
            Some(Rgba8::rgb(nib(0)?, nib(1)?, nib(2)?))
        }
        6 => Some(Rgba8::rgb(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Some(Rgba8 {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
            a: hex_byte(&s[6..8])?,
        }),
        _ => None,
    }
}

/// Parse a hex color, substituting `default` (with a debug log) on failure.
pub fn parse_hex_color_or(s: &str, default: Rgba8) -> Rgba8 {
    match parse_hex_color(s) {
        Some(c) => c,
        None => {
            tracing::debug!(raw = s, "unparseable color, substituting default");
            default
        }
    }
}
