//! Field geometry, style, and the normalization rules every field passes through.

use serde::{Deserialize, Serialize};

/// Default font family substituted for absent/empty families.
pub const DEFAULT_FONT_FAMILY: &str = "Inter";
/// Default font size in points, substituted for absent/non-positive sizes.
pub const DEFAULT_FONT_SIZE_PT: f64 = 16.0;
/// Inclusive font size range in points.
pub const FONT_SIZE_RANGE: (f64, f64) = (8.0, 120.0);
/// Smallest allowed letter spacing in pixels.
pub const MIN_LETTER_SPACING: f64 = -2.0;

/// Field position and size as percentages of the template's own dimensions.
///
/// This is the only coordinate system the model uses: a rect is valid when
/// all components are finite, `width,height ∈ [1,100]` and
/// `x + width ≤ 100`, `y + height ≤ 100`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PctRect {
    /// Left edge, percent of template width.
    pub x: f64,
    /// Top edge, percent of template height.
    pub y: f64,
    /// Width, percent of template width.
    pub width: f64,
    /// Height, percent of template height.
    pub height: f64,
}

impl PctRect {
    /// Construct a rect; validity is established by [`normalize`], not here.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// What a field holds: an uploaded photo or a submitted text value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Participant photo, cover-fitted into the field rect.
    Photo,
    /// Single line of submitted text.
    Text,
}

/// Clip shape used when the field is composited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    /// Sharp-cornered rectangle.
    Rectangle,
    /// Rectangle with a fixed corner radius.
    Rounded,
    /// Ellipse inscribed in the field rect, regardless of aspect ratio.
    Circle,
}

/// Horizontal text anchor within the field rect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    /// Anchor to the padded left edge.
    Left,
    /// Anchor to the rect center.
    Center,
    /// Anchor to the padded right edge.
    Right,
}

/// Typography settings for text fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font family name; empty resolves to [`DEFAULT_FONT_FAMILY`].
    pub font_family: String,
    /// CSS-style weight, clamped to [100, 1000].
    pub font_weight: u16,
    /// Size in points, clamped to [`FONT_SIZE_RANGE`].
    pub font_size_pt: f64,
    /// Italic face selection.
    pub italic: bool,
    /// Horizontal anchor.
    pub align: TextAlign,
    /// Hex color string; unparseable values fall back to black at render time.
    pub color: String,
    /// Additional advance per glyph in pixels, at least [`MIN_LETTER_SPACING`].
    pub letter_spacing: f64,
    /// Line box multiplier used for vertical centering, clamped to [0.5, 3].
    pub line_height: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_weight: 400,
            font_size_pt: DEFAULT_FONT_SIZE_PT,
            italic: false,
            align: TextAlign::Left,
            color: "#000000".to_string(),
            letter_spacing: 0.0,
            line_height: 1.2,
        }
    }
}

/// Drop shadow behind the field's own fill/stroke.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    /// Whether the shadow is drawn at all.
    pub enabled: bool,
    /// Blur radius in pixels, clamped to [0, 64].
    pub blur: f64,
    /// Hex color string; unparseable values fall back to black.
    pub color: String,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: false,
            blur: 0.0,
            color: "#000000".to_string(),
        }
    }
}

/// Style settings shared by photo and text fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldStyle {
    /// Whether a border is stroked around the clip shape.
    pub border_enabled: bool,
    /// Border stroke width in pixels, clamped to [0, 20].
    pub border_width: f64,
    /// Border hex color; unparseable values fall back to black.
    pub border_color: String,
    /// Background fill hex color; unparseable values fall back to white.
    pub background_color: String,
    /// Background fill alpha in [0, 1]; 0 means no fill is drawn.
    pub background_opacity: f64,
    /// Whole-field alpha in [0, 1].
    pub opacity: f64,
    /// Rotation about the rect center in degrees, clamped to [−180, 180].
    pub rotation_deg: f64,
    /// Drop shadow settings.
    pub shadow: Shadow,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            border_enabled: false,
            border_width: 2.0,
            border_color: "#000000".to_string(),
            background_color: "#ffffff".to_string(),
            background_opacity: 0.0,
            opacity: 1.0,
            rotation_deg: 0.0,
            shadow: Shadow::default(),
        }
    }
}

/// One placeholder on the template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Opaque identity, stable once persisted.
    pub id: String,
    /// Photo or text.
    pub kind: FieldKind,
    /// Label; also the submission-form prompt and the key into text values.
    pub name: String,
    /// Normalized geometry.
    pub rect: PctRect,
    /// Clip shape at render time.
    pub shape: FieldShape,
    /// Typography (meaningful for text fields only).
    pub text: TextStyle,
    /// Shared style.
    pub style: FieldStyle,
    /// Paint-order key: higher paints later (on top). Ties break by list
    /// position.
    pub z_index: i32,
}

impl Field {
    /// New photo field with the editor's default placement.
    pub fn photo(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: FieldKind::Photo,
            name: "Photo".to_string(),
            rect: PctRect::new(10.0, 10.0, 15.0, 20.0),
            shape: FieldShape::Rectangle,
            text: TextStyle::default(),
            style: FieldStyle::default(),
            z_index: 0,
        }
    }

    /// New text field with the editor's default placement.
    pub fn text(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: FieldKind::Text,
            name: "Name".to_string(),
            rect: PctRect::new(10.0, 10.0, 20.0, 5.0),
            shape: FieldShape::Rectangle,
            text: TextStyle::default(),
            style: FieldStyle::default(),
            z_index: 0,
        }
    }
}

fn finite_or(v: f64, default: f64) -> f64 {
    if v.is_finite() { v } else { default }
}

/// Clamp every numeric attribute of `field` into its declared range.
///
/// Pure, total and idempotent: `normalize(normalize(f)) == normalize(f)`.
/// Width/height are clamped first, then x/y against the remaining room, then
/// style scalars. Invalid input is silently corrected, never reported —
/// malformed persisted data must not crash the editor or the renderer.
pub fn normalize(mut field: Field) -> Field {
    let rect = &mut field.rect;
    rect.width = finite_or(rect.width, 20.0).clamp(1.0, 100.0);
    rect.height = finite_or(rect.height, 5.0).clamp(1.0, 100.0);
    rect.x = finite_or(rect.x, 0.0).clamp(0.0, 100.0 - rect.width);
    rect.y = finite_or(rect.y, 0.0).clamp(0.0, 100.0 - rect.height);

    let text = &mut field.text;
    text.font_size_pt = if text.font_size_pt.is_finite() && text.font_size_pt > 0.0 {
        text.font_size_pt.clamp(FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1)
    } else {
        DEFAULT_FONT_SIZE_PT
    };
    if text.font_family.trim().is_empty() {
        text.font_family = DEFAULT_FONT_FAMILY.to_string();
    }
    text.font_weight = if text.font_weight == 0 {
        400
    } else {
        text.font_weight.clamp(100, 1000)
    };
    text.letter_spacing = finite_or(text.letter_spacing, 0.0).max(MIN_LETTER_SPACING);
    text.line_height = finite_or(text.line_height, 1.2).clamp(0.5, 3.0);

    let style = &mut field.style;
    style.border_width = finite_or(style.border_width, 2.0).clamp(0.0, 20.0);
    style.background_opacity = finite_or(style.background_opacity, 0.0).clamp(0.0, 1.0);
    style.opacity = finite_or(style.opacity, 1.0).clamp(0.0, 1.0);
    style.rotation_deg = finite_or(style.rotation_deg, 0.0).clamp(-180.0, 180.0);
    style.shadow.blur = finite_or(style.shadow.blur, 0.0).clamp(0.0, 64.0);

    field
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wild_field() -> Field {
        let mut f = Field::text("t0");
        f.rect = PctRect::new(95.0, f64::NAN, 30.0, f64::INFINITY);
        f.text.font_size_pt = 9999.0;
        f.text.font_family = "  ".to_string();
        f.text.letter_spacing = -10.0;
        f.text.line_height = 0.0;
        f.style.opacity = 4.2;
        f.style.rotation_deg = -720.0;
        f.style.background_opacity = f64::NEG_INFINITY;
        f.style.border_width = 300.0;
        f.style.shadow.blur = -5.0;
        f.z_index = 3;
        f
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(wild_field());
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_enforces_containment() {
        let f = normalize(wild_field());
        assert!(f.rect.x >= 0.0 && f.rect.y >= 0.0);
        assert!(f.rect.x + f.rect.width <= 100.0);
        assert!(f.rect.y + f.rect.height <= 100.0);
        assert!(f.rect.width >= 1.0 && f.rect.height >= 1.0);
    }

    #[test]
    fn normalize_substitutes_documented_defaults() {
        let f = normalize(wild_field());
        // NaN y falls back to 0; infinite height falls back to the text
        // default of 5%.
        assert_eq!(f.rect.y, 0.0);
        assert_eq!(f.rect.height, 5.0);
        assert_eq!(f.text.font_family, DEFAULT_FONT_FAMILY);
        assert_eq!(f.text.letter_spacing, MIN_LETTER_SPACING);
        assert_eq!(f.text.line_height, 0.5);
        assert_eq!(f.style.opacity, 1.0);
        assert_eq!(f.style.rotation_deg, -180.0);
        assert_eq!(f.style.background_opacity, 0.0);
        assert_eq!(f.style.border_width, 20.0);
        assert_eq!(f.style.shadow.blur, 0.0);
    }

    #[test]
    fn normalize_clamps_font_size_into_range() {
        let mut f = Field::text("t1");
        f.text.font_size_pt = 2.0;
        assert_eq!(normalize(f.clone()).text.font_size_pt, 8.0);
        f.text.font_size_pt = 500.0;
        assert_eq!(normalize(f.clone()).text.font_size_pt, 120.0);
        f.text.font_size_pt = f64::NAN;
        assert_eq!(normalize(f).text.font_size_pt, DEFAULT_FONT_SIZE_PT);
    }

    #[test]
    fn normalize_zero_weight_becomes_regular() {
        let mut f = Field::text("t2");
        f.text.font_weight = 0;
        assert_eq!(normalize(f.clone()).text.font_weight, 400);
        f.text.font_weight = 9000;
        assert_eq!(normalize(f).text.font_weight, 1000);
    }

    #[test]
    fn valid_fields_survive_unchanged() {
        let f = normalize(Field::photo("p0"));
        assert_eq!(f, normalize(f.clone()));
        assert_eq!(f.rect, PctRect::new(10.0, 10.0, 15.0, 20.0));
    }
}
