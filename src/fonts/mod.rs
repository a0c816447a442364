//! Font registration, shaping, and the readiness gate.
//!
//! Text metrics taken before a face is fully registered silently fall back to
//! a substitute font and produce visibly wrong widths in the final bitmap, so
//! generation waits on [`FontGate::wait_ready`] before any measurement or
//! drawing happens.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::foundation::error::{PlacardError, PlacardResult};
use crate::model::field::{Field, FieldKind};

/// Glyphs shaped for the readiness probe: Latin, extended Latin and CJK
/// samples so non-Latin faces are exercised at least once before use.
const PROBE_TEXT: &str = "AaBbGg0123 ÅßÇñ 永体字";

/// RGBA8 brush color carried through Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// One typography face requirement: the (family, weight, style) triple
/// referenced by a text field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontSpec {
    /// Family name, matched case-insensitively against registered faces.
    pub family: String,
    /// CSS-style weight.
    pub weight: u16,
    /// Italic face selection.
    pub italic: bool,
}

impl FontSpec {
    fn key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.family.to_ascii_lowercase(),
            self.weight,
            self.italic
        )
    }
}

/// Collect the deduplicated font specs referenced by a field list.
pub fn font_specs_for(fields: &[Field]) -> Vec<FontSpec> {
    let mut out: SmallVec<[FontSpec; 4]> = SmallVec::new();
    for field in fields {
        if field.kind != FieldKind::Text {
            continue;
        }
        let spec = FontSpec {
            family: field.text.font_family.clone(),
            weight: field.text.font_weight,
            italic: field.text.italic,
        };
        if !out.iter().any(|s| s.key() == spec.key()) {
            out.push(spec);
        }
    }
    out.into_vec()
}

/// One glyph positioned on a shaped line, in layout-local pixels.
#[derive(Clone, Copy, Debug)]
pub struct ShapedGlyph {
    /// Glyph id in the resolved font.
    pub id: u32,
    /// X offset from the line origin.
    pub x: f32,
    /// Y offset (baseline-relative) from the line origin.
    pub y: f32,
    /// Horizontal advance of this glyph.
    pub advance: f32,
}

/// A single shaped line of text plus the metrics the compositor needs.
#[derive(Clone, Debug)]
pub struct ShapedLine {
    /// Positioned glyphs.
    pub glyphs: Vec<ShapedGlyph>,
    /// Total advance width in pixels.
    pub width: f32,
    /// Ascent above the baseline.
    pub ascent: f32,
    /// Descent below the baseline.
    pub descent: f32,
    /// Font size the line was shaped at.
    pub font_size: f32,
    /// Raw bytes of the face the line resolved to.
    pub font_bytes: Arc<Vec<u8>>,
}

impl ShapedLine {
    /// Re-space glyphs by accumulating `advance + spacing` per glyph.
    ///
    /// There is no native spacing primitive assumed in the raster backend;
    /// widths and positions are recomputed here instead.
    pub fn apply_letter_spacing(&mut self, spacing: f32) {
        if spacing == 0.0 || self.glyphs.is_empty() {
            return;
        }
        let mut pen = 0.0f32;
        for g in &mut self.glyphs {
            g.x = pen;
            pen += g.advance + spacing;
        }
        self.width = (pen - spacing).max(0.0);
    }
}

struct RegisteredFace {
    family: String,
    bytes: Arc<Vec<u8>>,
}

/// Font registry and shaping engine built on Parley contexts.
///
/// Faces are registered from raw bytes; shaping always resolves against the
/// registered set (fields referencing unknown families fall back to the first
/// registered face, logged at debug).
pub struct FontLibrary {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    faces: Vec<RegisteredFace>,
    probed: HashSet<String>,
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl FontLibrary {
    /// Construct an empty library with fresh Parley contexts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            faces: Vec::new(),
            probed: HashSet::new(),
        }
    }

    /// Register a font from raw bytes; returns the registered family name.
    pub fn register_font_bytes(&mut self, bytes: &[u8]) -> PlacardResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| PlacardError::font("no font families registered from font bytes"))?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| PlacardError::font("registered font family has no name"))?
            .to_string();

        self.faces.push(RegisteredFace {
            family: family_name.clone(),
            bytes: Arc::new(bytes.to_vec()),
        });
        Ok(family_name)
    }

    /// Whether any face is registered at all.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    fn resolve_face(&self, family: &str) -> Option<&RegisteredFace> {
        self.faces
            .iter()
            .find(|f| f.family.eq_ignore_ascii_case(family.trim()))
            .or_else(|| {
                let fallback = self.faces.first();
                if fallback.is_some() {
                    tracing::debug!(family, "family not registered, using fallback face");
                }
                fallback
            })
    }

    /// Shape one line of text at `size_px` against the spec's face.
    ///
    /// Line breaking is disabled: fields draw a single truncated line.
    pub fn shape_line(
        &mut self,
        text: &str,
        spec: &FontSpec,
        size_px: f32,
    ) -> PlacardResult<ShapedLine> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(PlacardError::font("text size_px must be finite and > 0"));
        }
        let (family_name, font_bytes) = {
            let face = self
                .resolve_face(&spec.family)
                .ok_or_else(|| PlacardError::font("no fonts registered"))?;
            (face.family.clone(), face.bytes.clone())
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(spec.weight)),
        ));
        if spec.italic {
            builder.push_default(parley::style::StyleProperty::FontStyle(
                parley::style::FontStyle::Italic,
            ));
        }
        builder.push_default(parley::style::StyleProperty::Brush(TextBrushRgba8::default()));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        let mut glyphs = Vec::new();
        let mut ascent = 0.0f32;
        let mut descent = 0.0f32;
        if let Some(line) = layout.lines().next() {
            let m = line.metrics();
            ascent = m.ascent;
            descent = m.descent;
            let baseline = m.baseline;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                for g in run.glyphs() {
                    glyphs.push(ShapedGlyph {
                        id: g.id,
                        x: g.x,
                        // Layout coords place glyphs below the layout top;
                        // rebase on the line's baseline so callers position
                        // text by baseline alone.
                        y: g.y - baseline,
                        advance: g.advance,
                    });
                }
            }
        }
        let width = glyphs
            .iter()
            .map(|g| g.x + g.advance)
            .fold(0.0f32, f32::max);

        Ok(ShapedLine {
            glyphs,
            width,
            ascent,
            descent,
            font_size: size_px,
            font_bytes,
        })
    }

    /// Measure one line's advance width, including manual letter spacing.
    pub fn measure_line(
        &mut self,
        text: &str,
        spec: &FontSpec,
        size_px: f32,
        letter_spacing: f32,
    ) -> PlacardResult<f32> {
        let mut line = self.shape_line(text, spec, size_px)?;
        line.apply_letter_spacing(letter_spacing);
        Ok(line.width)
    }

    /// Whether `spec` resolves to a registered face and its probe layout has
    /// been shaped at least once with positive advance width.
    pub fn face_ready(&mut self, spec: &FontSpec) -> bool {
        if self.faces.is_empty() {
            return false;
        }
        let key = spec.key();
        if self.probed.contains(&key) {
            return true;
        }
        match self.shape_line(PROBE_TEXT, spec, 16.0) {
            Ok(line) if line.width > 0.0 => {
                self.probed.insert(key);
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(error = %e, family = %spec.family, "probe shaping failed");
                false
            }
        }
    }
}

/// Outcome of waiting on the readiness gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Every requested face is loaded and probed.
    Ready,
    /// The timeout elapsed first; rendering proceeds with whatever faces are
    /// available (a logged, user-invisible degradation).
    TimedOut,
}

/// Polling configuration for [`FontGate`].
#[derive(Clone, Copy, Debug)]
pub struct FontGateOpts {
    /// Delay between readiness polls.
    pub poll_interval: Duration,
    /// Hard ceiling on total wait time.
    pub timeout: Duration,
}

impl Default for FontGateOpts {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Asynchronous barrier: resolves once every requested face is loaded and a
/// probe render has executed, or after a hard timeout.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontGate {
    opts: FontGateOpts,
}

impl FontGate {
    /// Gate with the given polling options.
    pub fn new(opts: FontGateOpts) -> Self {
        Self { opts }
    }

    /// Block until every spec is ready or the timeout elapses.
    ///
    /// On timeout the caller proceeds anyway rather than blocking forever,
    /// accepting a rare font-fallback risk.
    pub fn wait_ready(&self, fonts: &mut FontLibrary, specs: &[FontSpec]) -> GateOutcome {
        let deadline = Instant::now() + self.opts.timeout;
        loop {
            if specs.iter().all(|s| fonts.face_ready(s)) {
                return GateOutcome::Ready;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    specs = specs.len(),
                    "font gate timed out; proceeding with available faces"
                );
                return GateOutcome::TimedOut;
            }
            std::thread::sleep(self.opts.poll_interval);
        }
    }
}
