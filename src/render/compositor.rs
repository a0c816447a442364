//! The compositor: draws template, fields, and watermark into a final frame.

use std::sync::Arc;

use kurbo::{Affine, Rect};

use crate::foundation::core::{Canvas, Rgba8, parse_hex_color_or};
use crate::foundation::error::{PlacardError, PlacardResult};
use crate::fonts::{FontLibrary, FontSpec};
use crate::model::field::{Field, FieldKind, PctRect, TextAlign, normalize};
use crate::model::project::SubmissionValues;
use crate::render::assets::PreparedImage;
use crate::render::backend::FrameRGBA;
use crate::render::blur::blur_rgba8_premul;
use crate::render::shape::clip_path;
use crate::render::text::fit_text_to_width;

/// Label composited bottom-right when the watermark flag is set.
pub const WATERMARK_TEXT: &str = "placard";

const WATERMARK_MARGIN_PX: f64 = 10.0;
const WATERMARK_ALPHA: f64 = 0.3;
/// Fixed interior inset between border and text, in pixels.
const TEXT_INSET_PX: f64 = 4.0;
/// Reference canvas height for scaling point sizes to template resolution.
const FONT_SCALE_REF_HEIGHT: f64 = 600.0;
/// Floor for rendered text sizes so small templates stay legible.
const MIN_RENDERED_FONT_PX: f64 = 12.0;
/// Fixed shadow offset in pixels.
const SHADOW_OFFSET: (f64, f64) = (0.0, 2.0);

/// Pure compositor: (template image, ordered field list, submitted values,
/// watermark flag) → final bitmap.
///
/// The canvas is sized exactly to the template's native pixel dimensions and
/// field percentages resolve against it, never against an on-screen display
/// size — this is what makes the exported bitmap independent of the editor
/// viewport. Each invocation is a fresh, independent render; nothing is
/// cached or retried.
pub struct Compositor<'a> {
    fonts: &'a mut FontLibrary,
}

impl<'a> Compositor<'a> {
    /// Compositor borrowing a font library for shaping.
    ///
    /// Callers are expected to have waited on [`crate::FontGate`] first;
    /// shaping against unloaded faces degrades to fallback faces.
    pub fn new(fonts: &'a mut FontLibrary) -> Self {
        Self { fonts }
    }

    /// Composite one card.
    ///
    /// Fields paint in ascending `z_index` order (ties by list position).
    /// Resource failures abort the whole render — no partial bitmap is ever
    /// returned.
    pub fn render(
        &mut self,
        template: &PreparedImage,
        fields: &[Field],
        values: &SubmissionValues,
        watermark: bool,
    ) -> PlacardResult<FrameRGBA> {
        let canvas = Canvas {
            width: template.width,
            height: template.height,
        };
        let (w16, h16) = raster_dims(canvas)?;

        let mut ctx = vello_cpu::RenderContext::new(w16, h16);

        // Template background fills the whole canvas at native size.
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(image_paint(template)?);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(canvas.width),
            f64::from(canvas.height),
        ));

        let mut order: Vec<&Field> = fields.iter().collect();
        order.sort_by_key(|f| f.z_index);
        for field in order {
            self.draw_field(&mut ctx, canvas, field, values)?;
        }

        if watermark {
            self.draw_watermark(&mut ctx, canvas);
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_field(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        field: &Field,
        values: &SubmissionValues,
    ) -> PlacardResult<()> {
        // Persisted fields may predate newer clamping rules; renormalizing
        // here keeps the renderer total.
        let field = normalize(field.clone());
        let rect = pixel_rect(&field.rect, canvas);
        let path = clip_path(field.shape, rect);
        let cpu_path = bezpath_to_cpu(&path);
        let tr = Affine::rotate_about(field.style.rotation_deg.to_radians(), rect.center());

        ctx.set_transform(affine_to_cpu(tr));
        let opacity = field.style.opacity as f32;
        let layered = opacity < 1.0;
        if layered {
            ctx.push_opacity_layer(opacity);
        }

        if field.style.shadow.enabled && field.style.shadow.blur > 0.0 {
            self.draw_shadow(ctx, &path, rect, &field, tr)?;
            ctx.set_transform(affine_to_cpu(tr));
        }

        match field.kind {
            FieldKind::Photo => {
                if let Some(photo) = &values.photo {
                    ctx.push_clip_layer(&cpu_path);
                    let placement = cover_fit(photo.aspect(), rect);
                    let img_tr = tr
                        * Affine::translate((placement.x0, placement.y0))
                        * Affine::scale_non_uniform(
                            placement.width() / f64::from(photo.width),
                            placement.height() / f64::from(photo.height),
                        );
                    ctx.set_transform(affine_to_cpu(img_tr));
                    ctx.set_paint(image_paint(photo)?);
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                        0.0,
                        0.0,
                        f64::from(photo.width),
                        f64::from(photo.height),
                    ));
                    ctx.pop_layer();
                    ctx.set_transform(affine_to_cpu(tr));
                }
                stroke_border(ctx, &field, &cpu_path);
            }
            FieldKind::Text => {
                if field.style.background_opacity > 0.0 {
                    let bg = parse_hex_color_or(&field.style.background_color, Rgba8::WHITE)
                        .with_alpha_factor(field.style.background_opacity);
                    ctx.set_paint(paint_color(bg));
                    ctx.fill_path(&cpu_path);
                }
                stroke_border(ctx, &field, &cpu_path);
                if let Some(raw) = values.text(&field.name) {
                    let raw = raw.to_string();
                    self.draw_text(ctx, canvas, &field, rect, &cpu_path, tr, &raw)?;
                }
            }
        }

        if layered {
            ctx.pop_layer();
        }
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        field: &Field,
        rect: Rect,
        cpu_path: &vello_cpu::kurbo::BezPath,
        tr: Affine,
        raw: &str,
    ) -> PlacardResult<()> {
        if self.fonts.is_empty() {
            tracing::warn!(field = %field.name, "no fonts registered, skipping text field");
            return Ok(());
        }

        let spec = FontSpec {
            family: field.text.font_family.clone(),
            weight: field.text.font_weight,
            italic: field.text.italic,
        };
        let size_px = (field.text.font_size_pt * f64::from(canvas.height)
            / FONT_SCALE_REF_HEIGHT)
            .max(MIN_RENDERED_FONT_PX) as f32;
        let border = if field.style.border_enabled {
            field.style.border_width
        } else {
            0.0
        };
        let padding = border + TEXT_INSET_PX;
        let avail = (rect.width() - 2.0 * padding) as f32;
        if avail <= 0.0 {
            return Ok(());
        }

        let spacing = field.text.letter_spacing as f32;
        let fonts = &mut *self.fonts;
        let fitted = fit_text_to_width(raw, avail, &mut |s| {
            fonts
                .measure_line(s, &spec, size_px, spacing)
                .unwrap_or(f32::INFINITY)
        });
        if fitted.is_empty() {
            return Ok(());
        }

        let mut line = self.fonts.shape_line(&fitted, &spec, size_px)?;
        line.apply_letter_spacing(spacing);

        let anchor_x = match field.text.align {
            TextAlign::Left => rect.x0 + padding,
            TextAlign::Center => rect.center().x - f64::from(line.width) / 2.0,
            TextAlign::Right => rect.x1 - padding - f64::from(line.width),
        };
        // Center the line box (font size × line height) in the rect; glyphs
        // are baseline-relative, so anchor by baseline.
        let line_box = f64::from(line.font_size) * field.text.line_height;
        let box_top = rect.center().y - line_box / 2.0;
        let baseline_y = box_top + (line_box + f64::from(line.ascent - line.descent)) / 2.0;

        let color = parse_hex_color_or(&field.text.color, Rgba8::BLACK);
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(line.font_bytes.to_vec()),
            0,
        );

        ctx.push_clip_layer(cpu_path);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(paint_color(color));
        ctx.set_transform(affine_to_cpu(tr * Affine::translate((anchor_x, baseline_y))));
        let glyphs = line.glyphs.iter().map(|g| vello_cpu::Glyph {
            id: g.id,
            x: g.x,
            y: g.y,
        });
        ctx.glyph_run(&font)
            .font_size(line.font_size)
            .fill_glyphs(glyphs);
        ctx.set_transform(affine_to_cpu(tr));
        ctx.pop_layer();
        Ok(())
    }

    fn draw_shadow(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        path: &kurbo::BezPath,
        rect: Rect,
        field: &Field,
        tr: Affine,
    ) -> PlacardResult<()> {
        let radius = (field.style.shadow.blur.ceil() as u32).clamp(1, 64);
        let sigma = (field.style.shadow.blur / 2.0).max(0.5) as f32;
        let pad = f64::from(radius) + 1.0;

        let local_w = (rect.width() + 2.0 * pad).ceil() as u32;
        let local_h = (rect.height() + 2.0 * pad).ceil() as u32;
        let (w16, h16) = raster_dims(Canvas {
            width: local_w,
            height: local_h,
        })?;

        // Rasterize the silhouette in field-local space, blur it, then place
        // it beneath the field's own fill/stroke. Siblings never see it.
        let mut local_path = path.clone();
        local_path.apply_affine(Affine::translate((pad - rect.x0, pad - rect.y0)));
        let color = parse_hex_color_or(&field.style.shadow.color, Rgba8::BLACK);

        let mut scratch = vello_cpu::RenderContext::new(w16, h16);
        scratch.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        scratch.set_paint(paint_color(color));
        scratch.fill_path(&bezpath_to_cpu(&local_path));
        scratch.flush();
        let mut silhouette = vello_cpu::Pixmap::new(w16, h16);
        scratch.render_to_pixmap(&mut silhouette);

        let blurred = blur_rgba8_premul(
            silhouette.data_as_u8_slice(),
            local_w,
            local_h,
            radius,
            sigma,
        )?;
        let img = premul_bytes_to_paint(&blurred, local_w, local_h)?;

        let place = tr * Affine::translate((
            rect.x0 - pad + SHADOW_OFFSET.0,
            rect.y0 - pad + SHADOW_OFFSET.1,
        ));
        ctx.set_transform(affine_to_cpu(place));
        ctx.set_paint(img);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(local_w),
            f64::from(local_h),
        ));
        Ok(())
    }

    /// Fixed translucent label anchored to the canvas bottom-right corner,
    /// unaffected by any field transform. Falls back to a plain badge when no
    /// face is registered (logged degradation) so the mark is never silently
    /// absent.
    fn draw_watermark(&mut self, ctx: &mut vello_cpu::RenderContext, canvas: Canvas) {
        let scale = f64::from(canvas.height) / FONT_SCALE_REF_HEIGHT;
        let size_px = (16.0 * scale).max(MIN_RENDERED_FONT_PX) as f32;
        let color = Rgba8::BLACK.with_alpha_factor(WATERMARK_ALPHA);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let spec = FontSpec {
            family: crate::model::field::DEFAULT_FONT_FAMILY.to_string(),
            weight: 700,
            italic: false,
        };
        let shaped = if self.fonts.is_empty() {
            None
        } else {
            self.fonts.shape_line(WATERMARK_TEXT, &spec, size_px).ok()
        };

        match shaped {
            Some(line) if !line.glyphs.is_empty() => {
                let anchor_x =
                    f64::from(canvas.width) - WATERMARK_MARGIN_PX - f64::from(line.width);
                // Bottom-anchored: the em box bottom sits on the margin line.
                let baseline_y =
                    f64::from(canvas.height) - WATERMARK_MARGIN_PX - f64::from(line.descent);
                let font = vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(line.font_bytes.to_vec()),
                    0,
                );
                ctx.set_transform(affine_to_cpu(Affine::translate((anchor_x, baseline_y))));
                ctx.set_paint(paint_color(color));
                let glyphs = line.glyphs.iter().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(line.font_size)
                    .fill_glyphs(glyphs);
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            }
            _ => {
                tracing::warn!("no watermark face available, drawing badge fallback");
                let h = f64::from(size_px) * 1.25;
                let w = f64::from(size_px) * 4.0;
                let x1 = f64::from(canvas.width) - WATERMARK_MARGIN_PX;
                let y1 = f64::from(canvas.height) - WATERMARK_MARGIN_PX;
                let badge = kurbo::RoundedRect::new(x1 - w, y1 - h, x1, y1, h / 4.0);
                let mut path = kurbo::BezPath::new();
                for el in kurbo::Shape::path_elements(&badge, 0.1) {
                    path.push(el);
                }
                ctx.set_paint(paint_color(color));
                ctx.fill_path(&bezpath_to_cpu(&path));
            }
        }
    }
}

/// Resolve a percentage rect against the canvas's native pixel size.
pub(crate) fn pixel_rect(rect: &PctRect, canvas: Canvas) -> Rect {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let x0 = rect.x / 100.0 * w;
    let y0 = rect.y / 100.0 * h;
    Rect::new(
        x0,
        y0,
        x0 + rect.width / 100.0 * w,
        y0 + rect.height / 100.0 * h,
    )
}

/// Cover-fit placement: the returned rect fully covers `rect`, preserving
/// the image aspect ratio and centering the overflow.
pub(crate) fn cover_fit(image_aspect: f64, rect: Rect) -> Rect {
    let rect_aspect = rect.width() / rect.height();
    if image_aspect > rect_aspect {
        // Image is wider: fit height, center horizontally.
        let draw_h = rect.height();
        let draw_w = draw_h * image_aspect;
        let x0 = rect.x0 - (draw_w - rect.width()) / 2.0;
        Rect::new(x0, rect.y0, x0 + draw_w, rect.y0 + draw_h)
    } else {
        // Image is taller: fit width, center vertically.
        let draw_w = rect.width();
        let draw_h = draw_w / image_aspect;
        let y0 = rect.y0 - (draw_h - rect.height()) / 2.0;
        Rect::new(rect.x0, y0, rect.x0 + draw_w, y0 + draw_h)
    }
}

fn stroke_border(
    ctx: &mut vello_cpu::RenderContext,
    field: &Field,
    cpu_path: &vello_cpu::kurbo::BezPath,
) {
    if !field.style.border_enabled || field.style.border_width <= 0.0 {
        return;
    }
    let color = parse_hex_color_or(&field.style.border_color, Rgba8::BLACK);
    ctx.set_paint(paint_color(color));
    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(field.style.border_width));
    ctx.stroke_path(cpu_path);
}

fn raster_dims(canvas: Canvas) -> PlacardResult<(u16, u16)> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(PlacardError::render("canvas dimensions must be non-zero"));
    }
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| PlacardError::render("canvas width exceeds raster backend limit"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| PlacardError::render("canvas height exceeds raster backend limit"))?;
    Ok((w, h))
}

fn paint_color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> PlacardResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| PlacardError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| PlacardError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(PlacardError::render("pixmap byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

fn premul_bytes_to_paint(bytes: &[u8], width: u32, height: u32) -> PlacardResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn image_paint(image: &PreparedImage) -> PlacardResult<vello_cpu::Image> {
    premul_bytes_to_paint(&image.rgba8_premul, image.width, image.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_rect_resolves_against_native_size() {
        let canvas = Canvas {
            width: 800,
            height: 600,
        };
        let r = pixel_rect(&PctRect::new(50.0, 50.0, 20.0, 20.0), canvas);
        assert_eq!(r, Rect::new(400.0, 300.0, 560.0, 420.0));
    }

    #[test]
    fn cover_fit_wide_image_fits_height() {
        let rect = Rect::new(100.0, 100.0, 200.0, 200.0);
        let out = cover_fit(2.0, rect);
        assert_eq!(out.height(), rect.height());
        assert_eq!(out.width(), 200.0);
        // Centered horizontally.
        assert_eq!(out.x0, 50.0);
        assert_eq!(out.y0, rect.y0);
    }

    #[test]
    fn cover_fit_tall_image_fits_width() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let out = cover_fit(0.5, rect);
        assert_eq!(out.width(), rect.width());
        assert_eq!(out.height(), 200.0);
        assert_eq!(out.y0, -50.0);
    }

    #[test]
    fn cover_fit_always_covers() {
        let rect = Rect::new(10.0, 20.0, 110.0, 70.0);
        for aspect in [0.1, 0.5, 1.0, 2.0, 10.0] {
            let out = cover_fit(aspect, rect);
            assert!(out.x0 <= rect.x0 + 1e-9 && out.x1 >= rect.x1 - 1e-9);
            assert!(out.y0 <= rect.y0 + 1e-9 && out.y1 >= rect.y1 - 1e-9);
        }
    }

    #[test]
    fn raster_dims_rejects_degenerate_and_oversized() {
        assert!(raster_dims(Canvas {
            width: 0,
            height: 10
        })
        .is_err());
        assert!(raster_dims(Canvas {
            width: 100_000,
            height: 10
        })
        .is_err());
        assert_eq!(
            raster_dims(Canvas {
                width: 640,
                height: 480
            })
            .unwrap(),
            (640, 480)
        );
    }
}
