//! One-way conversion of legacy absolute-pixel field records into the
//! normalized percentage model.
//!
//! Early deployments stored field rects in editor pixels. The true editor
//! viewport of those records is not recoverable, so migration assumes the
//! historical 800×600 reference canvas. This is a best-effort heuristic and
//! is deliberately kept verbatim; it runs transparently on load and nothing
//! is written back until the operator explicitly re-saves.

use crate::model::field::{Field, PctRect, normalize};

/// Historical reference canvas width in pixels.
pub const LEGACY_REF_WIDTH: f64 = 800.0;
/// Historical reference canvas height in pixels.
pub const LEGACY_REF_HEIGHT: f64 = 600.0;

/// A rect is legacy/pixel-format when any component exceeds 100.
pub fn is_legacy_rect(rect: &PctRect) -> bool {
    rect.x > 100.0 || rect.y > 100.0 || rect.width > 100.0 || rect.height > 100.0
}

/// Convert a legacy pixel rect to percentages of the reference canvas.
///
/// Positions cap at 90% so migrated fields stay visible; sizes clamp to
/// [5, 50]%.
pub fn migrate_legacy_rect(rect: PctRect) -> PctRect {
    PctRect {
        x: (rect.x / LEGACY_REF_WIDTH * 100.0).min(90.0),
        y: (rect.y / LEGACY_REF_HEIGHT * 100.0).min(90.0),
        width: (rect.width / LEGACY_REF_WIDTH * 100.0).clamp(5.0, 50.0),
        height: (rect.height / LEGACY_REF_HEIGHT * 100.0).clamp(5.0, 50.0),
    }
}

/// Migrate a field if its rect is legacy, then normalize either way.
pub fn migrate_field(field: Field) -> Field {
    let field = if is_legacy_rect(&field.rect) {
        tracing::debug!(id = %field.id, "migrating legacy pixel-format field");
        Field {
            rect: migrate_legacy_rect(field.rect),
            ..field
        }
    } else {
        field
    };
    normalize(field)
}
