use kurbo::{BezPath, Ellipse, Rect, RoundedRect, Shape as _};

use crate::model::field::FieldShape;

/// Fixed corner radius for `FieldShape::Rounded`, in canvas pixels.
pub(crate) const ROUNDED_CORNER_RADIUS: f64 = 12.0;

const PATH_TOLERANCE: f64 = 0.1;

/// Build the clip path for a field shape over a pixel rect.
///
/// Circle always clips to the ellipse inscribed in the rect, whatever the
/// rect's aspect ratio. Rounded caps its radius at half the smaller side so
/// degenerate rects still produce a valid path.
pub(crate) fn clip_path(shape: FieldShape, rect: Rect) -> BezPath {
    match shape {
        FieldShape::Rectangle => rect.to_path(PATH_TOLERANCE),
        FieldShape::Rounded => {
            let radius = ROUNDED_CORNER_RADIUS.min(rect.width().min(rect.height()) / 2.0);
            RoundedRect::from_rect(rect, radius).to_path(PATH_TOLERANCE)
        }
        FieldShape::Circle => Ellipse::new(
            rect.center(),
            (rect.width() / 2.0, rect.height() / 2.0),
            0.0,
        )
        .to_path(PATH_TOLERANCE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape as _;

    #[test]
    fn circle_path_stays_inside_rect() {
        let rect = Rect::new(10.0, 10.0, 110.0, 60.0);
        let path = clip_path(FieldShape::Circle, rect);
        let bbox = path.bounding_box();
        assert!(bbox.x0 >= rect.x0 - 0.5 && bbox.x1 <= rect.x1 + 0.5);
        assert!(bbox.y0 >= rect.y0 - 0.5 && bbox.y1 <= rect.y1 + 0.5);
    }

    #[test]
    fn rounded_radius_caps_at_half_min_side() {
        // 10px-tall rect: radius must shrink to 5, keeping the path valid.
        let rect = Rect::new(0.0, 0.0, 200.0, 10.0);
        let path = clip_path(FieldShape::Rounded, rect);
        let bbox = path.bounding_box();
        assert!((bbox.width() - 200.0).abs() < 0.5);
        assert!((bbox.height() - 10.0).abs() < 0.5);
    }

    #[test]
    fn rectangle_path_matches_rect() {
        let rect = Rect::new(5.0, 6.0, 25.0, 30.0);
        let bbox = clip_path(FieldShape::Rectangle, rect).bounding_box();
        assert_eq!(bbox, rect);
    }
}
