use serde::{Deserialize, Serialize};

use crate::config::CoordinateCorrection;

/// Size of the destination canvas, e.g. the screen the overlay is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl CanvasSize {
    /// Canvas of the given pixel dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    /// Copy with negative or non-finite sides replaced by zero.
    pub fn sanitized(self) -> Self {
        let side = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            width: side(self.width),
            height: side(self.height),
        }
    }
}

impl From<kornia_image::ImageSize> for CanvasSize {
    fn from(size: kornia_image::ImageSize) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Maps normalized `(cx, cy, w, h)` boxes onto a destination canvas.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    canvas: CanvasSize,
    correction: CoordinateCorrection,
}

impl CoordinateMapper {
    /// Create a mapper for `canvas` with the given manual corrections.
    ///
    /// A canvas side that is negative or not finite is treated as zero.
    pub fn new(canvas: CanvasSize, correction: CoordinateCorrection) -> Self {
        Self {
            canvas: canvas.sanitized(),
            correction,
        }
    }

    /// The destination canvas.
    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Map a normalized box to `[x1, y1, x2, y2]` canvas corners.
    ///
    /// Steps run in a fixed order: scale to the canvas, flip the center,
    /// apply the correction scale, then the offset, then clamp the corners.
    pub fn map(&self, normalized: [f32; 4]) -> [f32; 4] {
        let CanvasSize { width, height } = self.canvas;
        let c = &self.correction;
        let [cx, cy, w, h] = normalized;

        let mut center_x = cx * width;
        let mut center_y = cy * height;
        let mut box_w = w * width;
        let mut box_h = h * height;

        if c.flip_x {
            center_x = width - center_x;
        }
        if c.flip_y {
            center_y = height - center_y;
        }

        center_x *= c.scale_x;
        box_w *= c.scale_x;
        center_y *= c.scale_y;
        box_h *= c.scale_y;

        center_x += c.offset_x;
        center_y += c.offset_y;

        let (x1, x2) = ordered(center_x - box_w / 2.0, center_x + box_w / 2.0);
        let (y1, y2) = ordered(center_y - box_h / 2.0, center_y + box_h / 2.0);

        [
            x1.clamp(0.0, width),
            y1.clamp(0.0, height),
            x2.clamp(0.0, width),
            y2.clamp(0.0, height),
        ]
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(width: usize, height: usize) -> CoordinateMapper {
        CoordinateMapper::new(
            CanvasSize::new(width, height),
            CoordinateCorrection::default(),
        )
    }

    #[test]
    fn test_identity_mapping_scales_exactly() {
        let mapper = identity(1000, 500);
        let [x1, y1, x2, y2] = mapper.map([0.5, 0.5, 0.25, 0.5]);
        assert_eq!([x1, y1, x2, y2], [375.0, 125.0, 625.0, 375.0]);
        assert_eq!((x1 + x2) / 2.0, 500.0);
        assert_eq!(x2 - x1, 250.0);
        assert_eq!(y2 - y1, 250.0);
    }

    #[test]
    fn test_flip_mirrors_center_about_canvas() {
        let correction = CoordinateCorrection {
            flip_x: true,
            ..Default::default()
        };
        let mapper = CoordinateMapper::new(CanvasSize::new(1000, 1000), correction);
        let [x1, _, x2, _] = mapper.map([0.1, 0.5, 0.02, 0.02]);
        assert!(((x1 + x2) / 2.0 - 900.0).abs() < 1e-3);

        let correction = CoordinateCorrection {
            flip_y: true,
            ..Default::default()
        };
        let mapper = CoordinateMapper::new(CanvasSize::new(1000, 1000), correction);
        let [_, y1, _, y2] = mapper.map([0.5, 0.25, 0.1, 0.1]);
        assert_eq!((y1 + y2) / 2.0, 750.0);
    }

    #[test]
    fn test_scale_applies_before_offset() {
        let correction = CoordinateCorrection {
            scale_x: 2.0,
            offset_x: -100.0,
            scale_y: 0.5,
            offset_y: 30.0,
            ..Default::default()
        };
        let mapper = CoordinateMapper::new(CanvasSize::new(1000, 1000), correction);
        // x: center 200 -> 400 -> 300, width 100 -> 200
        // y: center 500 -> 250 -> 280, height 100 -> 50
        let [x1, y1, x2, y2] = mapper.map([0.2, 0.5, 0.1, 0.1]);
        assert_eq!([x1, x2], [200.0, 400.0]);
        assert_eq!([y1, y2], [255.0, 305.0]);
    }

    #[test]
    fn test_invalid_canvas_collapses_to_zero() {
        let canvas = CanvasSize {
            width: -640.0,
            height: f32::NAN,
        };
        let mapper = CoordinateMapper::new(canvas, CoordinateCorrection::default());
        assert_eq!(
            mapper.canvas(),
            CanvasSize {
                width: 0.0,
                height: 0.0
            }
        );
        assert_eq!(mapper.map([0.5, 0.5, 0.2, 0.2]), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_corners_are_clamped_to_canvas() {
        let mapper = identity(640, 480);
        let [x1, y1, x2, y2] = mapper.map([0.95, 0.02, 0.3, 0.2]);
        assert_eq!(x2, 640.0);
        assert_eq!(y1, 0.0);
        assert!(x1 <= x2 && y1 <= y2);

        let correction = CoordinateCorrection {
            offset_x: 5000.0,
            ..Default::default()
        };
        let mapper = CoordinateMapper::new(CanvasSize::new(640, 480), correction);
        let [x1, _, x2, _] = mapper.map([0.5, 0.5, 0.1, 0.1]);
        assert_eq!([x1, x2], [640.0, 640.0]);
    }

    #[test]
    fn test_negative_extent_keeps_corner_order() {
        let mapper = identity(100, 100);
        let [x1, y1, x2, y2] = mapper.map([0.5, 0.5, -0.2, 0.2]);
        assert_eq!([x1, y1, x2, y2], [40.0, 40.0, 60.0, 60.0]);
    }
}
