/// Axis-aligned box in source-frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(origin_x: i32, origin_y: i32, width: i32, height: i32) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// Builds a box from corner coordinates, rounding to whole pixels.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let left = x1.round() as i32;
        let top = y1.round() as i32;
        Self {
            origin_x: left,
            origin_y: top,
            width: x2.round() as i32 - left,
            height: y2.round() as i32 - top,
        }
    }

    /// True when the box covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i64 {
        self.origin_x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.origin_y as i64 + self.height as i64
    }

    /// True when every edge lies inside a `frame_width` x `frame_height` frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.origin_x >= 0
            && self.origin_y >= 0
            && self.right() <= frame_width as i64
            && self.bottom() <= frame_height as i64
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "x={}, y={}, w={}, h={}",
            self.origin_x, self.origin_y, self.width, self.height
        )
    }
}
