/// Axis-aligned rectangle in pixel coordinates.
///
/// `x`/`y` are the top-left corner. Width and height are non-negative for
/// boxes produced by [`BoundingBox::from_corners`]; degenerate boxes have
/// zero area and never overlap anything.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from `[x1, y1, x2, y2]` corners, rounding to pixels.
    pub fn from_corners(corners: [f64; 4]) -> Self {
        let x1 = corners[0].min(corners[2]).round() as i32;
        let y1 = corners[1].min(corners[3]).round() as i32;
        let x2 = corners[0].max(corners[2]).round() as i32;
        let y2 = corners[1].max(corners[3]).round() as i32;
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn corners(&self) -> [f64; 4] {
        [
            self.x as f64,
            self.y as f64,
            (self.x + self.width) as f64,
            (self.y + self.height) as f64,
        ]
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersects the box with a `frame_w` x `frame_h` frame.
    ///
    /// Returns `None` when nothing of the box is visible.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<BoundingBox> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(frame_w as i32);
        let y2 = self.bottom().min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let union = self.area() as f64 + other.area() as f64 - inter;
        inter / union
    }
}
