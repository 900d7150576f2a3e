/// Axis-aligned face bounding box in upright frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl FaceBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    /// Clips the box to `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: u32, height: u32) -> FaceBox {
        let w = width as f64;
        let h = height as f64;
        FaceBox {
            left: self.left.clamp(0.0, w),
            top: self.top.clamp(0.0, h),
            right: self.right.clamp(0.0, w),
            bottom: self.bottom.clamp(0.0, h),
        }
    }

    pub fn iou(&self, other: &FaceBox) -> f64 {
        let ix1 = self.left.max(other.left);
        let iy1 = self.top.max(other.top);
        let ix2 = self.right.min(other.right);
        let iy2 = self.bottom.min(other.bottom);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
    }

    /// The face with the largest area. Ties keep the first one encountered.
    /// Boxes with non-finite edges are skipped.
    pub fn largest(faces: &[FaceBox]) -> Option<&FaceBox> {
        faces
            .iter()
            .filter(|face| face.is_finite())
            .fold(None, |best: Option<&FaceBox>, face| match best {
                Some(b) if b.area() >= face.area() => Some(b),
                _ => Some(face),
            })
    }
}
