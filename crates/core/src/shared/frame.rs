use ndarray::{ArrayView3, Axis};

/// Clockwise rotation that brings the sensor buffer upright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Snaps an arbitrary angle to the nearest quarter turn.
    pub fn from_degrees(angle: i32) -> Self {
        match angle.rem_euclid(360) {
            45..=134 => Rotation::Deg90,
            135..=224 => Rotation::Deg180,
            225..=315 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True for 90 and 270, where the upright view swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// A single camera frame: contiguous RGB bytes in row-major sensor order.
///
/// `rotation` and `mirrored` describe how the buffer maps onto what the
/// user sees; the pixel data itself is never rotated in place.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    rotation: Rotation,
    mirrored: bool,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            rotation: Rotation::Deg0,
            mirrored: false,
        }
    }

    pub fn with_orientation(mut self, rotation: Rotation, mirrored: bool) -> Self {
        self.rotation = rotation;
        self.mirrored = mirrored;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    /// Width and height of the frame once rotated upright.
    pub fn upright_dimensions(&self) -> (u32, u32) {
        if self.rotation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Returns a copy with the pixel data rotated upright (`rotation` becomes 0).
    ///
    /// Mirroring is preserved as a flag: detection and saved captures use
    /// sensor orientation, only the preview is mirrored.
    pub fn upright(&self) -> Frame {
        if self.rotation == Rotation::Deg0 {
            return self.clone();
        }

        let mut view = self.as_ndarray();
        match self.rotation {
            Rotation::Deg0 => {}
            Rotation::Deg90 => {
                view = view.permuted_axes([1, 0, 2]);
                view.invert_axis(Axis(1));
            }
            Rotation::Deg180 => {
                view.invert_axis(Axis(0));
                view.invert_axis(Axis(1));
            }
            Rotation::Deg270 => {
                view = view.permuted_axes([1, 0, 2]);
                view.invert_axis(Axis(0));
            }
        }

        let (width, height) = self.upright_dimensions();
        let data: Vec<u8> = view.iter().copied().collect();
        Frame::new(data, width, height, self.channels, self.index)
            .with_orientation(Rotation::Deg0, self.mirrored)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
