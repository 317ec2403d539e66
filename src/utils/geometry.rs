/// Row alignment, in pixels, required for DispmanX resource pitches.
pub const PITCH_ALIGNMENT: u32 = 16;

/// Rounds `x` up to the next multiple of 16.
pub fn align_to_16(x: u32) -> u32 {
    (x + (PITCH_ALIGNMENT - 1)) & !(PITCH_ALIGNMENT - 1)
}

/// Pixel dimensions of a display output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bytes per row, padded to a 16 pixel boundary.
    pub fn pitch(self, bytes_per_pixel: u32) -> u32 {
        bytes_per_pixel * align_to_16(self.width)
    }

    pub fn buffer_len(self, bytes_per_pixel: u32) -> usize {
        self.pitch(bytes_per_pixel) as usize * self.height as usize
    }

    /// Rectangle covering the whole geometry in pixel units.
    pub fn rect(self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Layout-compatible with `VC_RECT_T`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts to the 16.16 fixed point form DispmanX expects for source rectangles.
    pub fn to_fixed_point(self) -> Self {
        Self {
            x: self.x << 16,
            y: self.y << 16,
            width: self.width << 16,
            height: self.height << 16,
        }
    }
}

impl From<Geometry> for Rect {
    fn from(geometry: Geometry) -> Self {
        geometry.rect()
    }
}
