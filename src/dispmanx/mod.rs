//! Typed access to the VideoCore DispmanX compositor.
//!
//! `DisplayBackend` mirrors the handful of `vc_dispmanx_*` calls the mirror
//! needs. Every call is synchronous. Handles are plain integers owned by the
//! firmware; zero is never a valid handle and is reported as an error at the
//! boundary, so a handle value in hand is always live.

#[cfg(bcm_host)]
mod ffi;
mod host;

#[cfg(test)]
pub mod fake;

pub use host::BcmHost;

use crate::error::Result;
use crate::utils::{Geometry, Rect};

macro_rules! handle {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u32);
    };
}

handle!(DisplayHandle);
handle!(ResourceHandle);
handle!(ElementHandle);
handle!(UpdateHandle);

/// Update priority used when creating or removing the element.
pub const SETUP_PRIORITY: i32 = 0;
/// Update priority used for the per-frame source flip.
pub const FRAME_PRIORITY: i32 = 10;
/// Layer the mirrored element is placed on.
pub const ELEMENT_LAYER: i32 = 10;

/// `VC_IMAGE_TYPE_T` values used by the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ImageType {
    Rgba32 = 15,
}

impl ImageType {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            ImageType::Rgba32 => 4,
        }
    }
}

/// Per-element alpha. Only fixed opacity applied to every pixel is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alpha {
    pub opacity: u8,
}

impl Alpha {
    pub const OPAQUE: Alpha = Alpha { opacity: 255 };
}

/// Everything `vc_dispmanx_element_add` needs besides the update handle.
#[derive(Debug, Clone, Copy)]
pub struct ElementSpec {
    pub display: DisplayHandle,
    pub layer: i32,
    /// Placement on screen, in pixels.
    pub dest_rect: Rect,
    pub source: ResourceHandle,
    /// Region of the source resource, in 16.16 fixed point.
    pub source_rect: Rect,
    pub alpha: Alpha,
}

pub trait DisplayBackend {
    fn display_open(&self, device: u32) -> Result<DisplayHandle>;
    fn display_info(&self, display: DisplayHandle) -> Result<Geometry>;
    fn display_close(&self, display: DisplayHandle) -> Result<()>;

    fn resource_create(&self, image_type: ImageType, geometry: Geometry) -> Result<ResourceHandle>;
    fn resource_delete(&self, resource: ResourceHandle) -> Result<()>;
    fn resource_read_data(
        &self,
        resource: ResourceHandle,
        rect: &Rect,
        dst: &mut [u8],
        pitch: u32,
    ) -> Result<()>;
    fn resource_write_data(
        &self,
        resource: ResourceHandle,
        image_type: ImageType,
        pitch: u32,
        src: &[u8],
        rect: &Rect,
    ) -> Result<()>;

    /// Copies the composited output of `display` into `resource`, unrotated.
    fn snapshot(&self, display: DisplayHandle, resource: ResourceHandle) -> Result<()>;

    fn update_start(&self, priority: i32) -> Result<UpdateHandle>;
    fn element_add(&self, update: UpdateHandle, spec: &ElementSpec) -> Result<ElementHandle>;
    fn element_change_source(
        &self,
        update: UpdateHandle,
        element: ElementHandle,
        source: ResourceHandle,
    ) -> Result<()>;
    fn element_remove(&self, update: UpdateHandle, element: ElementHandle) -> Result<()>;
    /// Submits `update` and blocks until the compositor has applied it.
    fn update_submit_sync(&self, update: UpdateHandle) -> Result<()>;
}

/// Bytes `rect` occupies in a buffer laid out with `pitch`.
#[cfg_attr(not(bcm_host), allow(dead_code))]
pub(crate) fn required_len(rect: &Rect, pitch: u32) -> usize {
    pitch as usize * rect.height.max(0) as usize
}
