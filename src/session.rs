//! The pair of displays being mirrored and every DispmanX object tied to them.
//!
//! Each object is held by a guard that releases it on drop. Guards are
//! created in acquisition order and the session's fields are declared in the
//! reverse order, so an early `?` during set-up and a normal drop both
//! release exactly what was acquired, newest first.

use crate::dispmanx::{
    Alpha, DisplayBackend, DisplayHandle, ElementHandle, ElementSpec, ImageType, ResourceHandle,
    ELEMENT_LAYER, FRAME_PRIORITY, SETUP_PRIORITY,
};
use crate::error::Error;
use crate::utils::{Geometry, Rect};
use anyhow::{Context, Result};

pub const IMAGE_TYPE: ImageType = ImageType::Rgba32;

pub struct Display<'a, B: DisplayBackend> {
    backend: &'a B,
    handle: DisplayHandle,
    pub index: u32,
    pub geometry: Geometry,
}

impl<'a, B: DisplayBackend> Display<'a, B> {
    fn open(backend: &'a B, role: &str, index: u32) -> Result<Self> {
        let handle = backend
            .display_open(index)
            .with_context(|| format!("open {} display {} failed", role, index))?;
        let mut display = Self {
            backend,
            handle,
            index,
            geometry: Geometry::default(),
        };
        display.geometry = backend
            .display_info(handle)
            .with_context(|| format!("getting {} display dimensions failed", role))?;
        log::debug!("Display {} ({}) is {}", index, role, display.geometry);
        Ok(display)
    }
}

impl<B: DisplayBackend> Drop for Display<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.display_close(self.handle) {
            log::warn!("Closing display {}: {}", self.index, e);
        }
    }
}

struct Resource<'a, B: DisplayBackend> {
    backend: &'a B,
    handle: ResourceHandle,
}

impl<'a, B: DisplayBackend> Resource<'a, B> {
    fn create(backend: &'a B, role: &str, geometry: Geometry) -> Result<Self> {
        let handle = backend
            .resource_create(IMAGE_TYPE, geometry)
            .with_context(|| format!("creating {} resource failed", role))?;
        Ok(Self { backend, handle })
    }
}

impl<B: DisplayBackend> Drop for Resource<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.resource_delete(self.handle) {
            log::warn!("Deleting resource {:?}: {}", self.handle, e);
        }
    }
}

struct Element<'a, B: DisplayBackend> {
    backend: &'a B,
    handle: ElementHandle,
}

impl<'a, B: DisplayBackend> Element<'a, B> {
    fn add(backend: &'a B, spec: &ElementSpec) -> Result<Self> {
        let update = backend
            .update_start(SETUP_PRIORITY)
            .context("display update failed")?;
        let handle = match backend.element_add(update, spec) {
            Ok(handle) => handle,
            Err(e) => {
                // The update is still open and must not be left pending.
                if let Err(submit) = backend.update_submit_sync(update) {
                    log::warn!("Submitting abandoned update {:?}: {}", update, submit);
                }
                return Err(e).context("failed to create DispmanX element");
            }
        };
        let element = Self { backend, handle };
        backend
            .update_submit_sync(update)
            .context("submitting element creation failed")?;
        Ok(element)
    }

    fn remove(&self) -> crate::error::Result<()> {
        let update = self.backend.update_start(SETUP_PRIORITY)?;
        self.backend.element_remove(update, self.handle)?;
        self.backend.update_submit_sync(update)
    }
}

impl<B: DisplayBackend> Drop for Element<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            log::warn!("Removing element {:?}: {}", self.handle, e);
        }
    }
}

fn allocate_image(len: usize) -> crate::error::Result<Vec<u8>> {
    let mut image = Vec::new();
    image
        .try_reserve_exact(len)
        .map_err(|_| Error::Allocation { len })?;
    image.resize(len, 0);
    Ok(image)
}

pub struct DisplaySession<'a, B: DisplayBackend> {
    // Drop order: element, resources, displays, buffer.
    element: Element<'a, B>,
    destination_resource: Resource<'a, B>,
    source_resource: Resource<'a, B>,
    pub destination: Display<'a, B>,
    pub source: Display<'a, B>,
    image: Vec<u8>,
    pitch: u32,
    rect: Rect,
    backend: &'a B,
}

impl<'a, B: DisplayBackend> DisplaySession<'a, B> {
    /// Opens both displays and publishes an element on the destination that
    /// the mirror loop re-sources every frame.
    pub fn open(backend: &'a B, source_index: u32, destination_index: u32) -> Result<Self> {
        let source = Display::open(backend, "source", source_index)?;
        let destination = Display::open(backend, "destination", destination_index)?;

        log::info!(
            "copying from [{}] {} to [{}] {}",
            source.index,
            source.geometry,
            destination.index,
            destination.geometry
        );

        let geometry = destination.geometry;
        let bytes_per_pixel = IMAGE_TYPE.bytes_per_pixel();
        let pitch = geometry.pitch(bytes_per_pixel);
        let image = allocate_image(geometry.buffer_len(bytes_per_pixel))?;

        let source_resource = Resource::create(backend, "source", geometry)?;
        let destination_resource = Resource::create(backend, "destination", geometry)?;

        let element = Element::add(
            backend,
            &ElementSpec {
                display: destination.handle,
                layer: ELEMENT_LAYER,
                dest_rect: Rect::default(),
                source: destination_resource.handle,
                source_rect: Rect::from(geometry).to_fixed_point(),
                alpha: Alpha::OPAQUE,
            },
        )?;

        Ok(Self {
            element,
            destination_resource,
            source_resource,
            destination,
            source,
            image,
            pitch,
            rect: Rect::from(geometry),
            backend,
        })
    }

    /// Snapshots the source, copies it into the destination resource and
    /// flips the element onto it.
    pub fn mirror_frame(&mut self) -> Result<()> {
        let backend = self.backend;

        backend.snapshot(self.source.handle, self.source_resource.handle)?;
        backend.resource_read_data(
            self.source_resource.handle,
            &self.rect,
            &mut self.image,
            self.pitch,
        )?;
        backend.resource_write_data(
            self.destination_resource.handle,
            IMAGE_TYPE,
            self.pitch,
            &self.image,
            &self.rect,
        )?;

        let update = backend
            .update_start(FRAME_PRIORITY)
            .context("display update failed")?;
        backend.element_change_source(update, self.element.handle, self.destination_resource.handle)?;
        backend.update_submit_sync(update)?;
        Ok(())
    }

    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    pub fn image_len(&self) -> usize {
        self.image.len()
    }
}
