//! Recording in-memory backend for tests.

use super::{
    DisplayBackend, DisplayHandle, ElementHandle, ElementSpec, ImageType, ResourceHandle,
    UpdateHandle,
};
use crate::error::{Error, Result};
use crate::lifecycle::RunFlag;
use crate::utils::{Geometry, Rect};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DisplayOpen(u32),
    DisplayInfo(DisplayHandle),
    DisplayClose(DisplayHandle),
    ResourceCreate(Geometry),
    ResourceDelete(ResourceHandle),
    ReadData(ResourceHandle, u32),
    WriteData(ResourceHandle, u32),
    Snapshot(DisplayHandle, ResourceHandle),
    UpdateStart(i32),
    ElementAdd(DisplayHandle, ResourceHandle),
    ChangeSource(ElementHandle, ResourceHandle),
    ElementRemove(ElementHandle),
    Submit(UpdateHandle),
}

impl Call {
    pub fn kind(&self) -> &'static str {
        match self {
            Call::DisplayOpen(_) => "display open",
            Call::DisplayInfo(_) => "display get info",
            Call::DisplayClose(_) => "display close",
            Call::ResourceCreate(_) => "resource create",
            Call::ResourceDelete(_) => "resource delete",
            Call::ReadData(..) => "read data",
            Call::WriteData(..) => "write data",
            Call::Snapshot(..) => "snapshot",
            Call::UpdateStart(_) => "update start",
            Call::ElementAdd(..) => "element add",
            Call::ChangeSource(..) => "element change source",
            Call::ElementRemove(_) => "element remove",
            Call::Submit(_) => "update submit",
        }
    }
}

#[derive(Default)]
pub struct FakeBackend {
    geometries: HashMap<u32, Geometry>,
    displays: RefCell<HashMap<DisplayHandle, u32>>,
    calls: RefCell<Vec<Call>>,
    next_handle: Cell<u32>,
    fail: Cell<Option<(&'static str, usize)>>,
    stop: RefCell<Option<(RunFlag, usize)>>,
    frame: Cell<u8>,
    written: RefCell<Vec<u8>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
            .with_display(0, Geometry::new(1920, 1080))
            .with_display(5, Geometry::new(1366, 768))
    }

    pub fn with_display(mut self, device: u32, geometry: Geometry) -> Self {
        self.geometries.insert(device, geometry);
        self
    }

    pub fn without_display(mut self, device: u32) -> Self {
        self.geometries.remove(&device);
        self
    }

    /// Fails the `nth` (1-based) call of `kind`.
    pub fn fail_at(self, kind: &'static str, nth: usize) -> Self {
        self.fail.set(Some((kind, nth)));
        self
    }

    /// Stops `flag` once `frames` element flips have been submitted.
    pub fn stop_after(self, flag: RunFlag, frames: usize) -> Self {
        *self.stop.borrow_mut() = Some((flag, frames));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.kind() == kind).count()
    }

    /// Index of the last call of `kind`.
    pub fn last(&self, kind: &str) -> Option<usize> {
        self.calls.borrow().iter().rposition(|c| c.kind() == kind)
    }

    /// First byte of each buffer written to a resource.
    pub fn written(&self) -> Vec<u8> {
        self.written.borrow().clone()
    }

    fn record(&self, call: Call) -> Result<()> {
        let kind = call.kind();
        self.calls.borrow_mut().push(call);
        match self.fail.get() {
            Some((fail_kind, nth)) if fail_kind == kind && self.count(kind) == nth => {
                Err(Error::Vendor {
                    op: kind,
                    status: -1,
                })
            }
            _ => Ok(()),
        }
    }

    fn handle(&self) -> u32 {
        let next = self.next_handle.get() + 1;
        self.next_handle.set(next);
        next
    }
}

impl DisplayBackend for FakeBackend {
    fn display_open(&self, device: u32) -> Result<DisplayHandle> {
        self.record(Call::DisplayOpen(device))
            .map_err(|_| Error::InvalidHandle { op: "display open" })?;
        if !self.geometries.contains_key(&device) {
            return Err(Error::InvalidHandle { op: "display open" });
        }
        let handle = DisplayHandle(self.handle());
        self.displays.borrow_mut().insert(handle, device);
        Ok(handle)
    }

    fn display_info(&self, display: DisplayHandle) -> Result<Geometry> {
        self.record(Call::DisplayInfo(display))?;
        let device = self.displays.borrow()[&display];
        Ok(self.geometries[&device])
    }

    fn display_close(&self, display: DisplayHandle) -> Result<()> {
        self.record(Call::DisplayClose(display))
    }

    fn resource_create(&self, _: ImageType, geometry: Geometry) -> Result<ResourceHandle> {
        self.record(Call::ResourceCreate(geometry))
            .map_err(|_| Error::InvalidHandle {
                op: "resource create",
            })?;
        Ok(ResourceHandle(self.handle()))
    }

    fn resource_delete(&self, resource: ResourceHandle) -> Result<()> {
        self.record(Call::ResourceDelete(resource))
    }

    fn resource_read_data(
        &self,
        resource: ResourceHandle,
        rect: &Rect,
        dst: &mut [u8],
        pitch: u32,
    ) -> Result<()> {
        self.record(Call::ReadData(resource, pitch))?;
        let needed = super::required_len(rect, pitch);
        if dst.len() < needed {
            return Err(Error::BufferTooSmall {
                len: dst.len(),
                needed,
            });
        }
        dst.fill(self.frame.get());
        Ok(())
    }

    fn resource_write_data(
        &self,
        resource: ResourceHandle,
        _: ImageType,
        pitch: u32,
        src: &[u8],
        _: &Rect,
    ) -> Result<()> {
        self.record(Call::WriteData(resource, pitch))?;
        self.written.borrow_mut().push(src[0]);
        Ok(())
    }

    fn snapshot(&self, display: DisplayHandle, resource: ResourceHandle) -> Result<()> {
        self.record(Call::Snapshot(display, resource))?;
        self.frame.set(self.frame.get().wrapping_add(1));
        Ok(())
    }

    fn update_start(&self, priority: i32) -> Result<UpdateHandle> {
        self.record(Call::UpdateStart(priority))
            .map_err(|_| Error::InvalidHandle { op: "update start" })?;
        Ok(UpdateHandle(self.handle()))
    }

    fn element_add(&self, _: UpdateHandle, spec: &ElementSpec) -> Result<ElementHandle> {
        self.record(Call::ElementAdd(spec.display, spec.source))
            .map_err(|_| Error::InvalidHandle { op: "element add" })?;
        Ok(ElementHandle(self.handle()))
    }

    fn element_change_source(
        &self,
        _: UpdateHandle,
        element: ElementHandle,
        source: ResourceHandle,
    ) -> Result<()> {
        self.record(Call::ChangeSource(element, source))?;
        if let Some((flag, frames)) = self.stop.borrow().as_ref() {
            if self.count("element change source") >= *frames {
                flag.stop();
            }
        }
        Ok(())
    }

    fn element_remove(&self, _: UpdateHandle, element: ElementHandle) -> Result<()> {
        self.record(Call::ElementRemove(element))
    }

    fn update_submit_sync(&self, update: UpdateHandle) -> Result<()> {
        self.record(Call::Submit(update))
    }
}
