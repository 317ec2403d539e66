pub use imp::BcmHost;

#[cfg(bcm_host)]
mod imp {
    use super::super::ffi;
    use super::super::{
        required_len, DisplayBackend, DisplayHandle, ElementHandle, ElementSpec, ImageType,
        ResourceHandle, UpdateHandle,
    };
    use crate::error::{check, Error, Result};
    use crate::utils::{Geometry, Rect};
    use std::marker::PhantomData;
    use std::os::raw::c_void;
    use std::ptr;

    /// The firmware-backed DispmanX implementation.
    ///
    /// `bcm_host_init` runs on construction and `bcm_host_deinit` on drop, so
    /// every session borrowing this value is torn down first.
    pub struct BcmHost {
        // The VCHI connection is per-process and not thread safe.
        _not_send: PhantomData<*const ()>,
    }

    impl BcmHost {
        pub fn init() -> Result<Self> {
            unsafe { ffi::bcm_host_init() };
            log::debug!("bcm_host initialised");
            Ok(Self {
                _not_send: PhantomData,
            })
        }
    }

    impl Drop for BcmHost {
        fn drop(&mut self) {
            unsafe { ffi::bcm_host_deinit() };
            log::debug!("bcm_host deinitialised");
        }
    }

    fn non_zero(op: &'static str, handle: u32) -> Result<u32> {
        if handle == 0 {
            Err(Error::InvalidHandle { op })
        } else {
            Ok(handle)
        }
    }

    fn ensure_fits(rect: &Rect, pitch: u32, len: usize) -> Result<()> {
        let needed = required_len(rect, pitch);
        if len < needed {
            return Err(Error::BufferTooSmall { len, needed });
        }
        Ok(())
    }

    impl DisplayBackend for BcmHost {
        fn display_open(&self, device: u32) -> Result<DisplayHandle> {
            let handle = unsafe { ffi::vc_dispmanx_display_open(device) };
            non_zero("display open", handle).map(DisplayHandle)
        }

        fn display_info(&self, display: DisplayHandle) -> Result<Geometry> {
            let mut info = ffi::DISPMANX_MODEINFO_T::default();
            let status = unsafe { ffi::vc_dispmanx_display_get_info(display.0, &mut info) };
            check("display get info", status)?;
            Ok(Geometry::new(info.width.max(0) as u32, info.height.max(0) as u32))
        }

        fn display_close(&self, display: DisplayHandle) -> Result<()> {
            check("display close", unsafe {
                ffi::vc_dispmanx_display_close(display.0)
            })
        }

        fn resource_create(
            &self,
            image_type: ImageType,
            geometry: Geometry,
        ) -> Result<ResourceHandle> {
            let mut native_image = 0u32;
            let handle = unsafe {
                ffi::vc_dispmanx_resource_create(
                    image_type as u32,
                    geometry.width,
                    geometry.height,
                    &mut native_image,
                )
            };
            non_zero("resource create", handle).map(ResourceHandle)
        }

        fn resource_delete(&self, resource: ResourceHandle) -> Result<()> {
            check("resource delete", unsafe {
                ffi::vc_dispmanx_resource_delete(resource.0)
            })
        }

        fn resource_read_data(
            &self,
            resource: ResourceHandle,
            rect: &Rect,
            dst: &mut [u8],
            pitch: u32,
        ) -> Result<()> {
            ensure_fits(rect, pitch, dst.len())?;
            // SAFETY: dst covers pitch * rect.height bytes, checked above.
            let status = unsafe {
                ffi::vc_dispmanx_resource_read_data(
                    resource.0,
                    rect,
                    dst.as_mut_ptr() as *mut c_void,
                    pitch,
                )
            };
            check("read data", status)
        }

        fn resource_write_data(
            &self,
            resource: ResourceHandle,
            image_type: ImageType,
            pitch: u32,
            src: &[u8],
            rect: &Rect,
        ) -> Result<()> {
            ensure_fits(rect, pitch, src.len())?;
            // SAFETY: the firmware only reads from src despite the mutable signature.
            let status = unsafe {
                ffi::vc_dispmanx_resource_write_data(
                    resource.0,
                    image_type as u32,
                    pitch as i32,
                    src.as_ptr() as *mut c_void,
                    rect,
                )
            };
            check("write data", status)
        }

        fn snapshot(&self, display: DisplayHandle, resource: ResourceHandle) -> Result<()> {
            check("snapshot", unsafe {
                ffi::vc_dispmanx_snapshot(display.0, resource.0, ffi::DISPMANX_NO_ROTATE)
            })
        }

        fn update_start(&self, priority: i32) -> Result<UpdateHandle> {
            let handle = unsafe { ffi::vc_dispmanx_update_start(priority) };
            non_zero("update start", handle).map(UpdateHandle)
        }

        fn element_add(&self, update: UpdateHandle, spec: &ElementSpec) -> Result<ElementHandle> {
            let mut alpha = ffi::VC_DISPMANX_ALPHA_T {
                flags: ffi::DISPMANX_FLAGS_ALPHA_FIXED_ALL_PIXELS,
                opacity: u32::from(spec.alpha.opacity),
                mask: 0,
            };
            let handle = unsafe {
                ffi::vc_dispmanx_element_add(
                    update.0,
                    spec.display.0,
                    spec.layer,
                    &spec.dest_rect,
                    spec.source.0,
                    &spec.source_rect,
                    ffi::DISPMANX_PROTECTION_NONE,
                    &mut alpha,
                    ptr::null_mut(),
                    ffi::DISPMANX_NO_ROTATE,
                )
            };
            non_zero("element add", handle).map(ElementHandle)
        }

        fn element_change_source(
            &self,
            update: UpdateHandle,
            element: ElementHandle,
            source: ResourceHandle,
        ) -> Result<()> {
            check("element change source", unsafe {
                ffi::vc_dispmanx_element_change_source(update.0, element.0, source.0)
            })
        }

        fn element_remove(&self, update: UpdateHandle, element: ElementHandle) -> Result<()> {
            check("element remove", unsafe {
                ffi::vc_dispmanx_element_remove(update.0, element.0)
            })
        }

        fn update_submit_sync(&self, update: UpdateHandle) -> Result<()> {
            check("update submit", unsafe {
                ffi::vc_dispmanx_update_submit_sync(update.0)
            })
        }
    }
}

#[cfg(not(bcm_host))]
mod imp {
    use super::super::{
        DisplayBackend, DisplayHandle, ElementHandle, ElementSpec, ImageType, ResourceHandle,
        UpdateHandle,
    };
    use crate::error::{Error, Result};
    use crate::utils::{Geometry, Rect};

    /// Stand-in used when the crate is built without `libbcm_host`.
    ///
    /// It can never be constructed, so the backend methods are unreachable.
    pub enum BcmHost {}

    impl BcmHost {
        pub fn init() -> Result<Self> {
            Err(Error::Unavailable)
        }
    }

    impl DisplayBackend for BcmHost {
        fn display_open(&self, _: u32) -> Result<DisplayHandle> {
            match *self {}
        }

        fn display_info(&self, _: DisplayHandle) -> Result<Geometry> {
            match *self {}
        }

        fn display_close(&self, _: DisplayHandle) -> Result<()> {
            match *self {}
        }

        fn resource_create(&self, _: ImageType, _: Geometry) -> Result<ResourceHandle> {
            match *self {}
        }

        fn resource_delete(&self, _: ResourceHandle) -> Result<()> {
            match *self {}
        }

        fn resource_read_data(&self, _: ResourceHandle, _: &Rect, _: &mut [u8], _: u32) -> Result<()> {
            match *self {}
        }

        fn resource_write_data(
            &self,
            _: ResourceHandle,
            _: ImageType,
            _: u32,
            _: &[u8],
            _: &Rect,
        ) -> Result<()> {
            match *self {}
        }

        fn snapshot(&self, _: DisplayHandle, _: ResourceHandle) -> Result<()> {
            match *self {}
        }

        fn update_start(&self, _: i32) -> Result<UpdateHandle> {
            match *self {}
        }

        fn element_add(&self, _: UpdateHandle, _: &ElementSpec) -> Result<ElementHandle> {
            match *self {}
        }

        fn element_change_source(
            &self,
            _: UpdateHandle,
            _: ElementHandle,
            _: ResourceHandle,
        ) -> Result<()> {
            match *self {}
        }

        fn element_remove(&self, _: UpdateHandle, _: ElementHandle) -> Result<()> {
            match *self {}
        }

        fn update_submit_sync(&self, _: UpdateHandle) -> Result<()> {
            match *self {}
        }
    }

}
