// gl-surface-view/src/surface.rs
//
//! Native drawables that window surfaces are created against.

use crate::Error;

use std::fmt::{self, Debug, Formatter};
use std::os::raw::c_void;

/// A native window (an `ANativeWindow` on Android) owned by the host view.
///
/// The host keeps the window alive between its surface-available and surface-unavailable
/// notifications; the rendering thread only touches it in between.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NativeWidget {
    pub(crate) native_window: *mut c_void,
}

unsafe impl Send for NativeWidget {}
unsafe impl Sync for NativeWidget {}

impl Debug for NativeWidget {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "NativeWidget({:p})", self.native_window)
    }
}

impl NativeWidget {
    /// Wraps a raw native window pointer.
    ///
    /// The caller must keep the window alive until the view has been told the surface is
    /// gone.
    pub unsafe fn from_native_window(native_window: *mut c_void) -> NativeWidget {
        debug_assert!(!native_window.is_null());
        NativeWidget { native_window }
    }

    /// Create a native widget from a window handle.
    ///
    /// Only `AndroidNdk` handles name a window EGL can render into.
    pub fn from_window_handle(handle: rwh_06::WindowHandle) -> Result<NativeWidget, Error> {
        use rwh_06::RawWindowHandle::AndroidNdk;

        match handle.as_raw() {
            AndroidNdk(handle) => Ok(NativeWidget {
                native_window: handle.a_native_window.as_ptr(),
            }),
            _ => Err(Error::IncompatibleNativeWidget),
        }
    }

    /// Create a native widget from anything that can hand out a window handle.
    pub fn from_window<W>(window: &W) -> Result<NativeWidget, Error>
    where
        W: rwh_06::HasWindowHandle + ?Sized,
    {
        let handle = window
            .window_handle()
            .map_err(|_| Error::InvalidNativeWidget)?;
        NativeWidget::from_window_handle(handle)
    }

    #[inline]
    pub fn native_window(&self) -> *mut c_void {
        self.native_window
    }
}
