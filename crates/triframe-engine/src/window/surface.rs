use std::sync::Arc;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// Window creation parameters.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    pub title: String,
    /// Initial inner size in physical pixels.
    pub size: PhysicalSize<u32>,
}

impl SurfaceConfig {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            size: PhysicalSize::new(width, height),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self::new("triframe", 1280, 720)
    }
}

/// Platform handle a swap-chain binds to.
///
/// Cheap to clone; forwards the window's raw handles.
#[derive(Debug, Clone)]
pub struct SurfaceInfo {
    window: Arc<Window>,
}

impl SurfaceInfo {
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }
}

impl HasWindowHandle for SurfaceInfo {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.window.window_handle()
    }
}

impl HasDisplayHandle for SurfaceInfo {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.window.display_handle()
    }
}

/// Notifications raised by the surface host.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent<T = SurfaceInfo> {
    /// The window is going away; stop presenting.
    Closing,
    /// Inner size changed, in physical pixels.
    ScreenSizeChanged { width: u32, height: u32 },
    /// The platform replaced the drawable behind the window.
    SurfaceInfoChanged(T),
}

/// The native window and its closing state.
#[derive(Debug)]
pub struct Surface {
    window: Arc<Window>,
    closing: bool,
}

impl Surface {
    pub(crate) fn new(window: Window) -> Self {
        Self {
            window: Arc::new(window),
            closing: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.size().width
    }

    pub fn height(&self) -> u32 {
        self.size().height
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    pub fn info(&self) -> SurfaceInfo {
        SurfaceInfo {
            window: Arc::clone(&self.window),
        }
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub(crate) fn mark_closing(&mut self) {
        self.closing = true;
    }

    pub(crate) fn request_redraw(&self) {
        self.window.request_redraw();
    }
}
