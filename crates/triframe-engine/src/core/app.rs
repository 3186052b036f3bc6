use anyhow::{Context, Result};

use crate::device::{DeviceConfig, FrameError, WgpuBackend};
use crate::window::{Surface, SurfaceConfig, SurfaceEvent, SurfaceHost};

use super::content::FrameContent;
use super::driver::FrameDriver;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Callbacks driven by [`SurfaceHost::run`].
pub trait SurfaceApp {
    /// Called once, after the window exists and before the first frame.
    fn on_init(&mut self, surface: &Surface) -> Result<()>;

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        let _ = event;
    }

    /// Called once per redraw until the window closes.
    fn on_frame(&mut self, surface: &Surface) -> Result<AppControl>;

    /// Called once when the loop has stopped.
    fn on_exit(&mut self) {}
}

/// Binds a [`FrameContent`] to a window through a wgpu [`FrameDriver`].
pub struct DriverApp<C: FrameContent> {
    config: DeviceConfig,
    content: Option<C>,
    driver: Option<FrameDriver<WgpuBackend, C>>,
}

impl<C: FrameContent> DriverApp<C> {
    pub fn new(config: DeviceConfig, content: C) -> Self {
        Self {
            config,
            content: Some(content),
            driver: None,
        }
    }
}

impl<C: FrameContent> SurfaceApp for DriverApp<C> {
    fn on_init(&mut self, surface: &Surface) -> Result<()> {
        let content = self.content.take().ok_or(FrameError::AlreadyInitialized)?;
        let mut driver = FrameDriver::new(surface.info(), surface.size(), self.config.clone(), content);
        driver.initialize()?;
        self.driver = Some(driver);
        Ok(())
    }

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        if let Some(driver) = &mut self.driver {
            driver.on_surface_event(event);
        }
    }

    fn on_frame(&mut self, _surface: &Surface) -> Result<AppControl> {
        let driver = self.driver.as_mut().ok_or(FrameError::NotInitialized)?;
        driver.render_frame()?;
        Ok(AppControl::Continue)
    }

    fn on_exit(&mut self) {
        if let Some(driver) = &mut self.driver {
            driver.dispose();
        }
    }
}

/// Opens a window and renders `content` on it until the window closes.
pub fn run<C: FrameContent>(surface: SurfaceConfig, config: DeviceConfig, content: C) -> Result<()> {
    let title = surface.title.clone();
    SurfaceHost::new(surface)
        .run(DriverApp::new(config, content))
        .with_context(|| format!("'{title}' terminated"))
}
