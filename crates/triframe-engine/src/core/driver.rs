use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use crate::device::{Backend, DeviceConfig, FrameAcquire, FrameBuffer, FrameError, SwapChainDescription};
use crate::render::{ClearValue, CommandBuffer, MainRenderPass};
use crate::window::SurfaceEvent;

use super::content::FrameContent;

/// Externally visible lifecycle phase of a [`FrameDriver`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DriverPhase {
    Uninitialized,
    Initializing,
    Ready,
    /// Ready, with a resize waiting for the next frame.
    Resizing,
    Disposed,
}

/// Why `render_frame` did not present.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    Disposed,
    Closing,
    /// Zero-area surface (e.g. minimized window).
    EmptySurface,
    /// The swap-chain had no target this frame.
    SurfaceUnavailable,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented,
    Skipped(SkipReason),
}

enum DriverState<B> {
    Uninitialized,
    Initializing,
    Ready(Ready<B>),
    Disposed,
}

struct Ready<B> {
    backend: B,
    main_pass: MainRenderPass,
}

/// Surface notifications accumulated between frames.
struct PendingEvents<T> {
    closing: bool,
    resize: bool,
    surface: Option<T>,
}

impl<T> Default for PendingEvents<T> {
    fn default() -> Self {
        Self {
            closing: false,
            resize: false,
            surface: None,
        }
    }
}

/// What the current frame must do, computed once at its start.
enum FrameIntent<T> {
    Skip(SkipReason),
    Render {
        refresh: Option<T>,
        resize: Option<PhysicalSize<u32>>,
    },
}

impl<T> PendingEvents<T> {
    /// Skips leave pending work in place for a later frame.
    fn take_intent(&mut self, size: PhysicalSize<u32>) -> FrameIntent<T> {
        if self.closing {
            return FrameIntent::Skip(SkipReason::Closing);
        }
        if size.width == 0 || size.height == 0 {
            return FrameIntent::Skip(SkipReason::EmptySurface);
        }

        FrameIntent::Render {
            refresh: self.surface.take(),
            resize: std::mem::take(&mut self.resize).then_some(size),
        }
    }
}

/// Drives a backend through resize → record → submit → present cycles.
///
/// Surface events only record intent; all swap-chain work happens at the
/// start of the next [`render_frame`](Self::render_frame), so a frame always
/// records against the size it presents at. One frame is in flight at most:
/// each frame waits for the queue to go idle before presenting.
pub struct FrameDriver<B: Backend, C: FrameContent> {
    target: B::Target,
    surface_size: PhysicalSize<u32>,
    config: DeviceConfig,
    clear: ClearValue,
    content: C,

    state: DriverState<B>,
    pending: PendingEvents<B::Target>,
    commands: CommandBuffer,
    frames_presented: u64,
}

impl<B: Backend, C: FrameContent> FrameDriver<B, C> {
    pub fn new(target: B::Target, surface_size: PhysicalSize<u32>, config: DeviceConfig, content: C) -> Self {
        Self {
            target,
            surface_size,
            config,
            clear: ClearValue::default(),
            content,
            state: DriverState::Uninitialized,
            pending: PendingEvents::default(),
            commands: CommandBuffer::new(),
            frames_presented: 0,
        }
    }

    /// Sets the values the main pass clears to. Applies from the next frame-buffer change.
    pub fn with_clear_value(mut self, clear: ClearValue) -> Self {
        self.clear = clear;
        self
    }

    pub fn phase(&self) -> DriverPhase {
        match &self.state {
            DriverState::Uninitialized => DriverPhase::Uninitialized,
            DriverState::Initializing => DriverPhase::Initializing,
            DriverState::Ready(_) if self.pending.resize => DriverPhase::Resizing,
            DriverState::Ready(_) => DriverPhase::Ready,
            DriverState::Disposed => DriverPhase::Disposed,
        }
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn backend(&self) -> Result<&B, FrameError> {
        self.ready().map(|r| &r.backend)
    }

    /// Current swap-chain frame-buffer.
    pub fn frame_buffer(&self) -> Result<FrameBuffer, FrameError> {
        self.ready().map(|r| r.backend.frame_buffer())
    }

    pub fn main_pass(&self) -> Result<&MainRenderPass, FrameError> {
        self.ready().map(|r| &r.main_pass)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn ready(&self) -> Result<&Ready<B>, FrameError> {
        match &self.state {
            DriverState::Ready(ready) => Ok(ready),
            DriverState::Disposed => Err(FrameError::Disposed),
            DriverState::Uninitialized | DriverState::Initializing => {
                Err(FrameError::NotInitialized)
            }
        }
    }

    /// Creates the device, swap-chain and queue, then initializes content.
    ///
    /// On failure nothing is retained and the driver stays uninitialized.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            DriverState::Uninitialized => {}
            DriverState::Disposed => return Err(FrameError::Disposed.into()),
            DriverState::Initializing | DriverState::Ready(_) => {
                return Err(FrameError::AlreadyInitialized.into());
            }
        }

        self.state = DriverState::Initializing;
        match self.create_ready() {
            Ok(ready) => {
                // The swap-chain was just created at the current size.
                self.pending.resize = false;
                self.state = DriverState::Ready(ready);
                log::info!(
                    "frame driver ready at {}x{}",
                    self.surface_size.width,
                    self.surface_size.height
                );
                Ok(())
            }
            Err(e) => {
                self.state = DriverState::Uninitialized;
                Err(e)
            }
        }
    }

    fn create_ready(&mut self) -> Result<Ready<B>> {
        let size = self.surface_size;
        anyhow::ensure!(
            size.width > 0 && size.height > 0,
            "cannot create a swap-chain for a {}x{} surface",
            size.width,
            size.height
        );

        let desc = SwapChainDescription::new(size);
        let mut backend =
            B::create(&self.target, &desc, &self.config).context("failed to create graphics device")?;

        let frame_buffer = backend.frame_buffer();
        if let Err(e) = self.content.initialize(&mut backend, &frame_buffer.output) {
            self.content.dispose(&mut backend);
            backend.dispose();
            return Err(e.context("failed to initialize frame content"));
        }

        let main_pass = MainRenderPass::new(&frame_buffer, self.clear);
        self.content.on_frame_buffer_changed(&frame_buffer);

        Ok(Ready { backend, main_pass })
    }

    /// Records intent from a surface event; applied by the next frame.
    pub fn on_surface_event(&mut self, event: SurfaceEvent<B::Target>) {
        if matches!(self.state, DriverState::Disposed) {
            return;
        }

        match event {
            SurfaceEvent::Closing => self.pending.closing = true,
            SurfaceEvent::ScreenSizeChanged { width, height } => {
                self.surface_size = PhysicalSize::new(width, height);
                self.pending.resize = true;
            }
            SurfaceEvent::SurfaceInfoChanged(target) => {
                if matches!(self.state, DriverState::Ready(_)) {
                    self.pending.surface = Some(target);
                } else {
                    self.target = target;
                }
                self.pending.closing = false;
                self.pending.resize = true;
            }
        }
    }

    /// Renders and presents one frame.
    ///
    /// Fails with [`FrameError::NotInitialized`] before `initialize`. Closing,
    /// disposed, or zero-area surfaces skip without touching the swap-chain.
    pub fn render_frame(&mut self) -> Result<FrameOutcome> {
        let ready = match &mut self.state {
            DriverState::Ready(ready) => ready,
            DriverState::Disposed => return Ok(FrameOutcome::Skipped(SkipReason::Disposed)),
            DriverState::Uninitialized | DriverState::Initializing => {
                return Err(FrameError::NotInitialized.into());
            }
        };

        let (refresh, resize) = match self.pending.take_intent(self.surface_size) {
            FrameIntent::Skip(reason) => {
                log::trace!("frame skipped: {reason:?}");
                return Ok(FrameOutcome::Skipped(reason));
            }
            FrameIntent::Render { refresh, resize } => (refresh, resize),
        };

        if let Some(target) = refresh {
            if let Err(e) = ready.backend.refresh_surface(&target) {
                // Nothing was applied; the next frame retries both steps.
                self.pending.surface = Some(target);
                self.pending.resize |= resize.is_some();
                return Err(e.context("failed to rebind swap-chain"));
            }
            self.target = target;
        }

        if let Some(size) = resize {
            ready.backend.resize_swap_chain(size);
            let frame_buffer = ready.backend.frame_buffer();
            ready.main_pass.on_frame_buffer_changed(&frame_buffer);
            self.content.on_resize(size);
            self.content.on_frame_buffer_changed(&frame_buffer);
            log::debug!("swap-chain resized to {}x{}", size.width, size.height);
        }

        if ready.backend.init_frame()? == FrameAcquire::Skip {
            return Ok(FrameOutcome::Skipped(SkipReason::SurfaceUnavailable));
        }

        self.commands.begin();
        ready.main_pass.begin(&mut self.commands);
        self.content.record(&mut self.commands);
        ready.main_pass.end(&mut self.commands);
        self.commands.end()?;

        ready.backend.submit(&self.commands)?;
        ready.backend.wait_idle()?;
        ready.backend.present();

        self.frames_presented += 1;
        Ok(FrameOutcome::Presented)
    }

    /// Releases content, then queue, swap-chain and device. Idempotent.
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.state, DriverState::Disposed) {
            DriverState::Ready(mut ready) => {
                self.content.dispose(&mut ready.backend);
                ready.backend.dispose();
                log::info!(
                    "frame driver disposed after {} frames",
                    self.frames_presented
                );
            }
            DriverState::Disposed => {}
            DriverState::Uninitialized | DriverState::Initializing => {
                log::debug!("frame driver disposed before initialization");
            }
        }
    }
}

impl<B: Backend, C: FrameContent> Drop for FrameDriver<B, C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
