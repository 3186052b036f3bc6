use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{AppControl, SurfaceApp};

use super::surface::{Surface, SurfaceConfig, SurfaceEvent};

/// Owns the platform event loop and the single window it drives.
pub struct SurfaceHost {
    config: SurfaceConfig,
}

impl SurfaceHost {
    /// Describes the surface; the window opens when the loop first resumes.
    pub fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }

    /// Blocks until the window closes or `app` fails.
    ///
    /// `on_init` runs once before the first frame, `on_frame` once per redraw.
    /// `on_exit` runs before returning, also after a failure.
    pub fn run<A: SurfaceApp>(self, app: A) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = HostState::new(self.config, app);

        let result = event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error");

        let error = state.error.take();
        finish(&mut state.app, result, error)
    }
}

/// Runs `on_exit`, then reports the loop error or the first app error.
fn finish<A: SurfaceApp>(
    app: &mut A,
    loop_result: Result<()>,
    error: Option<anyhow::Error>,
) -> Result<()> {
    app.on_exit();
    loop_result?;
    error.map_or(Ok(()), Err)
}

/// What the host does with one window event.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HostStep {
    /// Mark the surface closing, emit `Closing`, stop the loop.
    Close,
    /// Emit `ScreenSizeChanged` with the new inner size.
    Resize(PhysicalSize<u32>),
    Redraw,
    Ignore,
}

impl HostStep {
    fn surface_event<T>(self) -> Option<SurfaceEvent<T>> {
        match self {
            HostStep::Close => Some(SurfaceEvent::Closing),
            HostStep::Resize(size) => Some(SurfaceEvent::ScreenSizeChanged {
                width: size.width,
                height: size.height,
            }),
            HostStep::Redraw | HostStep::Ignore => None,
        }
    }

    fn stops_loop(self) -> bool {
        self == HostStep::Close
    }
}

/// `current` is the window's inner size at the time of the event.
fn translate_window_event(event: &WindowEvent, current: Option<PhysicalSize<u32>>) -> HostStep {
    match event {
        WindowEvent::CloseRequested => HostStep::Close,
        WindowEvent::Resized(size) => HostStep::Resize(*size),
        WindowEvent::ScaleFactorChanged { .. } => scale_factor_step(current),
        WindowEvent::RedrawRequested => HostStep::Redraw,
        _ => HostStep::Ignore,
    }
}

/// A scale change resizes the drawable to the window's new inner size.
fn scale_factor_step(current: Option<PhysicalSize<u32>>) -> HostStep {
    current.map_or(HostStep::Ignore, HostStep::Resize)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ResumeStep {
    /// First resume: open the window and run `on_init`.
    CreateSurface,
    /// Resume after suspension: the platform may have replaced the drawable.
    Rebind,
    Nothing,
}

fn resume_step(has_surface: bool, was_suspended: bool, failed: bool) -> ResumeStep {
    if failed {
        ResumeStep::Nothing
    } else if !has_surface {
        ResumeStep::CreateSurface
    } else if was_suspended {
        ResumeStep::Rebind
    } else {
        ResumeStep::Nothing
    }
}

/// Frames are produced only for a visible, open surface.
fn renders(suspended: bool, closing: bool) -> bool {
    !suspended && !closing
}

/// Keeps the first error; later ones are only logged.
fn record_failure(slot: &mut Option<anyhow::Error>, err: anyhow::Error) {
    log::error!("{err:#}");
    if slot.is_none() {
        *slot = Some(err);
    }
}

struct HostState<A: SurfaceApp> {
    config: SurfaceConfig,
    app: A,

    surface: Option<Surface>,
    window_id: Option<WindowId>,
    suspended: bool,

    /// First fatal error; stops the loop.
    error: Option<anyhow::Error>,
}

impl<A: SurfaceApp> HostState<A> {
    fn new(config: SurfaceConfig, app: A) -> Self {
        Self {
            config,
            app,
            surface: None,
            window_id: None,
            suspended: false,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        record_failure(&mut self.error, err);
        event_loop.exit();
    }

    fn create_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        self.window_id = Some(window.id());
        let surface = self.surface.insert(Surface::new(window));
        log::info!(
            "surface '{}' created at {}x{}",
            self.config.title,
            surface.width(),
            surface.height()
        );

        self.app.on_init(surface).context("initialization failed")?;
        surface.request_redraw();
        Ok(())
    }

    fn emit(&mut self, event: SurfaceEvent) {
        log::debug!("surface event {event:?}");
        self.app.on_surface_event(event);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        if !renders(self.suspended, surface.is_closing()) {
            return;
        }

        match self.app.on_frame(surface) {
            Ok(AppControl::Continue) => {}
            Ok(AppControl::Exit) => event_loop.exit(),
            Err(e) => self.fail(event_loop, e.context("frame failed")),
        }
    }
}

impl<A: SurfaceApp> ApplicationHandler for HostState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let was_suspended = std::mem::take(&mut self.suspended);

        match resume_step(self.surface.is_some(), was_suspended, self.error.is_some()) {
            ResumeStep::CreateSurface => {
                if let Err(e) = self.create_surface(event_loop) {
                    self.fail(event_loop, e);
                }
            }
            ResumeStep::Rebind => {
                if let Some(surface) = &self.surface {
                    let info = surface.info();
                    surface.request_redraw();
                    self.emit(SurfaceEvent::SurfaceInfoChanged(info));
                }
            }
            ResumeStep::Nothing => {}
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.suspended = true;
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(surface) = &self.surface {
            if renders(self.suspended, surface.is_closing()) {
                surface.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window_id != Some(window_id) || self.error.is_some() {
            return;
        }

        let current = self.surface.as_ref().map(Surface::size);
        let step = translate_window_event(&event, current);

        match step {
            HostStep::Close => {
                if let Some(surface) = &mut self.surface {
                    surface.mark_closing();
                }
            }
            HostStep::Redraw => self.redraw(event_loop),
            HostStep::Resize(_) | HostStep::Ignore => {}
        }

        if let Some(event) = step.surface_event() {
            self.emit(event);
        }
        if step.stops_loop() {
            event_loop.exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct ExitCounter {
        exits: u32,
    }

    impl SurfaceApp for ExitCounter {
        fn on_init(&mut self, _surface: &Surface) -> Result<()> {
            Ok(())
        }

        fn on_frame(&mut self, _surface: &Surface) -> Result<AppControl> {
            Ok(AppControl::Continue)
        }

        fn on_exit(&mut self) {
            self.exits += 1;
        }
    }

    fn size(width: u32, height: u32) -> PhysicalSize<u32> {
        PhysicalSize::new(width, height)
    }

    #[test]
    fn close_request_emits_closing_and_stops_the_loop() {
        let step = translate_window_event(&WindowEvent::CloseRequested, Some(size(1280, 720)));

        assert_eq!(step, HostStep::Close);
        assert_eq!(step.surface_event::<()>(), Some(SurfaceEvent::Closing));
        assert!(step.stops_loop());
    }

    #[test]
    fn resize_emits_screen_size_changed() {
        let step = translate_window_event(&WindowEvent::Resized(size(800, 600)), Some(size(1280, 720)));

        assert_eq!(
            step.surface_event::<()>(),
            Some(SurfaceEvent::ScreenSizeChanged { width: 800, height: 600 })
        );
        assert!(!step.stops_loop());
    }

    #[test]
    fn scale_change_reports_the_current_inner_size() {
        assert_eq!(
            scale_factor_step(Some(size(2560, 1440))).surface_event::<()>(),
            Some(SurfaceEvent::ScreenSizeChanged { width: 2560, height: 1440 })
        );
        assert_eq!(scale_factor_step(None), HostStep::Ignore);
    }

    #[test]
    fn redraw_and_other_events_emit_nothing() {
        let redraw = translate_window_event(&WindowEvent::RedrawRequested, None);
        assert_eq!(redraw, HostStep::Redraw);
        assert_eq!(redraw.surface_event::<()>(), None);

        let focus = translate_window_event(&WindowEvent::Focused(true), None);
        assert_eq!(focus, HostStep::Ignore);
        assert_eq!(focus.surface_event::<()>(), None);
    }

    #[test]
    fn surface_is_created_on_first_resume_only() {
        assert_eq!(resume_step(false, false, false), ResumeStep::CreateSurface);
        assert_eq!(resume_step(true, false, false), ResumeStep::Nothing);
        assert_eq!(resume_step(true, false, false), ResumeStep::Nothing);
    }

    #[test]
    fn resume_after_suspend_rebinds_the_surface() {
        assert_eq!(resume_step(true, true, false), ResumeStep::Rebind);
    }

    #[test]
    fn nothing_happens_on_resume_after_a_failure() {
        assert_eq!(resume_step(false, false, true), ResumeStep::Nothing);
        assert_eq!(resume_step(true, true, true), ResumeStep::Nothing);
    }

    #[test]
    fn frames_need_an_open_visible_surface() {
        assert!(renders(false, false));
        assert!(!renders(true, false));
        assert!(!renders(false, true));
        assert!(!renders(true, true));
    }

    #[test]
    fn first_failure_is_the_one_reported() {
        let mut slot = None;
        record_failure(&mut slot, anyhow::anyhow!("device lost"));
        record_failure(&mut slot, anyhow::anyhow!("second"));

        assert_eq!(slot.map(|e| e.to_string()).as_deref(), Some("device lost"));
    }

    #[test]
    fn exit_hook_runs_on_clean_shutdown() {
        let mut app = ExitCounter::default();
        assert!(finish(&mut app, Ok(()), None).is_ok());
        assert_eq!(app.exits, 1);
    }

    #[test]
    fn exit_hook_runs_when_the_app_failed() {
        let mut app = ExitCounter::default();
        let err = finish(&mut app, Ok(()), Some(anyhow::anyhow!("frame failed"))).unwrap_err();

        assert_eq!(err.to_string(), "frame failed");
        assert_eq!(app.exits, 1);
    }

    #[test]
    fn exit_hook_runs_when_the_loop_failed() {
        let mut app = ExitCounter::default();
        let err = finish(&mut app, Err(anyhow::anyhow!("loop")), None).unwrap_err();

        assert_eq!(err.to_string(), "loop");
        assert_eq!(app.exits, 1);
    }
}
