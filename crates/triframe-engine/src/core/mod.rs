//! Frame lifecycle.
//!
//! [`FrameDriver`] owns a backend and a [`FrameContent`] and turns surface
//! events into deferred swap-chain work. [`run`] wires a driver to a window
//! through [`SurfaceApp`].

mod app;
mod content;
mod driver;

pub use app::{AppControl, DriverApp, SurfaceApp, run};
pub use content::FrameContent;
pub use driver::{DriverPhase, FrameDriver, FrameOutcome, SkipReason};
