//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the window, and forwards surface events to
//! a [`SurfaceApp`](crate::core::SurfaceApp).

mod runtime;
mod surface;

pub use runtime::SurfaceHost;
pub use surface::{Surface, SurfaceConfig, SurfaceEvent, SurfaceInfo};
