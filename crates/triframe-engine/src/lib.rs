//! Triframe engine crate.
//!
//! Windowed swap-chain rendering on wgpu: a window host, a device backend
//! seam, backend-neutral command recording and the frame driver tying them
//! together.

pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod window;
