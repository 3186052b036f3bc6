//! GPU device + swap-chain management.
//!
//! This module is responsible for:
//! - the [`Backend`] / [`ResourceFactory`] seam the frame driver talks to
//! - creating the wgpu Instance/Adapter/Device/Queue ([`WgpuBackend`])
//! - a GPU-less `RecordingBackend` that journals every call (`testing` feature)
//! - lifecycle errors and device configuration

mod backend;
mod error;
mod frame;
mod gpu;
mod init;
#[cfg(any(test, feature = "testing"))]
mod recording;
mod resources;
mod surface;

pub use backend::{Backend, ResourceFactory};
pub use error::{FrameError, SurfaceErrorAction};
pub use frame::{FrameAcquire, FrameBuffer, OutputDescription, SwapChainDescription};
pub use gpu::WgpuBackend;
pub use init::{BACKEND_ENV, BackendChoice, DeviceConfig, VALIDATION_ENV};
#[cfg(any(test, feature = "testing"))]
pub use recording::{BackendCall, RecordingBackend, RecordingTarget};
